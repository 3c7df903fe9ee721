use crate::texture::{GlyphCanvas, TextureBackend, TextureError, TextureId, MAX_TEXTURE_DIM};
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Terminal cells are roughly twice as tall as they are wide.
pub(crate) const CELL_ASPECT: f32 = 2.0;
/// Nominal pixel size of one cell, used where a breakpoint is expressed in
/// screen pixels.
pub(crate) const CELL_PX_W: f32 = 8.0;
pub(crate) const CELL_PX_H: f32 = 16.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let aa = a as f32;
    let bb = b as f32;
    (aa + (bb - aa) * t).round().clamp(0.0, 255.0) as u8
}

impl Rgb {
    pub(crate) const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub(crate) fn to_color(self) -> Color {
        Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }

    pub(crate) fn mix(self, to: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        Rgb {
            r: lerp_u8(self.r, to.r, t),
            g: lerp_u8(self.g, to.g, t),
            b: lerp_u8(self.b, to.b, t),
        }
    }

    pub(crate) fn scale(self, k: f32) -> Rgb {
        let k = k.max(0.0);
        Rgb {
            r: (self.r as f32 * k).round().min(255.0) as u8,
            g: (self.g as f32 * k).round().min(255.0) as u8,
            b: (self.b as f32 * k).round().min(255.0) as u8,
        }
    }
}

/* -----------------------------
   Cell buffer
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        if x < self.w && y < self.h {
            Some(self.cells[self.idx(x, y)])
        } else {
            None
        }
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell { bg, ..Cell::default() };
        }
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color, bold: bool) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x as usize + i;
        if xx >= buf.w as usize {
            break;
        }
        buf.set(xx as u16, y, Cell { ch, fg, bg, bold });
    }
}

pub(crate) fn pad_to(s: &str, w: usize) -> String {
    let n = s.chars().count();
    if n >= w {
        s.chars().take(w).collect()
    } else {
        let mut out = String::with_capacity(w);
        out.push_str(s);
        out.extend(std::iter::repeat(' ').take(w - n));
        out
    }
}

/* -----------------------------
   Braille dot layer: 2×4 subpixels per cell
------------------------------ */

fn braille_bit(dx: usize, dy: usize) -> u8 {
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0,
    }
}

pub(crate) struct DotLayer {
    pub(crate) sw: usize,
    pub(crate) sh: usize,
    intensity: Vec<f32>,
    tint: Vec<Rgb>,
}

impl DotLayer {
    pub(crate) fn new(cols: u16, rows: u16) -> Self {
        let sw = cols as usize * 2;
        let sh = rows as usize * 4;
        Self {
            sw,
            sh,
            intensity: vec![0.0; sw * sh],
            tint: vec![Rgb::default(); sw * sh],
        }
    }

    pub(crate) fn clear(&mut self) {
        self.intensity.fill(0.0);
    }

    /// Adds `b` brightness at subpixel coordinates, keeping the brightest tint.
    pub(crate) fn deposit(&mut self, x: f32, y: f32, b: f32, color: Rgb) {
        let xi = x.round() as i64;
        let yi = y.round() as i64;
        if xi < 0 || yi < 0 || xi as usize >= self.sw || yi as usize >= self.sh {
            return;
        }
        let i = yi as usize * self.sw + xi as usize;
        if b >= self.intensity[i] {
            self.tint[i] = color;
        }
        self.intensity[i] += b;
    }

    /// Writes every lit cell into `buf`; unlit cells are left untouched.
    pub(crate) fn composite(&self, buf: &mut CellBuffer, bg: Color) {
        let thr = 0.12;
        for cy in 0..buf.h as usize {
            for cx in 0..buf.w as usize {
                let mut mask = 0u8;
                let mut best = 0.0f32;
                let mut color = Rgb::default();
                let mut sum = 0.0f32;
                for dy in 0..4 {
                    for dx in 0..2 {
                        let sx = cx * 2 + dx;
                        let sy = cy * 4 + dy;
                        if sx >= self.sw || sy >= self.sh {
                            continue;
                        }
                        let i = sy * self.sw + sx;
                        let v = self.intensity[i];
                        if v > thr {
                            mask |= braille_bit(dx, dy);
                            sum += v;
                            if v > best {
                                best = v;
                                color = self.tint[i];
                            }
                        }
                    }
                }
                if mask == 0 {
                    continue;
                }
                let lum = (sum / 2.0).clamp(0.25, 1.0);
                buf.set(
                    cx as u16,
                    cy as u16,
                    Cell {
                        ch: char::from_u32(0x2800 + mask as u32).unwrap_or(' '),
                        fg: color.scale(lum).to_color(),
                        bg,
                        bold: false,
                    },
                );
            }
        }
    }
}

/* -----------------------------
   Texture pool: the terminal's rendering backend
------------------------------ */

#[derive(Default)]
pub(crate) struct TexturePool {
    slots: Vec<Option<GlyphCanvas>>,
    free: Vec<u32>,
}

impl TexturePool {
    pub(crate) fn get(&self, id: TextureId) -> Option<&GlyphCanvas> {
        self.slots.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    pub(crate) fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl TextureBackend for TexturePool {
    fn create_texture(&mut self, w: u32, h: u32) -> Result<TextureId, TextureError> {
        if w == 0 || h == 0 {
            return Err(TextureError::EmptyCanvas { w, h });
        }
        if w > MAX_TEXTURE_DIM || h > MAX_TEXTURE_DIM {
            return Err(TextureError::TooLarge { w, h });
        }
        let tex = GlyphCanvas::new(w, h);
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = Some(tex);
            return Ok(TextureId(slot));
        }
        self.slots.push(Some(tex));
        Ok(TextureId(self.slots.len() as u32 - 1))
    }

    fn upload(&mut self, id: TextureId, canvas: &GlyphCanvas) {
        let Some(Some(dst)) = self.slots.get_mut(id.0 as usize) else {
            return;
        };
        if dst.w == canvas.w && dst.h == canvas.h {
            dst.texels.copy_from_slice(&canvas.texels);
        } else {
            *dst = canvas.clone();
        }
    }

    fn release(&mut self, id: TextureId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
    }
}

/* -----------------------------
   Sprite blit
------------------------------ */

/// Screen rectangle a billboard covers, in cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SpriteQuad {
    pub(crate) left: f32,
    pub(crate) top: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
    /// 1.0 for the active section, lower to dim.
    pub(crate) brightness: f32,
}

/// Nearest-neighbour sampling of `tex` into `quad`, taken at cell centres.
pub(crate) fn blit_sprite(buf: &mut CellBuffer, tex: &GlyphCanvas, quad: SpriteQuad) {
    if quad.width < 1.0 || quad.height < 1.0 || tex.w == 0 || tex.h == 0 {
        return;
    }
    let x0 = quad.left.round().max(0.0) as i32;
    let y0 = quad.top.round().max(0.0) as i32;
    let x1 = ((quad.left + quad.width).round() as i32).min(buf.w as i32);
    let y1 = ((quad.top + quad.height).round() as i32).min(buf.h as i32);

    for cy in y0..y1 {
        let v = (cy as f32 - quad.top.round() + 0.5) / quad.height;
        let ty = (v * tex.h as f32).floor();
        if ty < 0.0 || ty >= tex.h as f32 {
            continue;
        }
        for cx in x0..x1 {
            let u = (cx as f32 - quad.left.round() + 0.5) / quad.width;
            let tx = (u * tex.w as f32).floor();
            if tx < 0.0 || tx >= tex.w as f32 {
                continue;
            }
            let Some(t) = tex.get(tx as u32, ty as u32) else {
                continue;
            };
            buf.set(
                cx as u16,
                cy as u16,
                Cell {
                    ch: t.ch,
                    fg: t.fg.scale(quad.brightness).to_color(),
                    bg: t.bg.scale(quad.brightness).to_color(),
                    bold: t.bold && quad.brightness >= 1.0,
                },
            );
        }
    }
}

/* -----------------------------
   Terminal
------------------------------ */

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    pub(crate) dots: DotLayer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            dots: DotLayer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        self.dots = DotLayer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_bold = false;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if c.bold != last_bold {
                    if c.bold {
                        queue!(self.out, SetAttribute(Attribute::Bold))?;
                    } else {
                        queue!(self.out, SetAttribute(Attribute::NormalIntensity))?;
                    }
                    last_bold = c.bold;
                }
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}
