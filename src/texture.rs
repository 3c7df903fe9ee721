use crate::content::Section;
use crate::render::Rgb;
use crate::text::{glyph_advance, layout_block, Align, Font, LayoutParams, LayoutResult, TextSurface};
use log::{debug, warn};
use std::fmt;

const GRADIENT_FROM: Rgb = Rgb { r: 36, g: 42, b: 60 };
const GRADIENT_TO: Rgb = Rgb { r: 14, g: 16, b: 28 };
const BODY_INK: Rgb = Rgb { r: 232, g: 234, b: 240 };
const HEADER_INK: Rgb = Rgb { r: 76, g: 201, b: 240 };

/* -----------------------------
   Glyph canvas: one texel per terminal cell
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Texel {
    pub(crate) ch: char,
    pub(crate) fg: Rgb,
    pub(crate) bg: Rgb,
    pub(crate) bold: bool,
}

impl Default for Texel {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: BODY_INK,
            bg: GRADIENT_TO,
            bold: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct GlyphCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) texels: Vec<Texel>,
}

impl GlyphCanvas {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            texels: vec![Texel::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn get(&self, x: u32, y: u32) -> Option<Texel> {
        if x < self.w && y < self.h {
            Some(self.texels[self.idx(x, y)])
        } else {
            None
        }
    }

    /// Keeps the allocation when the size is unchanged.
    pub(crate) fn resize(&mut self, w: u32, h: u32) {
        if w == self.w && h == self.h {
            return;
        }
        self.w = w;
        self.h = h;
        self.texels.clear();
        self.texels
            .resize((w as usize) * (h as usize), Texel::default());
    }

    pub(crate) fn clear(&mut self) {
        self.texels.fill(Texel::default());
    }

    /// Top-left to bottom-right background gradient.
    pub(crate) fn fill_gradient(&mut self, from: Rgb, to: Rgb) {
        let span = (self.w + self.h).saturating_sub(2).max(1) as f32;
        for y in 0..self.h {
            for x in 0..self.w {
                let t = (x + y) as f32 / span;
                let i = self.idx(x, y);
                self.texels[i].bg = from.mix(to, t);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn row_text(&self, y: u32) -> String {
        (0..self.w)
            .filter_map(|x| self.get(x, y))
            .map(|t| t.ch)
            .collect()
    }
}

impl TextSurface for GlyphCanvas {
    /// Each glyph fills a `cell` x `cell` block anchored on the cell grid, so
    /// sampling anywhere inside a screen cell finds it.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, align: Align) {
        let cell = font.cell.max(1.0);
        let row = (y / cell).round() * cell;
        if row + cell <= 0.0 || row >= self.h as f32 {
            return;
        }
        let start = match align {
            Align::Left => x,
            Align::Center => x - self.measure(text, font) * 0.5,
        };
        let start = (start / cell).round() * cell;
        let adv = glyph_advance(font);
        let ink = if font.bold { HEADER_INK } else { BODY_INK };
        let span = cell as i64;
        let top = row as i64;
        for (k, ch) in text.chars().enumerate() {
            let col = (start + k as f32 * adv) as i64;
            for ty in top..top + span {
                for tx in col..col + span {
                    if tx < 0 || ty < 0 || tx >= self.w as i64 || ty >= self.h as i64 {
                        continue;
                    }
                    let i = self.idx(tx as u32, ty as u32);
                    let t = &mut self.texels[i];
                    t.ch = ch;
                    t.fg = ink;
                    t.bold = font.bold;
                }
            }
        }
    }
}

/* -----------------------------
   Rendering backend seam
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TextureId(pub(crate) u32);

pub(crate) const MAX_TEXTURE_DIM: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TextureError {
    EmptyCanvas { w: u32, h: u32 },
    TooLarge { w: u32, h: u32 },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::EmptyCanvas { w, h } => write!(f, "cannot create a {w}x{h} texture"),
            TextureError::TooLarge { w, h } => write!(
                f,
                "texture {w}x{h} exceeds the {MAX_TEXTURE_DIM}x{MAX_TEXTURE_DIM} limit"
            ),
        }
    }
}

impl std::error::Error for TextureError {}

pub(crate) trait TextureBackend {
    fn create_texture(&mut self, w: u32, h: u32) -> Result<TextureId, TextureError>;
    /// Re-uploads canvas contents into an existing texture.
    fn upload(&mut self, id: TextureId, canvas: &GlyphCanvas);
    fn release(&mut self, id: TextureId);
}

/* -----------------------------
   Per-section texture builder
------------------------------ */

#[derive(Default)]
pub(crate) struct SectionTexture {
    canvas: GlyphCanvas,
    handle: Option<TextureId>,
    built_dims: (u32, u32),
    last_drawn: Option<i32>,
    failed_dims: Option<(u32, u32)>,
}

impl SectionTexture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn handle(&self) -> Option<TextureId> {
        self.handle
    }

    #[cfg(test)]
    pub(crate) fn canvas(&self) -> &GlyphCanvas {
        &self.canvas
    }

    /// Forces the next `redraw` to repaint.
    pub(crate) fn invalidate(&mut self) {
        self.last_drawn = None;
    }

    pub(crate) fn needs_redraw(&self, scroll: f32) -> bool {
        self.last_drawn != Some(scroll.round() as i32)
    }

    /// Repaints the canvas at `scroll` (logical pixels) if the whole-pixel
    /// offset changed, and syncs the texture handle. The handle is recreated
    /// only when the canvas dimensions differ from the ones it was built with.
    pub(crate) fn redraw<B: TextureBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        section: &Section,
        params: &LayoutParams,
        scroll: f32,
    ) -> Result<Option<LayoutResult>, TextureError> {
        let dims = (params.canvas_w, params.canvas_h);
        if self.failed_dims == Some(dims) {
            return Ok(None);
        }
        let dims_changed = self.handle.is_none() || self.built_dims != dims;
        if !dims_changed && !self.needs_redraw(scroll) {
            return Ok(None);
        }

        if dims_changed {
            if let Some(old) = self.handle.take() {
                backend.release(old);
            }
            match backend.create_texture(dims.0, dims.1) {
                Ok(id) => {
                    debug!(
                        "section {} texture {:?} created at {}x{}",
                        section.index, id, dims.0, dims.1
                    );
                    self.handle = Some(id);
                    self.built_dims = dims;
                    self.failed_dims = None;
                }
                Err(e) => {
                    self.failed_dims = Some(dims);
                    return Err(e);
                }
            }
        }

        let drawn_offset = scroll.round() as i32;
        let layout = self.paint(section, params, drawn_offset as f32);
        if let Some(id) = self.handle {
            backend.upload(id, &self.canvas);
        }
        self.last_drawn = Some(drawn_offset);
        Ok(Some(layout))
    }

    fn paint(&mut self, section: &Section, params: &LayoutParams, scroll: f32) -> LayoutResult {
        let dpr = params.dpr();
        let scroll_px = scroll * dpr;
        self.canvas.resize(params.canvas_w, params.canvas_h);
        self.canvas.clear();
        self.canvas.fill_gradient(GRADIENT_FROM, GRADIENT_TO);

        let title_font = params.title_font();
        self.canvas.fill_text(
            &section.title,
            (params.canvas_w as f32 * 0.5).round(),
            params.title_y() - scroll_px,
            title_font,
            Align::Center,
        );

        let origin = params.content_start_y() * dpr - scroll_px;
        layout_block(&mut self.canvas, section, params, origin)
    }

    pub(crate) fn release<B: TextureBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(id) = self.handle.take() {
            backend.release(id);
        }
        self.last_drawn = None;
    }
}

impl Drop for SectionTexture {
    fn drop(&mut self) {
        if let Some(id) = self.handle {
            warn!("texture {id:?} dropped without release");
        }
    }
}
