use crate::billboard::{fit_sprite, ViewportPx};
use crate::math::{circle_point, Camera, Vec3};
use crate::render::{blit_sprite, CellBuffer, DotLayer, Rgb, SpriteQuad, TexturePool, CELL_ASPECT};
use crate::scroll::{GesturePhase, ScrollController};
use crate::section::Sections;
use crossterm::style::Color;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f32::consts::{PI, TAU};

pub(crate) const MARKER_RADIUS: f32 = 8.0;
const STAR_MIN_R: f32 = 20.0;
const STAR_MAX_R: f32 = 140.0;
const STAR_SPIN: f32 = 0.02;
const RING_RADIUS: f32 = 1.0;
const RING_DROP: f32 = 1.1;
const RING_POINTS: usize = 40;
const BOB_AMPLITUDE: f32 = 0.2;
const BOB_RATE: f32 = 0.5;
const INACTIVE_BRIGHTNESS: f32 = 0.35;

pub(crate) const SKY: Color = Color::Rgb { r: 0, g: 0, b: 0 };
const STAR_TINT: Rgb = Rgb::new(235, 240, 255);
const RING_TINT: Rgb = Rgb::new(255, 255, 255);
pub(crate) const GOLD: Rgb = Rgb::new(0xFF, 0xD1, 0x66);
pub(crate) const CYAN: Rgb = Rgb::new(0x4C, 0xC9, 0xF0);

pub(crate) fn marker_color(index: usize) -> Rgb {
    if index == 0 {
        GOLD
    } else {
        CYAN
    }
}

pub(crate) fn marker_position(index: usize) -> Vec3 {
    circle_point(crate::camera::section_angle(index), MARKER_RADIUS)
}

/// Viewport in column-width units, so both axes share a scale.
pub(crate) fn viewport_units(cols: u16, rows: u16) -> ViewportPx {
    ViewportPx {
        width: cols as f32,
        height: rows as f32 * CELL_ASPECT,
    }
}

/// Canvas texels for a section sprite: `dpr` texels per cell when the sprite
/// covers `fraction` of the screen. Both sides are whole multiples of `dpr`.
pub(crate) fn canvas_size(cols: u16, rows: u16, dpr: f32, fraction: f32) -> (u32, u32) {
    let cell = if dpr.is_finite() { dpr.round().max(1.0) } else { 1.0 };
    let w = (cols as f32 * fraction).round().max(1.0) * cell;
    let h = (rows as f32 * fraction).round().max(1.0) * cell;
    (w as u32, h as u32)
}

/* -----------------------------
   Starfield
------------------------------ */

pub(crate) struct Starfield {
    stars: Vec<Vec3>,
    angle: f32,
}

impl Starfield {
    /// Uniform directions on a spherical shell.
    pub(crate) fn new(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let stars = (0..count)
            .map(|_| {
                let r = rng.gen_range(STAR_MIN_R..STAR_MAX_R);
                let theta = rng.gen_range(0.0..TAU);
                let phi = (rng.gen_range(-1.0f32..1.0)).acos();
                Vec3::new(
                    r * phi.sin() * theta.cos(),
                    r * phi.sin() * theta.sin(),
                    r * phi.cos(),
                )
            })
            .collect();
        Self { stars, angle: 0.0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.stars.len()
    }

    pub(crate) fn update(&mut self, dt: f32) {
        self.angle = (self.angle + dt * STAR_SPIN) % TAU;
    }

    pub(crate) fn points(&self) -> impl Iterator<Item = Vec3> + '_ {
        let a = self.angle;
        self.stars.iter().map(move |s| s.rot_y(a))
    }

    pub(crate) fn draw(&self, dots: &mut DotLayer, cam: &Camera) {
        let (sw, sh) = (dots.sw as f32, dots.sh as f32);
        for p in self.points() {
            let Some(pr) = cam.project(p, sw, sh) else {
                continue;
            };
            let b = (1.2 - pr.depth / STAR_MAX_R).clamp(0.3, 1.0);
            dots.deposit(pr.x, pr.y, b, STAR_TINT);
        }
    }
}

/* -----------------------------
   Sprites
------------------------------ */

#[derive(Clone, Copy, Debug)]
pub(crate) struct PlacedSprite {
    pub(crate) section: usize,
    pub(crate) quad: SpriteQuad,
    pub(crate) depth: f32,
}

/// Screen quad for a billboard of world size `scale` centred on `pos`.
pub(crate) fn place_sprite(
    cam: &Camera,
    pos: Vec3,
    scale: (f32, f32),
    cols: u16,
    rows: u16,
) -> Option<(SpriteQuad, f32)> {
    let vp = viewport_units(cols, rows);
    let pr = cam.project(pos, vp.width, vp.height)?;
    let focal = cam.focal(vp.height);
    let w = scale.0 * focal / pr.depth;
    let h = scale.1 * focal / pr.depth / CELL_ASPECT;
    let cx = pr.x;
    let cy = pr.y / CELL_ASPECT;
    Some((
        SpriteQuad {
            left: cx - w * 0.5,
            top: cy - h * 0.5,
            width: w,
            height: h,
            brightness: 1.0,
        },
        pr.depth,
    ))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Scrollbar {
    pub(crate) x: u16,
    pub(crate) top: u16,
    pub(crate) len: u16,
    pub(crate) thumb_top: u16,
    pub(crate) thumb_len: u16,
    pub(crate) moving: bool,
}

/// Track beside the right edge of `quad` with a thumb sized to the visible
/// share of the content. `None` when there is nothing to scroll.
pub(crate) fn scrollbar(quad: &SpriteQuad, scroll: &ScrollController) -> Option<Scrollbar> {
    if !scroll.scrollable() || quad.height < 3.0 {
        return None;
    }
    let len = (quad.height * 0.8).round().max(2.0);
    let top = (quad.top + (quad.height - len) * 0.5).round().max(0.0);
    let x = (quad.left + quad.width + 1.0).round().max(0.0);
    let share = scroll.visible_height() / scroll.content_height().max(1.0);
    let thumb_len = (len * share).round().clamp(1.0, len);
    let max = scroll.max_scroll().max(1e-3);
    let t = (scroll.current() / max).clamp(0.0, 1.0);
    let thumb_top = top + ((len - thumb_len) * t).round();
    Some(Scrollbar {
        x: x as u16,
        top: top as u16,
        len: len as u16,
        thumb_top: thumb_top as u16,
        thumb_len: thumb_len as u16,
        moving: scroll.phase() != GesturePhase::Idle,
    })
}

fn draw_scrollbar(buf: &mut CellBuffer, bar: Scrollbar) {
    if bar.x >= buf.w {
        return;
    }
    for y in bar.top..bar.top.saturating_add(bar.len) {
        let Some(mut cell) = buf.get(bar.x, y) else {
            continue;
        };
        let on_thumb = y >= bar.thumb_top && y < bar.thumb_top + bar.thumb_len;
        if on_thumb {
            cell.ch = '┃';
            cell.fg = if bar.moving { CYAN } else { CYAN.scale(0.8) }.to_color();
        } else {
            cell.ch = '│';
            cell.fg = Rgb::new(70, 74, 84).to_color();
        }
        buf.set(bar.x, y, cell);
    }
}

/* -----------------------------
   Scene
------------------------------ */

pub(crate) struct Scene {
    stars: Starfield,
    time: f32,
    fraction: f32,
}

impl Scene {
    pub(crate) fn new(star_count: usize, seed: u64, fraction: f32) -> Self {
        Self {
            stars: Starfield::new(star_count, seed),
            time: 0.0,
            fraction,
        }
    }

    pub(crate) fn fraction(&self) -> f32 {
        self.fraction
    }

    pub(crate) fn update(&mut self, dt: f32) {
        self.time += dt;
        self.stars.update(dt);
    }

    fn bob(&self, index: usize) -> f32 {
        (self.time * BOB_RATE + index as f32 * PI * 0.5).sin() * BOB_AMPLITUDE
    }

    /// Eases each section's billboard toward its fitted size and returns the
    /// visible sprites sorted far to near.
    pub(crate) fn place_sprites(
        &self,
        sections: &mut Sections,
        cam: &Camera,
        cols: u16,
        rows: u16,
        canvas_aspect: f32,
        dt: f32,
    ) -> Vec<PlacedSprite> {
        let vp = viewport_units(cols, rows);
        // Canvas texels are cells, so its physical aspect shrinks by the cell aspect.
        let physical_aspect = canvas_aspect / CELL_ASPECT;
        let mut placed = Vec::new();
        for st in sections.states_mut() {
            let pos = marker_position(st.index);
            let distance = cam.eye.distance(pos);
            let target = fit_sprite(physical_aspect, distance, cam.fov_deg, vp, self.fraction);
            st.billboard.approach(target, dt);
            let Some((mut quad, depth)) = place_sprite(cam, pos, (st.billboard.w, st.billboard.h), cols, rows)
            else {
                continue;
            };
            quad.brightness = if st.active { 1.0 } else { INACTIVE_BRIGHTNESS };
            placed.push(PlacedSprite {
                section: st.index,
                quad,
                depth,
            });
        }
        placed.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        placed
    }

    fn draw_rings(&self, dots: &mut DotLayer, cam: &Camera) {
        let (sw, sh) = (dots.sw as f32, dots.sh as f32);
        for i in 0..crate::content::SECTION_COUNT {
            let base = marker_position(i);
            for k in 0..RING_POINTS {
                let a = k as f32 / RING_POINTS as f32 * TAU;
                let p = base + Vec3::new(a.cos() * RING_RADIUS, -RING_DROP, a.sin() * RING_RADIUS);
                if let Some(pr) = cam.project(p, sw, sh) {
                    dots.deposit(pr.x, pr.y, 0.2, RING_TINT);
                }
            }
        }
    }

    fn draw_marker_glyphs(&self, buf: &mut CellBuffer, cam: &Camera) {
        let vp = viewport_units(buf.w, buf.h);
        for i in 0..crate::content::SECTION_COUNT {
            let p = marker_position(i) + Vec3::new(0.0, self.bob(i), 0.0);
            let Some(pr) = cam.project(p, vp.width, vp.height) else {
                continue;
            };
            let (x, y) = (pr.x.round(), (pr.y / CELL_ASPECT).round());
            if x < 0.0 || y < 0.0 || x >= buf.w as f32 || y >= buf.h as f32 {
                continue;
            }
            let mut cell = buf.get(x as u16, y as u16).unwrap_or_default();
            cell.ch = '◆';
            cell.fg = marker_color(i).to_color();
            cell.bold = true;
            buf.set(x as u16, y as u16, cell);
        }
    }

    /// Paints stars, markers, sprites and the active scrollbar into `buf`.
    pub(crate) fn draw(
        &self,
        buf: &mut CellBuffer,
        dots: &mut DotLayer,
        pool: &TexturePool,
        sections: &Sections,
        cam: &Camera,
        sprites: &[PlacedSprite],
    ) {
        buf.clear(SKY);
        dots.clear();
        self.stars.draw(dots, cam);
        self.draw_rings(dots, cam);
        dots.composite(buf, SKY);
        self.draw_marker_glyphs(buf, cam);

        for s in sprites {
            let Some(tex) = sections.texture_handle(s.section).and_then(|id| pool.get(id)) else {
                continue;
            };
            blit_sprite(buf, tex, s.quad);
        }

        let active = sections.active();
        let Some(sprite) = sprites.iter().find(|s| s.section == active) else {
            return;
        };
        if let Some(bar) = sections
            .state(active)
            .and_then(|st| scrollbar(&sprite.quad, &st.scroll))
        {
            draw_scrollbar(buf, bar);
        }
    }

    pub(crate) fn star_count(&self) -> usize {
        self.stars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{section_viewpoint, FOV_DEG};
    use crate::math::ORIGIN;
    use crate::scroll::{PointerEvent, ScrollTuning};

    fn cam_at(i: usize) -> Camera {
        Camera {
            eye: section_viewpoint(i),
            target: ORIGIN,
            fov_deg: FOV_DEG,
        }
    }

    #[test]
    fn stars_fill_the_shell() {
        let sf = Starfield::new(500, 3);
        assert_eq!(sf.len(), 500);
        for p in sf.points() {
            let r = p.len();
            assert!(r >= STAR_MIN_R - 1e-3 && r <= STAR_MAX_R + 1e-3);
        }
    }

    #[test]
    fn rotation_keeps_star_distance() {
        let mut sf = Starfield::new(50, 9);
        let before: Vec<f32> = sf.points().map(|p| p.len()).collect();
        sf.update(10.0);
        let after: Vec<f32> = sf.points().map(|p| p.len()).collect();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn markers_colour_and_circle() {
        assert_eq!(marker_color(0), GOLD);
        assert_eq!(marker_color(3), CYAN);
        for i in 0..4 {
            assert!((marker_position(i).len() - MARKER_RADIUS).abs() < 1e-3);
        }
    }

    #[test]
    fn settled_active_sprite_maps_texels_to_cells() {
        let (cols, rows) = (120u16, 40u16);
        let fraction = 0.9;
        let (cw, ch) = canvas_size(cols, rows, 1.0, fraction);
        let cam = cam_at(1);
        let pos = marker_position(1);
        let d = cam.eye.distance(pos);
        let vp = viewport_units(cols, rows);
        let scale = fit_sprite(cw as f32 / ch as f32 / CELL_ASPECT, d, FOV_DEG, vp, fraction);
        let (quad, depth) = place_sprite(&cam, pos, scale, cols, rows).unwrap();
        assert!((depth - 8.0).abs() < 1e-3);
        assert!((quad.width - cw as f32).abs() < 0.6);
        assert!((quad.height - ch as f32).abs() < 0.6);
        assert!((quad.left + quad.width * 0.5 - cols as f32 * 0.5).abs() < 0.5);
    }

    fn settled_screen_text(dpr: f32) -> Vec<String> {
        use crate::section::CanvasSpec;
        use crate::texture::{tests::CountingBackend, SectionTexture};

        let (cols, rows) = (120u16, 40u16);
        let fraction = 0.9;
        let (w, h) = canvas_size(cols, rows, dpr, fraction);
        let canvas = CanvasSpec {
            w,
            h,
            dpr,
            more_room: true,
        };
        let projects = crate::content::builtin_sections().remove(2);
        let mut backend = CountingBackend::default();
        let mut tex = SectionTexture::new();
        tex.redraw(&mut backend, &projects, &canvas.params(&projects), 0.0)
            .unwrap();

        let cam = cam_at(2);
        let pos = marker_position(2);
        let vp = viewport_units(cols, rows);
        let d = cam.eye.distance(pos);
        let scale = fit_sprite(canvas.aspect() / CELL_ASPECT, d, FOV_DEG, vp, fraction);
        let (quad, _) = place_sprite(&cam, pos, scale, cols, rows).unwrap();

        let mut buf = CellBuffer::new(cols, rows);
        blit_sprite(&mut buf, tex.canvas(), quad);
        tex.release(&mut backend);
        (0..rows)
            .map(|y| (0..cols).map(|x| buf.get(x, y).unwrap().ch).collect())
            .collect()
    }

    #[test]
    fn settled_sprite_text_reads_the_same_at_any_density() {
        for dpr in [1.0, 2.0, 3.0] {
            let screen = settled_screen_text(dpr);
            assert!(
                screen.iter().any(|r| r.contains("Here are some of my projects:")),
                "dpr {dpr}: {screen:#?}"
            );
        }
        assert_eq!(settled_screen_text(1.0), settled_screen_text(2.0));
    }

    #[test]
    fn canvas_is_whole_cells_of_texels() {
        assert_eq!(canvas_size(121, 41, 1.0, 0.9), (109, 37));
        assert_eq!(canvas_size(121, 41, 2.0, 0.9), (218, 74));
        assert_eq!(canvas_size(121, 41, 2.4, 0.9), (218, 74));
    }

    #[test]
    fn sprites_sort_far_to_near_and_dim_inactive() {
        let mut sections = Sections::new(crate::content::builtin_sections(), 0, ScrollTuning::default());
        let scene = Scene::new(0, 1, 0.9);
        let cam = cam_at(0);
        let placed = scene.place_sprites(&mut sections, &cam, 120, 40, 108.0 / 36.0, 0.016);
        assert!(placed.windows(2).all(|w| w[0].depth >= w[1].depth));
        let last = placed.last().unwrap();
        assert_eq!(last.section, 0);
        assert_eq!(last.quad.brightness, 1.0);
        assert!(placed[..placed.len() - 1]
            .iter()
            .all(|s| s.quad.brightness < 1.0));
    }

    #[test]
    fn scrollbar_only_when_overflowing() {
        let quad = SpriteQuad {
            left: 10.0,
            top: 5.0,
            width: 60.0,
            height: 20.0,
            brightness: 1.0,
        };
        let mut scroll = ScrollController::new(ScrollTuning::default());
        scroll.set_extent(10.0, 16.0);
        assert!(scrollbar(&quad, &scroll).is_none());

        scroll.set_extent(64.0, 16.0);
        let top = scrollbar(&quad, &scroll).unwrap();
        assert_eq!(top.x, 71);
        assert_eq!(top.thumb_top, top.top);
        assert_eq!(top.thumb_len, 4);

        scroll.handle(PointerEvent::Wheel { delta_y: 1000.0 });
        for _ in 0..600 {
            scroll.update(1.0 / 60.0);
        }
        let bottom = scrollbar(&quad, &scroll).unwrap();
        assert_eq!(bottom.thumb_top + bottom.thumb_len, bottom.top + bottom.len);
    }
}
