use crate::content::Section;
use serde::{Deserialize, Serialize};

/* -----------------------------
   Fonts and metrics
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Font {
    /// Nominal size in canvas pixels.
    pub(crate) size: f32,
    pub(crate) bold: bool,
    /// Texels per terminal cell; glyphs snap to this grid.
    pub(crate) cell: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Center,
}

// Canvas pixels of advance per pixel of font size, before snapping to texels.
const GLYPH_ADVANCE_PER_PX: f32 = 0.6;

pub(crate) const TITLE_FONT_PX: f32 = 3.0;
const TITLE_Y_FRACTION: f32 = 0.1;
const CONTENT_START_FRACTION: f32 = 0.2;

const HEADER_WIDTH_FRACTION: f32 = 0.7;
const HEADER_FONT_DIVISOR: f32 = 1.2;
const BODY_FONT_DIVISOR: f32 = 1.6;

/// Texels one glyph advances, always a whole number of cells. Large fonts are
/// letter-spaced, since a terminal cell cannot grow.
pub(crate) fn glyph_advance(font: Font) -> f32 {
    let cell = font.cell.max(1.0);
    (font.size * GLYPH_ADVANCE_PER_PX / cell).round().max(1.0) * cell
}

pub(crate) fn measure_text(text: &str, font: Font) -> f32 {
    text.chars().count() as f32 * glyph_advance(font)
}

/// Anything text can be laid out against. Drawing and measure-only passes run
/// the same layout code; only `fill_text` differs.
pub(crate) trait TextSurface {
    fn measure(&self, text: &str, font: Font) -> f32 {
        measure_text(text, font)
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, align: Align);
}

pub(crate) struct MeasureOnly;

impl TextSurface for MeasureOnly {
    fn fill_text(&mut self, _text: &str, _x: f32, _y: f32, _font: Font, _align: Align) {}
}

/* -----------------------------
   Room policy
------------------------------ */

pub(crate) const WIDTH_BREAKPOINT_PX: f32 = 1000.0;
pub(crate) const AREA_BREAKPOINT_PX2: f32 = 400_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RoomPolicy {
    Width,
    Area,
    Either,
}

impl RoomPolicy {
    /// `w`/`h` are the viewport's nominal pixel size.
    pub(crate) fn more_room(self, w: f32, h: f32) -> bool {
        let wide = w > WIDTH_BREAKPOINT_PX;
        let large = w * h > AREA_BREAKPOINT_PX2;
        match self {
            RoomPolicy::Width => wide,
            RoomPolicy::Area => large,
            RoomPolicy::Either => wide || large,
        }
    }
}

/* -----------------------------
   Layout
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LayoutParams {
    pub(crate) canvas_w: u32,
    pub(crate) canvas_h: u32,
    pub(crate) dpr: f32,
    pub(crate) line_height_factor: f32,
    pub(crate) more_room: bool,
}

impl LayoutParams {
    /// Whole texels per cell.
    pub(crate) fn dpr(&self) -> f32 {
        if self.dpr.is_finite() {
            self.dpr.round().max(1.0)
        } else {
            1.0
        }
    }

    pub(crate) fn logical_height(&self) -> f32 {
        self.canvas_h as f32 / self.dpr()
    }

    /// Less room means relatively larger text.
    pub(crate) fn room_scale(&self) -> f32 {
        if self.more_room {
            1.0
        } else {
            0.75
        }
    }

    /// Line step in canvas pixels, snapped to whole cells.
    pub(crate) fn line_height(&self) -> f32 {
        let logical = (self.line_height_factor * self.logical_height()).round().max(1.0);
        (logical / self.room_scale()).round().max(1.0) * self.dpr()
    }

    pub(crate) fn header_font(&self) -> Font {
        Font {
            size: self.line_height() / HEADER_FONT_DIVISOR,
            bold: true,
            cell: self.dpr(),
        }
    }

    pub(crate) fn body_font(&self) -> Font {
        Font {
            size: self.line_height() / BODY_FONT_DIVISOR,
            bold: false,
            cell: self.dpr(),
        }
    }

    pub(crate) fn title_font(&self) -> Font {
        Font {
            size: TITLE_FONT_PX * self.dpr(),
            bold: true,
            cell: self.dpr(),
        }
    }

    pub(crate) fn body_margin(&self) -> f32 {
        let frac = if self.more_room { 0.15 } else { 0.25 };
        (frac * self.canvas_w as f32).round()
    }

    pub(crate) fn body_max_width(&self) -> f32 {
        let frac = if self.more_room { 0.7 } else { 0.5 };
        frac * self.canvas_w as f32
    }

    pub(crate) fn header_max_width(&self) -> f32 {
        HEADER_WIDTH_FRACTION * self.canvas_w as f32
    }

    /// Title baseline in canvas pixels, before scrolling.
    pub(crate) fn title_y(&self) -> f32 {
        (self.logical_height() * TITLE_Y_FRACTION).round() * self.dpr()
    }

    /// Logical y where the body starts, before scrolling.
    pub(crate) fn content_start_y(&self) -> f32 {
        (self.logical_height() * CONTENT_START_FRACTION).round()
    }

    /// Logical height of the body viewport below the title.
    pub(crate) fn visible_height(&self) -> f32 {
        (self.logical_height() - self.content_start_y()).max(0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WrappedLine {
    pub(crate) text: String,
    pub(crate) x: f32,
    /// Offset from the top of the body, canvas pixels.
    pub(crate) y: f32,
    pub(crate) font: Font,
    pub(crate) align: Align,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct LayoutResult {
    pub(crate) lines: Vec<WrappedLine>,
    /// Canvas pixels.
    pub(crate) content_height: f32,
    /// Logical pixels.
    pub(crate) content_start_y: f32,
}

impl LayoutResult {
    pub(crate) fn logical_content_height(&self, dpr: f32) -> f32 {
        self.content_height / dpr.max(1e-3)
    }
}

/// Greedy word wrap. Leading indentation stays on the first wrapped line and
/// a word that does not fit on its own is never split.
pub(crate) fn wrap_words<S: TextSurface + ?Sized>(
    surface: &S,
    text: &str,
    font: Font,
    max_width: f32,
) -> Vec<String> {
    let indent_len = text.len() - text.trim_start().len();
    let mut out = Vec::new();
    let mut line = text[..indent_len].to_string();
    let mut has_word = false;

    for word in text.split_whitespace() {
        let candidate = if has_word {
            format!("{line} {word}")
        } else {
            format!("{line}{word}")
        };
        if has_word && surface.measure(&candidate, font) > max_width {
            out.push(std::mem::take(&mut line));
            line = word.to_string();
        } else {
            line = candidate;
        }
        has_word = true;
    }
    out.push(line.trim_end().to_string());
    out
}

/// Lays out every line of `section` starting at canvas y `origin_y`, painting
/// through `surface` as it goes. Returns the wrapped lines and the height they
/// consumed.
pub(crate) fn layout_block<S: TextSurface + ?Sized>(
    surface: &mut S,
    section: &Section,
    params: &LayoutParams,
    origin_y: f32,
) -> LayoutResult {
    let lh = params.line_height();
    let mut cursor = origin_y;
    let mut lines = Vec::new();

    for (i, src) in section.lines.iter().enumerate() {
        let (font, x, align, max_w) = if section.header_at(i) {
            (
                params.header_font(),
                (params.canvas_w as f32 * 0.5).round(),
                Align::Center,
                params.header_max_width(),
            )
        } else {
            (
                params.body_font(),
                params.body_margin(),
                Align::Left,
                params.body_max_width(),
            )
        };

        let wrapped = wrap_words(surface, src, font, max_w);
        for (n, text) in wrapped.iter().enumerate() {
            let y = cursor + n as f32 * lh;
            surface.fill_text(text, x, y, font, align);
            lines.push(WrappedLine {
                text: text.clone(),
                x,
                y: y - origin_y,
                font,
                align,
            });
        }
        cursor += wrapped.len() as f32 * lh;
    }

    LayoutResult {
        lines,
        content_height: cursor - origin_y,
        content_start_y: params.content_start_y(),
    }
}

pub(crate) fn measure_block(section: &Section, params: &LayoutParams) -> LayoutResult {
    layout_block(&mut MeasureOnly, section, params, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::builtin_sections;

    fn params(w: u32, h: u32, more_room: bool) -> LayoutParams {
        LayoutParams {
            canvas_w: w,
            canvas_h: h,
            dpr: 1.0,
            line_height_factor: 0.02,
            more_room,
        }
    }

    struct Recorder {
        drawn: Vec<(String, f32, f32)>,
    }

    impl TextSurface for Recorder {
        fn fill_text(&mut self, text: &str, x: f32, y: f32, _font: Font, _align: Align) {
            self.drawn.push((text.to_string(), x, y));
        }
    }

    #[test]
    fn wrapped_lines_fit_the_allowed_width() {
        let font = Font { size: 1.0, bold: false, cell: 1.0 };
        let text = "the quick brown fox jumps over the lazy dog and keeps on running";
        let lines = wrap_words(&MeasureOnly, text, font, 20.0);
        assert!(lines.len() > 1);
        for l in &lines {
            assert!(measure_text(l, font) <= 20.0, "{l:?}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn overlong_word_stays_on_its_own_line() {
        let font = Font { size: 1.0, bold: false, cell: 1.0 };
        let lines = wrap_words(&MeasureOnly, "a supercalifragilistic b", font, 6.0);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn rewrapping_wrapped_output_is_stable() {
        let font = Font { size: 1.0, bold: false, cell: 1.0 };
        for s in builtin_sections() {
            for src in &s.lines {
                let once = wrap_words(&MeasureOnly, src, font, 48.0);
                for line in &once {
                    let again = wrap_words(&MeasureOnly, line, font, 48.0);
                    assert_eq!(again, vec![line.clone()]);
                }
            }
        }
    }

    #[test]
    fn indentation_is_kept_on_first_line() {
        let font = Font { size: 1.0, bold: false, cell: 1.0 };
        let lines = wrap_words(&MeasureOnly, "    - one two three four", font, 14.0);
        assert_eq!(lines[0], "    - one two");
        assert_eq!(lines[1], "three four");
    }

    #[test]
    fn measure_only_matches_draw_height() {
        for dpr in [1.0, 2.0] {
            for s in builtin_sections() {
                let p = LayoutParams {
                    dpr,
                    line_height_factor: s.line_height_factor,
                    ..params((120.0 * dpr) as u32, (45.0 * dpr) as u32, true)
                };
                let measured = measure_block(&s, &p);
                let mut rec = Recorder { drawn: Vec::new() };
                let drawn = layout_block(&mut rec, &s, &p, 37.0);
                assert!((measured.content_height - drawn.content_height).abs() <= 1.0);
                assert_eq!(rec.drawn.len(), measured.lines.len());
            }
        }
    }

    #[test]
    fn blank_lines_consume_a_line_height() {
        let mut s = builtin_sections().remove(0);
        s.lines = vec![String::new(), String::new(), "x".into()];
        s.is_header = vec![false; 3];
        let p = params(100, 50, true);
        let r = measure_block(&s, &p);
        assert_eq!(r.lines.len(), 3);
        assert_eq!(r.content_height, 3.0 * p.line_height());
    }

    #[test]
    fn headers_centre_and_body_uses_margin() {
        let s = builtin_sections().remove(1);
        let p = params(100, 50, true);
        let r = measure_block(&s, &p);
        let header = r.lines.iter().find(|l| l.text == "Programming Languages").unwrap();
        assert_eq!(header.align, Align::Center);
        assert_eq!(header.x, 50.0);
        assert!(header.font.bold);
        let body = &r.lines[0];
        assert_eq!(body.align, Align::Left);
        assert_eq!(body.x, 15.0);

        let tight = params(100, 50, false);
        assert_eq!(tight.body_margin(), 25.0);
        assert!(tight.line_height() >= p.line_height());
    }

    #[test]
    fn room_policy_breakpoints() {
        assert!(RoomPolicy::Width.more_room(1200.0, 300.0));
        assert!(!RoomPolicy::Width.more_room(960.0, 800.0));
        assert!(RoomPolicy::Area.more_room(960.0, 800.0));
        assert!(!RoomPolicy::Area.more_room(640.0, 384.0));
        assert!(RoomPolicy::Either.more_room(960.0, 800.0));
        assert!(!RoomPolicy::Either.more_room(640.0, 384.0));
    }
}
