use crate::render::{draw_text, pad_to, CellBuffer, Rgb};
use crate::section::ShellNotice;
use crossterm::style::Color;

const BAR_BG: Rgb = Rgb::new(16, 18, 26);
const BAR_FG: Rgb = Rgb::new(170, 176, 190);
const ACTIVE_BG: Rgb = Rgb::new(0x4C, 0xC9, 0xF0);
const ACTIVE_FG: Rgb = Rgb::new(10, 12, 18);
const HINT_FG: Rgb = Rgb::new(140, 146, 160);
const BUTTON_GAP: u16 = 2;

/// Content ending below this fraction of the viewport counts as "more below".
const HINT_END_FRACTION: f32 = 0.95;

const HELP_LINES: [&str; 8] = [
    "starfolio",
    "",
    "←/→  1-4   change section",
    "wheel / drag   scroll",
    "drag sideways  swipe",
    "click header   jump",
    "h   toggle help",
    "q / esc   quit",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ButtonSpan {
    pub(crate) section: usize,
    pub(crate) x0: u16,
    pub(crate) x1: u16,
}

fn label(title: &str) -> String {
    format!(" {title} ")
}

/// Header buttons laid out centred on row 0. Spans saturate at `u16::MAX`
/// rather than wrap when titles run past the screen.
pub(crate) fn button_spans(titles: &[&str], cols: u16) -> Vec<ButtonSpan> {
    let widths: Vec<u16> = titles
        .iter()
        .map(|t| u16::try_from(label(t).chars().count()).unwrap_or(u16::MAX))
        .collect();
    let total = widths
        .iter()
        .fold(0u16, |acc, w| acc.saturating_add(*w))
        .saturating_add(BUTTON_GAP.saturating_mul(widths.len().saturating_sub(1) as u16));
    let mut x = cols.saturating_sub(total) / 2;
    let mut out = Vec::with_capacity(widths.len());
    for (section, w) in widths.into_iter().enumerate() {
        out.push(ButtonSpan {
            section,
            x0: x,
            x1: x.saturating_add(w),
        });
        x = x.saturating_add(w).saturating_add(BUTTON_GAP);
    }
    out
}

/// Navigation chrome around the scene: header buttons, scroll hint and help.
#[derive(Clone, Debug)]
pub(crate) struct NavShell {
    titles: Vec<String>,
    scroll_hint: bool,
    content_end: f32,
    help: bool,
}

impl NavShell {
    pub(crate) fn new(titles: Vec<String>) -> Self {
        Self {
            titles,
            scroll_hint: false,
            content_end: 1.0,
            help: false,
        }
    }

    fn title_refs(&self) -> Vec<&str> {
        self.titles.iter().map(String::as_str).collect()
    }

    pub(crate) fn header_height(&self) -> u16 {
        1
    }

    /// Section whose header button covers (x, y), if any.
    pub(crate) fn hit_test(&self, cols: u16, x: u16, y: u16) -> Option<usize> {
        if y >= self.header_height() {
            return None;
        }
        button_spans(&self.title_refs(), cols)
            .into_iter()
            .find(|b| x >= b.x0 && x < b.x1)
            .map(|b| b.section)
    }

    /// Accepts notices about the active section only.
    pub(crate) fn apply(&mut self, active: usize, notice: ShellNotice) {
        match notice {
            ShellNotice::Scrollable {
                section,
                scrollable,
            } if section == active => self.scroll_hint = scrollable,
            ShellNotice::ContentEnd { section, fraction } if section == active => {
                self.content_end = fraction
            }
            _ => {}
        }
    }

    /// Hint shows while the active section can scroll and its content
    /// continues past the bottom of the viewport.
    pub(crate) fn shows_hint(&self) -> bool {
        self.scroll_hint && self.content_end >= HINT_END_FRACTION
    }

    pub(crate) fn help_open(&self) -> bool {
        self.help
    }

    pub(crate) fn toggle_help(&mut self) {
        self.help = !self.help;
    }

    pub(crate) fn close_help(&mut self) {
        self.help = false;
    }

    pub(crate) fn draw(&self, buf: &mut CellBuffer, active: usize) {
        let bar_bg = BAR_BG.to_color();
        let blank = " ".repeat(buf.w as usize);
        draw_text(buf, 0, 0, &blank, BAR_FG.to_color(), bar_bg, false);
        let titles = self.title_refs();
        for b in button_spans(&titles, buf.w) {
            let text = label(titles[b.section]);
            if b.section == active {
                draw_text(buf, b.x0, 0, &text, ACTIVE_FG.to_color(), ACTIVE_BG.to_color(), true);
            } else {
                draw_text(buf, b.x0, 0, &text, BAR_FG.to_color(), bar_bg, false);
            }
        }

        if self.shows_hint() && buf.h > 2 {
            let hint = "scroll ↓";
            let x = (buf.w / 2).saturating_sub(hint.chars().count() as u16 / 2);
            draw_text(buf, x, buf.h - 1, hint, HINT_FG.to_color(), Color::Black, false);
        }

        if self.help {
            draw_help(buf);
        }
    }
}

fn draw_help(buf: &mut CellBuffer) {
    let inner = HELP_LINES.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    let h = HELP_LINES.len() as u16 + 2;
    let x = (buf.w.saturating_sub(inner as u16)) / 2;
    let y = (buf.h.saturating_sub(h)) / 2;
    let fg = BAR_FG.to_color();
    let bg = BAR_BG.to_color();

    let edge = format!("+{}+", "-".repeat(inner.saturating_sub(2)));
    draw_text(buf, x, y, &edge, fg, bg, false);
    for (i, line) in HELP_LINES.iter().enumerate() {
        let row = format!("| {} |", pad_to(line, inner.saturating_sub(4)));
        draw_text(buf, x, y + 1 + i as u16, &row, fg, bg, i == 0);
    }
    draw_text(buf, x, y + h - 1, &edge, fg, bg, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SECTION_TITLES;

    fn shell() -> NavShell {
        NavShell::new(SECTION_TITLES.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn buttons_are_centred_and_hit_tested() {
        let spans = button_spans(&SECTION_TITLES, 80);
        assert_eq!(spans.len(), 4);
        let left = spans[0].x0;
        let right = 80 - spans[3].x1;
        assert!(left.abs_diff(right) <= 1);

        let s = shell();
        assert_eq!(s.hit_test(80, spans[2].x0, 0), Some(2));
        assert_eq!(s.hit_test(80, spans[2].x1 - 1, 0), Some(2));
        assert_eq!(s.hit_test(80, spans[2].x1, 0), None);
        assert_eq!(s.hit_test(80, spans[2].x0, 1), None);
    }

    #[test]
    fn oversized_titles_saturate_instead_of_wrapping() {
        let huge = "x".repeat(70_000);
        let titles = [huge.as_str(), "B", "C", "D"];
        let spans = button_spans(&titles, 80);
        assert_eq!(spans[0].x0, 0);
        assert_eq!(spans[0].x1, u16::MAX);
        assert!(spans.windows(2).all(|w| w[0].x1 <= w[1].x0 || w[1].x0 == u16::MAX));

        let s = NavShell::new(titles.iter().map(|t| t.to_string()).collect());
        let mut buf = CellBuffer::new(40, 5);
        s.draw(&mut buf, 0);
        assert_eq!(s.hit_test(40, 10, 0), Some(0));
    }

    #[test]
    fn hint_follows_active_section_notices() {
        let mut s = shell();
        s.apply(1, ShellNotice::Scrollable { section: 1, scrollable: true });
        assert!(s.shows_hint());
        s.apply(1, ShellNotice::ContentEnd { section: 1, fraction: 0.6 });
        assert!(!s.shows_hint());
        s.apply(1, ShellNotice::ContentEnd { section: 0, fraction: 1.0 });
        assert!(!s.shows_hint());
        s.apply(1, ShellNotice::ContentEnd { section: 1, fraction: 1.0 });
        s.apply(1, ShellNotice::Scrollable { section: 2, scrollable: false });
        assert!(s.shows_hint());
    }

    #[test]
    fn header_marks_active_button() {
        let s = shell();
        let mut buf = CellBuffer::new(60, 10);
        s.draw(&mut buf, 2);
        let row: String = (0..60).map(|x| buf.get(x, 0).unwrap().ch).collect();
        for t in SECTION_TITLES {
            assert!(row.contains(t));
        }
        let span = button_spans(&SECTION_TITLES, 60)[2];
        assert!(buf.get(span.x0 + 1, 0).unwrap().bold);
        let other = button_spans(&SECTION_TITLES, 60)[0];
        assert!(!buf.get(other.x0 + 1, 0).unwrap().bold);
    }

    #[test]
    fn help_overlay_toggles() {
        let mut s = shell();
        assert!(!s.help_open());
        s.toggle_help();
        assert!(s.help_open());
        let mut buf = CellBuffer::new(60, 20);
        s.draw(&mut buf, 0);
        let text: String = buf.cells.iter().map(|c| c.ch).collect();
        assert!(text.contains("toggle help"));
        s.close_help();
        assert!(!s.help_open());
    }
}
