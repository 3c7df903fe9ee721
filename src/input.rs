use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Duration;

/// Rows scrolled per wheel notch before sensitivity is applied.
pub(crate) const WHEEL_ROWS_PER_NOTCH: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum InputAction {
    Quit,
    /// Esc: closes the help overlay, or quits when it is already closed.
    Back,
    ToggleHelp,
    Step(i32),
    Jump(usize),
    Press { col: u16, row: u16 },
    Drag { col: u16, row: u16 },
    Release,
    /// Positive scrolls toward the end of the content.
    Wheel { notches: f32 },
    Hover { col: u16, row: u16 },
    Resize,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<Event>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        out.push(event::read()?);
        if out.len() >= 64 {
            break;
        }
    }
    Ok(out)
}

pub(crate) fn map_event(ev: &Event) -> Option<InputAction> {
    match ev {
        Event::Key(k) => map_key(k),
        Event::Mouse(m) => map_mouse(m),
        Event::Resize(..) => Some(InputAction::Resize),
        _ => None,
    }
}

fn map_key(k: &KeyEvent) -> Option<InputAction> {
    if k.kind != KeyEventKind::Press && k.kind != KeyEventKind::Repeat {
        return None;
    }
    if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(InputAction::Quit);
    }
    match k.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(InputAction::Quit),
        KeyCode::Esc => Some(InputAction::Back),
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => Some(InputAction::ToggleHelp),
        KeyCode::Left => Some(InputAction::Step(-1)),
        KeyCode::Right | KeyCode::Tab => Some(InputAction::Step(1)),
        KeyCode::BackTab => Some(InputAction::Step(-1)),
        KeyCode::Char(c @ '1'..='4') => Some(InputAction::Jump(c as usize - '1' as usize)),
        KeyCode::Down | KeyCode::Char('j') => Some(InputAction::Wheel { notches: 1.0 }),
        KeyCode::Up | KeyCode::Char('k') => Some(InputAction::Wheel { notches: -1.0 }),
        KeyCode::PageDown | KeyCode::Char(' ') => Some(InputAction::Wheel { notches: 4.0 }),
        KeyCode::PageUp => Some(InputAction::Wheel { notches: -4.0 }),
        _ => None,
    }
}

fn map_mouse(m: &MouseEvent) -> Option<InputAction> {
    let (col, row) = (m.column, m.row);
    match m.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(InputAction::Press { col, row }),
        MouseEventKind::Drag(MouseButton::Left) => Some(InputAction::Drag { col, row }),
        MouseEventKind::Up(MouseButton::Left) => Some(InputAction::Release),
        MouseEventKind::ScrollDown => Some(InputAction::Wheel { notches: 1.0 }),
        MouseEventKind::ScrollUp => Some(InputAction::Wheel { notches: -1.0 }),
        MouseEventKind::Moved => Some(InputAction::Hover { col, row }),
        _ => None,
    }
}

/// Pointer position normalised to [-1, 1] across the terminal.
pub(crate) fn normalized_pointer(col: u16, row: u16, cols: u16, rows: u16) -> (f32, f32) {
    let nx = (col as f32 + 0.5) / cols.max(1) as f32 * 2.0 - 1.0;
    let ny = (row as f32 + 0.5) / rows.max(1) as f32 * 2.0 - 1.0;
    (nx.clamp(-1.0, 1.0), ny.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn navigation_keys() {
        assert_eq!(map_event(&key(KeyCode::Right)), Some(InputAction::Step(1)));
        assert_eq!(map_event(&key(KeyCode::Left)), Some(InputAction::Step(-1)));
        assert_eq!(map_event(&key(KeyCode::Char('3'))), Some(InputAction::Jump(2)));
        assert_eq!(map_event(&key(KeyCode::Char('5'))), None);
        assert_eq!(map_event(&key(KeyCode::Char('q'))), Some(InputAction::Quit));
        assert_eq!(map_event(&key(KeyCode::Esc)), Some(InputAction::Back));
    }

    #[test]
    fn key_release_is_ignored() {
        let ev = Event::Key(KeyEvent {
            code: KeyCode::Right,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(map_event(&ev), None);
    }

    #[test]
    fn left_button_acts_as_touch() {
        assert_eq!(
            map_event(&mouse(MouseEventKind::Down(MouseButton::Left), 4, 7)),
            Some(InputAction::Press { col: 4, row: 7 })
        );
        assert_eq!(
            map_event(&mouse(MouseEventKind::Drag(MouseButton::Left), 5, 6)),
            Some(InputAction::Drag { col: 5, row: 6 })
        );
        assert_eq!(
            map_event(&mouse(MouseEventKind::Up(MouseButton::Left), 5, 6)),
            Some(InputAction::Release)
        );
        assert_eq!(
            map_event(&mouse(MouseEventKind::Down(MouseButton::Right), 5, 6)),
            None
        );
        assert_eq!(
            map_event(&mouse(MouseEventKind::ScrollDown, 0, 0)),
            Some(InputAction::Wheel { notches: 1.0 })
        );
    }

    #[test]
    fn pointer_normalisation_spans_the_screen() {
        let (x, y) = normalized_pointer(0, 0, 80, 24);
        assert!(x < -0.95 && y < -0.9);
        let (x, y) = normalized_pointer(79, 23, 80, 24);
        assert!(x > 0.95 && y > 0.9);
        let (x, _) = normalized_pointer(10, 10, 0, 0);
        assert_eq!(x, 1.0);
    }
}
