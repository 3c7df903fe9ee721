use crate::billboard::BillboardScale;
use crate::content::{Section, SECTION_COUNT};
use crate::scroll::{InputQueue, ScrollController, ScrollTuning, Swipe};
use crate::text::{measure_block, LayoutParams, LayoutResult};
use crate::texture::{SectionTexture, TextureBackend, TextureId};
use log::{debug, error, info};

/// Content-end changes smaller than this fraction of the viewport are not
/// reported.
const CONTENT_END_EPSILON: f32 = 0.01;

/// Canvas geometry shared by every section for the current viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CanvasSpec {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) dpr: f32,
    pub(crate) more_room: bool,
}

impl CanvasSpec {
    pub(crate) fn params(&self, section: &Section) -> LayoutParams {
        LayoutParams {
            canvas_w: self.w,
            canvas_h: self.h,
            dpr: self.dpr,
            line_height_factor: section.line_height_factor,
            more_room: self.more_room,
        }
    }

    pub(crate) fn aspect(&self) -> f32 {
        self.w.max(1) as f32 / self.h.max(1) as f32
    }
}

/// Everything a cached layout depends on besides the section text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LayoutKey {
    w: u32,
    h: u32,
    dpr_bits: u32,
    more_room: bool,
}

impl From<CanvasSpec> for LayoutKey {
    fn from(c: CanvasSpec) -> Self {
        Self {
            w: c.w,
            h: c.h,
            dpr_bits: c.dpr.to_bits(),
            more_room: c.more_room,
        }
    }
}

/// Callbacks for the navigation shell, collected per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ShellNotice {
    Scrollable { section: usize, scrollable: bool },
    ContentEnd { section: usize, fraction: f32 },
}

pub(crate) struct SectionRenderState {
    pub(crate) index: usize,
    pub(crate) active: bool,
    pub(crate) scroll: ScrollController,
    pub(crate) texture: SectionTexture,
    pub(crate) billboard: BillboardScale,
    layout_key: Option<LayoutKey>,
    layout: LayoutResult,
    reported_scrollable: Option<bool>,
    reported_end: Option<f32>,
}

impl SectionRenderState {
    fn new(index: usize, tuning: ScrollTuning) -> Self {
        Self {
            index,
            active: false,
            scroll: ScrollController::new(tuning),
            texture: SectionTexture::new(),
            billboard: BillboardScale::default(),
            layout_key: None,
            layout: LayoutResult::default(),
            reported_scrollable: None,
            reported_end: None,
        }
    }

    /// Re-measures when the canvas geometry changed. Returns true if it did.
    fn ensure_layout(&mut self, section: &Section, canvas: CanvasSpec) -> bool {
        let key = LayoutKey::from(canvas);
        if self.layout_key == Some(key) {
            return false;
        }
        let params = canvas.params(section);
        self.layout = measure_block(section, &params);
        self.layout_key = Some(key);
        self.scroll.set_extent(
            self.layout.logical_content_height(params.dpr()),
            params.visible_height(),
        );
        self.texture.invalidate();
        true
    }

    /// Fraction of the viewport height where the content currently ends.
    fn content_end(&self, canvas: CanvasSpec, section: &Section) -> f32 {
        let params = canvas.params(section);
        let h = params.logical_height().max(1.0);
        let end = self.layout.content_start_y + self.scroll.content_height() - self.scroll.current();
        (end / h).clamp(0.0, 1.0)
    }

    fn report(&mut self, canvas: CanvasSpec, section: &Section, out: &mut Vec<ShellNotice>) {
        let scrollable = self.scroll.scrollable();
        if self.reported_scrollable != Some(scrollable) {
            self.reported_scrollable = Some(scrollable);
            out.push(ShellNotice::Scrollable {
                section: self.index,
                scrollable,
            });
        }
        let fraction = self.content_end(canvas, section);
        let moved = self
            .reported_end
            .map_or(true, |last| (fraction - last).abs() > CONTENT_END_EPSILON);
        if moved {
            self.reported_end = Some(fraction);
            out.push(ShellNotice::ContentEnd {
                section: self.index,
                fraction,
            });
        }
    }

    fn forget_reports(&mut self) {
        self.reported_scrollable = None;
        self.reported_end = None;
    }
}

/// Section index a swipe leads to. Swiping left brings the next section in.
pub(crate) fn swipe_target(active: usize, swipe: Swipe) -> usize {
    match swipe {
        Swipe::Left => (active + 1) % SECTION_COUNT,
        Swipe::Right => (active + SECTION_COUNT - 1) % SECTION_COUNT,
    }
}

/* -----------------------------
   All sections, one frame loop
------------------------------ */

pub(crate) struct Sections {
    content: Vec<Section>,
    states: Vec<SectionRenderState>,
    active: usize,
    canvas: Option<CanvasSpec>,
    notices: Vec<ShellNotice>,
}

impl Sections {
    pub(crate) fn new(content: Vec<Section>, active: usize, tuning: ScrollTuning) -> Self {
        let states: Vec<_> = (0..content.len())
            .map(|i| SectionRenderState::new(i, tuning))
            .collect();
        let active = active.min(content.len().saturating_sub(1));
        let mut s = Self {
            content,
            states,
            active,
            canvas: None,
            notices: Vec::new(),
        };
        if let Some(st) = s.states.get_mut(active) {
            st.active = true;
        }
        s
    }

    pub(crate) fn active(&self) -> usize {
        self.active
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn state(&self, i: usize) -> Option<&SectionRenderState> {
        self.states.get(i)
    }

    pub(crate) fn states_mut(&mut self) -> impl Iterator<Item = &mut SectionRenderState> {
        self.states.iter_mut()
    }

    /// Makes `index` the active section. Its scroll starts over and its
    /// scrollability is reported again. Returns false when nothing changed.
    pub(crate) fn set_active(&mut self, index: usize) -> bool {
        if index >= self.states.len() || index == self.active {
            return false;
        }
        if let Some(old) = self.states.get_mut(self.active) {
            old.active = false;
        }
        self.active = index;
        let st = &mut self.states[index];
        st.active = true;
        st.scroll.reset();
        st.forget_reports();
        info!("section {} ({}) active", index, self.content[index].title);
        true
    }

    /// Applies the new canvas geometry. A viewport resize resets every
    /// section's scroll.
    pub(crate) fn set_canvas(&mut self, canvas: CanvasSpec) {
        if self.canvas == Some(canvas) {
            return;
        }
        if let Some(old) = self.canvas {
            debug!(
                "canvas {}x{} -> {}x{} (dpr {}, more room {})",
                old.w, old.h, canvas.w, canvas.h, canvas.dpr, canvas.more_room
            );
            for st in &mut self.states {
                st.scroll.reset();
            }
        }
        self.canvas = Some(canvas);
        for (st, section) in self.states.iter_mut().zip(&self.content) {
            if st.ensure_layout(section, canvas) {
                debug!(
                    "section {} measured {} lines, {} rows tall",
                    st.index,
                    st.layout.lines.len(),
                    st.scroll.content_height()
                );
            }
        }
    }

    /// Feeds queued pointer events to the active section. Events tagged with
    /// any other section are dropped. Returns the first swipe seen.
    pub(crate) fn dispatch(&mut self, queue: &mut InputQueue) -> Option<Swipe> {
        let mut swipe = None;
        let active = self.active;
        for ev in queue.drain() {
            if ev.section != active {
                continue;
            }
            let Some(st) = self.states.get_mut(active) else {
                continue;
            };
            if !st.active {
                continue;
            }
            if let Some(s) = st.scroll.handle(ev.event) {
                debug!("swipe {s:?} on section {active}");
                swipe = swipe.or(Some(s));
            }
        }
        swipe
    }

    /// Advances the active section's scroll, redraws any canvas whose drawn
    /// offset changed and queues shell notices.
    pub(crate) fn update<B: TextureBackend + ?Sized>(&mut self, dt: f32, backend: &mut B) {
        let Some(canvas) = self.canvas else {
            return;
        };
        for (st, section) in self.states.iter_mut().zip(&self.content) {
            st.ensure_layout(section, canvas);
            if st.active {
                st.scroll.update(dt);
            }
            let params = canvas.params(section);
            match st.texture.redraw(backend, section, &params, st.scroll.current()) {
                Ok(_) => {}
                Err(e) => error!("section {} renders without text: {e}", st.index),
            }
            if st.active {
                st.report(canvas, section, &mut self.notices);
            }
        }
    }

    pub(crate) fn take_notices(&mut self) -> Vec<ShellNotice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn texture_handle(&self, i: usize) -> Option<TextureId> {
        self.states.get(i).and_then(|s| s.texture.handle())
    }

    pub(crate) fn release_all<B: TextureBackend + ?Sized>(&mut self, backend: &mut B) {
        for st in &mut self.states {
            st.texture.release(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::builtin_sections;
    use crate::scroll::PointerEvent;
    use crate::texture::tests::CountingBackend;

    const CANVAS: CanvasSpec = CanvasSpec {
        w: 72,
        h: 20,
        dpr: 1.0,
        more_room: false,
    };

    fn sections(active: usize) -> Sections {
        let mut s = Sections::new(builtin_sections(), active, ScrollTuning::default());
        s.set_canvas(CANVAS);
        s
    }

    fn scrollable_notices(n: &[ShellNotice]) -> Vec<(usize, bool)> {
        n.iter()
            .filter_map(|n| match *n {
                ShellNotice::Scrollable {
                    section,
                    scrollable,
                } => Some((section, scrollable)),
                _ => None,
            })
            .collect()
    }

    fn scroll_projects(s: &mut Sections, backend: &mut CountingBackend) {
        let mut q = InputQueue::default();
        q.push(2, PointerEvent::Wheel { delta_y: 20.0 });
        s.dispatch(&mut q);
        for _ in 0..120 {
            s.update(1.0 / 60.0, backend);
        }
    }

    #[test]
    fn switching_resets_scroll_and_reports_scrollability() {
        let mut backend = CountingBackend::default();
        let mut s = sections(2);
        s.update(0.016, &mut backend);
        assert_eq!(scrollable_notices(&s.take_notices()), vec![(2, true)]);

        scroll_projects(&mut s, &mut backend);
        assert!(s.state(2).unwrap().scroll.current() > 0.0);

        assert!(s.set_active(3));
        s.update(0.016, &mut backend);
        assert_eq!(scrollable_notices(&s.take_notices()), vec![(3, false)]);

        assert!(s.set_active(2));
        assert_eq!(s.state(2).unwrap().scroll.current(), 0.0);
        s.update(0.016, &mut backend);
        assert_eq!(scrollable_notices(&s.take_notices()), vec![(2, true)]);
        s.release_all(&mut backend);
    }

    #[test]
    fn only_the_active_section_takes_input() {
        let mut backend = CountingBackend::default();
        let mut s = sections(0);
        let mut q = InputQueue::default();
        q.push(2, PointerEvent::Wheel { delta_y: 20.0 });
        s.dispatch(&mut q);
        for _ in 0..60 {
            s.update(1.0 / 60.0, &mut backend);
        }
        for i in 0..s.len() {
            assert_eq!(s.state(i).unwrap().scroll.current(), 0.0);
        }
        s.release_all(&mut backend);
    }

    #[test]
    fn inactive_scroll_stays_frozen() {
        let mut backend = CountingBackend::default();
        let mut s = sections(2);
        let mut q = InputQueue::default();
        q.push(2, PointerEvent::Wheel { delta_y: 20.0 });
        s.dispatch(&mut q);
        s.update(1.0 / 60.0, &mut backend);
        let frozen = s.state(2).unwrap().scroll.current();
        s.set_active(1);
        for _ in 0..60 {
            s.update(1.0 / 60.0, &mut backend);
        }
        assert_eq!(s.state(2).unwrap().scroll.current(), frozen);
        s.release_all(&mut backend);
    }

    #[test]
    fn resize_resets_scroll_and_rebuilds_textures() {
        let mut backend = CountingBackend::default();
        let mut s = sections(2);
        scroll_projects(&mut s, &mut backend);
        assert_eq!(backend.created, 4);

        s.set_canvas(CanvasSpec { w: 90, ..CANVAS });
        assert_eq!(s.state(2).unwrap().scroll.current(), 0.0);
        s.update(0.016, &mut backend);
        assert_eq!(backend.created, 8);
        assert_eq!(backend.released.len(), 4);

        s.release_all(&mut backend);
        assert_eq!(backend.released.len(), 8);
        assert!((0..4).all(|i| s.texture_handle(i).is_none()));
    }

    #[test]
    fn steady_frames_do_not_redraw() {
        let mut backend = CountingBackend::default();
        let mut s = sections(0);
        s.update(0.016, &mut backend);
        let uploads = backend.uploads;
        for _ in 0..10 {
            s.update(0.016, &mut backend);
        }
        assert_eq!(backend.uploads, uploads);
        assert!(s
            .take_notices()
            .iter()
            .all(|n| matches!(n, ShellNotice::Scrollable { section: 0, .. } | ShellNotice::ContentEnd { section: 0, .. })));
        s.release_all(&mut backend);
    }

    #[test]
    fn content_end_follows_scroll() {
        let mut backend = CountingBackend::default();
        let mut s = sections(2);
        s.update(0.016, &mut backend);
        let first: Vec<_> = s.take_notices();
        assert!(first.iter().any(|n| matches!(n, ShellNotice::ContentEnd { fraction, .. } if *fraction == 1.0)));

        // Scroll far enough that the content ends inside the viewport.
        let max = s.state(2).unwrap().scroll.max_scroll();
        let mut q = InputQueue::default();
        q.push(2, PointerEvent::Wheel { delta_y: max * 10.0 });
        s.dispatch(&mut q);
        for _ in 0..300 {
            s.update(1.0 / 60.0, &mut backend);
        }
        let last = s
            .take_notices()
            .into_iter()
            .filter_map(|n| match n {
                ShellNotice::ContentEnd { fraction, .. } => Some(fraction),
                _ => None,
            })
            .last();
        let fraction = last.unwrap();
        assert!(fraction < 1.0 && fraction > 0.0);
        s.release_all(&mut backend);
    }

    #[test]
    fn texture_failure_leaves_sections_usable() {
        let mut backend = CountingBackend {
            fail: true,
            ..Default::default()
        };
        let mut s = sections(0);
        s.update(0.016, &mut backend);
        s.update(0.016, &mut backend);
        assert!(s.texture_handle(0).is_none());
        assert!(!s.take_notices().is_empty());
    }

    #[test]
    fn swipes_wrap_around() {
        assert_eq!(swipe_target(0, Swipe::Left), 1);
        assert_eq!(swipe_target(3, Swipe::Left), 0);
        assert_eq!(swipe_target(0, Swipe::Right), 3);
    }
}
