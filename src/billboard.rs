use crate::math::smoothing;

/// Fallback height when the viewport reports zero.
pub(crate) const FALLBACK_VIEWPORT_HEIGHT: f32 = 800.0;

/// Per-second rate giving ~25% of the remaining distance per frame at 60 fps.
pub(crate) const SCALE_SMOOTHING_RATE: f32 = 17.26;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ViewportPx {
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl ViewportPx {
    pub(crate) fn safe_height(&self) -> f32 {
        if self.height > 0.0 && self.height.is_finite() {
            self.height
        } else {
            FALLBACK_VIEWPORT_HEIGHT
        }
    }

    pub(crate) fn safe_width(&self) -> f32 {
        if self.width > 0.0 && self.width.is_finite() {
            self.width
        } else {
            self.safe_height()
        }
    }

    pub(crate) fn aspect(&self) -> f32 {
        self.safe_width() / self.safe_height()
    }
}

/// World-space extent of the view frustum at `distance`.
pub(crate) fn frustum_at_distance(distance: f32, fov_deg: f32, vp: ViewportPx) -> (f32, f32) {
    let h = 2.0 * distance.max(0.0) * (fov_deg.to_radians() * 0.5).tan();
    (h * vp.aspect(), h)
}

/// World size a sprite needs so that its canvas covers `fraction` of the
/// viewport, preserving the canvas aspect.
pub(crate) fn fit_sprite(
    canvas_aspect: f32,
    distance: f32,
    fov_deg: f32,
    vp: ViewportPx,
    fraction: f32,
) -> (f32, f32) {
    let (world_w, world_h) = frustum_at_distance(distance, fov_deg, vp);
    let canvas_aspect = if canvas_aspect > 0.0 && canvas_aspect.is_finite() {
        canvas_aspect
    } else {
        vp.aspect()
    };
    if canvas_aspect < vp.aspect() {
        let h = world_h * fraction;
        (h * canvas_aspect, h)
    } else {
        let w = world_w * fraction;
        (w, w / canvas_aspect)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BillboardScale {
    pub(crate) w: f32,
    pub(crate) h: f32,
    initialized: bool,
}

impl BillboardScale {
    /// Moves toward `target`; the first call snaps.
    pub(crate) fn approach(&mut self, target: (f32, f32), dt: f32) {
        if !self.initialized {
            self.w = target.0;
            self.h = target.1;
            self.initialized = true;
            return;
        }
        let a = smoothing(SCALE_SMOOTHING_RATE, dt);
        self.w += (target.0 - self.w) * a;
        self.h += (target.1 - self.h) * a;
    }
}
