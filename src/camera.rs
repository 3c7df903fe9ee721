use crate::math::{circle_point, smoothing, Camera, Vec3, ORIGIN, WORLD_UP};
use std::f32::consts::FRAC_PI_2;

pub(crate) const CAMERA_RADIUS: f32 = 16.0;
pub(crate) const FOV_DEG: f32 = 60.0;
const GLIDE_RATE: f32 = 3.0;
const PARALLAX_RATE: f32 = 4.0;
const PARALLAX_MAX: f32 = 0.25;
// Keeps the eye off the look-at point while gliding between opposite sections.
const MIN_EYE_DISTANCE: f32 = 0.05;

pub(crate) fn section_angle(index: usize) -> f32 {
    (index % crate::content::SECTION_COUNT) as f32 * FRAC_PI_2
}

pub(crate) fn section_viewpoint(index: usize) -> Vec3 {
    circle_point(section_angle(index), CAMERA_RADIUS)
}

/// Glides toward the active section's viewpoint and adds a small pointer
/// parallax on top. The look-at point stays at the origin.
#[derive(Clone, Debug)]
pub(crate) struct CameraRig {
    position: Vec3,
    target: Vec3,
    pointer: (f32, f32),
    pointer_target: (f32, f32),
    parallax: bool,
}

impl CameraRig {
    /// Starts settled at `index`.
    pub(crate) fn new(index: usize, parallax: bool) -> Self {
        let p = section_viewpoint(index);
        Self {
            position: p,
            target: p,
            pointer: (0.0, 0.0),
            pointer_target: (0.0, 0.0),
            parallax,
        }
    }

    pub(crate) fn set_section(&mut self, index: usize) {
        self.target = section_viewpoint(index);
    }

    /// Pointer position normalised to [-1, 1] on both axes, y down.
    pub(crate) fn set_pointer(&mut self, nx: f32, ny: f32) {
        self.pointer_target = (nx.clamp(-1.0, 1.0), ny.clamp(-1.0, 1.0));
    }

    pub(crate) fn update(&mut self, dt: f32) {
        self.position = self.position.lerp(self.target, smoothing(GLIDE_RATE, dt));
        let a = smoothing(PARALLAX_RATE, dt);
        self.pointer.0 += (self.pointer_target.0 - self.pointer.0) * a;
        self.pointer.1 += (self.pointer_target.1 - self.pointer.1) * a;
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> Vec3 {
        self.position
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> Vec3 {
        self.target
    }

    fn parallax_offset(&self) -> Vec3 {
        if !self.parallax {
            return ORIGIN;
        }
        let forward = (ORIGIN - self.position).norm();
        let mut right = forward.cross(WORLD_UP);
        if right.len() < 1e-5 {
            return ORIGIN;
        }
        right = right.norm();
        let off = right * (self.pointer.0 * PARALLAX_MAX) + WORLD_UP * (-self.pointer.1 * PARALLAX_MAX);
        let len = off.len();
        if len > PARALLAX_MAX {
            off * (PARALLAX_MAX / len)
        } else {
            off
        }
    }

    pub(crate) fn eye(&self) -> Vec3 {
        let eye = self.position + self.parallax_offset();
        if eye.len() < MIN_EYE_DISTANCE {
            self.target.norm() * MIN_EYE_DISTANCE
        } else {
            eye
        }
    }

    pub(crate) fn camera(&self) -> Camera {
        Camera {
            eye: self.eye(),
            target: ORIGIN,
            fov_deg: FOV_DEG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_within_two_seconds() {
        let mut rig = CameraRig::new(0, false);
        rig.set_section(1);
        let dt = 0.016;
        let mut t = 0.0;
        while t < 2.0 {
            rig.update(dt);
            t += dt;
        }
        let err = rig.position().distance(rig.target());
        assert!(err < 0.01 * CAMERA_RADIUS, "still {err} away");
    }

    #[test]
    fn viewpoints_sit_on_the_camera_circle() {
        for i in 0..4 {
            let p = section_viewpoint(i);
            assert!((p.len() - CAMERA_RADIUS).abs() < 1e-3);
            assert!(p.y.abs() < 1e-6);
        }
        let p1 = section_viewpoint(1);
        assert!(p1.x.abs() < 1e-3 && (p1.z + CAMERA_RADIUS).abs() < 1e-3);
    }

    #[test]
    fn parallax_is_capped_and_keeps_look_at() {
        let mut rig = CameraRig::new(0, true);
        rig.set_pointer(5.0, -5.0);
        for _ in 0..600 {
            rig.update(0.016);
        }
        let off = rig.eye() - rig.position();
        assert!(off.len() <= PARALLAX_MAX + 1e-4);
        assert!(off.len() > 0.1);
        assert_eq!(rig.camera().target, ORIGIN);
    }

    #[test]
    fn parallax_disabled_leaves_eye_on_path() {
        let mut rig = CameraRig::new(2, false);
        rig.set_pointer(1.0, 1.0);
        rig.update(0.5);
        assert_eq!(rig.eye(), rig.position());
    }

    #[test]
    fn crossing_the_centre_keeps_a_valid_eye() {
        let mut rig = CameraRig::new(0, false);
        rig.set_section(2);
        for _ in 0..400 {
            rig.update(0.005);
            assert!(rig.eye().len() >= MIN_EYE_DISTANCE * 0.99);
        }
    }
}
