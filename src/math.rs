use std::ops::{Add, Mul, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Vec3 {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) z: f32,
}

pub(crate) const ORIGIN: Vec3 = Vec3::new(0.0, 0.0, 0.0);
pub(crate) const WORLD_UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

impl Vec3 {
    pub(crate) const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn dot(self, o: Vec3) -> f32 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub(crate) fn cross(self, o: Vec3) -> Vec3 {
        Vec3::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    pub(crate) fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub(crate) fn norm(self) -> Vec3 {
        let l = self.len().max(1e-6);
        self * (1.0 / l)
    }

    pub(crate) fn distance(self, o: Vec3) -> f32 {
        (self - o).len()
    }

    pub(crate) fn lerp(self, to: Vec3, t: f32) -> Vec3 {
        self + (to - self) * t
    }

    pub(crate) fn rot_y(self, ang: f32) -> Vec3 {
        let (s, c) = ang.sin_cos();
        Vec3::new(c * self.x + s * self.z, self.y, -s * self.x + c * self.z)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, k: f32) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }
}

/// Fraction of the remaining distance covered in `dt` seconds when converging
/// at rate `k` per second. Independent of frame rate.
pub(crate) fn smoothing(k: f32, dt: f32) -> f32 {
    1.0 - (-k * dt.max(0.0)).exp()
}

/// Point on the horizontal circle around the origin used by both the section
/// markers and the camera rig.
pub(crate) fn circle_point(angle: f32, radius: f32) -> Vec3 {
    Vec3::new((-angle).cos() * radius, 0.0, (-angle).sin() * radius)
}

/* -----------------------------
   Perspective camera
------------------------------ */

#[derive(Clone, Copy, Debug)]
pub(crate) struct Camera {
    pub(crate) eye: Vec3,
    pub(crate) target: Vec3,
    pub(crate) fov_deg: f32,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Projected {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) depth: f32,
}

impl Camera {
    pub(crate) fn forward(&self) -> Vec3 {
        (self.target - self.eye).norm()
    }

    /// Right-handed basis: (right, up, forward).
    pub(crate) fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let f = self.forward();
        let mut r = f.cross(WORLD_UP);
        if r.len() < 1e-5 {
            r = Vec3::new(1.0, 0.0, 0.0);
        }
        let r = r.norm();
        let u = r.cross(f).norm();
        (r, u, f)
    }

    /// Focal length in pixels for a viewport of height `vh`.
    pub(crate) fn focal(&self, vh: f32) -> f32 {
        let half = (self.fov_deg.to_radians() * 0.5).tan().max(1e-4);
        (vh * 0.5) / half
    }

    /// Projects a world point into viewport pixels (origin top-left, y down).
    /// Points behind the near plane yield `None`.
    pub(crate) fn project(&self, p: Vec3, vw: f32, vh: f32) -> Option<Projected> {
        let (r, u, f) = self.basis();
        let d = p - self.eye;
        let z = d.dot(f);
        if z <= 0.05 {
            return None;
        }
        let focal = self.focal(vh);
        Some(Projected {
            x: vw * 0.5 + d.dot(r) * focal / z,
            y: vh * 0.5 - d.dot(u) * focal / z,
            depth: z,
        })
    }
}
