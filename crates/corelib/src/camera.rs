use crate::{Bounds, Mat4, Vec3};

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

/// Extra height added above the framed mesh, in scene units (centimeters).
const FRAMING_LIFT: f32 = 50.0;

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    /// Place a viewer above and to the side of `bounds`, looking at its center.
    /// Scene space is forward-X/right-Y/up-Z. Returns `None` for empty bounds.
    pub fn frame_bounds(bounds: &Bounds, fov_y_rad: f32, aspect: f32) -> Option<Self> {
        if bounds.is_empty() {
            return None;
        }

        let center = bounds.center();
        let r = bounds.radius();
        let offset = Vec3::new(r * 0.5, r * 1.25, r * 0.75 + FRAMING_LIFT);
        let eye = center + offset;
        // A point-sized mesh puts the eye straight above the target.
        let up = if offset.cross(Vec3::Z).length_squared() <= f32::EPSILON {
            Vec3::X
        } else {
            Vec3::Z
        };

        let distance = offset.length();
        let z_near = (distance * 0.01).max(0.1);
        let z_far = (distance + r * 2.0) * 4.0;

        Some(Self::new_perspective(
            eye, center, up, fov_y_rad, z_near, z_far, aspect,
        ))
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// OpenGL-style projection (z in [-1, 1]).
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }
}
