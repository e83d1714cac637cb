//! Orbit camera framing an axis-aligned bounding box.

use super::RenderConfig;
use crate::math::{cross3, dot3, mat4_mul, sub3, Mat4, IDENTITY};

pub struct Camera {
    pub view_proj: Mat4,
    pub eye: [f32; 3],
}

impl Camera {
    /// Orbit the box center at the configured yaw and pitch, backed off until
    /// the box's bounding sphere fits the narrower field of view.
    pub fn framing(bounds_min: [f32; 3], bounds_max: [f32; 3], config: &RenderConfig) -> Self {
        let aspect = config.width as f32 / config.height.max(1) as f32;
        let center = [0, 1, 2].map(|i| (bounds_min[i] + bounds_max[i]) * 0.5);
        let extent = sub3(bounds_max, bounds_min);
        let radius = (dot3(extent, extent).sqrt() * 0.5).max(0.5);

        let (yaw, pitch) = (config.yaw.to_radians(), config.pitch.to_radians());
        let forward = [
            -pitch.cos() * yaw.sin(),
            -pitch.sin(),
            -pitch.cos() * yaw.cos(),
        ];
        // Horizontal at every pitch, so looking straight down stays defined.
        let right = [yaw.cos(), 0.0, -yaw.sin()];
        let up = cross3(right, forward);

        let half_fov_y = config.fov.to_radians() * 0.5;
        let half_fov_x = (half_fov_y.tan() * aspect).atan();
        let fit = radius / half_fov_y.min(half_fov_x).sin();
        let distance = fit * 1.05 * config.zoom;
        let eye = [0, 1, 2].map(|i| center[i] - forward[i] * distance);

        let mut view = IDENTITY;
        for (row, axis) in [right, up, forward.map(|c| -c)].into_iter().enumerate() {
            for col in 0..3 {
                view[col][row] = axis[col];
            }
            view[3][row] = -dot3(axis, eye);
        }

        let near = (distance - radius * 1.1).max(distance * 0.01);
        let far = distance + radius * 1.1;
        let proj = projection(half_fov_y, aspect, near, far);
        Self {
            view_proj: mat4_mul(proj, view),
            eye,
        }
    }
}

/// Right-handed perspective with eye depth `near..far` mapped to `0..1`.
fn projection(half_fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let focal = 1.0 / half_fov_y.tan();
    let mut m = [[0.0f32; 4]; 4];
    m[0][0] = focal / aspect;
    m[1][1] = focal;
    m[2][2] = far / (near - far);
    m[2][3] = -1.0;
    m[3][2] = near * far / (near - far);
    m
}
