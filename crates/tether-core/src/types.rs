//! Core spatial types
//!
//! All rotations follow one convention: Y is up, yaw 0 faces -Z, and positive yaw turns
//! toward +X (clockwise seen from above). Angles are stored in radians.

use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::direction;

/// Position and facing of an actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform at a position facing along the given yaw
    pub fn from_position_yaw(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(-yaw),
        }
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the right direction (positive X in local space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Heading of the forward vector projected on the ground plane
    pub fn yaw(&self) -> f32 {
        direction::yaw_from_direction(self.forward())
    }
}

/// Yaw/pitch pair used for controller and camera rotations
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewRotation {
    /// Horizontal angle in radians
    pub yaw: f32,
    /// Vertical angle in radians, positive looks up
    pub pitch: f32,
}

impl ViewRotation {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    /// Rotation whose forward vector points from `from` to `to`
    pub fn look_at(from: Vec3, to: Vec3) -> Self {
        let delta = to - from;
        let horizontal = Vec3::new(delta.x, 0.0, delta.z).length();
        if delta.length_squared() <= f32::EPSILON {
            return Self::default();
        }
        Self {
            yaw: direction::yaw_from_direction(delta),
            pitch: delta.y.atan2(horizontal),
        }
    }

    /// Forward direction including pitch
    pub fn forward(&self) -> Vec3 {
        let cos_pitch = self.pitch.cos();
        Vec3::new(
            self.yaw.sin() * cos_pitch,
            self.pitch.sin(),
            -self.yaw.cos() * cos_pitch,
        )
    }

    /// Right direction on the ground plane
    pub fn right(&self) -> Vec3 {
        direction::right_from_yaw(self.yaw)
    }

    /// Same rotation with `offset` radians added to the pitch
    pub fn with_pitch_offset(self, offset: f32) -> Self {
        Self {
            yaw: self.yaw,
            pitch: self.pitch + offset,
        }
    }

    /// Yaw wrapped into (-PI, PI]
    pub fn normalized(self) -> Self {
        Self {
            yaw: wrap_angle(self.yaw),
            pitch: self.pitch,
        }
    }

    /// Interpolate along the shortest yaw arc
    pub fn lerp(a: ViewRotation, b: ViewRotation, t: f32) -> ViewRotation {
        let yaw_delta = wrap_angle(b.yaw - a.yaw);
        ViewRotation {
            yaw: wrap_angle(a.yaw + yaw_delta * t),
            pitch: a.pitch + (b.pitch - a.pitch) * t,
        }
    }
}

/// Wrap an angle in radians into (-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_yaw_round_trip() {
        let transform = Transform::from_position_yaw(Vec3::ZERO, 0.7);
        assert!((transform.yaw() - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_transform_axes() {
        let transform = Transform::default();
        assert!((transform.forward() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
        assert!((transform.right() - Vec3::X).length() < 1e-6);

        let turned = Transform::from_position_yaw(Vec3::ZERO, PI / 2.0);
        assert!((turned.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_look_at_matches_forward() {
        let from = Vec3::new(1.0, 2.0, 3.0);
        let to = Vec3::new(-4.0, 0.5, 8.0);
        let rotation = ViewRotation::look_at(from, to);
        let expected = (to - from).normalize();
        assert!((rotation.forward() - expected).length() < 1e-5);
    }

    #[test]
    fn test_lerp_takes_short_arc() {
        let a = ViewRotation::new(PI - 0.1, 0.0);
        let b = ViewRotation::new(-PI + 0.1, 0.0);
        let mid = ViewRotation::lerp(a, b, 0.5);
        assert!((mid.yaw.abs() - PI).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI).abs() - PI).abs() < 1e-4);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-6);
    }
}
