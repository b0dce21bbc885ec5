//! Direction utilities
//!
//! Pure helpers that turn camera yaw plus 2D input into world-space directions and
//! classify relative angles into octants. Relative angles are in degrees, measured from
//! the facing direction, positive to the right, in the range (-180, 180].

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// One of eight angular buckets relative to a facing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DetailedDirection {
    #[default]
    Forward,
    ForwardLeft,
    ForwardRight,
    Backward,
    BackwardLeft,
    BackwardRight,
    Left,
    Right,
}

impl DetailedDirection {
    /// All octants, clockwise from forward
    pub const ALL: [DetailedDirection; 8] = [
        DetailedDirection::Forward,
        DetailedDirection::ForwardRight,
        DetailedDirection::Right,
        DetailedDirection::BackwardRight,
        DetailedDirection::Backward,
        DetailedDirection::BackwardLeft,
        DetailedDirection::Left,
        DetailedDirection::ForwardLeft,
    ];

    /// Classify a relative angle in degrees into its 45 degree octant
    pub fn from_angle(angle: f32) -> Self {
        let a = normalize_degrees(angle);
        if a > -22.5 && a <= 22.5 {
            DetailedDirection::Forward
        } else if (22.5..67.5).contains(&a) {
            DetailedDirection::ForwardRight
        } else if (67.5..112.5).contains(&a) {
            DetailedDirection::Right
        } else if (112.5..157.5).contains(&a) {
            DetailedDirection::BackwardRight
        } else if a > -67.5 && a <= -22.5 {
            DetailedDirection::ForwardLeft
        } else if a > -112.5 && a <= -67.5 {
            DetailedDirection::Left
        } else if a > -157.5 && a <= -112.5 {
            DetailedDirection::BackwardLeft
        } else {
            DetailedDirection::Backward
        }
    }

    /// Angle at the center of this octant in degrees
    pub fn center_angle(&self) -> f32 {
        match self {
            DetailedDirection::Forward => 0.0,
            DetailedDirection::ForwardRight => 45.0,
            DetailedDirection::Right => 90.0,
            DetailedDirection::BackwardRight => 135.0,
            DetailedDirection::Backward => 180.0,
            DetailedDirection::BackwardLeft => -135.0,
            DetailedDirection::Left => -90.0,
            DetailedDirection::ForwardLeft => -45.0,
        }
    }
}

/// Ground-plane forward vector for a yaw in radians
pub fn forward_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, -yaw.cos())
}

/// Ground-plane right vector for a yaw in radians
pub fn right_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.cos(), 0.0, yaw.sin())
}

/// Yaw in radians of a direction projected on the ground plane
pub fn yaw_from_direction(direction: Vec3) -> f32 {
    direction.x.atan2(-direction.z)
}

/// World-space movement direction from camera yaw and stick input (x right, y forward).
///
/// Pitch is ignored so looking up or down never slows ground movement.
pub fn input_direction_xy(camera_yaw: f32, input: Vec2) -> Vec3 {
    (forward_from_yaw(camera_yaw) * input.y + right_from_yaw(camera_yaw) * input.x)
        .normalize_or_zero()
}

/// Express a world vector in a facing's local frame: x forward, y right, z up
pub fn to_local(vector: Vec3, facing_yaw: f32) -> Vec3 {
    Vec3::new(
        vector.dot(forward_from_yaw(facing_yaw)),
        vector.dot(right_from_yaw(facing_yaw)),
        vector.y,
    )
}

/// Signed angle in degrees of `direction` relative to a facing yaw
pub fn relative_angle(direction: Vec3, facing_yaw: f32) -> f32 {
    let local = to_local(direction, facing_yaw);
    if local.x == 0.0 && local.y == 0.0 {
        return 0.0;
    }
    local.y.atan2(local.x).to_degrees()
}

/// Wrap degrees into (-180, 180]
pub fn normalize_degrees(angle: f32) -> f32 {
    let mut wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Unsigned angle in degrees between two vectors
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let dot = a.normalize_or_zero().dot(b.normalize_or_zero());
    dot.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Whether `to_target` lies strictly inside half of `fov_degrees` around `forward`
pub fn within_half_fov(forward: Vec3, to_target: Vec3, fov_degrees: f32) -> bool {
    angle_between(forward, to_target) < fov_degrees / 2.0
}

/// Perpendicular distance from `point` to the infinite line through `origin` along `direction`
pub fn point_to_line_distance(point: Vec3, origin: Vec3, direction: Vec3) -> f32 {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
        return point.distance(origin);
    }
    let offset = point - origin;
    (offset - dir * offset.dot(dir)).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octant_boundaries() {
        assert_eq!(DetailedDirection::from_angle(0.0), DetailedDirection::Forward);
        assert_eq!(DetailedDirection::from_angle(22.5), DetailedDirection::Forward);
        assert_eq!(DetailedDirection::from_angle(30.0), DetailedDirection::ForwardRight);
        assert_eq!(DetailedDirection::from_angle(90.0), DetailedDirection::Right);
        assert_eq!(DetailedDirection::from_angle(120.0), DetailedDirection::BackwardRight);
        assert_eq!(DetailedDirection::from_angle(157.5), DetailedDirection::Backward);
        assert_eq!(DetailedDirection::from_angle(-179.0), DetailedDirection::Backward);
        assert_eq!(DetailedDirection::from_angle(-120.0), DetailedDirection::BackwardLeft);
        assert_eq!(DetailedDirection::from_angle(-90.0), DetailedDirection::Left);
        assert_eq!(DetailedDirection::from_angle(-45.0), DetailedDirection::ForwardLeft);
    }

    #[test]
    fn test_octant_centers_round_trip() {
        for direction in DetailedDirection::ALL {
            assert_eq!(DetailedDirection::from_angle(direction.center_angle()), direction);
        }
    }

    #[test]
    fn test_input_direction_follows_camera() {
        let forward = input_direction_xy(0.0, Vec2::new(0.0, 1.0));
        assert!((forward - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);

        let right = input_direction_xy(0.0, Vec2::new(1.0, 0.0));
        assert!((right - Vec3::X).length() < 1e-6);

        let turned = input_direction_xy(std::f32::consts::FRAC_PI_2, Vec2::new(0.0, 1.0));
        assert!((turned - Vec3::X).length() < 1e-5);

        assert_eq!(input_direction_xy(1.0, Vec2::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_relative_angle_sign() {
        assert!((relative_angle(Vec3::X, 0.0) - 90.0).abs() < 1e-4);
        assert!((relative_angle(-Vec3::X, 0.0) + 90.0).abs() < 1e-4);
        assert!((relative_angle(Vec3::Z, 0.0).abs() - 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_point_to_line_distance() {
        let distance = point_to_line_distance(
            Vec3::new(3.0, 0.0, -10.0),
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -1.0),
        );
        assert!((distance - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_half_fov() {
        let forward = Vec3::new(0.0, 0.0, -1.0);
        assert!(within_half_fov(forward, Vec3::new(0.5, 0.0, -1.0), 90.0));
        assert!(!within_half_fov(forward, Vec3::new(2.0, 0.0, -1.0), 90.0));
        assert!(!within_half_fov(forward, Vec3::Z, 90.0));
    }
}
