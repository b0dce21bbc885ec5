//! Camera configuration

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Spring arm length behind the pivot
    pub arm_length: f32,
    /// Look sensitivity (radians per unit of look input)
    pub sensitivity: f32,
    /// Minimum pitch angle in degrees
    pub pitch_min: f32,
    /// Maximum pitch angle in degrees
    pub pitch_max: f32,
    /// Collision radius for camera
    pub collision_radius: f32,
    /// Closest the arm may retract when blocked
    pub min_arm_length: f32,
    /// Pivot offset from the capsule center
    pub boom_offset: Vec3,
    /// Horizontal offset for an over-the-shoulder view
    pub shoulder_offset: f32,
    /// Horizontal field of view in degrees
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            arm_length: 4.0,
            sensitivity: 0.003,
            pitch_min: -89.0,
            pitch_max: 89.0,
            collision_radius: 0.3,
            min_arm_length: 0.5,
            boom_offset: Vec3::new(0.0, 0.6, 0.0),
            shoulder_offset: 0.3,
            fov_degrees: 90.0,
        }
    }
}
