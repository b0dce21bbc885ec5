//! Gameplay tuning
//!
//! All distances are in meters, speeds in meters per second and angles in degrees unless
//! a field says otherwise.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::movement::MovementConfig;

/// Capability gates for the movement actions. Replicated, runtime-mutable on the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub can_jump: bool,
    pub can_sprint: bool,
    pub can_crouch: bool,
    pub can_dodge: bool,
    pub can_roll: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            can_jump: true,
            can_sprint: true,
            can_crouch: true,
            can_dodge: true,
            can_roll: true,
        }
    }
}

/// Stance speed caps and starting capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Speed cap while running (default stance)
    pub run_speed: f32,
    /// Speed cap while sprinting
    pub sprint_speed: f32,
    /// Speed cap while crouched
    pub crouch_speed: f32,
    /// Below this ground speed the character counts as stationary when picking a dodge octant
    pub stationary_speed: f32,
    /// Capabilities a freshly spawned character starts with
    pub capabilities: Capabilities,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            run_speed: 5.0,
            sprint_speed: 10.0,
            crouch_speed: 2.0,
            stationary_speed: 0.01,
            capabilities: Capabilities::default(),
        }
    }
}

/// Target lock detection and camera behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOnConfig {
    /// Radius of the lockable-target volume and of the view-ray selection threshold
    pub detection_radius: f32,
    /// The lock breaks once the target is at least this far away
    pub break_distance: f32,
    /// Extra distance the authority tolerates when validating a lock request
    pub validation_slack: f32,
    /// Pitch added to the look-at rotation while locked (negative looks down)
    pub pitch_offset_degrees: f32,
    /// Duration of the camera rotation when engaging or disengaging, in seconds
    pub camera_transition: f32,
}

impl Default for LockOnConfig {
    fn default() -> Self {
        Self {
            detection_radius: 20.0,
            break_distance: 20.0,
            validation_slack: 2.0,
            pitch_offset_degrees: -30.0,
            camera_transition: 1.0 / 6.0,
        }
    }
}

/// Grapple point detection and launch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrappleConfig {
    /// Radius of the per-frame grapple sweep
    pub detection_radius: f32,
    /// Maximum distance to the active grapple point for a launch
    pub interact_range: f32,
    /// Arc shape: 0 launches straight up, 1 straight at the landing point
    pub arc: f32,
    /// Per-axis multiplier applied to the solved launch velocity
    pub launch_modifier: Vec3,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            detection_radius: 10.0,
            interact_range: 6.0,
            arc: 0.3,
            launch_modifier: Vec3::ONE,
        }
    }
}

/// Quadrant boundaries for the 4-way movement direction, in degrees relative to facing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionThresholds {
    pub forward_left: f32,
    pub forward_right: f32,
    pub backward_left: f32,
    pub backward_right: f32,
    /// Hysteresis applied around each boundary
    pub buffer: f32,
}

impl Default for DirectionThresholds {
    fn default() -> Self {
        Self {
            forward_left: -70.0,
            forward_right: 70.0,
            backward_left: -110.0,
            backward_right: 110.0,
            buffer: 5.0,
        }
    }
}

/// Procedural animation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Ground speed at which stride reaches 1
    pub max_stride_speed: f32,
    /// Exponential smoothing rate of the velocity blend
    pub blend_interp_speed: f32,
    /// Minimum ground speed for `should_move`
    pub move_threshold: f32,
    pub thresholds: DirectionThresholds,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            max_stride_speed: 2.0,
            blend_interp_speed: 12.0,
            move_threshold: 0.03,
            thresholds: DirectionThresholds::default(),
        }
    }
}

/// Everything a character is tuned with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub locomotion: LocomotionConfig,
    pub movement: MovementConfig,
    pub lock_on: LockOnConfig,
    pub grapple: GrappleConfig,
    pub animation: AnimationConfig,
    pub camera: CameraConfig,
}
