//! Character movement simulation
//!
//! Accelerates toward the requested input direction under a replicated speed cap, applies
//! gravity and jumps, turns the character according to its rotation mode and hands the
//! resulting translation to the physics capsule.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tether_core::direction::{forward_from_yaw, yaw_from_direction};
use tether_core::types::wrap_angle;
use tether_core::ActorId;
use tether_physics::{CharacterController, CharacterControllerConfig, PhysicsWorld};

/// Movement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Ground acceleration (how fast you reach max speed)
    pub ground_acceleration: f32,
    /// Ground deceleration (how fast you stop)
    pub ground_deceleration: f32,
    /// Air acceleration (reduced control in air)
    pub air_acceleration: f32,
    /// Air deceleration
    pub air_deceleration: f32,
    /// Jump initial velocity
    pub jump_velocity: f32,
    /// Gravity multiplier (1.0 = world gravity)
    pub gravity_scale: f32,
    /// Turn rate toward the desired facing, degrees per second
    pub rotation_rate: f32,
    /// Grace period after leaving ground where you can still jump
    pub coyote_time: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            ground_acceleration: 50.0,
            ground_deceleration: 30.0,
            air_acceleration: 10.0,
            air_deceleration: 5.0,
            jump_velocity: 6.0,
            gravity_scale: 1.0,
            rotation_rate: 500.0,
            coyote_time: 0.15,
        }
    }
}

impl MovementConfig {
    /// Get the current acceleration based on grounded state
    pub fn acceleration(&self, grounded: bool) -> f32 {
        if grounded {
            self.ground_acceleration
        } else {
            self.air_acceleration
        }
    }

    /// Get the current deceleration based on grounded state
    pub fn deceleration(&self, grounded: bool) -> f32 {
        if grounded {
            self.ground_deceleration
        } else {
            self.air_deceleration
        }
    }
}

/// How the character's facing is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationMode {
    /// Turn toward the direction of travel
    #[default]
    OrientToMovement,
    /// Turn toward the controller yaw (strafing while locked on)
    ControllerDesired,
}

/// Movement state a proxy needs to mirror the owner's simulation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementSnapshot {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub facing_yaw: f32,
    pub falling: bool,
}

/// Kinematic movement for one character
pub struct CharacterMovement {
    /// Movement configuration
    pub config: MovementConfig,
    /// Physics capsule
    pub body: CharacterController,
    /// Speed cap for walking stances, set from the replicated stance
    pub max_walk_speed: f32,
    /// Speed cap while crouched
    pub max_crouch_speed: f32,
    pub rotation_mode: RotationMode,
    /// Facing yaw in radians
    facing_yaw: f32,
    velocity: Vec3,
    acceleration: Vec3,
    /// Requested direction for the next update, length at most 1
    pending_input: Vec3,
    last_input_vector: Vec3,
    /// Time since last grounded (for coyote time)
    time_since_grounded: f32,
    /// Mirrors the owner's falling flag when driven by snapshots
    remote_falling: Option<bool>,
}

impl CharacterMovement {
    pub fn new(config: MovementConfig, body: CharacterControllerConfig) -> Self {
        Self {
            config,
            body: CharacterController::with_config(body),
            max_walk_speed: 5.0,
            max_crouch_speed: 2.0,
            rotation_mode: RotationMode::OrientToMovement,
            facing_yaw: 0.0,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            pending_input: Vec3::ZERO,
            last_input_vector: Vec3::ZERO,
            time_since_grounded: 0.0,
            remote_falling: None,
        }
    }

    /// Spawn the capsule in the world at a position, tagged with its owner
    pub fn spawn(&mut self, physics: &mut PhysicsWorld, position: Vec3, owner: ActorId) {
        self.body.spawn(physics, position, owner);
        self.velocity = Vec3::ZERO;
        self.time_since_grounded = 0.0;
    }

    /// Feet position
    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    pub fn center_position(&self) -> Vec3 {
        self.body.center_position()
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Commanded acceleration, zero without input
    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    pub fn facing_yaw(&self) -> f32 {
        self.facing_yaw
    }

    pub fn set_facing_yaw(&mut self, yaw: f32) {
        self.facing_yaw = if yaw > PI || yaw <= -PI {
            wrap_angle(yaw)
        } else {
            yaw
        };
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_yaw(self.facing_yaw)
    }

    /// Last non-zero input direction
    pub fn last_input_vector(&self) -> Vec3 {
        self.last_input_vector
    }

    pub fn is_falling(&self) -> bool {
        self.remote_falling.unwrap_or(!self.body.is_grounded())
    }

    pub fn is_crouched(&self) -> bool {
        self.body.crouched
    }

    /// Speed cap for the current posture
    pub fn max_speed(&self) -> f32 {
        if self.is_crouched() {
            self.max_crouch_speed
        } else {
            self.max_walk_speed
        }
    }

    /// Request movement along a world direction for the next update
    pub fn add_input(&mut self, direction: Vec3) {
        self.pending_input = (self.pending_input + direction).clamp_length_max(1.0);
        if direction.length_squared() > 0.0 {
            self.last_input_vector = direction.normalize();
        }
    }

    /// Check if the character can jump (grounded or within coyote time)
    pub fn can_jump(&self) -> bool {
        self.body.is_grounded() || self.time_since_grounded < self.config.coyote_time
    }

    /// Apply the jump impulse. Refused while airborne.
    pub fn jump(&mut self) -> bool {
        if !self.can_jump() {
            return false;
        }
        self.velocity.y = self.config.jump_velocity;
        self.time_since_grounded = self.config.coyote_time; // Consume coyote time
        self.body.grounded = false;
        true
    }

    /// Replace the velocity wholesale, e.g. for a grapple launch
    pub fn launch(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.body.grounded = false;
        self.time_since_grounded = self.config.coyote_time;
    }

    pub fn crouch(&mut self, physics: &mut PhysicsWorld) {
        self.body.set_crouched(physics, true);
    }

    pub fn uncrouch(&mut self, physics: &mut PhysicsWorld) {
        self.body.set_crouched(physics, false);
    }

    /// Vertical distance the capsule center drops when crouching
    pub fn crouch_drop(&self) -> f32 {
        self.body.crouch_drop()
    }

    /// Update the character (fixed timestep)
    pub fn fixed_update(&mut self, physics: &mut PhysicsWorld, control_yaw: f32, dt: f32) {
        let grounded = self.body.is_grounded();

        // Track coyote time
        if grounded {
            self.time_since_grounded = 0.0;
        } else {
            self.time_since_grounded += dt;
        }

        let input = std::mem::take(&mut self.pending_input);
        let mut horizontal = Vec3::new(self.velocity.x, 0.0, self.velocity.z);

        if input.length_squared() > 0.0 {
            let accel = self.config.acceleration(grounded);
            self.acceleration = input * accel;
            horizontal = move_towards_vec3(horizontal, input * self.max_speed(), accel * dt);
        } else {
            self.acceleration = Vec3::ZERO;
            let decel = self.config.deceleration(grounded);
            horizontal = move_towards_vec3(horizontal, Vec3::ZERO, decel * dt);
        }

        let mut vertical = self.velocity.y;
        if !grounded {
            vertical -= physics.gravity_magnitude() * self.config.gravity_scale * dt;
        } else if vertical < 0.0 {
            // Reset vertical velocity when landing
            vertical = 0.0;
        }

        self.velocity = Vec3::new(horizontal.x, vertical, horizontal.z);
        self.update_facing(input, control_yaw, dt);
        self.body.move_character(physics, self.velocity * dt, dt);

        if self.body.is_grounded() && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }
    }

    /// Mirror the owner's simulation on a proxy
    pub fn apply_snapshot(&mut self, physics: &mut PhysicsWorld, snapshot: &MovementSnapshot) {
        self.body.set_position(physics, snapshot.position);
        self.velocity = snapshot.velocity;
        self.acceleration = snapshot.acceleration;
        self.set_facing_yaw(snapshot.facing_yaw);
        self.body.grounded = !snapshot.falling;
        self.remote_falling = Some(snapshot.falling);
    }

    pub fn snapshot(&self) -> MovementSnapshot {
        MovementSnapshot {
            position: self.position(),
            velocity: self.velocity,
            acceleration: self.acceleration,
            facing_yaw: self.facing_yaw,
            falling: self.is_falling(),
        }
    }

    fn update_facing(&mut self, input: Vec3, control_yaw: f32, dt: f32) {
        let desired = match self.rotation_mode {
            RotationMode::OrientToMovement => {
                if input.length_squared() <= f32::EPSILON {
                    return;
                }
                yaw_from_direction(input)
            }
            RotationMode::ControllerDesired => control_yaw,
        };
        let max_step = self.config.rotation_rate.to_radians() * dt;
        let delta = wrap_angle(desired - self.facing_yaw);
        self.set_facing_yaw(self.facing_yaw + delta.clamp(-max_step, max_step));
    }
}

impl Default for CharacterMovement {
    fn default() -> Self {
        Self::new(MovementConfig::default(), CharacterControllerConfig::default())
    }
}

/// Move a vector towards a target by a maximum delta
fn move_towards_vec3(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let diff = target - current;
    let distance = diff.length();

    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + diff / distance * max_delta
    }
}
