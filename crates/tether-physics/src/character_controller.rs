//! Character capsule using rapier3d's kinematic character controller

use glam::Vec3;
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::prelude::*;
use tether_core::ActorId;

use crate::QueryChannel;

/// Character capsule configuration
#[derive(Debug, Clone)]
pub struct CharacterControllerConfig {
    /// Standing capsule height (default: 1.8m)
    pub height: f32,
    /// Crouched capsule height (default: 1.2m)
    pub crouched_height: f32,
    /// Capsule radius (default: 0.4m)
    pub radius: f32,
    /// Maximum slope angle in degrees (default: 45)
    pub max_slope_angle: f32,
    /// Step height for climbing stairs (default: 0.25m)
    pub step_height: f32,
    /// Skin width for collision detection (default: 0.02m)
    pub skin_width: f32,
    /// Maximum ground snap distance, `None` disables snapping
    pub ground_snap_distance: Option<f32>,
}

impl Default for CharacterControllerConfig {
    fn default() -> Self {
        Self {
            height: 1.8,
            crouched_height: 1.2,
            radius: 0.4,
            max_slope_angle: 45.0,
            step_height: 0.25,
            skin_width: 0.02,
            ground_snap_distance: Some(0.2),
        }
    }
}

/// Capsule that slides along level geometry. `position` is the feet position.
pub struct CharacterController {
    /// Configuration
    pub config: CharacterControllerConfig,
    /// Current feet position
    pub position: Vec3,
    /// Whether the character is on the ground
    pub grounded: bool,
    /// Whether the capsule uses the crouched height
    pub crouched: bool,
    /// The collider handle for this character
    pub collider_handle: Option<ColliderHandle>,
    /// Rapier's kinematic character controller
    controller: KinematicCharacterController,
}

impl CharacterController {
    /// Create a new character controller with default config
    pub fn new() -> Self {
        Self::with_config(CharacterControllerConfig::default())
    }

    /// Create a new character controller with custom config
    pub fn with_config(config: CharacterControllerConfig) -> Self {
        let mut controller = KinematicCharacterController::default();
        controller.max_slope_climb_angle = config.max_slope_angle.to_radians();
        controller.min_slope_slide_angle = config.max_slope_angle.to_radians();
        controller.autostep = Some(CharacterAutostep {
            max_height: CharacterLength::Absolute(config.step_height),
            min_width: CharacterLength::Relative(0.5),
            include_dynamic_bodies: false,
        });
        controller.snap_to_ground = config.ground_snap_distance.map(CharacterLength::Absolute);
        controller.offset = CharacterLength::Absolute(config.skin_width);

        Self {
            config,
            position: Vec3::ZERO,
            grounded: false,
            crouched: false,
            collider_handle: None,
            controller,
        }
    }

    /// Current capsule height
    pub fn height(&self) -> f32 {
        if self.crouched {
            self.config.crouched_height
        } else {
            self.config.height
        }
    }

    /// Vertical distance the capsule center drops when crouching
    pub fn crouch_drop(&self) -> f32 {
        (self.config.height - self.config.crouched_height) / 2.0
    }

    fn capsule_shape(&self) -> SharedShape {
        let half_height = (self.height() - 2.0 * self.config.radius) / 2.0;
        SharedShape::capsule_y(half_height.max(0.01), self.config.radius)
    }

    fn center_translation(&self) -> Vector<Real> {
        vector![
            self.position.x,
            self.position.y + self.height() / 2.0,
            self.position.z
        ]
    }

    /// Spawn the capsule in the physics world, tagged with its owning actor
    pub fn spawn(
        &mut self,
        physics: &mut crate::PhysicsWorld,
        position: Vec3,
        owner: ActorId,
    ) -> ColliderHandle {
        if let Some(previous) = self.collider_handle.take() {
            physics.remove_collider(previous);
        }
        self.position = position;

        let collider = ColliderBuilder::new(self.capsule_shape())
            .translation(self.center_translation())
            .collision_groups(QueryChannel::memberships(&[]))
            .user_data(owner.to_bits())
            .friction(0.0) // Smooth sliding against walls
            .restitution(0.0)
            .build();

        let handle = physics.add_static_collider(collider);
        self.collider_handle = Some(handle);
        handle
    }

    /// Move the character with collision detection
    pub fn move_character(
        &mut self,
        physics: &mut crate::PhysicsWorld,
        desired_translation: Vec3,
        dt: f32,
    ) {
        let Some(collider_handle) = self.collider_handle else {
            // Not spawned: integrate freely so headless simulations still move.
            self.position += desired_translation;
            return;
        };

        let Some(collider) = physics.collider_set.get(collider_handle) else {
            return;
        };

        let shape = collider.shape();
        let current_pos = Isometry::translation(
            self.position.x,
            self.position.y + self.height() / 2.0,
            self.position.z,
        );

        let movement = self.controller.move_shape(
            dt,
            &physics.rigid_body_set,
            &physics.collider_set,
            &physics.query_pipeline,
            shape,
            &current_pos,
            vector![desired_translation.x, desired_translation.y, desired_translation.z],
            QueryFilter::default()
                .exclude_collider(collider_handle)
                .exclude_sensors(),
            |_| {},
        );

        self.grounded = movement.grounded;

        let effective_translation = movement.translation;
        self.position.x += effective_translation.x;
        self.position.y += effective_translation.y;
        self.position.z += effective_translation.z;

        let center = self.center_translation();
        if let Some(collider) = physics.collider_set.get_mut(collider_handle) {
            collider.set_translation(center);
        }
    }

    /// Swap between standing and crouched capsule heights, keeping the feet in place
    pub fn set_crouched(&mut self, physics: &mut crate::PhysicsWorld, crouched: bool) {
        if self.crouched == crouched {
            return;
        }
        self.crouched = crouched;

        let shape = self.capsule_shape();
        let center = self.center_translation();
        if let Some(collider) = self
            .collider_handle
            .and_then(|handle| physics.collider_set.get_mut(handle))
        {
            collider.set_shape(shape);
            collider.set_translation(center);
        }
    }

    /// Set the character's position directly (teleport)
    pub fn set_position(&mut self, physics: &mut crate::PhysicsWorld, position: Vec3) {
        self.position = position;

        let center = self.center_translation();
        if let Some(collider) = self
            .collider_handle
            .and_then(|handle| physics.collider_set.get_mut(handle))
        {
            collider.set_translation(center);
        }
    }

    /// Get the eye position (just below the top of the capsule)
    pub fn eye_position(&self) -> Vec3 {
        Vec3::new(
            self.position.x,
            self.position.y + self.height() - 0.1,
            self.position.z,
        )
    }

    /// Get the center position (middle of capsule)
    pub fn center_position(&self) -> Vec3 {
        Vec3::new(
            self.position.x,
            self.position.y + self.height() / 2.0,
            self.position.z,
        )
    }

    /// Check if standing on ground
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }
}

impl Default for CharacterController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhysicsWorld;

    #[test]
    fn test_character_controller_config() {
        let config = CharacterControllerConfig::default();
        assert_eq!(config.height, 1.8);
        assert_eq!(config.radius, 0.4);
        assert!(config.crouched_height < config.height);
    }

    #[test]
    fn test_crouch_lowers_eye_position() {
        let mut physics = PhysicsWorld::new();
        let mut controller = CharacterController::new();
        controller.spawn(&mut physics, Vec3::ZERO, ActorId::from_raw(0, 0));

        let standing_eye = controller.eye_position();
        controller.set_crouched(&mut physics, true);
        let crouched_eye = controller.eye_position();

        assert!(crouched_eye.y < standing_eye.y);
        assert!((controller.crouch_drop() - 0.3).abs() < 1e-5);
        assert_eq!(controller.position, Vec3::ZERO);
    }

    #[test]
    fn test_unspawned_controller_integrates_freely() {
        let mut physics = PhysicsWorld::new();
        let mut controller = CharacterController::new();
        controller.move_character(&mut physics, Vec3::new(1.0, 0.0, 0.0), 0.1);
        assert_eq!(controller.position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_capsule_lands_on_ground() {
        let mut physics = PhysicsWorld::new();
        physics.create_ground(0.0);
        let mut controller = CharacterController::new();
        controller.spawn(&mut physics, Vec3::new(0.0, 0.05, 0.0), ActorId::from_raw(0, 0));

        controller.move_character(&mut physics, Vec3::new(0.0, -0.5, 0.0), 1.0 / 60.0);
        assert!(controller.position.y > -0.1);
    }
}
