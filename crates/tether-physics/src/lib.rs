//! Tether Physics - Collision queries using rapier3d
//!
//! Provides the collision world, actor colliders tagged with their [`ActorId`], channel
//! filtered sphere sweeps and line traces, and the character capsule controller.

mod character_controller;

pub use character_controller::{CharacterController, CharacterControllerConfig};

use std::collections::HashMap;

use glam::Vec3;
use nalgebra::Unit;
use rapier3d::prelude::*;
use tether_core::ActorId;

/// Physics world configuration
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity vector (default: -9.81 on Y axis)
    pub gravity: Vec3,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

/// Collision channel a query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryChannel {
    /// Everything that blocks sight: world geometry, capsules and actor volumes
    Visibility,
    /// Characters and enemies that can be locked onto
    Pawn,
    /// Grapple points
    Grapple,
}

impl QueryChannel {
    fn group(self) -> Group {
        match self {
            QueryChannel::Visibility => Group::GROUP_1,
            QueryChannel::Pawn => Group::GROUP_2,
            QueryChannel::Grapple => Group::GROUP_3,
        }
    }

    /// Interaction groups for a collider belonging to the given channels
    pub fn memberships(channels: &[QueryChannel]) -> InteractionGroups {
        let memberships = channels
            .iter()
            .fold(QueryChannel::Visibility.group(), |acc, channel| {
                acc | channel.group()
            });
        InteractionGroups::new(memberships, Group::ALL)
    }

    fn query_groups(self) -> InteractionGroups {
        InteractionGroups::new(Group::ALL, self.group())
    }
}

/// First blocking hit of a line trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    /// Actor owning the hit collider, `None` for plain world geometry
    pub actor: Option<ActorId>,
    /// Distance from the trace start
    pub distance: f32,
}

/// The collision world containing every collider the gameplay layer queries
pub struct PhysicsWorld {
    /// Configuration
    pub config: PhysicsConfig,

    /// Rigid body storage
    pub rigid_body_set: RigidBodySet,
    /// Collider storage
    pub collider_set: ColliderSet,

    /// Island manager, needed for collider removal
    island_manager: IslandManager,
    /// Query pipeline for raycasts and shape queries
    query_pipeline: QueryPipeline,
    /// Actor volumes by handle
    actor_colliders: HashMap<ActorId, ColliderHandle>,
}

impl PhysicsWorld {
    /// Create a new physics world with default configuration
    pub fn new() -> Self {
        Self::with_config(PhysicsConfig::default())
    }

    /// Create a new physics world with custom configuration
    pub fn with_config(config: PhysicsConfig) -> Self {
        Self {
            config,
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            island_manager: IslandManager::new(),
            query_pipeline: QueryPipeline::new(),
            actor_colliders: HashMap::new(),
        }
    }

    /// Magnitude of gravity along -Y
    pub fn gravity_magnitude(&self) -> f32 {
        -self.config.gravity.y
    }

    /// Refresh the query acceleration structure after colliders moved
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Add a static collider (ground, walls, etc.)
    pub fn add_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        let handle = self.collider_set.insert(collider);
        self.update_queries();
        handle
    }

    /// Remove a collider
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.collider_set
            .remove(handle, &mut self.island_manager, &mut self.rigid_body_set, true);
        self.update_queries();
    }

    /// Get a collider by handle
    pub fn get_collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.collider_set.get(handle)
    }

    // ---- Actor volumes ----

    /// Register a spherical sensor volume for an actor on the given channels
    pub fn insert_actor(
        &mut self,
        actor: ActorId,
        position: Vec3,
        radius: f32,
        channels: &[QueryChannel],
    ) -> ColliderHandle {
        if let Some(previous) = self.actor_colliders.remove(&actor) {
            self.remove_collider(previous);
        }

        let collider = ColliderBuilder::ball(radius)
            .translation(vector![position.x, position.y, position.z])
            .sensor(true)
            .collision_groups(QueryChannel::memberships(channels))
            .user_data(actor.to_bits())
            .build();

        let handle = self.add_static_collider(collider);
        self.actor_colliders.insert(actor, handle);
        handle
    }

    /// Move an actor volume. Returns `false` if the actor has no volume.
    pub fn set_actor_position(&mut self, actor: ActorId, position: Vec3) -> bool {
        let Some(handle) = self.actor_colliders.get(&actor).copied() else {
            return false;
        };
        let Some(collider) = self.collider_set.get_mut(handle) else {
            return false;
        };
        collider.set_translation(vector![position.x, position.y, position.z]);
        true
    }

    /// Remove an actor volume
    pub fn remove_actor(&mut self, actor: ActorId) {
        if let Some(handle) = self.actor_colliders.remove(&actor) {
            self.remove_collider(handle);
        }
    }

    /// Actors whose volumes overlap a sphere, filtered by channel, in handle order
    pub fn overlapping_actors(
        &self,
        origin: Vec3,
        radius: f32,
        channel: QueryChannel,
    ) -> Vec<ActorId> {
        let shape = Ball::new(radius);
        let shape_pos = Isometry::translation(origin.x, origin.y, origin.z);
        let filter = QueryFilter::default().groups(channel.query_groups());

        let mut actors = Vec::new();
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            &shape,
            filter,
            |handle| {
                if let Some(actor) = self
                    .collider_set
                    .get(handle)
                    .and_then(|collider| ActorId::from_bits(collider.user_data))
                {
                    actors.push(actor);
                }
                true
            },
        );

        actors.sort();
        actors.dedup();
        actors
    }

    /// Trace a segment on the visibility channel and report the first blocking hit.
    ///
    /// Colliders tagged with `ignore` (the tracing actor's own volume and capsule) are
    /// skipped.
    pub fn line_trace(&self, from: Vec3, to: Vec3, ignore: Option<ActorId>) -> Option<TraceHit> {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON {
            return None;
        }
        let direction = delta / length;

        let ignore_bits = ignore.map(ActorId::to_bits).unwrap_or(0);
        let skip_ignored = |_: ColliderHandle, collider: &Collider| {
            ignore_bits == 0 || collider.user_data != ignore_bits
        };
        let filter = QueryFilter::default()
            .groups(QueryChannel::Visibility.query_groups())
            .predicate(&skip_ignored);

        self.raycast(from, direction, length, filter)
            .map(|(handle, distance)| TraceHit {
                actor: self
                    .collider_set
                    .get(handle)
                    .and_then(|collider| ActorId::from_bits(collider.user_data)),
                distance,
            })
    }

    /// Cast a ray and return the first hit
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<(ColliderHandle, f32)> {
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        self.query_pipeline
            .cast_ray(&self.rigid_body_set, &self.collider_set, &ray, max_distance, true, filter)
    }

    // ---- Level geometry ----

    /// Create a ground plane collider
    pub fn create_ground(&mut self, y: f32) -> ColliderHandle {
        let normal = Unit::new_normalize(vector![0.0, 1.0, 0.0]);
        let ground = ColliderBuilder::halfspace(normal)
            .translation(vector![0.0, y, 0.0])
            .friction(0.7)
            .restitution(0.0)
            .build();
        self.add_static_collider(ground)
    }

    /// Create a static box collider
    pub fn create_static_box(&mut self, half_extents: Vec3, position: Vec3) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vector![position.x, position.y, position.z])
            .friction(0.7)
            .build();
        self.add_static_collider(collider)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_world_creation() {
        let world = PhysicsWorld::new();
        assert_eq!(world.config.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert!((world.gravity_magnitude() - 9.81).abs() < 1e-6);
    }

    #[test]
    fn test_raycast_hits_ground() {
        let mut world = PhysicsWorld::new();
        world.create_ground(0.0);

        let hit = world.raycast(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            100.0,
            QueryFilter::default(),
        );
        assert!(hit.is_some());
    }

    #[test]
    fn test_overlap_filters_by_channel() {
        let mut world = PhysicsWorld::new();
        let enemy = ActorId::from_raw(0, 0);
        let hook = ActorId::from_raw(1, 0);
        world.insert_actor(enemy, Vec3::new(0.0, 1.0, -5.0), 0.5, &[QueryChannel::Pawn]);
        world.insert_actor(hook, Vec3::new(2.0, 6.0, -5.0), 0.5, &[QueryChannel::Grapple]);

        let pawns = world.overlapping_actors(Vec3::ZERO, 20.0, QueryChannel::Pawn);
        assert_eq!(pawns, vec![enemy]);

        let hooks = world.overlapping_actors(Vec3::ZERO, 20.0, QueryChannel::Grapple);
        assert_eq!(hooks, vec![hook]);

        assert!(world
            .overlapping_actors(Vec3::new(100.0, 0.0, 0.0), 5.0, QueryChannel::Pawn)
            .is_empty());
    }

    #[test]
    fn test_line_trace_reports_first_actor() {
        let mut world = PhysicsWorld::new();
        let near = ActorId::from_raw(0, 0);
        let far = ActorId::from_raw(1, 0);
        world.insert_actor(near, Vec3::new(0.0, 0.0, -5.0), 0.5, &[QueryChannel::Pawn]);
        world.insert_actor(far, Vec3::new(0.0, 0.0, -10.0), 0.5, &[QueryChannel::Grapple]);

        let hit = world.line_trace(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0), None);
        assert_eq!(hit.and_then(|h| h.actor), Some(near));

        let hit = world.line_trace(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0), Some(near));
        assert_eq!(hit.and_then(|h| h.actor), Some(far));
    }

    #[test]
    fn test_moved_actor_is_found_at_new_position() {
        let mut world = PhysicsWorld::new();
        let actor = ActorId::from_raw(3, 1);
        world.insert_actor(actor, Vec3::ZERO, 0.5, &[QueryChannel::Pawn]);
        assert!(world.set_actor_position(actor, Vec3::new(50.0, 0.0, 0.0)));
        world.update_queries();

        assert!(world.overlapping_actors(Vec3::ZERO, 2.0, QueryChannel::Pawn).is_empty());
        assert_eq!(
            world.overlapping_actors(Vec3::new(50.0, 0.0, 0.0), 2.0, QueryChannel::Pawn),
            vec![actor]
        );

        world.remove_actor(actor);
        assert!(world
            .overlapping_actors(Vec3::new(50.0, 0.0, 0.0), 2.0, QueryChannel::Pawn)
            .is_empty());
    }
}
