//! Actor registry and spatial queries
//!
//! Actors live in a generational arena, so handles held by controllers go stale instead of
//! dangling when an actor despawns. Each actor also owns a query volume in the physics
//! world tagged with its handle.

use std::collections::HashMap;

use glam::Vec3;
use tether_core::{ActorId, Arena};
use tether_physics::{PhysicsWorld, QueryChannel, TraceHit};
use tracing::{debug, info};

use crate::actors::ActorKind;
use crate::capability::{ActorBehaviour, Enemy, Grapple};
use crate::error::GameError;

/// Sweeps and traces the controllers run against the world
pub trait SpatialQuery {
    /// Actors whose volumes overlap a sphere on `channel`
    fn sweep_sphere(&self, origin: Vec3, radius: f32, channel: QueryChannel) -> Vec<ActorId>;

    /// First blocking hit on the visibility channel between two points
    fn line_trace(&self, from: Vec3, to: Vec3, ignore: Option<ActorId>) -> Option<TraceHit>;
}

impl SpatialQuery for PhysicsWorld {
    fn sweep_sphere(&self, origin: Vec3, radius: f32, channel: QueryChannel) -> Vec<ActorId> {
        self.overlapping_actors(origin, radius, channel)
    }

    fn line_trace(&self, from: Vec3, to: Vec3, ignore: Option<ActorId>) -> Option<TraceHit> {
        PhysicsWorld::line_trace(self, from, to, ignore)
    }
}

/// One registered actor
pub struct ActorRecord {
    pub name: String,
    pub kind: ActorKind,
    pub position: Vec3,
    behaviour: Box<dyn ActorBehaviour>,
}

impl ActorRecord {
    pub fn behaviour(&self) -> &dyn ActorBehaviour {
        self.behaviour.as_ref()
    }
}

/// All actors of one peer plus the collision world they live in
pub struct Scene {
    pub physics: PhysicsWorld,
    actors: Arena<ActorRecord>,
}

impl Scene {
    pub fn new(physics: PhysicsWorld) -> Self {
        Self {
            physics,
            actors: Arena::new(),
        }
    }

    /// Spawn an actor and its query volume
    pub fn spawn(&mut self, name: impl Into<String>, kind: ActorKind, position: Vec3) -> ActorId {
        let record = Self::record(name.into(), kind, position);
        let id = self.actors.insert(record);
        self.physics
            .insert_actor(id, position, kind.radius(), kind.channels());
        info!("Spawned {:?} {} at {}", kind, id, position);
        id
    }

    /// Spawn an actor under a handle chosen by the authority
    pub fn spawn_replicated(
        &mut self,
        id: ActorId,
        name: impl Into<String>,
        kind: ActorKind,
        position: Vec3,
    ) -> Result<(), GameError> {
        let record = Self::record(name.into(), kind, position);
        self.actors.insert_at(id, record)?;
        self.physics
            .insert_actor(id, position, kind.radius(), kind.channels());
        debug!("Mirrored {:?} {} at {}", kind, id, position);
        Ok(())
    }

    fn record(name: String, kind: ActorKind, position: Vec3) -> ActorRecord {
        ActorRecord {
            name,
            kind,
            position,
            behaviour: kind.behaviour(),
        }
    }

    /// Remove an actor. Returns `false` for stale handles.
    pub fn despawn(&mut self, id: ActorId) -> bool {
        let Some(record) = self.actors.remove(id) else {
            return false;
        };
        self.physics.remove_actor(id);
        info!("Despawned {} ({})", record.name, id);
        true
    }

    pub fn is_alive(&self, id: ActorId) -> bool {
        self.actors.contains(id)
    }

    pub fn get(&self, id: ActorId) -> Option<&ActorRecord> {
        self.actors.get(id)
    }

    pub fn actors(&self) -> impl Iterator<Item = (ActorId, &ActorRecord)> {
        self.actors.iter()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn position(&self, id: ActorId) -> Option<Vec3> {
        self.actors.get(id).map(|record| record.position)
    }

    /// Move an actor and its query volume
    pub fn set_position(&mut self, id: ActorId, position: Vec3) -> bool {
        let Some(record) = self.actors.get_mut(id) else {
            return false;
        };
        record.position = position;
        self.physics.set_actor_position(id, position)
    }

    pub fn is_enemy(&self, id: ActorId) -> bool {
        self.actors
            .get(id)
            .is_some_and(|record| record.behaviour.as_enemy().is_some())
    }

    pub fn enemy_mut(&mut self, id: ActorId) -> Option<&mut dyn Enemy> {
        self.actors
            .get_mut(id)
            .and_then(|record| record.behaviour.as_enemy_mut())
    }

    pub fn grapple(&self, id: ActorId) -> Option<&dyn Grapple> {
        self.actors
            .get(id)
            .and_then(|record| record.behaviour.as_grapple())
    }

    pub fn grapple_mut(&mut self, id: ActorId) -> Option<&mut dyn Grapple> {
        self.actors
            .get_mut(id)
            .and_then(|record| record.behaviour.as_grapple_mut())
    }

    /// Downcast an actor's behaviour to its concrete type
    pub fn behaviour<T: 'static>(&self, id: ActorId) -> Option<&T> {
        self.actors
            .get(id)
            .and_then(|record| record.behaviour.as_any().downcast_ref::<T>())
    }

    /// Tick actor behaviours and refresh the query structure
    pub fn tick(&mut self) {
        let positions: HashMap<ActorId, Vec3> = self
            .actors
            .iter()
            .map(|(id, record)| (id, record.position))
            .collect();
        let locate = |id: ActorId| positions.get(&id).copied();
        for (_, record) in self.actors.iter_mut() {
            record.behaviour.tick(record.position, &locate);
        }
        self.physics.update_queries();
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(PhysicsWorld::new())
    }
}
