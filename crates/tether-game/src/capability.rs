//! Actor capabilities
//!
//! Controllers never ask what an actor is, only what it can do. Lock-on candidates must be
//! [`Enemy`]s and grapple candidates must be [`Grapple`]s; both are queried when filtering,
//! so an actor can gain or lose a capability between frames.

use std::any::Any;

use glam::Vec3;
use tether_core::ActorId;

/// Can be locked onto
pub trait Enemy {
    /// A character locked onto this actor
    fn on_selected(&mut self);
    /// A character released its lock on this actor
    fn on_deselected(&mut self);
}

/// Can be grappled to
pub trait Grapple {
    fn on_activate(&mut self, requester: ActorId, interact_range: f32, detection_range: f32);
    fn on_deactivate(&mut self);
    /// Where a launched character should land, given this actor's position
    fn landing_location(&self, position: Vec3) -> Vec3;
    /// Launches starting closer than this are refused
    fn min_launch_distance(&self) -> f32 {
        0.0
    }
}

/// Behaviour attached to an actor in the scene
pub trait ActorBehaviour: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_enemy(&self) -> Option<&dyn Enemy> {
        None
    }

    fn as_enemy_mut(&mut self) -> Option<&mut dyn Enemy> {
        None
    }

    fn as_grapple(&self) -> Option<&dyn Grapple> {
        None
    }

    fn as_grapple_mut(&mut self) -> Option<&mut dyn Grapple> {
        None
    }

    /// Per-frame update. `locate` resolves other actors' positions.
    fn tick(&mut self, _position: Vec3, _locate: &dyn Fn(ActorId) -> Option<Vec3>) {}
}
