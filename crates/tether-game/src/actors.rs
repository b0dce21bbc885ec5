//! Built-in actor kinds

use std::any::Any;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tether_core::ActorId;
use tether_physics::QueryChannel;
use tracing::debug;

use crate::capability::{ActorBehaviour, Enemy, Grapple};

/// What an actor is, as announced to peers when it spawns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActorKind {
    /// A player character. Characters can lock onto each other.
    Character,
    /// A stationary enemy stand-in
    TargetDummy,
    /// Launch target with a landing point relative to its position
    GrapplePoint { landing_offset: Vec3 },
}

impl ActorKind {
    /// Query channels the actor's volume answers on
    pub fn channels(&self) -> &'static [QueryChannel] {
        match self {
            ActorKind::Character | ActorKind::TargetDummy => &[QueryChannel::Pawn],
            ActorKind::GrapplePoint { .. } => &[QueryChannel::Grapple],
        }
    }

    /// Radius of the actor's query volume
    pub fn radius(&self) -> f32 {
        match self {
            ActorKind::Character => 0.5,
            ActorKind::TargetDummy => 0.6,
            ActorKind::GrapplePoint { .. } => 0.3,
        }
    }

    pub fn behaviour(&self) -> Box<dyn ActorBehaviour> {
        match self {
            ActorKind::Character | ActorKind::TargetDummy => Box::new(Combatant::default()),
            ActorKind::GrapplePoint { landing_offset } => {
                Box::new(GrapplePoint::new(*landing_offset))
            }
        }
    }
}

/// Lockable actor with a lock marker
#[derive(Debug, Default)]
pub struct Combatant {
    /// Whether the "locked on" marker is shown above the actor
    pub lock_marker_visible: bool,
}

impl Enemy for Combatant {
    fn on_selected(&mut self) {
        self.lock_marker_visible = true;
    }

    fn on_deselected(&mut self) {
        self.lock_marker_visible = false;
    }
}

impl ActorBehaviour for Combatant {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_enemy(&self) -> Option<&dyn Enemy> {
        Some(self)
    }

    fn as_enemy_mut(&mut self) -> Option<&mut dyn Enemy> {
        Some(self)
    }
}

/// Grapple point. While active it tracks how far away the requesting character is.
#[derive(Debug)]
pub struct GrapplePoint {
    pub landing_offset: Vec3,
    /// Launches from closer than this are refused
    pub min_distance: f32,
    active: bool,
    requester: Option<ActorId>,
    interact_range: f32,
    detection_range: f32,
    distance_to_requester: f32,
}

impl GrapplePoint {
    pub fn new(landing_offset: Vec3) -> Self {
        Self {
            landing_offset,
            min_distance: 2.0,
            active: false,
            requester: None,
            interact_range: 0.0,
            detection_range: 0.0,
            distance_to_requester: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn requester(&self) -> Option<ActorId> {
        self.requester
    }

    pub fn interact_range(&self) -> f32 {
        self.interact_range
    }

    pub fn detection_range(&self) -> f32 {
        self.detection_range
    }

    pub fn distance_to_requester(&self) -> f32 {
        self.distance_to_requester
    }
}

impl Grapple for GrapplePoint {
    fn on_activate(&mut self, requester: ActorId, interact_range: f32, detection_range: f32) {
        self.requester = Some(requester);
        self.interact_range = interact_range;
        self.detection_range = detection_range;
        self.active = true;
    }

    fn on_deactivate(&mut self) {
        self.requester = None;
        self.interact_range = 0.0;
        self.detection_range = 0.0;
        self.active = false;
    }

    fn landing_location(&self, position: Vec3) -> Vec3 {
        position + self.landing_offset
    }

    fn min_launch_distance(&self) -> f32 {
        self.min_distance
    }
}

impl ActorBehaviour for GrapplePoint {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_grapple(&self) -> Option<&dyn Grapple> {
        Some(self)
    }

    fn as_grapple_mut(&mut self) -> Option<&mut dyn Grapple> {
        Some(self)
    }

    fn tick(&mut self, position: Vec3, locate: &dyn Fn(ActorId) -> Option<Vec3>) {
        if !self.active {
            return;
        }
        match self.requester.and_then(locate) {
            Some(requester_position) => {
                self.distance_to_requester = position.distance(requester_position);
            }
            None => {
                debug!("Grapple requester vanished, deactivating");
                self.on_deactivate();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combatant_marker_follows_selection() {
        let mut combatant = Combatant::default();
        combatant.on_selected();
        assert!(combatant.lock_marker_visible);
        combatant.on_deselected();
        assert!(!combatant.lock_marker_visible);
    }

    #[test]
    fn test_grapple_point_tracks_requester() {
        let requester = ActorId::from_raw(4, 0);
        let mut point = GrapplePoint::new(Vec3::new(0.0, 1.0, 0.0));
        point.on_activate(requester, 6.0, 10.0);
        assert!(point.is_active());

        let locate = |id: ActorId| (id == requester).then_some(Vec3::new(3.0, 0.0, 4.0));
        point.tick(Vec3::ZERO, &locate);
        assert!((point.distance_to_requester() - 5.0).abs() < 1e-5);
        assert_eq!(point.min_launch_distance(), 2.0);
        assert_eq!(point.landing_location(Vec3::ZERO), Vec3::new(0.0, 1.0, 0.0));

        point.on_deactivate();
        assert!(!point.is_active());
        assert_eq!(point.requester(), None);
        assert_eq!(point.interact_range(), 0.0);
    }

    #[test]
    fn test_grapple_point_drops_vanished_requester() {
        let mut point = GrapplePoint::new(Vec3::ZERO);
        point.on_activate(ActorId::from_raw(1, 0), 6.0, 10.0);
        point.tick(Vec3::ZERO, &|_: ActorId| None::<Vec3>);
        assert!(!point.is_active());
    }

    #[test]
    fn test_kinds_expose_capabilities() {
        assert!(ActorKind::TargetDummy.behaviour().as_enemy().is_some());
        assert!(ActorKind::Character.behaviour().as_grapple().is_none());
        let grapple = ActorKind::GrapplePoint {
            landing_offset: Vec3::Y,
        };
        assert!(grapple.behaviour().as_grapple().is_some());
        assert!(grapple.behaviour().as_enemy().is_none());
    }
}
