//! Messages exchanged between sessions

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tether_core::{ActorId, DetailedDirection};
use tether_net::Delta;

use crate::actors::ActorKind;
use crate::movement::MovementSnapshot;
use crate::state::ReplicatedField;

/// Action a controlling client asks the authority to run for its character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerRequest {
    StartSprint,
    EndSprint,
    ToggleCrouch,
    DodgeRoll { direction: DetailedDirection },
    UpdateLockOn { target: Option<ActorId> },
    /// The owner's simulated movement, accepted as-is
    MovementSync(MovementSnapshot),
}

/// Client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub actor: ActorId,
    pub request: ServerRequest,
}

/// Server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The character this client controls
    Welcome { actor: ActorId },
    ActorSpawned {
        actor: ActorId,
        name: String,
        kind: ActorKind,
        position: Vec3,
    },
    ActorDespawned { actor: ActorId },
    /// Every replicated field of a character, sent to a client when it joins
    State {
        actor: ActorId,
        fields: Vec<ReplicatedField>,
    },
    Delta(Delta<ReplicatedField>),
    Movement {
        actor: ActorId,
        snapshot: MovementSnapshot,
    },
    /// A request failed validation and was dropped
    Rejected {
        actor: ActorId,
        request: ServerRequest,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_net::{decode, encode};

    #[test]
    fn test_lock_request_survives_the_wire() {
        let message = ClientMessage {
            actor: ActorId::from_raw(2, 1),
            request: ServerRequest::UpdateLockOn {
                target: Some(ActorId::from_raw(5, 3)),
            },
        };
        let bytes = encode(&message).unwrap();
        let decoded: ClientMessage = decode(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_spawn_announcement_survives_the_wire() {
        let message = ServerMessage::ActorSpawned {
            actor: ActorId::from_raw(1, 0),
            name: "hook".to_string(),
            kind: ActorKind::GrapplePoint {
                landing_offset: Vec3::new(0.0, 1.5, 0.0),
            },
            position: Vec3::new(4.0, 3.0, -2.0),
        };
        let decoded: ServerMessage = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
    }
}
