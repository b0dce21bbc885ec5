//! Gameplay errors
//!
//! Unmet gameplay preconditions are not errors; these cover requests the authority
//! rejects and problems with the world or the wire.

use tether_core::{ActorId, ArenaError};
use tether_net::{NetError, PeerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("actor {0} is not alive")]
    StaleActor(ActorId),

    #[error("actor {0} cannot be locked onto")]
    NotLockable(ActorId),

    #[error("lock target {target} is {distance:.2}m away, limit {limit:.2}m")]
    TargetTooFar {
        target: ActorId,
        distance: f32,
        limit: f32,
    },

    #[error("peer {peer} does not control actor {actor}")]
    NotOwner { peer: PeerId, actor: ActorId },

    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Net(#[from] NetError),
}
