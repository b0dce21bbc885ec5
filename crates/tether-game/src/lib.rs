//! Tether Game - Character gameplay and replication
//!
//! Provides the networked third-person character: movement actions, target lock, grapple
//! detection and launch, animation state, and the server/client sessions that replicate it.

pub mod actions;
pub mod actors;
pub mod animation;
pub mod camera;
pub mod capability;
pub mod character;
pub mod config;
pub mod error;
pub mod grapple;
pub mod input;
pub mod montage;
pub mod movement;
pub mod protocol;
pub mod scene;
pub mod session;
pub mod state;
pub mod target_lock;

pub use actions::{ActionTimer, DodgeRollOutcome, MovementActionController};
pub use actors::{ActorKind, Combatant, GrapplePoint};
pub use animation::{AnimationState, AnimationStateCalculator, MovementDirection, VelocityBlend};
pub use camera::{CameraConfig, CameraController, CameraView};
pub use capability::{ActorBehaviour, Enemy, Grapple};
pub use character::Character;
pub use config::{
    AnimationConfig, Capabilities, CharacterConfig, DirectionThresholds, GrappleConfig,
    LocomotionConfig, LockOnConfig,
};
pub use error::GameError;
pub use grapple::{suggest_arc_velocity, GrappleDetectionController};
pub use input::{InputAction, InputState};
pub use montage::{Montage, MontagePlayer, MontageSet};
pub use movement::{CharacterMovement, MovementConfig, MovementSnapshot, RotationMode};
pub use protocol::{ClientMessage, ServerMessage, ServerRequest};
pub use scene::{Scene, SpatialQuery};
pub use session::{ClientSession, ServerSession};
pub use state::{MovementStance, ReplicatedField, ReplicatedState, ReplicationObserver};
pub use target_lock::{select_target, LockToggle, TargetLockController};
