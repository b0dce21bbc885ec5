//! Tether Core - Core types and utilities shared across the Tether workspace
//!
//! This crate provides the foundational types used by every other crate:
//! - Mathematical primitives (re-exported from glam)
//! - Transform and view rotation types using the workspace yaw convention
//! - Direction utilities (camera-relative input, octant classification)
//! - Generational actor handles
//! - Fixed-rate simulation clock and one-shot timers

pub mod arena;
pub mod direction;
pub mod time;
pub mod timer;
pub mod types;

pub use arena::{ActorId, Arena, ArenaError};
pub use direction::DetailedDirection;
pub use glam::{Quat, Vec2, Vec3};
pub use time::{ClockConfig, TickClock};
pub use timer::{TimerHandle, TimerManager};
pub use types::{Transform, ViewRotation};
