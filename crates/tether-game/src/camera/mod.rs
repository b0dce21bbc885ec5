//! Camera system module
//!
//! Spring-arm third-person camera with a controller rotation driven by look input, a boom
//! rotation used while locked on, and a short timeline that smooths lock transitions.

mod config;
mod controller;

pub use config::CameraConfig;
pub use controller::{CameraController, CameraView, RotationTimeline};
