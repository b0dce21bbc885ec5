//! Action-based input state
//!
//! Devices are mapped elsewhere; this layer only sees normalized 2D move and look vectors
//! plus press/release events for the discrete actions.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Discrete actions a character reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputAction {
    Jump,
    /// Tap to dodge or roll, hold to sprint afterwards
    SprintDodge,
    Crouch,
    /// Toggle target lock
    TargetLock,
    /// Launch toward the active grapple point
    Grapple,
}

/// Current state of all inputs for a frame
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Actions currently held down
    pub held: HashSet<InputAction>,
    /// Actions that were just pressed this frame
    pub just_pressed: HashSet<InputAction>,
    /// Actions that were just released this frame
    pub just_released: HashSet<InputAction>,
    /// Movement stick, x right and y forward, length at most 1
    pub move_axis: Vec2,
    /// Look delta for this frame
    pub look_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, action: InputAction) {
        if self.held.insert(action) {
            self.just_pressed.insert(action);
        }
    }

    pub fn release(&mut self, action: InputAction) {
        if self.held.remove(&action) {
            self.just_released.insert(action);
        }
    }

    /// Set the movement stick, clamping its length to 1
    pub fn set_move_axis(&mut self, axis: Vec2) {
        self.move_axis = axis.clamp_length_max(1.0);
    }

    /// Accumulate look input for this frame
    pub fn add_look(&mut self, delta: Vec2) {
        self.look_delta += delta;
    }

    pub fn is_held(&self, action: InputAction) -> bool {
        self.held.contains(&action)
    }

    pub fn is_just_pressed(&self, action: InputAction) -> bool {
        self.just_pressed.contains(&action)
    }

    pub fn is_just_released(&self, action: InputAction) -> bool {
        self.just_released.contains(&action)
    }

    /// Clear frame-specific data (call at end of frame)
    pub fn clear_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
        self.look_delta = Vec2::ZERO;
    }

    /// Clear all input state
    pub fn clear_all(&mut self) {
        self.held.clear();
        self.clear_frame();
        self.move_axis = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release_edges() {
        let mut input = InputState::new();
        input.press(InputAction::SprintDodge);
        assert!(input.is_just_pressed(InputAction::SprintDodge));
        assert!(input.is_held(InputAction::SprintDodge));

        input.clear_frame();
        input.press(InputAction::SprintDodge);
        assert!(!input.is_just_pressed(InputAction::SprintDodge));

        input.release(InputAction::SprintDodge);
        assert!(input.is_just_released(InputAction::SprintDodge));
        assert!(!input.is_held(InputAction::SprintDodge));
    }

    #[test]
    fn test_move_axis_is_clamped() {
        let mut input = InputState::new();
        input.set_move_axis(Vec2::new(1.0, 1.0));
        assert!((input.move_axis.length() - 1.0).abs() < 1e-5);

        input.clear_all();
        assert_eq!(input.move_axis, Vec2::ZERO);
    }
}
