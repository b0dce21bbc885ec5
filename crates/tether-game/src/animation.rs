//! Procedural animation state
//!
//! Derives the per-frame values a locomotion pose graph blends on: ground speed, stride,
//! a smoothed four-way velocity blend, a hysteretic movement quadrant and a lean vector.
//! Nothing here is replicated; every peer derives it from its own copy of the movement.

use glam::{Vec2, Vec3};
use tether_core::direction::{relative_angle, right_from_yaw, to_local};
use tracing::warn;

use crate::config::{AnimationConfig, DirectionThresholds};
use crate::state::MovementStance;

/// L1 sums at or below this produce no blend
const BLEND_EPSILON: f32 = 1e-4;

/// Four-way movement quadrant relative to facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MovementDirection {
    #[default]
    Forward,
    Backward,
    Left,
    Right,
}

/// Directional blend weights, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityBlend {
    pub forward: f32,
    pub backward: f32,
    pub left: f32,
    pub right: f32,
}

/// Receives stance changes pushed by the action controller
pub trait StanceSubscriber {
    fn on_stance_changed(&mut self, stance: MovementStance);
}

/// Per-frame inputs read from the owning character
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationInput {
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub facing_yaw: f32,
    pub max_walk_speed: f32,
    pub use_directional_movement: bool,
    pub is_falling: bool,
    pub is_crouching: bool,
}

/// Values exposed to the pose graph
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationState {
    pub ground_speed: f32,
    pub should_move: bool,
    /// Ground speed relative to the walk cap, scaled to the 0..3 gait axis
    pub gait_speed: f32,
    pub stride: f32,
    pub velocity_blend: VelocityBlend,
    pub movement_direction: MovementDirection,
    pub lean: Vec2,
    pub is_falling: bool,
    pub is_crouching: bool,
    pub use_directional_movement: bool,
    pub stance: MovementStance,
}

/// Horizontal speed
pub fn ground_speed(velocity: Vec3) -> f32 {
    Vec2::new(velocity.x, velocity.z).length()
}

/// Ground speed over `max_stride_speed`, clamped to [0, 1]
pub fn stride(ground_speed: f32, max_stride_speed: f32) -> f32 {
    if max_stride_speed <= 0.0 {
        return 1.0;
    }
    (ground_speed / max_stride_speed).clamp(0.0, 1.0)
}

/// Split the normalized local velocity into forward/backward/left/right weights.
///
/// The local vector is L1-normalized first, so the weights of a horizontal velocity sum
/// to 1. A near-zero velocity yields no blend.
pub fn velocity_blend(velocity: Vec3, facing_yaw: f32) -> VelocityBlend {
    let local = to_local(velocity.normalize_or_zero(), facing_yaw);
    let sum = local.x.abs() + local.y.abs() + local.z.abs();
    if sum <= BLEND_EPSILON {
        return VelocityBlend::default();
    }
    let relative = local / sum;
    VelocityBlend {
        forward: relative.x.clamp(0.0, 1.0),
        backward: relative.x.clamp(-1.0, 0.0).abs(),
        left: relative.y.clamp(-1.0, 0.0).abs(),
        right: relative.y.clamp(0.0, 1.0),
    }
}

/// Exponential smoothing of every channel toward `target`. A non-positive rate snaps.
pub fn interpolate_velocity_blend(
    current: VelocityBlend,
    target: VelocityBlend,
    rate: f32,
    dt: f32,
) -> VelocityBlend {
    if rate <= 0.0 {
        return target;
    }
    let alpha = 1.0 - (-rate * dt).exp();
    let step = |from: f32, to: f32| from + (to - from) * alpha;
    VelocityBlend {
        forward: step(current.forward, target.forward),
        backward: step(current.backward, target.backward),
        left: step(current.left, target.left),
        right: step(current.right, target.right),
    }
}

/// Inclusive range test, widened by `buffer` for the active quadrant and narrowed otherwise
fn angle_in_range(angle: f32, min: f32, max: f32, buffer: f32, active: bool) -> bool {
    if active {
        angle >= min - buffer && angle <= max + buffer
    } else {
        angle >= min + buffer && angle <= max - buffer
    }
}

/// Classify the velocity into a quadrant relative to facing.
///
/// Checked in the order Forward, Right, Left with Backward as the fallback. The quadrant
/// from the previous frame keeps a wider range so small wobbles around a boundary do not
/// flip the result.
pub fn movement_direction(
    velocity: Vec3,
    facing_yaw: f32,
    thresholds: &DirectionThresholds,
    previous: MovementDirection,
) -> MovementDirection {
    let angle = relative_angle(velocity, facing_yaw);
    let t = thresholds;

    if angle_in_range(
        angle,
        t.forward_left,
        t.forward_right,
        t.buffer,
        previous == MovementDirection::Forward,
    ) {
        MovementDirection::Forward
    } else if angle_in_range(
        angle,
        t.forward_right,
        t.backward_right,
        t.buffer,
        previous == MovementDirection::Right,
    ) {
        MovementDirection::Right
    } else if angle_in_range(
        angle,
        t.backward_left,
        t.forward_left,
        t.buffer,
        previous == MovementDirection::Left,
    ) {
        MovementDirection::Left
    } else {
        MovementDirection::Backward
    }
}

/// Lean vector: x is lateral, y is longitudinal. Zero while falling.
pub fn lean(
    velocity: Vec3,
    facing_yaw: f32,
    max_walk_speed: f32,
    use_directional_movement: bool,
    is_falling: bool,
) -> Vec2 {
    if is_falling || max_walk_speed <= 0.0 {
        return Vec2::ZERO;
    }
    let direction = velocity.normalize_or_zero();
    let scale = ground_speed(velocity) / max_walk_speed;

    if use_directional_movement {
        let local = to_local(direction, facing_yaw);
        Vec2::new(-local.x * scale, local.y * scale)
    } else {
        Vec2::new(-direction.dot(right_from_yaw(facing_yaw)) * scale, 0.0)
    }
}

/// Per-frame animation state for one character
#[derive(Debug, Default)]
pub struct AnimationStateCalculator {
    pub config: AnimationConfig,
    state: AnimationState,
    warned_missing_owner: bool,
}

impl AnimationStateCalculator {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            state: AnimationState::default(),
            warned_missing_owner: false,
        }
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    /// Derive this frame's values. Without an owner the update does nothing.
    pub fn update(&mut self, input: Option<&AnimationInput>, dt: f32) {
        let Some(input) = input else {
            if !self.warned_missing_owner {
                warn!("Animation update without an owning character, skipping");
                self.warned_missing_owner = true;
            }
            return;
        };

        let speed = ground_speed(input.velocity);
        let state = &mut self.state;
        state.ground_speed = speed;
        state.should_move =
            speed > self.config.move_threshold && input.acceleration != Vec3::ZERO;
        state.gait_speed = if input.max_walk_speed > 0.0 {
            speed / input.max_walk_speed * 3.0
        } else {
            0.0
        };
        state.stride = stride(speed, self.config.max_stride_speed);

        let target = velocity_blend(input.velocity, input.facing_yaw);
        state.velocity_blend = interpolate_velocity_blend(
            state.velocity_blend,
            target,
            self.config.blend_interp_speed,
            dt,
        );

        // The quadrant holds while standing still so idle poses keep their side.
        if speed > self.config.move_threshold {
            state.movement_direction = movement_direction(
                input.velocity,
                input.facing_yaw,
                &self.config.thresholds,
                state.movement_direction,
            );
        }

        state.lean = lean(
            input.velocity,
            input.facing_yaw,
            input.max_walk_speed,
            input.use_directional_movement,
            input.is_falling,
        );
        state.is_falling = input.is_falling;
        state.is_crouching = input.is_crouching;
        state.use_directional_movement = input.use_directional_movement;
    }
}

impl StanceSubscriber for AnimationStateCalculator {
    fn on_stance_changed(&mut self, stance: MovementStance) {
        self.state.stance = stance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::direction::forward_from_yaw;

    fn at_angle(degrees: f32) -> Vec3 {
        forward_from_yaw(degrees.to_radians()) * 3.0
    }

    #[test]
    fn test_ground_speed_ignores_vertical() {
        assert!((ground_speed(Vec3::new(3.0, 10.0, 4.0)) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_stride_clamps() {
        assert_eq!(stride(4.0, 2.0), 1.0);
        assert!((stride(1.0, 2.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_blend_forward_only() {
        let blend = velocity_blend(at_angle(0.0), 0.0);
        assert!((blend.forward - 1.0).abs() < 1e-5);
        assert!(blend.backward.abs() < 1e-6);
        assert!(blend.left.abs() < 1e-6);
        assert!(blend.right.abs() < 1e-6);
    }

    #[test]
    fn test_blend_weights_bounded_and_exclusive() {
        for step in 0..72 {
            let blend = velocity_blend(at_angle(step as f32 * 5.0), 0.3);
            for weight in [blend.forward, blend.backward, blend.left, blend.right] {
                assert!((0.0..=1.0).contains(&weight));
            }
            assert!(blend.forward == 0.0 || blend.backward == 0.0);
            assert!(blend.left == 0.0 || blend.right == 0.0);
            assert!(blend.forward + blend.backward <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_blend_diagonal_splits_evenly() {
        let blend = velocity_blend(at_angle(-45.0), 0.0);
        assert!((blend.forward - 0.5).abs() < 1e-4);
        assert!((blend.left - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_blend_degenerate_inputs() {
        assert_eq!(velocity_blend(Vec3::ZERO, 0.0), VelocityBlend::default());
        // Straight down has no horizontal component to distribute.
        assert_eq!(
            velocity_blend(Vec3::new(0.0, -5.0, 0.0), 0.0),
            VelocityBlend::default()
        );
    }

    #[test]
    fn test_interpolation_fixed_point() {
        let target = VelocityBlend {
            forward: 0.25,
            backward: 0.0,
            left: 0.75,
            right: 0.0,
        };
        assert_eq!(interpolate_velocity_blend(target, target, 12.0, 0.016), target);
        assert_eq!(
            interpolate_velocity_blend(VelocityBlend::default(), target, 0.0, 0.016),
            target
        );
    }

    #[test]
    fn test_interpolation_moves_toward_target() {
        let target = VelocityBlend {
            forward: 1.0,
            ..Default::default()
        };
        let next = interpolate_velocity_blend(VelocityBlend::default(), target, 12.0, 0.016);
        assert!(next.forward > 0.0 && next.forward < 1.0);
    }

    #[test]
    fn test_quadrants_are_deterministic() {
        let t = DirectionThresholds::default();
        let prev = MovementDirection::Forward;
        assert_eq!(movement_direction(at_angle(0.0), 0.0, &t, prev), MovementDirection::Forward);
        assert_eq!(movement_direction(at_angle(90.0), 0.0, &t, prev), MovementDirection::Right);
        assert_eq!(movement_direction(at_angle(-90.0), 0.0, &t, prev), MovementDirection::Left);
        assert_eq!(
            movement_direction(at_angle(180.0), 0.0, &t, prev),
            MovementDirection::Backward
        );
        let again = movement_direction(at_angle(90.0), 0.0, &t, prev);
        assert_eq!(again, MovementDirection::Right);
    }

    #[test]
    fn test_quadrant_hysteresis() {
        let t = DirectionThresholds::default();
        // Inside the buffer past the forward/right boundary: keeps the previous quadrant.
        assert_eq!(
            movement_direction(at_angle(72.0), 0.0, &t, MovementDirection::Forward),
            MovementDirection::Forward
        );
        assert_eq!(
            movement_direction(at_angle(68.0), 0.0, &t, MovementDirection::Right),
            MovementDirection::Right
        );
        // Well past the buffer: switches.
        assert_eq!(
            movement_direction(at_angle(80.0), 0.0, &t, MovementDirection::Forward),
            MovementDirection::Right
        );
    }

    #[test]
    fn test_lean_zero_while_falling() {
        assert_eq!(lean(at_angle(90.0), 0.0, 5.0, false, true), Vec2::ZERO);
    }

    #[test]
    fn test_lean_non_directional_is_lateral() {
        // Moving right at 3 m/s with a 5 m/s cap.
        let value = lean(at_angle(90.0), 0.0, 5.0, false, false);
        assert!((value.x + 0.6).abs() < 1e-4);
        assert_eq!(value.y, 0.0);
    }

    #[test]
    fn test_lean_directional_uses_local_axes() {
        let value = lean(at_angle(0.0), 0.0, 5.0, true, false);
        assert!((value.x + 0.6).abs() < 1e-4);
        assert!(value.y.abs() < 1e-4);
    }

    #[test]
    fn test_update_without_owner_is_noop() {
        let mut calculator = AnimationStateCalculator::default();
        calculator.update(None, 0.016);
        calculator.update(None, 0.016);
        assert_eq!(*calculator.state(), AnimationState::default());
        assert!(calculator.warned_missing_owner);
    }

    #[test]
    fn test_update_derives_motion_values() {
        let mut calculator = AnimationStateCalculator::new(AnimationConfig::default());
        calculator.on_stance_changed(MovementStance::Sprinting);
        let input = AnimationInput {
            velocity: at_angle(0.0),
            acceleration: Vec3::new(0.0, 0.0, -1.0),
            max_walk_speed: 6.0,
            ..Default::default()
        };
        calculator.update(Some(&input), 0.016);
        let state = calculator.state();
        assert!(state.should_move);
        assert!((state.gait_speed - 1.5).abs() < 1e-4);
        assert_eq!(state.stride, 1.0);
        assert_eq!(state.stance, MovementStance::Sprinting);
        assert_eq!(state.movement_direction, MovementDirection::Forward);
    }
}
