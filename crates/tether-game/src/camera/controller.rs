//! Spring-arm camera controller

use glam::{Vec2, Vec3};
use rapier3d::prelude::{ColliderHandle, QueryFilter};
use tether_core::ViewRotation;
use tether_physics::PhysicsWorld;

use super::CameraConfig;

/// Camera pose used for view-dependent target selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub forward: Vec3,
    pub fov_degrees: f32,
}

/// Timed interpolation between two view rotations
#[derive(Debug, Clone, Default)]
pub struct RotationTimeline {
    from: ViewRotation,
    to: ViewRotation,
    duration: f32,
    elapsed: f32,
    playing: bool,
}

impl RotationTimeline {
    /// Start interpolating from `from` to `to` over `duration` seconds
    pub fn play(&mut self, from: ViewRotation, to: ViewRotation, duration: f32) {
        self.from = from;
        self.to = to;
        self.duration = duration.max(0.0);
        self.elapsed = 0.0;
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Advance and return the interpolated rotation, or `None` when not playing
    pub fn advance(&mut self, dt: f32) -> Option<ViewRotation> {
        if !self.playing {
            return None;
        }
        self.elapsed += dt;
        let t = if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        };
        if t >= 1.0 {
            self.playing = false;
        }
        Some(ViewRotation::lerp(self.from, self.to, t))
    }
}

/// Camera controller
pub struct CameraController {
    /// Configuration
    pub config: CameraConfig,
    /// Whether the boom follows the controller rotation (free look)
    pub follow_control_rotation: bool,
    /// Drops look input, set while locked on
    pub ignore_look_input: bool,
    /// Controller rotation, driven by look input
    control: ViewRotation,
    /// Boom rotation, used when not following the controller
    boom: ViewRotation,
    /// Pivot offset from the capsule center
    boom_offset: Vec3,
    /// Offset captured before a crouch inset, restored afterwards
    original_boom_offset: Option<Vec3>,
    timeline: RotationTimeline,
    /// Spring arm pivot (computed each frame)
    pivot: Vec3,
    /// Camera world position (computed each frame)
    position: Vec3,
}

impl CameraController {
    /// Create a new camera controller
    pub fn new() -> Self {
        Self::with_config(CameraConfig::default())
    }

    /// Create a camera controller with custom config
    pub fn with_config(config: CameraConfig) -> Self {
        let boom_offset = config.boom_offset;
        Self {
            config,
            follow_control_rotation: true,
            ignore_look_input: false,
            control: ViewRotation::default(),
            boom: ViewRotation::default(),
            boom_offset,
            original_boom_offset: None,
            timeline: RotationTimeline::default(),
            pivot: Vec3::ZERO,
            position: Vec3::ZERO,
        }
    }

    /// Get the camera's current world position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Spring arm pivot the camera orbits
    pub fn pivot(&self) -> Vec3 {
        self.pivot
    }

    pub fn control_rotation(&self) -> ViewRotation {
        self.control
    }

    pub fn set_control_rotation(&mut self, rotation: ViewRotation) {
        self.control = self.clamp_pitch(rotation).normalized();
    }

    pub fn boom_rotation(&self) -> ViewRotation {
        self.boom
    }

    /// Rotation the camera currently renders with
    pub fn view_rotation(&self) -> ViewRotation {
        if self.follow_control_rotation {
            self.control
        } else {
            self.boom
        }
    }

    /// Get the camera's forward direction
    pub fn forward(&self) -> Vec3 {
        self.view_rotation().forward()
    }

    /// Get the camera's right direction
    pub fn right(&self) -> Vec3 {
        self.view_rotation().right()
    }

    pub fn fov_degrees(&self) -> f32 {
        self.config.fov_degrees
    }

    /// Current pose for selection queries
    pub fn view(&self) -> CameraView {
        CameraView {
            position: self.position,
            forward: self.forward(),
            fov_degrees: self.config.fov_degrees,
        }
    }

    pub fn boom_offset(&self) -> Vec3 {
        self.boom_offset
    }

    /// Handle look input
    pub fn handle_look(&mut self, delta: Vec2) {
        if self.ignore_look_input {
            return;
        }
        let yaw = self.control.yaw + delta.x * self.config.sensitivity;
        let pitch = self.control.pitch - delta.y * self.config.sensitivity;
        self.set_control_rotation(ViewRotation::new(yaw, pitch));
    }

    /// Raise the pivot by `height`, e.g. to hide the capsule shrinking on crouch
    pub fn set_boom_inset(&mut self, height: f32) {
        let original = *self.original_boom_offset.get_or_insert(self.boom_offset);
        self.boom_offset = original + Vec3::Y * height;
    }

    /// Put the pivot back where it was before the inset
    pub fn restore_boom_offset(&mut self) {
        if let Some(original) = self.original_boom_offset.take() {
            self.boom_offset = original;
        }
    }

    pub fn is_timeline_playing(&self) -> bool {
        self.timeline.is_playing()
    }

    /// Smoothly turn the controller toward `target` with a pitch offset in radians
    pub fn point_at(&mut self, target: Vec3, pitch_offset: f32, duration: f32) {
        let end = ViewRotation::look_at(self.pivot, target).with_pitch_offset(pitch_offset);
        self.timeline.play(self.control, end, duration);
    }

    /// Stop following the controller, keeping the current view
    pub fn detach_boom(&mut self) {
        if self.follow_control_rotation {
            self.boom = self.control;
        }
        self.follow_control_rotation = false;
    }

    /// Hold the boom on `target` while locked. Skipped while the timeline is playing.
    pub fn aim_at(&mut self, target: Vec3, pitch_offset: f32) {
        if self.timeline.is_playing() {
            return;
        }
        self.boom = ViewRotation::look_at(self.pivot, target)
            .with_pitch_offset(pitch_offset)
            .normalized();
        self.control = self.boom;
    }

    /// Return to free look.
    ///
    /// Coming out of a lock the controller takes over the boom rotation, which is what the
    /// camera already renders, and an unfinished engage transition is dropped. Otherwise the
    /// controller swings back behind the character.
    pub fn reset(&mut self, was_locked: bool, facing_yaw: f32, duration: f32) {
        if was_locked {
            self.timeline.stop();
            self.control = self.boom;
            self.follow_control_rotation = true;
        } else {
            self.timeline
                .play(self.control, ViewRotation::new(facing_yaw, 0.0), duration);
        }
    }

    /// Advance the transition timeline. While locked it drives the boom, otherwise the controller.
    pub fn advance_timeline(&mut self, dt: f32, locked: bool) {
        if let Some(rotation) = self.timeline.advance(dt) {
            if locked {
                self.boom = rotation;
            } else {
                self.control = rotation;
            }
        }
    }

    /// Place the camera for this frame behind the pivot, pulled in by level geometry.
    ///
    /// `ignore` is the owner's capsule, which always contains the pivot.
    pub fn update(
        &mut self,
        capsule_center: Vec3,
        physics: Option<&PhysicsWorld>,
        ignore: Option<ColliderHandle>,
    ) {
        self.pivot = capsule_center + self.boom_offset;

        let rotation = self.view_rotation();
        let offset_dir = -rotation.forward();
        let shoulder = rotation.right() * self.config.shoulder_offset;
        let ray_start = self.pivot + shoulder;
        let ideal_position = ray_start + offset_dir * self.config.arm_length;

        let Some(physics) = physics else {
            self.position = ideal_position;
            return;
        };

        let mut filter = QueryFilter::default().exclude_sensors();
        if let Some(handle) = ignore {
            filter = filter.exclude_collider(handle);
        }
        let ray_length = self.config.arm_length + self.config.collision_radius;

        self.position = match physics.raycast(ray_start, offset_dir, ray_length, filter) {
            Some((_handle, toi)) => {
                // Camera would clip - move it closer
                let safe_distance =
                    (toi - self.config.collision_radius).max(self.config.min_arm_length);
                ray_start + offset_dir * safe_distance
            }
            None => ideal_position,
        };
    }

    fn clamp_pitch(&self, rotation: ViewRotation) -> ViewRotation {
        let pitch_min = self.config.pitch_min.to_radians();
        let pitch_max = self.config.pitch_max.to_radians();
        ViewRotation::new(rotation.yaw, rotation.pitch.clamp(pitch_min, pitch_max))
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_pitch_clamping() {
        let mut camera = CameraController::new();
        camera.handle_look(Vec2::new(0.0, -10_000.0));
        assert!(camera.control_rotation().pitch <= camera.config.pitch_max.to_radians() + 0.01);

        camera.handle_look(Vec2::new(0.0, 10_000.0));
        assert!(camera.control_rotation().pitch >= camera.config.pitch_min.to_radians() - 0.01);
    }

    #[test]
    fn test_look_input_ignored_while_flagged() {
        let mut camera = CameraController::new();
        camera.ignore_look_input = true;
        camera.handle_look(Vec2::new(100.0, 100.0));
        assert_eq!(camera.control_rotation(), ViewRotation::default());
    }

    #[test]
    fn test_timeline_reaches_end() {
        let mut timeline = RotationTimeline::default();
        let end = ViewRotation::new(1.0, -0.5);
        timeline.play(ViewRotation::default(), end, 1.0 / 6.0);
        assert!(timeline.is_playing());

        let halfway = timeline.advance(1.0 / 12.0).unwrap();
        assert!((halfway.yaw - 0.5).abs() < 1e-4);
        assert!(timeline.is_playing());

        let last = timeline.advance(1.0).unwrap();
        assert!((last.yaw - 1.0).abs() < 1e-5);
        assert!(!timeline.is_playing());
        assert!(timeline.advance(0.1).is_none());
    }

    #[test]
    fn test_crouch_inset_restores_original_offset() {
        let mut camera = CameraController::new();
        let original = camera.boom_offset();
        camera.set_boom_inset(0.3);
        camera.set_boom_inset(0.3);
        assert!((camera.boom_offset().y - (original.y + 0.3)).abs() < 1e-6);
        camera.restore_boom_offset();
        assert_eq!(camera.boom_offset(), original);
    }

    #[test]
    fn test_aim_waits_for_timeline() {
        let mut camera = CameraController::new();
        camera.update(Vec3::ZERO, None, None);
        camera.point_at(Vec3::new(10.0, 0.0, 0.0), 0.0, 0.2);
        camera.aim_at(Vec3::new(0.0, 0.0, 10.0), 0.0);
        assert_eq!(camera.boom_rotation(), ViewRotation::default());

        camera.advance_timeline(1.0, false);
        assert!((camera.control_rotation().yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-3);

        camera.aim_at(Vec3::new(0.0, 0.6, 10.0), 0.0);
        assert!((camera.boom_rotation().yaw.abs() - std::f32::consts::PI).abs() < 1e-3);
        assert_eq!(camera.control_rotation(), camera.boom_rotation());
    }

    #[test]
    fn test_reset_after_lock_hands_boom_to_controller() {
        let mut camera = CameraController::new();
        camera.follow_control_rotation = false;
        camera.update(Vec3::ZERO, None, None);
        camera.aim_at(Vec3::new(10.0, 0.6, 0.0), 0.0);

        camera.reset(true, 0.0, 0.2);
        assert!(camera.follow_control_rotation);
        assert!(!camera.is_timeline_playing());
        assert_eq!(camera.view_rotation(), camera.boom_rotation());
    }

    #[test]
    fn test_release_mid_engage_keeps_view() {
        let mut camera = CameraController::new();
        camera.update(Vec3::ZERO, None, None);
        camera.point_at(Vec3::new(10.0, 0.0, 0.0), 0.0, 1.0 / 6.0);
        camera.detach_boom();
        camera.advance_timeline(1.0 / 24.0, true);
        let view = camera.view_rotation();
        assert!(view.yaw > 0.0 && view.yaw < std::f32::consts::FRAC_PI_2);

        camera.reset(true, 0.0, 1.0 / 6.0);
        assert!(!camera.is_timeline_playing());
        assert_eq!(camera.view_rotation(), view);

        camera.advance_timeline(1.0, false);
        assert_eq!(camera.view_rotation(), view);
    }

    #[test]
    fn test_detach_keeps_view() {
        let mut camera = CameraController::new();
        camera.set_control_rotation(ViewRotation::new(0.4, -0.2));
        camera.detach_boom();
        assert!(!camera.follow_control_rotation);
        assert_eq!(camera.view_rotation(), ViewRotation::new(0.4, -0.2));
    }

    #[test]
    fn test_camera_pulled_in_by_wall() {
        let mut physics = PhysicsWorld::new();
        physics.create_static_box(Vec3::new(5.0, 5.0, 0.1), Vec3::new(0.0, 1.0, 2.0));

        let mut camera = CameraController::new();
        camera.update(Vec3::new(0.0, 0.9, 0.0), Some(&physics), None);
        assert!(camera.position().z < 1.9);

        let mut open = CameraController::new();
        open.update(Vec3::new(0.0, 0.9, 0.0), None, None);
        assert!((open.position().z - open.config.arm_length).abs() < 1e-4);
    }
}
