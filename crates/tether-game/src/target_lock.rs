//! Target lock
//!
//! The controlling side picks a target from the replicated lockable list and asks the
//! authority to lock it. The authority validates the request, commits the lock fields and
//! keeps the lockable list in step with the detection volume. While locked, the controlling
//! side holds the camera on the target and releases the lock once it drifts out of range.

use glam::Vec3;
use tether_core::direction::{point_to_line_distance, within_half_fov};
use tether_core::ActorId;
use tether_physics::QueryChannel;
use tracing::{debug, info};

use crate::camera::{CameraController, CameraView};
use crate::config::LockOnConfig;
use crate::error::GameError;
use crate::scene::{Scene, SpatialQuery};
use crate::state::{ReplicatedField, ReplicatedState};

/// A lockable actor and where it is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockCandidate {
    pub actor: ActorId,
    pub position: Vec3,
}

/// Pick the candidate closest to the view ray.
///
/// Candidates outside half the camera FOV are skipped. The winner's distance from the ray
/// must be strictly below `threshold`; on a tie the earlier candidate wins.
pub fn select_target(
    candidates: &[LockCandidate],
    view: &CameraView,
    threshold: f32,
) -> Option<ActorId> {
    let mut best = None;
    let mut best_distance = threshold;
    for candidate in candidates {
        let to_target = candidate.position - view.position;
        if !within_half_fov(view.forward, to_target, view.fov_degrees) {
            continue;
        }
        let distance = point_to_line_distance(candidate.position, view.position, view.forward);
        if distance < best_distance {
            best_distance = distance;
            best = Some(candidate.actor);
        }
    }
    best
}

/// Outcome of pressing the lock input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockToggle {
    /// A target was picked; request a lock on it
    Engage(ActorId),
    /// The current lock should be released
    Release,
    /// Nothing to lock onto, the camera swings back behind the character
    NoCandidate,
}

#[derive(Debug)]
pub struct TargetLockController {
    pub config: LockOnConfig,
    /// Lock change sent to the authority and not yet seen in the replicated state
    requested: Option<Option<ActorId>>,
}

impl TargetLockController {
    pub fn new(config: LockOnConfig) -> Self {
        Self {
            config,
            requested: None,
        }
    }

    fn pitch_offset(&self) -> f32 {
        self.config.pitch_offset_degrees.to_radians()
    }

    /// Lockable targets that are still alive and still enemies
    pub fn candidates(&self, state: &ReplicatedState, scene: &Scene) -> Vec<LockCandidate> {
        state
            .lockable_targets()
            .iter()
            .filter(|actor| scene.is_enemy(**actor))
            .filter_map(|actor| {
                scene.position(*actor).map(|position| LockCandidate {
                    actor: *actor,
                    position,
                })
            })
            .collect()
    }

    /// Handle the lock input on the controlling side.
    ///
    /// Runs the local feedback (lock marker, camera transition) right away; the caller
    /// forwards [`LockToggle::Engage`] and [`LockToggle::Release`] to the authority.
    pub fn toggle(
        &mut self,
        state: &ReplicatedState,
        camera: &mut CameraController,
        scene: &mut Scene,
        facing_yaw: f32,
    ) -> LockToggle {
        if let Some(target) = state.locked_on_target() {
            if let Some(enemy) = scene.enemy_mut(target) {
                enemy.on_deselected();
            }
            return LockToggle::Release;
        }

        let candidates = self.candidates(state, scene);
        match select_target(&candidates, &camera.view(), self.config.detection_radius) {
            Some(target) => {
                if let Some(position) = scene.position(target) {
                    camera.point_at(position, self.pitch_offset(), self.config.camera_transition);
                }
                if let Some(enemy) = scene.enemy_mut(target) {
                    enemy.on_selected();
                }
                debug!("Selected lock target {}", target);
                LockToggle::Engage(target)
            }
            None => {
                debug!("No lock candidate among {}", candidates.len());
                camera.reset(false, facing_yaw, self.config.camera_transition);
                LockToggle::NoCandidate
            }
        }
    }

    /// Remember a request so it is sent once. Returns `false` if it is already in flight.
    pub fn mark_requested(&mut self, target: Option<ActorId>) -> bool {
        if self.requested == Some(target) {
            return false;
        }
        self.requested = Some(target);
        true
    }

    pub fn clear_pending(&mut self) {
        self.requested = None;
    }

    pub fn pending(&self) -> Option<Option<ActorId>> {
        self.requested
    }

    /// Authority check for a lock request from `owner`
    pub fn validate_update(
        &self,
        owner: ActorId,
        owner_position: Vec3,
        target: Option<ActorId>,
        scene: &Scene,
    ) -> Result<(), GameError> {
        let Some(target) = target else {
            return Ok(());
        };
        let position = scene.position(target).ok_or(GameError::StaleActor(target))?;
        if target == owner || !scene.is_enemy(target) {
            return Err(GameError::NotLockable(target));
        }
        let distance = owner_position.distance(position);
        let limit = self.config.break_distance + self.config.validation_slack;
        if distance > limit {
            return Err(GameError::TargetTooFar {
                target,
                distance,
                limit,
            });
        }
        Ok(())
    }

    /// Commit a validated lock change
    pub fn commit_update(&self, state: &mut ReplicatedState, target: Option<ActorId>) {
        let locked = target.is_some();
        state.commit(ReplicatedField::LockedOnTarget(target));
        state.commit(ReplicatedField::IsLockedOnTarget(locked));
        state.commit(ReplicatedField::UseDirectionalMovement(locked));
    }

    /// Sync the lockable list with the detection volume (authority, every tick).
    ///
    /// Actors still overlapping keep their place, new ones are appended. A locked target
    /// that left the volume is released.
    pub fn refresh_lockable_targets(
        &self,
        state: &mut ReplicatedState,
        owner: ActorId,
        owner_position: Vec3,
        scene: &Scene,
    ) {
        let overlapping: Vec<ActorId> = scene
            .physics
            .sweep_sphere(owner_position, self.config.detection_radius, QueryChannel::Pawn)
            .into_iter()
            .filter(|actor| *actor != owner && scene.is_enemy(*actor))
            .collect();

        let mut next: Vec<ActorId> = state
            .lockable_targets()
            .iter()
            .copied()
            .filter(|actor| overlapping.contains(actor))
            .collect();
        for actor in overlapping {
            if !next.contains(&actor) {
                debug!("{} entered the lock volume of {}", actor, owner);
                next.push(actor);
            }
        }

        let locked = state.locked_on_target();
        if next.as_slice() != state.lockable_targets() {
            state.commit(ReplicatedField::LockableTargets(next.clone()));
        }
        if let Some(target) = locked {
            if !next.contains(&target) {
                info!("Lock target {} left the volume of {}", target, owner);
                self.commit_update(state, None);
            }
        }
    }

    /// Per-frame work while locked (controlling side).
    ///
    /// Returns `true` when the lock should be released: the target despawned or is at least
    /// `break_distance` away. Otherwise keeps the camera on the target.
    pub fn update_locked(
        &mut self,
        state: &ReplicatedState,
        owner_position: Vec3,
        camera: &mut CameraController,
        scene: &Scene,
    ) -> bool {
        if self.requested == Some(state.locked_on_target()) {
            self.requested = None;
        }
        let Some(target) = state.locked_on_target() else {
            return false;
        };
        let Some(position) = scene.position(target) else {
            debug!("Lock target {} despawned", target);
            return true;
        };
        if owner_position.distance(position) >= self.config.break_distance {
            debug!("Lock on {} broke at distance", target);
            return true;
        }
        camera.aim_at(position, self.pitch_offset());
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::{ActorKind, Combatant};
    use tether_net::NetRole;

    use crate::config::Capabilities;

    fn view() -> CameraView {
        CameraView {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            fov_degrees: 90.0,
        }
    }

    fn candidate(index: u32, position: Vec3) -> LockCandidate {
        LockCandidate {
            actor: ActorId::from_raw(index, 0),
            position,
        }
    }

    #[test]
    fn test_select_target_empty() {
        assert_eq!(select_target(&[], &view(), 20.0), None);
    }

    #[test]
    fn test_select_target_single() {
        let ahead = candidate(1, Vec3::new(1.0, 0.0, -10.0));
        assert_eq!(select_target(&[ahead], &view(), 20.0), Some(ahead.actor));

        let behind = candidate(2, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(select_target(&[behind], &view(), 20.0), None);

        // Inside the FOV but too far from the view ray
        let wide = candidate(3, Vec3::new(30.0, 0.0, -40.0));
        assert_eq!(select_target(&[wide], &view(), 20.0), None);
    }

    #[test]
    fn test_select_target_pair_order_independent() {
        let near_ray = candidate(1, Vec3::new(0.5, 0.0, -10.0));
        let off_ray = candidate(2, Vec3::new(4.0, 0.0, -8.0));
        assert_eq!(
            select_target(&[near_ray, off_ray], &view(), 20.0),
            Some(near_ray.actor)
        );
        assert_eq!(
            select_target(&[off_ray, near_ray], &view(), 20.0),
            Some(near_ray.actor)
        );
    }

    #[test]
    fn test_select_target_tie_keeps_first() {
        let left = candidate(1, Vec3::new(-2.0, 0.0, -10.0));
        let right = candidate(2, Vec3::new(2.0, 0.0, -10.0));
        assert_eq!(select_target(&[left, right], &view(), 20.0), Some(left.actor));
        assert_eq!(select_target(&[right, left], &view(), 20.0), Some(right.actor));
    }

    fn authority() -> ReplicatedState {
        ReplicatedState::new(NetRole::Authority, Capabilities::default())
    }

    #[test]
    fn test_validation_allows_slack() {
        let mut scene = Scene::default();
        let owner = scene.spawn("owner", ActorKind::Character, Vec3::ZERO);
        let near = scene.spawn("near", ActorKind::TargetDummy, Vec3::new(0.0, 0.0, -21.5));
        let far = scene.spawn("far", ActorKind::TargetDummy, Vec3::new(0.0, 0.0, -23.0));
        let hook = scene.spawn(
            "hook",
            ActorKind::GrapplePoint {
                landing_offset: Vec3::ZERO,
            },
            Vec3::new(0.0, 0.0, -3.0),
        );
        let lock = TargetLockController::new(LockOnConfig::default());

        assert!(lock.validate_update(owner, Vec3::ZERO, None, &scene).is_ok());
        assert!(lock
            .validate_update(owner, Vec3::ZERO, Some(near), &scene)
            .is_ok());
        assert!(matches!(
            lock.validate_update(owner, Vec3::ZERO, Some(far), &scene),
            Err(GameError::TargetTooFar { .. })
        ));
        assert!(matches!(
            lock.validate_update(owner, Vec3::ZERO, Some(hook), &scene),
            Err(GameError::NotLockable(_))
        ));
        assert!(matches!(
            lock.validate_update(owner, Vec3::ZERO, Some(owner), &scene),
            Err(GameError::NotLockable(_))
        ));

        scene.despawn(near);
        assert!(matches!(
            lock.validate_update(owner, Vec3::ZERO, Some(near), &scene),
            Err(GameError::StaleActor(_))
        ));
    }

    #[test]
    fn test_commit_sets_all_lock_fields() {
        let lock = TargetLockController::new(LockOnConfig::default());
        let mut state = authority();
        let target = ActorId::from_raw(3, 0);
        lock.commit_update(&mut state, Some(target));
        assert!(state.is_locked_on_target());
        assert_eq!(state.locked_on_target(), Some(target));
        assert!(state.use_directional_movement());

        lock.commit_update(&mut state, None);
        assert!(!state.is_locked_on_target());
        assert!(!state.use_directional_movement());
    }

    #[test]
    fn test_lockable_targets_follow_volume() {
        let mut scene = Scene::default();
        let owner = scene.spawn("owner", ActorKind::Character, Vec3::ZERO);
        let a = scene.spawn("a", ActorKind::TargetDummy, Vec3::new(0.0, 0.0, -5.0));
        let b = scene.spawn("b", ActorKind::TargetDummy, Vec3::new(3.0, 0.0, -5.0));
        scene.tick();

        let lock = TargetLockController::new(LockOnConfig::default());
        let mut state = authority();
        lock.refresh_lockable_targets(&mut state, owner, Vec3::ZERO, &scene);
        let mut listed = state.lockable_targets().to_vec();
        listed.sort_by_key(|id| id.index());
        assert_eq!(listed, vec![a, b]);

        lock.commit_update(&mut state, Some(a));
        scene.set_position(a, Vec3::new(0.0, 0.0, -60.0));
        scene.tick();
        lock.refresh_lockable_targets(&mut state, owner, Vec3::ZERO, &scene);
        assert_eq!(state.lockable_targets(), &[b]);
        assert!(!state.is_locked_on_target());
    }

    #[test]
    fn test_break_distance_releases() {
        let mut scene = Scene::default();
        let target = scene.spawn("a", ActorKind::TargetDummy, Vec3::new(0.0, 0.0, -10.0));
        let mut lock = TargetLockController::new(LockOnConfig::default());
        let mut state = authority();
        lock.commit_update(&mut state, Some(target));
        let mut camera = CameraController::new();

        assert!(!lock.update_locked(&state, Vec3::ZERO, &mut camera, &scene));
        assert!(!lock.update_locked(&state, Vec3::new(0.0, 0.0, 9.99), &mut camera, &scene));
        assert!(lock.update_locked(&state, Vec3::new(0.0, 0.0, 10.0), &mut camera, &scene));

        scene.despawn(target);
        assert!(lock.update_locked(&state, Vec3::ZERO, &mut camera, &scene));
    }

    #[test]
    fn test_lock_stays_on_first_target() {
        let mut scene = Scene::default();
        let a = scene.spawn("a", ActorKind::TargetDummy, Vec3::new(0.0, 0.0, -8.0));
        let b = scene.spawn("b", ActorKind::TargetDummy, Vec3::new(1.0, 0.0, -9.0));
        let mut lock = TargetLockController::new(LockOnConfig::default());
        let mut state = authority();
        state.commit(ReplicatedField::LockableTargets(vec![a, b]));
        let mut camera = CameraController::new();
        camera.update(Vec3::ZERO, None, None);

        let toggle = lock.toggle(&state, &mut camera, &mut scene, 0.0);
        assert_eq!(toggle, LockToggle::Engage(a));
        lock.commit_update(&mut state, Some(a));
        assert!(scene.behaviour::<Combatant>(a).unwrap().lock_marker_visible);

        // B drifting across the view does not steal the lock
        scene.set_position(b, Vec3::new(0.0, 0.0, -4.0));
        for _ in 0..10 {
            camera.advance_timeline(0.05, true);
            assert!(!lock.update_locked(&state, Vec3::ZERO, &mut camera, &scene));
        }
        assert_eq!(state.locked_on_target(), Some(a));

        assert_eq!(
            lock.toggle(&state, &mut camera, &mut scene, 0.0),
            LockToggle::Release
        );
        assert!(!scene.behaviour::<Combatant>(a).unwrap().lock_marker_visible);
    }

    #[test]
    fn test_failed_toggle_resets_camera() {
        let mut scene = Scene::default();
        let mut lock = TargetLockController::new(LockOnConfig::default());
        let state = authority();
        let mut camera = CameraController::new();
        camera.handle_look(glam::Vec2::new(300.0, 0.0));

        assert_eq!(
            lock.toggle(&state, &mut camera, &mut scene, 0.0),
            LockToggle::NoCandidate
        );
        assert!(camera.is_timeline_playing());
        camera.advance_timeline(1.0, false);
        assert!(camera.control_rotation().yaw.abs() < 1e-4);
    }

    #[test]
    fn test_requests_sent_once() {
        let mut lock = TargetLockController::new(LockOnConfig::default());
        assert!(lock.mark_requested(None));
        assert!(!lock.mark_requested(None));
        lock.clear_pending();
        assert!(lock.mark_requested(None));
    }
}
