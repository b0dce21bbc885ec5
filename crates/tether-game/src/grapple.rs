//! Grapple detection and launch
//!
//! Each frame the controlling side sweeps for grapple points, keeps the ones the camera can
//! see inside its FOV, and activates the one most in line with the view. Launching solves a
//! ballistic arc from the character to the active point's landing location.

use glam::Vec3;
use tether_core::direction::within_half_fov;
use tether_core::ActorId;
use tether_physics::QueryChannel;
use tracing::{debug, info};

use crate::camera::CameraView;
use crate::config::GrappleConfig;
use crate::movement::CharacterMovement;
use crate::scene::{Scene, SpatialQuery};

/// Launch velocity that carries a projectile from `start` to `end` under `gravity`.
///
/// The launch direction is blended from straight up (`arc` 0) to straight at the end
/// point (`arc` 1). Returns `None` when no ballistic path exists for that direction.
pub fn suggest_arc_velocity(start: Vec3, end: Vec3, gravity: f32, arc: f32) -> Option<Vec3> {
    let delta = end - start;
    let distance = delta.length();
    if distance <= 1e-4 {
        return None;
    }
    let launch_dir = Vec3::Y.lerp(delta / distance, arc).normalize_or_zero();
    if launch_dir == Vec3::ZERO {
        return None;
    }

    let dx = Vec3::new(delta.x, 0.0, delta.z).length();
    let dy = delta.y;
    let horizontal = Vec3::new(launch_dir.x, 0.0, launch_dir.z).length();
    let angle = launch_dir.y.atan2(horizontal);
    let cos = angle.cos();

    let denominator = 2.0 * cos * cos * (dx * angle.tan() - dy);
    if denominator <= 1e-4 {
        return None;
    }
    let speed_squared = gravity * dx * dx / denominator;
    if !speed_squared.is_finite() || speed_squared < 0.0 {
        return None;
    }
    Some(launch_dir * speed_squared.sqrt())
}

/// A visible grapple point with the alignment score used to rank it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrappleCandidate {
    pub actor: ActorId,
    pub position: Vec3,
}

/// Pick the candidate most in line with the view: largest dot product between camera
/// forward and the direction to the point, inside half the FOV.
pub fn select_grapple(candidates: &[GrappleCandidate], view: &CameraView) -> Option<ActorId> {
    let forward = view.forward.normalize_or_zero();
    let mut best = None;
    let mut best_dot = -1.0;
    for candidate in candidates {
        let to_point = candidate.position - view.position;
        if !within_half_fov(forward, to_point, view.fov_degrees) {
            continue;
        }
        let dot = forward.dot(to_point.normalize_or_zero());
        if dot > best_dot {
            best_dot = dot;
            best = Some(candidate.actor);
        }
    }
    best
}

#[derive(Debug)]
pub struct GrappleDetectionController {
    pub config: GrappleConfig,
    active: Option<ActorId>,
    launching: bool,
}

impl GrappleDetectionController {
    pub fn new(config: GrappleConfig) -> Self {
        Self {
            config,
            active: None,
            launching: false,
        }
    }

    /// Currently activated grapple point
    pub fn active(&self) -> Option<ActorId> {
        self.active
    }

    pub fn is_launching(&self) -> bool {
        self.launching
    }

    /// Grapple points in range that the camera has a clear line to
    pub fn visible_candidates(
        &self,
        owner: ActorId,
        owner_position: Vec3,
        view: &CameraView,
        scene: &Scene,
    ) -> Vec<GrappleCandidate> {
        scene
            .physics
            .sweep_sphere(owner_position, self.config.detection_radius, QueryChannel::Grapple)
            .into_iter()
            .filter(|actor| scene.grapple(*actor).is_some())
            .filter_map(|actor| {
                let position = scene.position(actor)?;
                let hit = scene.physics.line_trace(view.position, position, Some(owner))?;
                (hit.actor == Some(actor)).then_some(GrappleCandidate { actor, position })
            })
            .collect()
    }

    /// Per-frame detection on the controlling side
    pub fn detect(&mut self, owner: ActorId, owner_position: Vec3, view: &CameraView, scene: &mut Scene) {
        let candidates = self.visible_candidates(owner, owner_position, view, scene);
        let best = select_grapple(&candidates, view);
        if best == self.active {
            return;
        }
        self.update_active(best, owner, scene);
    }

    /// Swap the active grapple point, running the deactivate and activate hooks
    pub fn update_active(&mut self, next: Option<ActorId>, owner: ActorId, scene: &mut Scene) {
        if let Some(previous) = self.active.take() {
            if let Some(grapple) = scene.grapple_mut(previous) {
                grapple.on_deactivate();
            }
        }
        if let Some(actor) = next {
            match scene.grapple_mut(actor) {
                Some(grapple) => {
                    grapple.on_activate(
                        owner,
                        self.config.interact_range,
                        self.config.detection_radius,
                    );
                    self.active = Some(actor);
                    debug!("Grapple point {} active for {}", actor, owner);
                }
                None => debug!("Grapple candidate {} lost its capability", actor),
            }
        }
    }

    /// Launch toward the active point's landing location.
    ///
    /// Needs an active point within interact range, no closer than the point's minimum
    /// launch distance, and a solvable arc. Returns the launch velocity that was applied.
    pub fn launch(
        &mut self,
        owner_position: Vec3,
        movement: &mut CharacterMovement,
        scene: &Scene,
    ) -> Option<Vec3> {
        if self.launching {
            return None;
        }
        let actor = self.active?;
        let position = scene.position(actor)?;
        let grapple = scene.grapple(actor)?;
        let distance = owner_position.distance(position);
        if distance > self.config.interact_range {
            debug!("Grapple point {} out of interact range", actor);
            return None;
        }
        if distance < grapple.min_launch_distance() {
            debug!("Grapple point {} too close to launch", actor);
            return None;
        }

        let landing = grapple.landing_location(position);
        let gravity = scene.physics.gravity_magnitude() * movement.config.gravity_scale;
        let Some(velocity) =
            suggest_arc_velocity(owner_position, landing, gravity, self.config.arc)
        else {
            debug!("No launch arc from {} to {}", owner_position, landing);
            return None;
        };
        let velocity = velocity * self.config.launch_modifier;
        movement.launch(velocity);
        self.launching = true;
        info!("Launched toward grapple point {} at {}", actor, velocity);
        Some(velocity)
    }

    /// Clear the launch flag once the character is back on the ground
    pub fn update_landing(&mut self, movement: &CharacterMovement) {
        if self.launching && !movement.is_falling() && movement.velocity().y <= 0.0 {
            self.launching = false;
        }
    }
}
