//! Networked character
//!
//! A [`Character`] bundles movement, camera and the gameplay controllers for one actor and
//! routes everything through its [`ReplicatedState`]. The controlling peer turns input into
//! [`ServerRequest`]s; the authority validates and commits them; every peer reacts to the
//! resulting field changes in its `on_changed_<field>` hooks.

use glam::Vec3;
use tether_core::direction::input_direction_xy;
use tether_core::ActorId;
use tether_net::{Delta, NetRole};
use tether_physics::CharacterControllerConfig;
use tracing::{debug, warn};

use crate::actions::{dodge_direction, montage_key, MovementActionController};
use crate::actors::ActorKind;
use crate::animation::{AnimationInput, AnimationStateCalculator, StanceSubscriber};
use crate::camera::CameraController;
use crate::config::{Capabilities, CharacterConfig};
use crate::error::GameError;
use crate::grapple::GrappleDetectionController;
use crate::input::{InputAction, InputState};
use crate::montage::{AnimationPlayback, MontagePlayer};
use crate::movement::{CharacterMovement, MovementSnapshot, RotationMode};
use crate::protocol::ServerRequest;
use crate::scene::Scene;
use crate::state::{
    dispatch, MovementStance, ReplicatedField, ReplicatedState, ReplicationObserver,
};
use crate::target_lock::{LockToggle, TargetLockController};

pub struct Character {
    id: ActorId,
    /// Driven by input on this peer
    locally_controlled: bool,
    pub config: CharacterConfig,
    pub movement: CharacterMovement,
    pub camera: CameraController,
    pub state: ReplicatedState,
    pub actions: MovementActionController,
    pub lock_on: TargetLockController,
    pub grapple: GrappleDetectionController,
    pub animation: AnimationStateCalculator,
    pub montages: MontagePlayer,
    /// Requests waiting to be sent to the authority
    outbox: Vec<ServerRequest>,
}

impl Character {
    /// Spawn a new character actor with its feet at `position`
    pub fn spawn(
        scene: &mut Scene,
        name: &str,
        position: Vec3,
        role: NetRole,
        locally_controlled: bool,
        config: CharacterConfig,
    ) -> Self {
        let body = CharacterControllerConfig::default();
        let center = position + Vec3::Y * body.height / 2.0;
        let id = scene.spawn(name, ActorKind::Character, center);
        Self::build(scene, id, position, body, role, locally_controlled, config)
    }

    /// Wrap an actor that is already in the scene, e.g. one mirrored from the authority
    pub fn attach(
        scene: &mut Scene,
        id: ActorId,
        role: NetRole,
        locally_controlled: bool,
        config: CharacterConfig,
    ) -> Result<Self, GameError> {
        let center = scene.position(id).ok_or(GameError::StaleActor(id))?;
        let body = CharacterControllerConfig::default();
        let feet = center - Vec3::Y * body.height / 2.0;
        Ok(Self::build(
            scene,
            id,
            feet,
            body,
            role,
            locally_controlled,
            config,
        ))
    }

    fn build(
        scene: &mut Scene,
        id: ActorId,
        feet: Vec3,
        body: CharacterControllerConfig,
        role: NetRole,
        locally_controlled: bool,
        config: CharacterConfig,
    ) -> Self {
        let mut movement = CharacterMovement::new(config.movement.clone(), body);
        movement.max_walk_speed = config.locomotion.run_speed;
        movement.max_crouch_speed = config.locomotion.crouch_speed;
        movement.spawn(&mut scene.physics, feet, id);
        scene.set_position(id, movement.center_position());

        let mut camera = CameraController::with_config(config.camera.clone());
        camera.update(
            movement.center_position(),
            Some(&scene.physics),
            movement.body.collider_handle,
        );

        debug!("Character {} ready as {:?}", id, role);
        Self {
            id,
            locally_controlled,
            movement,
            camera,
            state: ReplicatedState::new(role, config.locomotion.capabilities),
            actions: MovementActionController::new(config.locomotion.clone()),
            lock_on: TargetLockController::new(config.lock_on.clone()),
            grapple: GrappleDetectionController::new(config.grapple.clone()),
            animation: AnimationStateCalculator::new(config.animation.clone()),
            montages: MontagePlayer::new(),
            outbox: Vec::new(),
            config,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn role(&self) -> NetRole {
        self.state.role()
    }

    pub fn is_locally_controlled(&self) -> bool {
        self.locally_controlled
    }

    /// Capsule center, which is also the actor position
    pub fn position(&self) -> Vec3 {
        self.movement.center_position()
    }

    /// Turn one frame of input into movement and action requests
    pub fn handle_input(&mut self, input: &InputState, scene: &mut Scene) {
        if !self.locally_controlled {
            return;
        }
        self.camera.handle_look(input.look_delta);
        let direction = input_direction_xy(self.camera.view_rotation().yaw, input.move_axis);
        self.movement.add_input(direction);

        if input.is_just_pressed(InputAction::Jump) {
            self.jump(scene);
        }
        if input.is_just_pressed(InputAction::SprintDodge) {
            let direction = dodge_direction(
                self.movement.last_input_vector(),
                self.movement.velocity(),
                self.movement.facing_yaw(),
                self.config.locomotion.stationary_speed,
            );
            self.request(ServerRequest::DodgeRoll { direction }, scene);
        }
        if input.is_just_released(InputAction::SprintDodge) {
            self.request(ServerRequest::EndSprint, scene);
        }
        if input.is_just_pressed(InputAction::Crouch) {
            self.request(ServerRequest::ToggleCrouch, scene);
        }
        if input.is_just_pressed(InputAction::TargetLock) {
            self.toggle_lock(scene);
        }
        if input.is_just_pressed(InputAction::Grapple) {
            self.launch_on_grapple(scene);
        }
    }

    /// Jump. While crouched the press only stands the character back up. The movement
    /// layer refuses airborne jumps.
    pub fn jump(&mut self, scene: &mut Scene) -> bool {
        if !self.state.can_jump() {
            return false;
        }
        if self.state.is_crouching() {
            self.request(ServerRequest::ToggleCrouch, scene);
            return false;
        }
        self.movement.jump()
    }

    /// Press the lock input
    pub fn toggle_lock(&mut self, scene: &mut Scene) {
        let facing = self.movement.facing_yaw();
        let target = match self
            .lock_on
            .toggle(&self.state, &mut self.camera, scene, facing)
        {
            LockToggle::Engage(target) => Some(target),
            LockToggle::Release => None,
            LockToggle::NoCandidate => return,
        };
        if self.lock_on.mark_requested(target) {
            self.request(ServerRequest::UpdateLockOn { target }, scene);
        }
    }

    fn release_lock(&mut self, scene: &mut Scene) {
        if !self.lock_on.mark_requested(None) {
            return;
        }
        if let Some(enemy) = self
            .state
            .locked_on_target()
            .and_then(|target| scene.enemy_mut(target))
        {
            enemy.on_deselected();
        }
        self.request(ServerRequest::UpdateLockOn { target: None }, scene);
    }

    /// Launch toward the active grapple point
    pub fn launch_on_grapple(&mut self, scene: &Scene) -> Option<Vec3> {
        let position = self.movement.center_position();
        self.grapple.launch(position, &mut self.movement, scene)
    }

    /// Run a request here when authoritative, otherwise queue it for the authority
    pub fn request(&mut self, request: ServerRequest, scene: &mut Scene) {
        if !self.state.has_authority() {
            self.outbox.push(request);
            return;
        }
        if let Err(err) = self.handle_request(&request, scene) {
            warn!("Dropped {:?} for {}: {}", request, self.id, err);
            self.handle_rejection(&request, scene);
        }
    }

    /// Validate and apply a request on the authority
    pub fn handle_request(
        &mut self,
        request: &ServerRequest,
        scene: &mut Scene,
    ) -> Result<(), GameError> {
        let falling = self.movement.is_falling();
        match request {
            ServerRequest::StartSprint => {
                self.actions.start_sprint(&mut self.state, falling);
            }
            ServerRequest::EndSprint => self.actions.end_sprint(&mut self.state),
            ServerRequest::ToggleCrouch => {
                self.actions.toggle_crouch(&mut self.state, falling);
            }
            ServerRequest::DodgeRoll { direction } => {
                self.actions
                    .dodge_roll(&mut self.state, falling, *direction);
            }
            ServerRequest::UpdateLockOn { target } => {
                self.lock_on
                    .validate_update(self.id, self.position(), *target, scene)?;
                self.lock_on.commit_update(&mut self.state, *target);
            }
            ServerRequest::MovementSync(snapshot) => {
                if !self.locally_controlled {
                    self.apply_movement(snapshot, scene);
                }
            }
        }
        self.flush_reactions(scene);
        Ok(())
    }

    /// Undo local feedback for a request the authority dropped
    pub fn handle_rejection(&mut self, request: &ServerRequest, scene: &mut Scene) {
        let ServerRequest::UpdateLockOn { target } = request else {
            return;
        };
        self.lock_on.clear_pending();
        if let Some(target) = *target {
            if self.state.locked_on_target() != Some(target) {
                if let Some(enemy) = scene.enemy_mut(target) {
                    enemy.on_deselected();
                }
            }
        }
        if !self.state.is_locked_on_target() {
            self.camera.reset(
                false,
                self.movement.facing_yaw(),
                self.config.lock_on.camera_transition,
            );
        }
    }

    /// Replace the capability gates (authority)
    pub fn set_capabilities(&mut self, capabilities: Capabilities, scene: &mut Scene) {
        self.actions.set_capabilities(&mut self.state, capabilities);
        self.flush_reactions(scene);
    }

    /// Requests queued for the authority since the last call
    pub fn take_requests(&mut self) -> Vec<ServerRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Committed changes since the last call, for broadcasting
    pub fn take_delta(&mut self) -> Option<Delta<ReplicatedField>> {
        self.state.take_delta(self.id)
    }

    /// Apply changes received from the authority
    pub fn apply_delta(&mut self, delta: &Delta<ReplicatedField>, scene: &mut Scene) {
        for change in &delta.changes {
            self.state.apply_remote(change.clone());
        }
        self.flush_reactions(scene);
    }

    pub fn movement_snapshot(&self) -> MovementSnapshot {
        self.movement.snapshot()
    }

    /// Mirror the owner's movement
    pub fn apply_movement(&mut self, snapshot: &MovementSnapshot, scene: &mut Scene) {
        self.movement.apply_snapshot(&mut scene.physics, snapshot);
        scene.set_position(self.id, self.movement.center_position());
    }

    /// Advance one frame
    pub fn tick(&mut self, scene: &mut Scene, dt: f32) {
        if self.locally_controlled {
            let control_yaw = self.camera.control_rotation().yaw;
            self.movement
                .fixed_update(&mut scene.physics, control_yaw, dt);
            scene.set_position(self.id, self.movement.center_position());
            if !self.state.has_authority() {
                self.outbox
                    .push(ServerRequest::MovementSync(self.movement.snapshot()));
            }
        }

        if self.state.has_authority() {
            let falling = self.movement.is_falling();
            self.actions.tick(&mut self.state, falling, dt);
            self.lock_on.refresh_lockable_targets(
                &mut self.state,
                self.id,
                self.movement.center_position(),
                scene,
            );
        }
        self.flush_reactions(scene);

        if self.locally_controlled {
            self.update_controlling(scene, dt);
        }

        self.montages.advance(dt);
        let input = self.animation_input();
        self.animation.update(Some(&input), dt);
    }

    fn update_controlling(&mut self, scene: &mut Scene, dt: f32) {
        let center = self.movement.center_position();
        self.camera
            .advance_timeline(dt, self.state.is_locked_on_target());
        if self
            .lock_on
            .update_locked(&self.state, center, &mut self.camera, scene)
        {
            self.release_lock(scene);
        }
        self.camera.update(
            center,
            Some(&scene.physics),
            self.movement.body.collider_handle,
        );

        let view = self.camera.view();
        self.grapple.detect(self.id, center, &view, scene);
        self.grapple.update_landing(&self.movement);
    }

    fn animation_input(&self) -> AnimationInput {
        AnimationInput {
            velocity: self.movement.velocity(),
            acceleration: self.movement.acceleration(),
            facing_yaw: self.movement.facing_yaw(),
            max_walk_speed: self.movement.max_walk_speed,
            use_directional_movement: self.state.use_directional_movement(),
            is_falling: self.movement.is_falling(),
            is_crouching: self.state.is_crouching(),
        }
    }

    fn flush_reactions(&mut self, scene: &mut Scene) {
        loop {
            let reactions = self.state.take_reactions();
            if reactions.is_empty() {
                break;
            }
            for reaction in &reactions {
                dispatch(self, scene, reaction);
            }
        }
    }

    /// Face the controller while locked, unless sprinting
    fn refresh_rotation_mode(&mut self) {
        self.movement.rotation_mode =
            if self.state.use_directional_movement() && !self.state.is_sprinting() {
                RotationMode::ControllerDesired
            } else {
                RotationMode::OrientToMovement
            };
    }

    /// Remove the character, its capsule and any grapple activation
    pub fn despawn(mut self, scene: &mut Scene) {
        self.grapple.update_active(None, self.id, scene);
        if self.locally_controlled {
            if let Some(enemy) = self
                .state
                .locked_on_target()
                .and_then(|target| scene.enemy_mut(target))
            {
                enemy.on_deselected();
            }
        }
        if let Some(handle) = self.movement.body.collider_handle.take() {
            scene.physics.remove_collider(handle);
        }
        scene.despawn(self.id);
    }
}

impl ReplicationObserver<Scene> for Character {
    fn on_changed_is_locked_on_target(&mut self, _scene: &mut Scene, value: bool) {
        if value {
            self.camera.detach_boom();
        } else {
            self.camera.reset(
                true,
                self.movement.facing_yaw(),
                self.config.lock_on.camera_transition,
            );
        }
        if self.locally_controlled {
            self.camera.ignore_look_input = value;
        }
        self.refresh_rotation_mode();
    }

    fn on_changed_locked_on_target(
        &mut self,
        scene: &mut Scene,
        value: Option<ActorId>,
        previous: Option<ActorId>,
    ) {
        // The authority answered, whatever was in flight is settled
        self.lock_on.clear_pending();
        if !self.locally_controlled {
            return;
        }
        if let Some(previous) = previous.filter(|previous| Some(*previous) != value) {
            if let Some(enemy) = scene.enemy_mut(previous) {
                enemy.on_deselected();
            }
        }
        if let Some(enemy) = value.and_then(|target| scene.enemy_mut(target)) {
            enemy.on_selected();
        }
    }

    fn on_changed_use_directional_movement(&mut self, _scene: &mut Scene, _value: bool) {
        self.refresh_rotation_mode();
    }

    fn on_changed_movement_stance(&mut self, _scene: &mut Scene, value: MovementStance) {
        self.movement.max_walk_speed = self.actions.stance_speed(value);
        self.animation.on_stance_changed(value);
    }

    fn on_changed_is_sprinting(&mut self, _scene: &mut Scene, _value: bool) {
        self.refresh_rotation_mode();
    }

    fn on_changed_is_crouching(&mut self, scene: &mut Scene, value: bool) {
        if value {
            self.movement.crouch(&mut scene.physics);
            self.camera.set_boom_inset(self.movement.crouch_drop());
        } else {
            self.movement.uncrouch(&mut scene.physics);
            self.camera.restore_boom_offset();
        }
        scene.set_position(self.id, self.movement.center_position());
    }

    fn on_changed_is_dodging(&mut self, _scene: &mut Scene, value: bool) {
        if value {
            let key = montage_key(
                self.state.use_directional_movement(),
                self.state.dodge_roll_direction(),
            );
            self.montages.play_montage(&self.actions.dodge_montages, key);
        }
    }

    fn on_changed_is_rolling(&mut self, _scene: &mut Scene, value: bool) {
        if value {
            let key = montage_key(
                self.state.use_directional_movement(),
                self.state.dodge_roll_direction(),
            );
            self.montages.play_montage(&self.actions.roll_montages, key);
        }
    }
}
