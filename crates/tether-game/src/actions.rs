//! Stance and movement actions
//!
//! Runs on the authority. Sprinting, crouching, dodging and rolling are mutually exclusive;
//! starting one ends the others. Dodges and rolls last as long as their montage and finish
//! through a one-shot timer whose handle is checked on completion.

use glam::Vec3;
use tether_core::direction::relative_angle;
use tether_core::{DetailedDirection, TimerHandle, TimerManager};
use tracing::{debug, warn};

use crate::animation::ground_speed;
use crate::config::{Capabilities, LocomotionConfig};
use crate::montage::MontageSet;
use crate::state::{MovementStance, ReplicatedField, ReplicatedState};

/// Completion events for timed actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTimer {
    DodgeFinished,
    RollFinished,
}

/// What a dodge/roll request turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DodgeRollOutcome {
    Dodge,
    Roll,
    Ignored,
}

/// Octant to dodge toward: the last input relative to facing, or forward when at rest
pub fn dodge_direction(
    last_input: Vec3,
    velocity: Vec3,
    facing_yaw: f32,
    stationary_speed: f32,
) -> DetailedDirection {
    if ground_speed(velocity) < stationary_speed || last_input.length_squared() == 0.0 {
        return DetailedDirection::Forward;
    }
    DetailedDirection::from_angle(relative_angle(last_input, facing_yaw))
}

/// Montage slot for a dodge or roll. Without directional movement the character already
/// faces where it moves, so the forward clip is used.
pub fn montage_key(use_directional_movement: bool, direction: DetailedDirection) -> DetailedDirection {
    if use_directional_movement {
        direction
    } else {
        DetailedDirection::Forward
    }
}

#[derive(Debug)]
pub struct MovementActionController {
    pub config: LocomotionConfig,
    pub dodge_montages: MontageSet,
    pub roll_montages: MontageSet,
    timers: TimerManager<ActionTimer>,
    dodge_timer: Option<TimerHandle>,
    roll_timer: Option<TimerHandle>,
    /// Sprint/dodge input is held; sprint resumes when the dodge or roll ends
    sprint_held: bool,
}

impl MovementActionController {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            config,
            dodge_montages: MontageSet::uniform("Dodge", 0.6),
            roll_montages: MontageSet::uniform("Roll", 0.9),
            timers: TimerManager::new(),
            dodge_timer: None,
            roll_timer: None,
            sprint_held: false,
        }
    }

    /// Timers still waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Speed cap for a stance
    pub fn stance_speed(&self, stance: MovementStance) -> f32 {
        match stance {
            MovementStance::Sprinting => self.config.sprint_speed,
            MovementStance::Crouched => self.config.crouch_speed,
            MovementStance::Walking | MovementStance::Running => self.config.run_speed,
        }
    }

    fn set_stance(&self, state: &mut ReplicatedState, stance: MovementStance) {
        state.commit(ReplicatedField::MovementStance(stance));
    }

    /// Start sprinting. While a dodge or roll runs the sprint is deferred until it ends.
    pub fn start_sprint(&mut self, state: &mut ReplicatedState, falling: bool) -> bool {
        self.sprint_held = true;
        if state.is_dodging() || state.is_rolling() {
            return false;
        }
        self.resume_sprint(state, falling)
    }

    fn resume_sprint(&mut self, state: &mut ReplicatedState, falling: bool) -> bool {
        if !self.sprint_held || !state.can_sprint() || falling {
            return false;
        }
        if state.is_sprinting() {
            return true;
        }
        self.end_crouch(state);
        state.commit(ReplicatedField::IsSprinting(true));
        self.set_stance(state, MovementStance::Sprinting);
        true
    }

    /// Stop sprinting and forget the held input
    pub fn end_sprint(&mut self, state: &mut ReplicatedState) {
        self.sprint_held = false;
        self.stop_sprinting(state);
    }

    fn stop_sprinting(&self, state: &mut ReplicatedState) {
        if !state.is_sprinting() {
            return;
        }
        state.commit(ReplicatedField::IsSprinting(false));
        self.set_stance(state, MovementStance::Running);
    }

    /// Crouch, or stand back up if already crouching
    pub fn toggle_crouch(&mut self, state: &mut ReplicatedState, falling: bool) -> bool {
        if state.is_crouching() {
            self.end_crouch(state);
            return true;
        }
        if !state.can_crouch()
            || falling
            || state.is_sprinting()
            || state.is_dodging()
            || state.is_rolling()
        {
            return false;
        }
        state.commit(ReplicatedField::IsCrouching(true));
        self.set_stance(state, MovementStance::Crouched);
        true
    }

    pub fn end_crouch(&self, state: &mut ReplicatedState) {
        if !state.is_crouching() {
            return;
        }
        state.commit(ReplicatedField::IsCrouching(false));
        self.set_stance(state, MovementStance::Running);
    }

    /// Dodge if possible, otherwise roll. The sprint input counts as held afterwards; if
    /// neither action starts, sprint starts right away. Nothing starts while airborne.
    pub fn dodge_roll(
        &mut self,
        state: &mut ReplicatedState,
        falling: bool,
        direction: DetailedDirection,
    ) -> DodgeRollOutcome {
        self.sprint_held = true;
        if falling {
            return DodgeRollOutcome::Ignored;
        }
        let outcome = if state.can_dodge() && !state.is_dodging() && !state.is_rolling() {
            if self.begin_dodge(state, direction) {
                DodgeRollOutcome::Dodge
            } else {
                DodgeRollOutcome::Ignored
            }
        } else if state.can_roll() && !state.is_rolling() {
            if self.begin_roll(state, direction) {
                DodgeRollOutcome::Roll
            } else {
                DodgeRollOutcome::Ignored
            }
        } else {
            DodgeRollOutcome::Ignored
        };

        if outcome == DodgeRollOutcome::Ignored && !state.is_dodging() && !state.is_rolling() {
            self.resume_sprint(state, falling);
        }
        outcome
    }

    fn begin_dodge(&mut self, state: &mut ReplicatedState, direction: DetailedDirection) -> bool {
        let key = montage_key(state.use_directional_movement(), direction);
        let Some(duration) = self.dodge_montages.duration(key) else {
            warn!("No dodge montage for {:?}, dodge aborted", key);
            return false;
        };
        self.end_crouch(state);
        self.stop_sprinting(state);
        if let Some(stale) = self.dodge_timer.take() {
            self.timers.cancel(stale);
        }

        state.commit(ReplicatedField::DodgeRollDirection(direction));
        state.commit(ReplicatedField::IsDodging(true));
        self.dodge_timer = Some(self.timers.schedule(duration, ActionTimer::DodgeFinished));
        debug!("Dodge {:?} for {:.2}s", direction, duration);
        true
    }

    fn begin_roll(&mut self, state: &mut ReplicatedState, direction: DetailedDirection) -> bool {
        let key = montage_key(state.use_directional_movement(), direction);
        let Some(duration) = self.roll_montages.duration(key) else {
            warn!("No roll montage for {:?}, roll aborted", key);
            return false;
        };
        self.end_crouch(state);
        self.stop_sprinting(state);
        if let Some(dodge) = self.dodge_timer.take() {
            self.timers.cancel(dodge);
            state.commit(ReplicatedField::IsDodging(false));
        }
        if let Some(stale) = self.roll_timer.take() {
            self.timers.cancel(stale);
        }

        state.commit(ReplicatedField::DodgeRollDirection(direction));
        state.commit(ReplicatedField::IsRolling(true));
        self.roll_timer = Some(self.timers.schedule(duration, ActionTimer::RollFinished));
        debug!("Roll {:?} for {:.2}s", direction, duration);
        true
    }

    /// Advance action timers and finish whatever expired
    pub fn tick(&mut self, state: &mut ReplicatedState, falling: bool, dt: f32) {
        for (handle, event) in self.timers.advance(dt) {
            self.on_timer(state, falling, handle, event);
        }
    }

    fn on_timer(
        &mut self,
        state: &mut ReplicatedState,
        falling: bool,
        handle: TimerHandle,
        event: ActionTimer,
    ) {
        let slot = match event {
            ActionTimer::DodgeFinished => &mut self.dodge_timer,
            ActionTimer::RollFinished => &mut self.roll_timer,
        };
        if *slot != Some(handle) {
            debug!("Ignoring stale {:?}", event);
            return;
        }
        *slot = None;
        match event {
            ActionTimer::DodgeFinished => state.commit(ReplicatedField::IsDodging(false)),
            ActionTimer::RollFinished => state.commit(ReplicatedField::IsRolling(false)),
        };
        if !state.is_dodging() && !state.is_rolling() {
            self.resume_sprint(state, falling);
        }
    }

    /// Replace the capability gates. Active actions that lost their gate end now.
    pub fn set_capabilities(&mut self, state: &mut ReplicatedState, capabilities: Capabilities) {
        state.commit(ReplicatedField::CanJump(capabilities.can_jump));
        state.commit(ReplicatedField::CanSprint(capabilities.can_sprint));
        state.commit(ReplicatedField::CanCrouch(capabilities.can_crouch));
        state.commit(ReplicatedField::CanDodge(capabilities.can_dodge));
        state.commit(ReplicatedField::CanRoll(capabilities.can_roll));
        if !capabilities.can_sprint {
            self.stop_sprinting(state);
        }
        if !capabilities.can_crouch {
            self.end_crouch(state);
        }
    }

    /// Drop every timer and end all actions
    pub fn cancel_all(&mut self, state: &mut ReplicatedState) {
        self.timers.clear();
        self.dodge_timer = None;
        self.roll_timer = None;
        self.sprint_held = false;
        self.stop_sprinting(state);
        self.end_crouch(state);
        state.commit(ReplicatedField::IsDodging(false));
        state.commit(ReplicatedField::IsRolling(false));
    }
}
