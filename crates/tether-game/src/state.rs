//! Replicated locomotion and lock state
//!
//! Every replicated field is mutated through [`ReplicatedState::commit`] on the authority
//! or [`ReplicatedState::apply_remote`] on proxies. Both record the change as a reaction
//! so the owning character can run its `on_changed_<field>` hooks; commits are also queued
//! for the next outgoing delta.

use serde::{Deserialize, Serialize};
use tether_core::{ActorId, DetailedDirection};
use tether_net::{ChangeQueue, Delta, NetRole};
use tracing::warn;

use crate::config::Capabilities;

/// Walking stance driving the speed cap and the pose graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementStance {
    Crouched,
    /// Reserved, nothing transitions into it yet
    Walking,
    #[default]
    Running,
    Sprinting,
}

/// One replicated field with its new value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplicatedField {
    IsLockedOnTarget(bool),
    LockedOnTarget(Option<ActorId>),
    LockableTargets(Vec<ActorId>),
    UseDirectionalMovement(bool),
    MovementStance(MovementStance),
    CanJump(bool),
    CanSprint(bool),
    IsSprinting(bool),
    CanCrouch(bool),
    IsCrouching(bool),
    DodgeRollDirection(DetailedDirection),
    CanDodge(bool),
    IsDodging(bool),
    CanRoll(bool),
    IsRolling(bool),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Fields {
    is_locked_on_target: bool,
    locked_on_target: Option<ActorId>,
    lockable_targets: Vec<ActorId>,
    use_directional_movement: bool,
    movement_stance: MovementStance,
    can_jump: bool,
    can_sprint: bool,
    is_sprinting: bool,
    can_crouch: bool,
    is_crouching: bool,
    dodge_roll_direction: DetailedDirection,
    can_dodge: bool,
    is_dodging: bool,
    can_roll: bool,
    is_rolling: bool,
}

macro_rules! assign {
    ($slot:expr, $value:expr) => {{
        let value = $value;
        if $slot == value {
            false
        } else {
            $slot = value;
            true
        }
    }};
}

impl Fields {
    /// Store a value, reporting whether it changed
    fn set(&mut self, field: &ReplicatedField) -> bool {
        match field {
            ReplicatedField::IsLockedOnTarget(v) => assign!(self.is_locked_on_target, *v),
            ReplicatedField::LockedOnTarget(v) => assign!(self.locked_on_target, *v),
            ReplicatedField::LockableTargets(v) => assign!(self.lockable_targets, v.clone()),
            ReplicatedField::UseDirectionalMovement(v) => {
                assign!(self.use_directional_movement, *v)
            }
            ReplicatedField::MovementStance(v) => assign!(self.movement_stance, *v),
            ReplicatedField::CanJump(v) => assign!(self.can_jump, *v),
            ReplicatedField::CanSprint(v) => assign!(self.can_sprint, *v),
            ReplicatedField::IsSprinting(v) => assign!(self.is_sprinting, *v),
            ReplicatedField::CanCrouch(v) => assign!(self.can_crouch, *v),
            ReplicatedField::IsCrouching(v) => assign!(self.is_crouching, *v),
            ReplicatedField::DodgeRollDirection(v) => assign!(self.dodge_roll_direction, *v),
            ReplicatedField::CanDodge(v) => assign!(self.can_dodge, *v),
            ReplicatedField::IsDodging(v) => assign!(self.is_dodging, *v),
            ReplicatedField::CanRoll(v) => assign!(self.can_roll, *v),
            ReplicatedField::IsRolling(v) => assign!(self.is_rolling, *v),
        }
    }
}

/// A field change waiting for its `on_changed` hook, with the value it replaced
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub field: ReplicatedField,
    /// Locked target before the change, for deselect hooks
    pub previous_target: Option<ActorId>,
}

/// Replicated state of one character
#[derive(Debug)]
pub struct ReplicatedState {
    role: NetRole,
    fields: Fields,
    outgoing: ChangeQueue<ReplicatedField>,
    reactions: Vec<Reaction>,
}

impl ReplicatedState {
    pub fn new(role: NetRole, capabilities: Capabilities) -> Self {
        let fields = Fields {
            can_jump: capabilities.can_jump,
            can_sprint: capabilities.can_sprint,
            can_crouch: capabilities.can_crouch,
            can_dodge: capabilities.can_dodge,
            can_roll: capabilities.can_roll,
            ..Fields::default()
        };
        Self {
            role,
            fields,
            outgoing: ChangeQueue::new(),
            reactions: Vec::new(),
        }
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub fn has_authority(&self) -> bool {
        self.role.has_authority()
    }

    /// Change a field on the authority. Proxies are refused.
    pub fn commit(&mut self, field: ReplicatedField) -> bool {
        if !self.has_authority() {
            warn!("Proxy tried to commit {:?}", field);
            return false;
        }
        if !self.record(&field) {
            return false;
        }
        self.outgoing.push(field);
        true
    }

    /// Apply a change received from the authority
    pub fn apply_remote(&mut self, field: ReplicatedField) -> bool {
        if self.has_authority() {
            warn!("Authority ignored remote change {:?}", field);
            return false;
        }
        self.record(&field)
    }

    fn record(&mut self, field: &ReplicatedField) -> bool {
        let previous_target = self.fields.locked_on_target;
        if !self.fields.set(field) {
            return false;
        }
        self.reactions.push(Reaction {
            field: field.clone(),
            previous_target,
        });
        true
    }

    /// Changes whose hooks have not run yet, in commit order
    pub fn take_reactions(&mut self) -> Vec<Reaction> {
        std::mem::take(&mut self.reactions)
    }

    /// Drain committed changes into the next outgoing delta
    pub fn take_delta(&mut self, actor: ActorId) -> Option<Delta<ReplicatedField>> {
        self.outgoing.take_delta(actor)
    }

    /// Every field, for peers that join after the character spawned
    pub fn snapshot(&self) -> Vec<ReplicatedField> {
        let f = &self.fields;
        vec![
            ReplicatedField::CanJump(f.can_jump),
            ReplicatedField::CanSprint(f.can_sprint),
            ReplicatedField::CanCrouch(f.can_crouch),
            ReplicatedField::CanDodge(f.can_dodge),
            ReplicatedField::CanRoll(f.can_roll),
            ReplicatedField::MovementStance(f.movement_stance),
            ReplicatedField::IsSprinting(f.is_sprinting),
            ReplicatedField::IsCrouching(f.is_crouching),
            ReplicatedField::DodgeRollDirection(f.dodge_roll_direction),
            ReplicatedField::IsDodging(f.is_dodging),
            ReplicatedField::IsRolling(f.is_rolling),
            ReplicatedField::LockableTargets(f.lockable_targets.clone()),
            ReplicatedField::LockedOnTarget(f.locked_on_target),
            ReplicatedField::IsLockedOnTarget(f.is_locked_on_target),
            ReplicatedField::UseDirectionalMovement(f.use_directional_movement),
        ]
    }

    pub fn is_locked_on_target(&self) -> bool {
        self.fields.is_locked_on_target
    }

    pub fn locked_on_target(&self) -> Option<ActorId> {
        self.fields.locked_on_target
    }

    pub fn lockable_targets(&self) -> &[ActorId] {
        &self.fields.lockable_targets
    }

    pub fn use_directional_movement(&self) -> bool {
        self.fields.use_directional_movement
    }

    pub fn movement_stance(&self) -> MovementStance {
        self.fields.movement_stance
    }

    pub fn can_jump(&self) -> bool {
        self.fields.can_jump
    }

    pub fn can_sprint(&self) -> bool {
        self.fields.can_sprint
    }

    pub fn is_sprinting(&self) -> bool {
        self.fields.is_sprinting
    }

    pub fn can_crouch(&self) -> bool {
        self.fields.can_crouch
    }

    pub fn is_crouching(&self) -> bool {
        self.fields.is_crouching
    }

    pub fn dodge_roll_direction(&self) -> DetailedDirection {
        self.fields.dodge_roll_direction
    }

    pub fn can_dodge(&self) -> bool {
        self.fields.can_dodge
    }

    pub fn is_dodging(&self) -> bool {
        self.fields.is_dodging
    }

    pub fn can_roll(&self) -> bool {
        self.fields.can_roll
    }

    pub fn is_rolling(&self) -> bool {
        self.fields.is_rolling
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_jump: self.fields.can_jump,
            can_sprint: self.fields.can_sprint,
            can_crouch: self.fields.can_crouch,
            can_dodge: self.fields.can_dodge,
            can_roll: self.fields.can_roll,
        }
    }

    /// Whether at most one of sprinting, crouching, dodging and rolling is active
    pub fn actions_exclusive(&self) -> bool {
        let f = &self.fields;
        [f.is_sprinting, f.is_crouching, f.is_dodging, f.is_rolling]
            .iter()
            .filter(|active| **active)
            .count()
            <= 1
    }
}

/// Hooks run after a replicated field changed, on every peer.
///
/// `C` is whatever world context the observer needs to react.
pub trait ReplicationObserver<C: ?Sized> {
    fn on_changed_is_locked_on_target(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_locked_on_target(
        &mut self,
        _ctx: &mut C,
        _value: Option<ActorId>,
        _previous: Option<ActorId>,
    ) {
    }
    fn on_changed_lockable_targets(&mut self, _ctx: &mut C, _value: &[ActorId]) {}
    fn on_changed_use_directional_movement(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_movement_stance(&mut self, _ctx: &mut C, _value: MovementStance) {}
    fn on_changed_can_jump(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_can_sprint(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_is_sprinting(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_can_crouch(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_is_crouching(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_dodge_roll_direction(&mut self, _ctx: &mut C, _value: DetailedDirection) {}
    fn on_changed_can_dodge(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_is_dodging(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_can_roll(&mut self, _ctx: &mut C, _value: bool) {}
    fn on_changed_is_rolling(&mut self, _ctx: &mut C, _value: bool) {}
}

/// Route a reaction to its hook
pub fn dispatch<C: ?Sized, O: ReplicationObserver<C> + ?Sized>(
    observer: &mut O,
    ctx: &mut C,
    reaction: &Reaction,
) {
    match &reaction.field {
        ReplicatedField::IsLockedOnTarget(v) => observer.on_changed_is_locked_on_target(ctx, *v),
        ReplicatedField::LockedOnTarget(v) => {
            observer.on_changed_locked_on_target(ctx, *v, reaction.previous_target)
        }
        ReplicatedField::LockableTargets(v) => observer.on_changed_lockable_targets(ctx, v),
        ReplicatedField::UseDirectionalMovement(v) => {
            observer.on_changed_use_directional_movement(ctx, *v)
        }
        ReplicatedField::MovementStance(v) => observer.on_changed_movement_stance(ctx, *v),
        ReplicatedField::CanJump(v) => observer.on_changed_can_jump(ctx, *v),
        ReplicatedField::CanSprint(v) => observer.on_changed_can_sprint(ctx, *v),
        ReplicatedField::IsSprinting(v) => observer.on_changed_is_sprinting(ctx, *v),
        ReplicatedField::CanCrouch(v) => observer.on_changed_can_crouch(ctx, *v),
        ReplicatedField::IsCrouching(v) => observer.on_changed_is_crouching(ctx, *v),
        ReplicatedField::DodgeRollDirection(v) => {
            observer.on_changed_dodge_roll_direction(ctx, *v)
        }
        ReplicatedField::CanDodge(v) => observer.on_changed_can_dodge(ctx, *v),
        ReplicatedField::IsDodging(v) => observer.on_changed_is_dodging(ctx, *v),
        ReplicatedField::CanRoll(v) => observer.on_changed_can_roll(ctx, *v),
        ReplicatedField::IsRolling(v) => observer.on_changed_is_rolling(ctx, *v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_records_change_once() {
        let mut state = ReplicatedState::new(NetRole::Authority, Capabilities::default());
        assert!(state.commit(ReplicatedField::IsSprinting(true)));
        assert!(!state.commit(ReplicatedField::IsSprinting(true)));
        assert!(state.is_sprinting());

        let reactions = state.take_reactions();
        assert_eq!(reactions.len(), 1);
        let delta = state.take_delta(ActorId::from_raw(0, 0)).unwrap();
        assert_eq!(delta.changes, vec![ReplicatedField::IsSprinting(true)]);
    }

    #[test]
    fn test_proxy_cannot_commit() {
        let mut state = ReplicatedState::new(NetRole::SimulatedProxy, Capabilities::default());
        assert!(!state.commit(ReplicatedField::IsCrouching(true)));
        assert!(!state.is_crouching());

        assert!(state.apply_remote(ReplicatedField::IsCrouching(true)));
        assert!(state.is_crouching());
        assert!(state.take_delta(ActorId::from_raw(0, 0)).is_none());
    }

    #[test]
    fn test_authority_ignores_remote_changes() {
        let mut state = ReplicatedState::new(NetRole::Authority, Capabilities::default());
        assert!(!state.apply_remote(ReplicatedField::CanDodge(false)));
        assert!(state.can_dodge());
    }

    #[test]
    fn test_reaction_carries_previous_target() {
        let mut state = ReplicatedState::new(NetRole::Authority, Capabilities::default());
        let a = ActorId::from_raw(1, 0);
        let b = ActorId::from_raw(2, 0);
        state.commit(ReplicatedField::LockedOnTarget(Some(a)));
        state.commit(ReplicatedField::LockedOnTarget(Some(b)));
        let reactions = state.take_reactions();
        assert_eq!(reactions[0].previous_target, None);
        assert_eq!(reactions[1].previous_target, Some(a));
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl ReplicationObserver<()> for Recorder {
        fn on_changed_is_sprinting(&mut self, _ctx: &mut (), _value: bool) {
            self.calls.push("sprinting");
        }
        fn on_changed_movement_stance(&mut self, _ctx: &mut (), _value: MovementStance) {
            self.calls.push("stance");
        }
    }

    #[test]
    fn test_dispatch_runs_hooks_in_commit_order() {
        let mut state = ReplicatedState::new(NetRole::Authority, Capabilities::default());
        state.commit(ReplicatedField::IsSprinting(true));
        state.commit(ReplicatedField::MovementStance(MovementStance::Sprinting));
        state.commit(ReplicatedField::CanRoll(false));

        let mut recorder = Recorder::default();
        for reaction in state.take_reactions() {
            dispatch(&mut recorder, &mut (), &reaction);
        }
        assert_eq!(recorder.calls, vec!["sprinting", "stance"]);
    }

    #[test]
    fn test_snapshot_rebuilds_proxy_state() {
        let mut authority = ReplicatedState::new(NetRole::Authority, Capabilities::default());
        authority.commit(ReplicatedField::IsCrouching(true));
        authority.commit(ReplicatedField::MovementStance(MovementStance::Crouched));
        authority.commit(ReplicatedField::CanRoll(false));

        let mut proxy = ReplicatedState::new(NetRole::SimulatedProxy, Capabilities::default());
        for field in authority.snapshot() {
            proxy.apply_remote(field);
        }
        assert!(proxy.is_crouching());
        assert_eq!(proxy.movement_stance(), MovementStance::Crouched);
        assert!(!proxy.can_roll());
        assert!(proxy.actions_exclusive());
    }
}
