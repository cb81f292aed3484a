use crate::session::{Identity, Role};

/// Resolution of a role's secondary credential check. Stays `Unknown`
/// until the external lookup completes; the gate may not allow while it
/// is unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryCheck {
    Unknown,
    Required,
    NotRequired,
}

/// Pure outcome of a gate evaluation. Navigation is the caller's effect;
/// deciding touches no state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin(&'static str),
    RedirectToPasswordChange {
        route: &'static str,
        reason: &'static str,
    },
    StillLoading,
}

impl GateDecision {
    pub fn navigate_to(&self) -> Option<&'static str> {
        match self {
            Self::Allow | Self::StillLoading => None,
            Self::RedirectToLogin(route) => Some(route),
            Self::RedirectToPasswordChange { route, .. } => Some(route),
        }
    }
}

/// Decides access for one protected subtree from the current session view.
/// Callers for roles without a secondary check pass `NotRequired`.
pub fn decide(
    identity: Option<&Identity>,
    loading: bool,
    required: Role,
    secondary: SecondaryCheck,
) -> GateDecision {
    if loading {
        return GateDecision::StillLoading;
    }
    match identity {
        Some(identity) if identity.role == required => match secondary {
            SecondaryCheck::Unknown => GateDecision::StillLoading,
            SecondaryCheck::Required => GateDecision::RedirectToPasswordChange {
                route: required.password_change_route(),
                reason: "temporary password must be changed",
            },
            SecondaryCheck::NotRequired => GateDecision::Allow,
        },
        _ => GateDecision::RedirectToLogin(required.login_route()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Allowed,
    Denied,
}

/// One mounted guard per protected subtree. Parametric over the required
/// role; the secondary check is opt-in per role rather than hard-coded.
///
/// Secondary-check results carry the epoch at which the lookup started;
/// results from an older epoch are discarded so an in-flight check can
/// never clobber state after the identity changed underneath it.
pub struct RoleGate {
    required: Role,
    state: GateState,
    epoch: u64,
    secondary: SecondaryCheck,
    use_secondary: bool,
}

impl RoleGate {
    pub fn new(required: Role) -> Self {
        Self {
            required,
            state: GateState::Pending,
            epoch: 0,
            secondary: SecondaryCheck::Unknown,
            use_secondary: required.has_password_check(),
        }
    }

    #[cfg(test)]
    pub fn with_secondary_check(mut self, enabled: bool) -> Self {
        self.use_secondary = enabled;
        self
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True when an evaluation would consult a still-unresolved secondary
    /// check, i.e. the caller should run the lookup before evaluating.
    pub fn wants_secondary(&self) -> bool {
        self.use_secondary && self.secondary == SecondaryCheck::Unknown
    }

    /// The underlying identity changed (login, logout, restore): terminal
    /// states re-enter Pending and any in-flight check result goes stale.
    pub fn identity_changed(&mut self) {
        self.epoch += 1;
        self.state = GateState::Pending;
        self.secondary = SecondaryCheck::Unknown;
    }

    /// Applies a secondary-check result started at `epoch`. Stale results
    /// are a no-op.
    pub fn resolve_secondary(&mut self, epoch: u64, result: SecondaryCheck) {
        if epoch != self.epoch {
            return;
        }
        self.secondary = result;
    }

    /// Forces the gate to Denied; used when the secondary lookup finds no
    /// underlying record at all.
    pub fn force_deny(&mut self) -> GateDecision {
        self.state = GateState::Denied;
        GateDecision::RedirectToLogin(self.required.login_route())
    }

    pub fn evaluate(&mut self, identity: Option<&Identity>, loading: bool) -> GateDecision {
        let secondary = if self.use_secondary {
            self.secondary
        } else {
            SecondaryCheck::NotRequired
        };
        let decision = decide(identity, loading, self.required, secondary);
        self.state = match decision {
            GateDecision::Allow => GateState::Allowed,
            GateDecision::StillLoading => GateState::Pending,
            GateDecision::RedirectToLogin(_)
            | GateDecision::RedirectToPasswordChange { .. } => GateState::Denied,
        };
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            email: format!("{}@school.example", role.as_str()),
            role,
            id: Some(format!("{}-1", role.as_str())),
        }
    }

    #[test]
    fn loading_defers_the_decision() {
        let d = decide(None, true, Role::Parent, SecondaryCheck::NotRequired);
        assert_eq!(d, GateDecision::StillLoading);
        // Loading wins even with a matching identity present.
        let id = identity(Role::Parent);
        let d = decide(Some(&id), true, Role::Parent, SecondaryCheck::NotRequired);
        assert_eq!(d, GateDecision::StillLoading);
    }

    #[test]
    fn absent_identity_redirects_to_role_login() {
        let d = decide(None, false, Role::Parent, SecondaryCheck::NotRequired);
        assert_eq!(d, GateDecision::RedirectToLogin("/parent/login"));
        assert_eq!(d.navigate_to(), Some("/parent/login"));
    }

    #[test]
    fn students_share_the_unified_login() {
        let d = decide(None, false, Role::Student, SecondaryCheck::NotRequired);
        assert_eq!(d, GateDecision::RedirectToLogin("/login"));
    }

    #[test]
    fn wrong_role_is_denied_even_with_identity() {
        let id = identity(Role::Admin);
        let d = decide(Some(&id), false, Role::Teacher, SecondaryCheck::NotRequired);
        assert_eq!(d, GateDecision::RedirectToLogin("/teacher/login"));
    }

    #[test]
    fn matching_role_allows() {
        let id = identity(Role::Admin);
        let d = decide(Some(&id), false, Role::Admin, SecondaryCheck::NotRequired);
        assert_eq!(d, GateDecision::Allow);
        assert_eq!(d.navigate_to(), None);
    }

    #[test]
    fn unresolved_secondary_check_keeps_deferring() {
        let id = identity(Role::Teacher);
        let d = decide(Some(&id), false, Role::Teacher, SecondaryCheck::Unknown);
        assert_eq!(d, GateDecision::StillLoading);
    }

    #[test]
    fn required_password_change_denies_with_redirect() {
        let id = identity(Role::Teacher);
        let d = decide(Some(&id), false, Role::Teacher, SecondaryCheck::Required);
        assert_eq!(d.navigate_to(), Some("/teacher/password-change"));
        assert!(matches!(d, GateDecision::RedirectToPasswordChange { .. }));
    }

    #[test]
    fn gate_state_machine_tracks_decisions() {
        let mut gate = RoleGate::new(Role::Parent);
        assert_eq!(gate.state(), GateState::Pending);

        assert_eq!(gate.evaluate(None, true), GateDecision::StillLoading);
        assert_eq!(gate.state(), GateState::Pending);

        assert_eq!(
            gate.evaluate(None, false),
            GateDecision::RedirectToLogin("/parent/login")
        );
        assert_eq!(gate.state(), GateState::Denied);

        // Identity change re-enters Pending.
        gate.identity_changed();
        assert_eq!(gate.state(), GateState::Pending);
        let id = identity(Role::Parent);
        assert_eq!(gate.evaluate(Some(&id), false), GateDecision::Allow);
        assert_eq!(gate.state(), GateState::Allowed);
    }

    #[test]
    fn teacher_gate_waits_for_secondary_then_allows() {
        let mut gate = RoleGate::new(Role::Teacher);
        let id = identity(Role::Teacher);

        assert!(gate.wants_secondary());
        assert_eq!(gate.evaluate(Some(&id), false), GateDecision::StillLoading);

        let epoch = gate.epoch();
        gate.resolve_secondary(epoch, SecondaryCheck::NotRequired);
        assert!(!gate.wants_secondary());
        assert_eq!(gate.evaluate(Some(&id), false), GateDecision::Allow);
    }

    #[test]
    fn teacher_gate_denies_on_required_flag() {
        let mut gate = RoleGate::new(Role::Teacher);
        let id = identity(Role::Teacher);
        let epoch = gate.epoch();
        gate.resolve_secondary(epoch, SecondaryCheck::Required);
        let d = gate.evaluate(Some(&id), false);
        assert_eq!(d.navigate_to(), Some("/teacher/password-change"));
        assert_eq!(gate.state(), GateState::Denied);
    }

    #[test]
    fn stale_secondary_result_is_discarded() {
        let mut gate = RoleGate::new(Role::Teacher);
        let id = identity(Role::Teacher);
        let stale_epoch = gate.epoch();

        // Identity changes while the check is in flight.
        gate.identity_changed();
        gate.resolve_secondary(stale_epoch, SecondaryCheck::NotRequired);

        // The stale NotRequired must not have landed.
        assert!(gate.wants_secondary());
        assert_eq!(gate.evaluate(Some(&id), false), GateDecision::StillLoading);
    }

    #[test]
    fn secondary_check_is_opt_in_per_role() {
        // A parent gate opted into the check behaves like the teacher gate.
        let mut gate = RoleGate::new(Role::Parent).with_secondary_check(true);
        let id = identity(Role::Parent);
        assert_eq!(gate.evaluate(Some(&id), false), GateDecision::StillLoading);
        let epoch = gate.epoch();
        gate.resolve_secondary(epoch, SecondaryCheck::Required);
        let d = gate.evaluate(Some(&id), false);
        assert_eq!(d.navigate_to(), Some("/parent/password-change"));

        // And a teacher gate opted out allows immediately on role match.
        let mut gate = RoleGate::new(Role::Teacher).with_secondary_check(false);
        let id = identity(Role::Teacher);
        assert_eq!(gate.evaluate(Some(&id), false), GateDecision::Allow);
    }

    #[test]
    fn force_deny_redirects_to_login() {
        let mut gate = RoleGate::new(Role::Teacher);
        let d = gate.force_deny();
        assert_eq!(d, GateDecision::RedirectToLogin("/teacher/login"));
        assert_eq!(gate.state(), GateState::Denied);
    }
}
