//! The operation lifecycle (C4): a seven-state total order of legal
//! progression, per spec §4.4.

use std::fmt;

/// One state in an operation's lifecycle. Transitions are forward-only;
/// see [`OperationState::can_transition_to`] for the legal edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Initialized,
    Pending,
    Evaluating,
    Ready,
    Executing,
    Finishing,
    Finished,
}

impl OperationState {
    /// Whether moving from `self` to `next` is one of the legal edges in
    /// spec §4.4's transition table. Condition failure is the one branch
    /// that skips states (`Evaluating` straight to `Finishing`); every
    /// other edge advances exactly one state.
    pub fn can_transition_to(self, next: OperationState) -> bool {
        use OperationState::*;
        matches!(
            (self, next),
            (Initialized, Pending)
                | (Pending, Evaluating)
                | (Evaluating, Ready)
                | (Evaluating, Finishing)
                | (Ready, Executing)
                | (Executing, Finishing)
                | (Finishing, Finished)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Finished)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationState::Initialized => "Initialized",
            OperationState::Pending => "Pending",
            OperationState::Evaluating => "Evaluating",
            OperationState::Ready => "Ready",
            OperationState::Executing => "Executing",
            OperationState::Finishing => "Finishing",
            OperationState::Finished => "Finished",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperationState::*;

    #[test]
    fn happy_path_is_legal() {
        assert!(Initialized.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Evaluating));
        assert!(Evaluating.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Executing));
        assert!(Executing.can_transition_to(Finishing));
        assert!(Finishing.can_transition_to(Finished));
    }

    #[test]
    fn condition_failure_skips_to_finishing() {
        assert!(Evaluating.can_transition_to(Finishing));
    }

    #[test]
    fn backwards_and_skipping_transitions_are_illegal() {
        assert!(!Finished.can_transition_to(Initialized));
        assert!(!Initialized.can_transition_to(Ready));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Ready.can_transition_to(Finished));
    }
}
