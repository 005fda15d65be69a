use thiserror::Error;

/// High-level phases a live session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Players are joining; the roster is still open.
    Lobby,
    /// The current question is open for answers.
    Question,
    /// Answers for the current question are frozen and scored.
    Reveal,
    /// Terminal phase: final standings are available.
    Finished,
}

impl SessionPhase {
    /// Whether no further transition can leave this phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Finished)
    }
}

/// Indicates why a session transitioned to [`SessionPhase::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// `next_question` was issued after the last question was revealed.
    Completed,
    /// The host force-ended the session.
    HostFinished,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host starts the game from the lobby.
    Start,
    /// Host closes the current question and reveals the answer.
    EndQuestion,
    /// Host opens the next question after a reveal.
    NextQuestion,
    /// Session ends, either naturally or on host request.
    Finish(FinishReason),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// State machine phase changed since the plan was created.
    #[error("phase changed since the plan was created (expected {expected:?}, got {actual:?})")]
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// State machine version changed since the plan was created.
    #[error("state version changed since the plan was created (expected {expected}, got {actual})")]
    VersionMismatch {
        /// Version the plan expects to produce.
        expected: u64,
        /// Version the machine would produce now.
        actual: u64,
    },
}

/// A validated transition that has not been committed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// Phase the state machine is currently in.
    pub from: SessionPhase,
    /// Phase the state machine will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: u64,
}

/// Per-session state machine: `lobby -> question -> reveal -> (question | finished)`.
///
/// Planning is side-effect free so the controller can validate a command,
/// perform the associated bookkeeping and only then commit the new phase.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: u64,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Lobby,
            version: 0,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Validate that `event` can be applied from the current phase.
    pub fn plan(&self, event: SessionEvent) -> Result<Plan, InvalidTransition> {
        let to = self.compute_transition(event)?;
        Ok(Plan {
            from: self.phase,
            to,
            event,
            version_next: self.version + 1,
        })
    }

    /// Commit a plan produced by [`Self::plan`], returning the new phase.
    pub fn apply(&mut self, plan: Plan) -> Result<SessionPhase, ApplyError> {
        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        Ok(self.phase)
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Lobby, SessionEvent::Start) => SessionPhase::Question,
            (SessionPhase::Question, SessionEvent::EndQuestion) => SessionPhase::Reveal,
            (SessionPhase::Reveal, SessionEvent::NextQuestion) => SessionPhase::Question,
            (SessionPhase::Reveal, SessionEvent::Finish(FinishReason::Completed)) => {
                SessionPhase::Finished
            }
            (from, SessionEvent::Finish(FinishReason::HostFinished)) if !from.is_terminal() => {
                SessionPhase::Finished
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan).unwrap()
    }

    #[test]
    fn initial_state_is_lobby() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Lobby);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn full_happy_path_through_session() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(apply(&mut sm, SessionEvent::Start), SessionPhase::Question);
        assert_eq!(apply(&mut sm, SessionEvent::EndQuestion), SessionPhase::Reveal);
        assert_eq!(apply(&mut sm, SessionEvent::NextQuestion), SessionPhase::Question);
        assert_eq!(apply(&mut sm, SessionEvent::EndQuestion), SessionPhase::Reveal);
        assert_eq!(
            apply(&mut sm, SessionEvent::Finish(FinishReason::Completed)),
            SessionPhase::Finished
        );
        assert_eq!(sm.version(), 5);
    }

    #[test]
    fn host_can_finish_from_every_live_phase() {
        for prefix in [
            vec![],
            vec![SessionEvent::Start],
            vec![SessionEvent::Start, SessionEvent::EndQuestion],
        ] {
            let mut sm = SessionStateMachine::new();
            for event in prefix {
                apply(&mut sm, event);
            }
            assert_eq!(
                apply(&mut sm, SessionEvent::Finish(FinishReason::HostFinished)),
                SessionPhase::Finished
            );
        }
    }

    #[test]
    fn finished_is_terminal() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Finish(FinishReason::HostFinished));

        for event in [
            SessionEvent::Start,
            SessionEvent::EndQuestion,
            SessionEvent::NextQuestion,
            SessionEvent::Finish(FinishReason::HostFinished),
            SessionEvent::Finish(FinishReason::Completed),
        ] {
            let err = sm.plan(event).unwrap_err();
            assert_eq!(err.from, SessionPhase::Finished);
            assert_eq!(err.event, event);
        }
    }

    #[test]
    fn completion_only_follows_a_reveal() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);

        let err = sm
            .plan(SessionEvent::Finish(FinishReason::Completed))
            .unwrap_err();
        assert_eq!(err.from, SessionPhase::Question);
    }

    #[test]
    fn repeated_commands_are_rejected() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        assert!(sm.plan(SessionEvent::Start).is_err());

        apply(&mut sm, SessionEvent::EndQuestion);
        assert!(sm.plan(SessionEvent::EndQuestion).is_err());
    }

    #[test]
    fn invalid_transition_returns_error() {
        let sm = SessionStateMachine::new();
        let err = sm.plan(SessionEvent::EndQuestion).unwrap_err();
        assert_eq!(err.from, SessionPhase::Lobby);
        assert_eq!(err.event, SessionEvent::EndQuestion);
    }

    #[test]
    fn stale_plan_is_not_applied() {
        let mut sm = SessionStateMachine::new();
        let stale = sm.plan(SessionEvent::Finish(FinishReason::HostFinished)).unwrap();
        apply(&mut sm, SessionEvent::Start);

        let err = sm.apply(stale).unwrap_err();
        assert_eq!(
            err,
            ApplyError::PhaseMismatch {
                expected: SessionPhase::Lobby,
                actual: SessionPhase::Question,
            }
        );
        assert_eq!(sm.phase(), SessionPhase::Question);
    }
}
