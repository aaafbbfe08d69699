//! Pipeline state machine — explicit states and legal transition guards.
//!
//! The orchestrator calls `advance()` to move between phases. Each call
//! validates the transition and records it, so a finished run carries a
//! complete, replayable account of how it reached its terminal state.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of pipeline phases.
///
/// Every run starts at `Discovery` and terminates at `Resolved` (consensus)
/// or `Exhausted` (round cap). There is no failure terminal: collaborator
/// errors are contained by fallbacks and never end the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    /// Querying the capability discovery service.
    Discovery,
    /// Rewriting the task with accumulated feedback.
    Refining,
    /// Running the sequential stage generators.
    Staging,
    /// Concurrent reviewer voting round.
    Voting,
    /// Resolver sub-workflow for persistent gaps.
    Escalating,
    /// Consensus reached — terminal.
    Resolved,
    /// Round cap reached without consensus — terminal, not an error.
    Exhausted,
}

impl PipelinePhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Exhausted)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Refining => write!(f, "refining"),
            Self::Staging => write!(f, "staging"),
            Self::Voting => write!(f, "voting"),
            Self::Escalating => write!(f, "escalating"),
            Self::Resolved => write!(f, "resolved"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Legal transitions between pipeline phases.
///
/// ```text
/// Discovery → Refining
/// Refining → Staging
/// Staging → Voting
/// Voting → Escalating | Refining | Resolved | Exhausted
/// Escalating → Refining | Resolved | Exhausted
/// ```
fn is_legal_transition(from: PipelinePhase, to: PipelinePhase) -> bool {
    use PipelinePhase::*;

    matches!(
        (from, to),
        (Discovery, Refining)
            | (Refining, Staging)
            | (Staging, Voting)
            // After voting: recurring gaps → escalate; else loop or terminate
            | (Voting, Escalating)
            | (Voting, Refining)
            | (Voting, Resolved)
            | (Voting, Exhausted)
            // After escalation: re-validation verdict decides
            | (Escalating, Refining)
            | (Escalating, Resolved)
            | (Escalating, Exhausted)
    )
}

/// A single recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PipelinePhase,
    pub to: PipelinePhase,
    /// Completed voting rounds at the time of transition.
    pub round: u32,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: PipelinePhase,
    pub to: PipelinePhase,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal phase transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// The pipeline state machine.
pub struct PipelineMachine {
    current: PipelinePhase,
    round: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PipelineMachine {
    /// Create a new machine starting at `Discovery`.
    pub fn new() -> Self {
        Self {
            current: PipelinePhase::Discovery,
            round: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> PipelinePhase {
        self.current
    }

    /// Set the round counter (called by the orchestrator loop).
    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    /// Attempt to advance to the next phase.
    pub fn advance(
        &mut self,
        to: PipelinePhase,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, round = self.round, "Phase transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            round: self.round,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// The full transition log.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Consume the machine, yielding the transition log.
    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }
}

impl Default for PipelineMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_phase() {
        let m = PipelineMachine::new();
        assert_eq!(m.current(), PipelinePhase::Discovery);
        assert!(!m.is_terminal());
        assert!(m.transitions().is_empty());
    }

    #[test]
    fn test_single_round_consensus_path() {
        let mut m = PipelineMachine::new();
        m.advance(PipelinePhase::Refining, None).unwrap();
        m.advance(PipelinePhase::Staging, None).unwrap();
        m.advance(PipelinePhase::Voting, None).unwrap();
        m.set_round(1);
        m.advance(PipelinePhase::Resolved, Some("3/3 yes votes")).unwrap();

        assert!(m.is_terminal());
        assert_eq!(m.transitions().len(), 4);
        assert_eq!(m.transitions()[3].reason.as_deref(), Some("3/3 yes votes"));
    }

    #[test]
    fn test_loop_back_path() {
        let mut m = PipelineMachine::new();
        m.advance(PipelinePhase::Refining, None).unwrap();
        m.advance(PipelinePhase::Staging, None).unwrap();
        m.advance(PipelinePhase::Voting, None).unwrap();
        m.set_round(1);
        m.advance(PipelinePhase::Refining, Some("no consensus")).unwrap();
        m.advance(PipelinePhase::Staging, None).unwrap();
        m.advance(PipelinePhase::Voting, None).unwrap();
        m.set_round(2);
        m.advance(PipelinePhase::Resolved, None).unwrap();
        assert!(m.is_terminal());
    }

    #[test]
    fn test_escalation_path() {
        let mut m = PipelineMachine::new();
        m.advance(PipelinePhase::Refining, None).unwrap();
        m.advance(PipelinePhase::Staging, None).unwrap();
        m.advance(PipelinePhase::Voting, None).unwrap();
        m.advance(PipelinePhase::Escalating, Some("similarity 1.00")).unwrap();
        m.advance(PipelinePhase::Resolved, Some("resolver validated")).unwrap();
        assert!(m.is_terminal());
    }

    #[test]
    fn test_exhaustion_path() {
        let mut m = PipelineMachine::new();
        m.advance(PipelinePhase::Refining, None).unwrap();
        m.advance(PipelinePhase::Staging, None).unwrap();
        m.advance(PipelinePhase::Voting, None).unwrap();
        m.set_round(3);
        m.advance(PipelinePhase::Exhausted, Some("round cap reached")).unwrap();
        assert!(m.is_terminal());
        assert_eq!(m.current(), PipelinePhase::Exhausted);
    }

    #[test]
    fn test_illegal_skip() {
        let mut m = PipelineMachine::new();
        let err = m.advance(PipelinePhase::Voting, None).unwrap_err();
        assert_eq!(err.from, PipelinePhase::Discovery);
        assert_eq!(err.to, PipelinePhase::Voting);
        assert!(err.to_string().contains("discovery"));
    }

    #[test]
    fn test_terminal_absorbs() {
        let mut m = PipelineMachine::new();
        m.advance(PipelinePhase::Refining, None).unwrap();
        m.advance(PipelinePhase::Staging, None).unwrap();
        m.advance(PipelinePhase::Voting, None).unwrap();
        m.advance(PipelinePhase::Resolved, None).unwrap();

        assert!(m.advance(PipelinePhase::Refining, None).is_err());
        assert!(m.advance(PipelinePhase::Exhausted, None).is_err());
    }

    #[test]
    fn test_no_backward_transition() {
        let mut m = PipelineMachine::new();
        m.advance(PipelinePhase::Refining, None).unwrap();
        assert!(m.advance(PipelinePhase::Discovery, None).is_err());
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = TransitionRecord {
            from: PipelinePhase::Voting,
            to: PipelinePhase::Escalating,
            round: 3,
            elapsed_ms: 42,
            reason: Some("similarity 0.40".into()),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"voting\""));
        let back: TransitionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.from, PipelinePhase::Voting);
        assert_eq!(back.to, PipelinePhase::Escalating);
        assert_eq!(back.round, 3);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(PipelinePhase::Discovery.to_string(), "discovery");
        assert_eq!(PipelinePhase::Exhausted.to_string(), "exhausted");
    }
}
