//! Vote tallying and gap mining — pure, deterministic functions.
//!
//! Isolated from control flow so the keyword vocabulary can be swapped
//! without touching the orchestrator or voting round.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

/// Phrases that mark a rationale segment as describing a deficiency.
pub const GAP_INDICATORS: &[&str] = &[
    "missing",
    "lacks",
    "incomplete",
    "should include",
    "needs",
    "requires",
    "absent",
];

/// Upper bound on mined gaps per round, for feedback-size control.
pub const MAX_GAPS: usize = 5;

/// A reviewer's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDecision {
    Yes,
    No,
}

impl std::fmt::Display for VoteDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

/// A single reviewer vote. Ephemeral — lives only within a voting round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub agent_id: String,
    pub decision: VoteDecision,
    pub rationale: String,
}

impl Vote {
    pub fn new(agent_id: impl Into<String>, decision: VoteDecision, rationale: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            decision,
            rationale: rationale.into(),
        }
    }

    /// Synthetic No vote standing in for a failed reviewer call.
    pub fn synthetic_no(agent_id: &str, error: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            decision: VoteDecision::No,
            rationale: format!("Reviewer '{agent_id}' error: {error}. Counted as No."),
        }
    }
}

/// Result of tallying a vote set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyOutcome {
    /// Strict-majority consensus flag.
    pub consensus: bool,
    /// Number of Yes votes.
    pub yes_votes: usize,
    /// Total votes tallied.
    pub total_votes: usize,
    /// Deduplicated, sorted gap segments mined from No votes (≤ MAX_GAPS).
    pub gaps: Vec<String>,
}

impl TallyOutcome {
    /// Feedback line injected into the next round's refinement, empty when
    /// no gaps were mined.
    pub fn feedback_summary(&self) -> String {
        if self.gaps.is_empty() {
            String::new()
        } else {
            format!("MUST address these gaps: {}", self.gaps.join("; "))
        }
    }

    /// Per-round history entry for escalation trend analysis.
    pub fn history_entry(&self) -> String {
        self.gaps.join("; ")
    }
}

/// Tally votes against a threshold fraction.
///
/// Consensus requires strictly more than `threshold * total` Yes votes, so
/// ties at the default 0.5 are "no consensus". Pure and commutative: reviewer
/// order never changes the outcome.
pub fn tally_votes(votes: &[Vote], threshold: f64) -> TallyOutcome {
    let yes_votes = votes
        .iter()
        .filter(|v| v.decision == VoteDecision::Yes)
        .count();
    let total_votes = votes.len();
    let consensus = total_votes > 0 && (yes_votes as f64) > (total_votes as f64) * threshold;

    TallyOutcome {
        consensus,
        yes_votes,
        total_votes,
        gaps: mine_gaps(votes),
    }
}

/// Extract deficiency segments from No-vote rationales.
///
/// Rationales are lowercased and split into sentence-like segments on `.`;
/// a segment is kept when it contains any gap indicator. The union across
/// all No votes is deduplicated via a sorted set (deterministic regardless
/// of vote order) and capped at `MAX_GAPS`.
pub fn mine_gaps(votes: &[Vote]) -> Vec<String> {
    let mut gaps = BTreeSet::new();
    for vote in votes {
        if vote.decision != VoteDecision::No {
            continue;
        }
        let rationale = vote.rationale.to_lowercase();
        for segment in rationale.split('.') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            if GAP_INDICATORS.iter().any(|kw| segment.contains(kw)) {
                gaps.insert(segment.to_string());
            }
        }
    }
    gaps.into_iter().take(MAX_GAPS).collect()
}

/// Build the round-summary artifact from a tally.
///
/// Name is always `validation`; the rationale carries the vote count plus
/// every reviewer's rationale for audit.
pub fn summary_artifact(outcome: &TallyOutcome, votes: &[Vote]) -> Artifact {
    let details: Vec<&str> = votes.iter().map(|v| v.rationale.as_str()).collect();
    let rationale = format!(
        "Consensus: {}/{} yes votes. Details: {}",
        outcome.yes_votes,
        outcome.total_votes,
        details.join(" | ")
    );
    let content = if outcome.consensus { "" } else { "Refine pipeline" };
    Artifact::new("validation", content, rationale)
}
