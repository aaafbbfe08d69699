//! Voting round — concurrent reviewer fan-out joined before tallying.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::collaborators::{CollabError, Reviewer};
use crate::tally::{self, TallyOutcome, Vote};

/// Default round-scoped timeout shared by all reviewer calls.
pub const DEFAULT_REVIEW_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of one voting round.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// Summary artifact (`validation`) to append to the chain.
    pub summary: Artifact,
    /// Raw votes, one per configured reviewer.
    pub votes: Vec<Vote>,
    /// Tally with consensus flag and mined gaps.
    pub tally: TallyOutcome,
}

/// Fan out one review call per reviewer and tally the joined results.
///
/// Every reviewer gets the full artifact chain and shared context. A call
/// that errors or exceeds the round timeout is replaced by a synthetic No
/// vote naming the failing reviewer. Reviewer failures never fail the
/// round, and the vote count always equals the reviewer count.
pub async fn run_voting_round(
    reviewers: &[Box<dyn Reviewer>],
    artifacts: &[Artifact],
    context: &str,
    timeout: Duration,
    threshold: f64,
) -> RoundOutcome {
    debug!(reviewers = reviewers.len(), artifacts = artifacts.len(), "Voting round starting");

    let calls = reviewers.iter().map(|reviewer| async move {
        let result = match tokio::time::timeout(timeout, reviewer.review(artifacts, context)).await
        {
            Ok(result) => result,
            Err(_) => Err(CollabError::Timeout(timeout.as_secs())),
        };
        match result {
            Ok(vote) => vote,
            Err(e) => {
                warn!(reviewer = reviewer.id(), error = %e, "Reviewer failed — counting synthetic No");
                Vote::synthetic_no(reviewer.id(), &e.to_string())
            }
        }
    });

    let votes: Vec<Vote> = join_all(calls).await;
    let tally = tally::tally_votes(&votes, threshold);
    debug!(
        yes = tally.yes_votes,
        total = tally.total_votes,
        consensus = tally.consensus,
        gaps = tally.gaps.len(),
        "Voting round tallied"
    );

    RoundOutcome {
        summary: tally::summary_artifact(&tally, &votes),
        votes,
        tally,
    }
}
