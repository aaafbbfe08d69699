//! HTTP reviewer: one independent vote per call over the artifact chain.

use std::sync::Arc;

use async_trait::async_trait;
use orchestration::{Artifact, CollabResult, Reviewer, Vote, VoteDecision};

use crate::prompts::REVIEWER_PREAMBLE;

use super::ChatClient;

pub struct HttpReviewer {
    id: String,
    client: Arc<ChatClient>,
}

impl HttpReviewer {
    pub fn new(id: String, client: Arc<ChatClient>) -> Self {
        Self { id, client }
    }
}

#[async_trait]
impl Reviewer for HttpReviewer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn review(&self, artifacts: &[Artifact], context: &str) -> CollabResult<Vote> {
        let chain = artifacts
            .iter()
            .map(|a| format!("- {}: {}", a.name, a.rationale))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Task context: {context}\n\nArtifact chain:\n{chain}\n\n\
             Is this pipeline complete and correct?"
        );

        let text = self.client.complete(REVIEWER_PREAMBLE, &prompt).await?;
        Ok(parse_vote(&self.id, &text))
    }
}

/// Lenient vote parse: any "yes" in the response approves; everything else
/// is a No whose full text becomes the gap-mining rationale.
pub(crate) fn parse_vote(agent_id: &str, response: &str) -> Vote {
    let decision = if response.to_lowercase().contains("yes") {
        VoteDecision::Yes
    } else {
        VoteDecision::No
    };
    Vote::new(agent_id, decision, response.trim())
}
