//! Final pipeline report — the run's only persisted boundary artifact.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::machine::TransitionRecord;
use crate::state::WorkflowState;

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Unique id for this run.
    pub run_id: String,
    /// Original instruction.
    pub task: String,
    /// Whether reviewer consensus was reached.
    pub consensus_reached: bool,
    /// Total completed voting rounds.
    pub rounds: u32,
    /// Times the resolver sub-workflow fired.
    pub escalation_count: u32,
    /// Full ordered artifact chain.
    pub artifacts: Vec<Artifact>,
    /// Per-round gap summaries.
    pub feedback_history: Vec<String>,
    /// Phase transition log for replay.
    pub transitions: Vec<TransitionRecord>,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
}

impl PipelineReport {
    /// Assemble a report from terminal workflow state.
    pub fn from_state(state: &WorkflowState, transitions: Vec<TransitionRecord>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            task: state.task.clone(),
            consensus_reached: state.consensus_reached,
            rounds: state.round,
            escalation_count: state.escalation_count,
            artifacts: state.artifacts.clone(),
            feedback_history: state.feedback_history.clone(),
            transitions,
            completed_at: Utc::now(),
        }
    }

    /// Compact status line for logs.
    pub fn summary_line(&self) -> String {
        let status = if self.consensus_reached {
            "CONSENSUS"
        } else {
            "NO CONSENSUS"
        };
        format!(
            "[{}] {} rounds | {} artifacts | {} escalations",
            status,
            self.rounds,
            self.artifacts.len(),
            self.escalation_count
        )
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing pipeline report")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
        Ok(())
    }
}
