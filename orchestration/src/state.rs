//! Workflow state — the single mutable object threaded through the pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

/// Default data cursor when no stage has produced output yet.
pub const DEFAULT_DATA_LOCATOR: &str = "data/sales_data.csv";
/// Default format tag for the initial cursor.
pub const DEFAULT_DATA_FORMAT: &str = "csv";

/// Mutable pipeline state, owned exclusively by the orchestrator task.
///
/// `artifacts` is append-only within a run: stage runners and voting rounds
/// push records but never replace or remove them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Original instruction.
    pub task: String,
    /// Task augmented with accumulated feedback (rewritten each round).
    pub refined_task: String,
    /// Ordered sequence of all artifacts produced so far.
    pub artifacts: Vec<Artifact>,
    /// Number of completed voting rounds.
    pub round: u32,
    /// Terminal flag set by the voting round.
    pub consensus_reached: bool,
    /// Logical stage name → discovered capability id. Empty map is valid
    /// (fallback mode).
    pub capabilities: HashMap<String, String>,
    /// Text injected into the next round's refinement stage. Overwritten
    /// each round.
    pub feedback_summary: String,
    /// One gap summary per completed round, append-only. Drives escalation
    /// detection.
    pub feedback_history: Vec<String>,
    /// Times escalation has fired this run.
    pub escalation_count: u32,
    /// Cursor pointing at the latest stage output.
    pub current_data_locator: String,
    /// Format tag for the cursor.
    pub current_format: String,
    /// Stage name → output locator, audit only. Control logic never reads it.
    pub metadata: HashMap<String, String>,
}

impl WorkflowState {
    /// Fresh state for a new pipeline run.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            refined_task: String::new(),
            artifacts: Vec::new(),
            round: 0,
            consensus_reached: false,
            capabilities: HashMap::new(),
            feedback_summary: String::new(),
            feedback_history: Vec::new(),
            escalation_count: 0,
            current_data_locator: DEFAULT_DATA_LOCATOR.to_string(),
            current_format: DEFAULT_DATA_FORMAT.to_string(),
            metadata: HashMap::new(),
        }
    }

    /// Override the initial data cursor.
    pub fn with_data_cursor(mut self, locator: impl Into<String>, format: impl Into<String>) -> Self {
        self.current_data_locator = locator.into();
        self.current_format = format.into();
        self
    }

    /// Append an artifact, advancing the data cursor when it carries one.
    pub fn push_artifact(&mut self, artifact: Artifact) {
        if let Some(locator) = &artifact.output_locator {
            self.current_data_locator = locator.clone();
            if let Some(format) = &artifact.output_format {
                self.current_format = format.clone();
            }
            self.metadata.insert(artifact.name.clone(), locator.clone());
        }
        self.artifacts.push(artifact);
    }

    /// The most recent artifact, if any.
    pub fn last_artifact(&self) -> Option<&Artifact> {
        self.artifacts.last()
    }

    /// Discovered capability for a logical stage, if any.
    pub fn capability(&self, stage: &str) -> Option<&str> {
        self.capabilities.get(stage).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let s = WorkflowState::new("build pipeline");
        assert_eq!(s.round, 0);
        assert!(!s.consensus_reached);
        assert!(s.artifacts.is_empty());
        assert_eq!(s.current_data_locator, DEFAULT_DATA_LOCATOR);
        assert_eq!(s.current_format, DEFAULT_DATA_FORMAT);
        assert_eq!(s.escalation_count, 0);
    }

    #[test]
    fn test_push_without_cursor_keeps_locator() {
        let mut s = WorkflowState::new("t");
        s.push_artifact(Artifact::new("refine", "", "r"));
        assert_eq!(s.artifacts.len(), 1);
        assert_eq!(s.current_data_locator, DEFAULT_DATA_LOCATOR);
        assert!(s.metadata.is_empty());
    }

    #[test]
    fn test_push_with_cursor_advances_and_records_metadata() {
        let mut s = WorkflowState::new("t");
        s.push_artifact(Artifact::new("ingest", "", "loaded").with_output("data/raw.parquet", "parquet"));
        assert_eq!(s.current_data_locator, "data/raw.parquet");
        assert_eq!(s.current_format, "parquet");
        assert_eq!(s.metadata.get("ingest").map(String::as_str), Some("data/raw.parquet"));
    }

    #[test]
    fn test_artifacts_append_only_ordering() {
        let mut s = WorkflowState::new("t");
        for name in ["refine", "ingest", "clean", "transform"] {
            let before = s.artifacts.len();
            s.push_artifact(Artifact::new(name, "", ""));
            assert_eq!(s.artifacts.len(), before + 1);
        }
        let names: Vec<&str> = s.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["refine", "ingest", "clean", "transform"]);
    }

    #[test]
    fn test_capability_lookup() {
        let mut s = WorkflowState::new("t");
        assert!(s.capability("ingest").is_none());
        s.capabilities.insert("ingest".into(), "load_csv".into());
        assert_eq!(s.capability("ingest"), Some("load_csv"));
    }

    #[test]
    fn test_with_data_cursor() {
        let s = WorkflowState::new("t").with_data_cursor("data/orders.json", "json");
        assert_eq!(s.current_data_locator, "data/orders.json");
        assert_eq!(s.current_format, "json");
    }
}
