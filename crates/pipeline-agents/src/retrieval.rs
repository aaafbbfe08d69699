//! Stage knowledge retrieval with graceful degradation.
//!
//! Generators get a short guidance snippet per stage (known pitfalls, output
//! conventions). Retrieval is best-effort: a broken knowledge source must
//! never block pipeline start-up.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

/// A source of stage guidance snippets.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn retrieve(&self, stage: &str) -> Result<String>;
}

/// In-process retriever over a fixed guidance map.
pub struct StaticRetriever {
    entries: HashMap<String, String>,
}

impl StaticRetriever {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Built-in guidance for the standard ETL stages.
    pub fn builtin() -> Self {
        Self::new(HashMap::from([
            (
                "ingest".to_string(),
                "Load the source file as-is. Preserve column names and row order; \
                 schema inference happens downstream."
                    .to_string(),
            ),
            (
                "clean".to_string(),
                "Drop exact-duplicate rows, normalize null markers, and coerce \
                 numeric columns. Record every dropped row count."
                    .to_string(),
            ),
            (
                "transform".to_string(),
                "Apply aggregations and derived columns last. Write output to a \
                 new locator, never in place."
                    .to_string(),
            ),
        ]))
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticRetriever {
    async fn retrieve(&self, stage: &str) -> Result<String> {
        Ok(self.entries.get(stage).cloned().unwrap_or_default())
    }
}

/// Retrieve guidance for a stage, degrading to an empty snippet on failure.
///
/// Retrieval failure never blocks the pipeline.
pub async fn retrieve_with_failsafe(retriever: &dyn KnowledgeRetriever, stage: &str) -> String {
    match retriever.retrieve(stage).await {
        Ok(guidance) => guidance,
        Err(e) => {
            warn!(stage, error = %e, "Guidance retrieval failed — proceeding without context");
            String::new()
        }
    }
}
