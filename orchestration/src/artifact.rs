//! Artifact model — the immutable record produced at each pipeline stage.

use serde::{Deserialize, Serialize};

/// Maximum error text carried into a fallback rationale.
const MAX_ERROR_CHARS: usize = 200;

/// Immutable record produced by a stage, reviewer summary, or resolver.
///
/// The engine never interprets `content`; only `rationale` is inspected
/// (for votes and gap mining). `output_locator`/`output_format` advance the
/// pipeline's data cursor when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Identifier of the stage/solution that produced this artifact.
    pub name: String,
    /// Opaque generated payload.
    pub content: String,
    /// Free-text justification.
    pub rationale: String,
    /// Where downstream stages should read input from, if this stage
    /// produced a new dataset. Absent means "keep the current cursor."
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_locator: Option<String>,
    /// Format tag accompanying the locator (csv, parquet, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

impl Artifact {
    /// Create an artifact with no output cursor.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            rationale: rationale.into(),
            output_locator: None,
            output_format: None,
        }
    }

    /// Attach an output locator and format.
    pub fn with_output(mut self, locator: impl Into<String>, format: impl Into<String>) -> Self {
        self.output_locator = Some(locator.into());
        self.output_format = Some(format.into());
        self
    }

    /// Deterministic fallback artifact for a failed stage.
    ///
    /// A stage error always yields a reduced-confidence artifact rather than
    /// no artifact — the pipeline must keep advancing. The error text is
    /// truncated so a runaway message cannot bloat the chain.
    pub fn fallback(stage_name: &str, error: &str) -> Self {
        Self {
            name: format!("{stage_name}_fallback"),
            content: String::new(),
            rationale: format!(
                "Stage '{}' failed: {}. Produced minimal fallback step; pipeline continues.",
                stage_name,
                truncate(error, MAX_ERROR_CHARS)
            ),
            output_locator: None,
            output_format: None,
        }
    }

    /// Whether this artifact was produced by the fallback path.
    pub fn is_fallback(&self) -> bool {
        self.name.ends_with("_fallback")
    }
}

/// Truncate on a char boundary, appending an ellipsis when cut.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}
