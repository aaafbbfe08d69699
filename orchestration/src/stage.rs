//! Stage runner — wraps one generator call with timeout and fallback.

use std::time::Duration;

use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::collaborators::{CollabError, GenerateRequest, StageGenerator};
use crate::state::WorkflowState;

/// Default per-stage call timeout.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Run a single stage against the current state.
///
/// On success the artifact is appended and the data cursor advances if the
/// artifact carries an output locator. On any error — including timeout and
/// malformed generator output — a deterministic fallback artifact is appended
/// instead. No stage failure is fatal to the orchestrator, and the cursor is
/// left untouched on the fallback path so downstream stages still read valid
/// input.
pub async fn run_stage(
    generator: &dyn StageGenerator,
    state: &mut WorkflowState,
    timeout: Duration,
) {
    let stage_name = generator.name().to_string();
    let request = GenerateRequest {
        task: &state.refined_task,
        input_locator: &state.current_data_locator,
        input_format: &state.current_format,
        previous: state.artifacts.last(),
        feedback: &state.feedback_summary,
        capability: state.capability(&stage_name),
    };

    debug!(stage = %stage_name, locator = %state.current_data_locator, "Running stage");

    let result = match tokio::time::timeout(timeout, generator.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(CollabError::Timeout(timeout.as_secs())),
    };

    match result {
        Ok(artifact) => {
            debug!(
                stage = %stage_name,
                artifact = %artifact.name,
                has_output = artifact.output_locator.is_some(),
                "Stage succeeded"
            );
            state.push_artifact(artifact);
        }
        Err(e) => {
            warn!(stage = %stage_name, error = %e, "Stage failed — appending fallback artifact");
            state.push_artifact(Artifact::fallback(&stage_name, &e.to_string()));
        }
    }
}
