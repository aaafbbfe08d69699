//! System prompt constants for each collaborator role.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever preamble content
//! changes, so a report can be traced back to the prompts that produced it.

/// Prompt version. Bump on any preamble content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Refiner preamble. The refiner rewrites the task, it never writes code.
pub const REFINER_PREAMBLE: &str = "\
You are a requirements refiner for an automated data pipeline. You receive a \
task, possibly prefixed with reviewer feedback about gaps in the previous \
attempt. Rewrite the task into a precise, actionable specification that \
addresses every listed gap. Respond with JSON: \
{\"name\": \"refine\", \"content\": \"\", \"rationale\": \"<the refined task>\"}. \
Do NOT write pipeline code yourself.";

/// Reviewer preamble. One independent vote per call.
pub const REVIEWER_PREAMBLE: &str = "\
You are a pipeline quality auditor. You receive the full chain of artifacts \
produced so far. Judge whether the pipeline is complete and correct: loading, \
cleaning, transformation, and validation must all be covered. Start your \
answer with 'yes' if the pipeline is acceptable, otherwise explain each gap \
in its own sentence (say what is missing or lacking).";

/// Stage generator preamble for a named pipeline stage.
pub fn stage_preamble(stage: &str) -> String {
    format!(
        "You are the '{stage}' stage of an automated data pipeline. Generate \
         the code for this stage only, reading from the input locator you are \
         given. Respond with JSON: {{\"name\": \"{stage}\", \"content\": \
         \"<code>\", \"rationale\": \"<one-line summary>\", \
         \"output_locator\": \"<path this stage writes, if any>\", \
         \"output_format\": \"<format tag>\"}}. Omit the output fields if the \
         stage writes nothing."
    )
}

/// User-message template for a stage generator call.
pub fn stage_prompt(
    task: &str,
    input_locator: &str,
    input_format: &str,
    capability: Option<&str>,
    feedback: &str,
) -> String {
    let mut prompt = format!("Task: {task}\nInput: {input_locator} ({input_format})");
    if let Some(capability) = capability {
        prompt.push_str(&format!("\nRegistered capability: {capability}"));
    }
    if !feedback.is_empty() {
        prompt.push_str(&format!("\nReviewer feedback: {feedback}"));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_preamble_names_stage() {
        let p = stage_preamble("ingest");
        assert!(p.contains("'ingest' stage"));
        assert!(p.contains("\"name\": \"ingest\""));
    }

    #[test]
    fn test_stage_prompt_optional_sections() {
        let bare = stage_prompt("t", "data/x.csv", "csv", None, "");
        assert!(!bare.contains("capability"));
        assert!(!bare.contains("feedback"));

        let full = stage_prompt("t", "data/x.csv", "csv", Some("load_csv"), "fix nulls");
        assert!(full.contains("Registered capability: load_csv"));
        assert!(full.contains("Reviewer feedback: fix nulls"));
    }
}
