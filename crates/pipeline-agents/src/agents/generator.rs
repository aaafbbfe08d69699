//! HTTP stage generator: one chat completion per stage call, parsed into an
//! [`Artifact`].

use std::sync::Arc;

use async_trait::async_trait;
use orchestration::{Artifact, CollabResult, GenerateRequest, StageGenerator};
use serde::Deserialize;

use crate::prompts::{stage_preamble, stage_prompt, REFINER_PREAMBLE};

use super::ChatClient;

pub struct HttpStageGenerator {
    name: String,
    preamble: String,
    guidance: String,
    client: Arc<ChatClient>,
}

impl HttpStageGenerator {
    pub fn new(name: &str, client: Arc<ChatClient>, guidance: String) -> Self {
        Self {
            name: name.to_string(),
            preamble: stage_preamble(name),
            guidance,
            client,
        }
    }

    /// The refiner shares the transport but rewrites tasks instead of
    /// generating code.
    pub fn refiner(client: Arc<ChatClient>) -> Self {
        Self {
            name: "refine".to_string(),
            preamble: REFINER_PREAMBLE.to_string(),
            guidance: String::new(),
            client,
        }
    }
}

#[async_trait]
impl StageGenerator for HttpStageGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, req: GenerateRequest<'_>) -> CollabResult<Artifact> {
        let mut prompt = stage_prompt(
            req.task,
            req.input_locator,
            req.input_format,
            req.capability,
            req.feedback,
        );
        if !self.guidance.is_empty() {
            prompt.push_str(&format!("\nGuidance: {}", self.guidance));
        }
        if let Some(previous) = req.previous {
            prompt.push_str(&format!(
                "\nPrevious step '{}': {}",
                previous.name, previous.rationale
            ));
        }

        let text = self.client.complete(&self.preamble, &prompt).await?;
        Ok(parse_artifact(&self.name, &text))
    }
}

#[derive(Deserialize)]
struct GeneratedPayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    rationale: String,
    output_locator: Option<String>,
    output_format: Option<String>,
}

/// Parse model output into an artifact.
///
/// Structured JSON (optionally inside a fenced block) is preferred; anything
/// else becomes a raw-content artifact rather than an error, since a usable
/// but unstructured response should still enter the chain.
pub(crate) fn parse_artifact(stage: &str, text: &str) -> Artifact {
    let body = extract_json(text).unwrap_or(text);
    match serde_json::from_str::<GeneratedPayload>(body) {
        Ok(payload) => {
            let rationale = if payload.rationale.is_empty() {
                format!("{stage} step generated")
            } else {
                payload.rationale
            };
            let mut artifact = Artifact::new(stage, payload.content, rationale);
            if let (Some(locator), Some(format)) = (payload.output_locator, payload.output_format) {
                artifact = artifact.with_output(locator, format);
            }
            artifact
        }
        Err(_) => Artifact::new(
            stage,
            text.trim(),
            format!("{stage} output (unstructured response)"),
        ),
    }
}

/// Slice out the first JSON object, tolerating markdown fences and prose
/// around it.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_with_output() {
        let text = r#"{"content": "df = read_csv(path)", "rationale": "loads the file",
                       "output_locator": "data/raw.parquet", "output_format": "parquet"}"#;
        let a = parse_artifact("ingest", text);
        assert_eq!(a.name, "ingest");
        assert_eq!(a.rationale, "loads the file");
        assert_eq!(a.output_locator.as_deref(), Some("data/raw.parquet"));
        assert_eq!(a.output_format.as_deref(), Some("parquet"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "Here is the stage:\n```json\n{\"content\": \"x\", \"rationale\": \"r\"}\n```";
        let a = parse_artifact("clean", text);
        assert_eq!(a.content, "x");
        assert_eq!(a.rationale, "r");
        assert!(a.output_locator.is_none());
    }

    #[test]
    fn test_parse_unstructured_falls_back_to_raw() {
        let a = parse_artifact("transform", "just some code without json");
        assert_eq!(a.content, "just some code without json");
        assert!(a.rationale.contains("unstructured"));
    }

    #[test]
    fn test_parse_empty_rationale_gets_default() {
        let a = parse_artifact("ingest", r#"{"content": "c"}"#);
        assert_eq!(a.rationale, "ingest step generated");
    }

    #[test]
    fn test_extract_json_bounds() {
        assert_eq!(extract_json("pre {\"a\": 1} post"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} inverted {"), None);
    }
}
