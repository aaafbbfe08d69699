use std::path::PathBuf;

use serde::Deserialize;

/// An OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub model: String,
}

/// Top-level pipeline configuration, env-driven with local defaults.
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    /// Serves the refiner and the stage generators.
    pub generator_endpoint: Endpoint,
    /// Serves the reviewer panel (smaller model, independent votes).
    pub reviewer_endpoint: Endpoint,
    /// Tool registry base URL for capability discovery (GET {url}/tools).
    pub tools_url: String,
    /// Bearer token for the chat endpoints, if the backend wants one.
    pub api_key: Option<String>,
    /// Number of reviewers in the voting panel.
    pub review_panel: usize,
    /// Where the final report JSON lands (None = skip writing).
    pub report_dir: Option<PathBuf>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            generator_endpoint: Endpoint {
                url: std::env::var("PIPELINE_GENERATOR_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/v1".into()),
                model: std::env::var("PIPELINE_GENERATOR_MODEL")
                    .unwrap_or_else(|_| "qwen2.5-coder-32b".into()),
            },
            reviewer_endpoint: Endpoint {
                url: std::env::var("PIPELINE_REVIEWER_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/v1".into()),
                model: std::env::var("PIPELINE_REVIEWER_MODEL")
                    .unwrap_or_else(|_| "qwen2.5-14b-instruct".into()),
            },
            tools_url: std::env::var("PIPELINE_TOOLS_URL")
                .unwrap_or_else(|_| "http://localhost:8765".into()),
            api_key: std::env::var("PIPELINE_API_KEY").ok(),
            review_panel: std::env::var("PIPELINE_REVIEW_PANEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            report_dir: Some(PathBuf::from("reports")),
        }
    }
}

/// Check if an inference endpoint is reachable (GET /models).
pub async fn check_endpoint(url: &str) -> bool {
    let models_url = format!("{url}/models");
    match reqwest::Client::new()
        .get(&models_url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_review_panel_size() {
        // Env may override, but the fallback is a 3-voter panel.
        let config = AgentsConfig::default();
        assert!(config.review_panel >= 1);
    }
}
