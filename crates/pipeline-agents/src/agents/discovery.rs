//! Capability discovery against a tool registry.
//!
//! The registry exposes `GET {base}/tools` listing its tool names; known
//! names map onto logical pipeline stages. Unknown tools are ignored, and
//! the engine degrades to its static map if the registry is down or empty.

use std::collections::HashMap;

use async_trait::async_trait;
use orchestration::{CapabilityDiscovery, CollabError, CollabResult};
use serde::Deserialize;
use tracing::debug;

pub struct HttpCapabilityDiscovery {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ToolList {
    tools: Vec<Tool>,
}

#[derive(Deserialize)]
struct Tool {
    name: String,
}

impl HttpCapabilityDiscovery {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl CapabilityDiscovery for HttpCapabilityDiscovery {
    async fn discover(&self) -> CollabResult<HashMap<String, String>> {
        let url = format!("{}/tools", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CollabError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CollabError::Unavailable(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        let list: ToolList = response
            .json()
            .await
            .map_err(|e| CollabError::Parse(e.to_string()))?;
        debug!(tools = list.tools.len(), "Tool registry responded");
        Ok(map_tools(&list.tools))
    }
}

/// Map registry tool names onto logical stage names.
fn map_tools(tools: &[Tool]) -> HashMap<String, String> {
    let mut capabilities = HashMap::new();
    for tool in tools {
        let stage = match tool.name.as_str() {
            "load_csv" => "ingest",
            "clean_data" => "clean",
            "transform_data" => "transform",
            "validate_data" => "validate",
            _ => continue,
        };
        capabilities.insert(stage.to_string(), tool.name.clone());
    }
    capabilities
}
