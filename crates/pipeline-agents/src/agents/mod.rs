//! HTTP-backed collaborator implementations and the factory that wires a
//! full [`CollaboratorSet`] from config.

pub mod discovery;
pub mod generator;
pub mod resolver;
pub mod reviewer;

use std::sync::Arc;

use orchestration::{CollabError, CollabResult, CollaboratorSet};
use serde::Deserialize;
use tracing::debug;

use crate::config::{AgentsConfig, Endpoint};
use crate::retrieval::{retrieve_with_failsafe, KnowledgeRetriever, StaticRetriever};

use discovery::HttpCapabilityDiscovery;
use generator::HttpStageGenerator;
use resolver::TemplateResolver;
use reviewer::HttpReviewer;

/// The standard stage sequence, in execution order.
pub const STAGE_NAMES: [&str; 3] = ["ingest", "clean", "transform"];

/// Thin client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatClient {
    pub fn new(endpoint: &Endpoint, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: endpoint.url.clone(),
            model: endpoint.model.clone(),
            api_key,
        }
    }

    /// One system+user completion, returning the raw assistant text.
    pub async fn complete(&self, preamble: &str, prompt: &str) -> CollabResult<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": preamble},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.2,
        });

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollabError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CollabError::Unavailable(format!(
                "{} returned {}",
                self.base_url,
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollabError::Parse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CollabError::Parse("response had no choices".into()))
    }
}

/// Build the full collaborator set from config.
///
/// One chat client per endpoint, shared across the roles it serves. Guidance
/// retrieval is best-effort and never blocks start-up.
pub async fn build_collaborators(config: &AgentsConfig) -> CollaboratorSet {
    let generator_client = Arc::new(ChatClient::new(
        &config.generator_endpoint,
        config.api_key.clone(),
    ));
    let reviewer_client = Arc::new(ChatClient::new(
        &config.reviewer_endpoint,
        config.api_key.clone(),
    ));
    let retriever = StaticRetriever::builtin();

    let mut stages: Vec<Box<dyn orchestration::StageGenerator>> =
        Vec::with_capacity(STAGE_NAMES.len());
    for name in STAGE_NAMES {
        let guidance = retrieve_with_failsafe(&retriever as &dyn KnowledgeRetriever, name).await;
        debug!(stage = name, guidance_chars = guidance.len(), "Stage generator ready");
        stages.push(Box::new(HttpStageGenerator::new(
            name,
            generator_client.clone(),
            guidance,
        )));
    }

    let reviewers: Vec<Box<dyn orchestration::Reviewer>> = (1..=config.review_panel)
        .map(|i| {
            Box::new(HttpReviewer::new(
                format!("auditor-{i}"),
                reviewer_client.clone(),
            )) as Box<dyn orchestration::Reviewer>
        })
        .collect();

    CollaboratorSet {
        discovery: Box::new(HttpCapabilityDiscovery::new(&config.tools_url)),
        refiner: Box::new(HttpStageGenerator::refiner(generator_client)),
        stages,
        reviewers,
        resolver: Box::new(TemplateResolver),
    }
}
