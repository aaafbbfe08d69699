//! HTTP-backed collaborators for the orchestration engine, plus the CLI
//! entrypoint that wires them into a full pipeline run.

pub mod agents;
pub mod config;
pub mod prompts;
pub mod retrieval;
