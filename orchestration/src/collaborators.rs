//! External collaborator contracts consumed by the engine.
//!
//! Generators, reviewers, the resolver, and capability discovery are all
//! injected dependencies. The engine never constructs them and never lets an
//! error from one abort the run — every call site has a fallback path.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::artifact::Artifact;
use crate::tally::Vote;

/// Errors a collaborator call can surface.
///
/// The orchestration core converts all of these into fallback artifacts or
/// synthetic votes; they never propagate past the component that observed them.
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("call timed out after {0} seconds")]
    Timeout(u64),
}

/// Result type for collaborator calls.
pub type CollabResult<T> = Result<T, CollabError>;

/// Input handed to a stage generator.
///
/// Carries the current data cursor, the previous artifact for continuity,
/// accumulated reviewer feedback, and the discovered capability id for this
/// stage (absent in fallback mode).
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    /// The refined task for this round (for the refiner itself: the
    /// feedback-composed task to refine).
    pub task: &'a str,
    pub input_locator: &'a str,
    pub input_format: &'a str,
    pub previous: Option<&'a Artifact>,
    pub feedback: &'a str,
    pub capability: Option<&'a str>,
}

/// A named stage generator (task → artifact).
///
/// Implementations must be safe to call repeatedly across rounds but are
/// invoked at most once per stage-runner call — retry policy lives outside.
#[async_trait]
pub trait StageGenerator: Send + Sync {
    /// Logical stage name (refine, ingest, clean, ...).
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerateRequest<'_>) -> CollabResult<Artifact>;
}

/// A reviewer identity that votes on the full artifact chain.
#[async_trait]
pub trait Reviewer: Send + Sync {
    /// Stable reviewer id used in vote records and synthetic-vote rationales.
    fn id(&self) -> &str;

    async fn review(&self, artifacts: &[Artifact], context: &str) -> CollabResult<Vote>;
}

/// Specialized resolver invoked when the same gaps recur across rounds.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        gaps: &str,
        context: &str,
        history: &[String],
    ) -> CollabResult<Artifact>;
}

/// Capability discovery service queried once at start-up.
#[async_trait]
pub trait CapabilityDiscovery: Send + Sync {
    /// Logical stage name → concrete capability id. May be empty.
    async fn discover(&self) -> CollabResult<HashMap<String, String>>;
}

/// The full set of collaborators a pipeline run needs.
///
/// `stages` run in declared order after the refiner, every round.
pub struct CollaboratorSet {
    pub discovery: Box<dyn CapabilityDiscovery>,
    pub refiner: Box<dyn StageGenerator>,
    pub stages: Vec<Box<dyn StageGenerator>>,
    pub reviewers: Vec<Box<dyn Reviewer>>,
    pub resolver: Box<dyn Resolver>,
}
