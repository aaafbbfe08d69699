//! Orchestration engine for a multi-agent generation pipeline.
//!
//! This crate provides:
//! - The immutable [`Artifact`] model and the [`WorkflowState`] threaded
//!   through a run
//! - Pure vote tallying and gap mining ([`tally`])
//! - Persistent-gap similarity detection ([`escalation`])
//! - The stage runner with timeout + fallback semantics ([`stage`])
//! - The concurrent reviewer voting round ([`round`])
//! - A typed pipeline state machine with a transition log ([`machine`])
//! - The top-level orchestrator loop ([`orchestrator`])
//!
//! Collaborators (generators, reviewers, resolver, discovery) are injected
//! via the traits in [`collaborators`]; the engine contains no model or
//! transport code and never lets a collaborator failure abort a run.

pub mod artifact;
pub mod collaborators;
pub mod escalation;
pub mod machine;
pub mod orchestrator;
pub mod report;
pub mod round;
pub mod stage;
pub mod state;
pub mod tally;

pub use artifact::Artifact;
pub use collaborators::{
    CapabilityDiscovery, CollabError, CollabResult, CollaboratorSet, GenerateRequest, Resolver,
    Reviewer, StageGenerator,
};
pub use escalation::EscalationConfig;
pub use machine::{PipelineMachine, PipelinePhase, TransitionRecord};
pub use orchestrator::{PipelineConfig, PipelineOrchestrator};
pub use report::PipelineReport;
pub use state::WorkflowState;
pub use tally::{Vote, VoteDecision};
