//! Top-level pipeline orchestrator — sequences stages, runs voting rounds,
//! and applies the loop/terminate routing decision.
//!
//! Design principle: total containment. Every collaborator call site has a
//! fallback that keeps the state machine advancing, so the run always ends
//! at a terminal phase with a report — never with a propagated error from a
//! generator, reviewer, resolver, or the discovery service.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::artifact::{truncate, Artifact};
use crate::escalation::{self, EscalationConfig};
use crate::machine::{PipelineMachine, PipelinePhase};
use crate::report::PipelineReport;
use crate::round::{self, RoundOutcome, DEFAULT_REVIEW_TIMEOUT};
use crate::stage::{run_stage, DEFAULT_STAGE_TIMEOUT};
use crate::state::WorkflowState;
use crate::collaborators::{CollabError, CollaboratorSet};

/// How much of a failed re-validation rationale is carried into feedback.
const REVALIDATION_FEEDBACK_CHARS: usize = 200;

/// Orchestrator tuning. Round cap and thresholds are empirically chosen
/// defaults from the source system; treat them as configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum voting rounds before forced exit.
    pub max_rounds: u32,
    /// Consensus fraction; strictly more than `threshold * votes` Yes
    /// votes are required.
    pub consensus_threshold: f64,
    /// Per-call timeout for generators, the resolver, and discovery.
    pub stage_timeout: Duration,
    /// Round-scoped timeout shared by all reviewer calls.
    pub review_timeout: Duration,
    /// Persistent-gap escalation tuning.
    pub escalation: EscalationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            consensus_threshold: 0.5,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            review_timeout: DEFAULT_REVIEW_TIMEOUT,
            escalation: EscalationConfig::default(),
        }
    }
}

/// Static capability map used when discovery fails or returns nothing.
pub fn fallback_capabilities() -> HashMap<String, String> {
    HashMap::from([
        ("ingest".to_string(), "default_load".to_string()),
        ("clean".to_string(), "default_clean".to_string()),
        ("transform".to_string(), "default_transform".to_string()),
    ])
}

/// Compose the refinement input: accumulated feedback first, then the
/// original task, so the refiner addresses gaps before restating intent.
pub fn compose_refinement_task(task: &str, feedback_summary: &str) -> String {
    if feedback_summary.is_empty() {
        task.to_string()
    } else {
        format!(
            "{feedback_summary}\n\nOriginal Task: {task}\n\n\
             IMPORTANT: Address the gaps above in your refinements."
        )
    }
}

/// Drives a full pipeline run: discovery, then rounds of
/// refine → stages → vote until consensus or the round cap.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    collaborators: CollaboratorSet,
}

impl PipelineOrchestrator {
    pub fn new(collaborators: CollaboratorSet) -> Self {
        Self::with_config(collaborators, PipelineConfig::default())
    }

    pub fn with_config(collaborators: CollaboratorSet, config: PipelineConfig) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Run the pipeline for a task, returning the final report.
    pub async fn run(&self, task: &str) -> Result<PipelineReport> {
        self.run_with_state(WorkflowState::new(task)).await
    }

    /// Run the pipeline from pre-seeded state (custom data cursor, etc).
    pub async fn run_with_state(&self, mut state: WorkflowState) -> Result<PipelineReport> {
        let mut machine = PipelineMachine::new();
        info!(task = %state.task, max_rounds = self.config.max_rounds, "Pipeline starting");

        self.discover(&mut state).await;
        machine.advance(PipelinePhase::Refining, Some("discovery complete"))?;

        loop {
            // One full pass: refine → stages → vote. The round cap is
            // checked before looping back, so a capped run never starts
            // another stage sequence.
            self.refine(&mut state).await;
            machine.advance(PipelinePhase::Staging, None)?;

            for stage in &self.collaborators.stages {
                run_stage(stage.as_ref(), &mut state, self.config.stage_timeout).await;
            }
            machine.advance(PipelinePhase::Voting, None)?;

            let outcome = self.vote(&mut state).await;
            machine.set_round(state.round);

            if let Some(similarity) = escalation::should_escalate(
                &self.config.escalation,
                &state.feedback_history,
                outcome.tally.gaps.len(),
                state.escalation_count,
            ) {
                machine.advance(
                    PipelinePhase::Escalating,
                    Some(&format!("gap similarity {similarity:.2}")),
                )?;
                self.escalate(&mut state, similarity).await;

                if state.consensus_reached {
                    machine.advance(PipelinePhase::Resolved, Some("resolver solution validated"))?;
                    break;
                }
                if state.round >= self.config.max_rounds {
                    warn!(
                        rounds = state.round,
                        "Maximum rounds reached after escalation — forcing exit"
                    );
                    machine.advance(PipelinePhase::Exhausted, Some("round cap reached"))?;
                    break;
                }
                machine.advance(PipelinePhase::Refining, Some("resolver applied, looping"))?;
                continue;
            }

            if state.consensus_reached {
                machine.advance(
                    PipelinePhase::Resolved,
                    Some(&format!("{}/{} yes votes", outcome.tally.yes_votes, outcome.tally.total_votes)),
                )?;
                break;
            }
            if state.round >= self.config.max_rounds {
                warn!(
                    rounds = state.round,
                    "Maximum rounds reached without consensus — forcing exit"
                );
                machine.advance(PipelinePhase::Exhausted, Some("round cap reached"))?;
                break;
            }
            machine.advance(PipelinePhase::Refining, Some("no consensus, looping"))?;
        }

        let report = PipelineReport::from_state(&state, machine.into_transitions());
        info!("{}", report.summary_line());
        Ok(report)
    }

    /// Populate capabilities from the discovery collaborator. Failure or an
    /// empty result degrades to the static fallback map and never blocks.
    async fn discover(&self, state: &mut WorkflowState) {
        let result = match tokio::time::timeout(
            self.config.stage_timeout,
            self.collaborators.discovery.discover(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CollabError::Timeout(self.config.stage_timeout.as_secs())),
        };

        match result {
            Ok(map) if !map.is_empty() => {
                info!(capabilities = map.len(), "Capability discovery complete");
                state.capabilities = map;
            }
            Ok(_) => {
                warn!("No capabilities discovered — using static fallback map");
                state.capabilities = fallback_capabilities();
            }
            Err(e) => {
                warn!(error = %e, "Capability discovery failed — using static fallback map");
                state.capabilities = fallback_capabilities();
            }
        }
    }

    /// Rewrite the task with accumulated feedback and record the result.
    ///
    /// The refiner's rationale becomes `refined_task`; on refiner failure
    /// the composed prompt itself is used so downstream stages still see
    /// the feedback.
    async fn refine(&self, state: &mut WorkflowState) {
        state.refined_task = compose_refinement_task(&state.task, &state.feedback_summary);
        run_stage(
            self.collaborators.refiner.as_ref(),
            state,
            self.config.stage_timeout,
        )
        .await;

        if let Some(last) = state.last_artifact() {
            if !last.is_fallback() && !last.rationale.is_empty() {
                state.refined_task = last.rationale.clone();
            }
        }
    }

    /// Run the voting round and fold its outcome into state.
    async fn vote(&self, state: &mut WorkflowState) -> RoundOutcome {
        info!(round = state.round + 1, "Voting round starting");
        let outcome = round::run_voting_round(
            &self.collaborators.reviewers,
            &state.artifacts,
            &state.refined_task,
            self.config.review_timeout,
            self.config.consensus_threshold,
        )
        .await;

        state.push_artifact(outcome.summary.clone());
        state.round += 1;
        state.consensus_reached = outcome.tally.consensus;
        state.feedback_summary = outcome.tally.feedback_summary();
        state.feedback_history.push(outcome.tally.history_entry());
        outcome
    }

    /// Resolver sub-workflow: generate a targeted fix for recurring gaps,
    /// then immediately re-validate the updated chain.
    async fn escalate(&self, state: &mut WorkflowState, similarity: f64) {
        state.escalation_count += 1;
        info!(
            similarity = format!("{similarity:.2}"),
            escalation_count = state.escalation_count,
            "Persistent gaps detected — invoking resolver"
        );

        let gap_text = state.feedback_history.last().cloned().unwrap_or_default();
        let result = match tokio::time::timeout(
            self.config.stage_timeout,
            self.collaborators.resolver.resolve(
                &gap_text,
                &state.refined_task,
                &state.feedback_history,
            ),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CollabError::Timeout(self.config.stage_timeout.as_secs())),
        };

        let resolver_artifact = match result {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(error = %e, "Resolver failed — appending fallback artifact");
                Artifact::fallback("gap_resolver", &e.to_string())
            }
        };
        let resolver_name = resolver_artifact.name.clone();
        state.push_artifact(resolver_artifact);
        info!(step = %resolver_name, "Resolver artifact appended");

        // Intra-round validation: test the resolver solution right away
        // against the updated artifact chain.
        let revalidation = round::run_voting_round(
            &self.collaborators.reviewers,
            &state.artifacts,
            &state.refined_task,
            self.config.review_timeout,
            self.config.consensus_threshold,
        )
        .await;

        if revalidation.tally.consensus {
            info!("Resolver solution passed immediate validation");
            state.consensus_reached = true;
            state.feedback_summary = format!("Resolver solution validated: {resolver_name}");
        } else {
            let rationale = revalidation
                .votes
                .iter()
                .map(|v| v.rationale.as_str())
                .collect::<Vec<_>>()
                .join(" | ");
            warn!("Resolver solution needs refinement");
            state.feedback_summary = format!(
                "Resolver applied but needs refinement: {}",
                truncate(&rationale, REVALIDATION_FEEDBACK_CHARS)
            );
        }
    }
}
