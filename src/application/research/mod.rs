//! Iterative deep-research orchestration.
//!
//! Drives a bounded multi-round loop of grounded model calls: each round's
//! prompt builds on the accumulated findings of the rounds before it, a
//! token budget derived from the model's context window caps the loop, and
//! per-round failures degrade gracefully rather than aborting a run that
//! has already produced results. Rounds are strictly sequential - round N's
//! prompt depends on rounds 0..N.

mod budget;
mod context;
mod report;
mod sources;

pub use budget::ResearchBudget;
pub use sources::extract_sources;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{ChatRequest, ResearchStep, UsageMetadata};
use crate::infrastructure::catalog::ModelCatalog;
use crate::infrastructure::model::{ModelBackend, ModelError};
use context::{recency_context, synthesis_context};
use report::ReportBuilder;

/// Iteration bounds; out-of-range requests are clamped, not rejected.
pub const MIN_ITERATIONS: u32 = 3;
pub const MAX_ITERATIONS: u32 = 10;
pub const DEFAULT_ITERATIONS: u32 = 5;

const RESEARCH_TEMPERATURE: f32 = 0.5;
const RESEARCH_MAX_TOKENS: u32 = 8_192;
const SYNTHESIS_TEMPERATURE: f32 = 0.6;
const SYNTHESIS_MAX_TOKENS: u32 = 16_384;

/// Consecutive failed rounds that abort a run which has produced nothing.
const FAIL_FAST_THRESHOLD: u32 = 2;

/// Research-exhaustion failures. Distinct from a single transient backend
/// error; both carry remediation guidance for the caller.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// The fail-fast guard: consecutive early failures with no successful
    /// step yet, pointing at a systematically broken query or quota.
    #[error(
        "research aborted after {failures} consecutive failed iterations with no successful \
         step; last error: {last_error}. Rephrase the research question, reduce max_iterations, \
         or check API quota and key"
    )]
    ConsecutiveFailures { failures: u32, last_error: String },

    /// Terminal fallback: the loop finished but no iteration ever succeeded.
    #[error(
        "all {attempts} research iterations failed; last error: {last_error}. Rephrase the \
         research question, reduce max_iterations, or check API quota and key"
    )]
    AllIterationsFailed { attempts: u32, last_error: String },
}

/// Inputs for one research run.
#[derive(Debug, Clone, Default)]
pub struct ResearchRequest {
    pub question: String,
    /// Explicit model; the catalog default when absent
    pub model: Option<String>,
    /// Requested iteration count, clamped to [MIN_ITERATIONS, MAX_ITERATIONS]
    pub max_iterations: Option<u32>,
    /// Optional per-iteration focus directives
    pub focus_areas: Vec<String>,
}

impl ResearchRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

/// The deep-research orchestrator.
pub struct DeepResearch {
    backend: Arc<dyn ModelBackend>,
    catalog: Arc<ModelCatalog>,
}

impl DeepResearch {
    pub fn new(backend: Arc<dyn ModelBackend>, catalog: Arc<ModelCatalog>) -> Self {
        Self { backend, catalog }
    }

    /// Run the full research loop and return the assembled report.
    ///
    /// Fails only when no iteration ever succeeds; a failed synthesis or a
    /// transient mid-run failure degrades to a note in the report.
    pub async fn run(&self, request: ResearchRequest) -> Result<String, ResearchError> {
        self.catalog.ensure_initialized().await;

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.catalog.default_model());
        let context_window = self.catalog.context_window(&model);
        let mut budget = ResearchBudget::for_context_window(context_window);
        let iterations = request
            .max_iterations
            .unwrap_or(DEFAULT_ITERATIONS)
            .clamp(MIN_ITERATIONS, MAX_ITERATIONS);

        info!(
            model = model.as_str(),
            iterations,
            context_window,
            research_budget = budget.research_budget(),
            "Starting deep research"
        );

        let mut report = ReportBuilder::new(&request.question, &request.focus_areas);
        let mut steps: Vec<ResearchStep> = Vec::new();
        let mut consecutive_failures = 0u32;
        let mut last_error = String::new();

        for iteration in 0..iterations as usize {
            if budget.exhausted() {
                info!(
                    iteration,
                    cumulative = budget.cumulative_tokens(),
                    "Research budget exhausted, stopping early"
                );
                report.push_budget_exhausted(iteration);
                break;
            }

            let prompt = build_iteration_prompt(&request, iteration, &steps, &budget);
            let chat = ChatRequest::new(prompt.clone())
                .with_model(model.clone())
                .with_temperature(RESEARCH_TEMPERATURE)
                .with_max_output_tokens(RESEARCH_MAX_TOKENS)
                .with_grounding(true);

            match self.backend.chat(chat).await {
                Ok(response) => {
                    consecutive_failures = 0;

                    let grounding_fired = response
                        .grounding
                        .as_ref()
                        .map(|metadata| metadata.fired())
                        .unwrap_or(false);
                    if !grounding_fired {
                        warn!(
                            iteration,
                            "Grounding was requested but no search queries or supports came back"
                        );
                    }

                    if let Some(usage) = response.usage {
                        budget.record(usage.total_tokens);
                    }

                    let sources = extract_sources(&response.content);
                    info!(
                        iteration,
                        sources = sources.len(),
                        tokens = budget.cumulative_tokens(),
                        "Research iteration complete"
                    );

                    report.push_iteration(iteration, &response.content);
                    steps.push(ResearchStep {
                        prompt,
                        response_text: response.content,
                        sources,
                        usage: response.usage,
                    });
                }
                Err(error) => {
                    consecutive_failures += 1;
                    last_error = error.to_string();
                    warn!(iteration, error = %error, "Research iteration failed");

                    // With no prior findings the next round would resend the
                    // same prompt, so a safety block cannot be retried around.
                    if error.is_safety_block() && steps.is_empty() {
                        return Err(ResearchError::ConsecutiveFailures {
                            failures: consecutive_failures,
                            last_error,
                        });
                    }

                    if consecutive_failures >= FAIL_FAST_THRESHOLD && steps.is_empty() {
                        return Err(ResearchError::ConsecutiveFailures {
                            failures: consecutive_failures,
                            last_error,
                        });
                    }

                    report.push_iteration_failure(iteration, &last_error);
                }
            }
        }

        if steps.is_empty() {
            return Err(ResearchError::AllIterationsFailed {
                attempts: iterations,
                last_error,
            });
        }

        if steps.len() >= 2 {
            match self
                .synthesize(&request.question, &model, &steps, &budget)
                .await
            {
                Ok((synthesis, usage)) => {
                    if let Some(usage) = usage {
                        budget.record(usage.total_tokens);
                    }
                    report.push_synthesis(&synthesis);
                }
                Err(error) => {
                    warn!(error = %error, "Synthesis failed, keeping per-iteration findings");
                    report.push_synthesis_failure(&error.to_string());
                }
            }
        }

        report.push_sources(&aggregate_sources(&steps));
        report.push_statistics(
            steps.len(),
            &model,
            budget.cumulative_tokens(),
            budget.context_window(),
            budget.utilization_percent(),
        );
        Ok(report.finish())
    }

    async fn synthesize(
        &self,
        question: &str,
        model: &str,
        steps: &[ResearchStep],
        budget: &ResearchBudget,
    ) -> Result<(String, Option<UsageMetadata>), ModelError> {
        let findings = synthesis_context(steps, budget.synthesis_allowance());
        let prompt = format!(
            "Based on the research findings below, produce a structured synthesis answering: \
             {question}\n\n{findings}\n\nStructure the synthesis as:\n\
             1. Direct answer to the research question\n\
             2. Integration of the findings\n\
             3. Key insights\n\
             4. Contradictions or gaps\n\
             5. Actionable conclusions"
        );

        let chat = ChatRequest::new(prompt)
            .with_model(model)
            .with_temperature(SYNTHESIS_TEMPERATURE)
            .with_max_output_tokens(SYNTHESIS_MAX_TOKENS)
            .with_grounding(false);

        let response = self.backend.chat(chat).await?;
        Ok((response.content, response.usage))
    }
}

/// Assemble the prompt for one research round: the base question, an
/// optional focus directive, and (from the second round on) a digest of
/// prior findings.
fn build_iteration_prompt(
    request: &ResearchRequest,
    iteration: usize,
    steps: &[ResearchStep],
    budget: &ResearchBudget,
) -> String {
    let mut prompt = match request.focus_areas.get(iteration) {
        Some(area) => format!(
            "{}\n\nFor this iteration, focus specifically on: {area}",
            request.question
        ),
        None => request.question.clone(),
    };

    if iteration >= 1 && !steps.is_empty() {
        let context = recency_context(steps, budget.remaining_research_tokens());
        if !context.is_empty() {
            prompt.push_str("\n\nContext from previous research:\n\n");
            prompt.push_str(&context);
            prompt.push_str("\n\nBuild on these findings and investigate angles not yet covered.");
        }
    }

    prompt
}

/// Union of every step's sources, first appearance order preserved.
fn aggregate_sources(steps: &[ResearchStep]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for step in steps {
        for source in &step.sources {
            if !sources.contains(source) {
                sources.push(source.clone());
            }
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(response: &str, sources: &[&str]) -> ResearchStep {
        ResearchStep {
            prompt: "p".to_string(),
            response_text: response.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            usage: None,
        }
    }

    #[test]
    fn aggregate_sources_dedups_across_steps() {
        let steps = vec![
            step("a", &["https://one.example/x", "https://two.example/y"]),
            step("b", &["https://two.example/y", "https://three.example/z"]),
        ];
        assert_eq!(
            aggregate_sources(&steps),
            vec![
                "https://one.example/x".to_string(),
                "https://two.example/y".to_string(),
                "https://three.example/z".to_string(),
            ]
        );
    }

    #[test]
    fn first_iteration_prompt_has_no_context() {
        let request = ResearchRequest::new("what is zig");
        let budget = ResearchBudget::for_context_window(100_000);
        let prompt = build_iteration_prompt(&request, 0, &[], &budget);
        assert_eq!(prompt, "what is zig");
    }

    #[test]
    fn focus_area_is_appended_for_matching_iteration() {
        let mut request = ResearchRequest::new("what is zig");
        request.focus_areas = vec!["tooling".to_string(), "safety".to_string()];
        let budget = ResearchBudget::for_context_window(100_000);

        let first = build_iteration_prompt(&request, 0, &[], &budget);
        assert!(first.contains("focus specifically on: tooling"));

        // Iteration past the focus list falls back to the bare question.
        let third = build_iteration_prompt(&request, 2, &[], &budget);
        assert!(!third.contains("focus specifically on"));
    }

    #[test]
    fn later_iterations_carry_prior_findings() {
        let request = ResearchRequest::new("what is zig");
        let budget = ResearchBudget::for_context_window(100_000);
        let steps = vec![step("zig is a systems language", &[])];

        let prompt = build_iteration_prompt(&request, 1, &steps, &budget);
        assert!(prompt.contains("Context from previous research"));
        assert!(prompt.contains("zig is a systems language"));
    }
}
