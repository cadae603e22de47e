//! Incremental assembly of the final research report.
//!
//! The report is an ordered text document: header, optional focus areas,
//! one section per iteration (finding or failure note), optional synthesis,
//! deduplicated source list, trailing statistics. Built in one pass, never
//! persisted.

use std::fmt::Write;

#[derive(Debug)]
pub(crate) struct ReportBuilder {
    body: String,
}

impl ReportBuilder {
    pub(crate) fn new(question: &str, focus_areas: &[String]) -> Self {
        let mut body = format!("# Deep Research Report\n\n**Research question:** {question}\n");
        if !focus_areas.is_empty() {
            body.push_str("\n**Focus areas:**\n");
            for (index, area) in focus_areas.iter().enumerate() {
                let _ = writeln!(body, "{}. {area}", index + 1);
            }
        }
        Self { body }
    }

    pub(crate) fn push_iteration(&mut self, iteration: usize, content: &str) {
        let _ = write!(self.body, "\n## Iteration {}\n\n{content}\n", iteration + 1);
    }

    pub(crate) fn push_iteration_failure(&mut self, iteration: usize, error: &str) {
        let _ = write!(
            self.body,
            "\n## Iteration {}\n\n_This iteration failed: {error}. Continuing with the next iteration._\n",
            iteration + 1
        );
    }

    pub(crate) fn push_budget_exhausted(&mut self, iteration: usize) {
        let _ = write!(
            self.body,
            "\n_Research token budget exhausted before iteration {}; stopping early._\n",
            iteration + 1
        );
    }

    pub(crate) fn push_synthesis(&mut self, content: &str) {
        let _ = write!(self.body, "\n## Synthesis\n\n{content}\n");
    }

    pub(crate) fn push_synthesis_failure(&mut self, error: &str) {
        let _ = write!(
            self.body,
            "\n## Synthesis\n\n_Synthesis failed: {error}. Refer to the per-iteration findings above._\n"
        );
    }

    pub(crate) fn push_sources(&mut self, sources: &[String]) {
        self.body.push_str("\n## Sources\n\n");
        if sources.is_empty() {
            self.body.push_str(
                "_No sources were extracted; search grounding may not have functioned for this run._\n",
            );
            return;
        }
        for (index, source) in sources.iter().enumerate() {
            let _ = writeln!(self.body, "{}. {source}", index + 1);
        }
    }

    pub(crate) fn push_statistics(
        &mut self,
        iterations: usize,
        model: &str,
        total_tokens: u64,
        context_window: u32,
        utilization_percent: f64,
    ) {
        let _ = write!(
            self.body,
            "\n---\n\nResearch complete: {iterations} iteration(s) using {model}.\n\
             Tokens consumed: {total_tokens} of a {context_window}-token context window \
             ({utilization_percent:.1}% utilization).\n"
        );
    }

    pub(crate) fn finish(self) -> String {
        self.body
    }
}
