//! Token budget derivation for a research run.
//!
//! The orchestrator cannot observe the model's context window directly; it
//! only learns what each call cost from the usage metadata that comes back.
//! This type turns the catalog's window size into spending limits and keeps
//! the running total.

/// Safety margin against token-estimation error when sizing the synthesis
/// context.
const SYNTHESIS_SAFETY_MARGIN: u64 = 10_000;

/// Budget state for one research run.
///
/// `cumulative_tokens` is monotonically non-decreasing. The exhaustion check
/// happens before a round starts, not after, so the total may overshoot the
/// research budget by at most one round.
#[derive(Debug, Clone, Copy)]
pub struct ResearchBudget {
    context_window: u32,
    research_budget: u32,
    synthesis_reserve: u32,
    cumulative_tokens: u64,
}

impl ResearchBudget {
    /// Derive budgets from a context window: 75% for research rounds, 20%
    /// reserved for synthesis.
    pub fn for_context_window(context_window: u32) -> Self {
        Self {
            context_window,
            research_budget: (context_window as u64 * 3 / 4) as u32,
            synthesis_reserve: context_window / 5,
            cumulative_tokens: 0,
        }
    }

    pub fn context_window(&self) -> u32 {
        self.context_window
    }

    pub fn research_budget(&self) -> u32 {
        self.research_budget
    }

    pub fn synthesis_reserve(&self) -> u32 {
        self.synthesis_reserve
    }

    pub fn cumulative_tokens(&self) -> u64 {
        self.cumulative_tokens
    }

    /// Whether further research rounds may start.
    pub fn exhausted(&self) -> bool {
        self.cumulative_tokens >= self.research_budget as u64
    }

    /// Record the cost of one successful call.
    pub fn record(&mut self, tokens: u32) {
        self.cumulative_tokens += tokens as u64;
    }

    /// Tokens still spendable on research rounds. Zero once exhausted.
    pub fn remaining_research_tokens(&self) -> u32 {
        (self.research_budget as u64).saturating_sub(self.cumulative_tokens) as u32
    }

    /// Token allowance for the synthesis call: the reserve, bounded by what
    /// is actually left in the window minus the safety margin. Never
    /// negative; a run that overshot hard simply gets zero.
    pub fn synthesis_allowance(&self) -> u32 {
        let headroom = (self.context_window as u64)
            .saturating_sub(self.cumulative_tokens)
            .saturating_sub(SYNTHESIS_SAFETY_MARGIN);
        (self.synthesis_reserve as u64).min(headroom) as u32
    }

    /// Share of the context window consumed so far, in percent.
    pub fn utilization_percent(&self) -> f64 {
        if self.context_window == 0 {
            return 0.0;
        }
        self.cumulative_tokens as f64 / self.context_window as f64 * 100.0
    }
}
