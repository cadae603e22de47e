//! Bounded text summaries of prior research steps.
//!
//! Two independent strategies, both budgeted in characters with a fixed
//! 4-characters-per-token estimate:
//!
//! - [`recency_context`] feeds the *next* research prompt: newest findings
//!   first, whole steps only, hard stop once the budget would be exceeded.
//! - [`synthesis_context`] feeds the final synthesis: every step represented,
//!   the budget apportioned evenly across them.

use crate::domain::ResearchStep;

/// Rough character-per-token estimate used for all truncation budgets.
const CHARS_PER_TOKEN: usize = 4;

/// At most this much of each step's response goes into the recency digest.
const STEP_EXCERPT_CHARS: usize = 1000;

/// Fraction of the remaining token budget the recency digest may occupy.
const RECENCY_BUDGET_FACTOR: f64 = 0.8;

/// Recency-biased digest of prior findings for the next research prompt.
///
/// Steps are considered newest to oldest; the first step that would push the
/// digest past the character budget stops the walk, and everything older is
/// omitted entirely - never partially included. The picked steps are
/// rendered oldest first so the prompt reads chronologically.
pub(crate) fn recency_context(steps: &[ResearchStep], remaining_tokens: u32) -> String {
    let budget_chars = (remaining_tokens as f64 * RECENCY_BUDGET_FACTOR) as usize * CHARS_PER_TOKEN;

    let mut picked: Vec<String> = Vec::new();
    let mut used = 0usize;
    for (index, step) in steps.iter().enumerate().rev() {
        let block = format!(
            "Previous finding {}: {}",
            index + 1,
            excerpt(&step.response_text, STEP_EXCERPT_CHARS)
        );
        let block_chars = block.chars().count();
        if used + block_chars > budget_chars {
            break;
        }
        used += block_chars;
        picked.push(block);
    }

    picked.reverse();
    picked.join("\n\n")
}

/// Evenly apportioned digest of all steps for the synthesis prompt.
///
/// Every step appears exactly once, truncated to its share of the budget;
/// a tight budget shortens each entry but never drops one outright.
pub(crate) fn synthesis_context(steps: &[ResearchStep], budget_tokens: u32) -> String {
    if steps.is_empty() {
        return String::new();
    }

    let per_step_chars = budget_tokens as usize * CHARS_PER_TOKEN / steps.len();
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            format!(
                "Finding {}:\n{}",
                index + 1,
                excerpt(&step.response_text, per_step_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// First `limit` characters of `text`, ellipsis-marked when truncated.
fn excerpt(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(response: &str) -> ResearchStep {
        ResearchStep {
            prompt: "prompt".to_string(),
            response_text: response.to_string(),
            sources: Vec::new(),
            usage: None,
        }
    }

    #[test]
    fn excerpt_marks_truncation() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
    }

    #[test]
    fn recency_context_is_empty_without_steps() {
        assert_eq!(recency_context(&[], 10_000), "");
    }

    #[test]
    fn recency_context_keeps_chronological_order() {
        let steps = vec![step("first finding"), step("second finding")];
        let context = recency_context(&steps, 10_000);
        let first = context.find("Previous finding 1").expect("finding 1");
        let second = context.find("Previous finding 2").expect("finding 2");
        assert!(first < second);
    }

    #[test]
    fn recency_context_drops_oldest_first() {
        // Budget: 100 tokens * 0.8 * 4 = 320 chars. Each block is roughly
        // 220 chars, so exactly one (the newest) fits.
        let steps = vec![step(&"a".repeat(200)), step(&"b".repeat(200))];
        let context = recency_context(&steps, 100);
        assert!(context.contains("Previous finding 2"));
        assert!(!context.contains("Previous finding 1"));
    }

    #[test]
    fn recency_context_never_splits_a_step() {
        // Nothing fits: the digest stays empty rather than including part of
        // a step.
        let steps = vec![step(&"a".repeat(500))];
        assert_eq!(recency_context(&steps, 10), "");
    }

    #[test]
    fn recency_context_caps_each_step_excerpt() {
        let steps = vec![step(&"x".repeat(5_000))];
        let context = recency_context(&steps, 100_000);
        assert!(context.contains("..."));
        // 1000-char excerpt plus prefix and ellipsis.
        assert!(context.chars().count() < 1_100);
    }

    #[test]
    fn recency_context_is_deterministic() {
        let steps = vec![step("alpha"), step("beta"), step("gamma")];
        assert_eq!(recency_context(&steps, 500), recency_context(&steps, 500));
    }

    #[test]
    fn synthesis_context_includes_every_step() {
        let steps = vec![
            step(&"a".repeat(4_000)),
            step(&"b".repeat(4_000)),
            step(&"c".repeat(4_000)),
        ];
        // 300 tokens * 4 / 3 steps = 400 chars each.
        let context = synthesis_context(&steps, 300);
        for n in 1..=3 {
            assert!(context.contains(&format!("Finding {n}:")), "finding {n}");
        }
        let longest_run = context.split("Finding").count();
        assert_eq!(longest_run, 4); // prefix split: 3 findings + leading chunk
    }

    #[test]
    fn synthesis_context_apportions_evenly() {
        let steps = vec![step(&"a".repeat(1_000)), step(&"b".repeat(1_000))];
        let context = synthesis_context(&steps, 100);
        // 100 * 4 / 2 = 200 chars per step.
        let a_chars = context.chars().filter(|&c| c == 'a').count();
        let b_chars = context.chars().filter(|&c| c == 'b').count();
        assert_eq!(a_chars, 200);
        assert_eq!(b_chars, 200);
    }

    #[test]
    fn synthesis_context_handles_zero_budget() {
        let steps = vec![step("finding text")];
        let context = synthesis_context(&steps, 0);
        assert!(context.contains("Finding 1:"));
    }

    #[test]
    fn synthesis_context_is_empty_without_steps() {
        assert_eq!(synthesis_context(&[], 1_000), "");
    }
}
