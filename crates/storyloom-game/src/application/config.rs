//! Engine settings shared by the game handlers and the finalization pipeline.

use std::time::Duration;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Default length, in characters, of the story summary sent to the
/// illustration service.
pub const DEFAULT_SUMMARY_CHAR_BUDGET: usize = 200;

/// Tunables for the game handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lifetime of a session record, fixed at creation.
    pub session_ttl: Duration,
    /// Maximum characters of the prior-story summary.
    pub summary_char_budget: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            summary_char_budget: DEFAULT_SUMMARY_CHAR_BUDGET,
        }
    }
}

/// Joins prompts with `". "` and truncates the result to `budget` characters.
#[must_use]
pub fn summarize_prompts<'a, I>(prompts: I, budget: usize) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = prompts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(". ");
    joined.chars().take(budget).collect()
}
