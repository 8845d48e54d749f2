use serde::{Deserialize, Serialize};

use crate::session::DurationBudget;

/// Final score of one timed attempt.
///
/// Produced exactly once, when a session leaves `Running`, and immutable
/// afterwards. The field types carry the range guarantees: words-per-minute
/// and elapsed seconds are unsigned, accuracy is a percentage that the
/// scoring math keeps in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub wpm: u32,
    pub accuracy: u8,
    pub time_spent_secs: u32,
    /// Whether the whole reference text was reproduced before the clock
    /// expired.
    pub completed: bool,
}

impl AttemptResult {
    /// Score a finished session from its final counters.
    ///
    /// `time_spent_secs` is always the configured budget, even when the
    /// typist finishes the text early: the drill is defined as a
    /// fixed-duration test and the rate formula divides by that duration.
    /// One word is the conventional five correct characters.
    pub fn score(correct: u32, errors: u32, budget: DurationBudget, completed: bool) -> Self {
        let time_spent_secs = budget.secs();
        let words_typed = f64::from(correct) / 5.0;
        let wpm = ((words_typed / f64::from(time_spent_secs)) * 60.0).floor() as u32;
        let total = correct + errors;
        let accuracy = if total > 0 {
            ((f64::from(correct) / f64::from(total)) * 100.0).floor() as u8
        } else {
            100
        };
        Self {
            wpm,
            accuracy,
            time_spent_secs,
            completed,
        }
    }
}
