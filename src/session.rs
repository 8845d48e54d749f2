use crate::result::AttemptResult;
use crate::text::ReferenceText;

/// Admissible clock budgets. The drill offers exactly these two lengths;
/// arbitrary durations are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DurationBudget {
    #[strum(to_string = "60s")]
    Sixty,
    #[strum(to_string = "120s")]
    OneTwenty,
}

impl DurationBudget {
    pub fn secs(self) -> u32 {
        match self {
            DurationBudget::Sixty => 60,
            DurationBudget::OneTwenty => 120,
        }
    }

    pub fn from_secs(secs: u32) -> Option<Self> {
        match secs {
            60 => Some(DurationBudget::Sixty),
            120 => Some(DurationBudget::OneTwenty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// One entry of the typed log: the character produced and how it compared
/// against the reference at the position it was typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keystroke {
    pub ch: char,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    Running,
    Finished,
}

/// State of one timed attempt against a reference solution.
///
/// The session is a pure reducer: it only changes state through
/// [`start`](Self::start), [`type_char`](Self::type_char),
/// [`backspace`](Self::backspace), [`tick`](Self::tick) and
/// [`reset`](Self::reset), and each of those is a no-op outside the phase
/// it applies to. Feeding the same event sequence to a fresh session
/// reproduces the same final state, which is what the replay tests lean on.
///
/// Every typed character is appended and scored against the reference at
/// the cursor, mistakes included, so the cursor always equals the number
/// of live keystrokes and `correct + errors == cursor` holds after every
/// event. Backspace retracts the most recent keystroke and its counter,
/// which lets the typist erase a mistake before the final score is taken.
#[derive(Debug, Clone)]
pub struct TypingSession {
    reference: ReferenceText,
    typed: Vec<Keystroke>,
    cursor: usize,
    correct: u32,
    errors: u32,
    budget: Option<DurationBudget>,
    remaining_secs: u32,
    phase: Phase,
    result: Option<AttemptResult>,
}

impl TypingSession {
    /// New session over `reference`, waiting in `NotStarted` for a budget
    /// choice.
    pub fn new(reference: ReferenceText) -> Self {
        Self {
            reference,
            typed: Vec::new(),
            cursor: 0,
            correct: 0,
            errors: 0,
            budget: None,
            remaining_secs: 0,
            phase: Phase::NotStarted,
            result: None,
        }
    }

    /// Begin the countdown. Choosing the budget is the start trigger;
    /// ignored unless the session is in `NotStarted`.
    ///
    /// An empty reference text has nothing left to type, so the session
    /// finishes (completed) on the spot.
    pub fn start(&mut self, budget: DurationBudget) {
        if self.phase != Phase::NotStarted {
            return;
        }
        self.budget = Some(budget);
        self.remaining_secs = budget.secs();
        self.phase = Phase::Running;
        if self.reference.is_empty() {
            self.finish(true);
        }
    }

    /// Apply one typed character (`'\n'` for the Enter key). Ignored
    /// outside `Running`.
    pub fn type_char(&mut self, ch: char) {
        if self.phase != Phase::Running {
            return;
        }
        let Some(expected) = self.reference.char_at(self.cursor) else {
            return;
        };
        let outcome = if ch == expected {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        self.typed.push(Keystroke { ch, outcome });
        self.cursor += 1;
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Incorrect => self.errors += 1,
        }
        if self.cursor == self.reference.len() {
            self.finish(true);
        }
    }

    /// Retract the most recent keystroke and the counter it incremented.
    /// Ignored outside `Running` and at the start of the text.
    pub fn backspace(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        let Some(keystroke) = self.typed.pop() else {
            return;
        };
        self.cursor -= 1;
        match keystroke.outcome {
            Outcome::Correct => self.correct -= 1,
            Outcome::Incorrect => self.errors -= 1,
        }
    }

    /// One second of clock time. Ignored outside `Running`; finishes the
    /// session (incomplete) when the budget runs out.
    pub fn tick(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.finish(false);
        }
    }

    /// Back to `NotStarted` over the same reference text, dropping all
    /// progress and any result.
    pub fn reset(&mut self) {
        self.typed.clear();
        self.cursor = 0;
        self.correct = 0;
        self.errors = 0;
        self.budget = None;
        self.remaining_secs = 0;
        self.phase = Phase::NotStarted;
        self.result = None;
    }

    fn finish(&mut self, completed: bool) {
        if let Some(budget) = self.budget {
            self.result = Some(AttemptResult::score(
                self.correct,
                self.errors,
                budget,
                completed,
            ));
        }
        self.phase = Phase::Finished;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    pub fn error_count(&self) -> u32 {
        self.errors
    }

    /// Seconds left on the clock; zero outside `Running`.
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn budget(&self) -> Option<DurationBudget> {
        self.budget
    }

    pub fn reference(&self) -> &ReferenceText {
        &self.reference
    }

    pub fn typed(&self) -> &[Keystroke] {
        &self.typed
    }

    /// The score, present exactly when the session is `Finished`.
    pub fn result(&self) -> Option<AttemptResult> {
        self.result
    }
}
