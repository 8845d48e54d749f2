use std::fmt;

use itertools::Itertools;

/// Normalized solution text a session is typed against.
///
/// Built once per problem selection and never mutated. Normalization strips
/// each line's leading whitespace, so the indentation style of the stored
/// solution does not penalize the typist; lines are rejoined with plain
/// newlines, which the typist reproduces with the Enter key.
///
/// Characters are kept pre-split so the session cursor indexes in O(1)
/// without byte-offset bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceText {
    chars: Vec<char>,
}

impl ReferenceText {
    /// Normalize a raw solution string.
    pub fn normalize(raw: &str) -> Self {
        let normalized = raw.split('\n').map(str::trim_start).join("\n");
        Self {
            chars: normalized.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character the typist is expected to produce at `idx`.
    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }
}

impl fmt::Display for ReferenceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
