use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};

use crate::text::ReferenceText;

static SAMPLES_DIR: Dir = include_dir!("src/samples");

/// Identifier of a practice problem. Opaque to the engine; sessions and
/// attempt records carry it through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProblemId(String);

impl ProblemId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProblemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of reference solutions. A problem's solution is assumed immutable
/// for the lifetime of any session typed against it.
pub trait ProblemStore {
    /// Normalized solution text for `id`, or `None` when the problem does
    /// not exist.
    fn solution(&self, id: &ProblemId) -> Option<ReferenceText>;

    /// All known problem ids, in stable order.
    fn ids(&self) -> Vec<ProblemId>;
}

/// Problems compiled into the binary from `src/samples/`, one `.txt` file
/// per problem, named by id.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedProblems;

impl ProblemStore for EmbeddedProblems {
    fn solution(&self, id: &ProblemId) -> Option<ReferenceText> {
        let file = SAMPLES_DIR.get_file(format!("{}.txt", id.as_str()))?;
        let raw = file.contents_utf8()?;
        Some(ReferenceText::normalize(raw))
    }

    fn ids(&self) -> Vec<ProblemId> {
        let mut ids: Vec<ProblemId> = SAMPLES_DIR
            .files()
            .filter_map(|f| f.path().file_stem())
            .filter_map(|stem| stem.to_str())
            .map(ProblemId::new)
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}
