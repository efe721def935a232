//! Stage and worker enums for the request lifecycle.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `Stage` provides `allowed_next_states()` so every stage write can be checked
//! against the lifecycle graph before it reaches the store.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Stage of a request through the pipeline.
///
/// ```text
/// pending → searching → search_in_progress → analyzing → analysis_in_progress → completed
///    ↘          ↘               ↘                 ↘                ↘
///                                 failed
/// ```
///
/// `pending` is the only initial stage. `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Searching,
    SearchInProgress,
    Analyzing,
    AnalysisInProgress,
    Completed,
    Failed,
}

impl Stage {
    /// Every stage, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Searching,
        Self::SearchInProgress,
        Self::Analyzing,
        Self::AnalysisInProgress,
        Self::Completed,
        Self::Failed,
    ];

    /// Valid next stages from the current stage.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Searching, Self::Failed],
            Self::Searching => &[Self::SearchInProgress, Self::Failed],
            Self::SearchInProgress => &[Self::Analyzing, Self::Failed],
            Self::Analyzing => &[Self::AnalysisInProgress, Self::Failed],
            Self::AnalysisInProgress => &[Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Terminal stages have no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// In-progress stages mean a worker currently owns the request.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::SearchInProgress | Self::AnalysisInProgress)
    }

    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Searching => "searching",
            Self::SearchInProgress => "search_in_progress",
            Self::Analyzing => "analyzing",
            Self::AnalysisInProgress => "analysis_in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown stage '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// WorkerKind
// ---------------------------------------------------------------------------

/// The two worker pools and the stages each one reads and writes.
///
/// | Worker   | Claims      | Sets on claim          | Sets on success |
/// |----------|-------------|------------------------|-----------------|
/// | search   | `searching` | `search_in_progress`   | `analyzing`     |
/// | analysis | `analyzing` | `analysis_in_progress` | `completed`     |
///
/// Both set `failed` on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Search,
    Analysis,
}

impl WorkerKind {
    /// Stage a request must be in for this worker to claim it.
    #[must_use]
    pub const fn claims(self) -> Stage {
        match self {
            Self::Search => Stage::Searching,
            Self::Analysis => Stage::Analyzing,
        }
    }

    /// Stage written when the claim succeeds.
    #[must_use]
    pub const fn in_progress(self) -> Stage {
        match self {
            Self::Search => Stage::SearchInProgress,
            Self::Analysis => Stage::AnalysisInProgress,
        }
    }

    /// Stage written when the stage work succeeds.
    #[must_use]
    pub const fn on_success(self) -> Stage {
        match self {
            Self::Search => Stage::Analyzing,
            Self::Analysis => Stage::Completed,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
