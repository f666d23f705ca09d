//! Structured error taxonomy for the generation pipeline.
//!
//! Every stage wraps its failures in [`GenError`] before returning them to
//! the orchestrator; [`GenError`] is never stringly typed so callers can
//! match on the kind of failure the way the rest of the workspace matches on
//! `anyhow` downcasts only at the program boundary.

use thiserror::Error;

/// One of the five pipeline stages, used to label a propagated error.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Stage {
    Synthesis,
    Embedding,
    Carving,
    Content,
    Validation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Synthesis => "synthesis",
            Stage::Embedding => "embedding",
            Stage::Carving => "carving",
            Stage::Content => "content",
            Stage::Validation => "validation",
        };
        write!(f, "{s}")
    }
}

/// A single configuration schema or bounds violation.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ConfigIssue {
    pub field: String,
    pub reason: String,
}

impl ConfigIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigIssue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// The sole error type returned by [`crate::generate`] and its stages.
#[derive(Error, Clone, Debug)]
pub enum GenError {
    /// A config field violated its documented bounds or schema. Surfaced
    /// before any RNG work is performed.
    #[error("invalid config: {0:?}")]
    InvalidConfig(Vec<ConfigIssue>),

    /// The configuration is internally consistent but cannot be satisfied,
    /// e.g. more keys were requested than there are candidate rooms.
    #[error("infeasible config: {0}")]
    InfeasibleConfig(String),

    /// Synthesis exhausted its retry budget without satisfying the hard
    /// constraints.
    #[error("retry budget exhausted in {0} stage")]
    RetryExhausted(Stage),

    /// The embedder could not route a corridor within the length/bend
    /// budget.
    #[error("no valid path for connector {0}")]
    NoValidPath(String),

    /// The validator reported `passed = false`.
    #[error("constraints unsatisfied: {} error(s)", .0.len())]
    ConstraintsUnsatisfied(Vec<String>),

    /// Cancellation was observed between stages.
    #[error("cancelled")]
    Cancelled,

    /// A precondition was violated by an upstream component; this indicates
    /// a bug rather than bad input data.
    #[error("internal error in {where_}: {cause}")]
    Internal { where_: &'static str, cause: String },
}

impl GenError {
    /// Wrap this error with the stage it originated in, for errors that
    /// carry no inherent stage (only used for presentation; the variant
    /// itself is unchanged).
    pub fn in_stage(self, stage: Stage) -> Self {
        log::error!("{stage} stage failed: {self}");
        self
    }

    pub fn internal(where_: &'static str, cause: impl std::fmt::Display) -> Self {
        GenError::Internal {
            where_,
            cause: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
