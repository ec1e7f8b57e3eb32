//! Errors surfaced by the query-field resolution engine.

use crate::backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Summary Default {0} not supported")]
    UnsupportedSummaryKind(String),

    #[error("Logical Operator {0:?} not found in lookup")]
    UnknownLogicalOperator(String),

    /// The owning entity must carry a string `type` and an integer `id`.
    #[error("entity is missing a usable `{0}` key")]
    InvalidParentEntity(&'static str),

    #[error("summarize response has no value for field `{field}`")]
    MissingSummary { field: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}
