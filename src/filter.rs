//! Backend-native filter and summary representations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Logical operator in the backend's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    All,
    Any,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOperator::All => write!(f, "all"),
            FilterOperator::Any => write!(f, "any"),
        }
    }
}

/// A single backend filter expression.
///
/// Serializes as `[path, relation, value]` for conditions and as
/// `{"filter_operator": ..., "filters": [...]}` for groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendFilter {
    Condition(String, String, Value),
    Group {
        filter_operator: FilterOperator,
        filters: Vec<BackendFilter>,
    },
}

impl BackendFilter {
    pub fn condition(path: impl Into<String>, relation: impl Into<String>, value: Value) -> Self {
        BackendFilter::Condition(path.into(), relation.into(), value)
    }

    /// Nesting depth: a condition is 0, a group is one more than its deepest child.
    pub fn depth(&self) -> usize {
        match self {
            BackendFilter::Condition(..) => 0,
            BackendFilter::Group { filters, .. } => {
                1 + filters.iter().map(BackendFilter::depth).max().unwrap_or(0)
            }
        }
    }
}

/// One entry of the `summary_fields` parameter of a summarize query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySpec {
    pub field: String,
    #[serde(rename = "type")]
    pub summary_type: String,
}

impl SummarySpec {
    pub fn new(field: impl Into<String>, summary_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            summary_type: summary_type.into(),
        }
    }
}
