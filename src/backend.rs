//! The query port the resolver talks to.

use crate::ast::Record;
use crate::filter::{BackendFilter, SummarySpec};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unknown entity type `{0}`")]
    UnknownEntityType(String),

    #[error("relation `{0}` is not supported")]
    UnsupportedRelation(String),

    #[error("summary type `{0}` is not supported")]
    UnsupportedSummaryType(String),

    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fixture {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Anything an external backend reports that has no dedicated variant.
    #[error("backend request failed: {0}")]
    Request(String),
}

/// Minimum surface of the production-tracking backend.
///
/// `filters` is always the top-level filter list; its entries are combined with AND.
pub trait BackendPort {
    fn find_entities(
        &self,
        entity_type: &str,
        filters: &[BackendFilter],
        fields: &[String],
    ) -> Result<Vec<Record>, BackendError>;

    /// Returns the summaries keyed by field name.
    fn summarize(
        &self,
        entity_type: &str,
        filters: &[BackendFilter],
        summary_fields: &[SummarySpec],
    ) -> Result<Map<String, Value>, BackendError>;

    /// Returns raw field descriptors keyed by field name.
    fn read_schema(&self, entity_type: &str) -> Result<Map<String, Value>, BackendError>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::RefCell;

    /// A call captured by [`RecordingBackend`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Find {
            entity_type: String,
            filters: Vec<BackendFilter>,
            fields: Vec<String>,
        },
        Summarize {
            entity_type: String,
            filters: Vec<BackendFilter>,
            summary_fields: Vec<SummarySpec>,
        },
        ReadSchema {
            entity_type: String,
        },
    }

    /// Returns canned responses and records every call it receives.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub find_results: RefCell<Vec<Vec<Record>>>,
        pub summaries: Map<String, Value>,
        pub schema: Map<String, Value>,
        pub fail_with: Option<String>,
        pub calls: RefCell<Vec<Call>>,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a result for the next `find_entities` call.
        pub fn push_find_result(&self, records: Vec<Value>) {
            let records = records
                .into_iter()
                .map(|value| match value {
                    Value::Object(map) => map,
                    other => panic!("record must be an object, got {}", other),
                })
                .collect();
            self.find_results.borrow_mut().push(records);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn check_failure(&self) -> Result<(), BackendError> {
            match &self.fail_with {
                Some(message) => Err(BackendError::Request(message.clone())),
                None => Ok(()),
            }
        }
    }

    impl BackendPort for RecordingBackend {
        fn find_entities(
            &self,
            entity_type: &str,
            filters: &[BackendFilter],
            fields: &[String],
        ) -> Result<Vec<Record>, BackendError> {
            self.calls.borrow_mut().push(Call::Find {
                entity_type: entity_type.to_string(),
                filters: filters.to_vec(),
                fields: fields.to_vec(),
            });
            self.check_failure()?;

            let mut queued = self.find_results.borrow_mut();
            if queued.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(queued.remove(0))
            }
        }

        fn summarize(
            &self,
            entity_type: &str,
            filters: &[BackendFilter],
            summary_fields: &[SummarySpec],
        ) -> Result<Map<String, Value>, BackendError> {
            self.calls.borrow_mut().push(Call::Summarize {
                entity_type: entity_type.to_string(),
                filters: filters.to_vec(),
                summary_fields: summary_fields.to_vec(),
            });
            self.check_failure()?;
            Ok(self.summaries.clone())
        }

        fn read_schema(&self, entity_type: &str) -> Result<Map<String, Value>, BackendError> {
            self.calls.borrow_mut().push(Call::ReadSchema {
                entity_type: entity_type.to_string(),
            });
            self.check_failure()?;
            Ok(self.schema.clone())
        }
    }
}
