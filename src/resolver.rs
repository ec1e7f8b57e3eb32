//! Resolves the value of one query field for one entity.

use crate::ast::{EntityRef, Record};
use crate::backend::BackendPort;
use crate::error::ResolveError;
use crate::filter::{BackendFilter, SummarySpec};
use crate::schema::{FieldSchema, SummaryKind};
use crate::translator::FilterTranslator;
use serde_json::Value;
use tracing::debug;

/// Separator used to join the values of a `single_record` field.
pub const SINGLE_RECORD_SEPARATOR: &str = ", ";

/// Resolves query fields against a backend port.
///
/// Each call to [`resolve`](QueryFieldResolver::resolve) is independent and
/// issues at most one backend query.
pub struct QueryFieldResolver<'a, P: BackendPort + ?Sized> {
    backend: &'a P,
}

impl<'a, P: BackendPort + ?Sized> QueryFieldResolver<'a, P> {
    pub fn new(backend: &'a P) -> Self {
        Self { backend }
    }

    /// Resolve `field` for `entity`, returning the value to store on the record.
    pub fn resolve(&self, entity: &Record, field: &FieldSchema) -> Result<Value, ResolveError> {
        let kind = field.summary_kind()?;
        let parent = parent_entity(entity)?;
        let filters = FilterTranslator::new(&parent).to_query_filters(&field.condition_tree)?;

        debug!(
            field = %field.field_name,
            summary = %kind,
            entity_type = %field.entity_type,
            parent_type = %parent.entity_type,
            parent_id = parent.id,
            "resolving query field"
        );

        match kind {
            SummaryKind::Average
            | SummaryKind::Count
            | SummaryKind::Maximum
            | SummaryKind::Minimum
            | SummaryKind::Sum => self.query_calculation(field, &filters, kind.as_str()),
            SummaryKind::RecordCount => self.query_calculation(field, &filters, SummaryKind::Count.as_str()),
            SummaryKind::SingleRecord => self.query_single_record(field, &filters),
        }
    }

    fn query_calculation(
        &self,
        field: &FieldSchema,
        filters: &[BackendFilter],
        summary_type: &str,
    ) -> Result<Value, ResolveError> {
        let summary_fields = [SummarySpec::new(&field.summary_field, summary_type)];
        let mut summaries = self
            .backend
            .summarize(&field.entity_type, filters, &summary_fields)?;

        summaries
            .remove(&field.summary_field)
            .ok_or_else(|| ResolveError::MissingSummary {
                field: field.summary_field.clone(),
            })
    }

    fn query_single_record(&self, field: &FieldSchema, filters: &[BackendFilter]) -> Result<Value, ResolveError> {
        let fields = [field.summary_field.clone()];
        let records = self.backend.find_entities(&field.entity_type, filters, &fields)?;

        if records.is_empty() {
            return Ok(Value::Null);
        }

        let values: Vec<String> = records
            .iter()
            .filter_map(|record| display_value(record.get(&field.summary_field)?))
            .collect();

        Ok(Value::String(values.join(SINGLE_RECORD_SEPARATOR)))
    }
}

fn parent_entity(entity: &Record) -> Result<EntityRef, ResolveError> {
    if !entity.get("type").is_some_and(Value::is_string) {
        return Err(ResolveError::InvalidParentEntity("type"));
    }
    EntityRef::from_record(entity).ok_or(ResolveError::InvalidParentEntity("id"))
}

/// Text shown for a projected value; references contribute their `name`.
/// Multi-entity fields join the names of their elements.
fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(reference) => reference.get("name").and_then(display_value),
        Value::Array(items) => {
            let names: Vec<String> = items.iter().filter_map(display_value).collect();
            if names.is_empty() {
                None
            } else {
                Some(names.join(SINGLE_RECORD_SEPARATOR))
            }
        }
        other => Some(other.to_string()),
    }
}
