//! In-memory implementation of [`BackendPort`] backed by a JSON fixture.
//!
//! Fixture layout:
//!
//! ```text
//! {
//!   "entities": { "Shot": [ {"type": "Shot", "id": 1, ...}, ... ] },
//!   "schemas":  { "Sequence": { "sg_shot_count": { "properties": {...} } } }
//! }
//! ```

use crate::ast::Record;
use crate::backend::{BackendError, BackendPort};
use crate::filter::{BackendFilter, FilterOperator, SummarySpec};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InMemoryBackend {
    #[serde(default)]
    entities: HashMap<String, Vec<Record>>,
    #[serde(default)]
    schemas: HashMap<String, Map<String, Value>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref).map_err(|source| BackendError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| BackendError::Json {
            path: path_ref.display().to_string(),
            source,
        })
    }

    pub fn insert_entity(&mut self, record: Record) {
        let entity_type = record
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.entities.entry(entity_type).or_default().push(record);
    }

    pub fn insert_schema(&mut self, entity_type: &str, field_name: &str, descriptor: Value) {
        self.schemas
            .entry(entity_type.to_string())
            .or_default()
            .insert(field_name.to_string(), descriptor);
    }

    /// A type is known once it has rows or declared fields.
    fn is_known(&self, entity_type: &str) -> bool {
        self.entities.contains_key(entity_type) || self.schemas.contains_key(entity_type)
    }

    /// Rows of `entity_type`; a known type without rows is an empty table.
    fn records(&self, entity_type: &str) -> Result<&[Record], BackendError> {
        match self.entities.get(entity_type) {
            Some(records) => Ok(records.as_slice()),
            None if self.is_known(entity_type) => Ok(&[][..]),
            None => Err(BackendError::UnknownEntityType(entity_type.to_string())),
        }
    }

    fn matching(&self, entity_type: &str, filters: &[BackendFilter]) -> Result<Vec<&Record>, BackendError> {
        let mut matched = Vec::new();
        for record in self.records(entity_type)? {
            if self.matches_all(record, filters)? {
                matched.push(record);
            }
        }
        Ok(matched)
    }

    fn matches_all(&self, record: &Record, filters: &[BackendFilter]) -> Result<bool, BackendError> {
        for filter in filters {
            if !self.matches(record, filter)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches(&self, record: &Record, filter: &BackendFilter) -> Result<bool, BackendError> {
        match filter {
            BackendFilter::Condition(path, relation, expected) => {
                let actual = self.lookup_path(record, path);
                evaluate_relation(relation, actual.as_ref(), expected)
            }
            BackendFilter::Group {
                filter_operator: FilterOperator::All,
                filters,
            } => self.matches_all(record, filters),
            BackendFilter::Group {
                filter_operator: FilterOperator::Any,
                filters,
            } => {
                for nested in filters {
                    if self.matches(record, nested)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Resolve `field` or a deep link `field.Type.subfield[.Type.subfield...]`.
    fn lookup_path(&self, record: &Record, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let mut current = record.get(segments.next()?)?.clone();

        while let Some(linked_type) = segments.next() {
            let linked_field = segments.next()?;
            let reference = current.as_object()?;
            if reference.get("type")?.as_str()? != linked_type {
                return None;
            }
            let id = reference.get("id")?.as_i64()?;
            let linked = self
                .entities
                .get(linked_type)?
                .iter()
                .find(|candidate| candidate.get("id").and_then(Value::as_i64) == Some(id))?;
            current = linked.get(linked_field)?.clone();
        }

        Some(current)
    }
}

impl BackendPort for InMemoryBackend {
    fn find_entities(
        &self,
        entity_type: &str,
        filters: &[BackendFilter],
        fields: &[String],
    ) -> Result<Vec<Record>, BackendError> {
        let matched = self.matching(entity_type, filters)?;
        debug!(entity_type, matched = matched.len(), "find");

        Ok(matched
            .into_iter()
            .map(|record| project(record, fields))
            .collect())
    }

    fn summarize(
        &self,
        entity_type: &str,
        filters: &[BackendFilter],
        summary_fields: &[SummarySpec],
    ) -> Result<Map<String, Value>, BackendError> {
        let matched = self.matching(entity_type, filters)?;
        debug!(entity_type, matched = matched.len(), "summarize");

        let mut summaries = Map::new();
        for spec in summary_fields {
            let value = summarize_field(&matched, spec)?;
            summaries.insert(spec.field.clone(), value);
        }
        Ok(summaries)
    }

    fn read_schema(&self, entity_type: &str) -> Result<Map<String, Value>, BackendError> {
        match self.schemas.get(entity_type) {
            Some(schema) => Ok(schema.clone()),
            None if self.is_known(entity_type) => Ok(Map::new()),
            None => Err(BackendError::UnknownEntityType(entity_type.to_string())),
        }
    }
}

/// Keep `type`, `id` and the requested fields; requested fields missing from the record are null.
fn project(record: &Record, fields: &[String]) -> Record {
    let mut projected = Map::new();
    for key in ["type", "id"] {
        if let Some(value) = record.get(key) {
            projected.insert(key.to_string(), value.clone());
        }
    }
    for field in fields {
        let value = record.get(field).cloned().unwrap_or(Value::Null);
        projected.insert(field.clone(), value);
    }
    projected
}

fn summarize_field(records: &[&Record], spec: &SummarySpec) -> Result<Value, BackendError> {
    let field = spec.field.as_str();

    let value = match spec.summary_type.as_str() {
        "count" => Value::from(
            records
                .iter()
                .filter_map(|record| record.get(field))
                .filter(|value| !value.is_null())
                .count(),
        ),
        "sum" => number_value(numeric_values(records, field).sum()),
        "average" => {
            let values: Vec<f64> = numeric_values(records, field).collect();
            if values.is_empty() {
                Value::Null
            } else {
                number_value(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        "maximum" => numeric_values(records, field)
            .reduce(f64::max)
            .map(number_value)
            .unwrap_or(Value::Null),
        "minimum" => numeric_values(records, field)
            .reduce(f64::min)
            .map(number_value)
            .unwrap_or(Value::Null),
        other => return Err(BackendError::UnsupportedSummaryType(other.to_string())),
    };

    Ok(value)
}

fn numeric_values<'r>(records: &'r [&'r Record], field: &'r str) -> impl Iterator<Item = f64> + 'r {
    records
        .iter()
        .filter_map(move |record| record.get(field))
        .filter_map(Value::as_f64)
}

/// Whole numbers come back as integers, the way the backend reports them.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn evaluate_relation(relation: &str, actual: Option<&Value>, expected: &Value) -> Result<bool, BackendError> {
    let null = Value::Null;
    let actual = actual.unwrap_or(&null);

    let result = match relation {
        "is" => matches_value(actual, expected),
        "is_not" => !matches_value(actual, expected),
        "in" => expected_list(expected).iter().any(|e| matches_value(actual, e)),
        "not_in" => !expected_list(expected).iter().any(|e| matches_value(actual, e)),
        "less_than" => compare(actual, expected) == Some(Ordering::Less),
        "greater_than" => compare(actual, expected) == Some(Ordering::Greater),
        "contains" => text_test(actual, expected, |a, e| a.contains(e)),
        "not_contains" => !text_test(actual, expected, |a, e| a.contains(e)),
        "starts_with" => text_test(actual, expected, |a, e| a.starts_with(e)),
        "ends_with" => text_test(actual, expected, |a, e| a.ends_with(e)),
        other => return Err(BackendError::UnsupportedRelation(other.to_string())),
    };

    Ok(result)
}

fn expected_list(expected: &Value) -> Vec<Value> {
    match expected {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Multi-entity fields match when any of their elements does.
fn matches_value(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) if !expected.is_array() => items.iter().any(|item| values_equal(item, expected)),
        _ => values_equal(actual, expected),
    }
}

/// Entity references are equal when `type` and `id` agree.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (entity_key(a), entity_key(b)) {
        (Some(left), Some(right)) => left == right,
        (None, None) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => false,
    }
}

fn entity_key(value: &Value) -> Option<(&str, i64)> {
    let object = value.as_object()?;
    Some((object.get("type")?.as_str()?, object.get("id")?.as_i64()?))
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn text_test(actual: &Value, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(e)) => test(&a.to_lowercase(), &e.to_lowercase()),
        _ => false,
    }
}
