//! Translator that converts a declarative condition tree into backend filters.

use crate::ast::{ConditionGroup, ConditionLeaf, ConditionNode, ConditionValue, EntityRef};
use crate::error::ResolveError;
use crate::filter::{BackendFilter, FilterOperator};
use serde_json::Value;

/// Map a declarative logical operator onto the backend vocabulary.
pub fn logical_operator_lookup(operator: &str) -> Result<FilterOperator, ResolveError> {
    match operator {
        "and" => Ok(FilterOperator::All),
        "or" => Ok(FilterOperator::Any),
        other => Err(ResolveError::UnknownLogicalOperator(other.to_string())),
    }
}

/// Translates condition trees for one owning entity.
pub struct FilterTranslator<'a> {
    /// Substituted for every parent-entity token in the tree
    parent: &'a EntityRef,
}

impl<'a> FilterTranslator<'a> {
    pub fn new(parent: &'a EntityRef) -> Self {
        Self { parent }
    }

    /// Translate a condition tree into the top-level `filters` list of a query.
    pub fn to_query_filters(&self, group: &ConditionGroup) -> Result<Vec<BackendFilter>, ResolveError> {
        Ok(vec![self.translate(group)?])
    }

    /// Translate one condition group, recursing into nested groups.
    pub fn translate(&self, group: &ConditionGroup) -> Result<BackendFilter, ResolveError> {
        let filter_operator = logical_operator_lookup(&group.logical_operator)?;
        let mut filters = Vec::with_capacity(group.conditions.len());

        for node in &group.conditions {
            match node {
                ConditionNode::Group(nested) => filters.push(self.translate(nested)?),
                ConditionNode::Leaf(leaf) => {
                    if let Some(filter) = self.translate_leaf(leaf) {
                        filters.push(filter);
                    }
                }
            }
        }

        Ok(BackendFilter::Group {
            filter_operator,
            filters,
        })
    }

    /// Inactive leaves produce nothing.
    fn translate_leaf(&self, leaf: &ConditionLeaf) -> Option<BackendFilter> {
        if !leaf.active {
            return None;
        }

        let mut values: Vec<Value> = leaf.values.iter().map(|v| self.resolve_value(v)).collect();

        // A single value is sent as a scalar, never as a one-element list
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };

        Some(BackendFilter::condition(&leaf.path, &leaf.relation, value))
    }

    fn resolve_value(&self, value: &ConditionValue) -> Value {
        match value {
            ConditionValue::ParentEntity => self.parent.to_value(),
            ConditionValue::Literal(literal) => literal.clone(),
        }
    }
}
