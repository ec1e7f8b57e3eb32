//! 查询字段的 schema 描述
//!
//! 后端 `schema_field_read` 返回的字段描述是松散的 JSON, 形如：
//!
//! ```text
//! {
//!   "properties": {
//!     "summary_default": {"value": "record_count"},
//!     "summary_field":   {"value": "id"},
//!     "query": {"value": {
//!         "entity_type": "Shot",
//!         "filters": {"logical_operator": "and", "conditions": [...]}
//!     }}
//!   }
//! }
//! ```
//!
//! 本模块在边界处把它解析成严格的 [`FieldSchema`], 缺少必需属性的描述会被拒绝

use crate::ast::ConditionGroup;
use crate::error::ResolveError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// schema 描述解析错误
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("字段 {field} 缺少属性 {property}")]
    MissingProperty { field: String, property: &'static str },

    #[error("字段 {field} 的属性 {property} 类型不正确")]
    InvalidProperty { field: String, property: &'static str },

    #[error("字段 {field} 的条件树无法解析: {source}")]
    InvalidConditionTree {
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 查询字段的汇总方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryKind {
    Average,
    Count,
    Maximum,
    Minimum,
    Sum,
    RecordCount,
    SingleRecord,
}

impl SummaryKind {
    pub const ALL: [SummaryKind; 7] = [
        SummaryKind::Average,
        SummaryKind::Count,
        SummaryKind::Maximum,
        SummaryKind::Minimum,
        SummaryKind::Sum,
        SummaryKind::RecordCount,
        SummaryKind::SingleRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryKind::Average => "average",
            SummaryKind::Count => "count",
            SummaryKind::Maximum => "maximum",
            SummaryKind::Minimum => "minimum",
            SummaryKind::Sum => "sum",
            SummaryKind::RecordCount => "record_count",
            SummaryKind::SingleRecord => "single_record",
        }
    }
}

impl FromStr for SummaryKind {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SummaryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ResolveError::UnsupportedSummaryKind(s.to_string()))
    }
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一个查询字段的严格描述
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub field_name: String,
    /// 原始的汇总方式文本, 在解析时 (resolve) 才校验, 以便未知取值直接报告给调用方
    pub summary_default: String,
    pub summary_field: String,
    pub entity_type: String,
    pub condition_tree: ConditionGroup,
}

/// 描述中是否带有 `properties.query`, 即该字段是否为查询字段
pub fn is_query_field(descriptor: &Value) -> bool {
    descriptor
        .get("properties")
        .and_then(|props| props.get("query"))
        .is_some()
}

impl FieldSchema {
    /// 从后端返回的字段描述构造 `FieldSchema`
    pub fn from_descriptor(field_name: &str, descriptor: &Value) -> Result<Self, SchemaError> {
        let properties = descriptor
            .get("properties")
            .ok_or_else(|| missing(field_name, "properties"))?;

        let summary_default = property_str(field_name, properties, "summary_default")?;
        let summary_field = property_str(field_name, properties, "summary_field")?;

        let query = property_value(properties, "query").ok_or_else(|| missing(field_name, "query"))?;

        let entity_type = query
            .get("entity_type")
            .ok_or_else(|| missing(field_name, "query.entity_type"))?
            .as_str()
            .ok_or_else(|| invalid(field_name, "query.entity_type"))?
            .to_string();

        let filters = query
            .get("filters")
            .ok_or_else(|| missing(field_name, "query.filters"))?;

        let condition_tree = serde_json::from_value(filters.clone()).map_err(|source| {
            SchemaError::InvalidConditionTree {
                field: field_name.to_string(),
                source,
            }
        })?;

        Ok(FieldSchema {
            field_name: field_name.to_string(),
            summary_default,
            summary_field,
            entity_type,
            condition_tree,
        })
    }

    /// 解析汇总方式, 未知取值返回 `UnsupportedSummaryKind`
    pub fn summary_kind(&self) -> Result<SummaryKind, ResolveError> {
        self.summary_default.parse()
    }
}

/// 取出 `properties.<name>.value`, 值为 null 时视为不存在
fn property_value<'v>(properties: &'v Value, name: &str) -> Option<&'v Value> {
    properties
        .get(name)
        .and_then(|prop| prop.get("value"))
        .filter(|value| !value.is_null())
}

fn property_str(field: &str, properties: &Value, name: &'static str) -> Result<String, SchemaError> {
    property_value(properties, name)
        .ok_or_else(|| missing(field, name))?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(field, name))
}

fn missing(field: &str, property: &'static str) -> SchemaError {
    SchemaError::MissingProperty {
        field: field.to_string(),
        property,
    }
}

fn invalid(field: &str, property: &'static str) -> SchemaError {
    SchemaError::InvalidProperty {
        field: field.to_string(),
        property,
    }
}
