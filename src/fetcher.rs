//! 获取实体并填充查询字段
//!
//! 流程：
//!
//! ```text
//! fetch_with_query_fields()
//!   ├─ find_entities()            按调用方的 filters / fields 获取实体
//!   ├─ 没有实体 → 直接返回空列表  (不读取 schema)
//!   ├─ read_schema()              读取实体类型的字段描述
//!   ├─ select_query_fields()      只保留带 query 属性且被请求的字段
//!   └─ 对每个实体的每个查询字段调用 QueryFieldResolver::resolve()
//! ```

use crate::ast::Record;
use crate::backend::{BackendError, BackendPort};
use crate::error::ResolveError;
use crate::filter::BackendFilter;
use crate::resolver::QueryFieldResolver;
use crate::schema::{is_query_field, FieldSchema, SchemaError};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("无法解析实体 {entity_type} #{id} 的查询字段 {field}: {source}")]
    Resolve {
        entity_type: String,
        id: Value,
        field: String,
        #[source]
        source: ResolveError,
    },
}

/// 获取实体, 并把请求字段中的查询字段替换为解析后的值
pub fn fetch_with_query_fields<P: BackendPort + ?Sized>(
    backend: &P,
    entity_type: &str,
    filters: &[BackendFilter],
    fields: &[String],
) -> Result<Vec<Record>, FetchError> {
    let mut entities = backend.find_entities(entity_type, filters, fields)?;

    if entities.is_empty() {
        info!(entity_type, "没有找到实体");
        return Ok(entities);
    }

    let schema = backend.read_schema(entity_type)?;
    let query_fields = select_query_fields(&schema, fields)?;

    if query_fields.is_empty() {
        info!(entity_type, entities = entities.len(), "没有需要解析的查询字段");
        return Ok(entities);
    }

    let resolver = QueryFieldResolver::new(backend);
    for entity in &mut entities {
        populate_query_fields(&resolver, entity, &query_fields)?;
    }

    info!(
        entity_type,
        entities = entities.len(),
        query_fields = query_fields.len(),
        "查询字段填充完成"
    );

    Ok(entities)
}

/// 从 schema 中挑出被请求的查询字段, 按请求字段的顺序返回
pub fn select_query_fields(schema: &Map<String, Value>, fields: &[String]) -> Result<Vec<FieldSchema>, SchemaError> {
    fields
        .iter()
        .filter_map(|name| {
            schema
                .get(name)
                .filter(|descriptor| is_query_field(descriptor))
                .map(|descriptor| (name, descriptor))
        })
        .map(|(name, descriptor)| FieldSchema::from_descriptor(name, descriptor))
        .collect()
}

fn populate_query_fields<P: BackendPort + ?Sized>(
    resolver: &QueryFieldResolver<'_, P>,
    entity: &mut Record,
    query_fields: &[FieldSchema],
) -> Result<(), FetchError> {
    for field in query_fields {
        let value = resolver.resolve(entity, field).map_err(|source| FetchError::Resolve {
            entity_type: entity
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            id: entity.get("id").cloned().unwrap_or(Value::Null),
            field: field.field_name.clone(),
            source,
        })?;
        entity.insert(field.field_name.clone(), value);
    }
    Ok(())
}
