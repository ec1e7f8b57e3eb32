//! 查询字段的条件树结构, 与后端 schema 中 `query.filters` 的 JSON 形状一一对应

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// 后端用来标记 "父实体" 占位符的取值
pub const PARENT_ENTITY_TOKEN: &str = "parent_entity_token";

/// 一个实体记录, 即后端返回的一行数据
pub type Record = Map<String, Value>;

/// 条件组, 代表一组用同一个逻辑运算符连接的条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    /// 声明式的逻辑运算符 ("and" / "or"), 保留原始文本, 由翻译器负责校验
    #[serde(default)]
    pub logical_operator: String,
    pub conditions: Vec<ConditionNode>,
}

/// 条件组中的一项: 嵌套的条件组或叶子条件
///
/// 带有 `conditions` 键的对象总是被识别为条件组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Group(ConditionGroup),
    Leaf(ConditionLeaf),
}

/// 叶子条件, 例如：`["sg_sequence", "is", <父实体>]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLeaf {
    pub path: String,
    pub relation: String,
    #[serde(default)]
    pub values: Vec<ConditionValue>,
    /// 未激活的条件保留在 schema 中, 但翻译时会被直接丢弃
    #[serde(default = "default_active", deserialize_with = "deserialize_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// 后端有时以字符串 "true" / "false" 表示 `active`
fn deserialize_active<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Bool(active) => Ok(active),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(D::Error::custom(format!("无效的 active 取值: {}", other))),
    }
}

/// 条件中的取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ConditionValue {
    /// 普通字面量 (字符串、数字、布尔或结构化对象)
    Literal(Value),
    /// 父实体占位符, 翻译时替换为正在解析的实体
    ParentEntity,
}

impl From<Value> for ConditionValue {
    fn from(value: Value) -> Self {
        let is_token = value
            .get("valid")
            .and_then(Value::as_str)
            .is_some_and(|valid| valid == PARENT_ENTITY_TOKEN);

        if is_token {
            ConditionValue::ParentEntity
        } else {
            ConditionValue::Literal(value)
        }
    }
}

impl From<ConditionValue> for Value {
    fn from(value: ConditionValue) -> Self {
        match value {
            ConditionValue::Literal(v) => v,
            ConditionValue::ParentEntity => json!({ "valid": PARENT_ENTITY_TOKEN }),
        }
    }
}

/// 对实体的引用 `{type, id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: i64,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: i64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }

    /// 从实体记录中投影出 `{type, id}`, 缺少任一键时返回 `None`
    pub fn from_record(record: &Record) -> Option<Self> {
        let entity_type = record.get("type")?.as_str()?;
        let id = record.get("id")?.as_i64()?;
        Some(Self::new(entity_type, id))
    }

    pub fn to_value(&self) -> Value {
        json!({ "type": self.entity_type, "id": self.id })
    }
}
