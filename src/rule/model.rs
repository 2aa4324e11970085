//! 规则配置数据模型定义
//! 仅存储规则的持久化形态，无任何匹配逻辑，支持序列化/反序列化

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FileSortError, FileSortResult};

/// 配置中存放规则列表的键
pub const SORTS_KEY: &str = "sorts";

/// 单条排序规则的持久化记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRuleRecord {
    pub attribute: String,
    pub operator: String,
    pub operand: String,
    pub move_location: String,
}

impl SortRuleRecord {
    pub fn new(
        attribute: impl Into<String>,
        operator: impl Into<String>,
        operand: impl Into<String>,
        move_location: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator: operator.into(),
            operand: operand.into(),
            move_location: move_location.into(),
        }
    }

    /// 从原始 JSON 记录解析（缺少字段或类型错误时返回 InvalidRecord）
    pub fn from_value(value: &Value) -> FileSortResult<Self> {
        if !value.is_object() {
            return Err(FileSortError::InvalidRecord(format!(
                "expected an object, got {}",
                value
            )));
        }
        Self::deserialize(value).map_err(|e| FileSortError::InvalidRecord(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("attribute".to_string(), Value::String(self.attribute.clone()));
        map.insert("operator".to_string(), Value::String(self.operator.clone()));
        map.insert("operand".to_string(), Value::String(self.operand.clone()));
        map.insert("move_location".to_string(), Value::String(self.move_location.clone()));
        Value::Object(map)
    }
}

/// 插件完整偏好配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSortPrefs {
    #[serde(default)]
    pub sorts: Vec<SortRuleRecord>,
}

impl FileSortPrefs {
    /// 默认偏好（空规则列表）
    pub fn default_map() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(SORTS_KEY.to_string(), Value::Array(Vec::new()));
        map
    }

    /// 生成可直接传给 set_config 的补丁
    pub fn to_patch(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            SORTS_KEY.to_string(),
            Value::Array(self.sorts.iter().map(SortRuleRecord::to_value).collect()),
        );
        map
    }
}
