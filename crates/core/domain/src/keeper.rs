//! 配置中心（KV）与密钥存储模型。

use serde::{Deserialize, Serialize};

/// 一条 KV 记录。`value` 可以是标量，也可以是需要展开（flatten）的嵌套对象。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValue {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub modified: i64,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
            created: 0,
            modified: 0,
        }
    }
}

/// KV 查询结果：仅键，或完整记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KvResponse {
    Key(String),
    Entry(KeyValue),
}

impl KvResponse {
    pub fn key(&self) -> &str {
        match self {
            KvResponse::Key(key) => key,
            KvResponse::Entry(entry) => &entry.key,
        }
    }
}

/// 密钥存储中的一条记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyData {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub modified: i64,
}
