//! KV 值编码与层级展开
//!
//! - 标量按字符串形式存储，非标量按 JSON 文本存储，两者都再做 base64
//! - 展开（flatten）时嵌套对象的每个叶子一条记录，键用 `/` 连接，空对象跳过

use crate::error::StorageError;
use crate::sql;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

pub const KEY_SEPARATOR: char = '/';

/// 连接父键与子键。
pub fn join_key(prefix: &str, child: &str) -> String {
    let prefix = prefix.trim_end_matches(KEY_SEPARATOR);
    let child = child.trim_start_matches(KEY_SEPARATOR);
    match (prefix.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}{KEY_SEPARATOR}{child}"),
    }
}

/// 子键的 LIKE 模式：`key/%`，键中的通配符按字面匹配。
pub fn children_pattern(key: &str) -> String {
    format!(
        "{}{KEY_SEPARATOR}%",
        sql::escape_like(key.trim_end_matches(KEY_SEPARATOR))
    )
}

/// 把嵌套对象展开为 `(键, 叶子值)` 列表，按键排序。
pub fn flatten(key: &str, value: &Value) -> Vec<(String, Value)> {
    let mut leaves = Vec::new();
    flatten_into(key, value, &mut leaves);
    leaves
}

fn flatten_into(key: &str, value: &Value, leaves: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (child, nested) in map {
                flatten_into(&join_key(key, child), nested, leaves);
            }
        }
        leaf => leaves.push((key.to_string(), leaf.clone())),
    }
}

/// 值的文本形式：标量取字符串形式，非标量取 JSON。
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

/// 入库形式：文本形式的 base64。
pub fn encode_value(value: &Value) -> String {
    STANDARD.encode(value_text(value))
}

/// 还原入库值的原文。
pub fn decode_value(stored: &str) -> Result<String, StorageError> {
    let bytes = STANDARD
        .decode(stored)
        .map_err(|err| StorageError::server(format!("stored value is not base64: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|err| StorageError::server(format!("stored value is not UTF-8: {err}")))
}

pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.trim_matches(KEY_SEPARATOR).is_empty() {
        return Err(StorageError::invalid("key must not be empty"));
    }
    Ok(())
}

/// 查询结果中的值：原文模式下解码，否则保留 base64。
pub fn response_value(stored: &str, is_raw: bool) -> Result<Value, StorageError> {
    if is_raw {
        Ok(Value::String(decode_value(stored)?))
    } else {
        Ok(Value::String(stored.to_string()))
    }
}
