//! SQL 语句构建
//!
//! 纯函数，根据表名/列名片段拼装带位置参数（`$n`）的 SQL 字符串，不做任何 I/O。
//!
//! 约定：
//! - 调用方必须按片段请求的顺序绑定参数
//! - 分页固定为 `OFFSET $k LIMIT $k+1`
//! - 文档表的 JSON 包含查询固定为 `content @> $n::jsonb`
//! - 文档表按内容中的 `created` 字段排序：`COALESCE((content->>'created')::bigint, 0)`

use crate::error::StorageError;

pub const ID_COL: &str = "id";
pub const CONTENT_COL: &str = "content";

/// 文档内容中 `created` 字段的排序表达式。
pub const CONTENT_CREATED: &str = "COALESCE((content->>'created')::bigint, 0)";

/// 当前时间（Unix 毫秒）的 SQL 表达式。
const NOW_MILLIS: &str = "(EXTRACT(EPOCH FROM NOW()) * 1000)::bigint";

// ----------------------------------------------------------------------------
// 条件片段
// ----------------------------------------------------------------------------

/// `col1 = $start AND col2 = $start+1 ...`
pub fn equality_condition(columns: &[&str], start: usize) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", start + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// `col1 LIKE $start ESCAPE '\' AND ...`，模式参数需经 [`escape_like`] 转义。
pub fn like_condition(columns: &[&str], start: usize) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} LIKE ${} ESCAPE '\\'", start + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// 转义 LIKE 通配符 `%`、`_` 与转义符 `\` 本身，使其按字面匹配。
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// 时间范围 + 等值/数组成员条件。
///
/// 前两个参数固定为时间范围的下界（`$1`）与上界（`$2`），其余列从 `$3` 开始编号；
/// 出现在 `array_columns` 中的列生成 `col = ANY ($n)`，接收数组参数。
pub fn time_range_condition(
    lower_col: &str,
    upper_col: &str,
    array_columns: &[&str],
    columns: &[&str],
) -> String {
    let mut conditions = vec![format!("{lower_col} >= $1"), format!("{upper_col} <= $2")];
    for (i, column) in columns.iter().enumerate() {
        if array_columns.contains(column) {
            conditions.push(format!("{column} = ANY (${})", i + 3));
        } else {
            conditions.push(format!("{column} = ${}", i + 3));
        }
    }
    conditions.join(" AND ")
}

/// `content @> $n::jsonb`
pub fn json_containment(param: usize) -> String {
    format!("{CONTENT_COL} @> ${param}::jsonb")
}

/// `OFFSET $k LIMIT $k+1`
pub fn pagination(param: usize) -> String {
    format!("OFFSET ${param} LIMIT ${}", param + 1)
}

pub fn order_by_desc(column: &str) -> String {
    format!("ORDER BY {column} DESC")
}

fn set_values(columns: &[&str]) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

// ----------------------------------------------------------------------------
// 写入
// ----------------------------------------------------------------------------

/// `INSERT INTO t(a, b) VALUES ($1, $2)`
pub fn insert(table: &str, columns: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table}({}) VALUES ({placeholders})",
        columns.join(", ")
    )
}

/// 冲突时不写入；配合唯一约束实现原子的"插入或失败"。
pub fn insert_or_ignore(table: &str, columns: &[&str]) -> String {
    format!("{} ON CONFLICT DO NOTHING", insert(table, columns))
}

// ----------------------------------------------------------------------------
// 查询
// ----------------------------------------------------------------------------

pub fn select_where(table: &str, fields: &[&str], columns: &[&str]) -> String {
    format!(
        "SELECT {} FROM {table} WHERE {}",
        fields.join(", "),
        equality_condition(columns, 1)
    )
}

pub fn select_like(table: &str, fields: &[&str], columns: &[&str]) -> String {
    format!(
        "SELECT {} FROM {table} WHERE {}",
        fields.join(", "),
        like_condition(columns, 1)
    )
}

/// 等值过滤 + 倒序 + 分页；无过滤列时省略 WHERE。
pub fn select_where_paginated(
    table: &str,
    fields: &[&str],
    desc_col: &str,
    columns: &[&str],
) -> String {
    let fields = fields.join(", ");
    if columns.is_empty() {
        return format!(
            "SELECT {fields} FROM {table} {} {}",
            order_by_desc(desc_col),
            pagination(1)
        );
    }
    format!(
        "SELECT {fields} FROM {table} WHERE {} {} {}",
        equality_condition(columns, 1),
        order_by_desc(desc_col),
        pagination(columns.len() + 1)
    )
}

/// 时间范围 + 等值/数组条件 + 倒序 + 分页。
pub fn select_by_time_range_paginated(
    table: &str,
    fields: &[&str],
    time_col: &str,
    desc_col: &str,
    array_columns: &[&str],
    columns: &[&str],
) -> String {
    format!(
        "SELECT {} FROM {table} WHERE {} {} {}",
        fields.join(", "),
        time_range_condition(time_col, time_col, array_columns, columns),
        order_by_desc(desc_col),
        pagination(columns.len() + 3)
    )
}

pub fn count(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table}")
}

pub fn count_where(table: &str, columns: &[&str]) -> String {
    format!(
        "SELECT COUNT(*) FROM {table} WHERE {}",
        equality_condition(columns, 1)
    )
}

pub fn count_like(table: &str, columns: &[&str]) -> String {
    format!(
        "SELECT COUNT(*) FROM {table} WHERE {}",
        like_condition(columns, 1)
    )
}

pub fn count_by_time_range_cols(
    table: &str,
    time_col: &str,
    array_columns: &[&str],
    columns: &[&str],
) -> String {
    format!(
        "SELECT COUNT(*) FROM {table} WHERE {}",
        time_range_condition(time_col, time_col, array_columns, columns)
    )
}

pub fn exists_by_col(table: &str, columns: &[&str]) -> String {
    format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE {})",
        equality_condition(columns, 1)
    )
}

pub fn exists_by_json(table: &str) -> String {
    format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE {})",
        json_containment(1)
    )
}

pub fn content_by_id(table: &str) -> String {
    format!("SELECT {CONTENT_COL} FROM {table} WHERE {ID_COL} = $1")
}

pub fn content_by_json(table: &str) -> String {
    format!(
        "SELECT {CONTENT_COL} FROM {table} WHERE {}",
        json_containment(1)
    )
}

pub fn content_by_json_paginated(table: &str) -> String {
    format!(
        "SELECT {CONTENT_COL} FROM {table} WHERE {} ORDER BY {CONTENT_CREATED} {}",
        json_containment(1),
        pagination(2)
    )
}

pub fn content_paginated(table: &str) -> String {
    format!(
        "SELECT {CONTENT_COL} FROM {table} ORDER BY {CONTENT_CREATED} {}",
        pagination(1)
    )
}

/// 按内容 `created` 字段的闭区间查询（`$1`..`$2`），再分页。
pub fn content_by_time_range_paginated(table: &str) -> String {
    format!(
        "SELECT {CONTENT_COL} FROM {table} WHERE {CONTENT_CREATED} BETWEEN $1 AND $2 \
         ORDER BY {CONTENT_CREATED} {}",
        pagination(3)
    )
}

/// 同时满足 JSON 包含与 `created` 时间范围（`$1` 为 JSON，`$2`..`$3` 为范围）。
pub fn content_by_json_and_time_range_paginated(table: &str) -> String {
    format!(
        "SELECT {CONTENT_COL} FROM {table} WHERE {} AND {CONTENT_CREATED} BETWEEN $2 AND $3 \
         ORDER BY {CONTENT_CREATED} {}",
        json_containment(1),
        pagination(4)
    )
}

pub fn count_by_json(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table} WHERE {}", json_containment(1))
}

pub fn count_by_time_range(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table} WHERE {CONTENT_CREATED} BETWEEN $1 AND $2")
}

// ----------------------------------------------------------------------------
// 更新
// ----------------------------------------------------------------------------

/// `UPDATE t SET a = $1, b = $2 WHERE cond = $3`
pub fn update_cols_by_col(table: &str, cond_col: &str, columns: &[&str]) -> String {
    format!(
        "UPDATE {table} SET {} WHERE {cond_col} = ${}",
        set_values(columns),
        columns.len() + 1
    )
}

/// `UPDATE t SET a = $1 WHERE content @> $2::jsonb`
pub fn update_cols_by_json(table: &str, columns: &[&str]) -> String {
    format!(
        "UPDATE {table} SET {} WHERE {}",
        set_values(columns),
        json_containment(columns.len() + 1)
    )
}

pub fn update_content_by_json(table: &str) -> String {
    update_cols_by_json(table, &[CONTENT_COL])
}

pub fn update_content_by_id(table: &str) -> String {
    format!("UPDATE {table} SET {CONTENT_COL} = $1 WHERE {ID_COL} = $2")
}

// ----------------------------------------------------------------------------
// 删除
// ----------------------------------------------------------------------------

pub fn delete_by_id(table: &str) -> String {
    delete_by_col(table, ID_COL)
}

pub fn delete_by_col(table: &str, column: &str) -> String {
    format!("DELETE FROM {table} WHERE {column} = $1")
}

/// `DELETE FROM t WHERE col <= $1`
pub fn delete_up_to(table: &str, column: &str) -> String {
    format!("DELETE FROM {table} WHERE {column} <= $1")
}

pub fn delete_by_json(table: &str) -> String {
    format!("DELETE FROM {table} WHERE {}", json_containment(1))
}

/// 删除内容 `created` 早于 `now - $1` 毫秒的行。
pub fn delete_by_content_age(table: &str) -> String {
    format!("DELETE FROM {table} WHERE {CONTENT_CREATED} < {NOW_MILLIS} - $1")
}

/// 在 JSON 包含条件（`$1`）下删除早于 `now - $2` 毫秒的行。
pub fn delete_by_json_and_content_age(table: &str) -> String {
    format!(
        "DELETE FROM {table} WHERE {} AND {CONTENT_CREATED} < {NOW_MILLIS} - $2",
        json_containment(1)
    )
}

/// `DELETE FROM t WHERE col LIKE $1 [RETURNING ...]`
pub fn delete_by_like_returning(table: &str, column: &str, returning: &[&str]) -> String {
    let mut statement = format!("DELETE FROM {table} WHERE {}", like_condition(&[column], 1));
    if !returning.is_empty() {
        statement.push_str(" RETURNING ");
        statement.push_str(&returning.join(", "));
    }
    statement
}

// ----------------------------------------------------------------------------
// 参数规范化
// ----------------------------------------------------------------------------

/// 规范化分页参数。
///
/// 负数 limit（`-1` 哨兵）表示不限制，映射为 SQL `NULL`（即 `LIMIT ALL`）；负数 offset 归零。
pub fn normalize_pagination(offset: i64, limit: i64) -> (i64, Option<i64>) {
    let offset = offset.max(0);
    let limit = if limit < 0 { None } else { Some(limit) };
    (offset, limit)
}

pub fn validate_time_range(start: i64, end: i64) -> Result<(), StorageError> {
    if start > end {
        return Err(StorageError::invalid(format!(
            "end time {end} must be greater than or equal to start time {start}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_condition_numbers_from_start() {
        assert_eq!(equality_condition(&["a", "b"], 3), "a = $3 AND b = $4");
    }

    #[test]
    fn empty_like_condition_is_empty() {
        assert_eq!(like_condition(&[], 1), "");
    }
}
