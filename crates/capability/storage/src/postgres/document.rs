//! 文档型实体的通用读写
//!
//! 文档表结构统一为 `(id TEXT, content JSONB, name GENERATED UNIQUE)`：
//! - 新增：`INSERT ... ON CONFLICT DO NOTHING`，零行即名称（或 id）冲突
//! - 更新：按名称整份替换内容
//! - 查询：JSON 包含 + 按内容 `created` 排序分页

use crate::error::StorageError;
use crate::models::Document;
use crate::sql;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

pub const NAME_COL: &str = "name";

fn decode_content<T: Document>(row: &PgRow) -> Result<T, StorageError> {
    let content: Value = row.try_get(sql::CONTENT_COL)?;
    serde_json::from_value(content).map_err(|err| {
        StorageError::server(format!("failed to decode {} content", T::KIND)).with_source(err)
    })
}

pub(crate) fn decode_rows<T: Document>(rows: &[PgRow]) -> Result<Vec<T>, StorageError> {
    rows.iter().map(decode_content).collect()
}

/// 偏移量超出数据范围时返回 EntityDoesNotExist。
pub(crate) fn ensure_page<T>(
    items: Vec<T>,
    offset: i64,
    kind: &str,
) -> Result<Vec<T>, StorageError> {
    if items.is_empty() && offset > 0 {
        return Err(StorageError::not_found(format!(
            "no {kind} found at offset {offset}"
        )));
    }
    Ok(items)
}

/// 标签过滤的 JSON 包含参数；无标签时返回 `None`。
pub(crate) fn labels_filter(labels: &[String]) -> Option<Value> {
    if labels.is_empty() {
        return None;
    }
    Some(serde_json::json!({ "labels": labels }))
}

pub(crate) async fn insert_document<T: Document>(
    pool: &PgPool,
    table: &str,
    mut document: T,
) -> Result<T, StorageError> {
    document.prepare_insert(domain::now_millis());
    let content = serde_json::to_value(&document)?;
    let result = sqlx::query(&sql::insert_or_ignore(table, &[sql::ID_COL, sql::CONTENT_COL]))
        .bind(document.id())
        .bind(&content)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        let label = if document.name().is_empty() {
            format!("id {}", document.id())
        } else {
            format!("name {}", document.name())
        };
        return Err(StorageError::duplicate(format!(
            "{} {label} already exists",
            T::KIND
        )));
    }
    Ok(document)
}

pub(crate) async fn document_by_id<T: Document>(
    pool: &PgPool,
    table: &str,
    id: &str,
) -> Result<T, StorageError> {
    let row = sqlx::query(&sql::content_by_id(table))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => decode_content(&row),
        None => Err(StorageError::not_found(format!(
            "{} with id {id} does not exist",
            T::KIND
        ))),
    }
}

pub(crate) async fn document_by_name<T: Document>(
    pool: &PgPool,
    table: &str,
    name: &str,
) -> Result<T, StorageError> {
    let row = sqlx::query(&sql::select_where(table, &[sql::CONTENT_COL], &[NAME_COL]))
        .bind(name)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => decode_content(&row),
        None => Err(StorageError::not_found(format!(
            "{} with name {name} does not exist",
            T::KIND
        ))),
    }
}

/// 按 JSON 包含条件分页查询；`filter` 为 `None` 时查询全部。
pub(crate) async fn documents<T: Document>(
    pool: &PgPool,
    table: &str,
    filter: Option<&Value>,
    offset: i64,
    limit: i64,
) -> Result<Vec<T>, StorageError> {
    let (offset, limit) = sql::normalize_pagination(offset, limit);
    let rows = match filter {
        Some(filter) => {
            sqlx::query(&sql::content_by_json_paginated(table))
                .bind(filter)
                .bind(offset)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query(&sql::content_paginated(table))
                .bind(offset)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
    };
    ensure_page(decode_rows(&rows)?, offset, T::KIND)
}

/// 按内容 `created` 的闭区间分页查询，可叠加 JSON 包含条件。
pub(crate) async fn documents_by_time_range<T: Document>(
    pool: &PgPool,
    table: &str,
    filter: Option<&Value>,
    start: i64,
    end: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<T>, StorageError> {
    sql::validate_time_range(start, end)?;
    let (offset, limit) = sql::normalize_pagination(offset, limit);
    let rows = match filter {
        Some(filter) => {
            sqlx::query(&sql::content_by_json_and_time_range_paginated(table))
                .bind(filter)
                .bind(start)
                .bind(end)
                .bind(offset)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query(&sql::content_by_time_range_paginated(table))
                .bind(start)
                .bind(end)
                .bind(offset)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
    };
    ensure_page(decode_rows(&rows)?, offset, T::KIND)
}

/// 按 created 倒序取第 `offset` 条。
pub(crate) async fn latest_document_by_offset<T: Document>(
    pool: &PgPool,
    table: &str,
    offset: u32,
) -> Result<T, StorageError> {
    let statement = format!(
        "SELECT {} FROM {table} ORDER BY {} DESC OFFSET $1 LIMIT 1",
        sql::CONTENT_COL,
        sql::CONTENT_CREATED
    );
    let row = sqlx::query(&statement)
        .bind(i64::from(offset))
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => decode_content(&row),
        None => Err(StorageError::not_found(format!(
            "no {} found at offset {offset}",
            T::KIND
        ))),
    }
}

pub(crate) async fn count_documents(
    pool: &PgPool,
    table: &str,
    filter: Option<&Value>,
) -> Result<u64, StorageError> {
    let count: i64 = match filter {
        Some(filter) => {
            sqlx::query(&sql::count_by_json(table))
                .bind(filter)
                .fetch_one(pool)
                .await?
                .try_get(0)?
        }
        None => sqlx::query(&sql::count(table))
            .fetch_one(pool)
            .await?
            .try_get(0)?,
    };
    Ok(count.max(0) as u64)
}

pub(crate) async fn count_documents_by_time_range(
    pool: &PgPool,
    table: &str,
    start: i64,
    end: i64,
) -> Result<u64, StorageError> {
    sql::validate_time_range(start, end)?;
    let count: i64 = sqlx::query(&sql::count_by_time_range(table))
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?
        .try_get(0)?;
    Ok(count.max(0) as u64)
}

pub(crate) async fn exists_by_col(
    pool: &PgPool,
    table: &str,
    column: &str,
    value: &str,
) -> Result<bool, StorageError> {
    let exists: bool = sqlx::query(&sql::exists_by_col(table, &[column]))
        .bind(value)
        .fetch_one(pool)
        .await?
        .try_get(0)?;
    Ok(exists)
}

/// 按名称整份替换内容；modified 重新盖章。
pub(crate) async fn update_document_by_name<T: Document>(
    pool: &PgPool,
    table: &str,
    mut document: T,
) -> Result<(), StorageError> {
    document.set_modified(domain::now_millis());
    let content = serde_json::to_value(&document)?;
    let result = sqlx::query(&sql::update_cols_by_col(table, NAME_COL, &[sql::CONTENT_COL]))
        .bind(&content)
        .bind(document.name())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::not_found(format!(
            "{} with name {} does not exist",
            T::KIND,
            document.name()
        )));
    }
    Ok(())
}

/// 按 id 整份替换内容。
pub(crate) async fn update_document_by_id<T: Document>(
    pool: &PgPool,
    table: &str,
    mut document: T,
) -> Result<(), StorageError> {
    document.set_modified(domain::now_millis());
    let content = serde_json::to_value(&document)?;
    let result = sqlx::query(&sql::update_content_by_id(table))
        .bind(&content)
        .bind(document.id())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::not_found(format!(
            "{} with id {} does not exist",
            T::KIND,
            document.id()
        )));
    }
    Ok(())
}

pub(crate) async fn delete_by_col(
    pool: &PgPool,
    table: &str,
    kind: &str,
    column: &str,
    value: &str,
) -> Result<(), StorageError> {
    let result = sqlx::query(&sql::delete_by_col(table, column))
        .bind(value)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::not_found(format!(
            "{kind} with {column} {value} does not exist"
        )));
    }
    Ok(())
}
