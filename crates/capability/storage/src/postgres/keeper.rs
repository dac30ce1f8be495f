//! 配置中心 KV 与密钥存储的 Postgres 实现

use crate::error::StorageError;
use crate::keeper::{
    children_pattern, encode_value, flatten, response_value, validate_key,
};
use crate::sql;
use crate::traits::{KeyStore, KvStore};
use domain::{KeyValue, KvResponse};
use serde_json::Value;
use sqlx::{PgPool, Row};

pub const KV_TABLE: &str = "core_keeper.config";
pub const KEY_STORE_TABLE: &str = "security.key_store";

const KEY_COL: &str = "key";
const VALUE_COL: &str = "value";

fn epoch_millis(column: &str) -> String {
    format!("(EXTRACT(EPOCH FROM {column}) * 1000)::bigint AS {column}")
}

/// 配置中心 KV 存储（`core_keeper.config`）。
pub struct PgKvStore {
    pub pool: PgPool,
}

impl PgKvStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 同一事务内写入多条 `(键, 值)`，已存在的键覆盖值并更新 modified。
    async fn upsert(&self, entries: &[(String, Value)]) -> Result<(), StorageError> {
        let statement = format!(
            "INSERT INTO {KV_TABLE} ({KEY_COL}, {VALUE_COL}) VALUES ($1, $2) \
             ON CONFLICT ({KEY_COL}) DO UPDATE SET {VALUE_COL} = EXCLUDED.{VALUE_COL}, modified = NOW()"
        );
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(&statement)
                .bind(key)
                .bind(encode_value(value))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl KvStore for PgKvStore {
    async fn keeper_keys(
        &self,
        key: &str,
        keys_only: bool,
        is_raw: bool,
    ) -> Result<Vec<KvResponse>, StorageError> {
        validate_key(key)?;
        let statement = format!(
            "SELECT {KEY_COL}, {VALUE_COL}, {}, {} FROM {KV_TABLE} \
             WHERE {KEY_COL} = $1 OR {} ORDER BY {KEY_COL}",
            epoch_millis("created"),
            epoch_millis("modified"),
            sql::like_condition(&[KEY_COL], 2)
        );
        let rows = sqlx::query(&statement)
            .bind(key)
            .bind(children_pattern(key))
            .fetch_all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Err(StorageError::not_found(format!(
                "query key {key} does not exist"
            )));
        }

        let mut responses = Vec::with_capacity(rows.len());
        for row in &rows {
            let entry_key: String = row.try_get(KEY_COL)?;
            if keys_only {
                responses.push(KvResponse::Key(entry_key));
                continue;
            }
            let stored: String = row.try_get(VALUE_COL)?;
            responses.push(KvResponse::Entry(KeyValue {
                key: entry_key,
                value: response_value(&stored, is_raw)?,
                created: row.try_get("created")?,
                modified: row.try_get("modified")?,
            }));
        }
        Ok(responses)
    }

    async fn add_keeper_keys(
        &self,
        kv: KeyValue,
        is_flatten: bool,
    ) -> Result<Vec<String>, StorageError> {
        validate_key(&kv.key)?;
        let entries = if is_flatten {
            flatten(&kv.key, &kv.value)
        } else {
            vec![(kv.key.clone(), kv.value.clone())]
        };
        self.upsert(&entries).await?;
        Ok(entries.into_iter().map(|(key, _)| key).collect())
    }

    async fn delete_keeper_keys(
        &self,
        key: &str,
        is_recurse: bool,
    ) -> Result<Vec<String>, StorageError> {
        validate_key(key)?;
        let pattern = children_pattern(key);
        let exists: bool = sqlx::query(&sql::exists_by_col(KV_TABLE, &[KEY_COL]))
            .bind(key)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        let children: i64 = sqlx::query(&sql::count_like(KV_TABLE, &[KEY_COL]))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        if !exists && children == 0 {
            return Err(StorageError::not_found(format!(
                "query key {key} does not exist"
            )));
        }
        if children > 0 && !is_recurse {
            return Err(StorageError::conflict(format!(
                "key {key} has {children} child keys; delete them first or delete recursively"
            )));
        }

        let mut tx = self.pool.begin().await?;
        let mut deleted = Vec::new();
        if exists {
            sqlx::query(&sql::delete_by_col(KV_TABLE, KEY_COL))
                .bind(key)
                .execute(&mut *tx)
                .await?;
            deleted.push(key.to_string());
        }
        if is_recurse {
            let rows = sqlx::query(&sql::delete_by_like_returning(KV_TABLE, KEY_COL, &[KEY_COL]))
                .bind(&pattern)
                .fetch_all(&mut *tx)
                .await?;
            for row in &rows {
                deleted.push(row.try_get(KEY_COL)?);
            }
        }
        tx.commit().await?;
        Ok(deleted)
    }
}

/// 密钥存储（`security.key_store`）。
pub struct PgKeyStore {
    pub pool: PgPool,
}

impl PgKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KeyStore for PgKeyStore {
    async fn add_key(&self, name: &str, content: &str) -> Result<(), StorageError> {
        let result = sqlx::query(&sql::insert_or_ignore(KEY_STORE_TABLE, &["name", "content"]))
            .bind(name)
            .bind(content)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::duplicate(format!("key {name} already exists")));
        }
        Ok(())
    }

    async fn update_key(&self, name: &str, content: &str) -> Result<(), StorageError> {
        let statement =
            format!("UPDATE {KEY_STORE_TABLE} SET content = $1, modified = NOW() WHERE name = $2");
        let result = sqlx::query(&statement)
            .bind(content)
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("key {name} does not exist")));
        }
        Ok(())
    }

    async fn key_exists(&self, name: &str) -> Result<bool, StorageError> {
        let exists: bool = sqlx::query(&sql::exists_by_col(KEY_STORE_TABLE, &["name"]))
            .bind(name)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(exists)
    }

    async fn read_key_content(&self, name: &str) -> Result<String, StorageError> {
        let row = sqlx::query(&sql::select_where(KEY_STORE_TABLE, &["content"], &["name"]))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row.try_get("content")?),
            None => Err(StorageError::not_found(format!("key {name} does not exist"))),
        }
    }

    async fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        let result = sqlx::query(&sql::delete_by_col(KEY_STORE_TABLE, "name"))
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("key {name} does not exist")));
        }
        Ok(())
    }
}
