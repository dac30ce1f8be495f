//! 文档型实体的内存表
//!
//! 过滤使用与 Postgres `@>` 相同的 JSON 包含语义，分页按 created 升序。

use super::{page, read_lock, write_lock};
use crate::error::StorageError;
use crate::models::Document;
use serde_json::Value;
use std::sync::RwLock;

/// `value @> filter`：对象逐键包含，数组逐元素存在，标量相等。
pub fn json_contains(value: &Value, filter: &Value) -> bool {
    match (value, filter) {
        (Value::Object(value), Value::Object(filter)) => filter
            .iter()
            .all(|(key, nested)| value.get(key).is_some_and(|v| json_contains(v, nested))),
        (Value::Array(value), Value::Array(filter)) => filter
            .iter()
            .all(|nested| value.iter().any(|v| json_contains(v, nested))),
        (value, filter) => value == filter,
    }
}

/// 一张文档表，插入顺序即同 created 时的次序。
#[derive(Debug)]
pub struct DocumentTable<T> {
    rows: RwLock<Vec<T>>,
}

impl<T> Default for DocumentTable<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Document> DocumentTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, mut document: T) -> Result<T, StorageError> {
        document.prepare_insert(domain::now_millis());
        let mut rows = write_lock(&self.rows);
        if rows.iter().any(|row| row.id() == document.id()) {
            return Err(StorageError::duplicate(format!(
                "{} id {} already exists",
                T::KIND,
                document.id()
            )));
        }
        if !document.name().is_empty() && rows.iter().any(|row| row.name() == document.name()) {
            return Err(StorageError::duplicate(format!(
                "{} name {} already exists",
                T::KIND,
                document.name()
            )));
        }
        rows.push(document.clone());
        Ok(document)
    }

    pub fn by_id(&self, id: &str) -> Result<T, StorageError> {
        read_lock(&self.rows)
            .iter()
            .find(|row| row.id() == id)
            .cloned()
            .ok_or_else(|| {
                StorageError::not_found(format!("{} with id {id} does not exist", T::KIND))
            })
    }

    pub fn by_name(&self, name: &str) -> Result<T, StorageError> {
        read_lock(&self.rows)
            .iter()
            .find(|row| row.name() == name)
            .cloned()
            .ok_or_else(|| {
                StorageError::not_found(format!("{} with name {name} does not exist", T::KIND))
            })
    }

    pub fn id_exists(&self, id: &str) -> bool {
        read_lock(&self.rows).iter().any(|row| row.id() == id)
    }

    pub fn name_exists(&self, name: &str) -> bool {
        read_lock(&self.rows).iter().any(|row| row.name() == name)
    }

    fn matching(&self, filter: Option<&Value>) -> Result<Vec<T>, StorageError> {
        let rows = read_lock(&self.rows);
        let mut matched = Vec::new();
        for row in rows.iter() {
            let keep = match filter {
                Some(filter) => json_contains(&serde_json::to_value(row)?, filter),
                None => true,
            };
            if keep {
                matched.push(row.clone());
            }
        }
        matched.sort_by_key(|row| row.created());
        Ok(matched)
    }

    pub fn list(
        &self,
        filter: Option<&Value>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<T>, StorageError> {
        page(self.matching(filter)?, offset, limit, T::KIND)
    }

    pub fn count(&self, filter: Option<&Value>) -> Result<u64, StorageError> {
        Ok(self.matching(filter)?.len() as u64)
    }

    /// 按名称整份替换内容。
    pub fn update_by_name(&self, mut document: T) -> Result<(), StorageError> {
        document.set_modified(domain::now_millis());
        let mut rows = write_lock(&self.rows);
        match rows.iter_mut().find(|row| row.name() == document.name()) {
            Some(row) => {
                *row = document;
                Ok(())
            }
            None => Err(StorageError::not_found(format!(
                "{} with name {} does not exist",
                T::KIND,
                document.name()
            ))),
        }
    }

    pub fn delete_by_id(&self, id: &str) -> Result<(), StorageError> {
        self.delete_where(|row| row.id() == id, || format!("id {id}"))
    }

    pub fn delete_by_name(&self, name: &str) -> Result<(), StorageError> {
        self.delete_where(|row| row.name() == name, || format!("name {name}"))
    }

    fn delete_where(
        &self,
        predicate: impl Fn(&T) -> bool,
        label: impl FnOnce() -> String,
    ) -> Result<(), StorageError> {
        let mut rows = write_lock(&self.rows);
        let before = rows.len();
        rows.retain(|row| !predicate(row));
        if rows.len() == before {
            return Err(StorageError::not_found(format!(
                "{} with {} does not exist",
                T::KIND,
                label()
            )));
        }
        Ok(())
    }
}
