//! 配置中心 KV 内存存储实现

use super::{read_lock, write_lock};
use crate::error::StorageError;
use crate::keeper::{KEY_SEPARATOR, encode_value, flatten, response_value, validate_key};
use crate::traits::KvStore;
use domain::{KeyValue, KvResponse};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    created: i64,
    modified: i64,
}

fn is_child(candidate: &str, key: &str) -> bool {
    let prefix = key.trim_end_matches(KEY_SEPARATOR);
    candidate
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with(KEY_SEPARATOR))
}

/// KV 内存存储，键有序
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<String, StoredValue>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KvStore for InMemoryKvStore {
    async fn keeper_keys(
        &self,
        key: &str,
        keys_only: bool,
        is_raw: bool,
    ) -> Result<Vec<KvResponse>, StorageError> {
        validate_key(key)?;
        let entries = read_lock(&self.entries);
        let mut responses = Vec::new();
        for (entry_key, stored) in entries.iter() {
            if entry_key != key && !is_child(entry_key, key) {
                continue;
            }
            if keys_only {
                responses.push(KvResponse::Key(entry_key.clone()));
            } else {
                responses.push(KvResponse::Entry(KeyValue {
                    key: entry_key.clone(),
                    value: response_value(&stored.value, is_raw)?,
                    created: stored.created,
                    modified: stored.modified,
                }));
            }
        }
        if responses.is_empty() {
            return Err(StorageError::not_found(format!(
                "query key {key} does not exist"
            )));
        }
        Ok(responses)
    }

    async fn add_keeper_keys(
        &self,
        kv: KeyValue,
        is_flatten: bool,
    ) -> Result<Vec<String>, StorageError> {
        validate_key(&kv.key)?;
        let leaves = if is_flatten {
            flatten(&kv.key, &kv.value)
        } else {
            vec![(kv.key.clone(), kv.value.clone())]
        };
        let now = domain::now_millis();
        let mut entries = write_lock(&self.entries);
        for (key, value) in &leaves {
            let encoded = encode_value(value);
            entries
                .entry(key.clone())
                .and_modify(|stored| {
                    stored.value = encoded.clone();
                    stored.modified = now;
                })
                .or_insert_with(|| StoredValue {
                    value: encoded.clone(),
                    created: now,
                    modified: now,
                });
        }
        Ok(leaves.into_iter().map(|(key, _)| key).collect())
    }

    async fn delete_keeper_keys(
        &self,
        key: &str,
        is_recurse: bool,
    ) -> Result<Vec<String>, StorageError> {
        validate_key(key)?;
        let mut entries = write_lock(&self.entries);
        let exists = entries.contains_key(key);
        let children: Vec<String> = entries
            .keys()
            .filter(|candidate| is_child(candidate, key))
            .cloned()
            .collect();

        if !exists && children.is_empty() {
            return Err(StorageError::not_found(format!(
                "query key {key} does not exist"
            )));
        }
        if !children.is_empty() && !is_recurse {
            return Err(StorageError::conflict(format!(
                "key {key} has {} child keys; delete them first or delete recursively",
                children.len()
            )));
        }

        let mut deleted = Vec::new();
        if entries.remove(key).is_some() {
            deleted.push(key.to_string());
        }
        for child in children {
            entries.remove(&child);
            deleted.push(child);
        }
        Ok(deleted)
    }
}
