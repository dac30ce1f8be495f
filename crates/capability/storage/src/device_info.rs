//! 设备信息身份缓存
//!
//! 事件与读数的描述属性元组（设备名、描述文件、数据源、资源、值类型、单位、媒体类型、标签）
//! 在海量遥测行中反复出现，统一归一到 `device_info` 表并以整数代理键引用。
//!
//! 缓存为进程内 cache-aside：
//! - 键：元组规范 JSON 的 SHA-256 十六进制
//! - 值：`device_info.id`
//! - 未命中时先查库，库中没有再插入，最后回填缓存
//! - 逻辑删除提交后按 id 驱逐

use crate::error::StorageError;
use async_trait::async_trait;
use domain::{Event, Reading, Tags};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

/// 描述属性元组。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_name: String,
    pub profile_name: String,
    pub source_name: String,
    pub resource_name: String,
    pub value_type: String,
    pub units: String,
    pub media_type: String,
    pub tags: Tags,
}

impl DeviceInfo {
    /// 事件自身的元组（资源相关字段为空）。
    pub fn for_event(event: &Event) -> Self {
        Self {
            device_name: event.device_name.clone(),
            profile_name: event.profile_name.clone(),
            source_name: event.source_name.clone(),
            tags: event.tags.clone(),
            ..Self::default()
        }
    }

    /// 读数的元组；数据源取所属事件。
    pub fn for_reading(event: &Event, reading: &Reading) -> Self {
        Self {
            device_name: reading.device_name.clone(),
            profile_name: reading.profile_name.clone(),
            source_name: event.source_name.clone(),
            resource_name: reading.resource_name.clone(),
            value_type: reading.value_type.as_str().to_string(),
            units: reading.units.clone(),
            media_type: reading.media_type().to_string(),
            tags: reading.tags.clone(),
        }
    }

    /// 缓存键：规范 JSON 的 SHA-256 十六进制。
    pub fn cache_key(&self) -> Result<String, StorageError> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}

/// `device_info` 表的访问接口。
#[async_trait]
pub trait DeviceInfoStore: Send + Sync {
    /// 按完整元组查找未删除的行；不存在时返回 EntityDoesNotExist。
    async fn find_device_info_id(&self, info: &DeviceInfo) -> Result<i32, StorageError>;

    /// 插入新行并返回其 id。
    async fn insert_device_info(&self, info: &DeviceInfo) -> Result<i32, StorageError>;
}

/// 元组哈希 → 代理键。
#[derive(Debug, Default)]
pub struct DeviceInfoCache {
    entries: RwLock<HashMap<String, i32>>,
}

impl DeviceInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<i32> {
        let entries = self.entries.read().unwrap_or_else(|poison| poison.into_inner());
        entries.get(key).copied()
    }

    pub fn insert(&self, key: impl Into<String>, id: i32) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        entries.insert(key.into(), id);
    }

    /// 驱逐指向该 id 的所有条目。
    pub fn remove(&self, id: i32) {
        self.remove_ids(&[id]);
    }

    pub fn remove_ids(&self, ids: &[i32]) {
        if ids.is_empty() {
            return;
        }
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        entries.retain(|_, id| !ids.contains(id));
    }

    pub fn clear(&self) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|poison| poison.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 解析元组对应的代理键：缓存 → 查库 → 插入，结果回填缓存。
    pub async fn resolve(
        &self,
        store: &dyn DeviceInfoStore,
        info: &DeviceInfo,
    ) -> Result<i32, StorageError> {
        let key = info.cache_key()?;
        if let Some(id) = self.get(&key) {
            return Ok(id);
        }
        let id = match store.find_device_info_id(info).await {
            Ok(id) => id,
            Err(err) if err.is_not_found() => store.insert_device_info(info).await?,
            Err(err) => return Err(err),
        };
        self.insert(key, id);
        Ok(id)
    }
}
