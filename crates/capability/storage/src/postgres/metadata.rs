//! Postgres 元数据存储实现
//!
//! 设备服务、设备描述文件、设备、自动发现规则均为文档型实体，读写走 `document` 模块的通用函数。
//! 新增设备前校验其设备服务与描述文件存在，缺失时不写入任何行。

use super::document::{
    self, NAME_COL, count_documents, document_by_id, document_by_name, documents, exists_by_col,
    insert_document, labels_filter, update_document_by_name,
};
use crate::device_tree::{self, DeviceLevels};
use crate::error::StorageError;
use crate::models::Document;
use crate::sql;
use crate::traits::{DeviceProfileStore, DeviceServiceStore, DeviceStore, ProvisionWatcherStore};
use domain::{Device, DeviceProfile, DeviceService, ProvisionWatcher};
use serde_json::{Value, json};
use sqlx::PgPool;

pub const DEVICE_SERVICE_TABLE: &str = "core_metadata.device_service";
pub const DEVICE_PROFILE_TABLE: &str = "core_metadata.device_profile";
pub const DEVICE_TABLE: &str = "core_metadata.device";
pub const PROVISION_WATCHER_TABLE: &str = "core_metadata.provision_watcher";

// ----------------------------------------------------------------------------
// 设备服务
// ----------------------------------------------------------------------------

pub struct PgDeviceServiceStore {
    pub pool: PgPool,
}

impl PgDeviceServiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DeviceServiceStore for PgDeviceServiceStore {
    async fn add_device_service(
        &self,
        service: DeviceService,
    ) -> Result<DeviceService, StorageError> {
        insert_document(&self.pool, DEVICE_SERVICE_TABLE, service).await
    }

    async fn device_service_by_id(&self, id: &str) -> Result<DeviceService, StorageError> {
        document_by_id(&self.pool, DEVICE_SERVICE_TABLE, id).await
    }

    async fn device_service_by_name(&self, name: &str) -> Result<DeviceService, StorageError> {
        document_by_name(&self.pool, DEVICE_SERVICE_TABLE, name).await
    }

    async fn all_device_services(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<DeviceService>, StorageError> {
        let filter = labels_filter(labels);
        documents(&self.pool, DEVICE_SERVICE_TABLE, filter.as_ref(), offset, limit).await
    }

    async fn update_device_service(&self, service: DeviceService) -> Result<(), StorageError> {
        update_document_by_name(&self.pool, DEVICE_SERVICE_TABLE, service).await
    }

    async fn delete_device_service_by_id(&self, id: &str) -> Result<(), StorageError> {
        document::delete_by_col(
            &self.pool,
            DEVICE_SERVICE_TABLE,
            DeviceService::KIND,
            sql::ID_COL,
            id,
        )
        .await
    }

    async fn delete_device_service_by_name(&self, name: &str) -> Result<(), StorageError> {
        document::delete_by_col(
            &self.pool,
            DEVICE_SERVICE_TABLE,
            DeviceService::KIND,
            NAME_COL,
            name,
        )
        .await
    }

    async fn device_service_name_exists(&self, name: &str) -> Result<bool, StorageError> {
        exists_by_col(&self.pool, DEVICE_SERVICE_TABLE, NAME_COL, name).await
    }

    async fn device_service_count_by_labels(
        &self,
        labels: &[String],
    ) -> Result<u64, StorageError> {
        let filter = labels_filter(labels);
        count_documents(&self.pool, DEVICE_SERVICE_TABLE, filter.as_ref()).await
    }
}

// ----------------------------------------------------------------------------
// 设备描述文件
// ----------------------------------------------------------------------------

pub struct PgDeviceProfileStore {
    pub pool: PgPool,
}

impl PgDeviceProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DeviceProfileStore for PgDeviceProfileStore {
    async fn add_device_profile(
        &self,
        profile: DeviceProfile,
    ) -> Result<DeviceProfile, StorageError> {
        insert_document(&self.pool, DEVICE_PROFILE_TABLE, profile).await
    }

    async fn device_profile_by_id(&self, id: &str) -> Result<DeviceProfile, StorageError> {
        document_by_id(&self.pool, DEVICE_PROFILE_TABLE, id).await
    }

    async fn device_profile_by_name(&self, name: &str) -> Result<DeviceProfile, StorageError> {
        document_by_name(&self.pool, DEVICE_PROFILE_TABLE, name).await
    }

    async fn all_device_profiles(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<DeviceProfile>, StorageError> {
        let filter = labels_filter(labels);
        documents(&self.pool, DEVICE_PROFILE_TABLE, filter.as_ref(), offset, limit).await
    }

    async fn device_profiles_by_model(
        &self,
        model: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError> {
        let filter = json!({ "model": model });
        documents(&self.pool, DEVICE_PROFILE_TABLE, Some(&filter), offset, limit).await
    }

    async fn device_profiles_by_manufacturer(
        &self,
        manufacturer: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError> {
        let filter = json!({ "manufacturer": manufacturer });
        documents(&self.pool, DEVICE_PROFILE_TABLE, Some(&filter), offset, limit).await
    }

    async fn device_profiles_by_manufacturer_and_model(
        &self,
        manufacturer: &str,
        model: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError> {
        let filter = json!({ "manufacturer": manufacturer, "model": model });
        documents(&self.pool, DEVICE_PROFILE_TABLE, Some(&filter), offset, limit).await
    }

    async fn update_device_profile(&self, profile: DeviceProfile) -> Result<(), StorageError> {
        update_document_by_name(&self.pool, DEVICE_PROFILE_TABLE, profile).await
    }

    async fn delete_device_profile_by_id(&self, id: &str) -> Result<(), StorageError> {
        document::delete_by_col(
            &self.pool,
            DEVICE_PROFILE_TABLE,
            DeviceProfile::KIND,
            sql::ID_COL,
            id,
        )
        .await
    }

    async fn delete_device_profile_by_name(&self, name: &str) -> Result<(), StorageError> {
        document::delete_by_col(
            &self.pool,
            DEVICE_PROFILE_TABLE,
            DeviceProfile::KIND,
            NAME_COL,
            name,
        )
        .await
    }

    async fn device_profile_name_exists(&self, name: &str) -> Result<bool, StorageError> {
        exists_by_col(&self.pool, DEVICE_PROFILE_TABLE, NAME_COL, name).await
    }

    async fn device_profile_count_by_labels(
        &self,
        labels: &[String],
    ) -> Result<u64, StorageError> {
        let filter = labels_filter(labels);
        count_documents(&self.pool, DEVICE_PROFILE_TABLE, filter.as_ref()).await
    }

    async fn device_profile_count_by_model(&self, model: &str) -> Result<u64, StorageError> {
        let filter = json!({ "model": model });
        count_documents(&self.pool, DEVICE_PROFILE_TABLE, Some(&filter)).await
    }

    async fn device_profile_count_by_manufacturer(
        &self,
        manufacturer: &str,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "manufacturer": manufacturer });
        count_documents(&self.pool, DEVICE_PROFILE_TABLE, Some(&filter)).await
    }
}

// ----------------------------------------------------------------------------
// 设备
// ----------------------------------------------------------------------------

/// 设备树一层的过滤条件：父设备名 + 可选标签。
pub(crate) fn tree_level_filter(parent: &str, labels: &[String]) -> Value {
    let mut filter = json!({ "parent": parent });
    if !labels.is_empty() {
        filter["labels"] = json!(labels);
    }
    filter
}

pub struct PgDeviceStore {
    pub pool: PgPool,
}

impl PgDeviceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DeviceLevels for PgDeviceStore {
    async fn child_devices(
        &self,
        parent: &str,
        labels: &[String],
    ) -> Result<Vec<Device>, StorageError> {
        let filter = tree_level_filter(parent, labels);
        documents(&self.pool, DEVICE_TABLE, Some(&filter), 0, -1).await
    }
}

#[async_trait::async_trait]
impl DeviceStore for PgDeviceStore {
    async fn add_device(&self, device: Device) -> Result<Device, StorageError> {
        if !exists_by_col(&self.pool, DEVICE_SERVICE_TABLE, NAME_COL, &device.service_name).await? {
            return Err(StorageError::not_found(format!(
                "device service '{}' does not exist",
                device.service_name
            )));
        }
        if !exists_by_col(&self.pool, DEVICE_PROFILE_TABLE, NAME_COL, &device.profile_name).await? {
            return Err(StorageError::not_found(format!(
                "device profile '{}' does not exist",
                device.profile_name
            )));
        }
        insert_document(&self.pool, DEVICE_TABLE, device).await
    }

    async fn device_by_id(&self, id: &str) -> Result<Device, StorageError> {
        document_by_id(&self.pool, DEVICE_TABLE, id).await
    }

    async fn device_by_name(&self, name: &str) -> Result<Device, StorageError> {
        document_by_name(&self.pool, DEVICE_TABLE, name).await
    }

    async fn all_devices(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<Device>, StorageError> {
        let filter = labels_filter(labels);
        documents(&self.pool, DEVICE_TABLE, filter.as_ref(), offset, limit).await
    }

    async fn devices_by_service_name(
        &self,
        service_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Device>, StorageError> {
        let filter = json!({ "serviceName": service_name });
        documents(&self.pool, DEVICE_TABLE, Some(&filter), offset, limit).await
    }

    async fn devices_by_profile_name(
        &self,
        profile_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Device>, StorageError> {
        let filter = json!({ "profileName": profile_name });
        documents(&self.pool, DEVICE_TABLE, Some(&filter), offset, limit).await
    }

    async fn update_device(&self, device: Device) -> Result<(), StorageError> {
        update_document_by_name(&self.pool, DEVICE_TABLE, device).await
    }

    async fn delete_device_by_id(&self, id: &str) -> Result<(), StorageError> {
        document::delete_by_col(&self.pool, DEVICE_TABLE, Device::KIND, sql::ID_COL, id).await
    }

    async fn delete_device_by_name(&self, name: &str) -> Result<(), StorageError> {
        document::delete_by_col(&self.pool, DEVICE_TABLE, Device::KIND, NAME_COL, name).await
    }

    async fn device_id_exists(&self, id: &str) -> Result<bool, StorageError> {
        exists_by_col(&self.pool, DEVICE_TABLE, sql::ID_COL, id).await
    }

    async fn device_name_exists(&self, name: &str) -> Result<bool, StorageError> {
        exists_by_col(&self.pool, DEVICE_TABLE, NAME_COL, name).await
    }

    async fn device_count_by_labels(&self, labels: &[String]) -> Result<u64, StorageError> {
        let filter = labels_filter(labels);
        count_documents(&self.pool, DEVICE_TABLE, filter.as_ref()).await
    }

    async fn device_count_by_profile_name(
        &self,
        profile_name: &str,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "profileName": profile_name });
        count_documents(&self.pool, DEVICE_TABLE, Some(&filter)).await
    }

    async fn device_count_by_service_name(
        &self,
        service_name: &str,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "serviceName": service_name });
        count_documents(&self.pool, DEVICE_TABLE, Some(&filter)).await
    }

    async fn device_tree(
        &self,
        parent: &str,
        levels: i64,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<(u64, Vec<Device>), StorageError> {
        device_tree::device_tree(self, parent, levels, offset, limit, labels).await
    }
}

// ----------------------------------------------------------------------------
// 自动发现规则
// ----------------------------------------------------------------------------

pub struct PgProvisionWatcherStore {
    pub pool: PgPool,
}

impl PgProvisionWatcherStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn watcher_profile_filter(profile_name: &str) -> Value {
    json!({ "discoveredDevice": { "profileName": profile_name } })
}

#[async_trait::async_trait]
impl ProvisionWatcherStore for PgProvisionWatcherStore {
    async fn add_provision_watcher(
        &self,
        watcher: ProvisionWatcher,
    ) -> Result<ProvisionWatcher, StorageError> {
        insert_document(&self.pool, PROVISION_WATCHER_TABLE, watcher).await
    }

    async fn provision_watcher_by_id(&self, id: &str) -> Result<ProvisionWatcher, StorageError> {
        document_by_id(&self.pool, PROVISION_WATCHER_TABLE, id).await
    }

    async fn provision_watcher_by_name(
        &self,
        name: &str,
    ) -> Result<ProvisionWatcher, StorageError> {
        document_by_name(&self.pool, PROVISION_WATCHER_TABLE, name).await
    }

    async fn all_provision_watchers(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<ProvisionWatcher>, StorageError> {
        let filter = labels_filter(labels);
        documents(&self.pool, PROVISION_WATCHER_TABLE, filter.as_ref(), offset, limit).await
    }

    async fn provision_watchers_by_service_name(
        &self,
        service_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ProvisionWatcher>, StorageError> {
        let filter = json!({ "serviceName": service_name });
        documents(&self.pool, PROVISION_WATCHER_TABLE, Some(&filter), offset, limit).await
    }

    async fn provision_watchers_by_profile_name(
        &self,
        profile_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ProvisionWatcher>, StorageError> {
        let filter = watcher_profile_filter(profile_name);
        documents(&self.pool, PROVISION_WATCHER_TABLE, Some(&filter), offset, limit).await
    }

    async fn update_provision_watcher(
        &self,
        watcher: ProvisionWatcher,
    ) -> Result<(), StorageError> {
        update_document_by_name(&self.pool, PROVISION_WATCHER_TABLE, watcher).await
    }

    async fn delete_provision_watcher_by_name(&self, name: &str) -> Result<(), StorageError> {
        document::delete_by_col(
            &self.pool,
            PROVISION_WATCHER_TABLE,
            ProvisionWatcher::KIND,
            NAME_COL,
            name,
        )
        .await
    }

    async fn provision_watcher_count_by_labels(
        &self,
        labels: &[String],
    ) -> Result<u64, StorageError> {
        let filter = labels_filter(labels);
        count_documents(&self.pool, PROVISION_WATCHER_TABLE, filter.as_ref()).await
    }

    async fn provision_watcher_count_by_service_name(
        &self,
        service_name: &str,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "serviceName": service_name });
        count_documents(&self.pool, PROVISION_WATCHER_TABLE, Some(&filter)).await
    }

    async fn provision_watcher_count_by_profile_name(
        &self,
        profile_name: &str,
    ) -> Result<u64, StorageError> {
        let filter = watcher_profile_filter(profile_name);
        count_documents(&self.pool, PROVISION_WATCHER_TABLE, Some(&filter)).await
    }
}
