//! 元数据内存存储实现
//!
//! 设备存储持有设备服务表与描述文件表的共享引用，新增设备时做与 Postgres 相同的存在性校验。

use super::document::DocumentTable;
use crate::device_tree::{self, DeviceLevels};
use crate::error::StorageError;
use crate::postgres::document::labels_filter;
use crate::postgres::metadata::tree_level_filter;
use crate::traits::{DeviceProfileStore, DeviceServiceStore, DeviceStore, ProvisionWatcherStore};
use domain::{Device, DeviceProfile, DeviceService, ProvisionWatcher};
use serde_json::json;
use std::sync::Arc;

/// 设备服务内存存储
#[derive(Debug, Default)]
pub struct InMemoryDeviceServiceStore {
    services: Arc<DocumentTable<DeviceService>>,
}

impl InMemoryDeviceServiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DeviceServiceStore for InMemoryDeviceServiceStore {
    async fn add_device_service(
        &self,
        service: DeviceService,
    ) -> Result<DeviceService, StorageError> {
        self.services.insert(service)
    }

    async fn device_service_by_id(&self, id: &str) -> Result<DeviceService, StorageError> {
        self.services.by_id(id)
    }

    async fn device_service_by_name(&self, name: &str) -> Result<DeviceService, StorageError> {
        self.services.by_name(name)
    }

    async fn all_device_services(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<DeviceService>, StorageError> {
        self.services
            .list(labels_filter(labels).as_ref(), offset, limit)
    }

    async fn update_device_service(&self, service: DeviceService) -> Result<(), StorageError> {
        self.services.update_by_name(service)
    }

    async fn delete_device_service_by_id(&self, id: &str) -> Result<(), StorageError> {
        self.services.delete_by_id(id)
    }

    async fn delete_device_service_by_name(&self, name: &str) -> Result<(), StorageError> {
        self.services.delete_by_name(name)
    }

    async fn device_service_name_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.services.name_exists(name))
    }

    async fn device_service_count_by_labels(
        &self,
        labels: &[String],
    ) -> Result<u64, StorageError> {
        self.services.count(labels_filter(labels).as_ref())
    }
}

/// 设备描述文件内存存储
#[derive(Debug, Default)]
pub struct InMemoryDeviceProfileStore {
    profiles: Arc<DocumentTable<DeviceProfile>>,
}

impl InMemoryDeviceProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DeviceProfileStore for InMemoryDeviceProfileStore {
    async fn add_device_profile(
        &self,
        profile: DeviceProfile,
    ) -> Result<DeviceProfile, StorageError> {
        self.profiles.insert(profile)
    }

    async fn device_profile_by_id(&self, id: &str) -> Result<DeviceProfile, StorageError> {
        self.profiles.by_id(id)
    }

    async fn device_profile_by_name(&self, name: &str) -> Result<DeviceProfile, StorageError> {
        self.profiles.by_name(name)
    }

    async fn all_device_profiles(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<DeviceProfile>, StorageError> {
        self.profiles
            .list(labels_filter(labels).as_ref(), offset, limit)
    }

    async fn device_profiles_by_model(
        &self,
        model: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError> {
        self.profiles
            .list(Some(&json!({ "model": model })), offset, limit)
    }

    async fn device_profiles_by_manufacturer(
        &self,
        manufacturer: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError> {
        self.profiles
            .list(Some(&json!({ "manufacturer": manufacturer })), offset, limit)
    }

    async fn device_profiles_by_manufacturer_and_model(
        &self,
        manufacturer: &str,
        model: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError> {
        let filter = json!({ "manufacturer": manufacturer, "model": model });
        self.profiles.list(Some(&filter), offset, limit)
    }

    async fn update_device_profile(&self, profile: DeviceProfile) -> Result<(), StorageError> {
        self.profiles.update_by_name(profile)
    }

    async fn delete_device_profile_by_id(&self, id: &str) -> Result<(), StorageError> {
        self.profiles.delete_by_id(id)
    }

    async fn delete_device_profile_by_name(&self, name: &str) -> Result<(), StorageError> {
        self.profiles.delete_by_name(name)
    }

    async fn device_profile_name_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.profiles.name_exists(name))
    }

    async fn device_profile_count_by_labels(
        &self,
        labels: &[String],
    ) -> Result<u64, StorageError> {
        self.profiles.count(labels_filter(labels).as_ref())
    }

    async fn device_profile_count_by_model(&self, model: &str) -> Result<u64, StorageError> {
        self.profiles.count(Some(&json!({ "model": model })))
    }

    async fn device_profile_count_by_manufacturer(
        &self,
        manufacturer: &str,
    ) -> Result<u64, StorageError> {
        self.profiles
            .count(Some(&json!({ "manufacturer": manufacturer })))
    }
}

/// 设备内存存储
#[derive(Debug)]
pub struct InMemoryDeviceStore {
    devices: DocumentTable<Device>,
    services: Arc<DocumentTable<DeviceService>>,
    profiles: Arc<DocumentTable<DeviceProfile>>,
}

impl InMemoryDeviceStore {
    /// 与给定的设备服务、描述文件存储共享数据。
    pub fn new(services: &InMemoryDeviceServiceStore, profiles: &InMemoryDeviceProfileStore) -> Self {
        Self {
            devices: DocumentTable::new(),
            services: services.services.clone(),
            profiles: profiles.profiles.clone(),
        }
    }
}

#[async_trait::async_trait]
impl DeviceLevels for InMemoryDeviceStore {
    async fn child_devices(
        &self,
        parent: &str,
        labels: &[String],
    ) -> Result<Vec<Device>, StorageError> {
        self.devices
            .list(Some(&tree_level_filter(parent, labels)), 0, -1)
    }
}

#[async_trait::async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn add_device(&self, device: Device) -> Result<Device, StorageError> {
        if !self.services.name_exists(&device.service_name) {
            return Err(StorageError::not_found(format!(
                "device service '{}' does not exist",
                device.service_name
            )));
        }
        if !self.profiles.name_exists(&device.profile_name) {
            return Err(StorageError::not_found(format!(
                "device profile '{}' does not exist",
                device.profile_name
            )));
        }
        self.devices.insert(device)
    }

    async fn device_by_id(&self, id: &str) -> Result<Device, StorageError> {
        self.devices.by_id(id)
    }

    async fn device_by_name(&self, name: &str) -> Result<Device, StorageError> {
        self.devices.by_name(name)
    }

    async fn all_devices(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<Device>, StorageError> {
        self.devices
            .list(labels_filter(labels).as_ref(), offset, limit)
    }

    async fn devices_by_service_name(
        &self,
        service_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Device>, StorageError> {
        self.devices
            .list(Some(&json!({ "serviceName": service_name })), offset, limit)
    }

    async fn devices_by_profile_name(
        &self,
        profile_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Device>, StorageError> {
        self.devices
            .list(Some(&json!({ "profileName": profile_name })), offset, limit)
    }

    async fn update_device(&self, device: Device) -> Result<(), StorageError> {
        self.devices.update_by_name(device)
    }

    async fn delete_device_by_id(&self, id: &str) -> Result<(), StorageError> {
        self.devices.delete_by_id(id)
    }

    async fn delete_device_by_name(&self, name: &str) -> Result<(), StorageError> {
        self.devices.delete_by_name(name)
    }

    async fn device_id_exists(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.devices.id_exists(id))
    }

    async fn device_name_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.devices.name_exists(name))
    }

    async fn device_count_by_labels(&self, labels: &[String]) -> Result<u64, StorageError> {
        self.devices.count(labels_filter(labels).as_ref())
    }

    async fn device_count_by_profile_name(
        &self,
        profile_name: &str,
    ) -> Result<u64, StorageError> {
        self.devices
            .count(Some(&json!({ "profileName": profile_name })))
    }

    async fn device_count_by_service_name(
        &self,
        service_name: &str,
    ) -> Result<u64, StorageError> {
        self.devices
            .count(Some(&json!({ "serviceName": service_name })))
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

/// 自动发现规则内存存储
#[derive(Debug, Default)]
pub struct InMemoryProvisionWatcherStore {
    watchers: DocumentTable<ProvisionWatcher>,
}

impl InMemoryProvisionWatcherStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn watcher_profile_filter(profile_name: &str) -> serde_json::Value {
    json!({ "discoveredDevice": { "profileName": profile_name } })
}

#[async_trait::async_trait]
impl ProvisionWatcherStore for InMemoryProvisionWatcherStore {
    async fn add_provision_watcher(
        &self,
        watcher: ProvisionWatcher,
    ) -> Result<ProvisionWatcher, StorageError> {
        self.watchers.insert(watcher)
    }

    async fn provision_watcher_by_id(&self, id: &str) -> Result<ProvisionWatcher, StorageError> {
        self.watchers.by_id(id)
    }

    async fn provision_watcher_by_name(
        &self,
        name: &str,
    ) -> Result<ProvisionWatcher, StorageError> {
        self.watchers.by_name(name)
    }

    async fn all_provision_watchers(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<ProvisionWatcher>, StorageError> {
        self.watchers
            .list(labels_filter(labels).as_ref(), offset, limit)
    }

    async fn provision_watchers_by_service_name(
        &self,
        service_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ProvisionWatcher>, StorageError> {
        self.watchers
            .list(Some(&json!({ "serviceName": service_name })), offset, limit)
    }

    async fn provision_watchers_by_profile_name(
        &self,
        profile_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ProvisionWatcher>, StorageError> {
        self.watchers
            .list(Some(&watcher_profile_filter(profile_name)), offset, limit)
    }

    async fn update_provision_watcher(
        &self,
        watcher: ProvisionWatcher,
    ) -> Result<(), StorageError> {
        self.watchers.update_by_name(watcher)
    }

    async fn delete_provision_watcher_by_name(&self, name: &str) -> Result<(), StorageError> {
        self.watchers.delete_by_name(name)
    }

    async fn provision_watcher_count_by_labels(
        &self,
        labels: &[String],
    ) -> Result<u64, StorageError> {
        self.watchers.count(labels_filter(labels).as_ref())
    }

    async fn provision_watcher_count_by_service_name(
        &self,
        service_name: &str,
    ) -> Result<u64, StorageError> {
        self.watchers
            .count(Some(&json!({ "serviceName": service_name })))
    }

    async fn provision_watcher_count_by_profile_name(
        &self,
        profile_name: &str,
    ) -> Result<u64, StorageError> {
        self.watchers
            .count(Some(&watcher_profile_filter(profile_name)))
    }
}
