//! 存储接口 Trait 定义
//!
//! 每个实体族一个仓储接口，外部协作方只通过这些接口访问存储：
//! - 遥测：EventStore、ReadingStore
//! - 元数据：DeviceServiceStore、DeviceProfileStore、DeviceStore、ProvisionWatcherStore
//! - 通知：NotificationStore、SubscriptionStore、TransmissionStore
//! - 调度：ScheduleJobStore、ScheduleActionRecordStore
//! - 配置中心：KvStore；密钥：KeyStore
//!
//! 约定：
//! - 分页参数 `offset`/`limit`，`limit = -1` 表示不限制
//! - 偏移量超出数据范围时返回 EntityDoesNotExist
//! - 计数一律为 `u64`
//! - 所有接口返回 StorageError

use crate::batch::BatchOutcome;
use crate::deletion::DeletionJob;
use crate::error::StorageError;
use crate::models::AggregateFilter;
use async_trait::async_trait;
use domain::{
    ActionStatus, AggregateFunc, Device, DeviceProfile, DeviceService, Event, KeyValue,
    KvResponse, Notification, NotificationStatus, ProvisionWatcher, Reading,
    ScheduleActionRecord, ScheduleJob, Subscription, Transmission, TransmissionStatus,
};

// ----------------------------------------------------------------------------
// 遥测
// ----------------------------------------------------------------------------

/// 事件存储接口
///
/// 按设备/数据源/时间的删除先同步做逻辑删除，再返回后台物理删除任务。
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 写入事件及其全部读数（单事务）
    async fn add_event(&self, event: Event) -> Result<Event, StorageError>;

    async fn event_by_id(&self, id: &str) -> Result<Event, StorageError>;

    async fn all_events(&self, offset: i64, limit: i64) -> Result<Vec<Event>, StorageError>;

    async fn events_by_device_name(
        &self,
        device_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError>;

    async fn events_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError>;

    async fn event_total_count(&self) -> Result<u64, StorageError>;

    async fn event_count_by_device_name(&self, device_name: &str) -> Result<u64, StorageError>;

    async fn event_count_by_time_range(&self, start: i64, end: i64)
    -> Result<u64, StorageError>;

    /// 同步删除事件及其读数
    async fn delete_event_by_id(&self, id: &str) -> Result<(), StorageError>;

    async fn delete_events_by_device_name(
        &self,
        device_name: &str,
    ) -> Result<DeletionJob, StorageError>;

    async fn delete_events_by_device_name_and_source(
        &self,
        device_name: &str,
        source_name: &str,
    ) -> Result<DeletionJob, StorageError>;

    /// 删除 origin 早于 `now - age`（纳秒）的事件
    async fn delete_events_by_age(&self, age: i64) -> Result<DeletionJob, StorageError>;
}

/// 读数存储接口
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn all_readings(&self, offset: i64, limit: i64) -> Result<Vec<Reading>, StorageError>;

    async fn readings_by_resource_name(
        &self,
        resource_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError>;

    async fn readings_by_device_name(
        &self,
        device_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError>;

    async fn readings_by_device_name_and_resource_name(
        &self,
        device_name: &str,
        resource_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError>;

    async fn readings_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError>;

    async fn readings_by_device_name_and_time_range(
        &self,
        device_name: &str,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError>;

    async fn readings_by_resource_name_and_time_range(
        &self,
        resource_name: &str,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError>;

    async fn readings_by_device_name_and_resource_name_and_time_range(
        &self,
        device_name: &str,
        resource_name: &str,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError>;

    async fn readings_by_device_name_and_resource_names_and_time_range(
        &self,
        device_name: &str,
        resource_names: &[String],
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError>;

    /// 按 origin 倒序的第 `offset` 条读数
    async fn latest_reading_by_offset(&self, offset: u32) -> Result<Reading, StorageError>;

    async fn reading_total_count(&self) -> Result<u64, StorageError>;

    async fn reading_count_by_device_name(&self, device_name: &str) -> Result<u64, StorageError>;

    async fn reading_count_by_resource_name(
        &self,
        resource_name: &str,
    ) -> Result<u64, StorageError>;

    async fn reading_count_by_device_name_and_resource_name(
        &self,
        device_name: &str,
        resource_name: &str,
    ) -> Result<u64, StorageError>;

    async fn reading_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    async fn reading_count_by_device_name_and_time_range(
        &self,
        device_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    async fn reading_count_by_resource_name_and_time_range(
        &self,
        resource_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    async fn reading_count_by_device_name_and_resource_name_and_time_range(
        &self,
        device_name: &str,
        resource_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    async fn reading_count_by_device_name_and_resource_names_and_time_range(
        &self,
        device_name: &str,
        resource_names: &[String],
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    /// 按设备/资源分组聚合数值读数，每组返回一条数值读数
    async fn readings_aggregate(
        &self,
        func: AggregateFunc,
        filter: &AggregateFilter,
    ) -> Result<Vec<Reading>, StorageError>;
}

// ----------------------------------------------------------------------------
// 元数据
// ----------------------------------------------------------------------------

/// 设备服务存储接口
#[async_trait]
pub trait DeviceServiceStore: Send + Sync {
    async fn add_device_service(
        &self,
        service: DeviceService,
    ) -> Result<DeviceService, StorageError>;

    async fn device_service_by_id(&self, id: &str) -> Result<DeviceService, StorageError>;

    async fn device_service_by_name(&self, name: &str) -> Result<DeviceService, StorageError>;

    async fn all_device_services(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<DeviceService>, StorageError>;

    async fn update_device_service(&self, service: DeviceService) -> Result<(), StorageError>;

    async fn delete_device_service_by_id(&self, id: &str) -> Result<(), StorageError>;

    async fn delete_device_service_by_name(&self, name: &str) -> Result<(), StorageError>;

    async fn device_service_name_exists(&self, name: &str) -> Result<bool, StorageError>;

    async fn device_service_count_by_labels(&self, labels: &[String])
    -> Result<u64, StorageError>;
}

/// 设备描述文件存储接口
#[async_trait]
pub trait DeviceProfileStore: Send + Sync {
    async fn add_device_profile(
        &self,
        profile: DeviceProfile,
    ) -> Result<DeviceProfile, StorageError>;

    async fn device_profile_by_id(&self, id: &str) -> Result<DeviceProfile, StorageError>;

    async fn device_profile_by_name(&self, name: &str) -> Result<DeviceProfile, StorageError>;

    async fn all_device_profiles(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<DeviceProfile>, StorageError>;

    async fn device_profiles_by_model(
        &self,
        model: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError>;

    async fn device_profiles_by_manufacturer(
        &self,
        manufacturer: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError>;

    async fn device_profiles_by_manufacturer_and_model(
        &self,
        manufacturer: &str,
        model: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DeviceProfile>, StorageError>;

    async fn update_device_profile(&self, profile: DeviceProfile) -> Result<(), StorageError>;

    async fn delete_device_profile_by_id(&self, id: &str) -> Result<(), StorageError>;

    async fn delete_device_profile_by_name(&self, name: &str) -> Result<(), StorageError>;

    async fn device_profile_name_exists(&self, name: &str) -> Result<bool, StorageError>;

    async fn device_profile_count_by_labels(&self, labels: &[String])
    -> Result<u64, StorageError>;

    async fn device_profile_count_by_model(&self, model: &str) -> Result<u64, StorageError>;

    async fn device_profile_count_by_manufacturer(
        &self,
        manufacturer: &str,
    ) -> Result<u64, StorageError>;
}

/// 设备存储接口
///
/// 新增设备要求其设备服务与描述文件均已存在。
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn add_device(&self, device: Device) -> Result<Device, StorageError>;

    async fn device_by_id(&self, id: &str) -> Result<Device, StorageError>;

    async fn device_by_name(&self, name: &str) -> Result<Device, StorageError>;

    async fn all_devices(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<Device>, StorageError>;

    async fn devices_by_service_name(
        &self,
        service_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Device>, StorageError>;

    async fn devices_by_profile_name(
        &self,
        profile_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Device>, StorageError>;

    async fn update_device(&self, device: Device) -> Result<(), StorageError>;

    async fn delete_device_by_id(&self, id: &str) -> Result<(), StorageError>;

    async fn delete_device_by_name(&self, name: &str) -> Result<(), StorageError>;

    async fn device_id_exists(&self, id: &str) -> Result<bool, StorageError>;

    async fn device_name_exists(&self, name: &str) -> Result<bool, StorageError>;

    async fn device_count_by_labels(&self, labels: &[String]) -> Result<u64, StorageError>;

    async fn device_count_by_profile_name(&self, profile_name: &str)
    -> Result<u64, StorageError>;

    async fn device_count_by_service_name(&self, service_name: &str)
    -> Result<u64, StorageError>;

    /// 以 `parent` 为根向下最多 `levels` 层（`<= 0` 不限）的设备，返回 `(总数, 当前页)`
    async fn device_tree(
        &self,
        parent: &str,
        levels: i64,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<(u64, Vec<Device>), StorageError>;
}

/// 自动发现规则存储接口
#[async_trait]
pub trait ProvisionWatcherStore: Send + Sync {
    async fn add_provision_watcher(
        &self,
        watcher: ProvisionWatcher,
    ) -> Result<ProvisionWatcher, StorageError>;

    async fn provision_watcher_by_id(&self, id: &str) -> Result<ProvisionWatcher, StorageError>;

    async fn provision_watcher_by_name(
        &self,
        name: &str,
    ) -> Result<ProvisionWatcher, StorageError>;

    async fn all_provision_watchers(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<ProvisionWatcher>, StorageError>;

    async fn provision_watchers_by_service_name(
        &self,
        service_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ProvisionWatcher>, StorageError>;

    async fn provision_watchers_by_profile_name(
        &self,
        profile_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ProvisionWatcher>, StorageError>;

    async fn update_provision_watcher(&self, watcher: ProvisionWatcher)
    -> Result<(), StorageError>;

    async fn delete_provision_watcher_by_name(&self, name: &str) -> Result<(), StorageError>;

    async fn provision_watcher_count_by_labels(
        &self,
        labels: &[String],
    ) -> Result<u64, StorageError>;

    async fn provision_watcher_count_by_service_name(
        &self,
        service_name: &str,
    ) -> Result<u64, StorageError>;

    async fn provision_watcher_count_by_profile_name(
        &self,
        profile_name: &str,
    ) -> Result<u64, StorageError>;
}

// ----------------------------------------------------------------------------
// 通知
// ----------------------------------------------------------------------------

/// 通知存储接口
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn add_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, StorageError>;

    async fn notification_by_id(&self, id: &str) -> Result<Notification, StorageError>;

    async fn notifications_by_category(
        &self,
        category: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError>;

    async fn notifications_by_label(
        &self,
        label: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError>;

    async fn notifications_by_status(
        &self,
        status: NotificationStatus,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError>;

    async fn notifications_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError>;

    /// 类别列表与标签列表同时给出时取交集
    async fn notifications_by_categories_and_labels(
        &self,
        categories: &[String],
        labels: &[String],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError>;

    /// 按 created 倒序的第 `offset` 条通知
    async fn latest_notification_by_offset(
        &self,
        offset: u32,
    ) -> Result<Notification, StorageError>;

    async fn update_notification(&self, notification: Notification) -> Result<(), StorageError>;

    /// 逐项更新确认状态，每个 id 一条结果
    async fn update_acknowledge_status(
        &self,
        ids: &[String],
        acknowledged: bool,
    ) -> Result<BatchOutcome<()>, StorageError>;

    async fn delete_notification_by_id(&self, id: &str) -> Result<(), StorageError>;

    /// 逐项删除，每个 id 一条结果
    async fn delete_notifications_by_ids(
        &self,
        ids: &[String],
    ) -> Result<BatchOutcome<()>, StorageError>;

    /// 删除 created 早于 `now - age`（毫秒）的全部通知
    async fn cleanup_notifications_by_age(&self, age: i64) -> Result<u64, StorageError>;

    /// 删除已处理且 created 早于 `now - age`（毫秒）的通知
    async fn delete_processed_notifications_by_age(&self, age: i64) -> Result<u64, StorageError>;

    async fn notification_total_count(&self) -> Result<u64, StorageError>;

    async fn notification_count_by_category(&self, category: &str) -> Result<u64, StorageError>;

    async fn notification_count_by_label(&self, label: &str) -> Result<u64, StorageError>;

    async fn notification_count_by_status(
        &self,
        status: NotificationStatus,
    ) -> Result<u64, StorageError>;

    async fn notification_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;
}

/// 订阅存储接口
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn add_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, StorageError>;

    async fn subscription_by_id(&self, id: &str) -> Result<Subscription, StorageError>;

    async fn subscription_by_name(&self, name: &str) -> Result<Subscription, StorageError>;

    async fn all_subscriptions(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError>;

    async fn subscriptions_by_category(
        &self,
        category: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError>;

    async fn subscriptions_by_label(
        &self,
        label: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError>;

    async fn subscriptions_by_receiver(
        &self,
        receiver: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError>;

    async fn subscriptions_by_categories_and_labels(
        &self,
        categories: &[String],
        labels: &[String],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError>;

    async fn update_subscription(&self, subscription: Subscription) -> Result<(), StorageError>;

    async fn delete_subscription_by_name(&self, name: &str) -> Result<(), StorageError>;

    async fn subscription_total_count(&self) -> Result<u64, StorageError>;

    async fn subscription_count_by_category(&self, category: &str)
    -> Result<u64, StorageError>;

    async fn subscription_count_by_label(&self, label: &str) -> Result<u64, StorageError>;

    async fn subscription_count_by_receiver(&self, receiver: &str)
    -> Result<u64, StorageError>;
}

/// 投递记录存储接口
#[async_trait]
pub trait TransmissionStore: Send + Sync {
    async fn add_transmission(
        &self,
        transmission: Transmission,
    ) -> Result<Transmission, StorageError>;

    async fn update_transmission(&self, transmission: Transmission) -> Result<(), StorageError>;

    async fn transmission_by_id(&self, id: &str) -> Result<Transmission, StorageError>;

    async fn all_transmissions(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError>;

    async fn transmissions_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError>;

    async fn transmissions_by_status(
        &self,
        status: TransmissionStatus,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError>;

    async fn transmissions_by_subscription_name(
        &self,
        subscription_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError>;

    async fn transmissions_by_notification_id(
        &self,
        notification_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError>;

    /// 删除状态为 SENT/ACKNOWLEDGED/ESCALATED 且 created 早于 `now - age`（毫秒）的记录
    async fn delete_processed_transmissions_by_age(&self, age: i64)
    -> Result<u64, StorageError>;

    async fn transmission_total_count(&self) -> Result<u64, StorageError>;

    async fn transmission_count_by_status(
        &self,
        status: TransmissionStatus,
    ) -> Result<u64, StorageError>;

    async fn transmission_count_by_subscription_name(
        &self,
        subscription_name: &str,
    ) -> Result<u64, StorageError>;

    async fn transmission_count_by_notification_id(
        &self,
        notification_id: &str,
    ) -> Result<u64, StorageError>;

    async fn transmission_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;
}

// ----------------------------------------------------------------------------
// 调度
// ----------------------------------------------------------------------------

/// 调度任务存储接口
#[async_trait]
pub trait ScheduleJobStore: Send + Sync {
    async fn add_schedule_job(&self, job: ScheduleJob) -> Result<ScheduleJob, StorageError>;

    async fn all_schedule_jobs(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<ScheduleJob>, StorageError>;

    async fn update_schedule_job(&self, job: ScheduleJob) -> Result<(), StorageError>;

    async fn delete_schedule_job_by_name(&self, name: &str) -> Result<(), StorageError>;

    async fn schedule_job_by_id(&self, id: &str) -> Result<ScheduleJob, StorageError>;

    async fn schedule_job_by_name(&self, name: &str) -> Result<ScheduleJob, StorageError>;

    async fn schedule_job_total_count(&self, labels: &[String]) -> Result<u64, StorageError>;
}

/// 动作执行记录存储接口
#[async_trait]
pub trait ScheduleActionRecordStore: Send + Sync {
    async fn add_schedule_action_record(
        &self,
        record: ScheduleActionRecord,
    ) -> Result<ScheduleActionRecord, StorageError>;

    /// 逐项写入，每条记录一条结果（键为记录 id）
    async fn add_schedule_action_records(
        &self,
        records: Vec<ScheduleActionRecord>,
    ) -> Result<BatchOutcome<ScheduleActionRecord>, StorageError>;

    async fn all_schedule_action_records(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError>;

    /// 指定任务下每个动作最近的一条记录
    async fn latest_schedule_action_records_by_job_name(
        &self,
        job_name: &str,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError>;

    async fn latest_schedule_action_record_by_offset(
        &self,
        offset: u32,
    ) -> Result<ScheduleActionRecord, StorageError>;

    async fn schedule_action_records_by_status(
        &self,
        status: ActionStatus,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError>;

    async fn schedule_action_records_by_job_name(
        &self,
        job_name: &str,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError>;

    async fn schedule_action_records_by_job_name_and_status(
        &self,
        job_name: &str,
        status: ActionStatus,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError>;

    async fn schedule_action_record_total_count(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    async fn schedule_action_record_count_by_status(
        &self,
        status: ActionStatus,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    async fn schedule_action_record_count_by_job_name(
        &self,
        job_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    async fn schedule_action_record_count_by_job_name_and_status(
        &self,
        job_name: &str,
        status: ActionStatus,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError>;

    /// 删除 created 早于 `now - age`（毫秒）的记录
    async fn delete_schedule_action_records_by_age(&self, age: i64) -> Result<u64, StorageError>;
}

// ----------------------------------------------------------------------------
// 配置中心与密钥
// ----------------------------------------------------------------------------

/// KV 存储接口
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 读取 `key` 本身及其下所有子键
    ///
    /// - `keys_only`：只返回键
    /// - `is_raw`：值做 base64 解码后返回原文
    async fn keeper_keys(
        &self,
        key: &str,
        keys_only: bool,
        is_raw: bool,
    ) -> Result<Vec<KvResponse>, StorageError>;

    /// 写入；`is_flatten` 时把嵌套对象展开为多条叶子记录，返回写入的键
    async fn add_keeper_keys(
        &self,
        kv: KeyValue,
        is_flatten: bool,
    ) -> Result<Vec<String>, StorageError>;

    /// 删除；有子键且未要求递归时返回 StatusConflict，返回被删除的键
    async fn delete_keeper_keys(
        &self,
        key: &str,
        is_recurse: bool,
    ) -> Result<Vec<String>, StorageError>;
}

/// 密钥存储接口
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn add_key(&self, name: &str, content: &str) -> Result<(), StorageError>;

    async fn update_key(&self, name: &str, content: &str) -> Result<(), StorageError>;

    async fn key_exists(&self, name: &str) -> Result<bool, StorageError>;

    async fn read_key_content(&self, name: &str) -> Result<String, StorageError>;

    async fn delete_key(&self, name: &str) -> Result<(), StorageError>;
}
