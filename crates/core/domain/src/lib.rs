//! 领域模型：所有仓储共享的纯数据结构。
//!
//! 本 crate 不做任何 I/O；存储层接收并返回这里定义的结构体。

pub mod data;
pub mod keeper;
pub mod metadata;
pub mod notification;
pub mod scheduler;

pub use data::{
    AggregateFunc, Event, NumericClass, NumericValue, Reading, ReadingValue, Tags,
    UnknownValueType, ValueType,
};
pub use keeper::{KeyData, KeyValue, KvResponse};
pub use metadata::{
    AdminState, AutoEvent, Device, DeviceCommand, DeviceProfile, DeviceResource, DeviceService,
    DiscoveredDevice, OperatingState, ProtocolProperties, ProvisionWatcher, ResourceProperties,
};
pub use notification::{
    Notification, NotificationStatus, Severity, Subscription, Transmission, TransmissionRecord,
    TransmissionStatus,
};
pub use scheduler::{ActionStatus, ScheduleActionRecord, ScheduleJob};

/// 当前时间（Unix 毫秒）。
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or_default()
}
