//! 存储层数据模型
//!
//! - Document：文档型实体（以整份 JSON 存入 `content` 列）的公共访问接口
//! - AggregateFilter：读数聚合查询的过滤条件

use domain::{
    Device, DeviceProfile, DeviceService, Notification, ProvisionWatcher, ScheduleJob,
    Subscription, Transmission,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// 文档型实体。
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 实体种类名（用于错误信息）。
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    /// 唯一名称；没有名称的实体返回空串。
    fn name(&self) -> &str;

    fn created(&self) -> i64;
    fn set_created(&mut self, created: i64);
    fn set_modified(&mut self, modified: i64);

    /// 补全 id 并盖上创建/修改时间戳。
    fn prepare_insert(&mut self, now: i64) {
        if self.id().is_empty() {
            self.set_id(uuid::Uuid::new_v4().to_string());
        }
        if self.created() == 0 {
            self.set_created(now);
        }
        self.set_modified(now);
    }
}

macro_rules! named_document {
    ($ty:ty, $kind:literal) => {
        impl Document for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn created(&self) -> i64 {
                self.created
            }

            fn set_created(&mut self, created: i64) {
                self.created = created;
            }

            fn set_modified(&mut self, modified: i64) {
                self.modified = modified;
            }
        }
    };
}

named_document!(DeviceService, "device service");
named_document!(DeviceProfile, "device profile");
named_document!(Device, "device");
named_document!(ProvisionWatcher, "provision watcher");
named_document!(Subscription, "subscription");
named_document!(ScheduleJob, "schedule job");

impl Document for Notification {
    const KIND: &'static str = "notification";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        ""
    }

    fn created(&self) -> i64 {
        self.created
    }

    fn set_created(&mut self, created: i64) {
        self.created = created;
    }

    fn set_modified(&mut self, modified: i64) {
        self.modified = modified;
    }
}

// 投递记录没有 modified 字段
impl Document for Transmission {
    const KIND: &'static str = "transmission";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        ""
    }

    fn created(&self) -> i64 {
        self.created
    }

    fn set_created(&mut self, created: i64) {
        self.created = created;
    }

    fn set_modified(&mut self, _modified: i64) {}
}

/// 读数聚合的过滤条件；`None` 表示不限制。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateFilter {
    pub device_name: Option<String>,
    pub resource_name: Option<String>,
    /// 时间范围下界（origin，含）
    pub start: Option<i64>,
    /// 时间范围上界（origin，含）
    pub end: Option<i64>,
}

impl AggregateFilter {
    pub fn device(device_name: impl Into<String>) -> Self {
        Self {
            device_name: Some(device_name.into()),
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = Some(resource_name.into());
        self
    }

    pub fn with_time_range(mut self, start: i64, end: i64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}
