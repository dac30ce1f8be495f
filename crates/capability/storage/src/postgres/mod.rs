//! # PostgreSQL 存储实现
//!
//! - `document`：文档型实体（`id` + `content JSONB`）的通用读写
//! - `telemetry`：事件与读数，含设备信息代理键与两阶段删除
//! - `metadata`：设备服务、设备描述文件、设备、发现规则
//! - `notification`：通知、订阅、发送记录
//! - `scheduler`：调度任务与执行记录
//! - `keeper`：配置中心 KV 与密钥存储
//!
//! 所有语句经 [`crate::sql`] 生成并使用位置参数绑定。

pub mod document;
pub mod keeper;
pub mod metadata;
pub mod notification;
pub mod scheduler;
pub mod telemetry;

pub use keeper::*;
pub use metadata::*;
pub use notification::*;
pub use scheduler::*;
pub use telemetry::PgTelemetryStore;
