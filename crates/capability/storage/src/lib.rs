//! # Edge Storage 模块
//!
//! 物联网平台的持久化引擎，基于 PostgreSQL。
//!
//! ## 架构设计
//!
//! 1. **语句构建层** (`sql.rs`)：纯函数生成参数化 SQL，占位符从 `$1` 连续编号
//! 2. **连接管理层** (`connection.rs`)：连接池的建立、探活、一次性共享初始化与关闭
//! 3. **协调层** (`advisory_lock.rs`)：基于会话级咨询锁的跨进程互斥
//! 4. **迁移层** (`migration.rs` + `scripts.rs`)：幂等脚本 + 按语义化版本升级
//! 5. **编解码层**：
//!    - `numeric.rs`：数值读数与 NUMERIC 列的无损互转、聚合结果类型提升
//!    - `copy.rs`：`COPY ... FROM STDIN` 的 CSV 行编码
//!    - `keeper.rs`：KV 值的 base64 编码与层级展开
//! 6. **身份缓存** (`device_info.rs`)：描述属性元组 → 代理键；`device_tree.rs`：设备层级树
//! 7. **接口抽象层** (`traits.rs`)：所有仓储的异步 Trait
//! 8. **实现层**：
//!    - `postgres/`：PostgreSQL 实现（生产使用）
//!    - `in_memory/`：内存实现（测试使用）
//!
//! ## 错误处理
//!
//! 所有操作返回 `Result<T, StorageError>`，错误种类见 [`ErrorKind`]。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use edge_config::StorageConfig;
//! use edge_storage::{Database, EventStore, PgTelemetryStore};
//! use edge_telemetry::TracingLoggingClient;
//!
//! let config = StorageConfig::from_env()?;
//! let database = Database::connect(&config).await?;
//! let store = PgTelemetryStore::new(database.pool().clone(), TracingLoggingClient::shared("core-data"));
//!
//! let events = store.events_by_device_name("thermostat-01", 0, 20).await?;
//! ```

pub mod advisory_lock;
pub mod batch;
pub mod connection;
pub mod copy;
pub mod deletion;
pub mod device_info;
pub mod device_tree;
pub mod error;
pub mod in_memory;
pub mod keeper;
pub mod migration;
pub mod models;
pub mod numeric;
pub mod postgres;
pub mod scripts;
pub mod sql;
pub mod traits;

pub use advisory_lock::AdvisoryLock;
pub use batch::{BatchOutcome, ItemOutcome};
pub use connection::*;
pub use deletion::{DeletionJob, DeletionSummary};
pub use device_info::{DeviceInfo, DeviceInfoCache, DeviceInfoStore};
pub use device_tree::DeviceLevels;
pub use error::*;
pub use migration::{MigrationManager, MigrationPlan, MigrationReport, MigrationStatus, migrate};
pub use models::*;
pub use scripts::{EmbeddedScripts, FsScripts, Script, ScriptSource, VersionDir};
pub use traits::*;

// 导出内存存储实现类型
pub use in_memory::{
    InMemoryDeviceProfileStore, InMemoryDeviceServiceStore, InMemoryDeviceStore, InMemoryKvStore,
    InMemoryProvisionWatcherStore, InMemoryTelemetryStore,
};

// 导出 PostgreSQL 存储实现类型
pub use postgres::{
    PgDeviceProfileStore, PgDeviceServiceStore, PgDeviceStore, PgKeyStore, PgKvStore,
    PgNotificationStore, PgProvisionWatcherStore, PgScheduleActionRecordStore,
    PgScheduleJobStore, PgSubscriptionStore, PgTelemetryStore, PgTransmissionStore,
};
