//! 数据库连接管理
//!
//! - Database：显式构造的连接池句柄，克隆后注入各仓储
//! - SharedDatabase：一次性初始化单元，首个调用者的初始化结果被所有并发调用者共享
//!
//! 连接池关闭（`close_session`）后，所有仓储调用返回 DatabaseError（connection unavailable）。

use crate::error::StorageError;
use edge_config::StorageConfig;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::sync::OnceCell;

/// 连接池句柄。
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 按配置建立连接池并 ping 一次，不可达时立即失败。
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.database_url)
            .await
            .map_err(|err| StorageError::from(err).context("failed to connect to database"))?;
        let database = Self { pool };
        database.ping().await?;
        Ok(database)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 关闭连接池并等待已借出的连接归还。
    pub async fn close_session(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// 一次性初始化的共享连接池。
///
/// 并发调用 `get` 时只有一个调用者执行连接，其余调用者等待并共享结果；
/// 初始化失败不会被缓存，下一次调用会重试。
#[derive(Debug)]
pub struct SharedDatabase {
    config: StorageConfig,
    cell: OnceCell<Database>,
}

impl SharedDatabase {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<Database, StorageError> {
        self.cell
            .get_or_try_init(|| Database::connect(&self.config))
            .await
            .cloned()
    }

    /// 已初始化时返回连接池，不触发连接。
    pub fn initialized(&self) -> Option<&Database> {
        self.cell.get()
    }

    pub async fn close_session(&self) {
        if let Some(database) = self.cell.get() {
            database.close_session().await;
        }
    }
}
