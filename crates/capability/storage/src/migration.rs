//! Schema 迁移
//!
//! 启动时执行一次，步骤：
//! 1. 获取服务标识的互斥咨询锁，拿不到则启动失败
//! 2. 在一个事务中执行全部幂等脚本
//! 3. 确保迁移台账表存在
//! 4. 读取最近一条 SUCCESS 版本；台账为空时写入种子版本
//! 5. 台账版本高于服务版本时拒绝启动
//! 6. 按版本升序执行高于台账版本的目录，每个目录一个事务，成功写 SUCCESS，失败写 FAILURE 并中止
//! 7. 释放咨询锁（失败只记日志）

use crate::advisory_lock::AdvisoryLock;
use crate::connection::Database;
use crate::error::StorageError;
use crate::scripts::{EmbeddedScripts, FsScripts, Script, ScriptSource, VersionDir};
use edge_config::StorageConfig;
use edge_telemetry::SharedLogger;
use semver::Version;
use sqlx::{PgPool, Row};

pub const MIGRATION_TABLE: &str = "schema_migrations";

/// 引入迁移台账时的版本；注意 `4.0.0-dev < 4.0.0`。
pub const INITIAL_VERSION: &str = "4.0.0-dev";

/// 开发构建的服务版本。
pub const DEVELOPMENT_SERVICE_VERSION: &str = "0.0.0";

/// 开发构建写入台账的种子版本，保证与 `0.0.0` 比较时更旧。
pub const DEVELOPMENT_SEED_VERSION: &str = "0.0.0-dev";

/// 台账记录状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    Success,
    Failure,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Success => "SUCCESS",
            MigrationStatus::Failure => "FAILURE",
        }
    }
}

pub fn is_development_build(service_version: &Version) -> bool {
    *service_version == Version::new(0, 0, 0)
}

/// 台账为空时的种子版本。开发构建与正式版本走不同路径。
pub fn seed_version(service_version: &Version) -> Version {
    let seed = if is_development_build(service_version) {
        DEVELOPMENT_SEED_VERSION
    } else {
        INITIAL_VERSION
    };
    Version::parse(seed).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// 迁移计划。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// 需要写入台账的种子版本（台账为空时）
    pub seed: Option<Version>,
    /// 迁移前的台账版本
    pub current: Version,
    /// 待执行的版本目录（升序）
    pub pending: Vec<VersionDir>,
}

/// 根据台账版本、服务版本与可用版本目录计算迁移计划。
///
/// 正式版本只执行 `(台账版本, 服务版本]` 区间内的目录；开发构建执行所有高于台账版本的目录，
/// 且不做"台账版本高于服务版本"的检查。
pub fn plan_migration(
    db_version: Option<Version>,
    service_version: &Version,
    available: Vec<VersionDir>,
) -> Result<MigrationPlan, StorageError> {
    let development = is_development_build(service_version);
    let (seed, current) = match db_version {
        Some(version) => (None, version),
        None => {
            let seed = seed_version(service_version);
            (Some(seed.clone()), seed)
        }
    };

    if !development && current > *service_version {
        return Err(StorageError::server(format!(
            "the most recent successful version record ({current}) in {MIGRATION_TABLE} table \
             is above service version {service_version}"
        )));
    }

    let mut pending: Vec<VersionDir> = available
        .into_iter()
        .filter(|dir| dir.version > current)
        .filter(|dir| development || dir.version <= *service_version)
        .collect();
    pending.sort_by(|a, b| a.version.cmp(&b.version));

    Ok(MigrationPlan {
        seed,
        current,
        pending,
    })
}

/// 迁移结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub previous: Version,
    pub applied: Vec<Version>,
}

/// Schema 迁移管理器。
pub struct MigrationManager<S> {
    pool: PgPool,
    source: S,
    logger: SharedLogger,
    schema: String,
    service_key: String,
    service_version: Version,
}

impl<S: ScriptSource> MigrationManager<S> {
    pub fn new(
        pool: PgPool,
        source: S,
        logger: SharedLogger,
        schema: impl Into<String>,
        service_key: impl Into<String>,
        service_version: &str,
    ) -> Result<Self, StorageError> {
        let service_version = Version::parse(service_version).map_err(|err| {
            StorageError::invalid(format!(
                "failed to parse service version {service_version}: {err}"
            ))
        })?;
        Ok(Self {
            pool,
            source,
            logger,
            schema: schema.into(),
            service_key: service_key.into(),
            service_version,
        })
    }

    fn ledger(&self) -> String {
        format!("\"{}\".{MIGRATION_TABLE}", self.schema)
    }

    /// 执行完整迁移流程。
    pub async fn run(&self) -> Result<MigrationReport, StorageError> {
        let lock = AdvisoryLock::new(self.pool.clone(), self.service_key.clone());
        let locked = lock.lock().await.map_err(|err| {
            err.context(format!(
                "error while acquiring advisory lock for {}",
                self.service_key
            ))
        })?;
        if !locked {
            return Err(StorageError::database(format!(
                "could not acquire advisory lock for {}, ensure no other instance is migrating and try again",
                self.service_key
            )));
        }

        let result = self.run_locked().await;

        if let Err(err) = lock.unlock().await {
            self.logger.error(&format!(
                "failed to release advisory lock for {}: {err}",
                self.service_key
            ));
        }
        result
    }

    async fn run_locked(&self) -> Result<MigrationReport, StorageError> {
        let idempotent = self.source.idempotent_scripts()?;
        self.logger.debug(&format!(
            "{} executing {} idempotent scripts",
            self.service_key,
            idempotent.len()
        ));
        execute_scripts(&self.pool, &idempotent).await.map_err(|err| {
            err.context(format!(
                "{} failed to execute idempotent sql scripts",
                self.service_key
            ))
        })?;

        self.ensure_ledger().await?;
        let db_version = self.most_recent_success().await?;
        let plan = plan_migration(
            db_version,
            &self.service_version,
            self.source.versions()?,
        )
        .map_err(|err| err.context(&self.service_key))?;

        if let Some(seed) = &plan.seed {
            self.insert_record(seed, MigrationStatus::Success)
                .await
                .map_err(|err| {
                    err.context(format!("{} failed to insert initial version", self.service_key))
                })?;
        }

        let mut applied = Vec::new();
        if !plan.pending.is_empty() {
            self.logger.info(&format!(
                "db schema version: {}, service version: {}, {} applying {} migration(s)",
                plan.current,
                self.service_version,
                self.service_key,
                plan.pending.len()
            ));
        }
        for dir in &plan.pending {
            self.apply_version(dir).await?;
            applied.push(dir.version.clone());
        }

        self.logger.info(&format!(
            "{} successfully applied SQL scripts",
            self.service_key
        ));
        Ok(MigrationReport {
            previous: plan.current,
            applied,
        })
    }

    async fn apply_version(&self, dir: &VersionDir) -> Result<(), StorageError> {
        self.logger
            .info(&format!("applying migration scripts for version {}", dir.version));
        let outcome = match self.source.version_scripts(dir) {
            Ok(scripts) => execute_scripts(&self.pool, &scripts).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => self
                .insert_record(&dir.version, MigrationStatus::Success)
                .await
                .map_err(|err| {
                    err.context(format!(
                        "{} applied version {} but failed to record success",
                        self.service_key, dir.version
                    ))
                }),
            Err(err) => {
                self.logger.error(&format!(
                    "{} failed to apply migration scripts for version {}: {err}",
                    self.service_key, dir.version
                ));
                match self.insert_record(&dir.version, MigrationStatus::Failure).await {
                    Ok(()) => Err(err.context(format!(
                        "{} failed to apply migration scripts for version {}",
                        self.service_key, dir.version
                    ))),
                    Err(insert_err) => Err(err.context(format!(
                        "{} failed to apply migration scripts for version {} and also failed to \
                         insert failure record into {MIGRATION_TABLE} table ({insert_err})",
                        self.service_key, dir.version
                    ))),
                }
            }
        }
    }

    async fn ensure_ledger(&self) -> Result<(), StorageError> {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(&self.schema)
        .bind(MIGRATION_TABLE)
        .fetch_one(&self.pool)
        .await?
        .try_get(0)?;
        if exists {
            return Ok(());
        }
        let statement = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id SERIAL PRIMARY KEY, \
             version TEXT NOT NULL, \
             status TEXT NOT NULL, \
             created TIMESTAMPTZ NOT NULL DEFAULT NOW())",
            self.ledger()
        );
        sqlx::raw_sql(&statement)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                StorageError::from(err).context(format!("failed to create {MIGRATION_TABLE} table"))
            })?;
        Ok(())
    }

    /// 最近一条 SUCCESS 记录的版本。
    pub async fn most_recent_success(&self) -> Result<Option<Version>, StorageError> {
        let statement = format!(
            "SELECT version FROM {} WHERE status = $1 ORDER BY created DESC, id DESC LIMIT 1",
            self.ledger()
        );
        let row = sqlx::query(&statement)
            .bind(MigrationStatus::Success.as_str())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let version: String = row.try_get("version")?;
        Version::parse(&version).map(Some).map_err(|err| {
            StorageError::server(format!(
                "invalid version '{version}' in {MIGRATION_TABLE} table: {err}"
            ))
        })
    }

    async fn insert_record(
        &self,
        version: &Version,
        status: MigrationStatus,
    ) -> Result<(), StorageError> {
        let statement = format!("INSERT INTO {}(version, status) VALUES ($1, $2)", self.ledger());
        sqlx::query(&statement)
            .bind(version.to_string())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// 在一个事务中依次执行脚本，任何一个失败则整体回滚。
pub async fn execute_scripts(pool: &PgPool, scripts: &[Script]) -> Result<(), StorageError> {
    if scripts.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for script in scripts {
        sqlx::raw_sql(&script.sql)
            .execute(&mut *tx)
            .await
            .map_err(|err| StorageError::from(err).context(format!("script {}", script.name)))?;
    }
    tx.commit().await?;
    Ok(())
}

/// 按配置执行迁移：设置了 `sql_scripts_dir` 时从磁盘读取脚本，否则使用内置脚本。
pub async fn migrate(
    database: &Database,
    config: &StorageConfig,
    logger: SharedLogger,
) -> Result<MigrationReport, StorageError> {
    let pool = database.pool().clone();
    match &config.sql_scripts_dir {
        Some(dir) => {
            MigrationManager::new(
                pool,
                FsScripts::new(dir.clone()),
                logger,
                config.schema.clone(),
                config.service_key.clone(),
                &config.service_version,
            )?
            .run()
            .await
        }
        None => {
            MigrationManager::new(
                pool,
                EmbeddedScripts::new(),
                logger,
                config.schema.clone(),
                config.service_key.clone(),
                &config.service_version,
            )?
            .run()
            .await
        }
    }
}
