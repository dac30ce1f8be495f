//! 存储引擎运行配置加载。

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 存储引擎运行配置。
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    /// 服务标识，同时作为迁移咨询锁的键来源
    pub service_key: String,
    /// 运行中服务的语义化版本；`0.0.0` 表示开发构建
    pub service_version: String,
    /// 迁移台账所在 schema
    pub schema: String,
    /// 迁移脚本目录（覆盖内置脚本）
    pub sql_scripts_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;
    pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;
    pub const DEFAULT_SERVICE_KEY: &'static str = "core-data";
    pub const DEFAULT_SERVICE_VERSION: &'static str = "0.0.0";
    pub const DEFAULT_SCHEMA: &'static str = "core_data";

    /// 以默认值构造（测试与嵌入式场景使用）。
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            connect_timeout_seconds: Self::DEFAULT_CONNECT_TIMEOUT_SECONDS,
            service_key: Self::DEFAULT_SERVICE_KEY.to_string(),
            service_version: Self::DEFAULT_SERVICE_VERSION.to_string(),
            schema: Self::DEFAULT_SCHEMA.to_string(),
            sql_scripts_dir: None,
        }
    }

    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// 先加载 `.env`（若存在），再从环境变量读取配置。
    pub fn from_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// 从给定的键值表读取配置。
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_source(|key| values.get(key).cloned())
    }

    fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let source = Source { lookup };
        let database_url = source
            .optional("EDGE_DATABASE_URL")
            .ok_or_else(|| ConfigError::Missing("EDGE_DATABASE_URL".to_string()))?;
        let max_connections =
            source.u32_with_default("EDGE_DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid(
                "EDGE_DB_MAX_CONNECTIONS".to_string(),
                "0".to_string(),
            ));
        }
        let connect_timeout_seconds = source.u64_with_default(
            "EDGE_DB_CONNECT_TIMEOUT_SECONDS",
            Self::DEFAULT_CONNECT_TIMEOUT_SECONDS,
        )?;
        let service_key = source
            .optional("EDGE_SERVICE_KEY")
            .unwrap_or_else(|| Self::DEFAULT_SERVICE_KEY.to_string());
        let service_version = source
            .optional("EDGE_SERVICE_VERSION")
            .unwrap_or_else(|| Self::DEFAULT_SERVICE_VERSION.to_string());
        let schema = source
            .optional("EDGE_DB_SCHEMA")
            .unwrap_or_else(|| Self::DEFAULT_SCHEMA.to_string());
        if !is_identifier(&schema) {
            return Err(ConfigError::Invalid("EDGE_DB_SCHEMA".to_string(), schema));
        }
        let sql_scripts_dir = source.optional("EDGE_SQL_SCRIPTS_DIR").map(PathBuf::from);

        Ok(Self {
            database_url,
            max_connections,
            connect_timeout_seconds,
            service_key,
            service_version,
            schema,
            sql_scripts_dir,
        })
    }
}

/// schema 名会拼进 SQL，只允许小写标识符。
fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

struct Source<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Source<F> {
    fn optional(&self, key: &str) -> Option<String> {
        match (self.lookup)(key) {
            Some(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn u32_with_default(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
        let value = match self.optional(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        value
            .parse::<u32>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn u64_with_default(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        let value = match self.optional(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }
}
