//! 存储层错误类型
//!
//! 所有仓储操作返回 `StorageError`，其中携带一个封闭集合的错误种类（`ErrorKind`）：
//! - EntityDoesNotExist：要求恰好一行却得到零行
//! - DuplicateName：唯一性冲突
//! - ContractInvalid：调用方数据违反结构前提
//! - StatusConflict：状态冲突（如 KV 前缀仍有子键）
//! - DatabaseError：其它数据库侧失败（含连接不可用）
//! - ServerError：本侧编解码失败

use std::fmt;

/// 错误种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EntityDoesNotExist,
    DuplicateName,
    ContractInvalid,
    StatusConflict,
    DatabaseError,
    ServerError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::EntityDoesNotExist => "EntityDoesNotExist",
            ErrorKind::DuplicateName => "DuplicateName",
            ErrorKind::ContractInvalid => "ContractInvalid",
            ErrorKind::StatusConflict => "StatusConflict",
            ErrorKind::DatabaseError => "DatabaseError",
            ErrorKind::ServerError => "ServerError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct StorageError {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EntityDoesNotExist, message)
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateName, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContractInvalid, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StatusConflict, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// 为错误补充上下文，保留种类、详情与底层错误。
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 数据库返回的详情文本（如有）。
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::EntityDoesNotExist
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// PostgreSQL 唯一约束冲突的 SQLSTATE。
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::not_found("no rows found").with_source(err),
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                let detail = err.to_string();
                StorageError::database("connection unavailable")
                    .with_detail(detail)
                    .with_source(err)
            }
            sqlx::Error::Database(db_err) => {
                let detail = db_err
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .and_then(|pg| pg.detail().map(str::to_string))
                    .unwrap_or_else(|| db_err.message().to_string());
                let kind = if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                    ErrorKind::DuplicateName
                } else {
                    ErrorKind::DatabaseError
                };
                let message = db_err.message().to_string();
                StorageError::new(kind, message)
                    .with_detail(detail)
                    .with_source(err)
            }
            _ => {
                let message = err.to_string();
                StorageError::database(message).with_source(err)
            }
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        let message = format!("json encoding failed: {err}");
        StorageError::server(message).with_source(err)
    }
}
