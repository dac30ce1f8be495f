//! 追踪初始化与诊断日志出口（LoggingClient）。
//!
//! 存储层不直接依赖具体日志实现，而是接收一个 `LoggingClient`：
//! - TracingLoggingClient：转发到 tracing 宏
//! - NullLoggingClient：丢弃所有日志（测试使用）

use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 诊断日志出口。
pub trait LoggingClient: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// 共享的日志出口。
pub type SharedLogger = Arc<dyn LoggingClient>;

/// 转发到 tracing 的日志出口，所有事件带 `component` 字段。
#[derive(Debug, Clone)]
pub struct TracingLoggingClient {
    component: String,
}

impl TracingLoggingClient {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn shared(component: impl Into<String>) -> SharedLogger {
        Arc::new(Self::new(component))
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl LoggingClient for TracingLoggingClient {
    fn debug(&self, message: &str) {
        tracing::debug!(component = %self.component, "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(component = %self.component, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(component = %self.component, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(component = %self.component, "{message}");
    }
}

/// 丢弃所有日志。
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLoggingClient;

impl NullLoggingClient {
    pub fn shared() -> SharedLogger {
        Arc::new(Self)
    }
}

impl LoggingClient for NullLoggingClient {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
