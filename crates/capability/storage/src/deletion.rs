//! 后台物理删除任务
//!
//! 按设备/数据源/时间删除遥测数据时，逻辑删除在调用内同步完成，物理删除在后台任务中执行。
//! 调用方拿到 `DeletionJob`：
//! - 直接丢弃：任务照常运行（fire-and-forget），失败只记日志
//! - 调用 `wait()`：等待完成并取得结果

use crate::error::StorageError;
use edge_telemetry::SharedLogger;
use std::future::Future;
use tokio::task::JoinHandle;

/// 一次物理删除的统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    pub readings: u64,
    pub events: u64,
    pub device_infos: u64,
}

/// 后台删除任务句柄。
#[derive(Debug)]
pub struct DeletionJob {
    description: String,
    handle: JoinHandle<Result<DeletionSummary, StorageError>>,
}

impl DeletionJob {
    /// 在 tokio 运行时上启动删除任务，任务结束时记录日志。
    pub fn spawn<F>(logger: SharedLogger, description: impl Into<String>, work: F) -> Self
    where
        F: Future<Output = Result<DeletionSummary, StorageError>> + Send + 'static,
    {
        let description = description.into();
        let task_description = description.clone();
        let handle = tokio::spawn(async move {
            let result = work.await;
            match &result {
                Ok(summary) => logger.debug(&format!(
                    "{task_description}: removed {} readings, {} events, {} device infos",
                    summary.readings, summary.events, summary.device_infos
                )),
                Err(err) => logger.error(&format!("{task_description} failed: {err}")),
            }
            result
        });
        Self {
            description,
            handle,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 等待任务完成。
    pub async fn wait(self) -> Result<DeletionSummary, StorageError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(StorageError::server(format!(
                "{} did not complete: {err}",
                self.description
            ))),
        }
    }
}
