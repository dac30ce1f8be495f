//! 调度服务模型：调度任务与动作执行记录。

use crate::metadata::AdminState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 调度任务。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleJob {
    pub id: String,
    pub name: String,
    pub definition: serde_json::Value,
    pub auto_trigger_missed_records: bool,
    pub actions: Vec<serde_json::Value>,
    pub admin_state: AdminState,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub created: i64,
    pub modified: i64,
}

/// 动作执行状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionStatus {
    #[default]
    Succeeded,
    Failed,
    Missed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Succeeded => "SUCCEEDED",
            ActionStatus::Failed => "FAILED",
            ActionStatus::Missed => "MISSED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUCCEEDED" => Some(ActionStatus::Succeeded),
            "FAILED" => Some(ActionStatus::Failed),
            "MISSED" => Some(ActionStatus::Missed),
            _ => None,
        }
    }
}

/// 动作执行记录（关系型存储，非文档）。
///
/// `scheduled_at` 需由调用方在写入前设置。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleActionRecord {
    pub id: String,
    pub job_name: String,
    pub action: serde_json::Value,
    pub status: ActionStatus,
    pub scheduled_at: i64,
    pub created: i64,
}

impl ScheduleActionRecord {
    /// 动作 id（取自动作 JSON 的 `id` 字段）。
    pub fn action_id(&self) -> String {
        self.action
            .get("id")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string()
    }
}
