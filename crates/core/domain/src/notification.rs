//! 通知服务模型：通知、订阅、投递记录。

use crate::metadata::AdminState;
use serde::{Deserialize, Serialize};

/// 通知严重级别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Normal,
    Minor,
    Critical,
}

/// 通知处理状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    #[default]
    New,
    Processed,
    Escalated,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::New => "NEW",
            NotificationStatus::Processed => "PROCESSED",
            NotificationStatus::Escalated => "ESCALATED",
        }
    }
}

/// 通知。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Notification {
    pub id: String,
    pub category: String,
    pub labels: Vec<String>,
    pub content: String,
    pub content_type: String,
    pub description: String,
    pub sender: String,
    pub severity: Severity,
    pub status: NotificationStatus,
    pub acknowledged: bool,
    pub created: i64,
    pub modified: i64,
}

/// 订阅。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub channels: Vec<serde_json::Value>,
    pub receiver: String,
    pub categories: Vec<String>,
    pub labels: Vec<String>,
    pub description: String,
    pub resend_limit: i32,
    pub resend_interval: String,
    pub admin_state: AdminState,
    pub created: i64,
    pub modified: i64,
}

/// 投递状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransmissionStatus {
    Acknowledged,
    Failed,
    #[default]
    Sent,
    Escalated,
    Resending,
}

impl TransmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransmissionStatus::Acknowledged => "ACKNOWLEDGED",
            TransmissionStatus::Failed => "FAILED",
            TransmissionStatus::Sent => "SENT",
            TransmissionStatus::Escalated => "ESCALATED",
            TransmissionStatus::Resending => "RESENDING",
        }
    }
}

/// 单次投递尝试。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransmissionRecord {
    pub status: TransmissionStatus,
    pub response: String,
    pub sent: i64,
}

/// 投递记录（一个通知发往一个订阅渠道）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transmission {
    pub id: String,
    pub created: i64,
    pub notification_id: String,
    pub subscription_name: String,
    pub channel: serde_json::Value,
    pub status: TransmissionStatus,
    pub resend_count: i32,
    pub records: Vec<TransmissionRecord>,
}
