//! 设备元数据模型：设备服务、设备描述文件、设备、自动发现规则。
//!
//! 这些实体都以完整 JSON 文档的形式存储（文档型实体），字段名采用 camelCase，
//! 存储层通过 JSON 包含查询（`content @> $1::jsonb`）按字段过滤。

use crate::data::{Tags, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 管理状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminState {
    Locked,
    #[default]
    Unlocked,
}

/// 运行状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatingState {
    #[default]
    Up,
    Down,
    Unknown,
}

/// 设备服务。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceService {
    pub id: String,
    pub name: String,
    pub description: String,
    pub labels: Vec<String>,
    pub base_address: String,
    pub admin_state: AdminState,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub created: i64,
    pub modified: i64,
}

impl DeviceService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// 资源属性。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    pub value_type: ValueType,
    #[serde(default)]
    pub read_write: String,
    #[serde(default)]
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub media_type: String,
}

/// 设备资源（描述文件中的一个数据点）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResource {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_hidden: bool,
    pub properties: ResourceProperties,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// 设备命令（一组资源的读写操作）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommand {
    pub name: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub read_write: String,
    #[serde(default)]
    pub resource_operations: Vec<serde_json::Value>,
}

/// 设备描述文件。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub model: String,
    pub labels: Vec<String>,
    pub device_resources: Vec<DeviceResource>,
    pub device_commands: Vec<DeviceCommand>,
    pub created: i64,
    pub modified: i64,
}

impl DeviceProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// 自动事件（周期采集配置）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoEvent {
    pub interval: String,
    #[serde(default)]
    pub on_change: bool,
    pub source_name: String,
}

/// 协议属性：协议名 → 键值属性。
pub type ProtocolProperties = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

/// 设备。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub parent: String,
    pub description: String,
    pub admin_state: AdminState,
    pub operating_state: OperatingState,
    pub labels: Vec<String>,
    pub location: Option<serde_json::Value>,
    pub service_name: String,
    pub profile_name: String,
    pub auto_events: Vec<AutoEvent>,
    pub protocols: ProtocolProperties,
    pub tags: Tags,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub created: i64,
    pub modified: i64,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        service_name: impl Into<String>,
        profile_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_name: service_name.into(),
            profile_name: profile_name.into(),
            ..Self::default()
        }
    }
}

/// 自动发现后生成设备的模板。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveredDevice {
    pub profile_name: String,
    pub admin_state: AdminState,
    pub auto_events: Vec<AutoEvent>,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// 自动发现规则。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvisionWatcher {
    pub id: String,
    pub name: String,
    pub service_name: String,
    pub labels: Vec<String>,
    pub identifiers: BTreeMap<String, String>,
    pub blocking_identifiers: BTreeMap<String, Vec<String>>,
    pub admin_state: AdminState,
    pub discovered_device: DiscoveredDevice,
    pub created: i64,
    pub modified: i64,
}
