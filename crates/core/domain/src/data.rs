//! 遥测数据模型：事件（Event）与读数（Reading）。
//!
//! 一个事件由某设备的某个数据源（source）在某一时刻产生，包含零个或多个读数。
//! 读数按声明的值类型（`ValueType`）分为四种形态：二进制、对象、简单字符串、数值。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 事件与读数上的附加标签。
///
/// 使用有序 map，保证序列化结果稳定（设备信息缓存键依赖这一点）。
pub type Tags = BTreeMap<String, serde_json::Value>;

/// 读数声明的值类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Binary,
    Object,
    BoolArray,
    StringArray,
    Uint8Array,
    Uint16Array,
    Uint32Array,
    Uint64Array,
    Int8Array,
    Int16Array,
    Int32Array,
    Int64Array,
    Float32Array,
    Float64Array,
}

/// 数值类型的分类（有符号整数 / 无符号整数 / 浮点数）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericClass {
    Signed,
    Unsigned,
    Float,
}

impl ValueType {
    pub const ALL: [ValueType; 26] = [
        ValueType::Bool,
        ValueType::String,
        ValueType::Uint8,
        ValueType::Uint16,
        ValueType::Uint32,
        ValueType::Uint64,
        ValueType::Int8,
        ValueType::Int16,
        ValueType::Int32,
        ValueType::Int64,
        ValueType::Float32,
        ValueType::Float64,
        ValueType::Binary,
        ValueType::Object,
        ValueType::BoolArray,
        ValueType::StringArray,
        ValueType::Uint8Array,
        ValueType::Uint16Array,
        ValueType::Uint32Array,
        ValueType::Uint64Array,
        ValueType::Int8Array,
        ValueType::Int16Array,
        ValueType::Int32Array,
        ValueType::Int64Array,
        ValueType::Float32Array,
        ValueType::Float64Array,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Bool => "Bool",
            ValueType::String => "String",
            ValueType::Uint8 => "Uint8",
            ValueType::Uint16 => "Uint16",
            ValueType::Uint32 => "Uint32",
            ValueType::Uint64 => "Uint64",
            ValueType::Int8 => "Int8",
            ValueType::Int16 => "Int16",
            ValueType::Int32 => "Int32",
            ValueType::Int64 => "Int64",
            ValueType::Float32 => "Float32",
            ValueType::Float64 => "Float64",
            ValueType::Binary => "Binary",
            ValueType::Object => "Object",
            ValueType::BoolArray => "BoolArray",
            ValueType::StringArray => "StringArray",
            ValueType::Uint8Array => "Uint8Array",
            ValueType::Uint16Array => "Uint16Array",
            ValueType::Uint32Array => "Uint32Array",
            ValueType::Uint64Array => "Uint64Array",
            ValueType::Int8Array => "Int8Array",
            ValueType::Int16Array => "Int16Array",
            ValueType::Int32Array => "Int32Array",
            ValueType::Int64Array => "Int64Array",
            ValueType::Float32Array => "Float32Array",
            ValueType::Float64Array => "Float64Array",
        }
    }

    /// 标量数值类型的分类；非数值类型（含数组）返回 `None`。
    pub fn numeric_class(&self) -> Option<NumericClass> {
        match self {
            ValueType::Int8 | ValueType::Int16 | ValueType::Int32 | ValueType::Int64 => {
                Some(NumericClass::Signed)
            }
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                Some(NumericClass::Unsigned)
            }
            ValueType::Float32 | ValueType::Float64 => Some(NumericClass::Float),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_class().is_some()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 无法识别的值类型标签。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValueType(pub String);

impl fmt::Display for UnknownValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value type '{}'", self.0)
    }
}

impl std::error::Error for UnknownValueType {}

impl FromStr for ValueType {
    type Err = UnknownValueType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueType::ALL
            .iter()
            .copied()
            .find(|value_type| value_type.as_str() == s)
            .ok_or_else(|| UnknownValueType(s.to_string()))
    }
}

/// 解码后的数值。
///
/// 所有有符号整数统一为 `Int(i64)`，无符号整数为 `Uint(u64)`，浮点数为 `Float(f64)`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericValue {
    Int(i64),
    Uint(u64),
    Float(f64),
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::Int(v) => write!(f, "{v}"),
            NumericValue::Uint(v) => write!(f, "{v}"),
            NumericValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// 读数的值形态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingValue {
    /// 无值读数
    Null,
    /// 简单读数（字符串形式）
    Simple(String),
    /// 数值读数
    Numeric(NumericValue),
    /// 二进制读数
    Binary { media_type: String, data: Vec<u8> },
    /// 对象读数（任意 JSON）
    Object(serde_json::Value),
}

/// 单条读数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: String,
    pub origin: i64,
    pub device_name: String,
    pub resource_name: String,
    pub profile_name: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub tags: Tags,
    pub value: ReadingValue,
}

impl Reading {
    /// 构造简单读数（id 留空，入库时生成）。
    pub fn simple(
        device_name: impl Into<String>,
        profile_name: impl Into<String>,
        resource_name: impl Into<String>,
        value_type: ValueType,
        value: impl Into<String>,
        origin: i64,
    ) -> Self {
        Self {
            id: String::new(),
            origin,
            device_name: device_name.into(),
            resource_name: resource_name.into(),
            profile_name: profile_name.into(),
            value_type,
            units: String::new(),
            tags: Tags::new(),
            value: ReadingValue::Simple(value.into()),
        }
    }

    /// 构造数值读数。
    pub fn numeric(
        device_name: impl Into<String>,
        profile_name: impl Into<String>,
        resource_name: impl Into<String>,
        value_type: ValueType,
        value: NumericValue,
        origin: i64,
    ) -> Self {
        Self {
            value: ReadingValue::Numeric(value),
            ..Self::simple(device_name, profile_name, resource_name, value_type, "", origin)
        }
    }

    /// 二进制读数的媒体类型；其它形态为空串。
    pub fn media_type(&self) -> &str {
        match &self.value {
            ReadingValue::Binary { media_type, .. } => media_type,
            _ => "",
        }
    }
}

/// 事件：某设备数据源在某时刻产生的一组读数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub device_name: String,
    pub profile_name: String,
    pub source_name: String,
    pub origin: i64,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub readings: Vec<Reading>,
}

impl Event {
    pub fn new(
        device_name: impl Into<String>,
        profile_name: impl Into<String>,
        source_name: impl Into<String>,
        origin: i64,
    ) -> Self {
        Self {
            id: String::new(),
            device_name: device_name.into(),
            profile_name: profile_name.into(),
            source_name: source_name.into(),
            origin,
            tags: Tags::new(),
            readings: Vec::new(),
        }
    }
}

/// 读数聚合函数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunc {
    Count,
    Avg,
    Sum,
    Min,
    Max,
}

impl AggregateFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

impl FromStr for AggregateFunc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COUNT" => Ok(AggregateFunc::Count),
            "AVG" => Ok(AggregateFunc::Avg),
            "SUM" => Ok(AggregateFunc::Sum),
            "MIN" => Ok(AggregateFunc::Min),
            "MAX" => Ok(AggregateFunc::Max),
            _ => Err(format!("unknown aggregate function '{s}'")),
        }
    }
}
