//! 数值编解码
//!
//! 所有数值型读数存入同一个任意精度 `NUMERIC` 列，读取时按声明的值类型还原：
//! - 浮点类型统一还原为 `f64`
//! - 无符号整数统一还原为 `u64`
//! - 有符号整数统一还原为 `i64`
//!
//! 聚合结果另有提升规则：COUNT 为 `u64`，AVG 为 `f64`，SUM/MIN/MAX 保持输入类别并扩展到 64 位。

use crate::error::StorageError;
use bigdecimal::{BigDecimal, ToPrimitive};
use domain::{AggregateFunc, NumericClass, NumericValue, ValueType};
use std::str::FromStr;

/// 把数据库中的值类型标签解析为 `ValueType`；未知标签属于契约破坏，返回 ServerError。
pub fn value_type_from_tag(tag: &str) -> Result<ValueType, StorageError> {
    ValueType::from_str(tag).map_err(|err| StorageError::server(err.to_string()))
}

fn numeric_class(value_type: ValueType) -> Result<NumericClass, StorageError> {
    value_type
        .numeric_class()
        .ok_or_else(|| StorageError::server(format!("value type {value_type} is not numeric")))
}

fn signed_bounds(value_type: ValueType) -> (i64, i64) {
    match value_type {
        ValueType::Int8 => (i8::MIN as i64, i8::MAX as i64),
        ValueType::Int16 => (i16::MIN as i64, i16::MAX as i64),
        ValueType::Int32 => (i32::MIN as i64, i32::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    }
}

fn unsigned_bound(value_type: ValueType) -> u64 {
    match value_type {
        ValueType::Uint8 => u8::MAX as u64,
        ValueType::Uint16 => u16::MAX as u64,
        ValueType::Uint32 => u32::MAX as u64,
        _ => u64::MAX,
    }
}

fn out_of_range(value_type: ValueType, value: impl std::fmt::Display) -> StorageError {
    StorageError::invalid(format!("value {value} is out of range for {value_type}"))
}

/// 校验数值能否以声明类型表示，返回规范化后的值。
fn check_representable(
    value_type: ValueType,
    value: NumericValue,
) -> Result<NumericValue, StorageError> {
    let class = value_type
        .numeric_class()
        .ok_or_else(|| StorageError::invalid(format!("value type {value_type} is not numeric")))?;
    match (class, value) {
        (NumericClass::Signed, NumericValue::Int(v)) => {
            let (min, max) = signed_bounds(value_type);
            if v < min || v > max {
                return Err(out_of_range(value_type, v));
            }
            Ok(NumericValue::Int(v))
        }
        (NumericClass::Signed, NumericValue::Uint(v)) => {
            let v = i64::try_from(v).map_err(|_| out_of_range(value_type, v))?;
            check_representable(value_type, NumericValue::Int(v))
        }
        (NumericClass::Unsigned, NumericValue::Uint(v)) => {
            if v > unsigned_bound(value_type) {
                return Err(out_of_range(value_type, v));
            }
            Ok(NumericValue::Uint(v))
        }
        (NumericClass::Unsigned, NumericValue::Int(v)) => {
            let v = u64::try_from(v).map_err(|_| out_of_range(value_type, v))?;
            check_representable(value_type, NumericValue::Uint(v))
        }
        (NumericClass::Float, NumericValue::Float(v)) => {
            if !v.is_finite() {
                return Err(StorageError::invalid(format!(
                    "value {v} is not a finite {value_type}"
                )));
            }
            if value_type == ValueType::Float32 && v.abs() > f32::MAX as f64 {
                return Err(out_of_range(value_type, v));
            }
            Ok(NumericValue::Float(v))
        }
        (NumericClass::Float, NumericValue::Int(v)) => Ok(NumericValue::Float(v as f64)),
        (NumericClass::Float, NumericValue::Uint(v)) => Ok(NumericValue::Float(v as f64)),
        (_, NumericValue::Float(v)) => Err(StorageError::invalid(format!(
            "value {v} is not an integer as required by {value_type}"
        ))),
    }
}

/// 按声明类型编码为 `BigDecimal`。无法表示的值返回 ContractInvalid。
pub fn encode_numeric(
    value_type: ValueType,
    value: NumericValue,
) -> Result<BigDecimal, StorageError> {
    match check_representable(value_type, value)? {
        NumericValue::Int(v) => Ok(BigDecimal::from(v)),
        NumericValue::Uint(v) => Ok(BigDecimal::from(v)),
        // f64 的 Display 输出最短可往返的十进制表示
        NumericValue::Float(v) => BigDecimal::from_str(&v.to_string())
            .map_err(|err| StorageError::invalid(format!("invalid float {v}: {err}"))),
    }
}

/// 解析字符串形式的数值字面量（简单读数声明为数值类型时使用）。
pub fn parse_numeric(value_type: ValueType, literal: &str) -> Result<NumericValue, StorageError> {
    let class = value_type
        .numeric_class()
        .ok_or_else(|| StorageError::invalid(format!("value type {value_type} is not numeric")))?;
    let literal = literal.trim();
    let malformed = || StorageError::invalid(format!("malformed {value_type} literal '{literal}'"));
    let value = match class {
        NumericClass::Signed => NumericValue::Int(literal.parse::<i64>().map_err(|_| malformed())?),
        NumericClass::Unsigned => NumericValue::Uint(literal.parse::<u64>().map_err(|_| malformed())?),
        NumericClass::Float => NumericValue::Float(literal.parse::<f64>().map_err(|_| malformed())?),
    };
    check_representable(value_type, value)
}

fn decode_in_class(class: NumericClass, value: &BigDecimal) -> Result<NumericValue, StorageError> {
    match class {
        NumericClass::Float => value
            .to_string()
            .parse::<f64>()
            .map(NumericValue::Float)
            .map_err(|err| StorageError::server(format!("cannot decode {value} as float: {err}"))),
        NumericClass::Signed => {
            if !value.is_integer() {
                return Err(StorageError::server(format!(
                    "numeric {value} has a fractional part"
                )));
            }
            value
                .to_i64()
                .map(NumericValue::Int)
                .ok_or_else(|| StorageError::server(format!("numeric {value} overflows int64")))
        }
        NumericClass::Unsigned => {
            if !value.is_integer() {
                return Err(StorageError::server(format!(
                    "numeric {value} has a fractional part"
                )));
            }
            value
                .to_u64()
                .map(NumericValue::Uint)
                .ok_or_else(|| StorageError::server(format!("numeric {value} overflows uint64")))
        }
    }
}

/// 按声明类型解码。
pub fn decode_numeric(
    value_type: ValueType,
    value: &BigDecimal,
) -> Result<NumericValue, StorageError> {
    decode_in_class(numeric_class(value_type)?, value)
}

/// 聚合结果的值类型。
pub fn aggregate_value_type(
    func: AggregateFunc,
    value_type: ValueType,
) -> Result<ValueType, StorageError> {
    match func {
        AggregateFunc::Count => Ok(ValueType::Uint64),
        AggregateFunc::Avg => Ok(ValueType::Float64),
        AggregateFunc::Sum | AggregateFunc::Min | AggregateFunc::Max => {
            Ok(match numeric_class(value_type)? {
                NumericClass::Signed => ValueType::Int64,
                NumericClass::Unsigned => ValueType::Uint64,
                NumericClass::Float => ValueType::Float64,
            })
        }
    }
}

/// 解码聚合结果。
pub fn decode_aggregate(
    func: AggregateFunc,
    value_type: ValueType,
    value: &BigDecimal,
) -> Result<NumericValue, StorageError> {
    decode_numeric(aggregate_value_type(func, value_type)?, value)
}

/// 按字符串标签解码聚合结果；未知函数或值类型返回 ServerError。
pub fn decode_aggregate_tags(
    func: &str,
    value_type: &str,
    value: &BigDecimal,
) -> Result<NumericValue, StorageError> {
    let func = AggregateFunc::from_str(func).map_err(StorageError::server)?;
    let value_type = value_type_from_tag(value_type)?;
    decode_aggregate(func, value_type, value)
}
