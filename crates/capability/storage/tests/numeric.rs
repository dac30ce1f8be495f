use bigdecimal::BigDecimal;
use domain::{AggregateFunc, NumericValue, ValueType};
use edge_storage::ErrorKind;
use edge_storage::numeric::{
    aggregate_value_type, decode_aggregate, decode_aggregate_tags, decode_numeric,
    encode_numeric, parse_numeric, value_type_from_tag,
};
use std::str::FromStr;

fn decimal(text: &str) -> BigDecimal {
    BigDecimal::from_str(text).expect("decimal literal")
}

fn round_trip(value_type: ValueType, value: NumericValue) -> NumericValue {
    let encoded = encode_numeric(value_type, value).expect("encode");
    decode_numeric(value_type, &encoded).expect("decode")
}

#[test]
fn integer_extremes_survive_the_numeric_column() {
    assert_eq!(
        round_trip(ValueType::Uint64, NumericValue::Uint(u64::MAX)),
        NumericValue::Uint(u64::MAX)
    );
    assert_eq!(
        round_trip(ValueType::Int64, NumericValue::Int(i64::MIN)),
        NumericValue::Int(i64::MIN)
    );
    assert_eq!(
        encode_numeric(ValueType::Uint64, NumericValue::Uint(u64::MAX)).expect("encode"),
        decimal("18446744073709551615")
    );
}

#[test]
fn smallest_float32_subnormal_is_exact() {
    let tiny = f32::from_bits(1) as f64;
    assert_eq!(
        round_trip(ValueType::Float32, NumericValue::Float(tiny)),
        NumericValue::Float(tiny)
    );
    assert_eq!(
        round_trip(ValueType::Float64, NumericValue::Float(0.1)),
        NumericValue::Float(0.1)
    );
}

#[test]
fn narrower_integer_types_widen_on_decode() {
    assert_eq!(
        round_trip(ValueType::Int8, NumericValue::Int(-128)),
        NumericValue::Int(-128)
    );
    assert_eq!(
        round_trip(ValueType::Uint16, NumericValue::Int(65535)),
        NumericValue::Uint(65535)
    );
    assert_eq!(
        round_trip(ValueType::Float64, NumericValue::Int(3)),
        NumericValue::Float(3.0)
    );
}

#[test]
fn unrepresentable_values_are_rejected() {
    let cases = [
        (ValueType::Int8, NumericValue::Int(-129)),
        (ValueType::Uint8, NumericValue::Uint(256)),
        (ValueType::Uint32, NumericValue::Int(-1)),
        (ValueType::Int64, NumericValue::Uint(u64::MAX)),
        (ValueType::Int32, NumericValue::Float(1.5)),
        (ValueType::Float32, NumericValue::Float(1e39)),
        (ValueType::Float64, NumericValue::Float(f64::NAN)),
        (ValueType::Float64, NumericValue::Float(f64::INFINITY)),
    ];
    for (value_type, value) in cases {
        let err = encode_numeric(value_type, value).expect_err("out of range");
        assert_eq!(err.kind(), ErrorKind::ContractInvalid, "{value_type} {value}");
    }
}

#[test]
fn non_numeric_type_cannot_be_encoded() {
    let err = encode_numeric(ValueType::String, NumericValue::Int(1)).expect_err("string");
    assert_eq!(err.kind(), ErrorKind::ContractInvalid);
}

#[test]
fn literals_parse_per_declared_class() {
    assert_eq!(
        parse_numeric(ValueType::Uint32, " 42 ").expect("uint"),
        NumericValue::Uint(42)
    );
    assert_eq!(
        parse_numeric(ValueType::Int16, "-7").expect("int"),
        NumericValue::Int(-7)
    );
    assert_eq!(
        parse_numeric(ValueType::Float32, "2.5").expect("float"),
        NumericValue::Float(2.5)
    );

    let err = parse_numeric(ValueType::Int16, "abc").expect_err("malformed");
    assert_eq!(err.kind(), ErrorKind::ContractInvalid);
    let err = parse_numeric(ValueType::Uint8, "300").expect_err("overflow");
    assert_eq!(err.kind(), ErrorKind::ContractInvalid);
    let err = parse_numeric(ValueType::Uint8, "-1").expect_err("negative");
    assert_eq!(err.kind(), ErrorKind::ContractInvalid);
}

#[test]
fn fractional_value_in_integer_column_is_a_server_error() {
    let err = decode_numeric(ValueType::Int64, &decimal("1.5")).expect_err("fraction");
    assert_eq!(err.kind(), ErrorKind::ServerError);
    let err = decode_numeric(ValueType::Uint64, &decimal("-1")).expect_err("negative");
    assert_eq!(err.kind(), ErrorKind::ServerError);
}

#[test]
fn aggregate_results_are_promoted() {
    use AggregateFunc::*;
    use ValueType::*;

    let table = [
        (Count, Float32, Uint64),
        (Count, Int8, Uint64),
        (Avg, Int32, Float64),
        (Avg, Uint16, Float64),
        (Sum, Int8, Int64),
        (Sum, Uint32, Uint64),
        (Min, Uint8, Uint64),
        (Max, Float32, Float64),
    ];
    for (func, input, expected) in table {
        assert_eq!(
            aggregate_value_type(func, input).expect("numeric input"),
            expected,
            "{} over {input}",
            func.as_str()
        );
    }
}

#[test]
fn aggregate_values_decode_in_promoted_type() {
    assert_eq!(
        decode_aggregate(AggregateFunc::Avg, ValueType::Int32, &decimal("2.5")).expect("avg"),
        NumericValue::Float(2.5)
    );
    assert_eq!(
        decode_aggregate(AggregateFunc::Count, ValueType::Float32, &decimal("3")).expect("count"),
        NumericValue::Uint(3)
    );
    assert_eq!(
        decode_aggregate(AggregateFunc::Sum, ValueType::Int8, &decimal("-300")).expect("sum"),
        NumericValue::Int(-300)
    );
    assert_eq!(
        decode_aggregate_tags("max", "Uint8", &decimal("512")).expect("tags"),
        NumericValue::Uint(512)
    );
}

#[test]
fn unknown_tags_are_server_errors() {
    let err = decode_aggregate_tags("MEDIAN", "Int8", &decimal("1")).expect_err("func");
    assert_eq!(err.kind(), ErrorKind::ServerError);
    let err = value_type_from_tag("Int128").expect_err("type");
    assert_eq!(err.kind(), ErrorKind::ServerError);
}
