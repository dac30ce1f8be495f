use domain::{
    AggregateFunc, Device, Event, NumericValue, Reading, ReadingValue, ValueType,
};
use std::str::FromStr;

#[test]
fn value_type_round_trips_through_tag() {
    for value_type in ValueType::ALL {
        let parsed = ValueType::from_str(value_type.as_str()).expect("parse");
        assert_eq!(parsed, value_type);
    }
}

#[test]
fn value_type_rejects_unknown_tag() {
    let err = ValueType::from_str("Int128").expect_err("unknown");
    assert_eq!(err.to_string(), "unknown value type 'Int128'");
}

#[test]
fn numeric_class_only_for_scalar_numbers() {
    assert!(ValueType::Int16.is_numeric());
    assert!(ValueType::Uint64.is_numeric());
    assert!(ValueType::Float32.is_numeric());
    assert!(!ValueType::Int16Array.is_numeric());
    assert!(!ValueType::String.is_numeric());
    assert!(!ValueType::Binary.is_numeric());
}

#[test]
fn aggregate_func_parses_case_insensitive() {
    assert_eq!(AggregateFunc::from_str("avg"), Ok(AggregateFunc::Avg));
    assert_eq!(AggregateFunc::from_str("COUNT"), Ok(AggregateFunc::Count));
    assert!(AggregateFunc::from_str("median").is_err());
}

#[test]
fn device_document_uses_camel_case_fields() {
    let device = Device::new("dev-1", "svc-1", "profile-1");
    let json = serde_json::to_value(&device).expect("serialize");
    assert_eq!(json["name"], "dev-1");
    assert_eq!(json["serviceName"], "svc-1");
    assert_eq!(json["profileName"], "profile-1");
    assert_eq!(json["adminState"], "UNLOCKED");
}

#[test]
fn event_carries_numeric_readings() {
    let mut event = Event::new("dev-1", "profile-1", "temperature", 1000);
    event.readings.push(Reading::numeric(
        "dev-1",
        "profile-1",
        "temperature",
        ValueType::Float32,
        NumericValue::Float(21.5),
        1000,
    ));
    assert_eq!(event.readings.len(), 1);
    assert_eq!(
        event.readings[0].value,
        ReadingValue::Numeric(NumericValue::Float(21.5))
    );
    assert_eq!(event.readings[0].media_type(), "");
}
