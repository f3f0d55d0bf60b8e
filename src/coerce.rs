//! Exact numeric conversion and typed scalar access.
//!
//! Integers and floats convert into each other only when no information is
//! lost. No other implicit conversion exists: a string never becomes a
//! number, a bool never becomes an integer.

use chrono::{NaiveDate, NaiveTime};

use crate::value::{ConfigType, DateTime, Value};

/// Largest magnitude up to which every integer is exactly representable as
/// an `f64` (2^53).
pub const MAX_EXACT_FLOAT_INT: i64 = 1 << 53;

pub fn int_to_float(i: i64) -> Option<f64> {
    (i.unsigned_abs() <= MAX_EXACT_FLOAT_INT as u64).then_some(i as f64)
}

pub fn float_to_int(f: f64) -> Option<i64> {
    // 2^63 is exactly representable, i64::MAX is not.
    const UPPER: f64 = 9_223_372_036_854_775_808.0;
    (f.is_finite() && f.fract() == 0.0 && f >= -UPPER && f < UPPER).then_some(f as i64)
}

/// Convert `value` to `target` if that is possible without loss.
///
/// Returns `None` for containers and for every cross-type pair other than
/// integer/float.
pub fn convert(value: &Value, target: ConfigType) -> Option<Value> {
    if value.config_type() == target {
        return (!target.is_container()).then(|| value.clone());
    }
    match (value, target) {
        (Value::Integer(i), ConfigType::FloatingPoint) => int_to_float(*i).map(Value::Float),
        (Value::Float(f), ConfigType::Integer) => float_to_int(*f).map(Value::Integer),
        _ => None,
    }
}

/// A Rust type that maps onto a scalar parameter.
///
/// Reads go through [`Scalar::from_value`], which applies the same exact
/// conversion rules as assignment.
pub trait Scalar: Sized {
    const TYPE: ConfigType;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

impl Scalar for bool {
    const TYPE: ConfigType = ConfigType::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl Scalar for i64 {
    const TYPE: ConfigType = ConfigType::Integer;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => float_to_int(*f),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl Scalar for i32 {
    const TYPE: ConfigType = ConfigType::Integer;

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i32::try_from(i).ok())
    }

    fn into_value(self) -> Value {
        Value::Integer(self.into())
    }
}

impl Scalar for f64 {
    const TYPE: ConfigType = ConfigType::FloatingPoint;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => int_to_float(*i),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl Scalar for String {
    const TYPE: ConfigType = ConfigType::String;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl Scalar for NaiveDate {
    const TYPE: ConfigType = ConfigType::Date;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Date(self)
    }
}

impl Scalar for NaiveTime {
    const TYPE: ConfigType = ConfigType::Time;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Time(self)
    }
}

impl Scalar for DateTime {
    const TYPE: ConfigType = ConfigType::DateTime;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_convert_to_float_up_to_2_pow_53() {
        assert_eq!(int_to_float(3), Some(3.0));
        assert_eq!(int_to_float(MAX_EXACT_FLOAT_INT), Some(9_007_199_254_740_992.0));
        assert_eq!(int_to_float(MAX_EXACT_FLOAT_INT - 1), Some(9_007_199_254_740_991.0));
        assert_eq!(int_to_float(1 - MAX_EXACT_FLOAT_INT), Some(-9_007_199_254_740_991.0));
        assert_eq!(int_to_float(-MAX_EXACT_FLOAT_INT), Some(-9_007_199_254_740_992.0));
        assert_eq!(int_to_float(MAX_EXACT_FLOAT_INT + 1), None);
        assert_eq!(int_to_float(i64::MIN), None);
    }

    #[test]
    fn floats_convert_to_int_when_integral() {
        assert_eq!(float_to_int(-3.0), Some(-3));
        assert_eq!(float_to_int(42.0), Some(42));
        assert_eq!(float_to_int(4.2), None);
        assert_eq!(float_to_int(f64::NAN), None);
        assert_eq!(float_to_int(f64::INFINITY), None);
        assert_eq!(float_to_int(9.3e18), None);
        assert_eq!(float_to_int(-9_223_372_036_854_775_808.0), Some(i64::MIN));
    }

    #[test]
    fn convert_keeps_target_type() {
        assert_eq!(
            convert(&Value::Integer(3), ConfigType::FloatingPoint).map(|v| v.config_type()),
            Some(ConfigType::FloatingPoint)
        );
        assert!(convert(&Value::Float(4.2), ConfigType::Integer).is_none());
        assert!(convert(&Value::from("3"), ConfigType::Integer).is_none());
        assert!(convert(&Value::Bool(true), ConfigType::Integer).is_none());
        assert!(convert(&Value::from(vec![1]), ConfigType::List).is_none());
    }

    #[test]
    fn i32_rejects_out_of_range() {
        assert_eq!(i32::from_value(&Value::Integer(7)), Some(7));
        assert_eq!(i32::from_value(&Value::Integer(1 << 40)), None);
        assert_eq!(i32::from_value(&Value::Float(-2.0)), Some(-2));
    }

    #[test]
    fn strings_are_not_numbers() {
        assert_eq!(f64::from_value(&Value::from("1.5")), None);
        assert_eq!(String::from_value(&Value::Integer(1)), None);
        assert_eq!(bool::from_value(&Value::Integer(1)), None);
    }
}
