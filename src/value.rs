//! The value model: a closed sum type over every parameter kind a tree can
//! hold.
//!
//! There is deliberately no `Null` variant. Null values show up in imported
//! data (JSON `null`, serde `None`) and are rejected at those boundaries, so
//! a [`Value`] is always concrete.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexMap;

use crate::error::{ConfigError, Result};
use crate::key;

/// Type tag of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigType {
    Bool,
    Integer,
    FloatingPoint,
    String,
    Date,
    Time,
    DateTime,
    List,
    Group,
}

impl ConfigType {
    pub fn is_container(self) -> bool {
        matches!(self, ConfigType::List | ConfigType::Group)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ConfigType::Integer | ConfigType::FloatingPoint)
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigType::Bool => "bool",
            ConfigType::Integer => "integer",
            ConfigType::FloatingPoint => "floating point",
            ConfigType::String => "string",
            ConfigType::Date => "date",
            ConfigType::Time => "time",
            ConfigType::DateTime => "date-time",
            ConfigType::List => "list",
            ConfigType::Group => "group",
        };
        f.write_str(name)
    }
}

/// Offsets must stay strictly inside one day.
pub const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// A calendar date plus wall-clock time, optionally pinned to a UTC offset.
///
/// Without an offset the value is a naive/local timestamp. Two date-times
/// with offsets compare by their UTC instant, two naive ones by wall clock;
/// a naive value never equals an offset one.
///
/// The fields are public, so range checks happen when a value enters a tree
/// (see [`Value::validate`]) rather than on construction.
#[derive(Debug, Clone, Copy)]
pub struct DateTime {
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Offset from UTC in minutes, `None` for a local date-time.
    pub offset_minutes: Option<i32>,
}

impl DateTime {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time,
            offset_minutes: None,
        }
    }

    pub fn with_offset(mut self, minutes: i32) -> Self {
        self.offset_minutes = Some(minutes);
        self
    }

    /// Like [`DateTime::with_offset`], but `None` when `minutes` is a day or
    /// more away from UTC.
    pub fn try_with_offset(self, minutes: i32) -> Option<Self> {
        (minutes.abs() <= MAX_OFFSET_MINUTES).then(|| self.with_offset(minutes))
    }

    pub fn naive(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time)
    }

    /// The UTC instant, if this date-time carries an offset and the shift
    /// stays inside chrono's calendar.
    pub fn to_utc(&self) -> Option<NaiveDateTime> {
        let minutes = self.offset_minutes?;
        self.naive()
            .checked_sub_signed(Duration::minutes(i64::from(minutes)))
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        match (self.offset_minutes, other.offset_minutes) {
            (Some(_), Some(_)) => match (self.to_utc(), other.to_utc()) {
                (Some(a), Some(b)) => a == b,
                // At the edge of the calendar: compare the raw fields.
                _ => {
                    (self.date, self.time, self.offset_minutes)
                        == (other.date, other.time, other.offset_minutes)
                }
            },
            (None, None) => self.naive() == other.naive(),
            _ => false,
        }
    }
}

impl From<NaiveDateTime> for DateTime {
    fn from(dt: NaiveDateTime) -> Self {
        DateTime::new(dt.date(), dt.time())
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", format_date(&self.date), format_time(&self.time))?;
        match self.offset_minutes {
            None => Ok(()),
            Some(0) => f.write_str("Z"),
            Some(minutes) => {
                let sign = if minutes < 0 { '-' } else { '+' };
                let abs = minutes.unsigned_abs();
                write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)
            }
        }
    }
}

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Why a temporal scalar cannot be stored, if it cannot.
///
/// Trees only hold dates with four-digit years, times without leap seconds
/// and offsets within one day, which is what every format adapter can write.
pub(crate) fn scalar_range_error(value: &Value) -> Option<String> {
    fn date_error(date: &NaiveDate) -> Option<String> {
        (!(0..=9999).contains(&date.year()))
            .then(|| format!("year {} is outside 0..=9999", date.year()))
    }
    fn time_error(time: &NaiveTime) -> Option<String> {
        (time.nanosecond() >= NANOS_PER_SECOND)
            .then(|| format!("leap second {} cannot be stored", format_time(time)))
    }
    match value {
        Value::Date(d) => date_error(d),
        Value::Time(t) => time_error(t),
        Value::DateTime(dt) => date_error(&dt.date)
            .or_else(|| time_error(&dt.time))
            .or_else(|| {
                dt.offset_minutes
                    .filter(|m| m.abs() > MAX_OFFSET_MINUTES)
                    .map(|m| format!("UTC offset of {m} minutes is a day or more"))
            }),
        _ => None,
    }
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// `HH:MM:SS` with a fractional part only when needed (RFC 3339 partial-time).
///
/// chrono encodes a leap second as a nanosecond count past one billion; it
/// renders as second 60.
pub(crate) fn format_time(time: &NaiveTime) -> String {
    let leap = time.nanosecond() >= NANOS_PER_SECOND;
    let mut out = format!(
        "{:02}:{:02}:{:02}",
        time.hour(),
        time.minute(),
        if leap { 60 } else { time.second() }
    );
    let nanos = time.nanosecond() % NANOS_PER_SECOND;
    if nanos > 0 {
        let frac = format!("{nanos:09}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out
}

/// A configuration value.
///
/// Containers own their children; `Group` preserves insertion order. Keys of
/// a `Group` must be bare keys (`[A-Za-z0-9_-]+`) once the value enters a
/// tree, see [`Value::validate`].
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime),
    List(Vec<Value>),
    Group(IndexMap<String, Value>),
}

impl Value {
    pub fn config_type(&self) -> ConfigType {
        match self {
            Value::Bool(_) => ConfigType::Bool,
            Value::Integer(_) => ConfigType::Integer,
            Value::Float(_) => ConfigType::FloatingPoint,
            Value::String(_) => ConfigType::String,
            Value::Date(_) => ConfigType::Date,
            Value::Time(_) => ConfigType::Time,
            Value::DateTime(_) => ConfigType::DateTime,
            Value::List(_) => ConfigType::List,
            Value::Group(_) => ConfigType::Group,
        }
    }

    pub fn is_container(&self) -> bool {
        self.config_type().is_container()
    }

    pub fn empty_group() -> Self {
        Value::Group(IndexMap::new())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Verify that this value may enter a tree: every group key below it is
    /// a bare key and every date, time and offset is in range.
    ///
    /// `prefix` is the location of this value, used for error messages only.
    pub fn validate(&self, prefix: &str) -> Result<()> {
        match self {
            Value::Group(group) => {
                for (k, v) in group {
                    let fqn = key::join(prefix, k);
                    key::validate_bare_key(k).map_err(|reason| {
                        ConfigError::key_syntax(fqn.clone(), reason)
                    })?;
                    v.validate(&fqn)?;
                }
                Ok(())
            }
            Value::List(items) => {
                for (idx, v) in items.iter().enumerate() {
                    v.validate(&format!("{prefix}[{idx}]"))?;
                }
                Ok(())
            }
            scalar => match scalar_range_error(scalar) {
                Some(reason) => Err(ConfigError::type_mismatch(prefix, reason)),
                None => Ok(()),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::compare::structural_eq(self, other)
    }
}

/// Inline, TOML-like rendering. Strings are quoted.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Date(d) => f.write_str(&format_date(d)),
            Value::Time(t) => f.write_str(&format_time(t)),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Group(group) => {
                f.write_str("{")?;
                for (i, (k, v)) in group.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {k} = {v}")?;
                }
                if group.is_empty() {
                    f.write_str("}")
                } else {
                    f.write_str(" }")
                }
            }
        }
    }
}

/// Floats always carry a decimal point or exponent so they never read back
/// as integers.
pub(crate) fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".into()
    } else if x.is_infinite() {
        if x > 0.0 { "inf".into() } else { "-inf".into() }
    } else {
        let s = format!("{x:?}");
        if s.contains(['.', 'e', 'E']) {
            s
        } else {
            format!("{s}.0")
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i64 => Integer,
    i32 => Integer,
    i16 => Integer,
    u8 => Integer,
    u16 => Integer,
    u32 => Integer,
    f64 => Float,
    f32 => Float,
    String => String,
    &str => String,
    NaiveDate => Date,
    NaiveTime => Time,
    DateTime => DateTime,
    IndexMap<String, Value> => Group,
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
