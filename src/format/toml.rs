//! TOML adapter. Parsing goes through `toml`, emission through `toml_edit`
//! so that groups become `[tables]` and lists of groups become
//! `[[arrays of tables]]`.

use chrono::{NaiveDate, NaiveTime, Timelike};
use indexmap::IndexMap;
use toml_edit::{Array, ArrayOfTables, DocumentMut, InlineTable, Item, Table};
use tracing::debug;

use super::{Format, FormatAdapter};
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key;
use crate::value::{DateTime, Value, scalar_range_error};

const NAME: &str = "TOML";

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlAdapter;

impl FormatAdapter for TomlAdapter {
    fn format(&self) -> Format {
        Format::Toml
    }

    fn parse(&self, text: &str) -> Result<Config> {
        let table: toml::Table = toml::from_str(text)
            .map_err(|e| ConfigError::parse(NAME, e.to_string().trim_end()))?;
        let mut group = IndexMap::with_capacity(table.len());
        for (k, v) in table {
            let value = from_toml(v, &k)?;
            group.insert(checked_key(k)?, value);
        }
        debug!(entries = group.len(), "parsed TOML document");
        Config::from_group(group)
    }

    fn serialize(&self, config: &Config) -> Result<String> {
        let group = config.export_group()?;
        let mut doc = DocumentMut::new();
        fill_table(doc.as_table_mut(), &group, "")?;
        Ok(doc.to_string())
    }
}

fn checked_key(k: String) -> Result<String> {
    match key::validate_bare_key(&k) {
        Ok(()) => Ok(k),
        Err(reason) => Err(ConfigError::parse(NAME, format!("key '{k}': {reason}"))),
    }
}

fn from_toml(value: toml::Value, at: &str) -> Result<Value> {
    Ok(match value {
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Integer(i) => Value::Integer(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::String(s) => Value::String(s),
        toml::Value::Datetime(dt) => {
            convert_datetime(&dt).map_err(|e| ConfigError::parse(NAME, format!("{at}: {e}")))?
        }
        toml::Value::Array(items) => Value::List(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| from_toml(v, &format!("{at}[{i}]")))
                .collect::<Result<_>>()?,
        ),
        toml::Value::Table(table) => {
            let mut group = IndexMap::with_capacity(table.len());
            for (k, v) in table {
                let value = from_toml(v, &key::join(at, &k))?;
                group.insert(checked_key(k)?, value);
            }
            Value::Group(group)
        }
    })
}

/// Map a TOML date/time onto `Date`, `Time` or `DateTime`, validating the
/// calendar (no 2023-02-29, no 24:30).
pub(crate) fn convert_datetime(dt: &toml::value::Datetime) -> std::result::Result<Value, String> {
    let date = dt
        .date
        .map(|d| {
            NaiveDate::from_ymd_opt(d.year.into(), d.month.into(), d.day.into())
                .ok_or_else(|| format!("invalid date {d}"))
        })
        .transpose()?;
    let time = dt
        .time
        .map(|t| {
            NaiveTime::from_hms_nano_opt(
                t.hour.into(),
                t.minute.into(),
                t.second.into(),
                t.nanosecond,
            )
            .ok_or_else(|| format!("invalid time {t}"))
        })
        .transpose()?;
    let offset = dt.offset.map(|o| match o {
        toml::value::Offset::Z => 0,
        toml::value::Offset::Custom { minutes } => i32::from(minutes),
    });
    let value = match (date, time, offset) {
        (Some(d), None, None) => Value::Date(d),
        (None, Some(t), None) => Value::Time(t),
        (Some(d), Some(t), offset) => Value::DateTime(DateTime {
            date: d,
            time: t,
            offset_minutes: offset,
        }),
        _ => return Err(format!("unsupported date-time {dt}")),
    };
    match scalar_range_error(&value) {
        Some(reason) => Err(reason),
        None => Ok(value),
    }
}

fn edit_date(d: &NaiveDate) -> toml_edit::Date {
    use chrono::Datelike;
    toml_edit::Date {
        year: d.year() as u16,
        month: d.month() as u8,
        day: d.day() as u8,
    }
}

fn edit_time(t: &NaiveTime) -> toml_edit::Time {
    toml_edit::Time {
        hour: t.hour() as u8,
        minute: t.minute() as u8,
        second: t.second() as u8,
        nanosecond: t.nanosecond(),
    }
}

/// Convert a value for `toml_edit`. `at` names the value in errors.
///
/// Temporal scalars are range-checked first so the narrowing casts below
/// are lossless.
pub(crate) fn edit_value(value: &Value, at: &str) -> Result<toml_edit::Value> {
    if let Some(reason) = scalar_range_error(value) {
        return Err(ConfigError::type_mismatch(at, reason));
    }
    Ok(match value {
        Value::Bool(b) => (*b).into(),
        Value::Integer(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::String(s) => s.as_str().into(),
        Value::Date(d) => toml_edit::Datetime {
            date: Some(edit_date(d)),
            time: None,
            offset: None,
        }
        .into(),
        Value::Time(t) => toml_edit::Datetime {
            date: None,
            time: Some(edit_time(t)),
            offset: None,
        }
        .into(),
        Value::DateTime(dt) => toml_edit::Datetime {
            date: Some(edit_date(&dt.date)),
            time: Some(edit_time(&dt.time)),
            offset: dt.offset_minutes.map(|m| match m {
                0 => toml_edit::Offset::Z,
                m => toml_edit::Offset::Custom { minutes: m as i16 },
            }),
        }
        .into(),
        Value::List(items) => {
            let mut array = Array::new();
            for (i, item) in items.iter().enumerate() {
                array.push(edit_value(item, &format!("{at}[{i}]"))?);
            }
            array.into()
        }
        Value::Group(group) => {
            let mut table = InlineTable::new();
            for (k, v) in group {
                table.insert(k.as_str(), edit_value(v, &key::join(at, k))?);
            }
            table.into()
        }
    })
}

fn is_table_array(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(|v| matches!(v, Value::Group(_)))
}

fn fill_table(table: &mut Table, group: &IndexMap<String, Value>, prefix: &str) -> Result<()> {
    for (k, v) in group {
        let fqn = key::join(prefix, k);
        let item = match v {
            Value::Group(inner) => {
                let mut sub = Table::new();
                fill_table(&mut sub, inner, &fqn)?;
                Item::Table(sub)
            }
            Value::List(items) if is_table_array(items) => {
                let mut tables = ArrayOfTables::new();
                for (i, inner) in items.iter().filter_map(Value::as_group).enumerate() {
                    let mut sub = Table::new();
                    fill_table(&mut sub, inner, &format!("{fqn}[{i}]"))?;
                    tables.push(sub);
                }
                Item::ArrayOfTables(tables)
            }
            other => Item::Value(edit_value(other, &fqn)?),
        };
        table.insert(k, item);
    }
    Ok(())
}
