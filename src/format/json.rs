//! JSON adapter.
//!
//! JSON has no date or time types, so those are written as ISO 8601 strings
//! and read back as plain strings. Non-finite floats are written as the
//! strings `"nan"`, `"inf"` and `"-inf"`. `null` has no counterpart in a
//! tree; what happens to it on import is chosen by a [`NullValuePolicy`].

use indexmap::IndexMap;
use serde_json::{Map, Number};
use tracing::debug;

use super::{Format, FormatAdapter};
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key;
use crate::value::{Value, format_date, format_float, format_time};

const NAME: &str = "JSON";

/// How JSON `null` is imported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullValuePolicy {
    /// Drop the entry (or list element).
    Skip,
    /// Store the string `"null"`.
    NullString,
    /// Store an empty list.
    EmptyList,
    /// Refuse the document.
    #[default]
    Fail,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter {
    pub null_policy: NullValuePolicy,
}

impl JsonAdapter {
    pub fn with_null_policy(null_policy: NullValuePolicy) -> Self {
        Self { null_policy }
    }

    fn convert(&self, value: serde_json::Value, at: &str) -> Result<Option<Value>> {
        use serde_json::Value as Json;
        Ok(Some(match value {
            Json::Null => return self.null(at),
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => number(&n, at)?,
            Json::String(s) => Value::String(s),
            Json::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    if let Some(v) = self.convert(item, &format!("{at}[{i}]"))? {
                        out.push(v);
                    }
                }
                Value::List(out)
            }
            Json::Object(map) => Value::Group(self.convert_object(map, at)?),
        }))
    }

    fn convert_object(&self, map: Map<String, serde_json::Value>, at: &str) -> Result<IndexMap<String, Value>> {
        let mut group = IndexMap::with_capacity(map.len());
        for (k, v) in map {
            let fqn = key::join(at, &k);
            key::validate_bare_key(&k)
                .map_err(|reason| ConfigError::parse(NAME, format!("key '{fqn}': {reason}")))?;
            if let Some(value) = self.convert(v, &fqn)? {
                group.insert(k, value);
            }
        }
        Ok(group)
    }

    fn null(&self, at: &str) -> Result<Option<Value>> {
        match self.null_policy {
            NullValuePolicy::Skip => Ok(None),
            NullValuePolicy::NullString => Ok(Some(Value::String("null".into()))),
            NullValuePolicy::EmptyList => Ok(Some(Value::List(Vec::new()))),
            NullValuePolicy::Fail => Err(ConfigError::parse(
                NAME,
                format!("{at}: null values are not supported"),
            )),
        }
    }
}

/// A number without fraction or exponent is an integer and must fit in
/// 64 bits; it never degrades to a float.
fn number(n: &Number, at: &str) -> Result<Value> {
    let text = n.to_string();
    if !text.contains(['.', 'e', 'E']) {
        return text.parse::<i64>().map(Value::Integer).map_err(|_| {
            ConfigError::parse(
                NAME,
                format!("{at}: integer {text} is outside the 64-bit signed range"),
            )
        });
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| ConfigError::parse(NAME, format!("{at}: unsupported number {text}")))
}

fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => Json::Number(n),
            None => Json::String(format_float(*f)),
        },
        Value::String(s) => Json::String(s.clone()),
        Value::Date(d) => Json::String(format_date(d)),
        Value::Time(t) => Json::String(format_time(t)),
        Value::DateTime(dt) => Json::String(dt.to_string()),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Group(group) => Json::Object(
            group
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

impl FormatAdapter for JsonAdapter {
    fn format(&self) -> Format {
        Format::Json
    }

    fn parse(&self, text: &str) -> Result<Config> {
        let root: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ConfigError::parse(NAME, e.to_string()))?;
        let serde_json::Value::Object(map) = root else {
            return Err(ConfigError::parse(
                NAME,
                "the top-level value must be an object",
            ));
        };
        let group = self.convert_object(map, "")?;
        debug!(entries = group.len(), policy = ?self.null_policy, "parsed JSON document");
        Config::from_group(group)
    }

    fn serialize(&self, config: &Config) -> Result<String> {
        let group = config.export_group()?;
        let json = to_json(&Value::Group(group));
        serde_json::to_string_pretty(&json).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures;
    use crate::format::load_toml_str;
    use crate::value::ConfigType;

    fn parse(text: &str) -> Result<Config> {
        JsonAdapter::default().parse(text)
    }

    #[test]
    fn parses_nested_document() {
        let cfg = parse(fixtures::NESTED_JSON).unwrap();
        assert_eq!(cfg, load_toml_str(fixtures::NESTED).unwrap());
        assert_eq!(cfg.keys().unwrap(), vec!["matrix", "server", "servers"]);
    }

    #[test]
    fn integers_and_floats_stay_apart() {
        let cfg = parse(r#"{"i": 3, "f": 3.0, "e": 1e3}"#).unwrap();
        assert_eq!(cfg.type_of("i").unwrap(), ConfigType::Integer);
        assert_eq!(cfg.type_of("f").unwrap(), ConfigType::FloatingPoint);
        assert_eq!(cfg.get_float("e").unwrap(), 1000.0);
    }

    #[test]
    fn top_level_must_be_object() {
        assert_eq!(parse("[1, 2]").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse("{\"a\": }").unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn integers_outside_i64_are_parse_errors() {
        for text in [
            r#"{"a": 9223372036854775808}"#,
            r#"{"a": 18446744073709551616}"#,
            r#"{"a": -9223372036854775809}"#,
            r#"{"g": {"a": [1, 100000000000000000000000]}}"#,
        ] {
            let err = parse(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse, "{text}");
            assert!(err.to_string().contains("64-bit"), "{text}");
        }

        let cfg = parse(r#"{"lo": -9223372036854775808, "hi": 9223372036854775807}"#).unwrap();
        assert_eq!(cfg.get_int("lo").unwrap(), i64::MIN);
        assert_eq!(cfg.get_int("hi").unwrap(), i64::MAX);
    }

    #[test]
    fn keys_must_be_bare() {
        assert_eq!(parse(r#"{"a.b": 1}"#).unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse(r#"{"g": {"a b": 1}}"#).unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn null_policies() {
        let text = r#"{"a": null, "lst": [1, null], "b": 2}"#;
        assert_eq!(parse(text).unwrap_err().kind(), ErrorKind::Parse);

        let skip = JsonAdapter::with_null_policy(NullValuePolicy::Skip).parse(text).unwrap();
        assert_eq!(skip.keys().unwrap(), vec!["lst", "b"]);
        assert_eq!(skip.length("lst").unwrap(), 1);

        let string = JsonAdapter::with_null_policy(NullValuePolicy::NullString)
            .parse(text)
            .unwrap();
        assert_eq!(string.get_string("a").unwrap(), "null");
        assert_eq!(string.get_string("lst[1]").unwrap(), "null");

        let list = JsonAdapter::with_null_policy(NullValuePolicy::EmptyList)
            .parse(text)
            .unwrap();
        assert_eq!(list.type_of("a").unwrap(), ConfigType::List);
        assert!(list.view("a").unwrap().is_empty().unwrap());
    }

    #[test]
    fn dates_and_times_become_strings() {
        let cfg = load_toml_str(fixtures::SCALARS).unwrap();
        let text = JsonAdapter::default().serialize(&cfg).unwrap();
        let back = parse(&text).unwrap();
        assert_eq!(back.get_string("day").unwrap(), "2000-02-29");
        assert_eq!(back.get_string("tm").unwrap(), "17:30:15.123");
        assert_eq!(back.get_string("dt").unwrap(), "2000-02-29T17:30:15.123Z");
        assert_eq!(back.type_of("tm").unwrap(), ConfigType::String);
        assert_eq!(back.get_float("flt2").unwrap(), -3.0);
        assert_eq!(back.type_of("flt2").unwrap(), ConfigType::FloatingPoint);
    }

    #[test]
    fn non_finite_floats_become_strings() {
        let cfg = Config::new();
        cfg.set("n", f64::NAN).unwrap();
        cfg.set("i", f64::INFINITY).unwrap();
        let text = JsonAdapter::default().serialize(&cfg).unwrap();
        let back = parse(&text).unwrap();
        assert_eq!(back.get_string("n").unwrap(), "nan");
        assert_eq!(back.get_string("i").unwrap(), "inf");
    }
}
