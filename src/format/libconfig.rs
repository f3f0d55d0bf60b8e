//! libconfig adapter, available with the `libconfig` feature.
//!
//! Groups map to groups; arrays `[ ]` and lists `( )` both map to lists.
//! libconfig has no date or time types, so those are written as strings.
//! Without the feature every call fails with [`ConfigError::Unsupported`](crate::ConfigError::Unsupported).

use super::{Format, FormatAdapter};
use crate::config::Config;
#[cfg(not(feature = "libconfig"))]
use crate::error::ConfigError;
use crate::error::Result;

#[cfg(feature = "libconfig")]
const NAME: &str = "libconfig";

#[derive(Debug, Clone, Copy, Default)]
pub struct LibconfigAdapter;

#[cfg(not(feature = "libconfig"))]
fn unsupported() -> ConfigError {
    ConfigError::Unsupported {
        format: "libconfig",
        feature: "libconfig",
    }
}

impl FormatAdapter for LibconfigAdapter {
    fn format(&self) -> Format {
        Format::Libconfig
    }

    #[cfg(feature = "libconfig")]
    fn parse(&self, text: &str) -> Result<Config> {
        let group = grammar::parse(text)?;
        tracing::debug!(entries = group.len(), "parsed libconfig document");
        Config::from_group(group)
    }

    #[cfg(not(feature = "libconfig"))]
    fn parse(&self, _text: &str) -> Result<Config> {
        Err(unsupported())
    }

    #[cfg(feature = "libconfig")]
    fn serialize(&self, config: &Config) -> Result<String> {
        let group = config.export_group()?;
        let mut out = String::new();
        emit::write_group(&mut out, &group, 0, "")?;
        Ok(out)
    }

    #[cfg(not(feature = "libconfig"))]
    fn serialize(&self, _config: &Config) -> Result<String> {
        Err(unsupported())
    }
}

#[cfg(feature = "libconfig")]
mod grammar {
    use indexmap::IndexMap;
    use pest::Parser;
    use pest::iterators::Pair;
    use pest_derive::Parser;

    use super::NAME;
    use crate::error::{ConfigError, Result};
    use crate::key;
    use crate::value::Value;

    #[derive(Parser)]
    #[grammar = "format/libconfig.pest"]
    struct LibconfigParser;

    pub(super) fn parse(text: &str) -> Result<IndexMap<String, Value>> {
        let mut pairs = LibconfigParser::parse(Rule::config, text)
            .map_err(|e| ConfigError::parse(NAME, e.to_string()))?;
        match pairs.next() {
            Some(config) => settings(config.into_inner(), ""),
            None => Ok(IndexMap::new()),
        }
    }

    fn settings<'i>(
        pairs: impl Iterator<Item = Pair<'i, Rule>>,
        at: &str,
    ) -> Result<IndexMap<String, Value>> {
        let mut group = IndexMap::new();
        for setting in pairs.filter(|p| p.as_rule() == Rule::setting) {
            let mut inner = setting.into_inner();
            let (Some(name), Some(value)) = (inner.next(), inner.next()) else {
                continue;
            };
            let name = name.as_str().to_string();
            let fqn = key::join(at, &name);
            key::validate_bare_key(&name)
                .map_err(|reason| ConfigError::parse(NAME, format!("setting '{fqn}': {reason}")))?;
            let value = convert(value, &fqn)?;
            if group.insert(name, value).is_some() {
                return Err(ConfigError::parse(NAME, format!("duplicate setting '{fqn}'")));
            }
        }
        Ok(group)
    }

    fn convert(pair: Pair<'_, Rule>, at: &str) -> Result<Value> {
        let text = pair.as_str();
        match pair.as_rule() {
            Rule::group => Ok(Value::Group(settings(pair.into_inner(), at)?)),
            Rule::array | Rule::list => pair
                .into_inner()
                .enumerate()
                .map(|(i, p)| convert(p, &format!("{at}[{i}]")))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Rule::boolean => Ok(Value::Bool(text.eq_ignore_ascii_case("true"))),
            Rule::float => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| ConfigError::parse(NAME, format!("{at}: {e}"))),
            Rule::integer => integer(text)
                .map(Value::Integer)
                .ok_or_else(|| ConfigError::parse(NAME, format!("{at}: integer {text} is out of range"))),
            Rule::string => Ok(Value::String(
                pair.into_inner()
                    .filter_map(|part| part.into_inner().next())
                    .map(|body| unescape(body.as_str()))
                    .collect(),
            )),
            other => Err(ConfigError::parse(
                NAME,
                format!("{at}: unexpected {other:?}"),
            )),
        }
    }

    /// Decimal or hex, with optional sign and `u`/`L`/`LL` suffixes. Hex
    /// literals are taken as unsigned 64-bit patterns.
    fn integer(text: &str) -> Option<i64> {
        let body = text.trim_end_matches(['l', 'L', 'u', 'U']);
        let (negative, digits) = match body.as_bytes().first() {
            Some(b'-') => (true, &body[1..]),
            Some(b'+') => (false, &body[1..]),
            _ => (false, body),
        };
        // The magnitude is read unsigned so that i64::MIN is reachable.
        let (magnitude, hex) = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            Some(hex) => (u64::from_str_radix(hex, 16).ok()?, true),
            None => (digits.parse::<u64>().ok()?, false),
        };
        match (negative, hex) {
            (true, _) => i64::try_from(-i128::from(magnitude)).ok(),
            (false, true) => Some(magnitude as i64),
            (false, false) => i64::try_from(magnitude).ok(),
        }
    }

    fn unescape(body: &str) -> String {
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('f') => out.push('\u{0c}'),
                Some('x') => {
                    let hex: String = chars.clone().take(2).collect();
                    match u8::from_str_radix(&hex, 16) {
                        Ok(byte) if hex.len() == 2 => {
                            out.push(char::from(byte));
                            chars.nth(1);
                        }
                        _ => out.push('x'),
                    }
                }
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn integer_forms() {
            assert_eq!(integer("42"), Some(42));
            assert_eq!(integer("-7"), Some(-7));
            assert_eq!(integer("0x1F"), Some(31));
            assert_eq!(integer("9000000000L"), Some(9_000_000_000));
            assert_eq!(integer("99999999999999999999"), None);
            assert_eq!(integer("-9223372036854775808L"), Some(i64::MIN));
            assert_eq!(integer("-9223372036854775809L"), None);
            assert_eq!(integer("9223372036854775808L"), None);
            assert_eq!(integer("0xFFFFFFFFFFFFFFFF"), Some(-1));
        }

        #[test]
        fn escapes() {
            assert_eq!(unescape(r#"a\"b\\c\n\x41"#), "a\"b\\c\nA");
            assert_eq!(unescape(r"\xZZ"), "xZZ");
        }
    }
}

#[cfg(feature = "libconfig")]
mod emit {
    use indexmap::IndexMap;

    use crate::error::{ConfigError, Result};
    use crate::key;
    use crate::value::{Value, format_float};

    /// Setting names must start with a letter; bare keys such as `1st` or
    /// `_tmp` have no libconfig spelling.
    pub(super) fn write_group(
        out: &mut String,
        group: &IndexMap<String, Value>,
        depth: usize,
        prefix: &str,
    ) -> Result<()> {
        for (k, v) in group {
            let fqn = key::join(prefix, k);
            if !k.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return Err(ConfigError::type_mismatch(
                    fqn,
                    "libconfig setting names must start with a letter",
                ));
            }
            indent(out, depth);
            out.push_str(k);
            out.push_str(" = ");
            write_value(out, v, depth, &fqn)?;
            out.push_str(";\n");
        }
        Ok(())
    }

    fn indent(out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
    }

    fn quote(out: &mut String, s: &str) {
        out.push('"');
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                '\u{0c}' => out.push_str("\\f"),
                c if u32::from(c) < 0x20 => out.push_str(&format!("\\x{:02x}", u32::from(c))),
                c => out.push(c),
            }
        }
        out.push('"');
    }

    /// Homogeneous scalar lists can use the array syntax; anything else
    /// needs a list.
    fn is_array(items: &[Value]) -> bool {
        match items.first() {
            None => true,
            Some(first) => {
                let t = first.config_type();
                !t.is_container() && items.iter().all(|v| v.config_type() == t)
            }
        }
    }

    fn write_value(out: &mut String, value: &Value, depth: usize, at: &str) -> Result<()> {
        match value {
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Integer(i) => {
                out.push_str(&i.to_string());
                if i32::try_from(*i).is_err() {
                    out.push('L');
                }
            }
            Value::Float(f) if f.is_finite() => out.push_str(&format_float(*f)),
            // No libconfig spelling for these.
            Value::Float(_) | Value::Date(_) | Value::Time(_) | Value::DateTime(_) => {
                let text = match value {
                    Value::Float(f) => format_float(*f),
                    other => other.to_string(),
                };
                quote(out, &text)
            }
            Value::String(s) => quote(out, s),
            Value::List(items) => {
                let (open, close) = if is_array(items) { ("[", "]") } else { ("(", ")") };
                out.push_str(open);
                for (i, item) in items.iter().enumerate() {
                    out.push_str(if i == 0 { " " } else { ", " });
                    write_value(out, item, depth, &format!("{at}[{i}]"))?;
                }
                out.push_str(if items.is_empty() { "" } else { " " });
                out.push_str(close);
            }
            Value::Group(group) => {
                out.push_str("{\n");
                write_group(out, group, depth + 1, at)?;
                indent(out, depth);
                out.push('}');
            }
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "libconfig"))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures;
    use crate::format::load_toml_str;
    use crate::value::{ConfigType, Value};

    const SAMPLE: &str = r#"
# application settings
name = "demo" " app";
version = 3;
big = 9000000000L;
ratio: 0.5
enabled = TRUE;
/* nested */
window = {
  size = [ 640, 480 ];
  title = "main\twindow";
};
items = ( 1, "two", { three = 3.0; } );
"#;

    #[test]
    fn parses_settings_groups_and_lists() {
        let cfg = LibconfigAdapter.parse(SAMPLE).unwrap();
        assert_eq!(cfg.get_string("name").unwrap(), "demo app");
        assert_eq!(cfg.get_int("version").unwrap(), 3);
        assert_eq!(cfg.get_int("big").unwrap(), 9_000_000_000);
        assert_eq!(cfg.get_float("ratio").unwrap(), 0.5);
        assert!(cfg.get_bool("enabled").unwrap());
        assert_eq!(cfg.get_int("window.size[1]").unwrap(), 480);
        assert_eq!(cfg.get_string("window.title").unwrap(), "main\twindow");
        assert_eq!(cfg.type_of("items[2]").unwrap(), ConfigType::Group);
        assert_eq!(cfg.type_of("items[2].three").unwrap(), ConfigType::FloatingPoint);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert_eq!(LibconfigAdapter.parse("a = ;").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(LibconfigAdapter.parse("a = 1; a = 2;").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(LibconfigAdapter.parse("a* = 1;").unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn round_trip_through_libconfig() {
        let cfg = load_toml_str(fixtures::NESTED).unwrap();
        cfg.set("text", "quote \" and \\ and\nnewline").unwrap();
        cfg.set("huge", i64::MAX).unwrap();
        cfg.set("tiny", i64::MIN).unwrap();
        cfg.set("mixed", vec![Value::from(1), Value::from("x")]).unwrap();
        let text = LibconfigAdapter.serialize(&cfg).unwrap();
        let back = LibconfigAdapter.parse(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn names_without_a_leading_letter_cannot_be_written() {
        let cfg = Config::new();
        cfg.set("1st", 1).unwrap();
        let err = LibconfigAdapter.serialize(&cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.to_string().contains("1st"));

        let cfg = Config::new();
        cfg.set("outer.list", vec![Value::empty_group()]).unwrap();
        cfg.set("outer.list[0]._tmp", true).unwrap();
        let err = LibconfigAdapter.serialize(&cfg).unwrap_err();
        assert!(err.to_string().contains("outer.list[0]._tmp"));

        let cfg = Config::new();
        cfg.set("-dash", 1).unwrap();
        assert!(LibconfigAdapter.serialize(&cfg).is_err());
    }

    #[test]
    fn dates_are_written_as_strings() {
        let cfg = load_toml_str(fixtures::SCALARS).unwrap();
        let text = LibconfigAdapter.serialize(&cfg).unwrap();
        let back = LibconfigAdapter.parse(&text).unwrap();
        assert_eq!(back.get_string("day").unwrap(), "2000-02-29");
        assert_eq!(back.get_float("flt2").unwrap(), -3.0);
    }
}
