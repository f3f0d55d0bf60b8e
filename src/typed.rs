//! Typed getters and setters on [`Config`].
//!
//! Every getter has an `_or` twin that returns a default when the key does
//! not exist. Defaults only cover absence: a parameter that exists with the
//! wrong type is still an error, as is a malformed key.

use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;

use crate::coerce::Scalar;
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key::KeyPath;
use crate::store::Node;
use crate::value::{ConfigType, DateTime, Value};

impl Config {
    /// Read a scalar as `T`, applying exact numeric conversion.
    pub fn get_as<T: Scalar>(&self, path: &str) -> Result<T> {
        let path = KeyPath::parse(path)?;
        let store = self.read()?;
        let id = self.resolve(&store, path.segments())?;
        let fqn = || self.describe(&store, path.segments());
        match store.node(id) {
            Some(Node::Leaf(v)) => T::from_value(v).ok_or_else(|| {
                ConfigError::type_mismatch(
                    fqn(),
                    format!("{} value {v} cannot be read as {}", v.config_type(), T::TYPE),
                )
            }),
            Some(node) => Err(ConfigError::type_mismatch(
                fqn(),
                format!("expected {}, found a {}", T::TYPE, node.config_type()),
            )),
            None => Err(ConfigError::KeyNotFound(fqn())),
        }
    }

    pub fn get_as_or<T: Scalar>(&self, path: &str, default: T) -> Result<T> {
        self.or_default(self.get_as(path), default)
    }

    pub fn set_as<T: Scalar>(&self, path: &str, value: T) -> Result<()> {
        self.set(path, value.into_value())
    }

    /// Owned copy of the list at `path`.
    pub fn get_list(&self, path: &str) -> Result<Vec<Value>> {
        match self.get(path)? {
            Value::List(items) => Ok(items),
            other => Err(self.expected(path, ConfigType::List, &other)),
        }
    }

    pub fn get_list_or(&self, path: &str, default: Vec<Value>) -> Result<Vec<Value>> {
        self.or_default(self.get_list(path), default)
    }

    /// Owned copy of the group at `path`.
    pub fn get_group(&self, path: &str) -> Result<IndexMap<String, Value>> {
        match self.get(path)? {
            Value::Group(group) => Ok(group),
            other => Err(self.expected(path, ConfigType::Group, &other)),
        }
    }

    pub fn get_group_or(
        &self,
        path: &str,
        default: IndexMap<String, Value>,
    ) -> Result<IndexMap<String, Value>> {
        self.or_default(self.get_group(path), default)
    }

    pub(crate) fn or_default<T>(&self, result: Result<T>, default: T) -> Result<T> {
        match result {
            Err(ConfigError::KeyNotFound(_)) if self.is_valid() => Ok(default),
            other => other,
        }
    }

    fn expected(&self, path: &str, expected: ConfigType, found: &Value) -> ConfigError {
        let fqn = match self.path() {
            Ok(base) if !base.is_root() => format!("{base}.{path}"),
            _ => path.to_string(),
        };
        ConfigError::type_mismatch(
            fqn,
            format!("expected a {expected}, found a {}", found.config_type()),
        )
    }
}

macro_rules! typed_accessors {
    ($($ty:ty => $get:ident, $get_or:ident, $set:ident;)*) => {
        impl Config {
            $(
                pub fn $get(&self, path: &str) -> Result<$ty> {
                    self.get_as(path)
                }

                pub fn $get_or(&self, path: &str, default: impl Into<$ty>) -> Result<$ty> {
                    self.get_as_or(path, default.into())
                }

                pub fn $set(&self, path: &str, value: impl Into<$ty>) -> Result<()> {
                    self.set_as::<$ty>(path, value.into())
                }
            )*
        }
    };
}

typed_accessors! {
    bool => get_bool, get_bool_or, set_bool;
    i64 => get_int, get_int_or, set_int;
    i32 => get_int32, get_int32_or, set_int32;
    f64 => get_float, get_float_or, set_float;
    String => get_string, get_string_or, set_string;
    NaiveDate => get_date, get_date_or, set_date;
    NaiveTime => get_time, get_time_or, set_time;
    DateTime => get_datetime, get_datetime_or, set_datetime;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures;
    use crate::format::load_toml_str;

    fn scalars() -> Config {
        load_toml_str(fixtures::SCALARS).unwrap()
    }

    #[test]
    fn reads_each_scalar_type() {
        let cfg = scalars();
        assert!(cfg.get_bool("flag").unwrap());
        assert_eq!(cfg.get_int("int").unwrap(), 42);
        assert_eq!(cfg.get_float("flt").unwrap(), 1.5);
        assert_eq!(cfg.get_string("str").unwrap(), "value");
        assert_eq!(
            cfg.get_date("day").unwrap(),
            NaiveDate::from_ymd_opt(2000, 2, 29).unwrap()
        );
        assert_eq!(
            cfg.get_time("tm").unwrap(),
            NaiveTime::from_hms_milli_opt(17, 30, 15, 123).unwrap()
        );
        assert_eq!(cfg.get_datetime("dt").unwrap().offset_minutes, Some(0));
    }

    #[test]
    fn exact_numeric_reads() {
        let cfg = scalars();
        assert_eq!(cfg.get_int("flt2").unwrap(), -3);
        assert_eq!(cfg.get_float("int").unwrap(), 42.0);
        assert_eq!(cfg.get_int("flt").unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(cfg.get_int32("big").unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(cfg.get_int("big").unwrap(), 1 << 40);
    }

    #[test]
    fn no_implicit_string_conversion() {
        let cfg = scalars();
        assert_eq!(cfg.get_int("numstr").unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(cfg.get_string("int").unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(cfg.get_bool("int").unwrap_err().kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn defaults_cover_only_absence() {
        let cfg = scalars();
        assert_eq!(cfg.get_int_or("missing", 7).unwrap(), 7);
        assert_eq!(cfg.get_string_or("nested.missing", "x").unwrap(), "x");
        assert_eq!(cfg.get_int_or("int", 7).unwrap(), 42);
        assert_eq!(cfg.get_int_or("str", 7).unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(cfg.get_int_or("bad key", 7).unwrap_err().kind(), ErrorKind::KeySyntax);
    }

    #[test]
    fn containers_are_not_scalars() {
        let cfg = scalars();
        cfg.set("lst", vec![1, 2]).unwrap();
        assert_eq!(cfg.get_int("lst").unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(cfg.get_list("lst").unwrap(), vec![Value::from(1), Value::from(2)]);
        assert_eq!(cfg.get_group("lst").unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert_eq!(cfg.get_list("int").unwrap_err().kind(), ErrorKind::TypeMismatch);
        assert!(cfg.get_list_or("none", vec![]).unwrap().is_empty());
    }

    #[test]
    fn typed_setters_respect_existing_type() {
        let cfg = scalars();
        cfg.set_int("flt", 3).unwrap();
        assert_eq!(cfg.type_of("flt").unwrap(), ConfigType::FloatingPoint);
        assert_eq!(cfg.set_string("int", "x").unwrap_err().kind(), ErrorKind::TypeMismatch);
        cfg.set_date("new.day", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        assert_eq!(cfg.type_of("new.day").unwrap(), ConfigType::Date);
    }
}
