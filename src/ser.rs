//! A serde `Serializer` that turns host data into a [`Value`].
//!
//! Structs and string-keyed maps become groups, sequences and tuples become
//! lists. Enum variants follow serde's externally tagged convention: a unit
//! variant is its name, any other variant is a one-entry group keyed by the
//! variant name. Values that have no configuration counterpart (`None`,
//! `()`, byte strings, integers beyond `i64`) are rejected.

use indexmap::IndexMap;
use serde::ser::{self, Serialize};

use crate::error::{self, ConfigError};
use crate::key;
use crate::value::Value;

/// Convert any `Serialize` value into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(data: &T) -> error::Result<Value> {
    data.serialize(ValueSerializer { at: String::new() })
        .map_err(|e| e.0)
}

#[derive(Debug)]
pub(crate) struct IngestError(ConfigError);

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IngestError {}

impl ser::Error for IngestError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        IngestError(ConfigError::type_mismatch("<host data>", msg.to_string()))
    }
}

fn mismatch(at: &str, reason: impl Into<String>) -> IngestError {
    let at = if at.is_empty() { "<root>" } else { at };
    IngestError(ConfigError::type_mismatch(at, reason))
}

fn checked_key(at: &str, key: &str) -> Result<String, IngestError> {
    let fqn = key::join(at, key);
    key::validate_bare_key(key)
        .map_err(|reason| IngestError(ConfigError::key_syntax(fqn.clone(), reason)))?;
    Ok(fqn)
}

fn tagged(variant: &'static str, value: Value) -> Value {
    let mut group = IndexMap::new();
    group.insert(variant.to_string(), value);
    Value::Group(group)
}

struct ValueSerializer {
    at: String,
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = IngestError;
    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = SeqSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = MapSerializer;

    fn serialize_bool(self, v: bool) -> Result<Value, IngestError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, IngestError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<Value, IngestError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<Value, IngestError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<Value, IngestError> {
        Ok(Value::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, IngestError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<Value, IngestError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<Value, IngestError> {
        self.serialize_i64(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<Value, IngestError> {
        match i64::try_from(v) {
            Ok(i) => Ok(Value::Integer(i)),
            Err(_) => Err(mismatch(&self.at, format!("integer {v} exceeds the 64-bit signed range"))),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Value, IngestError> {
        self.serialize_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<Value, IngestError> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, IngestError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, IngestError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Value, IngestError> {
        Err(mismatch(&self.at, "byte strings are not supported"))
    }

    fn serialize_none(self) -> Result<Value, IngestError> {
        Err(mismatch(&self.at, "null values cannot be stored"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, IngestError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, IngestError> {
        Err(mismatch(&self.at, "unit values cannot be stored"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value, IngestError> {
        Err(mismatch(&self.at, format!("unit struct {name} cannot be stored")))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, IngestError> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, IngestError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, IngestError> {
        let at = checked_key(&self.at, variant)?;
        let inner = value.serialize(ValueSerializer { at })?;
        Ok(tagged(variant, inner))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, IngestError> {
        Ok(SeqSerializer {
            at: self.at,
            variant: None,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, IngestError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, IngestError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, IngestError> {
        let at = checked_key(&self.at, variant)?;
        Ok(SeqSerializer {
            at,
            variant: Some(variant),
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapSerializer, IngestError> {
        Ok(MapSerializer {
            at: self.at,
            variant: None,
            entries: IndexMap::with_capacity(len.unwrap_or(0)),
            current_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapSerializer, IngestError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapSerializer, IngestError> {
        let at = checked_key(&self.at, variant)?;
        Ok(MapSerializer {
            at,
            variant: Some(variant),
            entries: IndexMap::with_capacity(len),
            current_key: None,
        })
    }
}

// --- sequences ---

struct SeqSerializer {
    at: String,
    variant: Option<&'static str>,
    items: Vec<Value>,
}

impl SeqSerializer {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), IngestError> {
        let at = format!("{}[{}]", self.at, self.items.len());
        self.items.push(value.serialize(ValueSerializer { at })?);
        Ok(())
    }

    fn finish(self) -> Value {
        let list = Value::List(self.items);
        match self.variant {
            Some(variant) => tagged(variant, list),
            None => list,
        }
    }
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Value;
    type Error = IngestError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), IngestError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, IngestError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Value;
    type Error = IngestError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), IngestError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, IngestError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Value;
    type Error = IngestError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), IngestError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, IngestError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SeqSerializer {
    type Ok = Value;
    type Error = IngestError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), IngestError> {
        self.push(value)
    }

    fn end(self) -> Result<Value, IngestError> {
        Ok(self.finish())
    }
}

// --- maps and structs ---

struct MapSerializer {
    at: String,
    variant: Option<&'static str>,
    entries: IndexMap<String, Value>,
    current_key: Option<String>,
}

impl MapSerializer {
    fn insert<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> Result<(), IngestError> {
        let at = checked_key(&self.at, &key)?;
        let value = value.serialize(ValueSerializer { at })?;
        self.entries.insert(key, value);
        Ok(())
    }

    fn finish(self) -> Value {
        let group = Value::Group(self.entries);
        match self.variant {
            Some(variant) => tagged(variant, group),
            None => group,
        }
    }
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Value;
    type Error = IngestError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), IngestError> {
        let key = key.serialize(KeySerializer).map_err(|_| {
            mismatch(&self.at, "group keys must be strings")
        })?;
        self.current_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), IngestError> {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| mismatch(&self.at, "map value serialized without a key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<Value, IngestError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = Value;
    type Error = IngestError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), IngestError> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Value, IngestError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapSerializer {
    type Ok = Value;
    type Error = IngestError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), IngestError> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Value, IngestError> {
        Ok(self.finish())
    }
}

// --- map keys ---

/// Accepts only string-like keys; everything else is rejected by the caller
/// with a message naming the map's location.
struct KeySerializer;

macro_rules! reject_keys {
    ($($method:ident($($arg:ty),*);)*) => {
        $(
            fn $method(self, $(_: $arg),*) -> Result<String, IngestError> {
                Err(mismatch("", "group keys must be strings"))
            }
        )*
    };
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = IngestError;
    type SerializeSeq = ser::Impossible<String, IngestError>;
    type SerializeTuple = ser::Impossible<String, IngestError>;
    type SerializeTupleStruct = ser::Impossible<String, IngestError>;
    type SerializeTupleVariant = ser::Impossible<String, IngestError>;
    type SerializeMap = ser::Impossible<String, IngestError>;
    type SerializeStruct = ser::Impossible<String, IngestError>;
    type SerializeStructVariant = ser::Impossible<String, IngestError>;

    fn serialize_str(self, v: &str) -> Result<String, IngestError> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String, IngestError> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        v: &'static str,
    ) -> Result<String, IngestError> {
        Ok(v.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        v: &T,
    ) -> Result<String, IngestError> {
        v.serialize(self)
    }

    reject_keys! {
        serialize_bool(bool);
        serialize_i8(i8);
        serialize_i16(i16);
        serialize_i32(i32);
        serialize_i64(i64);
        serialize_u8(u8);
        serialize_u16(u16);
        serialize_u32(u32);
        serialize_u64(u64);
        serialize_f32(f32);
        serialize_f64(f64);
        serialize_bytes(&[u8]);
        serialize_none();
        serialize_unit();
        serialize_unit_struct(&'static str);
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _: &T) -> Result<String, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<String, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, IngestError> {
        Err(mismatch("", "group keys must be strings"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ErrorKind;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Database {
        url: String,
        pool_size: u32,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "lowercase")]
    enum Mode {
        Fast,
        Careful { retries: u8 },
    }

    #[derive(Serialize)]
    struct App {
        name: &'static str,
        ratio: f64,
        tags: Vec<&'static str>,
        database: Database,
        mode: Mode,
        other: Mode,
    }

    fn app() -> App {
        App {
            name: "demo",
            ratio: 0.25,
            tags: vec!["a", "b"],
            database: Database {
                url: "pg://localhost".into(),
                pool_size: 5,
            },
            mode: Mode::Fast,
            other: Mode::Careful { retries: 3 },
        }
    }

    #[test]
    fn structs_become_groups() {
        let cfg = Config::from_serialize(&app()).unwrap();
        assert_eq!(cfg.get_string("name").unwrap(), "demo");
        assert_eq!(cfg.get_float("ratio").unwrap(), 0.25);
        assert_eq!(cfg.get_string("tags[1]").unwrap(), "b");
        assert_eq!(cfg.get_int("database.pool_size").unwrap(), 5);
        assert_eq!(cfg.get_string("mode").unwrap(), "fast");
        assert_eq!(cfg.get_int("other.careful.retries").unwrap(), 3);
        assert_eq!(cfg.keys().unwrap(), vec!["name", "ratio", "tags", "database", "mode", "other"]);
    }

    #[test]
    fn maps_with_string_keys() {
        let mut map = BTreeMap::new();
        map.insert("alpha", vec![1, 2]);
        map.insert("beta", vec![]);
        let cfg = Config::from_serialize(&map).unwrap();
        assert_eq!(cfg.length("alpha").unwrap(), 2);
        assert!(cfg.view("beta").unwrap().is_empty().unwrap());
    }

    #[test]
    fn none_is_rejected() {
        #[derive(Serialize)]
        struct WithOption {
            present: Option<i32>,
            absent: Option<i32>,
        }
        let err = Config::from_serialize(&WithOption {
            present: Some(1),
            absent: None,
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn non_string_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert(1, "one");
        let err = to_value(&map).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn invalid_key_names_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert("has space", 1);
        let err = to_value(&map).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeySyntax);
    }

    #[test]
    fn huge_unsigned_is_rejected() {
        let err = to_value(&u64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(to_value(&7u64).unwrap(), Value::Integer(7));
    }

    #[test]
    fn root_must_be_a_group() {
        let err = Config::from_serialize(&vec![1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
