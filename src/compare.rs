//! Structural equality between configuration data from different sources.
//!
//! Anything that can present itself as scalars, lists and groups implements
//! [`ValueAccess`]; [`structural_eq`] then compares any two such sources.
//! Integers never equal floats, groups compare without regard to key order
//! and NaN equals NaN.

use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;

use crate::store::{Node, NodeId, Store};
use crate::value::{DateTime, Value};

#[derive(Debug, Clone, Copy)]
pub enum ScalarRef<'a> {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(&'a str),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime),
}

impl PartialEq for ScalarRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarRef::Bool(a), ScalarRef::Bool(b)) => a == b,
            (ScalarRef::Integer(a), ScalarRef::Integer(b)) => a == b,
            (ScalarRef::Float(a), ScalarRef::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (ScalarRef::Str(a), ScalarRef::Str(b)) => a == b,
            (ScalarRef::Date(a), ScalarRef::Date(b)) => a == b,
            (ScalarRef::Time(a), ScalarRef::Time(b)) => a == b,
            (ScalarRef::DateTime(a), ScalarRef::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

/// One level of a value, with children still in their source representation.
pub enum Shape<'a, A> {
    /// Something with no configuration counterpart (JSON `null`).
    Null,
    Scalar(ScalarRef<'a>),
    List(Vec<A>),
    Group(Vec<(&'a str, A)>),
}

pub trait ValueAccess<'a>: Copy + 'a {
    fn shape(self) -> Shape<'a, Self>;
}

pub fn structural_eq<'a, 'b, A, B>(a: A, b: B) -> bool
where
    A: ValueAccess<'a>,
    B: ValueAccess<'b>,
{
    match (a.shape(), b.shape()) {
        (Shape::Scalar(x), Shape::Scalar(y)) => x == y,
        (Shape::List(xs), Shape::List(ys)) => {
            xs.len() == ys.len() && xs.into_iter().zip(ys).all(|(x, y)| structural_eq(x, y))
        }
        (Shape::Group(xs), Shape::Group(ys)) => {
            if xs.len() != ys.len() {
                return false;
            }
            let ys: HashMap<&str, B> = ys.into_iter().collect();
            xs.into_iter()
                .all(|(k, x)| ys.get(k).is_some_and(|y| structural_eq(x, *y)))
        }
        _ => false,
    }
}

impl<'a> ValueAccess<'a> for &'a Value {
    fn shape(self) -> Shape<'a, Self> {
        match self {
            Value::Bool(b) => Shape::Scalar(ScalarRef::Bool(*b)),
            Value::Integer(i) => Shape::Scalar(ScalarRef::Integer(*i)),
            Value::Float(f) => Shape::Scalar(ScalarRef::Float(*f)),
            Value::String(s) => Shape::Scalar(ScalarRef::Str(s)),
            Value::Date(d) => Shape::Scalar(ScalarRef::Date(*d)),
            Value::Time(t) => Shape::Scalar(ScalarRef::Time(*t)),
            Value::DateTime(dt) => Shape::Scalar(ScalarRef::DateTime(*dt)),
            Value::List(items) => Shape::List(items.iter().collect()),
            Value::Group(map) => Shape::Group(map.iter().map(|(k, v)| (k.as_str(), v)).collect()),
        }
    }
}

impl<'a> ValueAccess<'a> for &'a serde_json::Value {
    fn shape(self) -> Shape<'a, Self> {
        use serde_json::Value as Json;
        match self {
            Json::Null => Shape::Null,
            Json::Bool(b) => Shape::Scalar(ScalarRef::Bool(*b)),
            Json::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Shape::Scalar(ScalarRef::Integer(i)),
                // Integer literals beyond i64 match nothing.
                (None, Some(f)) if n.to_string().contains(['.', 'e', 'E']) => {
                    Shape::Scalar(ScalarRef::Float(f))
                }
                _ => Shape::Null,
            },
            Json::String(s) => Shape::Scalar(ScalarRef::Str(s)),
            Json::Array(items) => Shape::List(items.iter().collect()),
            Json::Object(map) => Shape::Group(map.iter().map(|(k, v)| (k.as_str(), v)).collect()),
        }
    }
}

impl<'a> ValueAccess<'a> for &'a toml::Value {
    fn shape(self) -> Shape<'a, Self> {
        use toml::Value as Toml;
        match self {
            Toml::Boolean(b) => Shape::Scalar(ScalarRef::Bool(*b)),
            Toml::Integer(i) => Shape::Scalar(ScalarRef::Integer(*i)),
            Toml::Float(f) => Shape::Scalar(ScalarRef::Float(*f)),
            Toml::String(s) => Shape::Scalar(ScalarRef::Str(s)),
            Toml::Datetime(dt) => match crate::format::toml::convert_datetime(dt) {
                Ok(Value::Date(d)) => Shape::Scalar(ScalarRef::Date(d)),
                Ok(Value::Time(t)) => Shape::Scalar(ScalarRef::Time(t)),
                Ok(Value::DateTime(dt)) => Shape::Scalar(ScalarRef::DateTime(dt)),
                _ => Shape::Null,
            },
            Toml::Array(items) => Shape::List(items.iter().collect()),
            Toml::Table(map) => Shape::Group(map.iter().map(|(k, v)| (k.as_str(), v)).collect()),
        }
    }
}

/// A node inside a [`Store`].
#[derive(Clone, Copy)]
pub(crate) struct NodeRef<'a> {
    pub(crate) store: &'a Store,
    pub(crate) id: NodeId,
}

impl<'a> ValueAccess<'a> for NodeRef<'a> {
    fn shape(self) -> Shape<'a, Self> {
        let store = self.store;
        let at = |id: NodeId| NodeRef { store, id };
        match store.node(self.id) {
            None => Shape::Null,
            Some(Node::Leaf(v)) => match v.shape() {
                Shape::Scalar(s) => Shape::Scalar(s),
                _ => Shape::Null,
            },
            Some(Node::List(items)) => Shape::List(items.iter().map(|c| at(*c)).collect()),
            Some(Node::Group(map)) => {
                Shape::Group(map.iter().map(|(k, c)| (k.as_str(), at(*c))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn group(entries: &[(&str, Value)]) -> Value {
        Value::Group(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<IndexMap<_, _>>(),
        )
    }

    #[test]
    fn integer_never_equals_float() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Float(1.0), Value::Float(1.0));
    }

    #[test]
    fn nan_equals_nan() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(f64::NAN), Value::Float(0.0));
    }

    #[test]
    fn groups_ignore_order() {
        let a = group(&[("x", Value::from(1)), ("y", Value::from("s"))]);
        let b = group(&[("y", Value::from("s")), ("x", Value::from(1))]);
        assert_eq!(a, b);
        let c = group(&[("x", Value::from(1))]);
        assert_ne!(a, c);
    }

    #[test]
    fn lists_respect_order() {
        assert_ne!(Value::from(vec![1, 2]), Value::from(vec![2, 1]));
        assert_ne!(Value::from(vec![1, 2]), Value::from(vec![1, 2, 3]));
    }

    #[test]
    fn compares_against_json() {
        let v = group(&[
            ("n", Value::from(3)),
            ("f", Value::from(0.5)),
            ("l", Value::from(vec!["a", "b"])),
        ]);
        let j = json!({"l": ["a", "b"], "f": 0.5, "n": 3});
        assert!(structural_eq(&v, &j));
        assert!(!structural_eq(&v, &json!({"l": ["a", "b"], "f": 0.5, "n": 3.0})));
        assert!(!structural_eq(&Value::from(1), &json!(null)));

        let big: serde_json::Value = serde_json::from_str("-100000000000000000000").unwrap();
        assert!(!structural_eq(&Value::Float(-1e20), &big));
        let small: serde_json::Value = serde_json::from_str("-1e20").unwrap();
        assert!(structural_eq(&Value::Float(-1e20), &small));
    }

    #[test]
    fn compares_against_toml() {
        let t: toml::Value = toml::from_str("a = 1\nd = 2024-01-31\n[g]\nx = [1.5]\n").unwrap();
        let v = group(&[
            ("a", Value::from(1)),
            ("d", Value::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())),
            ("g", group(&[("x", Value::from(vec![1.5]))])),
        ]);
        assert!(structural_eq(&v, &t));
    }
}
