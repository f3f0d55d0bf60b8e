//! Strictly-typed, hierarchical configuration trees.
//!
//! A configuration is a tree of named parameters. Groups map bare keys to
//! children, lists hold ordered, possibly mixed children, and every leaf is
//! one of a fixed set of scalar types. Trees are loaded from TOML, JSON or
//! libconfig text, addressed with key paths, edited in place and written
//! back out.
//!
//! ```ignore
//! let cfg = treecfg::load("app.toml")?;
//! let port = cfg.get_int_or("server.port", 8080)?;
//! let first = cfg.get_string("servers[0].name")?;
//!
//! let server = cfg.view("server")?;
//! server.set("port", 9090)?;          // visible through `cfg` as well
//! cfg.save("app.json")?;
//! ```
//!
//! # Values and types
//!
//! Leaves are booleans, 64-bit integers, floats, strings, dates, times and
//! date-times ([`Value`], [`ConfigType`]). There is no null. Integer and
//! floating point never mix silently: a conversion happens only when it is
//! exact, and only integers with magnitude up to 2^53 count as exactly
//! representable as floats ([`coerce::MAX_EXACT_FLOAT_INT`]).
//!
//! Types are sticky. Once `ratio = 3.0` exists, `set("ratio", 5)` stores
//! `5.0`, while `set("count", 5.5)` on an integer parameter fails with a
//! type mismatch. Replacing a scalar by a container, or the other way
//! round, is always an error.
//!
//! # Key paths
//!
//! `server.port`, `servers[1].name` and `matrix[0][1]` are key paths
//! ([`KeyPath`]). Keys are bare: ASCII letters, digits, `-` and `_`. Paths
//! relative to a list view may start with an index (`[0].name`). A path
//! that is well formed but does not resolve is
//! [`ConfigError::KeyNotFound`]; a malformed one is
//! [`ConfigError::KeySyntax`].
//!
//! # Views and copies
//!
//! [`Config`] is a handle onto a node of a shared tree. [`Config::view`]
//! returns another handle onto the same storage, so writes through either
//! are seen by both. [`Config::copy`] detaches a deep copy instead. Deleting
//! a parameter invalidates every view onto it or below it: later calls on
//! such a view fail with `KeyNotFound`, even if a parameter with the same
//! name is created again.
//!
//! # Formats
//!
//! | Format    | Read | Write | Notes                                          |
//! |-----------|------|-------|------------------------------------------------|
//! | TOML      | yes  | yes   | round trips every tree                         |
//! | JSON      | yes  | yes   | dates, times and non-finite floats as strings  |
//! | libconfig | yes  | yes   | behind the `libconfig` feature                 |
//!
//! Files are dispatched on their extension by [`load`] and
//! [`Config::save`]. JSON `null` is refused unless a [`NullValuePolicy`]
//! says otherwise.
//!
//! # Beyond get and set
//!
//! - [`Config::replace_placeholders`] substitutes text in every string
//!   parameter, applying pairs in order.
//! - [`Config::adjust_relative_paths`] prefixes relative file names in
//!   parameters whose names match wildcard patterns.
//! - [`Config::get_matrix`] and [`Config::set_matrix`] move 2-D numeric
//!   data between nested lists and flat buffers.
//! - [`to_value`] and [`Config::from_serialize`] ingest any `serde`
//!   serializable data, and [`Config::equals`] compares a tree with a
//!   [`Value`], a `serde_json::Value` or a `toml::Value` without converting
//!   either side.
//!
//! # Config actions
//!
//! [`ConfigAction`] and [`handle`] implement `list`, `get`, `set`, `unset`
//! and `convert` against a configuration file, independent of any CLI
//! framework. With the `clap` feature (on by default), [`ConfigArgs`] turns
//! command-line arguments into those actions.
//!
//! # Logging
//!
//! The crate emits `tracing` events at `debug` level for loads, saves and
//! bulk rewrites. It never installs a subscriber.

pub mod coerce;
pub mod error;
pub mod format;
pub mod key;
pub mod matrix;
pub mod types;
pub mod value;

mod compare;
mod config;
mod ops;
mod persist;
mod ser;
mod store;
mod typed;
mod walk;

#[cfg(feature = "clap")]
mod cli;

#[cfg(test)]
mod fixtures;

pub use coerce::Scalar;
pub use compare::{ScalarRef, Shape, ValueAccess, structural_eq};
pub use config::{Config, Item};
pub use error::{ConfigError, ErrorKind, Result};
pub use format::{
    Format, FormatAdapter, NullValuePolicy, load, load_json_file, load_json_file_with,
    load_json_str, load_json_str_with, load_libconfig_file, load_libconfig_str, load_toml_file,
    load_toml_str,
};
pub use key::{KeyPath, PathSegment};
pub use matrix::{Layout, Matrix, MatrixElement};
pub use ops::{ConfigResult, handle, handle_and_print};
pub use persist::parse_raw_value;
pub use ser::to_value;
pub use types::ConfigAction;
pub use value::{ConfigType, DateTime, Value};
pub use walk::ParameterNames;

#[cfg(feature = "clap")]
pub use cli::{ConfigArgs, ConfigSubcommand};
