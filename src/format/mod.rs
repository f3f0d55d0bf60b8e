//! Text formats: parsing into and serializing out of a [`Config`].
//!
//! Each format has an adapter implementing [`FormatAdapter`]. The free
//! functions below are the usual entry points; [`load`] picks the adapter
//! from the file extension.
//!
//! Reading never fails with an I/O error: a missing or unreadable file is a
//! [`ConfigError::Parse`] that names the file.

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key::KeyPath;
use crate::persist;
use crate::value::Value;

pub mod json;
pub mod libconfig;
pub mod toml;

pub use json::{JsonAdapter, NullValuePolicy};
pub use libconfig::LibconfigAdapter;
pub use toml::TomlAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Libconfig,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Toml => "TOML",
            Format::Json => "JSON",
            Format::Libconfig => "libconfig",
        }
    }

    /// `toml`, `json`, and `cfg`/`conf`/`libconfig`, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            "cfg" | "conf" | "libconfig" => Some(Format::Libconfig),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Format> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
            .ok_or_else(|| {
                ConfigError::parse("configuration", "unrecognized file extension").with_origin(path)
            })
    }

    /// The adapter for this format with default options.
    pub fn adapter(self) -> Box<dyn FormatAdapter> {
        match self {
            Format::Toml => Box::new(TomlAdapter),
            Format::Json => Box::new(JsonAdapter::default()),
            Format::Libconfig => Box::new(LibconfigAdapter),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A text format that can hold a configuration tree.
pub trait FormatAdapter {
    fn format(&self) -> Format;

    /// Parse a complete document. The document root becomes the tree root.
    fn parse(&self, text: &str) -> Result<Config>;

    fn parse_file(&self, path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::parse(self.format().name(), format!("cannot read file: {e}")).with_origin(path)
        })?;
        debug!(format = %self.format(), path = %path.display(), bytes = text.len(), "loading file");
        self.parse(&text).map_err(|e| e.with_origin(path))
    }

    /// Serialize the tree below `config`. A list view is written as a
    /// one-entry document named after the list.
    fn serialize(&self, config: &Config) -> Result<String>;
}

/// Load a file, choosing the format from its extension.
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    Format::from_path(path)?.adapter().parse_file(path)
}

pub fn load_toml_str(text: &str) -> Result<Config> {
    TomlAdapter.parse(text)
}

pub fn load_toml_file(path: impl AsRef<Path>) -> Result<Config> {
    TomlAdapter.parse_file(path.as_ref())
}

/// Parse JSON, refusing `null`.
pub fn load_json_str(text: &str) -> Result<Config> {
    JsonAdapter::default().parse(text)
}

pub fn load_json_file(path: impl AsRef<Path>) -> Result<Config> {
    JsonAdapter::default().parse_file(path.as_ref())
}

pub fn load_json_str_with(text: &str, null_policy: NullValuePolicy) -> Result<Config> {
    JsonAdapter::with_null_policy(null_policy).parse(text)
}

pub fn load_json_file_with(path: impl AsRef<Path>, null_policy: NullValuePolicy) -> Result<Config> {
    JsonAdapter::with_null_policy(null_policy).parse_file(path.as_ref())
}

pub fn load_libconfig_str(text: &str) -> Result<Config> {
    LibconfigAdapter.parse(text)
}

pub fn load_libconfig_file(path: impl AsRef<Path>) -> Result<Config> {
    LibconfigAdapter.parse_file(path.as_ref())
}

impl Config {
    pub fn to_toml(&self) -> Result<String> {
        TomlAdapter.serialize(self)
    }

    pub fn to_json(&self) -> Result<String> {
        JsonAdapter::default().serialize(self)
    }

    pub fn to_libconfig(&self) -> Result<String> {
        LibconfigAdapter.serialize(self)
    }

    /// Serialize in the format implied by the extension of `path` and write
    /// the file, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let text = format.adapter().serialize(self)?;
        debug!(%format, path = %path.display(), bytes = text.len(), "saving configuration");
        persist::write_file(path, &text)
    }

    /// Replace the string parameter at `path` with the tree loaded from the
    /// file it names. Relative names resolve against the working directory.
    pub fn load_nested(&self, path: &str) -> Result<()> {
        let key_path = KeyPath::parse(path)?;
        let file = self.get_string(path)?;
        let nested = load(&file)?;
        let group = Value::Group(nested.export_group()?);

        let mut store = self.write()?;
        let target = self.resolve(&store, key_path.segments())?;
        let fqn = self.describe(&store, key_path.segments());
        store.replace(target, group).ok_or_else(|| {
            ConfigError::type_mismatch(fqn.clone(), "the root of a tree cannot be replaced")
        })?;
        debug!(key = %fqn, file = %file, "loaded nested configuration");
        Ok(())
    }
}
