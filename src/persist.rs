//! Writing configuration files: patch single values into an existing file or
//! write a whole tree.
//!
//! TOML files are patched with `toml_edit` when the key is a plain dotted
//! path, so comments and layout survive a `set` or `unset`. Other formats,
//! and keys that reach into lists, are re-serialized from the tree.
//! Creates parent directories as needed.

use std::fs;
use std::io;
use std::path::Path;

use toml_edit::{DocumentMut, Item, Table, TableLike};
use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::format::toml::{convert_datetime, edit_value};
use crate::format::Format;
use crate::key::{KeyPath, PathSegment};
use crate::ops::{ConfigResult, display_value};
use crate::value::{ConfigType, Value};

/// Guess the type of a raw command-line value: bool, integer, float (only
/// when it contains a `.`), TOML date/time, and string otherwise.
pub fn parse_raw_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if raw.contains('.')
        && let Ok(f) = raw.parse::<f64>()
    {
        return Value::Float(f);
    }
    if let Ok(dt) = raw.parse::<toml::value::Datetime>()
        && let Ok(value) = convert_datetime(&dt)
    {
        return value;
    }
    Value::String(raw.to_string())
}

/// Set `keys` to `value` in a TOML document, creating tables on the way.
/// Everything else in the document is left as written.
pub fn set_in_document(content: &str, keys: &[&str], value: &Value) -> Result<String> {
    let mut doc = parse_document(content)?;
    let Some((leaf, parents)) = keys.split_last() else {
        return Err(ConfigError::key_syntax("", "key path is empty"));
    };

    let mut table: &mut dyn TableLike = doc.as_table_mut();
    for (i, k) in parents.iter().enumerate() {
        if !table.contains_key(k) {
            table.insert(k, Item::Table(Table::new()));
        }
        table = table
            .get_mut(k)
            .and_then(Item::as_table_like_mut)
            .ok_or_else(|| {
                ConfigError::type_mismatch(keys[..=i].join("."), "not a table in the document")
            })?;
    }
    // Overwrite in place so the key keeps its comments.
    let item = Item::Value(edit_value(value, &keys.join("."))?);
    match table.get_mut(leaf) {
        Some(existing) => *existing = item,
        None => {
            table.insert(leaf, item);
        }
    }

    Ok(doc.to_string())
}

/// Remove `keys` from a TOML document.
pub fn unset_in_document(content: &str, keys: &[&str]) -> Result<String> {
    let mut doc = parse_document(content)?;
    let missing = || ConfigError::KeyNotFound(keys.join("."));
    let Some((leaf, parents)) = keys.split_last() else {
        return Err(ConfigError::key_syntax("", "key path is empty"));
    };

    let mut table: &mut dyn TableLike = doc.as_table_mut();
    for k in parents {
        table = table
            .get_mut(k)
            .and_then(Item::as_table_like_mut)
            .ok_or_else(missing)?;
    }
    table.remove(leaf).ok_or_else(missing)?;

    Ok(doc.to_string())
}

/// Set `key` in `file` from a raw string. The file is created if missing.
///
/// The value goes through the tree first, so an existing parameter keeps
/// its type: `3` written to a float parameter is stored as `3.0`, and any
/// raw text written to a string parameter stays a string.
pub fn persist_value(file: &Path, key: &str, raw: &str) -> Result<ConfigResult> {
    let format = Format::from_path(file)?;
    let content = read_existing(file, format)?;
    let config = match &content {
        Some(text) => format.adapter().parse(text).map_err(|e| e.with_origin(file))?,
        None => Config::new(),
    };

    let value = match config.type_of(key) {
        Ok(ConfigType::String) => Value::String(raw.to_string()),
        _ => parse_raw_value(raw),
    };
    config.set(key, value)?;
    let stored = config.get(key)?;

    let path = KeyPath::parse(key)?;
    let new_content = match (content.as_deref(), format, dotted_keys(&path)) {
        (Some(text), Format::Toml, Some(keys)) => set_in_document(text, &keys, &stored)?,
        _ => format.adapter().serialize(&config)?,
    };
    write_file(file, &new_content)?;
    debug!(key, file = %file.display(), "persisted value");

    Ok(ConfigResult::ValueSet {
        key: key.into(),
        value: display_value(&stored),
    })
}

/// Remove `key` from `file`, which must exist.
pub fn unset_value(file: &Path, key: &str) -> Result<ConfigResult> {
    let format = Format::from_path(file)?;
    let content = read_existing(file, format)?.ok_or_else(|| {
        ConfigError::parse(format.name(), "file does not exist").with_origin(file)
    })?;
    let config = format
        .adapter()
        .parse(&content)
        .map_err(|e| e.with_origin(file))?;
    config.delete(key)?;

    let path = KeyPath::parse(key)?;
    let new_content = match (format, dotted_keys(&path)) {
        (Format::Toml, Some(keys)) => unset_in_document(&content, &keys)?,
        _ => format.adapter().serialize(&config)?,
    };
    write_file(file, &new_content)?;
    debug!(key, file = %file.display(), "removed value");

    Ok(ConfigResult::ValueUnset { key: key.into() })
}

/// Write `content` to `path`, creating parent directories.
pub(crate) fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, content).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_existing(file: &Path, format: Format) -> Result<Option<String>> {
    match fs::read_to_string(file) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::parse(format.name(), format!("cannot read file: {e}")).with_origin(file)),
    }
}

fn parse_document(content: &str) -> Result<DocumentMut> {
    content
        .parse()
        .map_err(|e: toml_edit::TomlError| ConfigError::parse("TOML", e.to_string()))
}

/// The path as plain keys, or `None` if it indexes into a list.
fn dotted_keys(path: &KeyPath) -> Option<Vec<&str>> {
    path.segments()
        .iter()
        .map(|segment| match segment {
            PathSegment::Key(k) => Some(k.as_str()),
            PathSegment::Index(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::format::{load, load_json_file};
    use tempfile::TempDir;

    #[test]
    fn raw_value_heuristics() {
        assert_eq!(parse_raw_value("TRUE"), Value::Bool(true));
        assert_eq!(parse_raw_value("42"), Value::Integer(42));
        assert_eq!(parse_raw_value("1.5"), Value::Float(1.5));
        assert_eq!(parse_raw_value("1e3"), Value::from("1e3"));
        assert_eq!(parse_raw_value("0.0.0.0"), Value::from("0.0.0.0"));
        assert_eq!(parse_raw_value("2024-01-31").config_type(), ConfigType::Date);
        assert_eq!(parse_raw_value("hello"), Value::from("hello"));
    }

    #[test]
    fn set_existing_key_preserves_comments() {
        let content = "# This is my config\nport = 8080\nhost = \"localhost\"\n# end\n";
        let result = set_in_document(content, &["port"], &Value::from(3000)).unwrap();
        assert!(result.contains("# This is my config"));
        assert!(result.contains("port = 3000"));
        assert!(result.contains("host = \"localhost\""));
        assert!(result.contains("# end"));
    }

    #[test]
    fn set_nested_key_creates_tables() {
        let result = set_in_document("", &["database", "pool_size"], &Value::from(20)).unwrap();
        let back = crate::format::load_toml_str(&result).unwrap();
        assert_eq!(back.get_int("database.pool_size").unwrap(), 20);
    }

    #[test]
    fn unset_removes_only_that_key() {
        let content = "# keep\n[database]\nurl = \"x\"\npool_size = 5\n";
        let result = unset_in_document(content, &["database", "url"]).unwrap();
        assert!(result.contains("# keep"));
        assert!(result.contains("pool_size = 5"));
        assert!(!result.contains("url"));
        let err = unset_in_document(content, &["database", "nope"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
    }

    #[test]
    fn persist_creates_file_and_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        let result = persist_value(&path, "server.port", "3000").unwrap();
        assert_eq!(
            result,
            ConfigResult::ValueSet {
                key: "server.port".into(),
                value: "3000".into(),
            }
        );
        assert_eq!(load(&path).unwrap().get_int("server.port").unwrap(), 3000);
    }

    #[test]
    fn persist_keeps_parameter_types() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "# tuning\nratio = 1.5\nname = \"x\"\nport = 1\n").unwrap();

        persist_value(&path, "ratio", "3").unwrap();
        persist_value(&path, "name", "42").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# tuning"));
        assert!(content.contains("ratio = 3.0"));
        assert!(content.contains("name = \"42\""));

        let err = persist_value(&path, "port", "abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(fs::read_to_string(&path).unwrap().contains("port = 1"));
    }

    #[test]
    fn persist_into_list_reserializes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[[servers]]\nname = \"alpha\"\n").unwrap();

        persist_value(&path, "servers[0].name", "beta").unwrap();
        assert_eq!(load(&path).unwrap().get_string("servers[0].name").unwrap(), "beta");
    }

    #[test]
    fn persist_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"debug": false}"#).unwrap();

        persist_value(&path, "debug", "true").unwrap();
        assert!(load_json_file(&path).unwrap().get_bool("debug").unwrap());
    }

    #[test]
    fn unset_value_in_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = 8080\n# note\nhost = \"h\"\n").unwrap();

        unset_value(&path, "port").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("port"));
        assert!(content.contains("host = \"h\""));

        let err = unset_value(&path, "port").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
        let err = unset_value(&dir.path().join("missing.toml"), "port").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
