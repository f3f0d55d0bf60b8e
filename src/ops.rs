//! Config operations on a file: listing, key lookup, set/unset, format
//! conversion, and the `ConfigResult` enum that callers use to display
//! results.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::format;
use crate::persist;
use crate::types::ConfigAction;
use crate::value::{ConfigType, Value};
use crate::walk::ParameterNames;

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// Every scalar and list parameter, flattened to dotted names.
    Listing { entries: Vec<(String, String)> },
    /// A key's value.
    KeyValue { key: String, value: String },
    /// Confirmation that a value was persisted, with the value as stored.
    ValueSet { key: String, value: String },
    /// Confirmation that a value was removed.
    ValueUnset { key: String },
    /// Confirmation that a file was rewritten in another format.
    Converted { from: PathBuf, to: PathBuf },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
            ConfigResult::KeyValue { key, value } => write!(f, "{key} = {value}"),
            ConfigResult::ValueSet { key, value } => write!(f, "Set {key} = {value}"),
            ConfigResult::ValueUnset { key } => write!(f, "Unset {key}"),
            ConfigResult::Converted { from, to } => {
                write!(f, "Converted {} to {}", from.display(), to.display())
            }
        }
    }
}

/// Run `action` against the configuration file at `file`.
pub fn handle(file: &Path, action: &ConfigAction) -> Result<ConfigResult> {
    match action {
        ConfigAction::List => list_values(&format::load(file)?),
        ConfigAction::Get { key } => get_value(&format::load(file)?, key),
        ConfigAction::Set { key, value } => persist::persist_value(file, key, value),
        ConfigAction::Unset { key } => persist::unset_value(file, key),
        ConfigAction::Convert { output } => {
            format::load(file)?.save(output)?;
            Ok(ConfigResult::Converted {
                from: file.to_path_buf(),
                to: output.clone(),
            })
        }
    }
}

/// Handle an action and print the result to stdout.
pub fn handle_and_print(file: &Path, action: &ConfigAction) -> Result<()> {
    let result = handle(file, action)?;
    println!("{result}");
    Ok(())
}

pub fn get_value(config: &Config, key: &str) -> Result<ConfigResult> {
    let value = config.get(key)?;
    Ok(ConfigResult::KeyValue {
        key: key.into(),
        value: display_value(&value),
    })
}

/// List every parameter that is not a group. Lists are shown inline rather
/// than element by element.
pub fn list_values(config: &Config) -> Result<ConfigResult> {
    let mut entries = Vec::new();
    for name in config.list_parameter_names(ParameterNames::default())? {
        if name.contains('[') || config.type_of(&name)? == ConfigType::Group {
            continue;
        }
        let value = config.get(&name)?;
        entries.push((name, display_value(&value)));
    }
    Ok(ConfigResult::Listing { entries })
}

/// Format a value for display: strings bare, everything else inline.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
