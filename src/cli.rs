//! Clap adapter.
//!
//! Compiled only with the `clap` Cargo feature (on by default). Embed
//! [`ConfigArgs`] in your own `#[derive(Parser)]` type to get
//! `config list|get|set|unset|convert` subcommands over a configuration
//! file. [`ConfigArgs::into_action()`] is the only bridge to the core: it
//! yields the file path and a [`ConfigAction`](crate::ConfigAction) for
//! [`handle`](crate::handle).

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::types::ConfigAction;

/// Clap-derived args for the `config` subcommand group.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(subcommand)]
///     command: Commands,
/// }
///
/// #[derive(Subcommand)]
/// enum Commands {
///     Config(ConfigArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Configuration file to operate on. The extension selects the format.
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub file: PathBuf,

    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show every parameter with its value.
    List,
    /// Show the value at a key path.
    Get {
        /// Key path (e.g. "database.url" or "servers[0].name").
        key: String,
    },
    /// Write a value to the file. Existing parameters keep their type.
    Set {
        key: String,
        value: String,
    },
    /// Remove a parameter from the file.
    Unset {
        key: String,
    },
    /// Write the file out again in another format.
    Convert {
        /// Output file; its extension selects the format.
        output: PathBuf,
    },
}

impl ConfigArgs {
    /// Bare `config` (no subcommand) and explicit `config list` both map to
    /// `ConfigAction::List`.
    pub fn into_action(self) -> (PathBuf, ConfigAction) {
        let action = match self.action {
            None | Some(ConfigSubcommand::List) => ConfigAction::List,
            Some(ConfigSubcommand::Get { key }) => ConfigAction::Get { key },
            Some(ConfigSubcommand::Set { key, value }) => ConfigAction::Set { key, value },
            Some(ConfigSubcommand::Unset { key }) => ConfigAction::Unset { key },
            Some(ConfigSubcommand::Convert { output }) => ConfigAction::Convert { output },
        };
        (self.file, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    /// Wrapper so we can use `try_parse_from` on the subcommand.
    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    fn parse(args: &[&str]) -> (PathBuf, ConfigAction) {
        TestCli::try_parse_from(args).unwrap().config.into_action()
    }

    #[test]
    fn parse_bare_config_is_list() {
        let (file, action) = parse(&["test"]);
        assert_eq!(file, PathBuf::from("config.toml"));
        assert_eq!(action, ConfigAction::List);
    }

    #[test]
    fn parse_get() {
        let (_, action) = parse(&["test", "get", "servers[0].name"]);
        assert_eq!(
            action,
            ConfigAction::Get {
                key: "servers[0].name".into()
            }
        );
    }

    #[test]
    fn parse_set_string_value() {
        let (_, action) = parse(&["test", "set", "host", "0.0.0.0"]);
        assert_eq!(
            action,
            ConfigAction::Set {
                key: "host".into(),
                value: "0.0.0.0".into(),
            }
        );
    }

    #[test]
    fn parse_unset() {
        let (_, action) = parse(&["test", "unset", "database.url"]);
        assert_eq!(
            action,
            ConfigAction::Unset {
                key: "database.url".into()
            }
        );
    }

    #[test]
    fn parse_file_before_and_after_subcommand() {
        let (file, _) = parse(&["test", "--file", "app.json", "list"]);
        assert_eq!(file, PathBuf::from("app.json"));
        let (file, action) = parse(&["test", "convert", "out.toml", "-f", "app.cfg"]);
        assert_eq!(file, PathBuf::from("app.cfg"));
        assert_eq!(
            action,
            ConfigAction::Convert {
                output: PathBuf::from("out.toml")
            }
        );
    }

    #[test]
    fn invalid_subcommand_errors() {
        assert!(TestCli::try_parse_from(["test", "nope"]).is_err());
    }
}
