use std::path::PathBuf;

/// An operation on a configuration file, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Every scalar parameter with its value.
    List,
    Get {
        key: String,
    },
    /// `value` is raw text; its type is guessed, then the parameter's
    /// existing type wins.
    Set {
        key: String,
        value: String,
    },
    Unset {
        key: String,
    },
    /// Re-emit the file in the format implied by `output`'s extension.
    Convert {
        output: PathBuf,
    },
}
