//! Whole-subtree traversals: listing parameter names and rewriting string
//! parameters in place.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key;
use crate::store::{Node, NodeId, Store};
use crate::value::Value;

/// Options for [`Config::list_parameter_names`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterNames {
    /// Also list every list element (`lst[0]`, `lst[1]`, ...). Groups inside
    /// lists are descended into either way.
    pub include_array_entries: bool,
    /// Descend below the direct children of the view.
    pub recursive: bool,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            include_array_entries: false,
            recursive: true,
        }
    }
}

/// Visit the string leaves below `id`, depth first. `f` receives the fully
/// qualified name (relative to the walk's start), whether the leaf is a
/// named group member, and the string. Returning `Some` replaces it.
fn rewrite_strings(
    store: &mut Store,
    id: NodeId,
    fqn: &str,
    named: bool,
    f: &mut dyn FnMut(&str, bool, &str) -> Option<String>,
) -> bool {
    let children: Vec<(String, bool, NodeId)> = match store.node(id) {
        Some(Node::Leaf(Value::String(s))) => {
            return match f(fqn, named, s) {
                Some(replacement) => {
                    store.set_leaf(id, Value::String(replacement));
                    true
                }
                None => false,
            };
        }
        Some(Node::Group(map)) => map
            .iter()
            .map(|(k, c)| (key::join(fqn, k), true, *c))
            .collect(),
        Some(Node::List(items)) => items
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("{fqn}[{i}]"), false, *c))
            .collect(),
        _ => return false,
    };
    let mut changed = false;
    for (name, named, child) in children {
        changed |= rewrite_strings(store, child, &name, named, f);
    }
    changed
}

fn collect_names(
    store: &Store,
    id: NodeId,
    fqn: &str,
    opts: ParameterNames,
    top: bool,
    out: &mut Vec<String>,
) {
    let descend = opts.recursive || top;
    match store.node(id) {
        Some(Node::Group(map)) if descend => {
            for (k, child) in map {
                let name = key::join(fqn, k);
                out.push(name.clone());
                if opts.recursive {
                    collect_names(store, *child, &name, opts, false, out);
                }
            }
        }
        Some(Node::List(items)) if descend => {
            for (i, child) in items.iter().enumerate() {
                let name = format!("{fqn}[{i}]");
                if opts.include_array_entries || top {
                    out.push(name.clone());
                }
                if opts.recursive {
                    collect_names(store, *child, &name, opts, false, out);
                }
            }
        }
        _ => {}
    }
}

/// Compile a name pattern where `*` matches any run of characters and
/// everything else is literal.
fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
        .map_err(|e| ConfigError::InvalidValue(format!("pattern '{pattern}': {e}")))
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute()
}

impl Config {
    /// Sorted, fully qualified names of the parameters below this view.
    ///
    /// With `recursive` off only direct children are listed. List elements
    /// are listed only with `include_array_entries`, except for the direct
    /// elements of a list view.
    pub fn list_parameter_names(&self, opts: ParameterNames) -> Result<Vec<String>> {
        let store = self.read()?;
        let mut names = Vec::new();
        collect_names(&store, self.node_id(), "", opts, true, &mut names);
        names.sort();
        Ok(names)
    }

    /// Replace every occurrence of each search string in every string
    /// parameter below this view. Pairs are applied in order, so later pairs
    /// see the output of earlier ones. Returns whether anything changed.
    pub fn replace_placeholders<S, R>(&self, replacements: &[(S, R)]) -> Result<bool>
    where
        S: AsRef<str>,
        R: AsRef<str>,
    {
        if replacements.iter().any(|(s, _)| s.as_ref().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "placeholder search strings must not be empty".into(),
            ));
        }
        let mut store = self.write()?;
        let mut rewrite = |_: &str, _: bool, s: &str| {
            let mut out = s.to_string();
            for (search, replace) in replacements {
                out = out.replace(search.as_ref(), replace.as_ref());
            }
            (out != s).then_some(out)
        };
        let changed = rewrite_strings(&mut store, self.node_id(), "", false, &mut rewrite);
        debug!(pairs = replacements.len(), changed, "replaced placeholders");
        Ok(changed)
    }

    /// [`Config::replace_placeholders`] restricted to the subtree at `path`.
    pub fn replace_placeholders_at<S, R>(&self, path: &str, replacements: &[(S, R)]) -> Result<bool>
    where
        S: AsRef<str>,
        R: AsRef<str>,
    {
        self.view(path)?.replace_placeholders(replacements)
    }

    /// Prefix relative file paths with `base`.
    ///
    /// A string parameter is rewritten when its fully qualified name (relative
    /// to this view) matches one of `patterns`, where `*` matches any run of
    /// characters, and its value is not already absolute. Only named group
    /// members are considered; bare list elements are not. Returns whether
    /// anything changed.
    pub fn adjust_relative_paths<P, S>(&self, base: P, patterns: &[S]) -> Result<bool>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let base = base.as_ref();
        let regexes = patterns
            .iter()
            .map(|p| wildcard_regex(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if base.to_str().is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "base path {} is not valid UTF-8",
                base.display()
            )));
        }

        let mut store = self.write()?;
        let mut rewrite = |fqn: &str, named: bool, s: &str| {
            if !named || is_absolute(s) || !regexes.iter().any(|re| re.is_match(fqn)) {
                return None;
            }
            base.join(s).to_str().map(str::to_string)
        };
        let changed = rewrite_strings(&mut store, self.node_id(), "", false, &mut rewrite);
        debug!(base = %base.display(), changed, "adjusted relative paths");
        Ok(changed)
    }

    /// [`Config::adjust_relative_paths`] restricted to the subtree at `path`.
    /// Patterns are matched against names relative to `path`.
    pub fn adjust_relative_paths_at<P, S>(&self, path: &str, base: P, patterns: &[S]) -> Result<bool>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        self.view(path)?.adjust_relative_paths(base, patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures;
    use crate::format::load_toml_str;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_default_skips_array_entries() {
        let cfg = load_toml_str(fixtures::NESTED).unwrap();
        let names = cfg.list_parameter_names(ParameterNames::default()).unwrap();
        assert_eq!(
            names,
            vec![
                "matrix",
                "server",
                "server.host",
                "server.port",
                "servers",
                "servers[0].name",
                "servers[1].name",
            ]
        );
    }

    #[test]
    fn names_with_array_entries() {
        let cfg = load_toml_str(fixtures::NESTED).unwrap();
        let opts = ParameterNames {
            include_array_entries: true,
            recursive: true,
        };
        let names = cfg.list_parameter_names(opts).unwrap();
        assert!(names.contains(&"matrix[1][0]".to_string()));
        assert!(names.contains(&"servers[0]".to_string()));
        assert!(names.contains(&"servers[0].name".to_string()));
    }

    #[test]
    fn non_recursive_names_match_keys() {
        let cfg = load_toml_str(fixtures::NESTED).unwrap();
        let opts = ParameterNames {
            include_array_entries: false,
            recursive: false,
        };
        let mut keys = cfg.keys().unwrap();
        keys.sort();
        assert_eq!(cfg.list_parameter_names(opts).unwrap(), keys);
    }

    #[test]
    fn names_relative_to_view() {
        let cfg = load_toml_str(fixtures::NESTED).unwrap();
        let servers = cfg.view("servers").unwrap();
        let names = servers.list_parameter_names(ParameterNames::default()).unwrap();
        assert_eq!(names, vec!["[0]", "[0].name", "[1]", "[1].name"]);
    }

    #[test]
    fn placeholders_apply_in_order() {
        let cfg = load_toml_str(fixtures::PLACEHOLDERS).unwrap();
        let changed = cfg
            .replace_placeholders(&[("%REP%", "value"), ("e", "")])
            .unwrap();
        assert!(changed);
        assert_eq!(cfg.get_string("str").unwrap(), "valu");
        assert_eq!(cfg.get_string("lst[1]").unwrap(), "my-valu");
        assert_eq!(cfg.get_string("g.nested").unwrap(), "prfix-valu");
        assert_eq!(cfg.get_int("num").unwrap(), 3);
    }

    #[test]
    fn placeholders_report_no_change() {
        let cfg = load_toml_str(fixtures::PLACEHOLDERS).unwrap();
        assert!(!cfg.replace_placeholders(&[("%NOPE%", "x")]).unwrap());
        let none: [(&str, &str); 0] = [];
        assert!(!cfg.replace_placeholders(&none).unwrap());
    }

    #[test]
    fn empty_placeholder_is_rejected_before_changes() {
        let cfg = load_toml_str(fixtures::PLACEHOLDERS).unwrap();
        let err = cfg
            .replace_placeholders(&[("%REP%", "x"), ("", "y")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(cfg.get_string("str").unwrap(), "%REP%");
    }

    #[test]
    fn placeholders_in_subtree_only() {
        let cfg = load_toml_str(fixtures::PLACEHOLDERS).unwrap();
        cfg.replace_placeholders_at("g", &[("%REP%", "X")]).unwrap();
        assert_eq!(cfg.get_string("g.nested").unwrap(), "prefix-X");
        assert_eq!(cfg.get_string("str").unwrap(), "%REP%");
    }

    #[test]
    fn relative_paths_follow_patterns() {
        let cfg = load_toml_str(fixtures::PATHS).unwrap();
        let changed = cfg
            .adjust_relative_paths("/base", &["path1", "*.path1", "section.*"])
            .unwrap();
        assert!(changed);
        assert_eq!(cfg.get_string("path1").unwrap(), "/base/rel.txt");
        assert_eq!(cfg.get_string("paths1.path1").unwrap(), "/base/dir/file");
        assert_eq!(cfg.get_string("paths1.path2").unwrap(), "other");
        assert_eq!(cfg.get_string("section.abs").unwrap(), "/already/absolute");
        assert_eq!(cfg.get_string("section.rel").unwrap(), "/base/x");
        assert_eq!(cfg.get_int("section.num").unwrap(), 1);
        assert_eq!(cfg.get_list("section.lst").unwrap(), vec![Value::from("a")]);
    }

    #[test]
    fn wildcard_needs_a_prefix_segment() {
        let cfg = load_toml_str(fixtures::PATHS).unwrap();
        cfg.adjust_relative_paths("/base", &["*.path1"]).unwrap();
        assert_eq!(cfg.get_string("path1").unwrap(), "rel.txt");
        assert_eq!(cfg.get_string("paths1.path1").unwrap(), "/base/dir/file");
    }

    #[test]
    fn relative_paths_in_subtree_use_local_names() {
        let cfg = load_toml_str(fixtures::PATHS).unwrap();
        assert!(cfg.adjust_relative_paths_at("paths1", "/b", &["path2"]).unwrap());
        assert_eq!(cfg.get_string("paths1.path2").unwrap(), "/b/other");
        assert!(!cfg.adjust_relative_paths("/b", &["nomatch"]).unwrap());
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let re = wildcard_regex("a.b*").unwrap();
        assert!(re.is_match("a.bcd"));
        assert!(!re.is_match("axbcd"));
    }
}
