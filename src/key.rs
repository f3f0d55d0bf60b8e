//! Key paths: `a.b[0].c`.
//!
//! A path is a sequence of segments. Named segments are bare keys made of
//! ASCII letters, digits, `_` and `-`; each may be followed by any number of
//! `[n]` list indices. A path relative to a list view may start with an index
//! (`[2].name`). Nothing else is accepted: no whitespace, no quoting, no
//! negative indices.

use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<PathSegment>,
}

impl KeyPath {
    /// Parse a key path. Errors are always [`ConfigError::KeySyntax`].
    pub fn parse(path: &str) -> Result<Self> {
        parse_segments(path)
            .map(|segments| KeyPath { segments })
            .map_err(|reason| ConfigError::key_syntax(path, reason))
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn split_last(&self) -> Option<(&PathSegment, &[PathSegment])> {
        self.segments.split_last()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut out = self.clone();
        out.push(segment);
        out
    }

    /// `self` followed by the segments of `other`.
    pub fn join(&self, other: &KeyPath) -> Self {
        let mut out = self.clone();
        out.segments.extend(other.segments.iter().cloned());
        out
    }
}

impl From<Vec<PathSegment>> for KeyPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        KeyPath { segments }
    }
}

impl FromStr for KeyPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        KeyPath::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && matches!(segment, PathSegment::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

pub fn is_bare_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(is_bare_char)
}

pub(crate) fn validate_bare_key(key: &str) -> std::result::Result<(), &'static str> {
    if key.is_empty() {
        Err("keys must not be empty")
    } else if !key.chars().all(is_bare_char) {
        Err("keys may only contain ASCII letters, digits, '_' and '-'")
    } else {
        Ok(())
    }
}

/// Join a parent name and a child key into a fully qualified name.
pub(crate) fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn parse_segments(path: &str) -> std::result::Result<Vec<PathSegment>, String> {
    if path.is_empty() {
        return Err("key path is empty".into());
    }

    let chars: Vec<char> = path.chars().collect();
    let mut segments = Vec::new();
    let mut pos = 0;

    loop {
        let start = pos;
        while pos < chars.len() && is_bare_char(chars[pos]) {
            pos += 1;
        }
        if pos > start {
            segments.push(PathSegment::Key(chars[start..pos].iter().collect()));
        } else if !(segments.is_empty() && chars.get(pos) == Some(&'[')) {
            // Only the head of a path may be a bare index.
            return Err(match chars.get(pos) {
                None if pos == 0 => "key path is empty".into(),
                None => "key path ends with '.'".into(),
                Some('.') => format!("empty segment at position {pos}"),
                Some(c) => format!("unexpected character {c:?} at position {pos}"),
            });
        }

        while chars.get(pos) == Some(&'[') {
            let open = pos;
            pos += 1;
            let digits_start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            match chars.get(pos) {
                Some(']') if pos > digits_start => {}
                Some(']') => return Err(format!("empty list index at position {open}")),
                Some('-') if pos == digits_start => {
                    return Err("list indices must be non-negative".into());
                }
                None => return Err(format!("unmatched '[' at position {open}")),
                Some(c) => {
                    return Err(format!(
                        "unexpected character {c:?} in list index at position {pos}"
                    ));
                }
            }
            let digits: String = chars[digits_start..pos].iter().collect();
            let index = digits
                .parse::<usize>()
                .map_err(|_| format!("list index {digits} is too large"))?;
            segments.push(PathSegment::Index(index));
            pos += 1;
        }

        match chars.get(pos) {
            None => return Ok(segments),
            Some('.') => pos += 1,
            Some(c) => return Err(format!("unexpected character {c:?} at position {pos}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn segs(path: &str) -> Vec<PathSegment> {
        KeyPath::parse(path).unwrap().segments().to_vec()
    }

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.into())
    }

    fn syntax_error(path: &str) {
        let err = KeyPath::parse(path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeySyntax, "path {path:?}");
    }

    #[test]
    fn simple_keys() {
        assert_eq!(segs("port"), vec![key("port")]);
        assert_eq!(segs("db.pool-size"), vec![key("db"), key("pool-size")]);
    }

    #[test]
    fn indices_attach_to_keys() {
        assert_eq!(
            segs("a.lst[0][12].c_d"),
            vec![
                key("a"),
                key("lst"),
                PathSegment::Index(0),
                PathSegment::Index(12),
                key("c_d"),
            ]
        );
    }

    #[test]
    fn leading_index() {
        assert_eq!(
            segs("[2].name"),
            vec![PathSegment::Index(2), key("name")]
        );
        assert_eq!(segs("[0][1]"), vec![PathSegment::Index(0), PathSegment::Index(1)]);
    }

    #[test]
    fn display_round_trips() {
        for path in ["a", "a.b", "a[0].b[1][2]", "[3].x"] {
            assert_eq!(KeyPath::parse(path).unwrap().to_string(), path);
        }
    }

    #[test]
    fn rejects_empty_and_stray_dots() {
        syntax_error("");
        syntax_error(".");
        syntax_error(".a");
        syntax_error("a.");
        syntax_error("a..b");
        syntax_error("a.[0]");
    }

    #[test]
    fn rejects_whitespace_and_quotes() {
        syntax_error("a b");
        syntax_error(" a");
        syntax_error("a.\"b\"");
        syntax_error("a\t");
    }

    #[test]
    fn rejects_bad_brackets() {
        syntax_error("a[");
        syntax_error("a[1");
        syntax_error("a]");
        syntax_error("a[]");
        syntax_error("a[x]");
        syntax_error("a[-1]");
        syntax_error("a[1]b");
        syntax_error("a[99999999999999999999999]");
    }

    #[test]
    fn bare_key_rules() {
        assert!(is_bare_key("key_1-x"));
        assert!(is_bare_key("1234"));
        assert!(!is_bare_key(""));
        assert!(!is_bare_key("a.b"));
        assert!(!is_bare_key("ä"));
    }

    #[test]
    fn join_builds_fqn() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a[0]", "b"), "a[0].b");
    }
}
