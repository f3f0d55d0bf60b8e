//! Documents shared by the unit tests.

/// One parameter of every scalar type.
pub const SCALARS: &str = r#"
flag = true
int = 42
big = 1099511627776
flt = 1.5
flt2 = -3.0
str = "value"
numstr = "42"
day = 2000-02-29
tm = 17:30:15.123
dt = 2000-02-29T17:30:15.123Z
local = 1979-05-27T07:32:00
"#;

/// Groups, an array of tables and a nested list.
pub const NESTED: &str = r#"
matrix = [[1, 2], [3, 4]]

[server]
host = "localhost"
port = 8080

[[servers]]
name = "alpha"

[[servers]]
name = "beta"
"#;

/// File-path-like strings for relative path rewriting.
pub const PATHS: &str = r#"
path1 = "rel.txt"

[paths1]
path1 = "dir/file"
path2 = "other"

[section]
abs = "/already/absolute"
rel = "x"
num = 1
lst = ["a"]
"#;

/// Strings carrying a `%REP%` placeholder at several depths.
pub const PLACEHOLDERS: &str = r#"
str = "%REP%"
num = 3
lst = [1, "my-%REP%"]

[g]
nested = "prefix-%REP%"
"#;

/// The [`NESTED`] document in JSON.
pub const NESTED_JSON: &str = r#"{
  "matrix": [[1, 2], [3, 4]],
  "server": {"host": "localhost", "port": 8080},
  "servers": [{"name": "alpha"}, {"name": "beta"}]
}"#;
