//! The [`Config`] handle: a view onto a node of a shared configuration tree.
//!
//! A `Config` is cheap to clone and every clone, like every view taken with
//! [`Config::view`], aliases the same underlying tree. Writes through one
//! handle are visible through all others. Removing a node invalidates views
//! onto it: further use fails with [`ConfigError::KeyNotFound`] rather than
//! reading stale data.
//!
//! ```
//! use treecfg::Config;
//!
//! let cfg = Config::new();
//! cfg.set("server.port", 8080)?;
//! let server = cfg.view("server")?;
//! server.set("host", "localhost")?;
//! assert_eq!(cfg.get_string("server.host")?, "localhost");
//! # Ok::<(), treecfg::ConfigError>(())
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::coerce;
use crate::compare::{NodeRef, ValueAccess, structural_eq};
use crate::error::{ConfigError, Result};
use crate::key::{self, KeyPath, PathSegment};
use crate::store::{Node, NodeId, Store};
use crate::value::{ConfigType, Value};

/// Result of [`Config::item`]: containers come back as live views, scalars
/// as owned values.
#[derive(Debug, Clone)]
pub enum Item {
    View(Config),
    Value(Value),
}

impl Item {
    pub fn config_type(&self) -> Result<ConfigType> {
        match self {
            Item::View(cfg) => cfg.config_type(),
            Item::Value(v) => Ok(v.config_type()),
        }
    }

    pub fn into_value(self) -> Result<Value> {
        match self {
            Item::View(cfg) => cfg.to_value(),
            Item::Value(v) => Ok(v),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    store: Rc<RefCell<Store>>,
    node: NodeId,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// An empty root group.
    pub fn new() -> Self {
        Self::from_store(Store::new())
    }

    pub(crate) fn from_store(store: Store) -> Self {
        let node = store.root();
        Config {
            store: Rc::new(RefCell::new(store)),
            node,
        }
    }

    /// Build a tree whose root holds `group`. Every key, at any depth, must be
    /// a bare key.
    pub fn from_group(group: IndexMap<String, Value>) -> Result<Self> {
        for (k, v) in &group {
            key::validate_bare_key(k).map_err(|reason| ConfigError::key_syntax(k, reason))?;
            v.validate(k)?;
        }
        Ok(Self::from_store(Store::from_group(group)))
    }

    /// Build a tree from a value, which must be a group.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Group(group) => Self::from_group(group),
            other => Err(ConfigError::type_mismatch(
                "<root>",
                format!("a configuration root must be a group, not a {}", other.config_type()),
            )),
        }
    }

    /// Build a tree from any serializable host data, e.g. a struct or a map.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        Self::from_value(crate::ser::to_value(data)?)
    }

    // -- internal plumbing --------------------------------------------------

    pub(crate) fn read(&self) -> Result<Ref<'_, Store>> {
        let store = self.store.borrow();
        if store.is_alive(self.node) {
            Ok(store)
        } else {
            Err(detached())
        }
    }

    pub(crate) fn write(&self) -> Result<RefMut<'_, Store>> {
        let store = self.store.borrow_mut();
        if store.is_alive(self.node) {
            Ok(store)
        } else {
            Err(detached())
        }
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.node
    }

    pub(crate) fn with_node(&self, node: NodeId) -> Config {
        Config {
            store: Rc::clone(&self.store),
            node,
        }
    }

    /// Fully qualified name of `segments` relative to this view, for error
    /// messages.
    pub(crate) fn describe(&self, store: &Store, segments: &[PathSegment]) -> String {
        let full = store.path_of(self.node).join(&KeyPath::from(segments.to_vec()));
        if full.is_root() {
            "<root>".to_string()
        } else {
            full.to_string()
        }
    }

    pub(crate) fn resolve(&self, store: &Store, segments: &[PathSegment]) -> Result<NodeId> {
        let mut current = self.node;
        for (i, segment) in segments.iter().enumerate() {
            current = store.child(current, segment).ok_or_else(|| {
                ConfigError::KeyNotFound(self.describe(store, &segments[..=i]))
            })?;
        }
        Ok(current)
    }

    // -- inspection ---------------------------------------------------------

    /// Whether the node this handle points to still exists.
    pub fn is_valid(&self) -> bool {
        self.store.borrow().is_alive(self.node)
    }

    /// Absolute path of this view; empty for the root.
    pub fn path(&self) -> Result<KeyPath> {
        Ok(self.read()?.path_of(self.node))
    }

    /// A handle on the root of the tree this view belongs to.
    pub fn root(&self) -> Config {
        let root = self.store.borrow().root();
        self.with_node(root)
    }

    /// Whether both handles alias the same tree.
    pub fn same_tree(&self, other: &Config) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    /// `List` or `Group`.
    pub fn config_type(&self) -> Result<ConfigType> {
        let store = self.read()?;
        Ok(node_at(&store, self.node)?.config_type())
    }

    pub fn type_of(&self, path: &str) -> Result<ConfigType> {
        let path = KeyPath::parse(path)?;
        let store = self.read()?;
        let id = self.resolve(&store, path.segments())?;
        Ok(node_at(&store, id)?.config_type())
    }

    /// Whether `path` names an existing parameter. A malformed path is an
    /// error, not `false`.
    pub fn contains(&self, path: &str) -> Result<bool> {
        let path = KeyPath::parse(path)?;
        let store = self.read()?;
        match self.resolve(&store, path.segments()) {
            Ok(_) => Ok(true),
            Err(ConfigError::KeyNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of direct children of this view.
    pub fn len(&self) -> Result<usize> {
        let store = self.read()?;
        Ok(node_at(&store, self.node)?.len().unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of children of the list or group at `path`.
    pub fn length(&self, path: &str) -> Result<usize> {
        let path = KeyPath::parse(path)?;
        let store = self.read()?;
        let id = self.resolve(&store, path.segments())?;
        let node = node_at(&store, id)?;
        node.len().ok_or_else(|| {
            ConfigError::type_mismatch(
                self.describe(&store, path.segments()),
                format!("a {} has no length", node.config_type()),
            )
        })
    }

    // -- reading ------------------------------------------------------------

    /// Owned copy of the value at `path`.
    pub fn get(&self, path: &str) -> Result<Value> {
        let path = KeyPath::parse(path)?;
        let store = self.read()?;
        let id = self.resolve(&store, path.segments())?;
        store
            .materialize(id)
            .ok_or_else(|| ConfigError::KeyNotFound(self.describe(&store, path.segments())))
    }

    /// Owned copy of this view's content.
    pub fn to_value(&self) -> Result<Value> {
        let store = self.read()?;
        store.materialize(self.node).ok_or_else(detached)
    }

    /// A live view for a list or group, an owned value for a scalar.
    pub fn item(&self, path: &str) -> Result<Item> {
        let path = KeyPath::parse(path)?;
        let store = self.read()?;
        let id = self.resolve(&store, path.segments())?;
        Ok(match node_at(&store, id)? {
            Node::Leaf(v) => Item::Value(v.clone()),
            _ => Item::View(self.with_node(id)),
        })
    }

    /// A live view onto the list or group at `path`.
    pub fn view(&self, path: &str) -> Result<Config> {
        let path = KeyPath::parse(path)?;
        let store = self.read()?;
        let id = self.resolve(&store, path.segments())?;
        match node_at(&store, id)? {
            Node::Leaf(v) => Err(ConfigError::type_mismatch(
                self.describe(&store, path.segments()),
                format!("a {} parameter cannot be viewed, only lists and groups", v.config_type()),
            )),
            _ => Ok(self.with_node(id)),
        }
    }

    /// Keys of this group, in insertion order.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items()?.into_iter().map(|(k, _)| k).collect())
    }

    /// Owned copies of this group's values, in insertion order.
    pub fn values(&self) -> Result<Vec<Value>> {
        Ok(self.items()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Owned copies of this group's entries, in insertion order.
    pub fn items(&self) -> Result<Vec<(String, Value)>> {
        let store = self.read()?;
        match node_at(&store, self.node)? {
            Node::Group(map) => map
                .iter()
                .map(|(k, id)| {
                    store
                        .materialize(*id)
                        .map(|v| (k.clone(), v))
                        .ok_or_else(detached)
                })
                .collect(),
            node => Err(ConfigError::type_mismatch(
                self.describe(&store, &[]),
                format!("a {} has no keys", node.config_type()),
            )),
        }
    }

    // -- writing ------------------------------------------------------------

    /// Create or overwrite the parameter at `path`.
    ///
    /// Missing intermediate groups are created; list elements never are.
    /// Overwriting an existing parameter keeps its type: an integer value
    /// written to a float parameter is stored as a float, and anything that
    /// cannot be converted exactly is a [`ConfigError::TypeMismatch`].
    /// Replacing a list or group keeps views onto it alive. Nothing is
    /// modified if an error is returned.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        let path = KeyPath::parse(path)?;
        self.set_path(&path, value.into())
    }

    pub(crate) fn set_path(&self, path: &KeyPath, value: Value) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            return Err(ConfigError::key_syntax("", "key path is empty"));
        };
        let mut store = self.write()?;
        value.validate(&self.describe(&store, path.segments()))?;

        let mut current = self.node;
        let mut walked = 0;
        for segment in parents {
            match store.child(current, segment) {
                Some(id) => {
                    current = id;
                    walked += 1;
                }
                None => break,
            }
        }

        let missing = &parents[walked..];
        if let Some(first) = missing.first() {
            // Everything from `first` on has to be created as groups.
            self.check_accepts(&store, current, &parents[..walked], first)?;
            if let Some(pos) = missing
                .iter()
                .chain(std::iter::once(last))
                .position(|s| matches!(s, PathSegment::Index(_)))
            {
                let upto = walked + pos;
                return Err(ConfigError::KeyNotFound(
                    self.describe(&store, &path.segments()[..=upto]),
                ));
            }
            for segment in missing {
                if let PathSegment::Key(k) = segment {
                    current = store
                        .attach(current, Some(k.clone()), Value::empty_group())
                        .ok_or_else(detached)?;
                }
            }
            if let PathSegment::Key(k) = last {
                store
                    .attach(current, Some(k.clone()), value)
                    .ok_or_else(detached)?;
            }
            return Ok(());
        }

        self.check_accepts(&store, current, parents, last)?;
        match store.child(current, last) {
            Some(existing) => {
                let fqn = self.describe(&store, path.segments());
                assign(&mut store, existing, value, fqn)
            }
            None => match last {
                PathSegment::Key(k) => {
                    store
                        .attach(current, Some(k.clone()), value)
                        .ok_or_else(detached)?;
                    Ok(())
                }
                PathSegment::Index(_) => Err(ConfigError::KeyNotFound(
                    self.describe(&store, path.segments()),
                )),
            },
        }
    }

    /// Check that the node at `id` (reached via `at`) can hold a child named
    /// by `segment`.
    fn check_accepts(
        &self,
        store: &Store,
        id: NodeId,
        at: &[PathSegment],
        segment: &PathSegment,
    ) -> Result<()> {
        let node = node_at(store, id)?;
        let ok = matches!(
            (node, segment),
            (Node::Group(_), PathSegment::Key(_)) | (Node::List(_), PathSegment::Index(_))
        );
        if ok {
            return Ok(());
        }
        let what = match segment {
            PathSegment::Key(k) => format!("key '{k}'"),
            PathSegment::Index(i) => format!("index [{i}]"),
        };
        Err(ConfigError::type_mismatch(
            self.describe(store, at),
            format!("a {} cannot hold {what}", node.config_type()),
        ))
    }

    /// Create an empty list at `path`, replacing nothing: the key must not
    /// exist yet.
    pub fn create_list(&self, path: &str) -> Result<Config> {
        let key_path = KeyPath::parse(path)?;
        if self.contains(path)? {
            let store = self.read()?;
            return Err(ConfigError::type_mismatch(
                self.describe(&store, key_path.segments()),
                "a parameter with this name already exists",
            ));
        }
        self.set_path(&key_path, Value::List(Vec::new()))?;
        self.view(path)
    }

    /// Create an empty group at `path`; the key must not exist yet.
    pub fn create_group(&self, path: &str) -> Result<Config> {
        let key_path = KeyPath::parse(path)?;
        if self.contains(path)? {
            let store = self.read()?;
            return Err(ConfigError::type_mismatch(
                self.describe(&store, key_path.segments()),
                "a parameter with this name already exists",
            ));
        }
        self.set_path(&key_path, Value::empty_group())?;
        self.view(path)
    }

    /// Remove the parameter at `path`. Views onto it, or anything below it,
    /// become invalid. Removing a list element shifts later elements down.
    pub fn delete(&self, path: &str) -> Result<()> {
        let path = KeyPath::parse(path)?;
        let Some((last, parents)) = path.split_last() else {
            return Err(ConfigError::key_syntax("", "key path is empty"));
        };
        let mut store = self.write()?;
        let parent = self.resolve(&store, parents)?;
        let removed = match (store.node_mut(parent), last) {
            (Some(Node::Group(map)), PathSegment::Key(k)) => map.shift_remove(k),
            (Some(Node::List(items)), PathSegment::Index(i)) if *i < items.len() => {
                Some(items.remove(*i))
            }
            _ => None,
        };
        match removed {
            Some(id) => {
                store.release(id);
                Ok(())
            }
            None => Err(ConfigError::KeyNotFound(
                self.describe(&store, path.segments()),
            )),
        }
    }

    /// Append to this view, which must be a list.
    pub fn append(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let mut store = self.write()?;
        let fqn = self.describe(&store, &[]);
        match node_at(&store, self.node)? {
            Node::List(items) => {
                value.validate(&format!("{fqn}[{}]", items.len()))?;
            }
            node => {
                return Err(ConfigError::type_mismatch(
                    fqn,
                    format!(
                        "cannot append to a {}; use append_to with a key instead",
                        node.config_type()
                    ),
                ));
            }
        }
        store.attach(self.node, None, value).ok_or_else(detached)?;
        Ok(())
    }

    /// Append to the list at `path`, creating the list if `path` does not
    /// exist.
    pub fn append_to(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        let key_path = KeyPath::parse(path)?;
        let target = {
            let store = self.read()?;
            match self.resolve(&store, key_path.segments()) {
                Ok(id) => Some(id),
                Err(ConfigError::KeyNotFound(_)) => None,
                Err(e) => return Err(e),
            }
        };
        match target {
            Some(id) => self.with_node(id).append(value),
            None => self.set_path(&key_path, Value::List(vec![value.into()])),
        }
    }

    /// Remove every child of this list or group.
    pub fn clear(&self) -> Result<()> {
        let mut store = self.write()?;
        store.clear_children(self.node);
        Ok(())
    }

    /// Remove every child of the list or group at `path`.
    pub fn clear_at(&self, path: &str) -> Result<()> {
        self.view(path)?.clear()
    }

    // -- copying ------------------------------------------------------------

    /// Detach this view's content into a new, independent tree.
    ///
    /// Copying a group yields a tree rooted at a copy of that group. Copying a
    /// list that is a named member of a group yields a tree `{name = [...]}`
    /// and returns a view onto the copied list. Lists nested directly inside
    /// other lists have no name and cannot be copied.
    pub fn copy(&self) -> Result<Config> {
        let store = self.read()?;
        let fqn = self.describe(&store, &[]);
        copy_node(&store, self.node, fqn)
    }

    pub fn copy_at(&self, path: &str) -> Result<Config> {
        let path = KeyPath::parse(path)?;
        let store = self.read()?;
        let id = self.resolve(&store, path.segments())?;
        copy_node(&store, id, self.describe(&store, path.segments()))
    }

    /// The group that represents this view for serialization. Lists go
    /// through the same naming rule as [`Config::copy`].
    pub(crate) fn export_group(&self) -> Result<IndexMap<String, Value>> {
        let copy = self.copy()?;
        match copy.root().to_value()? {
            Value::Group(group) => Ok(group),
            _ => Err(detached()),
        }
    }

    /// Structural comparison against anything implementing [`ValueAccess`].
    pub fn equals<'a, A: ValueAccess<'a>>(&self, other: A) -> bool {
        let store = self.store.borrow();
        store.is_alive(self.node)
            && structural_eq(
                NodeRef {
                    store: &store,
                    id: self.node,
                },
                other,
            )
    }
}

fn detached() -> ConfigError {
    ConfigError::KeyNotFound("<view whose node was removed from its tree>".to_string())
}

fn node_at(store: &Store, id: NodeId) -> Result<&Node> {
    store.node(id).ok_or_else(detached)
}

/// Overwrite the existing node `target` with `value`, keeping the node's
/// type. Validates fully before touching the store.
fn assign(store: &mut Store, target: NodeId, value: Value, fqn: String) -> Result<()> {
    let node = node_at(store, target)?;
    match (node, value) {
        (Node::Leaf(old), value) if !value.is_container() => {
            let target_type = old.config_type();
            let converted = coerce::convert(&value, target_type).ok_or_else(|| {
                ConfigError::type_mismatch(
                    fqn,
                    format!(
                        "cannot assign {} value {value} to a {target_type} parameter",
                        value.config_type()
                    ),
                )
            })?;
            store.set_leaf(target, converted);
            Ok(())
        }
        (Node::List(_), value @ Value::List(_)) | (Node::Group(_), value @ Value::Group(_)) => {
            store.replace_children(target, value);
            Ok(())
        }
        (node, value) => Err(ConfigError::type_mismatch(
            fqn,
            format!(
                "cannot replace a {} with a {} value",
                node.config_type(),
                value.config_type()
            ),
        )),
    }
}

fn copy_node(store: &Store, id: NodeId, fqn: String) -> Result<Config> {
    match node_at(store, id)? {
        Node::Group(_) => match store.materialize(id) {
            Some(Value::Group(group)) => Ok(Config::from_store(Store::from_group(group))),
            _ => Err(detached()),
        },
        Node::List(_) => {
            let Some(name) = store.name_in_parent(id) else {
                return Err(ConfigError::type_mismatch(
                    fqn,
                    "only lists that are members of a group can be copied",
                ));
            };
            let list = store.materialize(id).ok_or_else(detached)?;
            let mut group = IndexMap::new();
            group.insert(name.to_string(), list);
            let copy = Config::from_store(Store::from_group(group));
            copy.view(name)
        }
        Node::Leaf(v) => Err(ConfigError::type_mismatch(
            fqn,
            format!("a {} parameter cannot be copied into a tree", v.config_type()),
        )),
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        let store = other.store.borrow();
        store.is_alive(other.node)
            && self.equals(NodeRef {
                store: &store,
                id: other.node,
            })
    }
}

impl PartialEq<Value> for Config {
    fn eq(&self, other: &Value) -> bool {
        self.equals(other)
    }
}

impl PartialEq<serde_json::Value> for Config {
    fn eq(&self, other: &serde_json::Value) -> bool {
        self.equals(other)
    }
}

impl PartialEq<toml::Value> for Config {
    fn eq(&self, other: &toml::Value) -> bool {
        self.equals(other)
    }
}

impl PartialEq<toml::Table> for Config {
    fn eq(&self, other: &toml::Table) -> bool {
        self.equals(&toml::Value::Table(other.clone()))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.path(), self.to_value()) {
            (Ok(path), Ok(value)) => f
                .debug_struct("Config")
                .field("path", &path.to_string())
                .field("value", &value)
                .finish(),
            _ => f.write_str("Config(<detached>)"),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_value() {
            Ok(value) => write!(f, "{value}"),
            Err(_) => f.write_str("<detached>"),
        }
    }
}
