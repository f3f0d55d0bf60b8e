//! Arena storage for a configuration tree.
//!
//! Every node lives in a slot addressed by a [`NodeId`]. Ids carry a
//! generation so that a handle to a removed node can be detected instead of
//! silently aliasing whatever reuses the slot.

use indexmap::IndexMap;

use crate::key::{KeyPath, PathSegment};
use crate::value::{ConfigType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
pub(crate) enum Node {
    /// Any non-container value.
    Leaf(Value),
    List(Vec<NodeId>),
    Group(IndexMap<String, NodeId>),
}

impl Node {
    pub(crate) fn config_type(&self) -> ConfigType {
        match self {
            Node::Leaf(v) => v.config_type(),
            Node::List(_) => ConfigType::List,
            Node::Group(_) => ConfigType::Group,
        }
    }

    /// Number of children; `None` for a leaf.
    pub(crate) fn len(&self) -> Option<usize> {
        match self {
            Node::Leaf(_) => None,
            Node::List(items) => Some(items.len()),
            Node::Group(map) => Some(map.len()),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    parent: Option<NodeId>,
    node: Option<Node>,
}

#[derive(Debug)]
pub(crate) struct Store {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Store {
    /// A store holding an empty root group.
    pub(crate) fn new() -> Self {
        let mut store = Store {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        store.root = store.alloc(Node::Group(IndexMap::new()), None);
        store
    }

    /// A store whose root group holds `group`. Keys are not validated here.
    pub(crate) fn from_group(group: IndexMap<String, Value>) -> Self {
        let mut store = Store::new();
        let root = store.root;
        for (k, v) in group {
            let child = store.insert(v, Some(root));
            if let Some(Node::Group(map)) = store.node_mut(root) {
                map.insert(k, child);
            }
        }
        store
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.node.is_some())
            .and_then(|slot| slot.parent)
    }

    fn alloc(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.parent = parent;
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                parent,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Store `value` (recursively) as a new node under `parent`.
    ///
    /// The caller is responsible for linking the returned id into the parent
    /// container.
    pub(crate) fn insert(&mut self, value: Value, parent: Option<NodeId>) -> NodeId {
        match value {
            Value::List(items) => {
                let id = self.alloc(Node::List(Vec::new()), parent);
                let children: Vec<NodeId> = items
                    .into_iter()
                    .map(|item| self.insert(item, Some(id)))
                    .collect();
                if let Some(Node::List(slot)) = self.node_mut(id) {
                    *slot = children;
                }
                id
            }
            Value::Group(group) => {
                let id = self.alloc(Node::Group(IndexMap::new()), parent);
                let children: IndexMap<String, NodeId> = group
                    .into_iter()
                    .map(|(k, v)| (k, self.insert(v, Some(id))))
                    .collect();
                if let Some(Node::Group(slot)) = self.node_mut(id) {
                    *slot = children;
                }
                id
            }
            scalar => self.alloc(Node::Leaf(scalar), parent),
        }
    }

    /// Free `id` and everything below it. Stale ids become dangling.
    pub(crate) fn release(&mut self, id: NodeId) {
        let Some(slot) = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
        else {
            return;
        };
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.parent = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        match node {
            Node::Leaf(_) => {}
            Node::List(children) => children.into_iter().for_each(|c| self.release(c)),
            Node::Group(children) => children.into_values().for_each(|c| self.release(c)),
        }
    }

    /// Drop every child of a container, keeping the container itself alive.
    pub(crate) fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.node_mut(id) {
            Some(Node::List(items)) => std::mem::take(items),
            Some(Node::Group(map)) => std::mem::take(map).into_values().collect(),
            _ => return,
        };
        children.into_iter().for_each(|c| self.release(c));
    }

    /// Insert `value` as a new child of `parent`: under `key` for a group,
    /// appended for a list. An existing child under the same key is
    /// released. Returns `None` if the parent cannot hold such a child.
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        key: Option<String>,
        value: Value,
    ) -> Option<NodeId> {
        match (self.node(parent)?, &key) {
            (Node::Group(_), Some(_)) | (Node::List(_), None) => {}
            _ => return None,
        }
        let id = self.insert(value, Some(parent));
        let replaced = match (self.node_mut(parent), key) {
            (Some(Node::Group(map)), Some(k)) => map.insert(k, id),
            (Some(Node::List(items)), None) => {
                items.push(id);
                None
            }
            _ => None,
        };
        if let Some(old) = replaced {
            self.release(old);
        }
        Some(id)
    }

    /// Swap the children of container `id` for the children of `value`,
    /// keeping `id` itself (and therefore views onto it) alive.
    pub(crate) fn replace_children(&mut self, id: NodeId, value: Value) {
        self.clear_children(id);
        match value {
            Value::List(items) => {
                for item in items {
                    self.attach(id, None, item);
                }
            }
            Value::Group(group) => {
                for (k, v) in group {
                    self.attach(id, Some(k), v);
                }
            }
            _ => {}
        }
    }

    /// Put a freshly built `value` where `id` sits in its parent, releasing
    /// `id`. The root cannot be replaced.
    pub(crate) fn replace(&mut self, id: NodeId, value: Value) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let new = self.insert(value, Some(parent));
        let slot = match self.node_mut(parent)? {
            Node::Group(map) => map.values_mut().find(|c| **c == id),
            Node::List(items) => items.iter_mut().find(|c| **c == id),
            Node::Leaf(_) => None,
        };
        match slot {
            Some(slot) => {
                *slot = new;
                self.release(id);
                Some(new)
            }
            None => {
                self.release(new);
                None
            }
        }
    }

    pub(crate) fn set_leaf(&mut self, id: NodeId, value: Value) {
        if let Some(node) = self.node_mut(id)
            && matches!(node, Node::Leaf(_))
        {
            *node = Node::Leaf(value);
        }
    }

    pub(crate) fn child(&self, id: NodeId, segment: &PathSegment) -> Option<NodeId> {
        match (self.node(id)?, segment) {
            (Node::Group(map), PathSegment::Key(k)) => map.get(k).copied(),
            (Node::List(items), PathSegment::Index(i)) => items.get(*i).copied(),
            _ => None,
        }
    }

    /// Reconstruct the owned value at `id`.
    pub(crate) fn materialize(&self, id: NodeId) -> Option<Value> {
        Some(match self.node(id)? {
            Node::Leaf(v) => v.clone(),
            Node::List(items) => Value::List(
                items
                    .iter()
                    .map(|c| self.materialize(*c))
                    .collect::<Option<_>>()?,
            ),
            Node::Group(map) => Value::Group(
                map.iter()
                    .map(|(k, c)| Some((k.clone(), self.materialize(*c)?)))
                    .collect::<Option<_>>()?,
            ),
        })
    }

    /// Key under which `id` hangs in its parent group, if the parent is a
    /// group.
    pub(crate) fn name_in_parent(&self, id: NodeId) -> Option<&str> {
        match self.node(self.parent(id)?)? {
            Node::Group(map) => map
                .iter()
                .find(|(_, c)| **c == id)
                .map(|(k, _)| k.as_str()),
            _ => None,
        }
    }

    /// Absolute path of a live node.
    pub(crate) fn path_of(&self, id: NodeId) -> KeyPath {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let segment = match self.node(parent) {
                Some(Node::Group(map)) => map
                    .iter()
                    .find(|(_, c)| **c == current)
                    .map(|(k, _)| PathSegment::Key(k.clone())),
                Some(Node::List(items)) => items
                    .iter()
                    .position(|c| *c == current)
                    .map(PathSegment::Index),
                _ => None,
            };
            match segment {
                Some(segment) => segments.push(segment),
                None => break,
            }
            current = parent;
        }
        segments.reverse();
        KeyPath::from(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Store {
        let mut inner = IndexMap::new();
        inner.insert("x".to_string(), Value::from(1));
        let mut group = IndexMap::new();
        group.insert("a".to_string(), Value::Group(inner));
        group.insert(
            "lst".to_string(),
            Value::List(vec![Value::from("s"), Value::from(vec![1, 2])]),
        );
        Store::from_group(group)
    }

    #[test]
    fn materialize_reproduces_input() {
        let store = sample();
        let value = store.materialize(store.root()).unwrap();
        let group = value.as_group().unwrap();
        assert_eq!(group.keys().collect::<Vec<_>>(), vec!["a", "lst"]);
        assert_eq!(group["lst"], Value::List(vec![Value::from("s"), Value::from(vec![1, 2])]));
    }

    #[test]
    fn released_ids_dangle_even_after_reuse() {
        let mut store = sample();
        let a = store.child(store.root(), &PathSegment::Key("a".into())).unwrap();
        let x = store.child(a, &PathSegment::Key("x".into())).unwrap();
        if let Some(Node::Group(map)) = store.node_mut(store.root()) {
            map.shift_remove("a");
        }
        store.release(a);
        assert!(!store.is_alive(a));
        assert!(!store.is_alive(x));

        let fresh = store.insert(Value::from(5), Some(store.root()));
        assert!(store.is_alive(fresh));
        assert!(!store.is_alive(a));
        assert!(!store.is_alive(x));
    }

    #[test]
    fn path_of_walks_parents() {
        let store = sample();
        let lst = store.child(store.root(), &PathSegment::Key("lst".into())).unwrap();
        let inner = store.child(lst, &PathSegment::Index(1)).unwrap();
        let leaf = store.child(inner, &PathSegment::Index(0)).unwrap();
        assert_eq!(store.path_of(leaf).to_string(), "lst[1][0]");
        assert_eq!(store.name_in_parent(lst), Some("lst"));
        assert_eq!(store.name_in_parent(inner), None);
        assert!(store.path_of(store.root()).is_root());
    }

    #[test]
    fn replace_swaps_node_in_place() {
        let mut store = sample();
        let lst = store.child(store.root(), &PathSegment::Key("lst".into())).unwrap();
        let first = store.child(lst, &PathSegment::Index(0)).unwrap();
        let new = store.replace(first, Value::empty_group()).unwrap();
        assert!(!store.is_alive(first));
        assert_eq!(store.child(lst, &PathSegment::Index(0)), Some(new));
        assert_eq!(store.replace(store.root(), Value::from(1)), None);
    }

    #[test]
    fn clear_children_keeps_container() {
        let mut store = sample();
        let lst = store.child(store.root(), &PathSegment::Key("lst".into())).unwrap();
        let first = store.child(lst, &PathSegment::Index(0)).unwrap();
        store.clear_children(lst);
        assert!(store.is_alive(lst));
        assert!(!store.is_alive(first));
        assert_eq!(store.materialize(lst), Some(Value::List(vec![])));
    }
}
