use std::sync::Arc;

use indexmap::{map::Iter, IndexMap};
use serde::Serialize;
use tracing::debug;

use crate::{parse_key, Error, Limits, Result, Upload};

/// Tree of plain form values.
pub type DataTree = Tree<String>;

/// Tree of uploaded file descriptors.
pub type FileTree = Tree<Arc<Upload>>;

/// Values which can be stored at the leaves of a [`Tree`].
pub trait Leaf: Sized {
    /// Takes the value stored under a bare key out of the repeated values,
    /// `None` when there are none.
    fn pick(values: &mut Vec<Self>) -> Option<Self>;

    /// Checks if the value counts as empty.
    fn is_blank(&self) -> bool;
}

/// Later values win: `a=1&a=2` keeps `2`.
impl Leaf for String {
    fn pick(values: &mut Vec<Self>) -> Option<Self> {
        values.pop()
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// The first file wins.
impl Leaf for Arc<Upload> {
    fn pick(values: &mut Vec<Self>) -> Option<Self> {
        (!values.is_empty()).then(|| values.remove(0))
    }

    fn is_blank(&self) -> bool {
        false
    }
}

fn is_blank_list<T: Leaf>(values: &[T]) -> bool {
    match values {
        [] => true,
        [value] => value.is_blank(),
        _ => false,
    }
}

/// A slot of a [`Tree`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node<T> {
    /// Single value, from a bare key.
    Value(T),
    /// Ordered values, from a key ending in `[]`.
    List(Vec<T>),
    /// Nested tree.
    Branch(Tree<T>),
}

impl<T: Leaf> Node<T> {
    /// Checks if the node holds a nested tree.
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    fn is_blank(&self) -> bool {
        match self {
            Self::Value(value) => value.is_blank(),
            Self::List(values) => is_blank_list(values),
            Self::Branch(_) => false,
        }
    }
}

/// Nested mapping built from bracket notation keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Tree<T> {
    nodes: IndexMap<String, Node<T>>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }
}

impl<T> Tree<T> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a direct child.
    pub fn get(&self, key: &str) -> Option<&Node<T>> {
        self.nodes.get(key)
    }

    /// Iterates the direct children in insertion order.
    pub fn iter(&self) -> Iter<'_, String, Node<T>> {
        self.nodes.iter()
    }

    /// Counts the direct children.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if the tree has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T: Serialize> Tree<T> {
    /// Encodes the tree as JSON, an empty tree is `{}`.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::from)
    }
}

impl<T: Leaf> Tree<T> {
    /// Mounts the values of a field name.
    ///
    /// Names deeper than [`Limits::depth`] are dropped without an error.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] when a key already holds a value but is used as a
    /// container, or the other way around.
    pub fn push(&mut self, name: &str, values: Vec<T>, limits: &Limits) -> Result<()> {
        let keys = parse_key(name);

        if let Some(max) = limits.checked_depth(keys.len()) {
            debug!("dropping `{}`, {} levels over the limit of {}", name, keys.len(), max);
            return Ok(());
        }

        self.mount(&keys, values)
    }

    /// Inserts `values` at the path `keys`, whose length was checked by
    /// [`Tree::push`].
    fn mount(&mut self, keys: &[String], mut values: Vec<T>) -> Result<()> {
        let Some((key, rest)) = keys.split_first() else {
            return Ok(());
        };

        if self.prepare(key, rest, &values)? {
            return Ok(());
        }

        match rest {
            [tail] if tail.is_empty() => {
                self.nodes.insert(key.clone(), Node::List(values));
                Ok(())
            }
            [] => {
                let node = match T::pick(&mut values) {
                    Some(value) => Node::Value(value),
                    None => Node::List(values),
                };
                self.nodes.insert(key.clone(), node);
                Ok(())
            }
            _ => {
                let node = self
                    .nodes
                    .entry(key.clone())
                    .or_insert_with(|| Node::Branch(Tree::new()));

                if !node.is_branch() {
                    *node = Node::Branch(Tree::new());
                }

                match node {
                    Node::Branch(tree) => tree.mount(rest, values),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Resolves what is already stored at `key`, returns `true` when the
    /// insertion has nothing left to do.
    fn prepare(&mut self, key: &str, rest: &[String], values: &[T]) -> Result<bool> {
        if !self.nodes.contains_key(key) {
            self.nodes.insert(key.to_owned(), Node::Branch(Tree::new()));
            return Ok(false);
        }

        let Some(node) = self.nodes.get_mut(key) else {
            return Ok(false);
        };

        let is_blank = is_blank_list(values);
        let is_leaf = match rest {
            [] => true,
            [tail] => tail.is_empty(),
            _ => false,
        };

        match node {
            // a container cannot become a value
            Node::Branch(_) if is_leaf => {
                if is_blank {
                    Ok(true)
                } else {
                    Err(Error::Conflict {
                        key: key.to_owned(),
                    })
                }
            }
            Node::Branch(_) => Ok(false),
            // empty values give way to whatever comes next
            node if node.is_blank() => {
                if !is_blank {
                    *node = Node::Branch(Tree::new());
                }
                Ok(false)
            }
            _ if is_blank => Ok(true),
            // a value cannot become a container
            _ if rest.first().is_some_and(|k| !k.is_empty()) => Err(Error::Conflict {
                key: key.to_owned(),
            }),
            _ => Ok(false),
        }
    }
}

impl<'a, T> IntoIterator for &'a Tree<T> {
    type Item = (&'a String, &'a Node<T>);
    type IntoIter = Iter<'a, String, Node<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
