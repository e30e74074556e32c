//! In-memory model of a tagged configuration tree.
//!
//! These types are plain data. The loader builds them once from the input
//! document; the flattener only reads them.

use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a declared invalidation target, used as a tag on tree nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvalidationKey(String);

impl InvalidationKey {
    /// Creates a key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvalidationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for InvalidationKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for InvalidationKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A terminal configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean value.
    Boolean(bool),
    /// Integer value (covers both signed and unsigned 64-bit YAML integers).
    Integer(i128),
    /// Decimal value.
    Decimal(f64),
    /// Text value.
    Text(String),
}

/// Body of a configuration node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    /// A single scalar leaf.
    Scalar(Scalar),
    /// An ordered sequence leaf. Items are nodes so that malformed input
    /// (nested lists, mappings) stays representable until flattening.
    Sequence(Vec<ConfigNode>),
    /// An internal node; iteration follows document order.
    Tree(IndexMap<String, ConfigNode>),
}

/// A node of the configuration tree plus the invalidation tags declared on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    /// Tags declared directly on this node.
    pub tags: BTreeSet<InvalidationKey>,
    /// Node content.
    pub body: NodeBody,
}

impl ConfigNode {
    /// Creates an untagged scalar leaf.
    #[must_use]
    pub fn scalar(value: Scalar) -> Self {
        Self {
            tags: BTreeSet::new(),
            body: NodeBody::Scalar(value),
        }
    }

    /// Creates an untagged text leaf.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::scalar(Scalar::Text(value.into()))
    }

    /// Creates an untagged sequence leaf.
    #[must_use]
    pub fn sequence(items: Vec<Self>) -> Self {
        Self {
            tags: BTreeSet::new(),
            body: NodeBody::Sequence(items),
        }
    }

    /// Creates an untagged internal node.
    #[must_use]
    pub fn tree(children: IndexMap<String, Self>) -> Self {
        Self {
            tags: BTreeSet::new(),
            body: NodeBody::Tree(children),
        }
    }

    /// Adds tags to this node.
    #[must_use]
    pub fn with_tags<I, K>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<InvalidationKey>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Returns the children if this is an internal node.
    #[must_use]
    pub const fn children(&self) -> Option<&IndexMap<String, Self>> {
        match &self.body {
            NodeBody::Tree(children) => Some(children),
            NodeBody::Scalar(_) | NodeBody::Sequence(_) => None,
        }
    }

    /// Returns true if this node is a leaf (scalar or sequence).
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        !matches!(self.body, NodeBody::Tree(_))
    }
}
