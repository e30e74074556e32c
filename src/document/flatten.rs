//! Flattening of a configuration tree into parameter entries.
//!
//! The flattener walks the tree depth-first, extending the path by one
//! segment per level and carrying the effective tag set down as a value.
//! Each leaf yields exactly one [`FlatEntry`].

use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

use crate::error::{DocumentError, Result};

use super::model::{ConfigNode, InvalidationKey, NodeBody, Scalar};
use super::naming::{MAX_DEPTH, MAX_NAME_LEN, PATH_SEPARATOR, check_segment};

/// `/`-joined segment path from the root to a leaf.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParameterPath(String);

impl ParameterPath {
    /// Joins segments into a path.
    #[must_use]
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let joined: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
        Self(joined.join(&PATH_SEPARATOR.to_string()))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the stored parameter name (the path with a leading separator).
    #[must_use]
    pub fn parameter_name(&self) -> String {
        format!("{PATH_SEPARATOR}{}", self.0)
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a flattened value came from a scalar or a sequence leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Plain text.
    Text,
    /// Comma-joined list.
    List,
}

impl ValueKind {
    /// Returns the parameter store type name for this kind.
    #[must_use]
    pub const fn parameter_type(self) -> &'static str {
        match self {
            Self::Text => "String",
            Self::List => "StringList",
        }
    }
}

/// One flattened leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    /// Path of the leaf.
    pub path: ParameterPath,
    /// Serialised value.
    pub value: String,
    /// Scalar or list.
    pub kind: ValueKind,
    /// Effective invalidation tags (own tags plus every ancestor's).
    pub tags: BTreeSet<InvalidationKey>,
}

/// Walks a configuration tree and produces flat entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct Flattener;

impl Flattener {
    /// Creates a new flattener.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Flattens a tree into one entry per leaf, in document order.
    ///
    /// # Errors
    ///
    /// Returns a structure error for malformed leaves or a non-mapping root,
    /// and a naming error for invalid segments or over-long paths.
    pub fn flatten(&self, root: &ConfigNode) -> Result<Vec<FlatEntry>> {
        if root.is_leaf() {
            return Err(DocumentError::structure("", "document root must be a mapping").into());
        }

        let mut entries = Vec::new();
        let mut segments = Vec::new();
        Self::visit(root, &BTreeSet::new(), &mut segments, &mut entries)?;

        debug!("Flattened tree into {} entries", entries.len());
        Ok(entries)
    }

    fn visit(
        node: &ConfigNode,
        inherited: &BTreeSet<InvalidationKey>,
        segments: &mut Vec<String>,
        entries: &mut Vec<FlatEntry>,
    ) -> Result<()> {
        let effective: BTreeSet<InvalidationKey> = inherited.union(&node.tags).cloned().collect();

        match &node.body {
            NodeBody::Scalar(scalar) => {
                let path = Self::leaf_path(segments)?;
                let value = serialize_scalar(scalar)
                    .map_err(|message| DocumentError::structure(path.as_str(), message))?;
                entries.push(FlatEntry {
                    path,
                    value,
                    kind: ValueKind::Text,
                    tags: effective,
                });
            }
            NodeBody::Sequence(items) => {
                let path = Self::leaf_path(segments)?;
                let value = serialize_sequence(items)
                    .map_err(|message| DocumentError::structure(path.as_str(), message))?;
                entries.push(FlatEntry {
                    path,
                    value,
                    kind: ValueKind::List,
                    tags: effective,
                });
            }
            NodeBody::Tree(children) => {
                if children.is_empty() && !segments.is_empty() {
                    warn!(
                        "Mapping at '{}' is empty and produces no parameters",
                        ParameterPath::from_segments(segments)
                    );
                }

                for (name, child) in children {
                    if let Some(message) = check_segment(name) {
                        segments.push(name.clone());
                        let path = ParameterPath::from_segments(segments);
                        return Err(DocumentError::naming(path.as_str(), message).into());
                    }

                    segments.push(name.clone());
                    if segments.len() > MAX_DEPTH {
                        let path = ParameterPath::from_segments(segments);
                        return Err(DocumentError::naming(
                            path.as_str(),
                            format!("hierarchy is deeper than {MAX_DEPTH} levels"),
                        )
                        .into());
                    }

                    Self::visit(child, &effective, segments, entries)?;
                    segments.pop();
                }
            }
        }

        Ok(())
    }

    fn leaf_path(segments: &[String]) -> Result<ParameterPath> {
        let path = ParameterPath::from_segments(segments);
        if path.parameter_name().len() > MAX_NAME_LEN {
            return Err(DocumentError::naming(
                path.as_str(),
                format!("parameter name is longer than {MAX_NAME_LEN} characters"),
            )
            .into());
        }
        Ok(path)
    }
}

/// Serialises a scalar to parameter text.
///
/// Booleans become `true`/`false`, integers their decimal form, and decimals
/// their shortest round-trip form with a fractional part.
///
/// # Errors
///
/// Returns a message for non-finite decimals and empty text.
pub fn serialize_scalar(scalar: &Scalar) -> std::result::Result<String, String> {
    match scalar {
        Scalar::Boolean(value) => Ok(value.to_string()),
        Scalar::Integer(value) => Ok(value.to_string()),
        Scalar::Decimal(value) if value.is_finite() => Ok(format!("{value:?}")),
        Scalar::Decimal(value) => Err(format!("decimal value {value} cannot be stored")),
        Scalar::Text(value) if value.is_empty() => Err(String::from("empty text cannot be stored")),
        Scalar::Text(value) => Ok(value.clone()),
    }
}

/// Serialises a sequence leaf to comma-joined text.
///
/// # Errors
///
/// Returns a message if the sequence is empty, holds anything but scalars,
/// or an element is empty or contains a comma.
pub fn serialize_sequence(items: &[ConfigNode]) -> std::result::Result<String, String> {
    if items.is_empty() {
        return Err(String::from("empty lists cannot be stored"));
    }

    let mut parts = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let text = match &item.body {
            NodeBody::Scalar(scalar) => {
                serialize_scalar(scalar).map_err(|message| format!("list item {i}: {message}"))?
            }
            NodeBody::Sequence(_) => {
                return Err(format!("list item {i} is a nested list"));
            }
            NodeBody::Tree(_) => {
                return Err(format!("list item {i} is a mapping"));
            }
        };

        if text.contains(',') {
            return Err(format!("list item {i} ('{text}') contains a comma"));
        }
        parts.push(text);
    }

    Ok(parts.join(","))
}
