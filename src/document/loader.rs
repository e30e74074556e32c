//! Document loader for YAML configuration files.
//!
//! This module turns YAML text into a [`ConfigDocument`]: the tagged
//! parameter tree plus the invalidation targets declared under the reserved
//! top-level key.
//!
//! ```yaml
//! .paramstack-config:
//!   invalidations:
//!     shipping-labels: !ecs-invalidation
//!       cluster_name: acme
//!       service_import: shipping-labels-service
//!       role_name: arn:aws:iam::123456789012:role/restarter
//!
//! acme:
//!   ? !item {key: shipping-labels-service, invalidates: [shipping-labels]}
//!   : greeting: hello world
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{DocumentError, InvalidationError, ParamstackError, Result};
use crate::invalidation::{Descriptor, InvalidationTarget};

use super::model::{ConfigNode, InvalidationKey, NodeBody, Scalar};
use super::naming::PATH_SEPARATOR;

/// Top-level key holding tool configuration rather than parameters.
pub const RESERVED_KEY: &str = ".paramstack-config";

/// Key inside the reserved section that declares invalidation targets.
pub const INVALIDATIONS_KEY: &str = "invalidations";

/// Tag for annotated mapping keys.
pub const ITEM_TAG: &str = "item";

/// A loaded input document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    /// Parameter tree (without the reserved section).
    pub tree: ConfigNode,
    /// Declared invalidation targets, in document order.
    pub targets: Vec<InvalidationTarget>,
}

/// Body of an `!item` annotated key.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemKey {
    key: String,
    #[serde(default)]
    invalidates: Vec<String>,
}

/// Loader for YAML input documents.
#[derive(Debug, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    /// Creates a new loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads a document from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid document.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ConfigDocument> {
        let path = path.as_ref();
        info!("Loading document from: {}", path.display());

        if !path.exists() {
            return Err(DocumentError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Parse {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Loads a document from a reader (typically stdin).
    ///
    /// # Errors
    ///
    /// Returns an error if the reader fails or the content is not a valid document.
    pub fn load_reader(&self, mut reader: impl Read) -> Result<ConfigDocument> {
        info!("Loading document from standard input");
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        self.parse_yaml(&content, None)
    }

    /// Parses a document from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns a parse error for invalid YAML, and structure, naming or
    /// descriptor errors for content that does not form a valid document.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ConfigDocument> {
        debug!("Parsing YAML document");

        let value: Value = serde_yaml::from_str(content).map_err(|e| {
            let position = e
                .location()
                .map(|loc| format!("line {}, column {}", loc.line(), loc.column()));
            let location = match (source, position) {
                (Some(path), Some(pos)) => Some(format!("{}: {pos}", path.display())),
                (Some(path), None) => Some(path.display().to_string()),
                (None, pos) => pos,
            };
            DocumentError::Parse {
                message: format!("YAML parse error: {e}"),
                location,
            }
        })?;

        let Value::Mapping(root) = value else {
            return Err(DocumentError::structure("", "document root must be a mapping").into());
        };

        let mut targets = Vec::new();
        let mut parameters = Mapping::new();
        for (key, value) in root {
            if key.as_str() == Some(RESERVED_KEY) {
                targets = parse_reserved_section(value)?;
            } else {
                parameters.insert(key, value);
            }
        }

        let tree = ConfigNode::tree(convert_mapping(parameters, &[])?);
        debug!(
            "Loaded document with {} top-level keys and {} invalidation targets",
            tree.children().map_or(0, IndexMap::len),
            targets.len()
        );

        Ok(ConfigDocument { tree, targets })
    }
}

fn join(segments: &[String]) -> String {
    segments.join(&PATH_SEPARATOR.to_string())
}

fn tag_name(tag: &Tag) -> String {
    tag.to_string().trim_start_matches('!').to_string()
}

fn parse_reserved_section(section: Value) -> Result<Vec<InvalidationTarget>> {
    let section = match section {
        Value::Mapping(section) => section,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(DocumentError::structure(RESERVED_KEY, "section must be a mapping").into());
        }
    };

    let mut targets = Vec::new();
    for (key, value) in section {
        match key.as_str() {
            Some(INVALIDATIONS_KEY) => targets.extend(parse_invalidations(value)?),
            _ => {
                return Err(DocumentError::structure(
                    RESERVED_KEY,
                    format!("unsupported setting {}", describe_key(&key)),
                )
                .into());
            }
        }
    }

    Ok(targets)
}

fn parse_invalidations(value: Value) -> Result<Vec<InvalidationTarget>> {
    let path = format!("{RESERVED_KEY}{PATH_SEPARATOR}{INVALIDATIONS_KEY}");
    let entries = match value {
        Value::Mapping(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        _ => return Err(DocumentError::structure(path, "must be a mapping of targets").into()),
    };

    let mut targets = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let Some(id) = key.as_str().filter(|id| !id.is_empty()) else {
            return Err(DocumentError::naming(
                path,
                format!("target id {} must be non-empty text", describe_key(&key)),
            )
            .into());
        };

        let Value::Tagged(tagged) = value else {
            return Err(InvalidationError::descriptor(
                id,
                "descriptor must be tagged !ecs-invalidation or !lambda-invalidation",
            )
            .into());
        };

        let TaggedValue { tag, value } = *tagged;
        let fields = serde_json::to_value(&value)
            .map_err(|e| InvalidationError::descriptor(id, e.to_string()))?;
        let descriptor = Descriptor::from_tagged(id, &tag_name(&tag), fields)?;
        targets.push(InvalidationTarget::new(id, descriptor));
    }

    Ok(targets)
}

fn describe_key(key: &Value) -> String {
    serde_yaml::to_string(key).map_or_else(
        |_| String::from("<unprintable>"),
        |s| format!("'{}'", s.trim_end()),
    )
}

/// Converts a mapping key into a segment name plus the tags declared on it.
fn convert_key(
    key: Value,
    parent: &[String],
) -> Result<(String, BTreeSet<InvalidationKey>)> {
    match key {
        Value::String(name) => Ok((name, BTreeSet::new())),
        Value::Number(number) => Ok((number.to_string(), BTreeSet::new())),
        Value::Bool(flag) => Ok((flag.to_string(), BTreeSet::new())),
        Value::Tagged(tagged) if tag_name(&tagged.tag) == ITEM_TAG => {
            let item: ItemKey = serde_yaml::from_value(tagged.value).map_err(|e| {
                DocumentError::structure(join(parent), format!("invalid !{ITEM_TAG} key: {e}"))
            })?;
            let tags = item.invalidates.into_iter().map(InvalidationKey::from).collect();
            Ok((item.key, tags))
        }
        Value::Tagged(tagged) => Err(DocumentError::structure(
            join(parent),
            format!("unsupported key tag {}", tagged.tag),
        )
        .into()),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => Err(DocumentError::naming(
            join(parent),
            format!("mapping key {} is not a name", describe_key(&key)),
        )
        .into()),
    }
}

fn convert_mapping(mapping: Mapping, parent: &[String]) -> Result<IndexMap<String, ConfigNode>> {
    let mut children = IndexMap::with_capacity(mapping.len());

    for (key, value) in mapping {
        let (name, tags) = convert_key(key, parent)?;

        let mut segments = parent.to_vec();
        segments.push(name.clone());

        if children.contains_key(&name) {
            return Err(DocumentError::naming(
                join(&segments),
                "segment name is declared more than once",
            )
            .into());
        }

        let mut node = convert_value(value, &segments)?;
        node.tags.extend(tags);
        children.insert(name, node);
    }

    Ok(children)
}

fn convert_value(value: Value, segments: &[String]) -> Result<ConfigNode> {
    let node = match value {
        Value::Null => {
            return Err(null_value(segments));
        }
        Value::Bool(flag) => ConfigNode::scalar(Scalar::Boolean(flag)),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                ConfigNode::scalar(Scalar::Integer(i128::from(int)))
            } else if let Some(uint) = number.as_u64() {
                ConfigNode::scalar(Scalar::Integer(i128::from(uint)))
            } else {
                let decimal = number.as_f64().ok_or_else(|| {
                    DocumentError::structure(join(segments), format!("unsupported number {number}"))
                })?;
                ConfigNode::scalar(Scalar::Decimal(decimal))
            }
        }
        Value::String(text) => ConfigNode::text(text),
        Value::Sequence(items) => {
            let nodes = items
                .into_iter()
                .map(|item| convert_value(item, segments))
                .collect::<Result<Vec<_>>>()?;
            ConfigNode::sequence(nodes)
        }
        Value::Mapping(mapping) => ConfigNode::tree(convert_mapping(mapping, segments)?),
        Value::Tagged(tagged) => {
            return Err(DocumentError::structure(
                join(segments),
                format!("unsupported value tag {}", tagged.tag),
            )
            .into());
        }
    };

    Ok(node)
}

fn null_value(segments: &[String]) -> ParamstackError {
    DocumentError::structure(join(segments), "null values cannot be stored").into()
}

impl ConfigDocument {
    /// Returns true if the tree declares no parameters at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.tree.body {
            NodeBody::Tree(children) => children.is_empty(),
            NodeBody::Scalar(_) | NodeBody::Sequence(_) => false,
        }
    }
}
