//! Input document handling.
//!
//! This module covers everything on the input side of a conversion:
//! - Loading YAML documents into a tagged configuration tree
//! - Naming rules for path segments and logical ids
//! - Flattening the tree into parameter entries with inherited tags

mod flatten;
mod loader;
mod model;
pub mod naming;

pub use flatten::{FlatEntry, Flattener, ParameterPath, ValueKind, serialize_scalar, serialize_sequence};
pub use loader::{ConfigDocument, DocumentLoader, INVALIDATIONS_KEY, ITEM_TAG, RESERVED_KEY};
pub use model::{ConfigNode, InvalidationKey, NodeBody, Scalar};
