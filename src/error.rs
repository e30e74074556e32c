//! Error types for the paramstack conversion pipeline.
//!
//! This module provides the error hierarchy for every stage of a conversion:
//! document loading, flattening, invalidation grouping, template building,
//! and tool settings. Every error is fatal for the current run.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for paramstack.
#[derive(Debug, Error)]
pub enum ParamstackError {
    /// Input document errors (shape, naming, parsing).
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Invalidation target errors.
    #[error("Invalidation error: {0}")]
    Invalidation(#[from] InvalidationError),

    /// Template construction errors.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Tool settings errors.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

}

/// Errors in the shape or naming of the input document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The input file was not found.
    #[error("Input file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The input could not be parsed as YAML.
    #[error(
        "Failed to parse document{}: {message}",
        .location.as_ref().map_or_else(String::new, |l| format!(" at {l}"))
    )]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// The tree violates the shape rules (non-scalar in a list, null value, ...).
    #[error("Invalid structure at '{path}': {message}")]
    Structure {
        /// Path of the offending node.
        path: String,
        /// Description of the violation.
        message: String,
    },

    /// A segment name is empty, malformed, or collides after normalisation.
    #[error("Invalid name at '{path}': {message}")]
    Naming {
        /// Path of the offending node.
        path: String,
        /// Description of the violation.
        message: String,
    },
}

/// Errors in the declaration or use of invalidation targets.
#[derive(Debug, Error)]
pub enum InvalidationError {
    /// Two targets share an id.
    #[error("Duplicate invalidation target: {id}")]
    DuplicateTarget {
        /// The duplicated id.
        id: String,
    },

    /// A tag references a target that was never declared.
    #[error("Unknown invalidation target '{key}' referenced by '{path}'")]
    UnknownTarget {
        /// The undeclared key.
        key: String,
        /// Parameter path carrying the tag.
        path: String,
    },

    /// A target descriptor is missing a field, has both forms, or is malformed.
    #[error("Invalid descriptor for target '{target}': {message}")]
    Descriptor {
        /// Target id.
        target: String,
        /// Description of the problem.
        message: String,
    },
}

/// Errors while building or serialising the resource graph.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A dependency edge points at a slot that does not exist or is not earlier in the arena.
    #[error("Resource '{resource}' references an invalid slot {index}")]
    DanglingReference {
        /// Logical id of the resource holding the edge.
        resource: String,
        /// Offending arena index.
        index: usize,
    },

    /// Two resources share a logical id.
    #[error("Logical id '{logical_id}' is used by more than one resource")]
    DuplicateLogicalId {
        /// The repeated logical id.
        logical_id: String,
    },

    /// A required dependency edge is missing.
    #[error("Resource '{resource}' is missing a dependency on '{dependency}'")]
    MissingDependency {
        /// Logical id of the dependent resource.
        resource: String,
        /// Logical id of the missing dependency.
        dependency: String,
    },

    /// The template could not be serialised.
    #[error("Failed to serialise template: {message}")]
    Serialization {
        /// Description of the serialisation error.
        message: String,
    },
}

/// Errors in tool settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A setting has an unusable value.
    #[error("Invalid value for {name}: {message}")]
    InvalidValue {
        /// Setting name.
        name: String,
        /// Description of the problem.
        message: String,
    },
}

/// Result type alias for paramstack operations.
pub type Result<T> = std::result::Result<T, ParamstackError>;

impl ParamstackError {
    /// Returns the name of the error kind, as reported to the user.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Document(DocumentError::FileNotFound { .. }) => "FileNotFound",
            Self::Document(DocumentError::Parse { .. }) => "ParseError",
            Self::Document(DocumentError::Structure { .. }) => "StructureError",
            Self::Document(DocumentError::Naming { .. }) => "NamingError",
            Self::Invalidation(InvalidationError::DuplicateTarget { .. }) => "DuplicateTargetError",
            Self::Invalidation(InvalidationError::UnknownTarget { .. }) => "UnknownTargetError",
            Self::Invalidation(InvalidationError::Descriptor { .. }) => "DescriptorError",
            Self::Template(_) => "TemplateError",
            Self::Settings(_) => "SettingsError",
            Self::Io(_) => "IoError",
        }
    }
}

impl DocumentError {
    /// Creates a structure error at the given path.
    #[must_use]
    pub fn structure(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a naming error at the given path.
    #[must_use]
    pub fn naming(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Naming {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl InvalidationError {
    /// Creates a descriptor error for the given target.
    #[must_use]
    pub fn descriptor(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Descriptor {
            target: target.into(),
            message: message.into(),
        }
    }
}

impl TemplateError {
    /// Creates a serialisation error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl SettingsError {
    /// Creates an invalid value error for a named setting.
    #[must_use]
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_follow_taxonomy() {
        let err: ParamstackError = DocumentError::structure("a/b", "null value").into();
        assert_eq!(err.kind(), "StructureError");

        let err: ParamstackError = DocumentError::naming("a/", "empty segment").into();
        assert_eq!(err.kind(), "NamingError");

        let err: ParamstackError = InvalidationError::UnknownTarget {
            key: String::from("ghost"),
            path: String::from("a/b"),
        }
        .into();
        assert_eq!(err.kind(), "UnknownTargetError");
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_parse_error_shows_location() {
        let err = DocumentError::Parse {
            message: String::from("unexpected end"),
            location: Some(String::from("config.yaml: line 2, column 1")),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse document at config.yaml: line 2, column 1: unexpected end"
        );

        let err = DocumentError::Parse {
            message: String::from("unexpected end"),
            location: None,
        };
        assert_eq!(err.to_string(), "Failed to parse document: unexpected end");
    }

    #[test]
    fn test_descriptor_message_names_target() {
        let err = InvalidationError::descriptor("shipping", "cluster is missing");
        assert_eq!(
            err.to_string(),
            "Invalid descriptor for target 'shipping': cluster is missing"
        );
    }
}
