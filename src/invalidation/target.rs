//! Invalidation target declarations.
//!
//! A target names an application that must be restarted (ECS service) or
//! refreshed (Lambda function) when any parameter tagged with its id changes.
//! Descriptor fields may be given literally (`*_name`) or as a reference to
//! another stack's export (`*_import`), never both.

use serde::Deserialize;
use std::fmt;

use crate::document::InvalidationKey;
use crate::error::{InvalidationError, Result};

/// Tag used in documents for ECS service descriptors.
pub const ECS_TAG: &str = "ecs-invalidation";

/// Tag used in documents for Lambda function descriptors.
pub const LAMBDA_TAG: &str = "lambda-invalidation";

/// A literal identifier or a reference to a value exported by another stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOrImportRef {
    /// Physical name or ARN.
    Name(String),
    /// Name of a cross-stack export, resolved at deploy time.
    Import(String),
}

impl NameOrImportRef {
    /// Resolves the `<field>_name` / `<field>_import` pair into a single reference.
    ///
    /// # Errors
    ///
    /// Returns a descriptor error if both or neither form is present.
    pub fn from_options(
        target: &str,
        field: &str,
        name: Option<String>,
        import: Option<String>,
    ) -> Result<Self> {
        let name = name.filter(|n| !n.is_empty());
        let import = import.filter(|i| !i.is_empty());

        match (name, import) {
            (Some(_), Some(_)) => Err(InvalidationError::descriptor(
                target,
                format!("the {field} may not be given as both {field}_name and {field}_import"),
            )
            .into()),
            (Some(name), None) => Ok(Self::Name(name)),
            (None, Some(import)) => Ok(Self::Import(import)),
            (None, None) => Err(InvalidationError::descriptor(
                target,
                format!("the {field} must be given as either {field}_name or {field}_import"),
            )
            .into()),
        }
    }
}

impl fmt::Display for NameOrImportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Import(export) => write!(f, "import:{export}"),
        }
    }
}

/// Restart of an ECS service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcsInvalidation {
    /// Cluster containing the service.
    pub cluster: NameOrImportRef,
    /// Service to restart.
    pub service: NameOrImportRef,
    /// Role assumed by the restart handler.
    pub role: NameOrImportRef,
}

/// Refresh of a Lambda function's execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaInvalidation {
    /// Function to refresh.
    pub function: NameOrImportRef,
    /// Role assumed by the refresh handler.
    pub role: NameOrImportRef,
}

/// What to do when a target is invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Restart an ECS service.
    Ecs(EcsInvalidation),
    /// Refresh a Lambda function.
    Lambda(LambdaInvalidation),
}

impl Descriptor {
    /// Returns a short label for the descriptor kind.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Ecs(_) => "ecs",
            Self::Lambda(_) => "lambda",
        }
    }

    /// Returns the role used by the handler.
    #[must_use]
    pub const fn role(&self) -> &NameOrImportRef {
        match self {
            Self::Ecs(ecs) => &ecs.role,
            Self::Lambda(lambda) => &lambda.role,
        }
    }

    /// Builds a descriptor from its document tag and raw field mapping.
    ///
    /// # Errors
    ///
    /// Returns a descriptor error for an unknown tag, unknown fields, or
    /// fields given in both or neither form.
    pub fn from_tagged(target: &str, tag: &str, fields: serde_json::Value) -> Result<Self> {
        match tag {
            ECS_TAG => {
                let raw: RawEcsDescriptor = serde_json::from_value(fields)
                    .map_err(|e| InvalidationError::descriptor(target, e.to_string()))?;
                raw.resolve(target)
            }
            LAMBDA_TAG => {
                let raw: RawLambdaDescriptor = serde_json::from_value(fields)
                    .map_err(|e| InvalidationError::descriptor(target, e.to_string()))?;
                raw.resolve(target)
            }
            other => Err(InvalidationError::descriptor(
                target,
                format!("unknown descriptor kind '!{other}', expected !{ECS_TAG} or !{LAMBDA_TAG}"),
            )
            .into()),
        }
    }
}

/// A declared invalidation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationTarget {
    /// Identifier referenced by tree tags.
    pub id: InvalidationKey,
    /// What to invalidate.
    pub descriptor: Descriptor,
}

impl InvalidationTarget {
    /// Creates a target.
    #[must_use]
    pub fn new(id: impl Into<InvalidationKey>, descriptor: Descriptor) -> Self {
        Self {
            id: id.into(),
            descriptor,
        }
    }
}

/// Field mapping as written in a `!ecs-invalidation` descriptor.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEcsDescriptor {
    cluster_name: Option<String>,
    cluster_import: Option<String>,
    service_name: Option<String>,
    service_import: Option<String>,
    role_name: Option<String>,
    role_import: Option<String>,
}

impl RawEcsDescriptor {
    fn resolve(self, target: &str) -> Result<Descriptor> {
        Ok(Descriptor::Ecs(EcsInvalidation {
            cluster: NameOrImportRef::from_options(
                target,
                "cluster",
                self.cluster_name,
                self.cluster_import,
            )?,
            service: NameOrImportRef::from_options(
                target,
                "service",
                self.service_name,
                self.service_import,
            )?,
            role: NameOrImportRef::from_options(target, "role", self.role_name, self.role_import)?,
        }))
    }
}

/// Field mapping as written in a `!lambda-invalidation` descriptor.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLambdaDescriptor {
    function_name: Option<String>,
    function_import: Option<String>,
    role_name: Option<String>,
    role_import: Option<String>,
}

impl RawLambdaDescriptor {
    fn resolve(self, target: &str) -> Result<Descriptor> {
        Ok(Descriptor::Lambda(LambdaInvalidation {
            function: NameOrImportRef::from_options(
                target,
                "function",
                self.function_name,
                self.function_import,
            )?,
            role: NameOrImportRef::from_options(target, "role", self.role_name, self.role_import)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ecs_descriptor_mixed_forms() {
        let descriptor = Descriptor::from_tagged(
            "shipping",
            ECS_TAG,
            json!({
                "cluster_name": "acme-cluster",
                "service_import": "shipping-service-arn",
                "role_name": "arn:aws:iam::123456789012:role/restarter",
            }),
        )
        .unwrap();

        let Descriptor::Ecs(ecs) = descriptor else {
            panic!("expected an ECS descriptor");
        };
        assert_eq!(ecs.cluster, NameOrImportRef::Name(String::from("acme-cluster")));
        assert_eq!(
            ecs.service,
            NameOrImportRef::Import(String::from("shipping-service-arn"))
        );
    }

    #[test]
    fn test_lambda_descriptor() {
        let descriptor = Descriptor::from_tagged(
            "warehousing",
            LAMBDA_TAG,
            json!({ "function_name": "warehouse", "role_import": "restart-role" }),
        )
        .unwrap();

        assert_eq!(descriptor.kind_label(), "lambda");
        assert_eq!(
            descriptor.role(),
            &NameOrImportRef::Import(String::from("restart-role"))
        );
    }

    #[test]
    fn test_both_forms_rejected() {
        let err = Descriptor::from_tagged(
            "t",
            LAMBDA_TAG,
            json!({ "function_name": "f", "function_import": "g", "role_name": "r" }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "DescriptorError");
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = Descriptor::from_tagged(
            "t",
            ECS_TAG,
            json!({ "cluster_name": "c", "role_name": "r" }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "DescriptorError");
        assert!(err.to_string().contains("service"));
    }

    #[test]
    fn test_unknown_field_and_tag_rejected() {
        let err = Descriptor::from_tagged(
            "t",
            LAMBDA_TAG,
            json!({ "function_name": "f", "role_name": "r", "colour": "blue" }),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "DescriptorError");

        let err = Descriptor::from_tagged("t", "k8s-invalidation", json!({})).unwrap_err();
        assert!(err.to_string().contains("unknown descriptor kind"));
    }
}
