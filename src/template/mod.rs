//! Output template construction.
//!
//! This module turns flattened parameters and invalidation groups into a
//! dependency-ordered resource graph and renders it as a CloudFormation
//! template.

mod builder;
mod graph;
mod handlers;
mod render;

pub use builder::{COMPLETION_ID, DEFAULT_ECS_RESTART_TIMEOUT_SECS, TemplateBuilder};
pub use graph::{
    HandlerKind, HandlerResource, ParameterResource, Resource, ResourceGraph, ResourceId,
    ResourceKind, TriggerResource,
};
pub use handlers::{
    ECS_HANDLER_GRACE_SECS, HANDLER_ENTRY, HANDLER_RUNTIME, LAMBDA_HANDLER_TIMEOUT_SECS,
    RESTART_TIMEOUT_ENV,
};
pub use render::{DEFAULT_DESCRIPTION, TEMPLATE_FORMAT_VERSION, TemplateFormat, TemplateRenderer};
