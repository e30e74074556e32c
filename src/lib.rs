// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Paramstack
//!
//! Turns a hierarchical YAML application configuration into a CloudFormation
//! stack of SSM parameters, with optional restart triggers for the
//! applications that consume them.
//!
//! ## Overview
//!
//! Every leaf of the document becomes one parameter whose name is the
//! `/`-joined path of keys leading to it. Subtrees can be tagged with
//! invalidation targets (ECS services or Lambda functions); each target gets
//! a trigger resource carrying a fingerprint of the parameters that feed it,
//! so the target is restarted exactly when one of those values changes.
//!
//! ## Pipeline
//!
//! 1. **Load**: YAML text becomes a tagged [`document::ConfigNode`] tree
//! 2. **Flatten**: leaves become [`document::FlatEntry`] values with inherited tags
//! 3. **Group**: the [`invalidation::InvalidationRegistry`] collects entries per target
//! 4. **Build**: the [`template::TemplateBuilder`] wires a dependency-ordered resource graph
//! 5. **Render**: the [`template::TemplateRenderer`] writes YAML or JSON
//!
//! ## Modules
//!
//! - [`document`]: Document loading, tree model and flattening
//! - [`invalidation`]: Invalidation targets, grouping and fingerprints
//! - [`template`]: Resource graph and template rendering
//! - [`converter`]: End-to-end pipeline
//! - [`settings`]: Tool settings and environment overrides
//! - [`cli`]: Command-line interface
//!
//! ## Example
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
//!   common:
//!     ? !item {key: enable-slapstick, invalidates: [shipping-labels]}
//!     : true
//!   ? !item {key: shipping-labels-service, invalidates: [shipping-labels]}
//!   :
//!     explosive-purchase-limit: 1000
//!     whitelist-users: [coyote, roadrunner]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod converter;
pub mod document;
pub mod error;
pub mod invalidation;
pub mod settings;
pub mod template;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, OutputFormatter};
pub use converter::{Conversion, Converter};
pub use document::{ConfigDocument, ConfigNode, DocumentLoader, FlatEntry, Flattener};
pub use error::{ParamstackError, Result};
pub use invalidation::{InvalidationGroup, InvalidationRegistry, InvalidationTarget};
pub use settings::Settings;
pub use template::{ResourceGraph, TemplateBuilder, TemplateFormat, TemplateRenderer};
