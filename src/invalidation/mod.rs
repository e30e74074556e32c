//! Invalidation targets and grouping.
//!
//! This module handles the restart/refresh side of a conversion:
//! - Declared targets and their ECS or Lambda descriptors
//! - Accumulating tagged parameters into per-target groups
//! - Computing change fingerprints for each group

mod fingerprint;
mod registry;
mod target;

pub use fingerprint::Fingerprinter;
pub use registry::{InvalidationGroup, InvalidationRegistry};
pub use target::{
    Descriptor, ECS_TAG, EcsInvalidation, InvalidationTarget, LAMBDA_TAG, LambdaInvalidation,
    NameOrImportRef,
};
