//! Accumulation of parameter entries into invalidation groups.
//!
//! The registry is filled in three steps: [`InvalidationRegistry::register`]
//! the declared targets, [`InvalidationRegistry::accumulate`] every flat
//! entry (in any order), then [`InvalidationRegistry::finalize`] to obtain
//! one fingerprinted group per target.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::document::{ConfigNode, FlatEntry, InvalidationKey, NodeBody, ParameterPath};
use crate::error::{InvalidationError, Result};

use super::fingerprint::Fingerprinter;
use super::target::InvalidationTarget;

/// A target plus the parameters that invalidate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationGroup {
    /// The invalidated target.
    pub target: InvalidationTarget,
    /// Member paths and their serialised values, ordered by path.
    pub members: BTreeMap<ParameterPath, String>,
    /// Digest over the sorted members.
    pub fingerprint: String,
}

impl InvalidationGroup {
    /// Returns true if no parameter feeds this group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the member paths in sorted order.
    pub fn member_paths(&self) -> impl Iterator<Item = &ParameterPath> {
        self.members.keys()
    }
}

/// Collects declared targets and the entries tagged with them.
#[derive(Debug, Default)]
pub struct InvalidationRegistry {
    /// Declared targets by id.
    targets: BTreeMap<InvalidationKey, InvalidationTarget>,
    /// Accumulated members per target id.
    pending: BTreeMap<InvalidationKey, BTreeMap<ParameterPath, String>>,
    /// Fingerprint calculator.
    fingerprinter: Fingerprinter,
}

impl InvalidationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers declared targets.
    ///
    /// # Errors
    ///
    /// Returns an error if two targets (in this call or an earlier one) share an id.
    pub fn register<I>(&mut self, targets: I) -> Result<()>
    where
        I: IntoIterator<Item = InvalidationTarget>,
    {
        for target in targets {
            if self.targets.contains_key(&target.id) {
                return Err(InvalidationError::DuplicateTarget {
                    id: target.id.to_string(),
                }
                .into());
            }

            debug!(
                "Registered {} invalidation target '{}'",
                target.descriptor.kind_label(),
                target.id
            );
            self.pending.insert(target.id.clone(), BTreeMap::new());
            self.targets.insert(target.id.clone(), target);
        }

        Ok(())
    }

    /// Returns the number of registered targets.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Checks that every tag on every node of `root` names a registered target.
    ///
    /// Subtrees without leaves never reach [`Self::accumulate`], so their
    /// tags are only caught here.
    ///
    /// # Errors
    ///
    /// Returns an unknown target error naming the first offending node.
    pub fn check_tags(&self, root: &ConfigNode) -> Result<()> {
        let mut segments = Vec::new();
        self.check_node(root, &mut segments)
    }

    fn check_node<'a>(&self, node: &'a ConfigNode, segments: &mut Vec<&'a str>) -> Result<()> {
        if let Some(unknown) = node.tags.iter().find(|key| !self.targets.contains_key(*key)) {
            return Err(InvalidationError::UnknownTarget {
                key: unknown.to_string(),
                path: ParameterPath::from_segments(segments.as_slice()).to_string(),
            }
            .into());
        }

        if let NodeBody::Tree(children) = &node.body {
            for (name, child) in children {
                segments.push(name);
                self.check_node(child, segments)?;
                segments.pop();
            }
        }

        Ok(())
    }

    /// Adds an entry to the member set of every target it is tagged with.
    ///
    /// # Errors
    ///
    /// Returns an error if a tag does not match a registered target. The
    /// registry is left unchanged in that case.
    pub fn accumulate(&mut self, entry: &FlatEntry) -> Result<()> {
        if let Some(unknown) = entry.tags.iter().find(|key| !self.targets.contains_key(*key)) {
            return Err(InvalidationError::UnknownTarget {
                key: unknown.to_string(),
                path: entry.path.to_string(),
            }
            .into());
        }

        for key in &entry.tags {
            if let Some(members) = self.pending.get_mut(key) {
                members.insert(entry.path.clone(), entry.value.clone());
            }
        }

        Ok(())
    }

    /// Produces one group per registered target, ordered by target id.
    ///
    /// Targets that no entry was tagged with still yield a group, with the
    /// fingerprint of the empty member set; they are logged as warnings.
    #[must_use]
    pub fn finalize(self) -> Vec<InvalidationGroup> {
        let Self {
            targets,
            mut pending,
            fingerprinter,
        } = self;

        targets
            .into_iter()
            .map(|(id, target)| {
                let members = pending.remove(&id).unwrap_or_default();
                if members.is_empty() {
                    warn!("Invalidation target '{id}' is invalidated by nothing");
                }

                let fingerprint = fingerprinter.fingerprint(
                    members
                        .iter()
                        .map(|(path, value)| (path.as_str(), value.as_str())),
                );
                debug!(
                    "Group '{id}': {} members, fingerprint {}",
                    members.len(),
                    fingerprinter.short(&fingerprint)
                );

                InvalidationGroup {
                    target,
                    members,
                    fingerprint,
                }
            })
            .collect()
    }
}
