//! Construction of the resource graph from flat entries and groups.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::document::naming::logical_id;
use crate::document::{FlatEntry, ParameterPath};
use crate::error::{DocumentError, Result, TemplateError};
use crate::invalidation::InvalidationGroup;

use super::graph::{
    HandlerKind, HandlerResource, ParameterResource, Resource, ResourceGraph, ResourceId,
    ResourceKind, TriggerResource,
};

/// Logical id of the completion marker.
pub const COMPLETION_ID: &str = "InvalidationsComplete";

/// Default time an ECS service may take to become stable after a restart.
pub const DEFAULT_ECS_RESTART_TIMEOUT_SECS: u32 = 480;

/// Builds a [`ResourceGraph`] from flattened parameters and invalidation groups.
#[derive(Debug, Clone, Copy)]
pub struct TemplateBuilder {
    /// Restart timeout handed to ECS handlers.
    ecs_restart_timeout_secs: u32,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateBuilder {
    /// Creates a builder with the default restart timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ecs_restart_timeout_secs: DEFAULT_ECS_RESTART_TIMEOUT_SECS,
        }
    }

    /// Sets the ECS restart timeout.
    #[must_use]
    pub const fn with_ecs_restart_timeout(mut self, secs: u32) -> Self {
        self.ecs_restart_timeout_secs = secs;
        self
    }

    /// Builds the graph.
    ///
    /// Parameters come first, ordered by path, then one handler and one
    /// trigger per group in target id order, then the completion marker if
    /// any group exists.
    ///
    /// # Errors
    ///
    /// Returns a naming error if two parameters or targets normalise to the
    /// same logical id, and a template error if a group names a parameter
    /// that is not among `entries`.
    pub fn build(&self, entries: &[FlatEntry], groups: &[InvalidationGroup]) -> Result<ResourceGraph> {
        let mut graph = ResourceGraph::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut by_path: HashMap<&ParameterPath, ResourceId> = HashMap::new();

        let mut sorted: Vec<&FlatEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        for entry in sorted {
            let id = logical_id("SSMParam", entry.path.as_str(), "");
            claim(&mut owners, &id, entry.path.as_str())?;

            let resource_id = graph.add(Resource {
                logical_id: id,
                kind: ResourceKind::Parameter(ParameterResource {
                    path: entry.path.clone(),
                    value: entry.value.clone(),
                    kind: entry.kind,
                }),
                depends_on: Vec::new(),
            })?;
            debug!("Parameter {} -> {}", entry.path, graph.logical_id(resource_id));
            by_path.insert(&entry.path, resource_id);
        }

        let mut sorted_groups: Vec<&InvalidationGroup> = groups.iter().collect();
        sorted_groups.sort_by(|a, b| a.target.id.cmp(&b.target.id));

        let mut triggers = Vec::with_capacity(sorted_groups.len());
        for group in sorted_groups {
            let target_id = group.target.id.as_str();
            let kind = HandlerKind::for_descriptor(&group.target.descriptor);

            let handler_id = logical_id("Invalidate", target_id, "Function");
            let trigger_id = logical_id("Invalidate", target_id, kind.trigger_suffix());
            let owner = format!("invalidation target '{target_id}'");
            claim(&mut owners, &handler_id, &owner)?;
            claim(&mut owners, &trigger_id, &owner)?;

            let mut members = Vec::with_capacity(group.members.len());
            for path in group.member_paths() {
                let member = by_path.get(path).copied().ok_or_else(|| {
                    TemplateError::MissingDependency {
                        resource: trigger_id.clone(),
                        dependency: path.to_string(),
                    }
                })?;
                members.push(member);
            }

            if members.is_empty() {
                warn!("Trigger {trigger_id} has no member parameters and will never re-run");
            }

            let handler = graph.add(Resource {
                logical_id: handler_id,
                kind: ResourceKind::Handler(HandlerResource {
                    target: group.target.id.clone(),
                    kind,
                    role: group.target.descriptor.role().clone(),
                    timeout_secs: kind.timeout_secs(self.ecs_restart_timeout_secs),
                    restart_timeout_secs: match kind {
                        HandlerKind::RestartEcsService => Some(self.ecs_restart_timeout_secs),
                        HandlerKind::ReplaceLambdaContext => None,
                    },
                }),
                depends_on: Vec::new(),
            })?;

            let trigger = graph.add(Resource {
                logical_id: trigger_id,
                kind: ResourceKind::Trigger(TriggerResource {
                    target: group.target.id.clone(),
                    descriptor: group.target.descriptor.clone(),
                    fingerprint: group.fingerprint.clone(),
                    handler,
                    members: members.clone(),
                }),
                depends_on: members,
            })?;
            debug!(
                "Trigger {} depends on {} parameters",
                graph.logical_id(trigger),
                group.members.len()
            );
            triggers.push(trigger);
        }

        if !triggers.is_empty() {
            claim(&mut owners, COMPLETION_ID, "the completion marker")?;
            graph.add(Resource {
                logical_id: COMPLETION_ID.to_string(),
                kind: ResourceKind::Completion,
                depends_on: triggers,
            })?;
        }

        graph.validate()?;
        info!(
            "Built resource graph: {} parameters, {} triggers",
            graph.parameters().count(),
            graph.triggers().count()
        );

        Ok(graph)
    }
}

/// Records that `owner` uses `id`, failing if someone else already does.
fn claim(owners: &mut HashMap<String, String>, id: &str, owner: &str) -> Result<()> {
    if let Some(existing) = owners.get(id) {
        return Err(DocumentError::naming(
            owner,
            format!("logical id '{id}' is already used by '{existing}'"),
        )
        .into());
    }
    owners.insert(id.to_string(), owner.to_string());
    Ok(())
}
