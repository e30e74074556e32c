//! Resource graph for the output template.
//!
//! Resources live in an arena and refer to each other by [`ResourceId`].
//! Edges may only point at earlier slots, which keeps the graph acyclic by
//! construction and gives a valid creation order for free.

use std::collections::{BTreeSet, HashMap};

use crate::document::{InvalidationKey, ParameterPath, ValueKind};
use crate::error::{Result, TemplateError};
use crate::invalidation::{Descriptor, NameOrImportRef};

/// Index of a resource in a [`ResourceGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(usize);

impl ResourceId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A stored configuration parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterResource {
    /// Parameter path.
    pub path: ParameterPath,
    /// Serialised value.
    pub value: String,
    /// Scalar or list.
    pub kind: ValueKind,
}

/// Which handler code a function runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Forces a new deployment of an ECS service and waits for it to settle.
    RestartEcsService,
    /// Touches a Lambda function's configuration so new execution contexts start.
    ReplaceLambdaContext,
}

impl HandlerKind {
    /// Returns the handler kind needed by a descriptor.
    #[must_use]
    pub const fn for_descriptor(descriptor: &Descriptor) -> Self {
        match descriptor {
            Descriptor::Ecs(_) => Self::RestartEcsService,
            Descriptor::Lambda(_) => Self::ReplaceLambdaContext,
        }
    }
}

/// The function that services a trigger resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResource {
    /// Target this handler serves.
    pub target: InvalidationKey,
    /// Handler code.
    pub kind: HandlerKind,
    /// Execution role.
    pub role: NameOrImportRef,
    /// Function timeout in seconds.
    pub timeout_secs: u32,
    /// How long an ECS restart may take before it counts as failed.
    pub restart_timeout_secs: Option<u32>,
}

/// A resource whose re-application restarts or refreshes an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerResource {
    /// Target id.
    pub target: InvalidationKey,
    /// Target descriptor.
    pub descriptor: Descriptor,
    /// Fingerprint of the member parameters.
    pub fingerprint: String,
    /// Function servicing this trigger.
    pub handler: ResourceId,
    /// Parameter resources feeding this trigger.
    pub members: Vec<ResourceId>,
}

/// Typed resource payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// Configuration parameter.
    Parameter(ParameterResource),
    /// Handler function.
    Handler(HandlerResource),
    /// Restart/refresh trigger.
    Trigger(TriggerResource),
    /// Marker that succeeds only once every trigger has.
    Completion,
}

/// A node of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Logical id in the template.
    pub logical_id: String,
    /// Payload.
    pub kind: ResourceKind,
    /// Explicit ordering edges.
    pub depends_on: Vec<ResourceId>,
}

/// Arena of resources with index-based dependency edges.
#[derive(Debug, Default, Clone)]
pub struct ResourceGraph {
    /// Resources in creation order.
    resources: Vec<Resource>,
    /// Logical id lookup.
    by_logical_id: HashMap<String, ResourceId>,
}

impl ResourceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a resource and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the logical id is already taken or an edge does
    /// not point at an existing resource.
    pub fn add(&mut self, resource: Resource) -> Result<ResourceId> {
        let id = ResourceId(self.resources.len());

        if self.by_logical_id.contains_key(&resource.logical_id) {
            return Err(TemplateError::DuplicateLogicalId {
                logical_id: resource.logical_id,
            }
            .into());
        }

        if let Some(bad) = resource.depends_on.iter().find(|dep| dep.0 >= id.0) {
            return Err(TemplateError::DanglingReference {
                resource: resource.logical_id,
                index: bad.0,
            }
            .into());
        }

        self.by_logical_id.insert(resource.logical_id.clone(), id);
        self.resources.push(resource);
        Ok(id)
    }

    /// Returns the resource with the given id.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.0)
    }

    /// Looks up a resource by logical id.
    #[must_use]
    pub fn find(&self, logical_id: &str) -> Option<ResourceId> {
        self.by_logical_id.get(logical_id).copied()
    }

    /// Returns the logical id of a resource, or an empty string if unknown.
    #[must_use]
    pub fn logical_id(&self, id: ResourceId) -> &str {
        self.get(id).map_or("", |r| r.logical_id.as_str())
    }

    /// Iterates over all resources in creation order.
    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources
            .iter()
            .enumerate()
            .map(|(i, r)| (ResourceId(i), r))
    }

    /// Iterates over parameter resources.
    pub fn parameters(&self) -> impl Iterator<Item = (ResourceId, &ParameterResource)> {
        self.resources().filter_map(|(id, r)| match &r.kind {
            ResourceKind::Parameter(p) => Some((id, p)),
            _ => None,
        })
    }

    /// Iterates over trigger resources.
    pub fn triggers(&self) -> impl Iterator<Item = (ResourceId, &TriggerResource)> {
        self.resources().filter_map(|(id, r)| match &r.kind {
            ResourceKind::Trigger(t) => Some((id, t)),
            _ => None,
        })
    }

    /// Returns the completion marker, if the graph has one.
    #[must_use]
    pub fn completion(&self) -> Option<ResourceId> {
        self.resources()
            .find(|(_, r)| matches!(r.kind, ResourceKind::Completion))
            .map(|(id, _)| id)
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the graph has no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Checks the ordering guarantees of the graph.
    ///
    /// - every edge points at an earlier resource
    /// - every trigger depends on exactly its member parameters and has a handler
    /// - the completion marker depends on every trigger
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        for (id, resource) in self.resources() {
            if let Some(bad) = resource.depends_on.iter().find(|dep| dep.0 >= id.0) {
                return Err(TemplateError::DanglingReference {
                    resource: resource.logical_id.clone(),
                    index: bad.0,
                }
                .into());
            }

            if let ResourceKind::Trigger(trigger) = &resource.kind {
                self.validate_trigger(id, resource, trigger)?;
            }
        }

        if let Some(completion) = self.completion() {
            let resource = &self.resources[completion.0];
            let deps: BTreeSet<ResourceId> = resource.depends_on.iter().copied().collect();
            for (trigger_id, _) in self.triggers() {
                if !deps.contains(&trigger_id) {
                    return Err(TemplateError::MissingDependency {
                        resource: resource.logical_id.clone(),
                        dependency: self.logical_id(trigger_id).to_string(),
                    }
                    .into());
                }
            }
        } else if let Some((trigger_id, _)) = self.triggers().next() {
            return Err(TemplateError::MissingDependency {
                resource: String::from("<completion>"),
                dependency: self.logical_id(trigger_id).to_string(),
            }
            .into());
        }

        Ok(())
    }

    fn validate_trigger(
        &self,
        id: ResourceId,
        resource: &Resource,
        trigger: &TriggerResource,
    ) -> Result<()> {
        let handler_ok = trigger.handler.0 < id.0
            && matches!(
                self.get(trigger.handler).map(|r| &r.kind),
                Some(ResourceKind::Handler(_))
            );
        if !handler_ok {
            return Err(TemplateError::DanglingReference {
                resource: resource.logical_id.clone(),
                index: trigger.handler.0,
            }
            .into());
        }

        let deps: BTreeSet<ResourceId> = resource.depends_on.iter().copied().collect();
        let members: BTreeSet<ResourceId> = trigger.members.iter().copied().collect();

        if let Some(missing) = members.difference(&deps).next() {
            return Err(TemplateError::MissingDependency {
                resource: resource.logical_id.clone(),
                dependency: self.logical_id(*missing).to_string(),
            }
            .into());
        }

        for member in &members {
            if !matches!(
                self.get(*member).map(|r| &r.kind),
                Some(ResourceKind::Parameter(_))
            ) {
                return Err(TemplateError::DanglingReference {
                    resource: resource.logical_id.clone(),
                    index: member.0,
                }
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::LambdaInvalidation;

    fn parameter(graph: &mut ResourceGraph, name: &str) -> ResourceId {
        graph
            .add(Resource {
                logical_id: format!("SSMParam{name}"),
                kind: ResourceKind::Parameter(ParameterResource {
                    path: ParameterPath::from_segments(&[name]),
                    value: String::from("v"),
                    kind: ValueKind::Text,
                }),
                depends_on: vec![],
            })
            .unwrap()
    }

    fn handler(graph: &mut ResourceGraph) -> ResourceId {
        graph
            .add(Resource {
                logical_id: String::from("InvalidateTFunction"),
                kind: ResourceKind::Handler(HandlerResource {
                    target: InvalidationKey::from("t"),
                    kind: HandlerKind::ReplaceLambdaContext,
                    role: NameOrImportRef::Name(String::from("role")),
                    timeout_secs: 20,
                    restart_timeout_secs: None,
                }),
                depends_on: vec![],
            })
            .unwrap()
    }

    fn trigger(handler: ResourceId, members: Vec<ResourceId>, depends_on: Vec<ResourceId>) -> Resource {
        Resource {
            logical_id: String::from("InvalidateTReplacer"),
            kind: ResourceKind::Trigger(TriggerResource {
                target: InvalidationKey::from("t"),
                descriptor: Descriptor::Lambda(LambdaInvalidation {
                    function: NameOrImportRef::Name(String::from("f")),
                    role: NameOrImportRef::Name(String::from("role")),
                }),
                fingerprint: String::from("00"),
                handler,
                members,
            }),
            depends_on,
        }
    }

    #[test]
    fn test_forward_edges_rejected() {
        let mut graph = ResourceGraph::new();
        let err = graph
            .add(Resource {
                logical_id: String::from("Early"),
                kind: ResourceKind::Completion,
                depends_on: vec![ResourceId(0)],
            })
            .unwrap_err();
        assert_eq!(err.kind(), "TemplateError");
    }

    #[test]
    fn test_duplicate_logical_id_rejected() {
        let mut graph = ResourceGraph::new();
        parameter(&mut graph, "A");
        let err = graph
            .add(Resource {
                logical_id: String::from("SSMParamA"),
                kind: ResourceKind::Completion,
                depends_on: vec![],
            })
            .unwrap_err();
        assert!(err.to_string().contains("SSMParamA"));
    }

    #[test]
    fn test_valid_graph() {
        let mut graph = ResourceGraph::new();
        let a = parameter(&mut graph, "A");
        let b = parameter(&mut graph, "B");
        let h = handler(&mut graph);
        let t = graph.add(trigger(h, vec![a, b], vec![a, b])).unwrap();
        graph
            .add(Resource {
                logical_id: String::from("InvalidationsComplete"),
                kind: ResourceKind::Completion,
                depends_on: vec![t],
            })
            .unwrap();

        assert!(graph.validate().is_ok());
        assert_eq!(graph.parameters().count(), 2);
        assert_eq!(graph.triggers().count(), 1);
        assert_eq!(graph.find("InvalidateTReplacer"), Some(t));
    }

    #[test]
    fn test_trigger_missing_member_edge() {
        let mut graph = ResourceGraph::new();
        let a = parameter(&mut graph, "A");
        let b = parameter(&mut graph, "B");
        let h = handler(&mut graph);
        let t = graph.add(trigger(h, vec![a, b], vec![a])).unwrap();
        graph
            .add(Resource {
                logical_id: String::from("InvalidationsComplete"),
                kind: ResourceKind::Completion,
                depends_on: vec![t],
            })
            .unwrap();

        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("SSMParamB"));
    }

    #[test]
    fn test_completion_must_cover_triggers() {
        let mut graph = ResourceGraph::new();
        let h = handler(&mut graph);
        graph.add(trigger(h, vec![], vec![])).unwrap();

        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("InvalidateTReplacer"));
    }
}
