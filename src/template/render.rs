//! Rendering of a [`ResourceGraph`] as a CloudFormation template.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Result, TemplateError};
use crate::invalidation::{Descriptor, NameOrImportRef};

use super::graph::{HandlerKind, HandlerResource, Resource, ResourceGraph, ResourceKind, TriggerResource};
use super::handlers::{HANDLER_ENTRY, HANDLER_RUNTIME, RESTART_TIMEOUT_ENV};

/// Template format version written to every template.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Default template description.
pub const DEFAULT_DESCRIPTION: &str = "Application configuration parameters";

/// Resource type of the completion marker.
const COMPLETION_TYPE: &str = "AWS::CloudFormation::WaitConditionHandle";

/// Serialisation format of the rendered template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateFormat {
    /// YAML document.
    #[default]
    Yaml,
    /// Pretty-printed JSON document.
    Json,
}

impl FromStr for TemplateFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown template format '{other}' (expected yaml or json)")),
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Serialize)]
struct CfnTemplate<'a> {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: &'static str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Metadata")]
    metadata: Value,
    #[serde(rename = "Resources")]
    resources: IndexMap<&'a str, CfnResource>,
}

#[derive(Serialize)]
struct CfnResource {
    #[serde(rename = "Type")]
    resource_type: &'static str,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    #[serde(rename = "Properties", skip_serializing_if = "Option::is_none")]
    properties: Option<Value>,
}

/// Renders resource graphs as template text.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    /// Output format.
    format: TemplateFormat,
    /// Template description.
    description: String,
    /// Generation time written into the metadata, if any.
    generated_at: Option<DateTime<Utc>>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(TemplateFormat::default())
    }
}

impl TemplateRenderer {
    /// Creates a renderer for the given format with the default description.
    #[must_use]
    pub fn new(format: TemplateFormat) -> Self {
        Self {
            format,
            description: DEFAULT_DESCRIPTION.to_string(),
            generated_at: None,
        }
    }

    /// Sets the template description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Records a generation timestamp in the template metadata.
    #[must_use]
    pub const fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Returns the template as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be represented as JSON.
    pub fn to_value(&self, graph: &ResourceGraph) -> Result<Value> {
        serde_json::to_value(self.template(graph))
            .map_err(|e| TemplateError::serialization(e.to_string()).into())
    }

    /// Renders the template text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn render(&self, graph: &ResourceGraph) -> Result<String> {
        let template = self.template(graph);
        let text = match self.format {
            TemplateFormat::Yaml => serde_yaml::to_string(&template)
                .map_err(|e| TemplateError::serialization(e.to_string()))?,
            TemplateFormat::Json => {
                let mut text = serde_json::to_string_pretty(&template)
                    .map_err(|e| TemplateError::serialization(e.to_string()))?;
                text.push('\n');
                text
            }
        };

        debug!("Rendered {} bytes of {} template", text.len(), self.format);
        Ok(text)
    }

    fn template<'a>(&'a self, graph: &'a ResourceGraph) -> CfnTemplate<'a> {
        let mut metadata = json!({ "version": env!("CARGO_PKG_VERSION") });
        if let Some(at) = self.generated_at {
            metadata["generated_timestamp"] =
                Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        let resources = graph
            .resources()
            .map(|(_, resource)| (resource.logical_id.as_str(), render_resource(graph, resource)))
            .collect();

        CfnTemplate {
            format_version: TEMPLATE_FORMAT_VERSION,
            description: &self.description,
            metadata: json!({ "paramstack": metadata }),
            resources,
        }
    }
}

fn render_resource(graph: &ResourceGraph, resource: &Resource) -> CfnResource {
    let mut depends_on: Vec<String> = resource
        .depends_on
        .iter()
        .map(|id| graph.logical_id(*id).to_string())
        .collect();
    depends_on.sort();

    let (resource_type, properties) = match &resource.kind {
        ResourceKind::Parameter(p) => (
            "AWS::SSM::Parameter",
            Some(json!({
                "Name": p.path.parameter_name(),
                "Type": p.kind.parameter_type(),
                "Value": p.value,
            })),
        ),
        ResourceKind::Handler(h) => ("AWS::Lambda::Function", Some(handler_properties(h))),
        ResourceKind::Trigger(t) => (
            HandlerKind::for_descriptor(&t.descriptor).trigger_type(),
            Some(trigger_properties(graph, t)),
        ),
        ResourceKind::Completion => (COMPLETION_TYPE, None),
    };

    CfnResource {
        resource_type,
        depends_on,
        properties,
    }
}

fn handler_properties(handler: &HandlerResource) -> Value {
    let mut properties = json!({
        "Description": format!("{} ({})", handler.kind.description(), handler.target),
        "Handler": HANDLER_ENTRY,
        "Runtime": HANDLER_RUNTIME,
        "Role": reference(&handler.role),
        "Timeout": handler.timeout_secs,
        "Code": { "ZipFile": handler.kind.source() },
    });

    if let Some(secs) = handler.restart_timeout_secs {
        properties["Environment"] = json!({
            "Variables": { RESTART_TIMEOUT_ENV: secs.to_string() }
        });
    }

    properties
}

fn trigger_properties(graph: &ResourceGraph, trigger: &TriggerResource) -> Value {
    let mut properties = json!({
        "ServiceToken": { "Fn::GetAtt": [graph.logical_id(trigger.handler), "Arn"] },
        "Fingerprint": trigger.fingerprint,
        "ParameterCount": trigger.members.len(),
    });

    match &trigger.descriptor {
        Descriptor::Ecs(ecs) => {
            properties["ClusterArn"] = reference(&ecs.cluster);
            properties["ServiceArn"] = reference(&ecs.service);
        }
        Descriptor::Lambda(lambda) => {
            properties["FunctionName"] = reference(&lambda.function);
        }
    }

    properties
}

/// Renders a literal as a string and an import as `Fn::ImportValue`.
fn reference(value: &NameOrImportRef) -> Value {
    match value {
        NameOrImportRef::Name(name) => Value::String(name.clone()),
        NameOrImportRef::Import(export) => json!({ "Fn::ImportValue": export }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FlatEntry, ParameterPath, ValueKind};
    use crate::invalidation::{InvalidationRegistry, InvalidationTarget, LambdaInvalidation};
    use crate::template::TemplateBuilder;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn sample_graph() -> ResourceGraph {
        let entries = vec![
            FlatEntry {
                path: ParameterPath::from_segments(&["acme", "users"]),
                value: String::from("coyote,roadrunner"),
                kind: ValueKind::List,
                tags: BTreeSet::from(["refresh".into()]),
            },
            FlatEntry {
                path: ParameterPath::from_segments(&["acme", "greeting"]),
                value: String::from("hello world"),
                kind: ValueKind::Text,
                tags: BTreeSet::new(),
            },
        ];

        let mut registry = InvalidationRegistry::new();
        registry
            .register([InvalidationTarget::new(
                "refresh",
                Descriptor::Lambda(LambdaInvalidation {
                    function: NameOrImportRef::Import(String::from("fn-export")),
                    role: NameOrImportRef::Name(String::from("arn:aws:iam::1:role/r")),
                }),
            )])
            .unwrap();
        for entry in &entries {
            registry.accumulate(entry).unwrap();
        }

        TemplateBuilder::new()
            .build(&entries, &registry.finalize())
            .unwrap()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("YAML".parse::<TemplateFormat>().unwrap(), TemplateFormat::Yaml);
        assert_eq!("json".parse::<TemplateFormat>().unwrap(), TemplateFormat::Json);
        assert!("toml".parse::<TemplateFormat>().is_err());
    }

    #[test]
    fn test_template_shape() {
        let value = TemplateRenderer::default().to_value(&sample_graph()).unwrap();

        assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(value["Description"], DEFAULT_DESCRIPTION);
        assert!(value["Metadata"]["paramstack"]["generated_timestamp"].is_null());

        let users = &value["Resources"]["SSMParamAcmeUsers"];
        assert_eq!(users["Type"], "AWS::SSM::Parameter");
        assert_eq!(users["Properties"]["Name"], "/acme/users");
        assert_eq!(users["Properties"]["Type"], "StringList");
        assert_eq!(users["Properties"]["Value"], "coyote,roadrunner");

        let trigger = &value["Resources"]["InvalidateRefreshReplacer"];
        assert_eq!(trigger["Type"], "Custom::ReplaceLambdaContext");
        assert_eq!(trigger["DependsOn"], json!(["SSMParamAcmeUsers"]));
        assert_eq!(trigger["Properties"]["FunctionName"], json!({ "Fn::ImportValue": "fn-export" }));
        assert_eq!(
            trigger["Properties"]["ServiceToken"],
            json!({ "Fn::GetAtt": ["InvalidateRefreshFunction", "Arn"] })
        );
        assert_eq!(trigger["Properties"]["ParameterCount"], 1);

        let handler = &value["Resources"]["InvalidateRefreshFunction"];
        assert_eq!(handler["Properties"]["Timeout"], 20);
        assert_eq!(handler["Properties"]["Role"], "arn:aws:iam::1:role/r");

        let complete = &value["Resources"]["InvalidationsComplete"];
        assert_eq!(complete["Type"], COMPLETION_TYPE);
        assert_eq!(complete["DependsOn"], json!(["InvalidateRefreshReplacer"]));
        assert!(complete.get("Properties").is_none());
    }

    #[test]
    fn test_timestamp_only_when_requested() {
        let at = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let value = TemplateRenderer::default()
            .with_timestamp(at)
            .to_value(&sample_graph())
            .unwrap();
        assert_eq!(
            value["Metadata"]["paramstack"]["generated_timestamp"],
            "2024-01-02T03:04:05Z"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = TemplateRenderer::default().with_description("demo");
        let first = renderer.render(&sample_graph()).unwrap();
        let second = renderer.render(&sample_graph()).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("Description: demo"));
    }

    #[test]
    fn test_json_round_trips_through_parser() {
        let text = TemplateRenderer::new(TemplateFormat::Json)
            .render(&sample_graph())
            .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["Resources"]["SSMParamAcmeGreeting"]["Properties"]["Value"], "hello world");
    }
}
