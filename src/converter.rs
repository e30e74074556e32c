//! End-to-end conversion pipeline.
//!
//! A [`Converter`] runs one document through every stage: flatten, register
//! and accumulate invalidations, finalize groups, build the resource graph,
//! and render the template. Any error aborts the whole run; nothing is
//! returned partially.

use chrono::Utc;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::document::{ConfigDocument, DocumentLoader, FlatEntry, Flattener};
use crate::error::Result;
use crate::invalidation::{InvalidationGroup, InvalidationRegistry, InvalidationTarget};
use crate::settings::Settings;
use crate::template::{ResourceGraph, TemplateBuilder, TemplateRenderer};

/// Everything produced by one conversion run.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Flattened parameters, in traversal order.
    pub entries: Vec<FlatEntry>,
    /// Invalidation groups, ordered by target id.
    pub groups: Vec<InvalidationGroup>,
    /// Resource graph behind the template.
    pub graph: ResourceGraph,
    /// Rendered template text.
    pub template: String,
    /// Non-fatal anomalies found along the way.
    pub warnings: Vec<String>,
}

/// Runs documents through the conversion pipeline.
#[derive(Debug, Clone)]
pub struct Converter {
    /// Settings for every run.
    settings: Settings,
    /// Tree flattener.
    flattener: Flattener,
}

impl Converter {
    /// Creates a converter with the given settings.
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self {
            settings,
            flattener: Flattener::new(),
        }
    }

    /// Returns the settings in use.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Parses YAML text and converts it.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage.
    pub fn convert_str(
        &self,
        content: &str,
        source: Option<&Path>,
        extra_targets: Vec<InvalidationTarget>,
    ) -> Result<Conversion> {
        let document = DocumentLoader::new().parse_yaml(content, source)?;
        self.convert(document, extra_targets)
    }

    /// Converts a loaded document.
    ///
    /// `extra_targets` are declared in addition to the document's own and
    /// apply to every parameter.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage.
    pub fn convert(
        &self,
        document: ConfigDocument,
        extra_targets: Vec<InvalidationTarget>,
    ) -> Result<Conversion> {
        self.settings.validate()?;

        let mut warnings = Vec::new();
        if document.is_empty() {
            warn!("Document declares no parameters");
            warnings.push(String::from("document declares no parameters"));
        }

        let ConfigDocument { tree, targets } = document;
        let extra_ids: Vec<_> = extra_targets.iter().map(|t| t.id.clone()).collect();
        let tree = tree.with_tags(extra_ids);

        let mut registry = InvalidationRegistry::new();
        registry.register(targets)?;
        registry.register(extra_targets)?;
        debug!("Registered {} invalidation targets", registry.target_count());
        registry.check_tags(&tree)?;

        let entries = self.flattener.flatten(&tree)?;
        for entry in &entries {
            registry.accumulate(entry)?;
        }

        let groups = registry.finalize();
        for group in groups.iter().filter(|g| g.is_empty()) {
            warnings.push(format!(
                "invalidation target '{}' is invalidated by nothing",
                group.target.id
            ));
        }

        let graph = TemplateBuilder::new()
            .with_ecs_restart_timeout(self.settings.ecs_restart_timeout_secs)
            .build(&entries, &groups)?;

        let mut renderer =
            TemplateRenderer::new(self.settings.format).with_description(&self.settings.description);
        if self.settings.include_timestamp {
            renderer = renderer.with_timestamp(Utc::now());
        }
        let template = renderer.render(&graph)?;

        info!(
            "Converted {} parameters and {} invalidation groups",
            entries.len(),
            groups.len()
        );

        Ok(Conversion {
            entries,
            groups,
            graph,
            template,
            warnings,
        })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::{Descriptor, LambdaInvalidation, NameOrImportRef};

    fn lambda_target(id: &str) -> InvalidationTarget {
        InvalidationTarget::new(
            id,
            Descriptor::Lambda(LambdaInvalidation {
                function: NameOrImportRef::Name(String::from("worker")),
                role: NameOrImportRef::Name(String::from("arn:aws:iam::1:role/r")),
            }),
        )
    }

    #[test]
    fn test_extra_targets_cover_every_parameter() {
        let conversion = Converter::default()
            .convert_str("a:\n  b: 1\n  c: two\n", None, vec![lambda_target("cli-lambda-1")])
            .unwrap();

        assert_eq!(conversion.groups.len(), 1);
        assert_eq!(conversion.groups[0].members.len(), 2);
        assert!(conversion.warnings.is_empty());
    }

    #[test]
    fn test_extra_target_clashing_with_document_target() {
        let document = "\
.paramstack-config:
  invalidations:
    t: !lambda-invalidation
      function_name: f
      role_name: r
a: 1
";
        let err = Converter::default()
            .convert_str(document, None, vec![lambda_target("t")])
            .unwrap_err();
        assert_eq!(err.kind(), "DuplicateTargetError");
    }

    #[test]
    fn test_empty_group_reported_as_warning() {
        let document = "\
.paramstack-config:
  invalidations:
    idle: !lambda-invalidation
      function_name: f
      role_name: r
a: 1
";
        let conversion = Converter::default().convert_str(document, None, vec![]).unwrap();
        assert_eq!(conversion.warnings.len(), 1);
        assert!(conversion.warnings[0].contains("idle"));
        assert!(conversion.template.contains("InvalidationsComplete"));
    }

    #[test]
    fn test_unknown_tag_on_empty_subtree_aborts() {
        let document = "\
acme:
  ? !item {key: svc, invalidates: [ghost]}
  : {}
  other: 1
";
        let err = Converter::default()
            .convert_str(document, None, vec![])
            .unwrap_err();
        assert_eq!(err.kind(), "UnknownTargetError");
        assert!(err.to_string().contains("ghost"));
        assert!(err.to_string().contains("acme/svc"));
    }

    #[test]
    fn test_invalid_settings_abort() {
        let settings = Settings {
            ecs_restart_timeout_secs: 0,
            ..Settings::default()
        };
        let err = Converter::new(settings)
            .convert_str("a: 1\n", None, vec![])
            .unwrap_err();
        assert_eq!(err.kind(), "SettingsError");
    }
}
