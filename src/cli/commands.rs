//! CLI argument definitions.
//!
//! This module defines the command line using clap and turns invalidation
//! directives into targets.

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::error::{InvalidationError, Result};
use crate::invalidation::{Descriptor, ECS_TAG, InvalidationTarget, LAMBDA_TAG};
use crate::settings::Settings;
use crate::template::TemplateFormat;

/// Path standing for stdin or stdout.
pub const STDIO_PATH: &str = "-";

/// Paramstack - Flatten a configuration document into a parameter stack template.
#[derive(Parser, Debug)]
#[command(name = "paramstack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input YAML document (`-` for stdin).
    #[arg(default_value = STDIO_PATH)]
    pub input: PathBuf,

    /// Output template (`-` for stdout).
    #[arg(default_value = STDIO_PATH)]
    pub output: PathBuf,

    /// Restart an ECS service whenever any parameter changes
    /// (e.g. `cluster_name=acme,service_import=svc-arn,role_name=arn:...`).
    #[arg(long, value_name = "FIELDS")]
    pub invalidate_ecs: Vec<String>,

    /// Refresh a Lambda function whenever any parameter changes
    /// (e.g. `function_name=worker,role_import=restart-role`).
    #[arg(long, value_name = "FIELDS")]
    pub invalidate_lambda: Vec<String>,

    /// Template description.
    #[arg(long)]
    pub description: Option<String>,

    /// Template format (yaml, json).
    #[arg(long, value_parser = parse_format)]
    pub format: Option<TemplateFormat>,

    /// Seconds an ECS service may take to become stable after a restart.
    #[arg(long, value_name = "SECONDS")]
    pub ecs_restart_timeout: Option<u32>,

    /// Record the generation time in the template metadata.
    #[arg(long)]
    pub timestamp: bool,

    /// Print a summary of parameters and invalidation groups to stderr.
    #[arg(long)]
    pub summary: bool,

    /// Summary format (text, json).
    #[arg(long, default_value = "text")]
    pub summary_format: OutputFormat,

    /// Run every check but write no template.
    #[arg(long)]
    pub check: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

/// Summary format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the input path, or `None` for stdin.
    #[must_use]
    pub fn input_path(&self) -> Option<&Path> {
        stdio_or_path(&self.input)
    }

    /// Returns the output path, or `None` for stdout.
    #[must_use]
    pub fn output_path(&self) -> Option<&Path> {
        stdio_or_path(&self.output)
    }

    /// Applies flag overrides on top of `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(description) = &self.description {
            settings.description.clone_from(description);
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        if let Some(timeout) = self.ecs_restart_timeout {
            settings.ecs_restart_timeout_secs = timeout;
        }
        if self.timestamp {
            settings.include_timestamp = true;
        }
    }

    /// Builds the targets given by `--invalidate-*` flags.
    ///
    /// ECS targets are named `cli-ecs-1`, `cli-ecs-2`, ... and Lambda targets
    /// `cli-lambda-1`, ... in flag order.
    ///
    /// # Errors
    ///
    /// Returns a descriptor error for a malformed directive.
    pub fn invalidation_targets(&self) -> Result<Vec<InvalidationTarget>> {
        let ecs = self
            .invalidate_ecs
            .iter()
            .enumerate()
            .map(|(i, d)| directive_target(&format!("cli-ecs-{}", i + 1), ECS_TAG, d));
        let lambda = self
            .invalidate_lambda
            .iter()
            .enumerate()
            .map(|(i, d)| directive_target(&format!("cli-lambda-{}", i + 1), LAMBDA_TAG, d));

        ecs.chain(lambda).collect()
    }
}

fn stdio_or_path(path: &Path) -> Option<&Path> {
    if path.as_os_str() == STDIO_PATH {
        None
    } else {
        Some(path)
    }
}

fn parse_format(s: &str) -> std::result::Result<TemplateFormat, String> {
    s.parse()
}

fn directive_target(id: &str, tag: &str, directive: &str) -> Result<InvalidationTarget> {
    let descriptor = parse_directive(id, tag, directive)?;
    Ok(InvalidationTarget::new(id, descriptor))
}

/// Parses a `key=value,key=value` directive into a descriptor of the given kind.
///
/// Keys are the same as in document descriptors (`cluster_name`,
/// `service_import`, ...).
///
/// # Errors
///
/// Returns a descriptor error for pairs without `=`, repeated keys, or
/// field combinations the descriptor rejects.
pub fn parse_directive(target: &str, tag: &str, directive: &str) -> Result<Descriptor> {
    let mut fields = serde_json::Map::new();

    for pair in directive.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(InvalidationError::descriptor(
                target,
                format!("expected key=value, got '{pair}'"),
            )
            .into());
        };

        let key = key.trim();
        if fields.contains_key(key) {
            return Err(
                InvalidationError::descriptor(target, format!("'{key}' is given twice")).into(),
            );
        }
        fields.insert(
            key.to_string(),
            serde_json::Value::String(value.trim().to_string()),
        );
    }

    Descriptor::from_tagged(target, tag, serde_json::Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::NameOrImportRef;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("paramstack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_use_stdio() {
        let cli = cli(&[]);
        assert!(cli.input_path().is_none());
        assert!(cli.output_path().is_none());
        assert!(!cli.check);
        assert_eq!(cli.summary_format, OutputFormat::Text);
    }

    #[test]
    fn test_paths() {
        let cli = cli(&["in.yaml", "out.yaml"]);
        assert_eq!(cli.input_path(), Some(Path::new("in.yaml")));
        assert_eq!(cli.output_path(), Some(Path::new("out.yaml")));
    }

    #[test]
    fn test_directive_targets_numbered_in_order() {
        let cli = cli(&[
            "--invalidate-ecs",
            "cluster_name=c,service_name=s,role_name=r",
            "--invalidate-lambda",
            "function_import=fn-export,role_name=r",
            "--invalidate-ecs",
            "cluster_import=c,service_name=s2,role_import=r",
        ]);
        let targets = cli.invalidation_targets().unwrap();
        let ids: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["cli-ecs-1", "cli-ecs-2", "cli-lambda-1"]);

        let Descriptor::Lambda(lambda) = &targets[2].descriptor else {
            panic!("expected a Lambda descriptor");
        };
        assert_eq!(lambda.function, NameOrImportRef::Import(String::from("fn-export")));
    }

    #[test]
    fn test_directive_errors() {
        let err = parse_directive("t", LAMBDA_TAG, "function_name").unwrap_err();
        assert_eq!(err.kind(), "DescriptorError");

        let err = parse_directive("t", LAMBDA_TAG, "function_name=a,function_name=b").unwrap_err();
        assert!(err.to_string().contains("twice"));

        let err = parse_directive("t", LAMBDA_TAG, "function_name=a,function_import=b,role_name=r")
            .unwrap_err();
        assert_eq!(err.kind(), "DescriptorError");

        let err = parse_directive("t", ECS_TAG, "cluster_name=a,role_name=r").unwrap_err();
        assert!(err.to_string().contains("service"));
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = cli(&[
            "--description",
            "Shipping",
            "--format",
            "json",
            "--ecs-restart-timeout",
            "300",
            "--timestamp",
        ]);
        let mut settings = Settings::default();
        cli.apply_to(&mut settings);

        assert_eq!(settings.description, "Shipping");
        assert_eq!(settings.format, TemplateFormat::Json);
        assert_eq!(settings.ecs_restart_timeout_secs, 300);
        assert!(settings.include_timestamp);
    }
}
