//! Summary formatting for the CLI.
//!
//! The summary goes to stderr, so stdout can carry the template.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::converter::Conversion;
use crate::document::ValueKind;
use crate::invalidation::{Fingerprinter, InvalidationGroup};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Group row for table display.
#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a conversion summary for display.
    #[must_use]
    pub fn format_summary(&self, conversion: &Conversion) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&SummaryJson::from(conversion)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_summary_text(conversion),
        }
    }

    fn format_summary_text(conversion: &Conversion) -> String {
        let mut output = String::new();

        let lists = conversion
            .entries
            .iter()
            .filter(|e| e.kind == ValueKind::List)
            .count();
        let _ = writeln!(
            output,
            "\nParameters: {} ({} lists)",
            conversion.entries.len().to_string().green(),
            lists
        );
        let _ = writeln!(output, "Resources: {}", conversion.graph.len());

        if conversion.groups.is_empty() {
            output.push_str("No invalidation targets.\n");
        } else {
            let fingerprinter = Fingerprinter::new();
            let rows: Vec<GroupRow> = conversion
                .groups
                .iter()
                .map(|g| GroupRow {
                    target: g.target.id.to_string(),
                    kind: Self::format_kind(g),
                    members: g.members.len(),
                    fingerprint: fingerprinter.short(&g.fingerprint),
                })
                .collect();

            output.push('\n');
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        if !conversion.warnings.is_empty() {
            let _ = write!(output, "\n{} Warnings:\n", "!".yellow());
            for warning in &conversion.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        output
    }

    /// Formats a descriptor kind with color.
    fn format_kind(group: &InvalidationGroup) -> String {
        let label = group.target.descriptor.kind_label();
        if group.is_empty() {
            label.dimmed().to_string()
        } else {
            label.cyan().to_string()
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct SummaryJson {
    parameters: usize,
    resources: usize,
    groups: Vec<GroupJson>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct GroupJson {
    target: String,
    kind: &'static str,
    role: String,
    members: Vec<String>,
    fingerprint: String,
}

impl From<&Conversion> for SummaryJson {
    fn from(conversion: &Conversion) -> Self {
        Self {
            parameters: conversion.entries.len(),
            resources: conversion.graph.len(),
            groups: conversion
                .groups
                .iter()
                .map(|g| GroupJson {
                    target: g.target.id.to_string(),
                    kind: g.target.descriptor.kind_label(),
                    role: g.target.descriptor.role().to_string(),
                    members: g.member_paths().map(ToString::to_string).collect(),
                    fingerprint: g.fingerprint.clone(),
                })
                .collect(),
            warnings: conversion.warnings.clone(),
        }
    }
}
