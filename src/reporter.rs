use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::{
    resource_instance::ResourceInstance,
    schema_version::SchemaVersion,
    transformation_engine::{TransformFailure, TransformationResult},
    transformation_rule::ChangeType,
};

/// Reporter for describing what a transformation did, in various formats
pub struct TransformationReporter {
    output_format: ReportFormat,
}

/// Available output formats for transformation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Console,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Transformed,
    Rejected,
}

/// Summary of one transformation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationReport {
    pub subsystem: String,
    pub target_version: SchemaVersion,
    pub outcome: Outcome,
    pub discarded_attributes: Vec<String>,
    pub discarded_resources: Vec<String>,
    pub failures: Vec<String>,
    pub summary: TransformationSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationSummary {
    pub resources_in: usize,
    pub resources_out: usize,
    pub attributes_discarded: usize,
    pub resources_discarded: usize,
}

impl TransformationReporter {
    pub fn new() -> Self {
        Self {
            output_format: ReportFormat::Console,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Report for a successful transformation of `input`
    pub fn generate_report(&self, input: &ResourceInstance, result: &TransformationResult) -> TransformationReport {
        let mut discarded_attributes = Vec::new();
        let mut discarded_resources = Vec::new();

        for applied in &result.applied_transformations {
            match (applied.change_type, &applied.attribute) {
                (ChangeType::AttributeDiscarded, Some(attribute)) => {
                    discarded_attributes.push(format!("{}@{}", applied.path, attribute))
                }
                (ChangeType::AttributeDiscarded, None) => discarded_attributes.push(applied.path.to_string()),
                (ChangeType::ResourceDiscarded, _) => discarded_resources.push(applied.path.to_string()),
            }
        }

        let summary = TransformationSummary {
            resources_in: input.size(),
            resources_out: result.transformed.size(),
            attributes_discarded: discarded_attributes.len(),
            resources_discarded: discarded_resources.len(),
        };

        TransformationReport {
            subsystem: result.subsystem.clone(),
            target_version: result.target_version,
            outcome: Outcome::Transformed,
            discarded_attributes,
            discarded_resources,
            failures: Vec::new(),
            summary,
        }
    }

    /// Report for a rejected transformation; `failures` is non-empty.
    pub fn generate_failure_report(
        &self,
        subsystem: &str,
        target_version: SchemaVersion,
        input: &ResourceInstance,
        failures: &[TransformFailure],
    ) -> TransformationReport {
        TransformationReport {
            subsystem: subsystem.to_string(),
            target_version,
            outcome: Outcome::Rejected,
            discarded_attributes: Vec::new(),
            discarded_resources: Vec::new(),
            failures: failures.iter().map(ToString::to_string).collect(),
            summary: TransformationSummary {
                resources_in: input.size(),
                resources_out: 0,
                attributes_discarded: 0,
                resources_discarded: 0,
            },
        }
    }

    /// Format the report according to the configured output format
    pub fn format_report(&self, report: &TransformationReport) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => self.format_console_report(report),
            ReportFormat::Json => serde_json::to_string_pretty(report)
                .map_err(|e| ReportError::SerializationError(e.to_string())),
            ReportFormat::Yaml => serde_yaml::to_string(report)
                .map_err(|e| ReportError::SerializationError(e.to_string())),
        }
    }

    fn format_console_report(&self, report: &TransformationReport) -> Result<String, ReportError> {
        let mut output = String::new();
        write_console(&mut output, report).map_err(|e| ReportError::FormatError(e.to_string()))?;
        Ok(output)
    }
}

fn write_console(output: &mut String, report: &TransformationReport) -> std::fmt::Result {
    writeln!(output, "=== Transformation Report ===\n")?;
    writeln!(output, "Subsystem: {}", report.subsystem)?;
    writeln!(output, "Target Version: {}", report.target_version)?;
    writeln!(
        output,
        "Outcome: {}\n",
        match report.outcome {
            Outcome::Transformed => "TRANSFORMED",
            Outcome::Rejected => "REJECTED",
        }
    )?;
    writeln!(
        output,
        "Resources: {} in, {} out",
        report.summary.resources_in, report.summary.resources_out
    )?;

    if !report.discarded_attributes.is_empty() {
        writeln!(output, "\nDiscarded attributes:")?;
        for attribute in &report.discarded_attributes {
            writeln!(output, "  - {}", attribute)?;
        }
    }
    if !report.discarded_resources.is_empty() {
        writeln!(output, "\nDiscarded resources:")?;
        for resource in &report.discarded_resources {
            writeln!(output, "  - {}", resource)?;
        }
    }
    if !report.failures.is_empty() {
        writeln!(output, "\nRejected:")?;
        for failure in &report.failures {
            writeln!(output, "  ✗ {}", failure)?;
        }
    }
    Ok(())
}

impl Default for TransformationReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Format error: {0}")]
    FormatError(String),
}
