//! Output formatters for the pairscore CLI
//!
//! Supports a plain-text console summary and pretty-printed JSON.

use std::fmt::Write;

use serde::Serialize;

use crate::reduce::{
    ClusterReport, RetrievalReport, ScoreDistributionReport, SpectralReport, TriangleReport,
};

use super::commands::CliResult;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Console summary
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Format a score distribution report
///
/// Text output:
/// ```text
/// Pairs: 9900 (directional, 100 items)
/// Avg: 0.51
/// Std: 0.12
/// Median: 0.50
/// Max: 0.98
/// Min: 0.03
/// ```
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn format_distribution(
    report: &ScoreDistributionReport,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => {
            let mut out = String::new();
            writeln!(
                out,
                "Pairs: {} ({}, {} items)",
                report.pairs, report.mode, report.sample_size
            )
            .ok();
            out.push_str(&report.stats.summary());
            Ok(out)
        }
    }
}

/// Format a spectral report: one minimum eigenvalue per repetition, then
/// statistics over the minima
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn format_spectral(report: &SpectralReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => {
            let mut out = String::new();
            for (rep, min) in report.min_eigenvalues.iter().enumerate() {
                writeln!(out, "Repetition {}: minimum eigenvalue {min}", rep + 1).ok();
            }
            writeln!(
                out,
                "Negative minima: {} / {}",
                report.negative_repetitions(),
                report.repetitions()
            )
            .ok();
            out.push_str(&report.summary.summary());
            Ok(out)
        }
    }
}

/// Format a triangle inequality report
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn format_triangle(report: &TriangleReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => {
            let mut out = String::new();
            writeln!(
                out,
                "Violations: {} / {} triples ({:.2}%)",
                report.violated,
                report.triples,
                report.violation_rate() * 100.0
            )
            .ok();
            out.push_str(&report.stats.summary());
            Ok(out)
        }
    }
}

/// Format a retrieval report, one `R@K` line per K
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn format_retrieval(report: &RetrievalReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => {
            let mut out = String::new();
            writeln!(out, "Queries: {}", report.queries).ok();
            for (k, recall) in &report.recall {
                writeln!(out, "R@{k}: {recall:.4}").ok();
            }
            Ok(out)
        }
    }
}

/// Format a clustering report
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn format_cluster(report: &ClusterReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => {
            let mut out = String::new();
            writeln!(
                out,
                "Items: {} ({} labels, {} clusters)",
                report.items, report.label_classes, report.clusters
            )
            .ok();
            writeln!(out, "NMI: {:.4}", report.nmi).ok();
            writeln!(out, "Inertia: {:.4}", report.inertia).ok();
            Ok(out)
        }
    }
}

fn to_json<T: Serialize>(report: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
