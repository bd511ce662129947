//! Offline spreadsheet export straight from the data root.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use wadash_analytics::export::{build_report, ExportKind};
use wadash_analytics::{AnalysisRequest, DataRoot};

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// common-members, positive-users or negative-users
    #[arg(value_parser = parse_kind)]
    pub kind: ExportKind,
    /// Assembly to include; repeat for several
    #[arg(long = "assembly", required = true)]
    pub assemblies: Vec<String>,
    #[arg(long)]
    pub start_date: String,
    #[arg(long)]
    pub end_date: Option<String>,
    /// Only messages with this sentiment
    #[arg(long)]
    pub sentiment: Option<String>,
    /// Output path; defaults to the report's own file name
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Root of the export tree
    #[arg(long, env = "WADASH_DATA_ROOT", default_value = "./database")]
    pub data_root: PathBuf,
}

fn parse_kind(raw: &str) -> Result<ExportKind, String> {
    raw.parse().map_err(|e: wadash_analytics::AnalyticsError| e.to_string())
}

/// Builds the report and writes it, returning the path written.
///
/// # Errors
///
/// Returns an error for an invalid selection, an unreadable data root, or a
/// failed write.
pub(crate) fn run_export(args: &ExportArgs, today: NaiveDate) -> anyhow::Result<PathBuf> {
    let request = AnalysisRequest::new(
        args.assemblies.clone(),
        Some(&args.start_date),
        args.end_date.as_deref(),
        args.sentiment.as_deref(),
    )?;
    let root = DataRoot::new(args.data_root.clone());
    let (report, scan) = build_report(&root, &request, args.kind, today)?;
    for failure in &scan.failures {
        tracing::warn!(path = %failure.path, reason = %failure.reason, "skipped unreadable file");
    }

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| Path::new(&report.file_name).to_path_buf());
    let bytes = report.to_xlsx()?;
    std::fs::write(&out, bytes).with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(
        export = args.kind.as_str(),
        rows = report.rows.len(),
        files_scanned = scan.files_scanned,
        files_failed = scan.files_failed,
        "report written"
    );
    Ok(out)
}
