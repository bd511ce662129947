use std::collections::BTreeMap;

use serde::Serialize;
use wadash_core::SentimentCounts;

use crate::layout::{checked_component, DataRoot, MESSAGES_DIR};
use crate::loader::PayloadPolicy;
use crate::request::AnalysisRequest;
use crate::resolver::resolve;
use crate::scan::{LoadedGroup, Scan, ScanReport};
use crate::AnalyticsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyBreakdown {
    pub assembly_name: String,
    pub total_files: usize,
    /// `Date: X` or `Date Range: X to Y`.
    pub date: String,
    pub json_count: usize,
    pub sentiment_counts: SentimentCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFiles {
    pub assembly_name: String,
    pub date: String,
    pub json_count: usize,
    pub json_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JsonOverview {
    pub total_json_files: usize,
    pub assembly_breakdown: Vec<AssemblyBreakdown>,
    pub detailed_results: Vec<DateFiles>,
    pub sentiment_breakdown: SentimentCounts,
}

/// File counts and sentiment totals per assembly and date. Every listed file
/// counts toward the totals, readable or not; unreadable ones only lose their
/// sentiment contribution. Dates whose `messages/` folder is empty still get a
/// zero entry in `detailed_results`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] for an unsafe assembly name.
pub fn json_overview(
    root: &DataRoot,
    request: &AnalysisRequest,
) -> Result<(JsonOverview, ScanReport), AnalyticsError> {
    let scan = Scan::new(
        root,
        &request.assemblies,
        &request.window,
        PayloadPolicy::ListOrObject,
    );
    let sources = scan.sources()?;

    let mut overview = JsonOverview::default();
    let label = request.window.label();
    let mut breakdown_index: BTreeMap<String, usize> = BTreeMap::new();
    let mut date_index: BTreeMap<(String, String), usize> = BTreeMap::new();

    for assembly in &request.assemblies {
        let assembly = checked_component(assembly, "assembly name")?;
        let assembly_dir = root.assembly_dir(assembly)?;
        if !assembly_dir.is_dir() || breakdown_index.contains_key(assembly) {
            continue;
        }
        breakdown_index.insert(assembly.to_string(), overview.assembly_breakdown.len());
        overview.assembly_breakdown.push(AssemblyBreakdown {
            assembly_name: assembly.to_string(),
            total_files: 0,
            date: label.clone(),
            json_count: 0,
            sentiment_counts: SentimentCounts::default(),
        });

        // A date with a messages folder is listed even when it holds no files.
        for date_dir in resolve(&assembly_dir, &request.window) {
            if !date_dir.path.join(MESSAGES_DIR).is_dir() {
                continue;
            }
            date_index.insert(
                (assembly.to_string(), date_dir.name.clone()),
                overview.detailed_results.len(),
            );
            overview.detailed_results.push(DateFiles {
                assembly_name: assembly.to_string(),
                date: date_dir.name,
                json_count: 0,
                json_files: Vec::new(),
            });
        }
    }

    for source in &sources {
        let file_name = source
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if let Some(&i) = date_index.get(&(source.assembly.clone(), source.date.clone())) {
            let entry = &mut overview.detailed_results[i];
            entry.json_count += 1;
            entry.json_files.push(file_name);
        }
        if let Some(&i) = breakdown_index.get(&source.assembly) {
            overview.assembly_breakdown[i].total_files += 1;
            overview.assembly_breakdown[i].json_count += 1;
        }
        overview.total_json_files += 1;
    }

    let mut per_assembly: BTreeMap<String, SentimentCounts> = BTreeMap::new();
    let mut totals = SentimentCounts::default();
    let report = scan.run_over(sources, &mut |group: &LoadedGroup| {
        let counts = per_assembly.entry(group.source.assembly.clone()).or_default();
        for record in &group.records {
            counts.record(&record.sentiment);
            totals.record(&record.sentiment);
        }
    });

    for entry in &mut overview.assembly_breakdown {
        if let Some(counts) = per_assembly.get(&entry.assembly_name) {
            entry.sentiment_counts = *counts;
        }
    }
    overview.sentiment_breakdown = totals;
    Ok((overview, report))
}
