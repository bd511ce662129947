//! The scan-and-reduce pipeline every aggregation runs on.

use std::path::PathBuf;

use serde::Serialize;

use crate::layout::{checked_component, child_files, has_extension, DataRoot, MESSAGES_DIR};
use crate::loader::{load_group_file, PayloadPolicy};
use crate::record::MessageRecord;
use crate::resolver::{resolve, DateWindow};
use crate::AnalyticsError;

/// Where a group file lives in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSource {
    pub assembly: String,
    pub date: String,
    /// File stem of the export.
    pub group: String,
    pub path: PathBuf,
}

impl GroupSource {
    /// `assembly/date/group`, the identity used for cross-group counting.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.assembly, self.date, self.group)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedGroup {
    pub source: GroupSource,
    pub records: Vec<MessageRecord>,
}

/// Consumes loaded groups one at a time, in scan order.
pub trait GroupReducer {
    fn reduce(&mut self, group: &LoadedGroup);
}

impl<F> GroupReducer for F
where
    F: FnMut(&LoadedGroup),
{
    fn reduce(&mut self, group: &LoadedGroup) {
        self(group);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Relative to the data root.
    pub path: String,
    pub reason: String,
}

/// Partial-failure accounting returned next to every aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files_scanned: usize,
    pub files_failed: usize,
    pub failures: Vec<FileFailure>,
}

impl ScanReport {
    fn record_failure(&mut self, path: String, reason: String) {
        self.files_failed += 1;
        self.failures.push(FileFailure { path, reason });
    }
}

/// A resolved scan over one or more assemblies within a date window.
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    root: &'a DataRoot,
    assemblies: &'a [String],
    window: &'a DateWindow,
    policy: PayloadPolicy,
}

impl<'a> Scan<'a> {
    #[must_use]
    pub fn new(
        root: &'a DataRoot,
        assemblies: &'a [String],
        window: &'a DateWindow,
        policy: PayloadPolicy,
    ) -> Self {
        Self {
            root,
            assemblies,
            window,
            policy,
        }
    }

    /// Every group file the scan would visit, in visiting order: assemblies
    /// as requested, then dates ascending, then file names ascending.
    /// Missing assemblies and missing `messages/` folders contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] for an unsafe assembly name.
    pub fn sources(&self) -> Result<Vec<GroupSource>, AnalyticsError> {
        let mut sources = Vec::new();
        for assembly in self.assemblies {
            let assembly = checked_component(assembly, "assembly name")?;
            let assembly_dir = self.root.assembly_dir(assembly)?;
            if !assembly_dir.is_dir() {
                continue;
            }
            for date_dir in resolve(&assembly_dir, self.window) {
                let messages = date_dir.path.join(MESSAGES_DIR);
                for (name, path) in child_files(&messages) {
                    if !has_extension(&name, "json") {
                        continue;
                    }
                    let group = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or(name.as_str())
                        .to_string();
                    sources.push(GroupSource {
                        assembly: assembly.to_string(),
                        date: date_dir.name.clone(),
                        group,
                        path,
                    });
                }
            }
        }
        Ok(sources)
    }

    /// Loads each source and hands it to `reducer`. Unreadable files are
    /// logged, recorded in the report, and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] for an unsafe assembly name.
    pub fn run<R>(&self, reducer: &mut R) -> Result<ScanReport, AnalyticsError>
    where
        R: GroupReducer + ?Sized,
    {
        Ok(self.run_over(self.sources()?, reducer))
    }

    /// Same as [`Scan::run`] over sources the caller already listed.
    pub fn run_over<R>(&self, sources: Vec<GroupSource>, reducer: &mut R) -> ScanReport
    where
        R: GroupReducer + ?Sized,
    {
        let mut report = ScanReport::default();
        for source in sources {
            report.files_scanned += 1;
            match load_group_file(&source.path, self.policy) {
                Ok(records) => reducer.reduce(&LoadedGroup { source, records }),
                Err(e) => {
                    tracing::warn!(
                        path = %source.path.display(),
                        error = %e,
                        "skipping unreadable group file"
                    );
                    let rel = self.root.relative_to_root(&source.path);
                    report.record_failure(rel, failure_reason(&e));
                }
            }
        }
        report
    }
}

fn failure_reason(err: &AnalyticsError) -> String {
    match err {
        AnalyticsError::Io { source, .. } => source.to_string(),
        AnalyticsError::Json { source, .. } => format!("invalid JSON: {source}"),
        AnalyticsError::InvalidPayload { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
