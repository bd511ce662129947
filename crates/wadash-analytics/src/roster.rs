//! Group-membership spreadsheets under `<assembly>/groups/`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;

use crate::layout::{child_files, has_extension, DataRoot};
use crate::AnalyticsError;

static PHONE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)phone|number|mobile|contact|whatsapp").expect("valid phone header regex")
});

const BYTES_PER_PHONE: u64 = 200;
const MAX_ESTIMATED_PHONES: u64 = 5000;
const UNKNOWN_SIZE_ESTIMATE: u64 = 100;

/// First sheet of a roster file, as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Index of the first header that looks like a phone-number column.
    #[must_use]
    pub fn phone_column(&self) -> Option<usize> {
        self.headers.iter().position(|h| PHONE_HEADER.is_match(h))
    }

    fn distinct_in_column(&self, column: usize) -> usize {
        self.rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|cell| !cell.is_empty())
            .collect::<HashSet<_>>()
            .len()
    }

    fn non_empty_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .count()
    }
}

/// Reads the first sheet of an `.xlsx`/`.xls` workbook or a `.csv` file.
/// The first row is the header.
///
/// # Errors
///
/// Returns [`AnalyticsError::SpreadsheetRead`] if the file cannot be parsed.
pub fn read_table(path: &Path) -> Result<SheetTable, AnalyticsError> {
    let name = path.to_string_lossy();
    if has_extension(&name, "csv") {
        read_csv(path)
    } else {
        read_workbook(path)
    }
}

fn read_workbook(path: &Path) -> Result<SheetTable, AnalyticsError> {
    let fail = |reason: String| AnalyticsError::SpreadsheetRead {
        path: path.to_path_buf(),
        reason,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| fail(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| fail("workbook has no sheets".to_string()))?
        .map_err(|e| fail(e.to_string()))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    Ok(SheetTable {
        headers,
        rows: rows.collect(),
    })
}

fn read_csv(path: &Path) -> Result<SheetTable, AnalyticsError> {
    let fail = |e: csv::Error| AnalyticsError::SpreadsheetRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(fail)?;
    let headers = reader
        .byte_headers()
        .map_err(fail)?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(fail)?;
        rows.push(
            record
                .iter()
                .map(|c| String::from_utf8_lossy(c).trim().to_string())
                .collect(),
        );
    }
    Ok(SheetTable { headers, rows })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Phone count used by the groups page: distinct values in the phone column
/// (at least 1), otherwise a size-based guess of one phone per 200 bytes,
/// capped at 5000.
#[must_use]
pub fn estimate_phone_count(path: &Path) -> usize {
    let Ok(meta) = std::fs::metadata(path) else {
        return usize::try_from(UNKNOWN_SIZE_ESTIMATE).unwrap_or(usize::MAX);
    };
    let by_size = (meta.len() / BYTES_PER_PHONE).clamp(1, MAX_ESTIMATED_PHONES);
    let by_size = usize::try_from(by_size).unwrap_or(usize::MAX);

    match read_table(path) {
        Ok(table) => match table.phone_column() {
            Some(col) => table.distinct_in_column(col).max(1),
            None => by_size,
        },
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "falling back to size estimate");
            by_size
        }
    }
}

/// Phone count used by the legacy dashboard: distinct values in the phone
/// column, otherwise the number of non-empty rows (0 when there is at most one).
/// Unreadable files count as 0.
#[must_use]
pub fn count_phones(path: &Path) -> usize {
    match read_table(path) {
        Ok(table) => match table.phone_column() {
            Some(col) => table.distinct_in_column(col),
            None => match table.non_empty_rows() {
                n if n <= 1 => 0,
                n => n,
            },
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read group roster");
            0
        }
    }
}

/// Group name encoded in a roster file name: `Ward7_all_20250115.xlsx` -> `Ward7`.
#[must_use]
pub fn group_name_from_file(file_name: &str) -> String {
    let normalized = file_name.replace("_all_", "_");
    normalized
        .split('_')
        .next()
        .unwrap_or_default()
        .to_string()
}

// ── Assembly groups page ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRoster {
    pub group_name: String,
    pub assembly: String,
    pub phone_count: usize,
    pub member_count: usize,
    pub file_size: u64,
    pub last_updated: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterSummary {
    pub total_groups: usize,
    pub total_phones: usize,
    pub total_members: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyGroups {
    pub groups: Vec<GroupRoster>,
    pub summary: RosterSummary,
}

/// Roster summary for the `.xlsx` files of one assembly, largest first.
/// An assembly without a `groups/` folder has no groups.
///
/// # Errors
///
/// Returns [`AnalyticsError::NotFound`] when the assembly directory is missing.
pub fn assembly_groups(root: &DataRoot, assembly: &str) -> Result<AssemblyGroups, AnalyticsError> {
    let assembly = assembly.trim();
    if assembly.is_empty() {
        return Err(AnalyticsError::validation("Assembly name is required"));
    }
    let dir = root.assembly_dir(assembly)?;
    if !dir.is_dir() {
        return Err(AnalyticsError::not_found(format!(
            "Assembly \"{assembly}\" not found"
        )));
    }

    let mut groups = Vec::new();
    for (name, path) in child_files(&root.groups_dir(assembly)?) {
        if !name.ends_with(".xlsx") {
            continue;
        }
        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping roster file");
                continue;
            }
        };
        let last_updated = meta
            .modified()
            .map(|t| DateTime::<Local>::from(t).naive_local().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            .unwrap_or_default();
        let phones = estimate_phone_count(&path);
        groups.push(GroupRoster {
            group_name: group_name_from_file(&name),
            assembly: assembly.to_string(),
            phone_count: phones,
            member_count: phones,
            file_size: meta.len(),
            last_updated,
            filename: name,
        });
    }
    groups.sort_by(|a, b| b.phone_count.cmp(&a.phone_count));

    let total_phones = groups.iter().map(|g| g.phone_count).sum();
    Ok(AssemblyGroups {
        summary: RosterSummary {
            total_groups: groups.len(),
            total_phones,
            total_members: total_phones,
        },
        groups,
    })
}

/// `.xlsx`/`.xls` files in an assembly's `groups/` folder, sorted by name.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] for an unsafe assembly name.
pub fn group_files(root: &DataRoot, assembly: &str) -> Result<Vec<String>, AnalyticsError> {
    Ok(child_files(&root.groups_dir(assembly)?)
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| has_extension(name, "xlsx") || has_extension(name, "xls"))
        .collect())
}

// ── Dashboard totals ──

/// How the dashboard counts phones per roster file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneCounting {
    /// Column-or-rows count; unreadable files are 0.
    Exact,
    /// Same estimate as the assembly groups page.
    Estimated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePhones {
    pub name: String,
    pub phones_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyPhones {
    pub name: String,
    pub groups_count: usize,
    pub phones_count: usize,
    pub groups: Vec<FilePhones>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_assemblies: usize,
    pub total_groups: usize,
    pub total_phones: usize,
    pub assemblies: Vec<AssemblyPhones>,
}

/// Walks every assembly directory and counts roster files (`.xlsx`, `.xls`,
/// `.csv`) and the phones in them.
#[must_use]
pub fn dashboard_stats(root: &DataRoot, counting: PhoneCounting) -> DashboardStats {
    let mut stats = DashboardStats::default();
    for assembly in root.assembly_names() {
        let groups_dir = root.path().join(&assembly).join(crate::layout::GROUPS_DIR);
        let mut entry = AssemblyPhones {
            name: assembly,
            groups_count: 0,
            phones_count: 0,
            groups: Vec::new(),
        };
        for (name, path) in child_files(&groups_dir) {
            if !["xlsx", "xls", "csv"].iter().any(|ext| has_extension(&name, ext)) {
                continue;
            }
            let phones = match counting {
                PhoneCounting::Exact => count_phones(&path),
                PhoneCounting::Estimated => estimate_phone_count(&path),
            };
            entry.groups_count += 1;
            entry.phones_count += phones;
            entry.groups.push(FilePhones {
                name,
                phones_count: phones,
            });
        }
        stats.total_groups += entry.groups_count;
        stats.total_phones += entry.phones_count;
        stats.assemblies.push(entry);
    }
    stats.total_assemblies = stats.assemblies.len();
    stats
}
