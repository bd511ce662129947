//! Turns a requested date or date range into concrete date directories.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::layout::{child_dirs, DataRoot};
use crate::AnalyticsError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Requested window. Without an end date only a directory named exactly like
/// the start date is selected; with one, every valid date directory in the
/// inclusive range is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    start_raw: String,
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl DateWindow {
    /// Parses request strings. Blank `end` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] when the start date is missing,
    /// either date is malformed, or the end precedes the start.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, AnalyticsError> {
        let start_raw = start
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AnalyticsError::validation("Start date is required"))?;
        let start = parse_date(start_raw)?;
        let end = match end.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_date(raw)?),
            None => None,
        };
        if let Some(end) = end {
            if end < start {
                return Err(AnalyticsError::validation(
                    "End date must be after start date",
                ));
            }
        }
        Ok(Self {
            start_raw: start_raw.to_string(),
            start,
            end,
        })
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// Human label used by the JSON-file overview.
    #[must_use]
    pub fn label(&self) -> String {
        match self.end {
            Some(end) => format!(
                "Date Range: {} to {}",
                self.start.format(DATE_FORMAT),
                end.format(DATE_FORMAT)
            ),
            None => format!("Date: {}", self.start_raw),
        }
    }

    fn admits(&self, dir: &DateDir) -> bool {
        match self.end {
            None => dir.name == self.start_raw,
            Some(end) => self.start <= dir.date && dir.date <= end,
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AnalyticsError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| AnalyticsError::validation("Invalid date format. Use YYYY-MM-DD"))
}

/// A sub-directory of an assembly whose name parsed as a calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateDir {
    pub name: String,
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Every valid date directory of `assembly_dir`, ordered by date then name.
/// Names that are not dates are skipped silently.
#[must_use]
pub fn date_dirs(assembly_dir: &Path) -> Vec<DateDir> {
    let mut dirs: Vec<DateDir> = child_dirs(assembly_dir)
        .into_iter()
        .filter_map(|(name, path)| {
            let date = NaiveDate::parse_from_str(&name, DATE_FORMAT).ok()?;
            Some(DateDir { name, date, path })
        })
        .collect();
    dirs.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
    dirs
}

/// Date directories of `assembly_dir` selected by `window`.
#[must_use]
pub fn resolve(assembly_dir: &Path, window: &DateWindow) -> Vec<DateDir> {
    date_dirs(assembly_dir)
        .into_iter()
        .filter(|dir| window.admits(dir))
        .collect()
}

/// Names of every date directory of an assembly, oldest first.
///
/// # Errors
///
/// Returns [`AnalyticsError::NotFound`] when the assembly directory is missing.
pub fn available_dates(root: &DataRoot, assembly: &str) -> Result<Vec<String>, AnalyticsError> {
    let dir = root.existing_assembly_dir(assembly)?;
    Ok(date_dirs(&dir).into_iter().map(|d| d.name).collect())
}
