//! Spreadsheet downloads built from aggregate results.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use wadash_core::Sentiment;

use crate::aggregate::{CommonMembers, CommonMembersReducer, RankedUser, SentimentRankReducer};
use crate::layout::DataRoot;
use crate::loader::PayloadPolicy;
use crate::request::AnalysisRequest;
use crate::scan::{Scan, ScanReport};
use crate::AnalyticsError;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const MAX_COLUMN_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(u64),
    Text(String),
}

impl Cell {
    fn display_len(&self) -> usize {
        match self {
            Cell::Number(n) => n.to_string().chars().count(),
            Cell::Text(s) => s.chars().count(),
        }
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(u64::try_from(n).unwrap_or(u64::MAX))
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// A single-sheet table with a bold header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub sheet_name: String,
    pub file_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Report {
    /// Column widths: longest rendered value (header included) plus two, capped at 50.
    #[must_use]
    pub fn column_widths(&self) -> Vec<usize> {
        (0..self.columns.len())
            .map(|col| {
                let header = self.columns[col].chars().count();
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(Cell::display_len)
                    .fold(header, usize::max);
                (longest + 2).min(MAX_COLUMN_WIDTH)
            })
            .collect()
    }

    /// Renders the workbook into memory.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Xlsx`] if the workbook cannot be written.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_xlsx(&self) -> Result<Vec<u8>, AnalyticsError> {
        let mut workbook = Workbook::new();
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&self.sheet_name)?;

        let bold = Format::new().set_bold();
        for (col, title) in (0u16..).zip(&self.columns) {
            worksheet.write_string_with_format(0, col, title, &bold)?;
        }
        for (row, cells) in (1u32..).zip(&self.rows) {
            for (col, cell) in (0u16..).zip(cells) {
                match cell {
                    Cell::Number(n) => worksheet.write_number(row, col, *n as f64)?,
                    Cell::Text(s) => worksheet.write_string(row, col, s)?,
                };
            }
        }
        for (col, width) in (0u16..).zip(self.column_widths()) {
            worksheet.set_column_width(col, width as f64)?;
        }

        workbook.push_worksheet(worksheet);
        Ok(workbook.save_to_buffer()?)
    }
}

/// `75.00` -> `75.0%`, `66.67` -> `66.67%`.
#[must_use]
pub fn format_percentage(value: Decimal) -> String {
    let text = value.normalize().to_string();
    if text.contains('.') {
        format!("{text}%")
    } else {
        format!("{text}.0%")
    }
}

#[must_use]
pub fn common_members_report(results: &CommonMembers, today: NaiveDate) -> Report {
    let rows = results
        .common_members
        .iter()
        .enumerate()
        .map(|(i, member)| {
            vec![
                Cell::from(i + 1),
                Cell::from(member.name.as_str()),
                Cell::from(member.phone.as_str()),
                Cell::from(member.groups_count),
                Cell::from(member.display_group_names().join("; ")),
            ]
        })
        .collect();
    Report {
        sheet_name: "Common Members".to_string(),
        file_name: format!("common_members_analysis_{}.xlsx", today.format("%Y-%m-%d")),
        columns: ["Rank", "Member Name", "Phone Number", "Groups Count", "Group Names"]
            .map(String::from)
            .to_vec(),
        rows,
    }
}

#[must_use]
pub fn sentiment_users_report(target: Sentiment, users: &[RankedUser], today: NaiveDate) -> Report {
    let (sheet_name, file_prefix) = match target {
        Sentiment::Negative => ("Most Negative Users", "most_negative_users"),
        Sentiment::Neutral => ("Most Neutral Users", "most_neutral_users"),
        Sentiment::Positive => ("Most Positive Users", "most_positive_users"),
    };
    let rows = users
        .iter()
        .enumerate()
        .map(|(i, user)| {
            vec![
                Cell::from(i + 1),
                Cell::from(user.name.as_str()),
                Cell::from(user.phone.as_str()),
                Cell::from(user.total_messages),
                Cell::from(user.positive_messages),
                Cell::from(user.negative_messages),
                Cell::from(user.neutral_messages),
                Cell::from(user.groups_count),
                Cell::from(format_percentage(user.percentage)),
            ]
        })
        .collect();
    let mut columns: Vec<String> = [
        "Rank",
        "Member Name",
        "Phone Number",
        "Total Messages",
        "Positive Messages",
        "Negative Messages",
        "Neutral Messages",
        "Groups Count",
    ]
    .map(String::from)
    .to_vec();
    columns.push(format!("{} Percentage", target.as_str()));

    Report {
        sheet_name: sheet_name.to_string(),
        file_name: format!("{file_prefix}_{}.xlsx", today.format("%Y-%m-%d")),
        columns,
        rows,
    }
}

/// The three spreadsheet downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    CommonMembers,
    PositiveUsers,
    NegativeUsers,
}

impl ExportKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CommonMembers => "common-members",
            Self::PositiveUsers => "positive-users",
            Self::NegativeUsers => "negative-users",
        }
    }
}

impl std::str::FromStr for ExportKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "common-members" => Ok(Self::CommonMembers),
            "positive-users" => Ok(Self::PositiveUsers),
            "negative-users" => Ok(Self::NegativeUsers),
            other => Err(AnalyticsError::validation(format!(
                "unknown export '{other}'; expected common-members, positive-users or negative-users"
            ))),
        }
    }
}

/// Scans the selection and lays the result out as a workbook table.
/// An empty result still yields a report with only the header row.
///
/// # Errors
///
/// Returns an error if an assembly directory cannot be resolved.
pub fn build_report(
    root: &DataRoot,
    request: &AnalysisRequest,
    kind: ExportKind,
    today: NaiveDate,
) -> Result<(Report, ScanReport), AnalyticsError> {
    let scan = Scan::new(root, &request.assemblies, &request.window, PayloadPolicy::ListOnly);
    match kind {
        ExportKind::CommonMembers => {
            let mut reducer = CommonMembersReducer::new(request.sentiment.clone());
            let report = scan.run(&mut reducer)?;
            Ok((common_members_report(&reducer.finish(), today), report))
        }
        ExportKind::PositiveUsers | ExportKind::NegativeUsers => {
            let target = if kind == ExportKind::PositiveUsers {
                Sentiment::Positive
            } else {
                Sentiment::Negative
            };
            let mut reducer = SentimentRankReducer::new(target, request.sentiment.clone());
            let report = scan.run(&mut reducer)?;
            Ok((sentiment_users_report(target, &reducer.finish(), today), report))
        }
    }
}

#[cfg(test)]
mod tests {
    use wadash_core::SentimentCounts;

    use super::*;
    use crate::aggregate::CommonMember;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
    }

    #[test]
    fn percentages_render_like_the_dashboard() {
        assert_eq!(format_percentage(Decimal::new(7500, 2)), "75.0%");
        assert_eq!(format_percentage(Decimal::new(6667, 2)), "66.67%");
        assert_eq!(format_percentage(Decimal::new(125, 1)), "12.5%");
        assert_eq!(format_percentage(Decimal::new(100, 0)), "100.0%");
    }

    #[test]
    fn common_members_layout() {
        let results = CommonMembers {
            total_common_members: 1,
            max_groups_per_member: 2,
            total_crossings: 2,
            common_members: vec![CommonMember {
                name: "Asha".into(),
                phone: "919800000001".into(),
                groups_count: 2,
                group_names: vec![
                    "North/2025-01-15/Ward 7".into(),
                    "South/2025-01-15/Youth".into(),
                ],
                total_messages: 4,
                sentiment_breakdown: SentimentCounts::default(),
            }],
        };
        let report = common_members_report(&results, today());
        assert_eq!(report.sheet_name, "Common Members");
        assert_eq!(report.file_name, "common_members_analysis_2025-01-20.xlsx");
        assert_eq!(
            report.rows[0][4],
            Cell::Text("North - Ward 7; South - Youth".into())
        );
        assert_eq!(report.column_widths(), vec![6, 13, 14, 14, 31]);
        let bytes = report.to_xlsx().unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn column_widths_are_capped() {
        let report = Report {
            sheet_name: "S".into(),
            file_name: "s.xlsx".into(),
            columns: vec!["Group Names".into()],
            rows: vec![vec![Cell::Text("x".repeat(120))]],
        };
        assert_eq!(report.column_widths(), vec![50]);
    }

    #[test]
    fn export_kinds_parse_cli_names() {
        assert_eq!("positive-users".parse::<ExportKind>().unwrap(), ExportKind::PositiveUsers);
        assert_eq!(ExportKind::CommonMembers.as_str(), "common-members");
        assert!("everyone".parse::<ExportKind>().is_err());
    }

    #[test]
    fn empty_selection_still_builds_a_header_only_report() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("North/2025-01-15/messages")).unwrap();
        let root = DataRoot::new(tmp.path());
        let request =
            AnalysisRequest::new(vec!["North".into()], Some("2025-01-15"), None, None).unwrap();

        let (report, scan) =
            build_report(&root, &request, ExportKind::NegativeUsers, today()).unwrap();

        assert!(report.rows.is_empty());
        assert_eq!(scan.files_scanned, 0);
        assert!(report.to_xlsx().unwrap().starts_with(b"PK"));
    }

    #[test]
    fn negative_report_names() {
        let report = sentiment_users_report(Sentiment::Negative, &[], today());
        assert_eq!(report.sheet_name, "Most Negative Users");
        assert_eq!(report.file_name, "most_negative_users_2025-01-20.xlsx");
        assert_eq!(report.columns.last().unwrap(), "Negative Percentage");
    }
}
