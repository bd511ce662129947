//! Writing uploaded files into the data root.
//!
//! Names are probed for collisions and suffixed `_1`, `_2`, ... before the
//! extension. The probe and the write are not atomic; two concurrent uploads of
//! the same name can race.

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use wadash_core::{FolderType, MediaKind};

use crate::layout::{checked_component, has_extension, DataRoot};
use crate::AnalyticsError;

/// A file written under the data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Final name after collision handling.
    pub file_name: String,
    pub path: PathBuf,
    /// Path relative to the data root, `/`-separated, as stored in the database.
    pub relative: String,
}

/// Keeps the client's file name but drops any directory part.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] when nothing usable remains.
pub fn client_file_name(raw: &str) -> Result<String, AnalyticsError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    Ok(checked_component(base, "file name")?.to_string())
}

/// Conservative name for attachments: ASCII letters, digits, `.`, `-` and `_`
/// are kept, anything else becomes `_`.
#[must_use]
pub fn secure_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First path in `dir` not already taken: `name`, then `stem_1.ext`, `stem_2.ext`, ...
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = as_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    (1u32..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Creates `dir` if needed and writes `bytes` under a collision-free name.
///
/// # Errors
///
/// Returns [`AnalyticsError::Io`] if the directory or file cannot be written.
pub fn store(
    root: &DataRoot,
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<StoredFile, AnalyticsError> {
    std::fs::create_dir_all(dir).map_err(|e| AnalyticsError::io(dir, e))?;
    let path = unique_destination(dir, file_name);
    std::fs::write(&path, bytes).map_err(|e| AnalyticsError::io(&path, e))?;
    let stored_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name)
        .to_string();
    Ok(StoredFile {
        file_name: stored_name,
        relative: root.relative_to_root(&path),
        path,
    })
}

/// Daily exports are captured the morning after, so a report uploaded for
/// `target` belongs to the previous day's folder.
#[must_use]
pub fn report_folder_date(target: NaiveDate) -> NaiveDate {
    target.checked_sub_days(Days::new(1)).unwrap_or(target)
}

/// Destination for a batch of report files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    pub dir: PathBuf,
    pub folder_date: String,
    /// `assembly/folder_date/folder_type/`
    pub display_path: String,
}

/// Resolves where a report upload lands and checks every file is `.json`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] for a malformed date, an unsafe
/// assembly name, or a non-JSON file name.
pub fn report_target(
    root: &DataRoot,
    assembly: &str,
    target_date: &str,
    folder: FolderType,
    file_names: &[String],
) -> Result<ReportTarget, AnalyticsError> {
    let target = NaiveDate::parse_from_str(target_date.trim(), "%Y-%m-%d")
        .map_err(|_| AnalyticsError::validation("Invalid date format. Use YYYY-MM-DD"))?;
    if let Some(bad) = file_names.iter().find(|n| !has_extension(n, "json")) {
        return Err(AnalyticsError::validation(format!(
            "File {bad} is not a JSON file"
        )));
    }
    let folder_date = report_folder_date(target).format("%Y-%m-%d").to_string();
    let assembly_dir = root.assembly_dir(assembly)?;
    Ok(ReportTarget {
        dir: assembly_dir.join(&folder_date).join(folder.as_str()),
        display_path: format!("{}/{}/{}/", assembly.trim(), folder_date, folder.as_str()),
        folder_date,
    })
}

/// Stores a scheduled-post attachment under `scheduled_content/<kind>/`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] for an unusable file name and
/// [`AnalyticsError::Io`] if writing fails.
pub fn store_post_media(
    root: &DataRoot,
    assembly: &str,
    kind: MediaKind,
    raw_name: &str,
    bytes: &[u8],
) -> Result<StoredFile, AnalyticsError> {
    let name = secure_file_name(raw_name)
        .ok_or_else(|| AnalyticsError::validation("Invalid file name"))?;
    store(root, &root.scheduled_content_dir(assembly, kind)?, &name, bytes)
}

/// Stores a completion report under `completion_files/`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] for an unusable file name and
/// [`AnalyticsError::Io`] if writing fails.
pub fn store_completion_file(
    root: &DataRoot,
    assembly: &str,
    raw_name: &str,
    bytes: &[u8],
) -> Result<StoredFile, AnalyticsError> {
    let name = secure_file_name(raw_name)
        .ok_or_else(|| AnalyticsError::validation("Invalid file name"))?;
    store(root, &root.completion_dir(assembly)?, &name, bytes)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn collisions_get_numeric_suffixes() {
        let tmp = tempfile::tempdir().unwrap();
        let root = DataRoot::new(tmp.path());
        let dir = tmp.path().join("North/groups");

        let first = store(&root, &dir, "ward.xlsx", b"1").unwrap();
        let second = store(&root, &dir, "ward.xlsx", b"2").unwrap();
        let third = store(&root, &dir, "ward.xlsx", b"3").unwrap();

        assert_eq!(first.file_name, "ward.xlsx");
        assert_eq!(second.file_name, "ward_1.xlsx");
        assert_eq!(third.file_name, "ward_2.xlsx");
        assert_eq!(third.relative, "North/groups/ward_2.xlsx");
        assert_eq!(fs::read(&first.path).unwrap(), b"1");
    }

    #[test]
    fn report_goes_to_previous_day() {
        let root = DataRoot::new("/data");
        let target = report_target(
            &root,
            "North",
            "2025-03-01",
            FolderType::Messages,
            &["Ward 7.json".to_string()],
        )
        .unwrap();
        assert_eq!(target.folder_date, "2025-02-28");
        assert_eq!(target.dir, PathBuf::from("/data/North/2025-02-28/messages"));
        assert_eq!(target.display_path, "North/2025-02-28/messages/");
    }

    #[test]
    fn report_rejects_non_json_files() {
        let root = DataRoot::new("/data");
        let err = report_target(
            &root,
            "North",
            "2025-03-01",
            FolderType::Messages,
            &["a.json".to_string(), "b.csv".to_string()],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "File b.csv is not a JSON file");
    }

    #[test]
    fn client_names_lose_directories_but_keep_spaces() {
        assert_eq!(client_file_name("C:\\exports\\Ward 7.json").unwrap(), "Ward 7.json");
        assert_eq!(client_file_name("../../etc/passwd").unwrap(), "passwd");
        assert!(client_file_name("..").is_err());
    }

    #[test]
    fn secure_names_are_ascii_only() {
        assert_eq!(secure_file_name("my photo (1).png").as_deref(), Some("my_photo__1_.png"));
        assert_eq!(secure_file_name("../../.env").as_deref(), Some("env"));
        assert_eq!(secure_file_name("???"), None);
    }
}
