//! Path construction for the directory-as-database.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use wadash_core::MediaKind;

use crate::AnalyticsError;

pub const MESSAGES_DIR: &str = "messages";
pub const GROUPS_DIR: &str = "groups";
pub const SCHEDULED_CONTENT_DIR: &str = "scheduled_content";
pub const COMPLETION_FILES_DIR: &str = "completion_files";

/// Root of the on-disk store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `<root>/<assembly>`, whether or not it exists.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if `assembly` is not a single path component.
    pub fn assembly_dir(&self, assembly: &str) -> Result<PathBuf, AnalyticsError> {
        Ok(self.root.join(checked_component(assembly, "assembly name")?))
    }

    /// Like [`DataRoot::assembly_dir`] but the directory must exist.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::NotFound`] when the assembly has no directory.
    pub fn existing_assembly_dir(&self, assembly: &str) -> Result<PathBuf, AnalyticsError> {
        let dir = self.assembly_dir(assembly)?;
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(AnalyticsError::not_found("Assembly not found"))
        }
    }

    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] for an unsafe assembly name.
    pub fn groups_dir(&self, assembly: &str) -> Result<PathBuf, AnalyticsError> {
        Ok(self.assembly_dir(assembly)?.join(GROUPS_DIR))
    }

    /// `<root>/<assembly>/<date>/messages/<group>.json`
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if any component is unsafe.
    pub fn group_file(
        &self,
        assembly: &str,
        date: &str,
        group: &str,
    ) -> Result<PathBuf, AnalyticsError> {
        let date = checked_component(date, "date")?;
        let file = format!("{}.json", checked_component(group, "group name")?);
        Ok(self
            .assembly_dir(assembly)?
            .join(date)
            .join(MESSAGES_DIR)
            .join(file))
    }

    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] for an unsafe assembly name.
    pub fn scheduled_content_dir(
        &self,
        assembly: &str,
        kind: MediaKind,
    ) -> Result<PathBuf, AnalyticsError> {
        Ok(self
            .assembly_dir(assembly)?
            .join(SCHEDULED_CONTENT_DIR)
            .join(kind.as_str()))
    }

    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] for an unsafe assembly name.
    pub fn completion_dir(&self, assembly: &str) -> Result<PathBuf, AnalyticsError> {
        Ok(self.assembly_dir(assembly)?.join(COMPLETION_FILES_DIR))
    }

    /// Turns a path stored in the database back into an absolute path under the root.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if the stored path escapes the root.
    pub fn resolve_stored(&self, relative: &str) -> Result<PathBuf, AnalyticsError> {
        let rel = Path::new(relative);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if relative.is_empty() || !safe {
            return Err(AnalyticsError::validation("Invalid stored file path"));
        }
        Ok(self.root.join(rel))
    }

    /// Path of `path` relative to the root, with `/` separators.
    #[must_use]
    pub fn relative_to_root(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Every assembly directory under the root, sorted by name.
    #[must_use]
    pub fn assembly_names(&self) -> Vec<String> {
        child_dirs(&self.root).into_iter().map(|(name, _)| name).collect()
    }
}

/// Rejects anything that is not exactly one normal path component.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] naming `what`.
pub fn checked_component<'a>(value: &'a str, what: &str) -> Result<&'a str, AnalyticsError> {
    let trimmed = value.trim();
    let mut components = Path::new(trimmed).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if trimmed.is_empty()
        || !single_normal
        || trimmed.contains('/')
        || trimmed.contains('\\')
    {
        return Err(AnalyticsError::validation(format!("Invalid {what}")));
    }
    Ok(trimmed)
}

// ── Directory listing ──

/// Immediate sub-directories of `dir` as `(name, path)`, sorted by name.
/// A missing or unreadable directory yields an empty list.
pub(crate) fn child_dirs(dir: &Path) -> Vec<(String, PathBuf)> {
    children(dir, true)
}

/// Immediate regular files of `dir` as `(name, path)`, sorted by name.
pub(crate) fn child_files(dir: &Path) -> Vec<(String, PathBuf)> {
    children(dir, false)
}

fn children(dir: &Path, want_dirs: bool) -> Vec<(String, PathBuf)> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            if want_dirs {
                entry.file_type().is_dir()
            } else {
                entry.file_type().is_file()
            }
        })
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            Some((name, entry.into_path()))
        })
        .collect()
}

/// True when `name` ends with `.ext`, ignoring ASCII case.
pub(crate) fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_component_rejects_traversal() {
        assert!(checked_component("..", "assembly name").is_err());
        assert!(checked_component("a/b", "assembly name").is_err());
        assert!(checked_component("a\\b", "assembly name").is_err());
        assert!(checked_component("", "assembly name").is_err());
        assert!(checked_component("/etc", "assembly name").is_err());
        assert_eq!(checked_component(" North ", "assembly name").unwrap(), "North");
    }

    #[test]
    fn group_file_follows_layout() {
        let root = DataRoot::new("/data");
        let path = root.group_file("North", "2025-01-15", "Ward 7").unwrap();
        assert_eq!(
            path,
            PathBuf::from("/data/North/2025-01-15/messages/Ward 7.json")
        );
    }

    #[test]
    fn resolve_stored_rejects_escape() {
        let root = DataRoot::new("/data");
        assert!(root.resolve_stored("../secret").is_err());
        assert!(root.resolve_stored("/abs/path").is_err());
        assert_eq!(
            root.resolve_stored("North/completion_files/done.png").unwrap(),
            PathBuf::from("/data/North/completion_files/done.png")
        );
    }

    #[test]
    fn relative_to_root_uses_forward_slashes() {
        let root = DataRoot::new("/data");
        let rel = root.relative_to_root(Path::new("/data/North/scheduled_content/image/a.png"));
        assert_eq!(rel, "North/scheduled_content/image/a.png");
    }

    #[test]
    fn listing_a_missing_directory_is_empty() {
        assert!(child_dirs(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_extension("Ward.JSON", "json"));
        assert!(!has_extension("Ward.json.bak", "json"));
    }
}
