use std::collections::HashSet;
use std::path::Path;

/// Reads the broadcast list: one address per line, lines without `@` skipped
/// and repeats dropped (first occurrence kept). A missing or unreadable file
/// yields an empty list and a warning.
#[must_use]
pub fn read_recipients(path: &Path) -> Vec<String> {
    let mut reader = match csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
    {
        Ok(reader) => reader,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "recipient list unavailable");
            return Vec::new();
        }
    };

    let mut emails = Vec::new();
    let mut seen = HashSet::new();
    for record in reader.records() {
        match record {
            Ok(record) => {
                if let Some(email) = record.get(0).map(str::trim).filter(|e| e.contains('@')) {
                    if seen.insert(email.to_ascii_lowercase()) {
                        emails.push(email.to_string());
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable recipient line");
            }
        }
    }
    tracing::debug!(count = emails.len(), "loaded recipient list");
    emails
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn lines_without_at_sign_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("email.csv");
        fs::write(&path, "a@example.com\n\nnot-an-email\n  b@example.com  \n").unwrap();

        assert_eq!(read_recipients(&path), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn repeated_addresses_keep_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("email.csv");
        fs::write(&path, "b@example.com\na@example.com\nB@Example.com\na@example.com\n").unwrap();

        assert_eq!(read_recipients(&path), vec!["b@example.com", "a@example.com"]);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_recipients(&dir.path().join("absent.csv")).is_empty());
    }
}
