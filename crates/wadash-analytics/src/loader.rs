//! Reads one group export file.

use std::path::Path;

use serde_json::Value;

use crate::record::MessageRecord;
use crate::AnalyticsError;

/// What a call site accepts at the top level of a group file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPolicy {
    /// Only a JSON array of message objects.
    ListOnly,
    /// An array, or a single message object treated as a one-element array.
    ListOrObject,
}

/// Parses `path` as UTF-8 JSON into message records. Array elements that are
/// not objects are dropped.
///
/// # Errors
///
/// Returns [`AnalyticsError::Io`] if the file cannot be read (including invalid UTF-8),
/// [`AnalyticsError::Json`] if it is not valid JSON, and
/// [`AnalyticsError::InvalidPayload`] if the top level does not fit `policy`.
pub fn load_group_file(
    path: &Path,
    policy: PayloadPolicy,
) -> Result<Vec<MessageRecord>, AnalyticsError> {
    let text = std::fs::read_to_string(path).map_err(|e| AnalyticsError::io(path, e))?;
    let value: Value = serde_json::from_str(&text).map_err(|source| AnalyticsError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match (value, policy) {
        (Value::Array(items), _) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(MessageRecord::from_object(map)),
                _ => None,
            })
            .collect()),
        (Value::Object(map), PayloadPolicy::ListOrObject) => {
            Ok(vec![MessageRecord::from_object(map)])
        }
        (Value::Object(_), PayloadPolicy::ListOnly) => Err(AnalyticsError::InvalidPayload {
            path: path.to_path_buf(),
            reason: "expected a JSON array of messages".to_string(),
        }),
        (_, _) => Err(AnalyticsError::InvalidPayload {
            path: path.to_path_buf(),
            reason: "expected a JSON array or object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_an_array() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            &tmp,
            "g.json",
            r#"[{"messageContent":"a"},{"messageContent":"b"},3]"#,
        );
        let records = load_group_file(&path, PayloadPolicy::ListOnly).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].content, "b");
    }

    #[test]
    fn single_object_depends_on_policy() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(&tmp, "g.json", r#"{"messageContent":"solo"}"#);
        assert!(matches!(
            load_group_file(&path, PayloadPolicy::ListOnly),
            Err(AnalyticsError::InvalidPayload { .. })
        ));
        let records = load_group_file(&path, PayloadPolicy::ListOrObject).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "solo");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(&tmp, "g.json", "[{\"messageContent\": ");
        assert!(matches!(
            load_group_file(&path, PayloadPolicy::ListOrObject),
            Err(AnalyticsError::Json { .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("g.json");
        fs::write(&path, [0xff, 0xfe, 0x5b, 0x5d]).unwrap();
        assert!(matches!(
            load_group_file(&path, PayloadPolicy::ListOnly),
            Err(AnalyticsError::Io { .. })
        ));
    }
}
