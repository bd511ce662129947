//! Collects a multipart body into text fields and uploaded files.

use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;

use super::ApiError;

#[derive(Debug)]
pub(super) struct UploadedFile {
    pub field: String,
    /// Name as sent by the client, unsanitized.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub(super) struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: Vec<UploadedFile>,
}

impl FormData {
    pub(super) async fn read(request_id: &str, mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(request_id, &e))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(request_id, &e))?;
                // An unused file input still arrives, with an empty name.
                if file_name.is_empty() {
                    continue;
                }
                form.files.push(UploadedFile {
                    field: name,
                    file_name,
                    bytes: bytes.to_vec(),
                });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(request_id, &e))?;
                form.fields.entry(name).or_default().push(text);
            }
        }
        Ok(form)
    }

    /// First value of a text field, trimmed; empty when absent.
    pub(super) fn text(&self, name: &str) -> &str {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map_or("", |v| v.trim())
    }

    /// Every non-blank value of a repeated field, trimmed.
    pub(super) fn texts(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .into_iter()
            .flatten()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub(super) fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.field == field)?;
        Some(self.files.remove(index))
    }

    pub(super) fn take_files(&mut self, field: &str) -> Vec<UploadedFile> {
        let (taken, kept) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == field);
        self.files = kept;
        taken
    }
}

fn multipart_error(request_id: &str, error: &MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(request_id, "payload_too_large", "Upload exceeds the size limit")
    } else {
        ApiError::new(request_id, "bad_request", error.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    use super::*;
    use crate::api::test_support::{multipart_request, Part};

    async fn collect(parts: &[Part<'_>]) -> FormData {
        let request: Request<Body> = multipart_request("/", "POST", parts);
        let multipart = Multipart::from_request(request, &()).await.expect("multipart");
        FormData::read("req-1", multipart).await.expect("form")
    }

    #[tokio::test]
    async fn text_fields_and_files_are_separated() {
        let mut form = collect(&[
            Part::Text("assembly_name", "  North "),
            Part::Text("selected_groups[]", "Ward 1"),
            Part::Text("selected_groups[]", " "),
            Part::Text("selected_groups[]", "Ward 2"),
            Part::File("files[]", "a.xlsx", b"one"),
            Part::File("files[]", "b.xlsx", b"two"),
            Part::File("image_file", "", b""),
        ])
        .await;

        assert_eq!(form.text("assembly_name"), "North");
        assert_eq!(form.text("missing"), "");
        assert_eq!(form.texts("selected_groups[]"), vec!["Ward 1", "Ward 2"]);
        assert!(form.take_file("image_file").is_none());

        let files = form.take_files("files[]");
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].file_name, "b.xlsx");
        assert_eq!(files[1].bytes, b"two");
        assert!(form.take_files("files[]").is_empty());
    }
}
