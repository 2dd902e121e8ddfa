//! Multipart form reading
//!
//! Stage forms that carry media arrive as `multipart/form-data`. Text parts
//! become fields and parts with a filename become uploads.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::api::error::{ApiError, ApiResult};
use crate::attachments::Upload;

/// A fully read multipart body
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl MultipartForm {
    /// Drain a multipart stream into memory
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part for an untouched file input
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form
                        .files
                        .insert(name, Upload::new(Some(file_name), bytes.to_vec()));
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// Text field value, as sent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Remove a text field, defaulting to empty
    pub fn take_text(&mut self, name: &str) -> String {
        self.fields.remove(name).unwrap_or_default()
    }

    /// Remove a text field, treating blank values as absent
    pub fn take_present(&mut self, name: &str) -> Option<String> {
        self.fields
            .remove(name)
            .filter(|value| !value.trim().is_empty())
    }

    /// Remove an uploaded file
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    /// Reject an unexpected file part
    pub fn forbid_file(&self, name: &str) -> ApiResult<()> {
        if self.files.contains_key(name) {
            return Err(ApiError::BadRequest(format!("{} must be a text field", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
impl MultipartForm {
    pub(crate) fn from_parts(
        fields: impl IntoIterator<Item = (&'static str, &'static str)>,
        files: impl IntoIterator<Item = (&'static str, Upload)>,
    ) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_present_skips_blank() {
        let mut form = MultipartForm::from_parts([("machineId", "M-12"), ("machineFamily", " ")], []);
        assert_eq!(form.text("machineId"), Some("M-12"));
        assert_eq!(form.take_present("machineFamily"), None);
        assert_eq!(form.take_present("machineId").as_deref(), Some("M-12"));
        assert_eq!(form.take_text("machineId"), "");
    }

    #[test]
    fn test_files() {
        let upload = Upload::new(Some("a.jpg".to_string()), vec![1, 2, 3]);
        let mut form = MultipartForm::from_parts([], [("media", upload)]);
        assert!(form.forbid_file("media").is_err());
        assert!(form.take_file("media").is_some());
        assert!(form.take_file("media").is_none());
        assert!(form.forbid_file("media").is_ok());
    }
}
