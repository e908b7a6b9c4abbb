//! Buffered multipart forms.

use std::collections::HashMap;

use axum::extract::Multipart;
use serde_json::{Map, Value};
use sitesurvey_core::upload::UploadFile;
use sitesurvey_shared::AppError;
use tracing::debug;

/// A multipart body read into memory: text fields by name, files in the
/// order they arrived.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<UploadFile>,
}

impl MultipartForm {
    /// Read every part of `multipart`.
    ///
    /// A part with a file name is a file. File parts with an empty name and
    /// no content are what browsers send for an untouched file input and
    /// are skipped.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(ToString::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await.map_err(|e| {
                        AppError::Validation(format!("Failed to read file '{name}': {e}"))
                    })?;

                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }

                    debug!(field = %name, file_name = %file_name, size = data.len(), "Received file");
                    form.files
                        .push(UploadFile::new(name, file_name, content_type, data));
                }
                None => {
                    let text = field.text().await.map_err(|e| {
                        AppError::Validation(format!("Failed to read field '{name}': {e}"))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Build a form directly. Used by tests.
    #[must_use]
    pub fn from_parts(fields: HashMap<String, String>, files: Vec<UploadFile>) -> Self {
        Self { fields, files }
    }

    /// A text field, if present.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A text field, or an empty string when absent.
    #[must_use]
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    /// Parse `name` as a JSON array of strings.
    ///
    /// Absent or blank yields `None`.
    pub fn string_list(&self, name: &str) -> Result<Option<Vec<String>>, AppError> {
        let Some(raw) = self.text(name).map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        serde_json::from_str::<Vec<String>>(raw)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{name} must be a JSON array of strings")))
    }

    /// Parse `name` as a JSON object. Absent or blank yields `{}`.
    pub fn json_object(&self, name: &str) -> Result<Value, AppError> {
        let Some(raw) = self.text(name).map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Value::Object(Map::new()));
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => Err(AppError::Validation(format!("{name} must be a JSON object"))),
        }
    }

    /// Remove and return the first file sent in field `name`.
    pub fn take_file(&mut self, name: &str) -> Option<UploadFile> {
        let index = self.files.iter().position(|f| f.field_name == name)?;
        Some(self.files.remove(index))
    }

    /// Remove and return every remaining file.
    pub fn take_files(&mut self) -> Vec<UploadFile> {
        std::mem::take(&mut self.files)
    }
}
