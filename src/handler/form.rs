use axum::extract::Multipart;
use bytes::BytesMut;
use std::collections::HashMap;
use tracing::{debug, error};

use crate::dto::file_dto::UploadedFile;
use crate::util::error::HandlerError;

/// A multipart body split into text fields and file parts, both keyed by field name.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Vec<UploadedFile>>,
}

impl MultipartForm {
    pub fn take_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.take_files(name).into_iter().next()
    }
}

pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, HandlerError> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        error!("Error getting next multipart field: {}", e);
        HandlerError::bad_request(format!("Failed to read form: {}", e))
    })? {
        let name = field.name().map(str::to_string).unwrap_or_default();

        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let mut buf = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    error!("Error reading file chunk: {}", e);
                    HandlerError::bad_request(format!("Failed to read file: {}", e))
                })? {
                    buf.extend_from_slice(&chunk);
                }
                debug!("Received file part '{}': {} ({} bytes)", name, filename, buf.len());
                form.files.entry(name).or_default().push(UploadedFile {
                    filename,
                    content_type,
                    content: buf.freeze(),
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| HandlerError::bad_request(format!("Failed to read field {}: {}", name, e)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
