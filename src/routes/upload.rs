//! Multipart upload reading shared by the PDF endpoints

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::intake::UploadPayload;

/// Field names accepted for the PDF file
const FILE_FIELDS: &[&str] = &["file", "pdf"];

const PASSWORD_FIELD: &str = "password";

/// Everything a PDF endpoint reads from the form
#[derive(Debug)]
pub struct UploadForm {
    pub payload: UploadPayload,
    pub password: Option<String>,
}

/// Read the file field (and an optional password field) from a multipart body
pub async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut payload = None;
    let mut password = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::from(e)
    })? {
        let name = field.name().unwrap_or("").to_string();

        if FILE_FIELDS.contains(&name.as_str()) && payload.is_none() {
            let filename = field.file_name().map(|s| s.to_string());
            let content = field.bytes().await?;
            tracing::debug!("Received file field '{}': {:?}, {} bytes", name, filename, content.len());
            payload = Some(UploadPayload::new(filename, content));
        } else if name == PASSWORD_FIELD {
            password = Some(field.text().await?);
        } else {
            tracing::debug!("Ignoring multipart field '{}'", name);
        }
    }

    let payload = payload.ok_or_else(|| {
        tracing::warn!("No file field found in multipart upload");
        ApiError::MissingFile
    })?;

    Ok(UploadForm { payload, password })
}
