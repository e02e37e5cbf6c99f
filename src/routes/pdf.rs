//! PDF extraction endpoints
//!
//! - `POST /parse-pdf`: layout-aware spans (`{"blocks": [...]}`)
//! - `POST /extract-text`: plain text per page, kept for older clients

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::TextSpanRecord;
use crate::service::PageTexts;
use crate::state::AppState;

use super::upload::read_upload;

/// Query parameters for parsing
#[derive(Debug, Default, Deserialize)]
pub struct ParseQuery {
    /// Password for encrypted documents
    pub password: Option<String>,
}

/// Parsing response
#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub blocks: Vec<TextSpanRecord>,
}

/// Extract layout-aware text spans from an uploaded PDF
///
/// The password may come from the query string or a `password` form field;
/// the query string wins when both are present.
pub async fn parse_pdf(
    State(state): State<AppState>,
    Query(query): Query<ParseQuery>,
    multipart: Multipart,
) -> Result<Json<ParseResponse>, ApiError> {
    let form = read_upload(multipart).await?;
    let password = query.password.or(form.password);

    let blocks = state.parse_service().parse(form.payload, password).await?;

    Ok(Json(ParseResponse { blocks }))
}

/// Extract plain text per page
///
/// Requires a `.pdf` filename. Any failure past intake is reported as a 500.
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PageTexts>, ApiError> {
    let form = read_upload(multipart).await?;

    let result = state
        .parse_service()
        .extract_text(form.payload)
        .await
        .map_err(ApiError::Legacy)?;

    Ok(Json(result))
}
