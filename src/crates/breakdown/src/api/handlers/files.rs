//! Stored media download

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::api::error::ApiResult;
use crate::api::routes::AppState;

/// Content type inferred from a filename extension
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// GET /api/files/:filename and GET <public prefix>/:filename
pub async fn fetch_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let bytes = state.engine.fetch_media(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("1700000000000-abc.JPG"), "image/jpeg");
        assert_eq!(content_type_for("report.pdf"), "application/pdf");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
