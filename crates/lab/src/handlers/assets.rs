//! Asset streaming through the path gatekeeper.
//!
//! Serves video bytes with HTTP range support so the browser can seek
//! without the server buffering whole files. Every requested path passes
//! the gatekeeper first; a rejection becomes a 403 whose body never echoes
//! the attempted path.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{self, HeaderMap};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Maximum read size for an open-ended range request (1 MiB).
const MAX_CHUNK_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct AssetParams {
    pub path: String,
}

/// Guess a Content-Type from a file extension.
fn content_type_for_extension(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Parse a `Range: bytes=START-END` header value.
/// Returns `(start, optional_end)`.
fn parse_range_header(range: &str) -> Option<(u64, Option<u64>)> {
    let range = range.strip_prefix("bytes=")?;
    let parts: Vec<&str> = range.splitn(2, '-').collect();
    if parts.len() != 2 {
        return None;
    }
    let start = parts[0].parse::<u64>().ok()?;
    let end = if parts[1].is_empty() {
        None
    } else {
        Some(parts[1].parse::<u64>().ok()?)
    };
    Some((start, end))
}

/// GET /assets/video?path=...
///
/// Streams a file from inside the allowed roots, honoring byte-range
/// requests.
pub async fn stream_asset(
    State(state): State<AppState>,
    Query(params): Query<AssetParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let path = state.gatekeeper.resolve(&params.path)?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let file_size = metadata.len();
    let content_type = content_type_for_extension(&path.to_string_lossy());

    // Check for a Range header. Zero-length files always go down the full
    // response path (there is no satisfiable range over zero bytes).
    if file_size > 0 {
        if let Some(range_value) = headers.get(header::RANGE) {
            let range_str = range_value
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid Range header".into()))?;

            if let Some((start, end)) = parse_range_header(range_str) {
                // Saturate so a huge start cannot overflow before the
                // bounds check below turns it into a 416.
                let end = end
                    .map(|e| e.min(file_size - 1))
                    .unwrap_or_else(|| start.saturating_add(MAX_CHUNK_SIZE - 1).min(file_size - 1));

                if start >= file_size || start > end {
                    return Ok(Response::builder()
                        .status(StatusCode::RANGE_NOT_SATISFIABLE)
                        .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
                        .body(Body::empty())
                        .map_err(|e| AppError::InternalError(e.to_string()))?);
                }

                let length = end - start + 1;

                let mut file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|e| AppError::InternalError(e.to_string()))?;
                file.seek(std::io::SeekFrom::Start(start))
                    .await
                    .map_err(|e| AppError::InternalError(e.to_string()))?;

                let limited = file.take(length);
                let stream = ReaderStream::new(limited);

                return Ok(Response::builder()
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, length.to_string())
                    .header(
                        header::CONTENT_RANGE,
                        format!("bytes {start}-{end}/{file_size}"),
                    )
                    .header(header::ACCEPT_RANGES, "bytes")
                    .body(Body::from_stream(stream))
                    .map_err(|e| AppError::InternalError(e.to_string()))?);
            }
        }
    }

    // No Range header -- serve the full file.
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let stream = ReaderStream::new(file);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(e.to_string()))?)
}
