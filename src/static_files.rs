use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::{path::PathBuf, time::UNIX_EPOCH};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

/// Serves files from one directory with cache headers.
#[derive(Clone)]
pub struct StaticFileHandler {
    pub root: PathBuf,
    cache_control: Option<&'static str>,
}

impl StaticFileHandler {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            cache_control: None,
        }
    }

    /// Uses one `Cache-Control` value for every file instead of choosing by
    /// content type.
    pub fn with_cache_control(mut self, cache_control: &'static str) -> Self {
        self.cache_control = Some(cache_control);
        self
    }

    fn default_cache_control(content_type: &str) -> &'static str {
        if content_type.starts_with("image/") {
            "public, max-age=86400"
        } else if content_type.starts_with("text/css")
            || content_type.starts_with("application/javascript")
            || content_type.starts_with("text/javascript")
        {
            "public, max-age=300, must-revalidate"
        } else {
            "public, max-age=3600"
        }
    }

    pub async fn serve(&self, path: &str) -> Response {
        let relative = path.trim_start_matches('/');
        if relative.split(['/', '\\']).any(|part| part == "..") {
            error!("Path traversal attempt: {:?}", path);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }

        let file_path = self.root.join(relative);
        debug!("Attempting to serve file: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
            Err(e) => {
                debug!("Failed to get metadata for {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open file {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();
        let cache_control = self
            .cache_control
            .unwrap_or_else(|| Self::default_cache_control(&content_type));

        let body = Body::from_stream(ReaderStream::new(file));

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, metadata.len())
            .header(header::CACHE_CONTROL, cache_control);

        if let Ok(modified) = metadata.modified()
            && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
        {
            response = response
                .header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified))
                .header(
                    header::ETAG,
                    format!("\"{}-{}\"", duration.as_secs(), metadata.len()),
                );
        }

        response.body(body).unwrap_or_else(|e| {
            error!("Failed to build response for {:?}: {}", file_path, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
    }
}
