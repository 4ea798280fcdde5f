use actix_files::NamedFile;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::audit::{SecurityEvent, SecurityEventKind};
use crate::configuration::UploadSettings;
use crate::error::AppError;
use crate::path_validator::require_contained;

#[derive(Deserialize)]
pub struct UploadQuery {
    path: String,
}

/// Serves a file from the upload directory; the requested path never leaves it
pub async fn serve_upload(
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    uploads: web::Data<UploadSettings>,
) -> Result<HttpResponse, AppError> {
    let path = require_contained(&query.path, &uploads.directory).map_err(|e| {
        SecurityEvent::new(SecurityEventKind::PathTraversalDetected, &query.path)
            .with_request(&req)
            .record();
        e
    })?;

    if !path.is_file() {
        return Err(AppError::NotFound);
    }

    crate::safe_debug!("Serving upload {}", query.path);
    let file = NamedFile::open(&path)?;
    Ok(file.into_response(&req))
}
