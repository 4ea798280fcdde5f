use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::audit::{SecurityEvent, SecurityEventKind};
use crate::error::AppError;
use crate::url_validator::UrlValidator;

#[derive(Deserialize)]
pub struct LinkPreviewRequest {
    url: String,
}

#[derive(Serialize)]
struct LinkPreviewResponse {
    url: String,
    host: String,
}

/// Screens a URL the server would fetch on the caller's behalf
pub async fn link_preview(
    req: HttpRequest,
    body: web::Json<LinkPreviewRequest>,
    validator: web::Data<UrlValidator>,
) -> Result<HttpResponse, AppError> {
    let url = validator.validate_url(&body.url).map_err(|e| {
        SecurityEvent::new(SecurityEventKind::SsrfBlocked, &e)
            .with_request(&req)
            .record();
        AppError::SsrfBlocked(e)
    })?;

    let host = url.host_str().unwrap_or_default().to_string();
    crate::safe_info!("Outbound URL accepted for {}", host);

    Ok(HttpResponse::Ok().json(LinkPreviewResponse {
        url: url.to_string(),
        host,
    }))
}
