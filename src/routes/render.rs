use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::audit::{SecurityEvent, SecurityEventKind};
use crate::error::AppError;
use crate::input_sanitizer;
use crate::xss;

#[derive(Deserialize)]
pub struct RenderRequest {
    html: String,
    link: Option<String>,
}

#[derive(Serialize)]
struct RenderResponse {
    /// Markup with script vectors stripped
    html: String,
    /// Fully escaped text rendering
    text: String,
    link: Option<String>,
}

/// Prepares user rich text for display
pub async fn render(
    req: HttpRequest,
    body: web::Json<RenderRequest>,
) -> Result<HttpResponse, AppError> {
    let RenderRequest { html, link } = body.into_inner();

    let link = match link.as_deref() {
        None => None,
        Some(raw) => match input_sanitizer::sanitize_url(raw) {
            Some(url) => Some(xss::sanitize_url(url.as_str())),
            None => {
                SecurityEvent::new(SecurityEventKind::UnsafeUrlRejected, raw)
                    .with_request(&req)
                    .record();
                return Err(AppError::InvalidUrl);
            }
        },
    };

    Ok(HttpResponse::Ok().json(RenderResponse {
        html: xss::sanitize_input(&html),
        text: xss::escape_html(&html),
        link,
    }))
}
