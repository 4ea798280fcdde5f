use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::csrf::{resolve_session_id, CsrfProtection};
use crate::error::AppError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: String,
}

/// Issues a fresh token for the caller's session, replacing any previous one
pub async fn csrf_token(
    req: HttpRequest,
    protection: web::Data<CsrfProtection>,
) -> Result<HttpResponse, AppError> {
    let session_id = resolve_session_id(&req).ok_or(AppError::SessionRequired)?;
    let csrf_token = protection.issue(&session_id);

    tracing::debug!("CSRF token issued");

    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(CsrfTokenResponse { csrf_token }))
}
