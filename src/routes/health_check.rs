use actix_web::{http::header, HttpResponse};

/// Liveness probe; served over plain HTTP and exempt from CSRF and rate limits
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check");
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}
