use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use crate::configuration::Settings;
use crate::csrf::CsrfProtection;
use crate::extractors::{json_error_handler, query_error_handler};
use crate::logger::LoggerMiddleware;
use crate::middleware::{CsrfMiddleware, HttpsEnforcer, RateLimitMiddleware};
use crate::rate_limiter::{now_millis, RateLimiter};
use crate::routes::{create_post, csrf_token, health_check, link_preview, render, serve_upload};
use crate::security::SecurityHeaders;
use crate::url_validator::UrlValidator;

const JANITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Builds the shared stores and starts the server on `listener`
pub fn run(listener: TcpListener, settings: Settings) -> Result<Server, std::io::Error> {
    let rate_limiter = Arc::new(RateLimiter::new());
    let csrf = Arc::new(CsrfProtection::new(chrono::Duration::seconds(
        settings.csrf.token_ttl_seconds,
    )));
    let url_validator = Arc::new(UrlValidator::new(&settings.outbound.allowed_domains));

    spawn_janitor(Arc::clone(&rate_limiter), Arc::clone(&csrf));

    let csrf_data = web::Data::from(Arc::clone(&csrf));
    let url_validator_data = web::Data::from(url_validator);
    let uploads_data = web::Data::new(settings.uploads.clone());

    let trust_proxy = settings.application.trust_proxy;
    let max_body_bytes = settings.application.max_body_bytes;

    let server = HttpServer::new(move || {
        let api_limit = RateLimitMiddleware::new("api", Arc::clone(&rate_limiter), settings.rate_limit.api)
            .trust_proxy(trust_proxy);
        let token_limit =
            RateLimitMiddleware::new("api", Arc::clone(&rate_limiter), settings.rate_limit.api)
                .trust_proxy(trust_proxy);
        let files_limit =
            RateLimitMiddleware::new("files", Arc::clone(&rate_limiter), settings.rate_limit.files)
                .trust_proxy(trust_proxy);
        let csrf_guard = || CsrfMiddleware::new(Arc::clone(&csrf), settings.csrf.exempt_paths.clone());

        App::new()
            // Global middleware, last registered runs first
            .wrap(HttpsEnforcer::from_settings(&settings.https, trust_proxy))
            .wrap(SecurityHeaders::middleware())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(
                web::JsonConfig::default()
                    .limit(max_body_bytes)
                    .error_handler(json_error_handler),
            )
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .app_data(csrf_data.clone())
            .app_data(url_validator_data.clone())
            .app_data(uploads_data.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/csrf-token")
                    .wrap(token_limit)
                    .route(web::get().to(csrf_token)),
            )

            // Rate limited, then CSRF checked
            .service(
                web::scope("/api")
                    .wrap(csrf_guard())
                    .wrap(api_limit)
                    .route("/posts", web::post().to(create_post))
                    .route("/render", web::post().to(render))
                    .route("/link-preview", web::post().to(link_preview)),
            )
            .service(
                web::scope("/uploads")
                    .wrap(csrf_guard())
                    .wrap(files_limit)
                    .route("", web::get().to(serve_upload)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Periodically drops expired rate windows and CSRF tokens so idle clients
/// do not accumulate between requests
fn spawn_janitor(rate_limiter: Arc<RateLimiter>, csrf: Arc<CsrfProtection>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(JANITOR_INTERVAL);
        loop {
            interval.tick().await;
            let windows = rate_limiter.sweep_at(now_millis());
            let tokens = csrf.purge_expired_at(chrono::Utc::now());
            if windows > 0 || tokens > 0 {
                tracing::debug!(windows, tokens, "Expired security state removed");
            }
        }
    });
}
