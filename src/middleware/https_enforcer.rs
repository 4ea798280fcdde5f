/// HTTPS Enforcement Middleware
///
/// `Enforce`: plain-HTTP requests outside the excluded paths get a 301 to the
/// same host and path over https; secure responses carry HSTS.
/// `Advise`: never blocks, only records an `INSECURE_TRANSPORT` event when a
/// sensitive path is reached over plain HTTP (development visibility).

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderValue},
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use super::path_in;
use crate::audit::{SecurityEvent, SecurityEventKind};
use crate::configuration::HttpsSettings;
use crate::log_sanitizer::Sanitized;

pub const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpsMode {
    Enforce,
    Advise,
}

#[derive(Debug)]
struct EnforcerConfig {
    mode: HttpsMode,
    trust_proxy: bool,
    excluded_paths: Vec<String>,
    sensitive_paths: Vec<String>,
}

pub struct HttpsEnforcer {
    config: Arc<EnforcerConfig>,
}

impl HttpsEnforcer {
    pub fn enforce(excluded_paths: Vec<String>, trust_proxy: bool) -> Self {
        Self::build(HttpsMode::Enforce, trust_proxy, excluded_paths, Vec::new())
    }

    pub fn advise(sensitive_paths: Vec<String>, trust_proxy: bool) -> Self {
        Self::build(HttpsMode::Advise, trust_proxy, Vec::new(), sensitive_paths)
    }

    /// Enforces when `enabled`, otherwise falls back to advisory warnings
    pub fn from_settings(settings: &HttpsSettings, trust_proxy: bool) -> Self {
        if settings.enabled {
            Self::enforce(settings.excluded_paths.clone(), trust_proxy)
        } else {
            Self::advise(settings.sensitive_paths.clone(), trust_proxy)
        }
    }

    pub fn mode(&self) -> HttpsMode {
        self.config.mode
    }

    fn build(
        mode: HttpsMode,
        trust_proxy: bool,
        excluded_paths: Vec<String>,
        sensitive_paths: Vec<String>,
    ) -> Self {
        Self {
            config: Arc::new(EnforcerConfig {
                mode,
                trust_proxy,
                excluded_paths,
                sensitive_paths,
            }),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HttpsEnforcer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = HttpsEnforcerService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(HttpsEnforcerService {
            service: Rc::new(service),
            config: Arc::clone(&self.config),
        }))
    }
}

pub struct HttpsEnforcerService<S> {
    service: Rc<S>,
    config: Arc<EnforcerConfig>,
}

impl<S, B> Service<ServiceRequest> for HttpsEnforcerService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let secure = is_secure(&req, self.config.trust_proxy);
        let service = self.service.clone();

        match self.config.mode {
            HttpsMode::Enforce if !secure => {
                if path_in(req.path(), &self.config.excluded_paths) {
                    return Box::pin(async move {
                        service
                            .call(req)
                            .await
                            .map(ServiceResponse::map_into_left_body)
                    });
                }

                let location = redirect_location(&req, self.config.trust_proxy);
                tracing::debug!(
                    location = %Sanitized(&location),
                    "Redirecting plain HTTP request"
                );
                let response = HttpResponse::MovedPermanently()
                    .insert_header((header::LOCATION, location))
                    .finish();
                let response = req.into_response(response).map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
            HttpsMode::Enforce => Box::pin(async move {
                let mut res = service.call(req).await?;
                res.headers_mut().insert(
                    header::STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static(HSTS_VALUE),
                );
                Ok(res.map_into_left_body())
            }),
            HttpsMode::Advise => {
                if !secure && path_in(req.path(), &self.config.sensitive_paths) {
                    SecurityEvent::new(
                        SecurityEventKind::InsecureTransport,
                        "sensitive path reached over plain HTTP",
                    )
                    .with_service_request(&req)
                    .record();
                }
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
        }
    }
}

/// TLS on the socket, or `X-Forwarded-Proto: https` from a trusted proxy
pub(crate) fn is_secure(req: &ServiceRequest, trust_proxy: bool) -> bool {
    if trust_proxy {
        let forwarded = req
            .headers()
            .get("X-Forwarded-Proto")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"));
        if let Some(secure) = forwarded {
            return secure;
        }
    }
    req.app_config().secure()
}

fn redirect_location(req: &ServiceRequest, trust_proxy: bool) -> String {
    let requested_host = if trust_proxy {
        req.connection_info().host().to_string()
    } else {
        req.headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    let host = if is_plausible_host(&requested_host) {
        requested_host
    } else {
        req.app_config().host().to_string()
    };

    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("https://{}{}", host, path)
}

fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 255
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, TestRequest};
    use actix_web::{web, App};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[test]
    fn test_from_settings_picks_mode() {
        let mut settings = HttpsSettings::default();
        assert_eq!(HttpsEnforcer::from_settings(&settings, false).mode(), HttpsMode::Advise);

        settings.enabled = true;
        assert_eq!(HttpsEnforcer::from_settings(&settings, false).mode(), HttpsMode::Enforce);
    }

    #[test]
    fn test_plausible_host() {
        assert!(is_plausible_host("example.com"));
        assert!(is_plausible_host("example.com:8443"));
        assert!(is_plausible_host("[::1]:80"));
        assert!(!is_plausible_host("evil.com/path"));
        assert!(!is_plausible_host(""));
    }

    #[actix_web::test]
    async fn test_plain_http_is_redirected() {
        let app = init_service(
            App::new()
                .wrap(HttpsEnforcer::enforce(vec!["/health_check".to_string()], false))
                .route("/api/posts", web::get().to(ok)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/api/posts?page=2")
            .insert_header((header::HOST, "example.com"))
            .to_request();
        let res = call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "https://example.com/api/posts?page=2"
        );
    }

    #[actix_web::test]
    async fn test_excluded_path_passes_over_http() {
        let app = init_service(
            App::new()
                .wrap(HttpsEnforcer::enforce(vec!["/health_check".to_string()], false))
                .route("/health_check", web::get().to(ok)),
        )
        .await;

        let req = TestRequest::get().uri("/health_check").to_request();
        let res = call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());
    }

    #[actix_web::test]
    async fn test_forwarded_https_gets_hsts() {
        let app = init_service(
            App::new()
                .wrap(HttpsEnforcer::enforce(Vec::new(), true))
                .route("/api/posts", web::get().to(ok)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/api/posts")
            .insert_header(("X-Forwarded-Proto", "https"))
            .to_request();
        let res = call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::STRICT_TRANSPORT_SECURITY).unwrap(),
            "max-age=31536000; includeSubDomains"
        );
    }

    #[actix_web::test]
    async fn test_forwarded_proto_ignored_without_trust() {
        let app = init_service(
            App::new()
                .wrap(HttpsEnforcer::enforce(Vec::new(), false))
                .route("/api/posts", web::get().to(ok)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/api/posts")
            .insert_header(("X-Forwarded-Proto", "https"))
            .insert_header((header::HOST, "example.com"))
            .to_request();
        let res = call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    }

    #[actix_web::test]
    async fn test_advisory_mode_never_blocks() {
        let app = init_service(
            App::new()
                .wrap(HttpsEnforcer::advise(vec!["/api/posts".to_string()], false))
                .route("/api/posts", web::get().to(ok)),
        )
        .await;

        let req = TestRequest::get().uri("/api/posts").to_request();
        let res = call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
    }
}
