/// CSRF Verification Middleware
///
/// State-changing requests (anything but GET/HEAD/OPTIONS) must carry the
/// session's current token in `X-CSRF-Token`. Exempt paths are public
/// endpoints with no session. Failures answer 403 `CSRF_VALIDATION_FAILED`
/// and are recorded as security events; the request never proceeds.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use super::path_in;
use crate::audit::{SecurityEvent, SecurityEventKind};
use crate::csrf::{is_state_changing, resolve_session_id, CsrfProtection, CSRF_HEADER};
use crate::error::AppError;

pub struct CsrfMiddleware {
    protection: Arc<CsrfProtection>,
    exempt_paths: Arc<Vec<String>>,
}

impl CsrfMiddleware {
    pub fn new(protection: Arc<CsrfProtection>, exempt_paths: Vec<String>) -> Self {
        Self {
            protection,
            exempt_paths: Arc::new(exempt_paths),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CsrfMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CsrfMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(CsrfMiddlewareService {
            service: Rc::new(service),
            protection: Arc::clone(&self.protection),
            exempt_paths: Arc::clone(&self.exempt_paths),
        }))
    }
}

pub struct CsrfMiddlewareService<S> {
    service: Rc<S>,
    protection: Arc<CsrfProtection>,
    exempt_paths: Arc<Vec<String>>,
}

impl<S> CsrfMiddlewareService<S> {
    /// `Err` carries the reason for the audit log
    fn check(&self, req: &ServiceRequest) -> Result<(), &'static str> {
        let session_id = resolve_session_id(req.request()).ok_or("no session")?;

        let token = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or("missing token header")?;

        if self.protection.verify(&session_id, token) {
            Ok(())
        } else {
            Err("token mismatch or expired")
        }
    }
}

impl<S, B> Service<ServiceRequest> for CsrfMiddlewareService<S>
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
        let needs_check =
            is_state_changing(req.method()) && !path_in(req.path(), &self.exempt_paths);

        if needs_check {
            if let Err(reason) = self.check(&req) {
                SecurityEvent::new(SecurityEventKind::CsrfValidationFailed, reason)
                    .with_service_request(&req)
                    .record();

                let response = req
                    .error_response(AppError::CsrfValidationFailed)
                    .map_into_right_body();
                return Box::pin(async move { Ok(response) });
            }
        }

        let service = self.service.clone();
        Box::pin(async move {
            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}
