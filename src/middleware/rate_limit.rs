/// Rate Limiting Middleware
///
/// Checks the client's sliding window in the injected `RateLimiter` store and
/// answers 429 with `{message, code, retryAfter}` plus a `Retry-After` header
/// once the route group's ceiling is reached.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use super::client_identifier;
use crate::configuration::RateLimitRule;
use crate::error::AppError;
use crate::log_sanitizer::Sanitized;
use crate::rate_limiter::{RateDecision, RateLimiter};

/// Rate limiting for one route group; groups keep separate windows per client
pub struct RateLimitMiddleware {
    group: &'static str,
    limiter: Arc<RateLimiter>,
    rule: RateLimitRule,
    trust_proxy: bool,
}

impl RateLimitMiddleware {
    pub fn new(group: &'static str, limiter: Arc<RateLimiter>, rule: RateLimitRule) -> Self {
        Self {
            group,
            limiter,
            rule,
            trust_proxy: false,
        }
    }

    /// Key clients by the forwarded address instead of the socket peer
    pub fn trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            group: self.group,
            limiter: Arc::clone(&self.limiter),
            rule: self.rule,
            trust_proxy: self.trust_proxy,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    group: &'static str,
    limiter: Arc<RateLimiter>,
    rule: RateLimitRule,
    trust_proxy: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
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
        let client = client_identifier(&req, self.trust_proxy);
        let key = format!("{}:{}", self.group, client);

        match self
            .limiter
            .check(&key, self.rule.window_ms, self.rule.max_requests)
        {
            RateDecision::Allow => {
                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            RateDecision::Deny { retry_after_secs } => {
                tracing::debug!(
                    group = self.group,
                    client = %Sanitized(&client),
                    path = %Sanitized(req.path()),
                    retry_after = retry_after_secs,
                    "Rate limit exceeded"
                );
                let response = req
                    .error_response(AppError::RateLimitExceeded { retry_after_secs })
                    .map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
