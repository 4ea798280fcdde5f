/// Request body extractors
///
/// `SanitizedJson<T>` parses the JSON body, HTML-escapes every string value
/// with the input sanitizer, then deserializes into `T`. Handlers therefore
/// only ever see escaped text. Body size and syntax errors go through the
/// `JsonConfig` error handler installed at startup.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::ops::Deref;

use crate::error::{AppError, ValidationError};
use crate::input_sanitizer::sanitize_object;

#[derive(Debug)]
pub struct SanitizedJson<T>(pub T);

impl<T> SanitizedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for SanitizedJson<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> FromRequest for SanitizedJson<T>
where
    T: DeserializeOwned + 'static,
{
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let body = web::Json::<Value>::from_request(req, payload);

        Box::pin(async move {
            let raw = body.await?.into_inner();
            let sanitized = sanitize_object(&raw);

            let value = serde_json::from_value::<T>(sanitized).map_err(|e| {
                AppError::Validation(ValidationError::MalformedBody(e.to_string()))
            })?;
            Ok::<_, actix_web::Error>(SanitizedJson(value))
        })
    }
}

/// Maps JSON payload failures onto the application error codes
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    use actix_web::error::JsonPayloadError;

    match err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            AppError::PayloadTooLarge.into()
        }
        other => AppError::Validation(ValidationError::MalformedBody(other.to_string())).into(),
    }
}

pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
}
