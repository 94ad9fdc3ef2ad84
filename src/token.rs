use std::fmt;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::error::ApiError;

/// Request header carrying the caller's Brightdata token.
pub const API_TOKEN_HEADER: &str = "apitoken";

const BEARER_PREFIX: &str = "Bearer ";

/// The caller's Brightdata token, already in `Authorization` header form.
///
/// Extracting it from a request fails with [`ApiError::MissingToken`] when the
/// header is absent or blank, so handlers that take an `ApiToken` never reach
/// the upstream without one.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn from_raw(raw: Option<&str>) -> Result<Self, ApiError> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());
        match raw {
            None => Err(ApiError::MissingToken),
            Some(token) if token.starts_with(BEARER_PREFIX) => Ok(ApiToken(token.to_string())),
            Some(token) => Ok(ApiToken(format!("{BEARER_PREFIX}{token}"))),
        }
    }

    pub fn authorization(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

impl FromRequest for ApiToken {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let raw = req
            .headers()
            .get(API_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        ready(ApiToken::from_raw(raw))
    }
}
