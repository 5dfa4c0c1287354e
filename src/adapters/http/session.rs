//! Session cookies and the authenticated-caller extractor.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use tracing::warn;

use super::AppState;
use crate::domain::ServiceError;
use crate::domain::identity::Identity;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Caller identity decoded from a verified access token.
///
/// The token comes from `Authorization: Bearer` first, then the
/// `access_token` cookie.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_value(&parts.headers, ACCESS_COOKIE))
            .ok_or_else(|| ServiceError::unauthorized("missing access token"))?;
        state.tokens.verify_access_token(token).map(AuthUser)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    raw.strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// First value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value for an HttpOnly, SameSite=Lax session cookie.
/// A negative `max_age` expires the cookie immediately.
///
/// Fails with `Internal` if the value holds bytes a header cannot carry.
pub fn session_cookie(
    name: &str,
    value: &str,
    max_age: i64,
    secure: bool,
) -> Result<HeaderValue, ServiceError> {
    let max_age = max_age.max(0);
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| {
        warn!(cookie = name, error = %e, "Session cookie is not a valid header value");
        ServiceError::internal("could not encode session cookie")
    })
}

/// Expire a session cookie.
pub fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, ServiceError> {
    session_cookie(name, "", -1, secure)
}
