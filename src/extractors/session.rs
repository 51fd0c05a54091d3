//! Extract the session token from the `session` cookie.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Extractor for the optional session token. Never rejects; a missing cookie is `None`.
#[derive(Clone, Debug)]
pub struct SessionCookie(pub Option<String>);

impl SessionCookie {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let token = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .filter(|s| !s.is_empty());
        SessionCookie(token)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionCookie
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionCookie::from_headers(&parts.headers))
    }
}
