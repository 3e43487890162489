//! Per-browser identity carried in a cookie.

use crate::error::GameResult;
use crate::random;
use crate::types::Identity;
use axum::http::{header, HeaderMap, HeaderValue};

pub const IDENTITY_COOKIE: &str = "partybox_id";

/// Identity from the request's cookies, if it carries a non-empty one
pub fn from_headers(headers: &HeaderMap) -> Option<Identity> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == IDENTITY_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value binding `identity` to this browser
pub fn set_cookie(identity: &str) -> Option<HeaderValue> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        IDENTITY_COOKIE, identity
    );
    HeaderValue::from_str(&cookie).ok()
}

/// Identity for this request, plus the headers to send back when a new
/// one had to be issued
pub fn resolve(headers: &HeaderMap) -> GameResult<(Identity, HeaderMap)> {
    let mut response_headers = HeaderMap::new();

    if let Some(identity) = from_headers(headers) {
        return Ok((identity, response_headers));
    }

    let identity = random::identity_token()?;
    if let Some(value) = set_cookie(&identity) {
        response_headers.insert(header::SET_COOKIE, value);
    }
    tracing::debug!(identity = %identity, "Issued new identity");
    Ok((identity, response_headers))
}
