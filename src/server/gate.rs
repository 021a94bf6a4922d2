//! Request guard for every page except `/login`.
//!
//! `Authenticated` can only be obtained by extracting it from a request whose
//! session cookie verifies and names a live registry entry. Anything else is
//! turned into a redirect to `/login` (clearing the cookie if one was sent).

use axum::extract::FromRequestParts;
use axum::http::header::{self, InvalidHeaderValue};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;
use tracing::debug;

use super::AppState;
use crate::identity::{SessionError, SessionHandle, TokenError};

pub const SESSION_COOKIE: &str = "reportnav_session";

const CLEARED_COOKIE: &str =
    "reportnav_session=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; SameSite=Lax; Path=/";

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(header::COOKIE) {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
    }
    None
}

pub fn session_cookie(token: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut s = format!("{}={}; HttpOnly; SameSite=Lax; Path=/", SESSION_COOKIE, token);
    if secure { s.push_str("; Secure"); }
    HeaderValue::from_str(&s)
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(CLEARED_COOKIE)
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("no session cookie")]
    NoToken,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Resolve the caller's live session from the request headers.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<SessionHandle, GateError> {
    let raw = parse_cookie(headers, SESSION_COOKIE).ok_or(GateError::NoToken)?;
    let claims = state.tokens.verify(&raw)?;
    Ok(state.registry.resolve(&claims.identity, &claims.session_id)?)
}

/// Proof that the request belongs to a logged-in identity.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub session: SessionHandle,
}

impl Authenticated {
    pub fn identity(&self) -> &str {
        self.session.identity()
    }
}

#[derive(Debug)]
pub struct LoginRedirect {
    clear_cookie: bool,
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        let to_login = Redirect::to("/login");
        if self.clear_cookie {
            ([(header::SET_COOKIE, clear_session_cookie())], to_login).into_response()
        } else {
            to_login.into_response()
        }
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match authenticate(state, &parts.headers) {
            Ok(session) => Ok(Authenticated { session }),
            Err(e) => {
                debug!(path = %parts.uri.path(), reason = %e, "unauthenticated request");
                Err(LoginRedirect { clear_cookie: !matches!(e, GateError::NoToken) })
            }
        }
    }
}
