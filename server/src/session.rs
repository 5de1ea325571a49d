//! Session middleware: every route except the public ones needs a valid
//! session cookie.

use axum::extract::{Request, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use chrono::Utc;

use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";

/// Whether the request carries a live session cookie.
pub fn has_session(state: &AppState, jar: &CookieJar) -> bool {
    jar.get(&state.gate.cookie().name)
        .map(|cookie| state.gate.validate(cookie.value(), Utc::now()))
        .unwrap_or(false)
}

/// Sends requests without a session to the login page.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if has_session(&state, &jar) {
        return next.run(request).await;
    }
    tracing::debug!(path = %request.uri().path(), "no session, redirecting to login");
    see_other(LOGIN_PATH)
}

/// 303 to `location`.
pub fn see_other(location: &'static str) -> Response {
    (StatusCode::SEE_OTHER, [(LOCATION, HeaderValue::from_static(location))]).into_response()
}

/// 303 to `location` carrying a `Set-Cookie` header.
pub fn see_other_with_cookie(location: &'static str, cookie: &str) -> Response {
    let mut response = see_other(location);
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().insert(SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "session cookie is not a valid header value"),
    }
    response
}
