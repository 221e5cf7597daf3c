//! Loading the session from the request cookie and writing it back.

use crate::error::AppError;
use crate::state::AppState;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use courseca_identity_session::Session;
use tracing::error;

pub fn load_session(state: &AppState, jar: &CookieJar) -> Session {
    let cookie = jar.get(state.sessions.cookie_name());
    state.sessions.load(cookie.map(|c| c.value()))
}

/// Turns a handler result into a response, adding the session cookie to the
/// jar when the session changed. Failed requests keep what they consumed.
pub fn respond(
    state: &AppState,
    jar: CookieJar,
    session: &Session,
    result: Result<Response, AppError>,
) -> Response {
    let response = result.into_response();
    if !session.is_modified() {
        return response;
    }

    match state.sessions.cookie(session) {
        Ok(cookie) => (jar.add(cookie), response).into_response(),
        Err(e) => {
            error!("Failed to write session cookie: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// 302 to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
