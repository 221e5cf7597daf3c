use crate::error::AppError;
use crate::pages;
use crate::session::{load_session, respond};
use crate::state::AppState;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use courseca_auth_core::current_user_id;
use courseca_identity_session::Session;

pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = load_session(&state, &jar);
    let result = render_home(&state, &session).await;
    respond(&state, jar, &session, result)
}

async fn render_home(state: &AppState, session: &Session) -> Result<Response, AppError> {
    let user = match current_user_id(session) {
        Some(user_id) => state.users.find_by_id(user_id).await?,
        None => None,
    };
    Ok(Html(pages::home(user.as_ref())).into_response())
}
