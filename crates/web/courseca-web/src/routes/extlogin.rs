//! `/extlogin` endpoints: start and continue an OpenID Connect login.

use crate::error::AppError;
use crate::session::{found, load_session, respond};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum_extra::extract::CookieJar;
use courseca_auth_core::require_unauthenticated;
use courseca_identity_core::ProviderId;
use courseca_identity_oidc::{CallbackParams, LoginOutcome, OidcError};
use courseca_identity_session::Session;

pub async fn start(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(provider_id): Path<String>,
) -> Response {
    let mut session = load_session(&state, &jar);
    let result = start_login(&state, provider_id, &mut session).await;
    respond(&state, jar, &session, result)
}

async fn start_login(
    state: &AppState,
    provider_id: String,
    session: &mut Session,
) -> Result<Response, AppError> {
    require_unauthenticated(session)?;
    let provider_id: ProviderId = provider_id
        .parse()
        .map_err(|_| OidcError::MalformedProviderId(provider_id))?;
    let url = state.flow.start(provider_id, session).await?;
    Ok(found(&url))
}

pub async fn continue_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut session = load_session(&state, &jar);
    let result = finish_login(&state, &params, &mut session).await;
    respond(&state, jar, &session, result)
}

async fn finish_login(
    state: &AppState,
    params: &CallbackParams,
    session: &mut Session,
) -> Result<Response, AppError> {
    require_unauthenticated(session)?;

    let identity = state.flow.continue_flow(params, session).await?;
    let outcome = state.flow.complete_login(&identity, session).await?;

    Ok(match outcome {
        LoginOutcome::Authenticated { .. } => found("/"),
        LoginOutcome::RegistrationRequired { .. } => found("/account/register"),
    })
}
