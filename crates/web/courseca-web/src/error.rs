use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courseca_auth_core::AuthError;
use courseca_identity_core::IdentityError;
use courseca_identity_oidc::OidcError;
use courseca_identity_session::SessionError;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Oidc(#[from] OidcError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::Session(_) => StatusCode::UNAUTHORIZED,
            AppError::Oidc(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("Request failed: {}", self);
            return (status, "Internal server error").into_response();
        }

        warn!("Request rejected: {}", self);
        (status, self.to_string()).into_response()
    }
}
