//! Courseca web front: account pages and Google external login.

pub mod config;
pub mod error;
pub mod pages;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::home::home))
        .route(
            "/account/login",
            get(routes::account::login_page).post(routes::account::login_submit),
        )
        .route(
            "/account/register",
            get(routes::account::register_page).post(routes::account::register_submit),
        )
        .route(
            "/account/",
            get(routes::account::account_page).post(routes::account::account_submit),
        )
        .route("/account/logout", get(routes::account::logout_page))
        .route("/extlogin/start/{provider_id}", get(routes::extlogin::start))
        .route("/extlogin/continue", get(routes::extlogin::continue_login))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
