//! `/account` pages: local login, registration, account maintenance and
//! logout.

use crate::error::AppError;
use crate::pages::{self, AccountView, LoginView, RegisterView};
use crate::session::{found, load_session, respond};
use crate::state::AppState;
use crate::validation::{is_valid_email, is_valid_name, is_valid_password, parse_birth_date};
use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use chrono::{Local, NaiveDate};
use courseca_auth_core::{
    AuthError, SessionStore, login, logout, require_authenticated, require_unauthenticated,
};
use courseca_identity_core::{AccountUpdate, IdentityError, NewAccount, UserAccount, UserId};
use courseca_identity_oidc::{EMAIL_ADDR_KEY, NAME_KEY};
use courseca_identity_session::Session;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email_addr: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email_addr: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub birth_date: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    pub email_addr: String,
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Marks the session as logged in and sends the browser home.
pub fn exec_login(session: &mut Session, user_id: UserId) -> Response {
    login(session, user_id);
    found("/")
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn handed_over(session: &Session, key: &str) -> Option<String> {
    session
        .get(key)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = load_session(&state, &jar);
    let result = render_login(&state, &session).await;
    respond(&state, jar, &session, result)
}

async fn render_login(state: &AppState, session: &Session) -> Result<Response, AppError> {
    require_unauthenticated(session)?;
    let view = LoginView {
        providers: state.providers.list_active().await?,
        ..LoginView::default()
    };
    Ok(Html(pages::login(&view)).into_response())
}

pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut session = load_session(&state, &jar);
    let result = local_login(&state, form, &mut session).await;
    respond(&state, jar, &session, result)
}

async fn local_login(
    state: &AppState,
    form: LoginForm,
    session: &mut Session,
) -> Result<Response, AppError> {
    require_unauthenticated(session)?;

    let email = form.email_addr.trim().to_string();
    let (status, message) = if !is_valid_email(&email) {
        (StatusCode::UNPROCESSABLE_ENTITY, "Invalid email address!")
    } else if !is_valid_password(&form.password) {
        (StatusCode::UNPROCESSABLE_ENTITY, "Invalid password!")
    } else {
        match state.users.authenticate(&email, &form.password).await {
            Ok(user) => {
                info!(user_id = user.user_id, "Local login");
                return Ok(exec_login(session, user.user_id));
            }
            Err(IdentityError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, "Invalid user or password!")
            }
            Err(e) => return Err(e.into()),
        }
    };

    let view = LoginView {
        email_addr: email,
        providers: state.providers.list_active().await?,
        error: Some(message.to_string()),
    };
    Ok((status, Html(pages::login(&view))).into_response())
}

pub async fn register_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = load_session(&state, &jar);
    let result = render_register(&session);
    respond(&state, jar, &session, result)
}

/// Registration view-model, pre-filled from an external login hand-off.
pub fn register_view(session: &Session) -> RegisterView {
    let name = handed_over(session, NAME_KEY);
    let email_addr = handed_over(session, EMAIL_ADDR_KEY);

    RegisterView {
        name_locked: name.is_some(),
        name: name.unwrap_or_default(),
        email_addr_locked: email_addr.is_some(),
        email_addr: email_addr.unwrap_or_default(),
        birth_date: String::new(),
        max_date: today(),
        error: None,
    }
}

fn rejected_registration(view: &RegisterView) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(pages::register(view))).into_response()
}

fn render_register(session: &Session) -> Result<Response, AppError> {
    require_unauthenticated(session)?;
    Ok(Html(pages::register(&register_view(session))).into_response())
}

pub async fn register_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    let mut session = load_session(&state, &jar);
    let result = register(&state, form, &mut session).await;
    respond(&state, jar, &session, result)
}

async fn register(
    state: &AppState,
    form: RegisterForm,
    session: &mut Session,
) -> Result<Response, AppError> {
    require_unauthenticated(session)?;

    // Values handed over by an external login win over the form.
    let mut view = register_view(session);
    if !view.name_locked {
        view.name = form.name.trim().to_string();
    }
    if !view.email_addr_locked {
        view.email_addr = form.email_addr.trim().to_string();
    }
    view.birth_date = form.birth_date.trim().to_string();

    let birth_date = parse_birth_date(&view.birth_date, view.max_date);
    let error = if !is_valid_name(&view.name) {
        Some("Invalid name!".to_string())
    } else if !is_valid_email(&view.email_addr) {
        Some("Invalid email address!".to_string())
    } else if !is_valid_password(&form.password) {
        Some("Invalid password!".to_string())
    } else if birth_date.is_none() {
        Some("Invalid birth date!".to_string())
    } else if state.users.find_by_email(&view.email_addr).await?.is_some() {
        Some(format!("Email address {} already exists!", view.email_addr))
    } else {
        None
    };

    let birth_date = match (error, birth_date) {
        (None, Some(birth_date)) => birth_date,
        (error, _) => {
            view.error = error;
            return Ok(rejected_registration(&view));
        }
    };

    let account = NewAccount {
        name: view.name.clone(),
        email: view.email_addr.clone(),
        password: form.password,
        birth_date,
    };
    let created = match state.users.create_account(account).await {
        Ok(created) => created,
        Err(IdentityError::DuplicateEmail(email)) => {
            view.error = Some(format!("Email address {email} already exists!"));
            return Ok(rejected_registration(&view));
        }
        Err(e) => return Err(e.into()),
    };

    session.remove(EMAIL_ADDR_KEY);
    session.remove(NAME_KEY);
    info!(user_id = created.user_id, "Registered new student");
    Ok(exec_login(session, created.user_id))
}

pub async fn logout_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = load_session(&state, &jar);
    let result = end_session(&mut session);
    respond(&state, jar, &session, result)
}

fn end_session(session: &mut Session) -> Result<Response, AppError> {
    require_authenticated(session)?;
    if let Some(user_id) = logout(session) {
        info!(user_id, "Logged out");
    }
    Ok(found("/"))
}

async fn current_account(state: &AppState, session: &Session) -> Result<UserAccount, AppError> {
    let user_id = require_authenticated(session)?;
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AuthError::AuthenticationRequired.into())
}

pub async fn account_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = load_session(&state, &jar);
    let result = render_account(&state, &session).await;
    respond(&state, jar, &session, result)
}

async fn render_account(state: &AppState, session: &Session) -> Result<Response, AppError> {
    let account = current_account(state, session).await?;
    let view = AccountView {
        name: account.name,
        email_addr: account.email,
        error: None,
    };
    Ok(Html(pages::account(&view)).into_response())
}

pub async fn account_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AccountForm>,
) -> Response {
    let session = load_session(&state, &jar);
    let result = update_account(&state, form, &session).await;
    respond(&state, jar, &session, result)
}

async fn update_account(
    state: &AppState,
    form: AccountForm,
    session: &Session,
) -> Result<Response, AppError> {
    let account = current_account(state, session).await?;

    let email_addr = form.email_addr.trim().to_string();
    let update = AccountUpdate {
        current_password: form.current_password.trim().to_string(),
        new_email: Some(email_addr.clone()).filter(|e| !e.is_empty() && *e != account.email),
        new_password: Some(form.new_password.trim().to_string()).filter(|p| !p.is_empty()),
    };

    let (status, message) = match check_account_update(state, &account, &update).await? {
        Some(rejection) => rejection,
        None => match state.users.update_account(account.user_id, update).await {
            Ok(updated) => {
                info!(user_id = updated.user_id, "Updated account");
                return Ok(found("/"));
            }
            Err(IdentityError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, "Invalid password!".to_string())
            }
            Err(IdentityError::DuplicateEmail(email)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Email address {email} already exists!"),
            ),
            Err(e) => return Err(e.into()),
        },
    };

    let view = AccountView {
        name: account.name,
        email_addr,
        error: Some(message),
    };
    Ok((status, Html(pages::account(&view))).into_response())
}

/// First rule `update` breaks, in the order the page reports them.
async fn check_account_update(
    state: &AppState,
    account: &UserAccount,
    update: &AccountUpdate,
) -> Result<Option<(StatusCode, String)>, AppError> {
    match state
        .users
        .authenticate(&account.email, &update.current_password)
        .await
    {
        Ok(_) => {}
        Err(IdentityError::InvalidCredentials) => {
            return Ok(Some((StatusCode::UNAUTHORIZED, "Invalid password!".to_string())));
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(email) = &update.new_email {
        if !is_valid_email(email) {
            return Ok(Some((
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid email address {email}!"),
            )));
        }
        if state.users.find_by_email(email).await?.is_some() {
            return Ok(Some((
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Email address {email} already exists!"),
            )));
        }
    }

    if let Some(password) = &update.new_password {
        if !is_valid_password(password) {
            return Ok(Some((
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid new password!".to_string(),
            )));
        }
        if *password == update.current_password {
            return Ok(Some((
                StatusCode::UNPROCESSABLE_ENTITY,
                "New password is the same as the current one!".to_string(),
            )));
        }
    }

    Ok(None)
}
