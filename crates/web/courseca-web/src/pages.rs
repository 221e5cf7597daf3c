//! Minimal server-rendered pages.

use crate::validation::min_birth_date;
use chrono::NaiveDate;
use courseca_identity_core::{ExternalProvider, UserAccount};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{} | Courseca</title></head>\n<body>\n{}\n</body>\n</html>\n",
        text(title),
        body
    )
}

fn error_block(error: Option<&str>) -> String {
    error
        .map(|msg| format!("<p class=\"error\">{}</p>\n", text(msg)))
        .unwrap_or_default()
}

pub fn home(user: Option<&UserAccount>) -> String {
    let body = match user {
        Some(user) => format!(
            "<h1>Welcome back, {}</h1>\n<p><a href=\"/account/\">My account</a> | <a href=\"/account/logout\">Log out</a></p>",
            text(&user.name)
        ),
        None => "<h1>Courseca</h1>\n<p><a href=\"/account/login\">Log in</a> or <a href=\"/account/register\">register</a></p>".to_string(),
    };
    layout("Home", &body)
}

#[derive(Debug, Clone, Default)]
pub struct LoginView {
    pub email_addr: String,
    pub providers: Vec<ExternalProvider>,
    pub error: Option<String>,
}

pub fn login(view: &LoginView) -> String {
    let providers: String = view
        .providers
        .iter()
        .map(|p| {
            format!(
                "<li><a href=\"/extlogin/start/{}\">Log in with {}</a></li>\n",
                p.id,
                text(&p.name)
            )
        })
        .collect();

    let body = format!(
        "<h1>Log in</h1>\n{error}<form method=\"post\" action=\"/account/login\">\n\
         <input type=\"email\" name=\"email_addr\" value=\"{email}\">\n\
         <input type=\"password\" name=\"password\">\n\
         <button type=\"submit\">Log in</button>\n</form>\n<ul class=\"external-providers\">\n{providers}</ul>",
        error = error_block(view.error.as_deref()),
        email = attr(&view.email_addr),
        providers = providers,
    );
    layout("Log in", &body)
}

/// Registration form. Fields handed over by an external login are locked.
#[derive(Debug, Clone)]
pub struct RegisterView {
    pub name: String,
    pub name_locked: bool,
    pub email_addr: String,
    pub email_addr_locked: bool,
    pub birth_date: String,
    pub max_date: NaiveDate,
    pub error: Option<String>,
}

fn status_attr(locked: bool) -> &'static str {
    if locked { " disabled" } else { "" }
}

pub fn register(view: &RegisterView) -> String {
    let body = format!(
        "<h1>Register</h1>\n{error}<form method=\"post\" action=\"/account/register\">\n\
         <input type=\"text\" name=\"name\" value=\"{name}\"{name_status}>\n\
         <input type=\"email\" name=\"email_addr\" value=\"{email}\"{email_status}>\n\
         <input type=\"password\" name=\"password\">\n\
         <input type=\"date\" name=\"birth_date\" value=\"{birth_date}\" min=\"{min_date}\" max=\"{max_date}\">\n\
         <button type=\"submit\">Register</button>\n</form>",
        error = error_block(view.error.as_deref()),
        name = attr(&view.name),
        name_status = status_attr(view.name_locked),
        email = attr(&view.email_addr),
        email_status = status_attr(view.email_addr_locked),
        birth_date = attr(&view.birth_date),
        min_date = min_birth_date(),
        max_date = view.max_date,
    );
    layout("Register", &body)
}

#[derive(Debug, Clone, Default)]
pub struct AccountView {
    pub name: String,
    pub email_addr: String,
    pub error: Option<String>,
}

/// Account page: change email and password, confirmed by the current one.
pub fn account(view: &AccountView) -> String {
    let body = format!(
        "<h1>{name}</h1>\n{error}<form method=\"post\" action=\"/account/\">\n\
         <input type=\"email\" name=\"email_addr\" value=\"{email}\">\n\
         <input type=\"password\" name=\"new_password\">\n\
         <input type=\"password\" name=\"current_password\" required>\n\
         <button type=\"submit\">Save</button>\n</form>",
        name = text(&view.name),
        error = error_block(view.error.as_deref()),
        email = attr(&view.email_addr),
    );
    layout("Account", &body)
}
