//! Form field rules for the account pages.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Earliest accepted birth date.
pub fn min_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1920, 1, 1).unwrap_or(NaiveDate::MIN)
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
    )
    .expect("EMAIL_RE is a valid regex pattern")
});

static PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-zA-Z$#?!.]{3,10}$").expect("PASSWORD_RE is a valid regex pattern")
});

/// At least two words, each alphabetic and at least two letters long.
pub fn is_valid_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split_whitespace().collect();
    parts.len() >= 2
        && parts
            .iter()
            .all(|part| part.chars().count() >= 2 && part.chars().all(char::is_alphabetic))
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    PASSWORD_RE.is_match(password)
}

/// ISO `YYYY-MM-DD` date between [`min_birth_date`] and `today`.
pub fn parse_birth_date(value: &str, today: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .filter(|date| (min_birth_date()..=today).contains(date))
}
