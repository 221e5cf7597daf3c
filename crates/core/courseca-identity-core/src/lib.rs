//! Core identity types and the collaborator traits the login flows consume.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = i64;
pub type ProviderId = i64;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Email address already registered: {0}")]
    DuplicateEmail(String),

    #[error("External login already linked: {0}")]
    DuplicateExternalLogin(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Family of external identity provider. Only Google-compatible OpenID
/// Connect providers are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
}

/// Reference record for an external login provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProvider {
    pub id: ProviderId,
    pub name: String,
    pub kind: ProviderKind,
    pub end_point_url: String,
    pub active: bool,
}

/// Identity asserted by a provider after every identity-token check passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedIdentity {
    pub provider_id: ProviderId,
    /// The provider's `sub` claim: at most 255 ASCII characters.
    pub external_subject_id: String,
    pub email: String,
}

/// A local student account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub birth_date: NaiveDate,
}

/// Data needed to open a new local account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub birth_date: NaiveDate,
}

/// Changes a student asks for on the account page. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub current_password: String,
    pub new_email: Option<String>,
    pub new_password: Option<String>,
}

/// Association between a local user and a provider-side subject.
///
/// Unique per `(user_id, provider_id)` and per `external_subject_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLoginLink {
    pub user_id: UserId,
    pub provider_id: ProviderId,
    pub external_subject_id: String,
}

/// Maps identities to local accounts and keeps their external-login links.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: UserId) -> IdentityResult<Option<UserAccount>>;

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<UserAccount>>;

    /// Looks up the user linked to `external_subject_id` at `provider_id`.
    async fn find_by_external_id(
        &self,
        provider_id: ProviderId,
        external_subject_id: &str,
    ) -> IdentityResult<Option<UserAccount>>;

    async fn find_external_link(
        &self,
        user_id: UserId,
        provider_id: ProviderId,
    ) -> IdentityResult<Option<ExternalLoginLink>>;

    /// Stores a new link. Fails with [`IdentityError::DuplicateExternalLogin`]
    /// when either uniqueness rule would be broken.
    async fn add_external_login(&self, link: ExternalLoginLink) -> IdentityResult<()>;

    /// Opens an account. Fails with [`IdentityError::DuplicateEmail`] when the
    /// email is taken.
    async fn create_account(&self, account: NewAccount) -> IdentityResult<UserAccount>;

    async fn authenticate(&self, email: &str, password: &str) -> IdentityResult<UserAccount>;

    /// Applies `update` after checking the current password. Fails with
    /// [`IdentityError::InvalidCredentials`] on a wrong password and with
    /// [`IdentityError::DuplicateEmail`] when the new email belongs to
    /// someone else.
    async fn update_account(
        &self,
        user_id: UserId,
        update: AccountUpdate,
    ) -> IdentityResult<UserAccount>;
}

/// Lookup of external provider records.
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Returns the provider only if it exists and is active.
    async fn find_active(&self, provider_id: ProviderId) -> IdentityResult<Option<ExternalProvider>>;

    async fn list_active(&self) -> IdentityResult<Vec<ExternalProvider>>;
}
