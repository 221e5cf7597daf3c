use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use courseca_identity_core::{
    AccountUpdate, ExternalLoginLink, IdentityError, IdentityResult, NewAccount, ProviderId, UserAccount,
    UserDirectory, UserId,
};
use rand_core::OsRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info};

/// Ids handed out to new students start here.
pub const FIRST_STUDENT_ID: UserId = 5000;

// Real Argon2 hash of "dummy_password", verified when the email is unknown
// so both failure paths cost the same.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$9QsJRKgzJkKaOUvlp7gl2Q$qmE3qIFBNJ6nZYbLYXEI2uo0zZc7T0Q8LU1ZsqsZ3QE";

#[derive(Debug, Clone)]
struct StoredStudent {
    account: UserAccount,
    password_hash: String,
}

#[derive(Debug)]
struct DirectoryData {
    students: HashMap<UserId, StoredStudent>,
    external_logins: Vec<ExternalLoginLink>,
    next_id: UserId,
}

impl DirectoryData {
    fn by_email(&self, email: &str) -> Option<&StoredStudent> {
        let wanted = normalize_email(email);
        self.students
            .values()
            .find(|s| normalize_email(&s.account.email) == wanted)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> IdentityResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::PasswordHash(e.to_string()))
}

fn password_matches(password_hash: &str, password: &str) -> IdentityResult<bool> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| IdentityError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Student accounts plus the external logins linked to them.
#[derive(Clone)]
pub struct StudentDirectory {
    data: Arc<RwLock<DirectoryData>>,
    semaphore: Arc<Semaphore>,
}

impl StudentDirectory {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(DirectoryData {
                students: HashMap::new(),
                external_logins: Vec::new(),
                next_id: FIRST_STUDENT_ID,
            })),
            semaphore: Arc::new(Semaphore::new(5)),
        }
    }

    /// Inserts a student with a fixed id, for seeding.
    ///
    /// Later ids continue after the highest one seen.
    pub async fn insert_student(
        &self,
        user_id: UserId,
        name: &str,
        email: &str,
        password: &str,
        birth_date: NaiveDate,
    ) -> IdentityResult<UserAccount> {
        let password_hash = hash_password(password)?;
        let mut data = self.data.write().await;

        if data.by_email(email).is_some() {
            return Err(IdentityError::DuplicateEmail(email.to_string()));
        }
        if data.students.contains_key(&user_id) {
            return Err(IdentityError::Storage(format!(
                "student id {user_id} already in use"
            )));
        }

        let account = UserAccount {
            user_id,
            name: name.to_string(),
            email: email.trim().to_string(),
            birth_date,
        };
        data.students.insert(
            user_id,
            StoredStudent {
                account: account.clone(),
                password_hash,
            },
        );
        data.next_id = data.next_id.max(user_id + 1);

        Ok(account)
    }

    /// Snapshot of every stored link.
    pub async fn external_logins(&self) -> Vec<ExternalLoginLink> {
        self.data.read().await.external_logins.clone()
    }
}

impl Default for StudentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for StudentDirectory {
    async fn find_by_id(&self, user_id: UserId) -> IdentityResult<Option<UserAccount>> {
        let data = self.data.read().await;
        Ok(data.students.get(&user_id).map(|s| s.account.clone()))
    }

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<UserAccount>> {
        let data = self.data.read().await;
        Ok(data.by_email(email).map(|s| s.account.clone()))
    }

    async fn find_by_external_id(
        &self,
        provider_id: ProviderId,
        external_subject_id: &str,
    ) -> IdentityResult<Option<UserAccount>> {
        let data = self.data.read().await;
        let user = data
            .external_logins
            .iter()
            .find(|l| l.provider_id == provider_id && l.external_subject_id == external_subject_id)
            .and_then(|l| data.students.get(&l.user_id))
            .map(|s| s.account.clone());
        Ok(user)
    }

    async fn find_external_link(
        &self,
        user_id: UserId,
        provider_id: ProviderId,
    ) -> IdentityResult<Option<ExternalLoginLink>> {
        let data = self.data.read().await;
        Ok(data
            .external_logins
            .iter()
            .find(|l| l.user_id == user_id && l.provider_id == provider_id)
            .cloned())
    }

    async fn add_external_login(&self, link: ExternalLoginLink) -> IdentityResult<()> {
        let mut data = self.data.write().await;

        if !data.students.contains_key(&link.user_id) {
            return Err(IdentityError::UserNotFound(link.user_id));
        }
        if data
            .external_logins
            .iter()
            .any(|l| l.user_id == link.user_id && l.provider_id == link.provider_id)
        {
            return Err(IdentityError::DuplicateExternalLogin(format!(
                "user {} already has a login for provider {}",
                link.user_id, link.provider_id
            )));
        }
        if data
            .external_logins
            .iter()
            .any(|l| l.external_subject_id == link.external_subject_id)
        {
            return Err(IdentityError::DuplicateExternalLogin(format!(
                "subject {} is already linked",
                link.external_subject_id
            )));
        }

        info!(
            user_id = link.user_id,
            provider_id = link.provider_id,
            "Linked external login"
        );
        data.external_logins.push(link);
        Ok(())
    }

    async fn create_account(&self, account: NewAccount) -> IdentityResult<UserAccount> {
        let password_hash = hash_password(&account.password)?;
        let mut data = self.data.write().await;

        if data.by_email(&account.email).is_some() {
            return Err(IdentityError::DuplicateEmail(account.email));
        }

        let user_id = data.next_id;
        data.next_id += 1;

        let created = UserAccount {
            user_id,
            name: account.name,
            email: account.email.trim().to_string(),
            birth_date: account.birth_date,
        };
        data.students.insert(
            user_id,
            StoredStudent {
                account: created.clone(),
                password_hash,
            },
        );

        info!(user_id, "Created student account");
        Ok(created)
    }

    async fn authenticate(&self, email: &str, password: &str) -> IdentityResult<UserAccount> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| IdentityError::Storage(e.to_string()))?;
        let data = self.data.read().await;

        let student = data.by_email(email);
        let password_hash = student.map_or(DUMMY_HASH, |s| s.password_hash.as_str());

        let password_valid = password_matches(password_hash, password)?;

        match student {
            Some(student) if password_valid => Ok(student.account.clone()),
            _ => {
                debug!("Rejected password login");
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    async fn update_account(
        &self,
        user_id: UserId,
        update: AccountUpdate,
    ) -> IdentityResult<UserAccount> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| IdentityError::Storage(e.to_string()))?;
        let new_hash = update
            .new_password
            .as_deref()
            .map(hash_password)
            .transpose()?;
        let mut data = self.data.write().await;

        let stored = data
            .students
            .get(&user_id)
            .ok_or(IdentityError::UserNotFound(user_id))?;
        if !password_matches(&stored.password_hash, &update.current_password)? {
            debug!(user_id, "Rejected account update");
            return Err(IdentityError::InvalidCredentials);
        }
        if let Some(email) = &update.new_email {
            if data
                .by_email(email)
                .is_some_and(|owner| owner.account.user_id != user_id)
            {
                return Err(IdentityError::DuplicateEmail(email.clone()));
            }
        }

        let stored = data
            .students
            .get_mut(&user_id)
            .ok_or(IdentityError::UserNotFound(user_id))?;
        if let Some(email) = update.new_email {
            stored.account.email = email.trim().to_string();
        }
        if let Some(password_hash) = new_hash {
            stored.password_hash = password_hash;
        }

        info!(user_id, "Updated student account");
        Ok(stored.account.clone())
    }
}
