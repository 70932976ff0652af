//! Identity provider boundary: email/password and single sign-on accounts.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use argon2::Argon2;
use async_trait::async_trait;
use log::info;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use serde::{Deserialize, Serialize};

use crate::{errors::AuthError, id::generate_document_id, validators::is_valid_email};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// An authenticated account as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Claims returned by a single sign-on flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoAssertion {
    /// Stable subject identifier issued by the SSO provider.
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Signs in through SSO, creating the account on first use.
    async fn sign_in_with_sso(&self, assertion: &SsoAssertion) -> Result<Identity, AuthError>;

    async fn update_profile(
        &self,
        uid: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Identity, AuthError>;

    async fn sign_out(&self, uid: &str) -> Result<(), AuthError>;
}

struct Account {
    identity: Identity,
    credential: Option<PasswordDigest>,
}

/// An argon2id hash in PHC string form.
struct PasswordDigest(String);

impl PasswordDigest {
    fn new(password: &str) -> Result<Self, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|err| AuthError::Provider {
                message: format!("could not hash password: {err}"),
            })
    }

    fn verify(&self, password: &str) -> bool {
        match PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

#[derive(Default)]
struct Accounts {
    by_uid: HashMap<String, Account>,
    uid_by_email: HashMap<String, String>,
    uid_by_subject: HashMap<String, String>,
}

/// In-process identity provider. Clones share the same accounts.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    accounts: Arc<RwLock<Accounts>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self, uid: &str) -> Option<Identity> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        accounts.by_uid.get(uid).map(|account| account.identity.clone())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword {
                min_length: MIN_PASSWORD_LENGTH,
            });
        }

        let credential = PasswordDigest::new(password)?;

        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        if accounts.uid_by_email.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }
        let display_name = display_name.trim();
        let identity = Identity {
            uid: generate_document_id(),
            email: email.clone(),
            display_name: (!display_name.is_empty()).then(|| display_name.to_string()),
            photo_url: None,
        };
        accounts.uid_by_email.insert(email, identity.uid.clone());
        accounts.by_uid.insert(
            identity.uid.clone(),
            Account {
                identity: identity.clone(),
                credential: Some(credential),
            },
        );
        info!("identity {} created", identity.uid);
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        let account = accounts
            .uid_by_email
            .get(&email)
            .and_then(|uid| accounts.by_uid.get(uid))
            .ok_or(AuthError::InvalidCredentials)?;
        match &account.credential {
            Some(digest) if digest.verify(password) => Ok(account.identity.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_in_with_sso(&self, assertion: &SsoAssertion) -> Result<Identity, AuthError> {
        if assertion.subject.trim().is_empty() {
            return Err(AuthError::Provider {
                message: "single sign-on assertion has no subject".to_string(),
            });
        }

        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(uid) = accounts.uid_by_subject.get(&assertion.subject) {
            if let Some(account) = accounts.by_uid.get(uid) {
                return Ok(account.identity.clone());
            }
        }

        let email = normalize_email(&assertion.email);
        // An existing password account with the same email is linked, not duplicated.
        if let Some(uid) = accounts.uid_by_email.get(&email).cloned() {
            accounts.uid_by_subject.insert(assertion.subject.clone(), uid.clone());
            if let Some(account) = accounts.by_uid.get(&uid) {
                return Ok(account.identity.clone());
            }
        }

        let identity = Identity {
            uid: generate_document_id(),
            email: email.clone(),
            display_name: assertion.display_name.clone(),
            photo_url: assertion.photo_url.clone(),
        };
        accounts.uid_by_subject.insert(assertion.subject.clone(), identity.uid.clone());
        if !email.is_empty() {
            accounts.uid_by_email.insert(email, identity.uid.clone());
        }
        accounts.by_uid.insert(
            identity.uid.clone(),
            Account {
                identity: identity.clone(),
                credential: None,
            },
        );
        info!("identity {} created through single sign-on", identity.uid);
        Ok(identity)
    }

    async fn update_profile(
        &self,
        uid: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        let account = accounts.by_uid.get_mut(uid).ok_or_else(|| AuthError::UnknownIdentity {
            uid: uid.to_string(),
        })?;
        if let Some(display_name) = display_name {
            account.identity.display_name = Some(display_name.to_string());
        }
        if let Some(photo_url) = photo_url {
            account.identity.photo_url = Some(photo_url.to_string());
        }
        Ok(account.identity.clone())
    }

    async fn sign_out(&self, uid: &str) -> Result<(), AuthError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        if !accounts.by_uid.contains_key(uid) {
            return Err(AuthError::UnknownIdentity { uid: uid.to_string() });
        }
        info!("identity {uid} signed out");
        Ok(())
    }
}
