use std::borrow::Cow;

use thiserror::Error;

/// Error type returned by document store backends and typed collections.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record failed validation before it was written.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Target document was not found when performing a mutation.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// A stored document could not be decoded into its entity type.
    #[error("document {collection}/{id} does not match its schema: {message}")]
    Schema {
        collection: String,
        id: String,
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

/// Failures reported by an identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least {min_length} characters")]
    WeakPassword { min_length: usize },

    #[error("email address is already in use")]
    EmailInUse,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("unknown identity '{uid}'")]
    UnknownIdentity { uid: String },

    #[error("{message}")]
    Provider { message: String },
}

/// Failures reported by the image upload service.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Cloudinary configuration missing")]
    NotConfigured,

    #[error("image payload is empty")]
    EmptyPayload,

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { message: String },

    #[error("malformed upload response: {message}")]
    MalformedResponse { message: String },
}

/// Error returned by application workflows.
///
/// Authentication failures render as the inline message shown to the user
/// (`"Failed to sign up: ..."`), everything else carries the failing layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{action}: {source}")]
    Auth {
        action: Cow<'static, str>,
        #[source]
        source: AuthError,
    },

    #[error("Username is required")]
    UsernameRequired,

    #[error("Username is already taken. Please choose another one.")]
    UsernameTaken { username: String, existing_id: String },

    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("validation failed")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("not signed in")]
    NotSignedIn,

    #[error("{what} '{id}' not found")]
    NotFound { what: &'static str, id: String },

    #[error("forbidden: {message}")]
    Forbidden { message: Cow<'static, str> },

    #[error("invalid request: {message}")]
    InvalidRequest { message: Cow<'static, str> },
}

impl AppError {
    pub fn sign_up(source: AuthError) -> Self {
        Self::Auth {
            action: Cow::Borrowed("Failed to sign up"),
            source,
        }
    }

    pub fn sign_up_with_sso(source: AuthError) -> Self {
        Self::Auth {
            action: Cow::Borrowed("Failed to sign up with single sign-on"),
            source,
        }
    }

    pub fn login(source: AuthError) -> Self {
        Self::Auth {
            action: Cow::Borrowed("Failed to login"),
            source,
        }
    }

    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

/// Collection of validation issues encountered while preparing a write.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `Ok(())` when no issues were collected.
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Detailed validation failure for a single field or logical path.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
