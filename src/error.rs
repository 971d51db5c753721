//! Bridge error types
//!
//! Provides a unified error type hierarchy for provider calls, configuration
//! loading and bridge preconditions.
//!
//! # Design
//! Uses thiserror for ergonomic error definitions. All errors implement
//! std::error::Error and can be converted to FirebaseError via From trait.
//!
//! `AuthError` messages are what the caller sees in `auth_failure` and
//! `link_failure` events, so they carry no prefix of their own.

use thiserror::Error;

/// Top-level error type
///
/// Wraps specific error types (Auth, Config) into a unified type.
/// Supports conversion from all module-specific errors via `From` trait.
///
/// # Example
/// ```
/// use firebase_auth_bridge::{FirebaseError, AuthError};
///
/// let auth_err: FirebaseError = AuthError::NoSignedInUser.into();
/// ```
#[derive(Debug, Error)]
pub enum FirebaseError {
    /// Authentication-related errors
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Configuration resource errors
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Network/HTTP errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// API key not configured
    #[error("API key not configured")]
    ApiKeyNotConfigured,

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

/// Authentication errors
///
/// Maps Identity Toolkit error codes and bridge preconditions to Rust enum
/// variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bridge has not been initialized
    #[error("Firebase not initialized")]
    NotInitialized,

    /// No signed-in user
    #[error("No user signed in")]
    NoSignedInUser,

    /// Link requested for a user that is not anonymous
    #[error("Current user is not anonymous. Use sign_in_with_google() instead")]
    NotAnonymous,

    /// The credential's provider is already linked to this account
    #[error("This provider is already linked to the current account")]
    ProviderAlreadyLinked,

    /// The credential already belongs to a different account
    #[error("This credential is already associated with a different user account")]
    CredentialAlreadyInUse,

    /// User account has been disabled
    #[error("User account disabled")]
    UserDisabled,

    /// Too many failed attempts
    #[error("Too many requests, try again later")]
    TooManyRequests,

    /// Operation not allowed (e.g., provider disabled in the console)
    #[error("Operation not allowed")]
    OperationNotAllowed,

    /// Invalid credential
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// User token has expired
    #[error("User token expired")]
    UserTokenExpired,

    /// Invalid user token
    #[error("Invalid user token")]
    InvalidUserToken,

    /// Invalid API key
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Network error
    #[error("Network error: {0}")]
    NetworkRequestFailed(String),

    /// OAuth client ID missing from the configuration resource
    #[error("Missing Firebase clientID")]
    MissingClientId,

    /// No UI surface to present the consent flow on
    #[error("Could not find presentation anchor")]
    NoPresentationAnchor,

    /// Federated sign-in is unavailable on this platform
    #[error("Google Sign-In is not supported on this platform")]
    PlatformNotSupported,

    /// Consent flow finished without an ID token
    #[error("Google Sign-In failed: missing token")]
    MissingIdToken,

    /// The user dismissed the consent flow
    #[error("Google Sign-In was cancelled")]
    Cancelled,

    /// Any other provider error, message passed through verbatim
    #[error("{0}")]
    Unknown(String),
}

/// Configuration resource errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The bundled resource does not exist
    #[error("{0} not found in app bundle. Add it to the application resources.")]
    NotFound(String),

    /// The resource exists but could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Resource path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The resource is not valid JSON of the expected shape
    #[error("Malformed configuration in {path}: {source}")]
    Malformed {
        /// Resource path
        path: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// A required key is absent or empty
    #[error("Configuration is missing required key {0}")]
    MissingField(&'static str),
}

impl FirebaseError {
    /// Create an internal error from a string
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Auth(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Check if error indicates authentication is required
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthError::NoSignedInUser)
                | Self::Auth(AuthError::UserTokenExpired)
                | Self::Auth(AuthError::InvalidUserToken)
        )
    }

    /// Message used in failure events, never empty
    pub fn to_event_message(&self) -> String {
        let message = self.to_string();
        if message.is_empty() {
            return "Unknown error".to_string();
        }
        message
    }
}

impl AuthError {
    /// Create from Identity Toolkit REST API error message
    ///
    /// The server sends `CODE` or `CODE : detail`. Unrecognised codes are
    /// kept verbatim.
    pub fn from_error_code(message: &str) -> Self {
        let code = message.split(" : ").next().unwrap_or(message).trim();
        match code {
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyRequests,
            "OPERATION_NOT_ALLOWED" | "ADMIN_ONLY_OPERATION" => Self::OperationNotAllowed,
            "INVALID_IDP_RESPONSE" | "INVALID_CREDENTIAL" => {
                Self::InvalidCredential(message.to_string())
            }
            "INVALID_ID_TOKEN" => Self::InvalidUserToken,
            "TOKEN_EXPIRED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => Self::UserTokenExpired,
            "INVALID_API_KEY" | "API_KEY_INVALID" => Self::InvalidApiKey,
            "USER_NOT_FOUND" => Self::NoSignedInUser,
            "FEDERATED_USER_ID_ALREADY_LINKED" | "EMAIL_EXISTS" => Self::CredentialAlreadyInUse,
            "PROVIDER_ALREADY_LINKED" => Self::ProviderAlreadyLinked,
            "" => Self::Unknown("UNKNOWN_ERROR".to_string()),
            _ => Self::Unknown(message.to_string()),
        }
    }

    /// Check if error is transient
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkRequestFailed(_) | Self::TooManyRequests)
    }
}
