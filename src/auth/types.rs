//! Authentication types
//!
//! Provider-side account state ([`User`]), the credentials exchanged between
//! the secondary and primary providers ([`Credential`]) and the normalized
//! caller-facing snapshot ([`UserRecord`]).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provider ID reported for Google credentials
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

/// User metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Timestamp when user was created (Unix timestamp in milliseconds)
    pub creation_timestamp: i64,

    /// Timestamp of last sign-in (Unix timestamp in milliseconds)
    pub last_sign_in_timestamp: i64,
}

impl UserMetadata {
    /// Metadata stamped with the current time
    pub fn now() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            creation_timestamp: now,
            last_sign_in_timestamp: now,
        }
    }
}

/// User information returned from an identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User ID from the provider
    pub uid: String,

    /// Display name
    pub display_name: Option<String>,

    /// Email address
    pub email: Option<String>,

    /// Photo URL
    pub photo_url: Option<String>,

    /// Provider ID (e.g., "google.com")
    pub provider_id: String,
}

/// Authentication credential
///
/// Produced by a secondary provider and consumed (moved) by exactly one
/// primary-provider sign-in or link call.
#[derive(Clone)]
pub enum Credential {
    /// Google OAuth credential
    Google {
        /// Google Sign-In ID token
        id_token: Option<String>,
        /// Google Sign-In access token
        access_token: Option<String>,
    },

    /// Generic OAuth2 credential
    OAuth {
        /// Provider ID (e.g., "apple.com", "microsoft.com")
        provider_id: String,
        /// ID token (OIDC)
        id_token: Option<String>,
        /// Access token
        access_token: Option<String>,
    },
}

impl Credential {
    /// Build a Google credential from the tokens returned by the consent flow
    pub fn google(id_token: impl Into<String>, access_token: impl Into<String>) -> Self {
        Credential::Google {
            id_token: Some(id_token.into()),
            access_token: Some(access_token.into()),
        }
    }

    /// Get the provider ID for this credential
    pub fn provider_id(&self) -> &str {
        match self {
            Credential::Google { .. } => GOOGLE_PROVIDER_ID,
            Credential::OAuth { provider_id, .. } => provider_id,
        }
    }

    /// ID token, if any
    pub fn id_token(&self) -> Option<&str> {
        match self {
            Credential::Google { id_token, .. } | Credential::OAuth { id_token, .. } => {
                id_token.as_deref()
            }
        }
    }

    /// Access token, if any
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Credential::Google { access_token, .. } | Credential::OAuth { access_token, .. } => {
                access_token.as_deref()
            }
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("provider_id", &self.provider_id())
            .field("id_token", &self.id_token().map(|_| "<redacted>"))
            .field("access_token", &self.access_token().map(|_| "<redacted>"))
            .finish()
    }
}

/// Firebase user account
///
/// Represents a user account in Firebase Auth. Use `Arc<User>` for shared ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique Firebase user ID
    pub uid: String,

    /// Email address (if available)
    pub email: Option<String>,

    /// Display name (if available)
    pub display_name: Option<String>,

    /// Photo URL (if available)
    pub photo_url: Option<String>,

    /// Whether email is verified
    pub email_verified: bool,

    /// Whether user is anonymous
    pub is_anonymous: bool,

    /// User metadata
    pub metadata: UserMetadata,

    /// Provider data for this user
    pub provider_data: Vec<UserInfo>,

    /// ID token (JWT) - internal use
    #[serde(skip)]
    pub(crate) id_token: Option<String>,

    /// Refresh token - internal use
    #[serde(skip)]
    pub(crate) refresh_token: Option<String>,

    /// Token expiration timestamp (seconds since epoch) - internal use
    #[serde(skip)]
    pub(crate) token_expiration: Option<i64>,
}

impl User {
    /// A signed-in user with no profile data
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
            email_verified: false,
            is_anonymous: false,
            metadata: UserMetadata::now(),
            provider_data: vec![],
            id_token: None,
            refresh_token: None,
            token_expiration: None,
        }
    }

    /// An anonymous user
    pub fn anonymous(uid: impl Into<String>) -> Self {
        Self {
            is_anonymous: true,
            ..Self::new(uid)
        }
    }

    /// Set the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the photo URL
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Attach provider data
    pub fn with_provider(mut self, info: UserInfo) -> Self {
        self.provider_data.push(info);
        self
    }

    /// Whether the given provider is linked to this account
    pub fn is_linked_with(&self, provider_id: &str) -> bool {
        self.provider_data.iter().any(|info| info.provider_id == provider_id)
    }

    /// Current ID token, if the session holds one
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    /// Whether the ID token is known to have expired
    pub fn is_token_expired(&self) -> bool {
        match self.token_expiration {
            Some(expiration) => chrono::Utc::now().timestamp() >= expiration,
            None => false,
        }
    }
}

/// Result of authentication operations
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// The signed-in user
    pub user: Arc<User>,

    /// Additional user info from provider
    pub additional_user_info: Option<AdditionalUserInfo>,
}

/// Additional user information from identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalUserInfo {
    /// Provider ID
    pub provider_id: String,

    /// Whether this is a new user
    pub is_new_user: bool,

    /// Raw user profile from provider
    pub profile: Option<serde_json::Value>,
}

/// Normalized, caller-facing snapshot of an authenticated identity
///
/// Serializes with the key names scripting hosts expect: `uid`, `email`,
/// `displayName`, `photoURL`, `isAnonymous`. Absent strings are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable user identifier, empty for the "no session" record
    pub uid: String,
    /// Email address or empty
    pub email: String,
    /// Display name or empty
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Photo URL or empty
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    /// Whether the session is anonymous
    #[serde(rename = "isAnonymous")]
    pub is_anonymous: bool,
}

impl UserRecord {
    /// The record returned when no session exists
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this is the "no session" record
    pub fn is_empty(&self) -> bool {
        self.uid.is_empty()
    }

    /// Plain key/value form for scripting hosts
    pub fn to_dictionary(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut dict = serde_json::Map::new();
        dict.insert("uid".into(), self.uid.clone().into());
        dict.insert("email".into(), self.email.clone().into());
        dict.insert("displayName".into(), self.display_name.clone().into());
        dict.insert("photoURL".into(), self.photo_url.clone().into());
        dict.insert("isAnonymous".into(), self.is_anonymous.into());
        dict
    }
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone().unwrap_or_default(),
            display_name: user.display_name.clone().unwrap_or_default(),
            photo_url: user.photo_url.clone().unwrap_or_default(),
            is_anonymous: user.is_anonymous,
        }
    }
}

impl From<Option<&User>> for UserRecord {
    fn from(user: Option<&User>) -> Self {
        user.map(UserRecord::from).unwrap_or_default()
    }
}
