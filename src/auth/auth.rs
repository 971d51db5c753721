//! Firebase Authentication
//!
//! Primary identity provider backed by the Identity Toolkit REST API.
//! Session state lives here; the bridge only reads it.

use crate::app::AppOptions;
use crate::auth::types::{AdditionalUserInfo, AuthResult, Credential, User, UserInfo, UserMetadata};
use crate::error::{AuthError, FirebaseError};
use crate::provider::IdentityProvider;
use async_stream::stream;
use async_trait::async_trait;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Default HTTP timeout for REST calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Firebase Authentication instance
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct Auth {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    api_key: String,
    base_url: String,
    current_user: RwLock<Option<Arc<User>>>,
    http_client: reqwest::Client,
    state_tx: broadcast::Sender<Option<Arc<User>>>,
}

impl Auth {
    /// Create an Auth instance for the given app options
    ///
    /// # Example
    /// ```no_run
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// use firebase_auth_bridge::{Auth, AppOptions};
    ///
    /// let auth = Auth::new(&AppOptions::new("YOUR_API_KEY", "your-project"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(options: &AppOptions) -> Result<Self, FirebaseError> {
        Self::with_timeout(options, DEFAULT_TIMEOUT)
    }

    /// Create an Auth instance with a custom HTTP timeout
    pub fn with_timeout(options: &AppOptions, timeout: Duration) -> Result<Self, FirebaseError> {
        // Validate API key (error case first)
        if options.api_key.is_empty() {
            return Err(FirebaseError::ApiKeyNotConfigured);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FirebaseError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = match &options.auth_emulator_host {
            Some(host) => format!("http://{}/identitytoolkit.googleapis.com/v1", host),
            None => IDENTITY_TOOLKIT_URL.to_string(),
        };

        // Create broadcast channel for auth state changes (capacity: 16)
        let (state_tx, _) = broadcast::channel(16);

        Ok(Auth {
            inner: Arc::new(AuthInner {
                api_key: options.api_key.clone(),
                base_url,
                current_user: RwLock::new(None),
                http_client,
                state_tx,
            }),
        })
    }

    /// Get the current signed-in user
    ///
    /// Returns None if no user is currently signed in.
    pub fn current_user(&self) -> Option<Arc<User>> {
        self.inner
            .current_user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sign out the current user
    ///
    /// Always succeeds and clears the current user.
    pub fn sign_out(&self) {
        self.set_current_user(None);
    }

    /// Get the API key for this Auth instance
    pub fn api_key(&self) -> &str {
        &self.inner.api_key
    }

    /// REST base URL in use
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Internal: Set current user
    pub(crate) fn set_current_user(&self, user: Option<Arc<User>>) {
        {
            let mut current = self
                .inner
                .current_user
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *current = user.clone();
        }

        // Broadcast state change (ignore error if no listeners)
        let _ = self.inner.state_tx.send(user);
    }

    /// Subscribe to authentication state changes
    ///
    /// The stream immediately yields the current user, then every sign-in,
    /// link and sign-out.
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// use firebase_auth_bridge::{Auth, AppOptions};
    /// use futures::StreamExt;
    ///
    /// let auth = Auth::new(&AppOptions::new("YOUR_API_KEY", "your-project"))?;
    /// let mut stream = auth.auth_state_changes();
    ///
    /// while let Some(user) = stream.next().await {
    ///     match user {
    ///         Some(u) => println!("User signed in: {}", u.uid),
    ///         None => println!("User signed out"),
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn auth_state_changes(&self) -> std::pin::Pin<Box<dyn Stream<Item = Option<Arc<User>>> + Send>> {
        let initial_user = self.current_user();
        let mut rx = self.inner.state_tx.subscribe();

        Box::pin(stream! {
            yield initial_user;

            loop {
                let user = match rx.recv().await {
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Ok(u) => u,
                };
                yield user;
            }
        })
    }

    /// Sign in anonymously
    ///
    /// Creates an anonymous user account. Anonymous accounts are temporary and can be
    /// linked to permanent accounts later.
    pub async fn sign_in_anonymously(&self) -> Result<AuthResult, FirebaseError> {
        // signUp with no email/password creates an anonymous user
        let user_data: SignInResponse = self
            .post("accounts:signUp", serde_json::json!({ "returnSecureToken": true }))
            .await?;

        let mut user = user_data.into_user();
        user.is_anonymous = true;
        let user = Arc::new(user);

        self.set_current_user(Some(Arc::clone(&user)));
        tracing::debug!(uid = %user.uid, "created anonymous session");

        Ok(AuthResult {
            user,
            additional_user_info: Some(AdditionalUserInfo {
                provider_id: "anonymous".to_string(),
                is_new_user: true,
                profile: None,
            }),
        })
    }

    /// Sign in with OAuth credential
    ///
    /// Signs in using a credential from an OAuth provider (Google, Apple, ...).
    pub async fn sign_in_with_credential(&self, credential: Credential) -> Result<AuthResult, FirebaseError> {
        let post_body = idp_post_body(&credential)?;
        let provider_id = credential.provider_id().to_string();

        let user_data: IdpResponse = self
            .post(
                "accounts:signInWithIdp",
                serde_json::json!({
                    "postBody": post_body,
                    "requestUri": "http://localhost",
                    "returnSecureToken": true,
                    "returnIdpCredential": true
                }),
            )
            .await?;

        let is_new_user = user_data.is_new_user.unwrap_or(false);
        let profile = user_data.profile();
        let user = Arc::new(user_data.into_user(&provider_id, None));

        self.set_current_user(Some(Arc::clone(&user)));
        tracing::debug!(uid = %user.uid, provider = %provider_id, "signed in with credential");

        Ok(AuthResult {
            user,
            additional_user_info: Some(AdditionalUserInfo {
                provider_id,
                is_new_user,
                profile,
            }),
        })
    }

    /// Link an OAuth credential to the current user
    ///
    /// The current user keeps its uid and stops being anonymous.
    pub async fn link_with_credential(&self, credential: Credential) -> Result<AuthResult, FirebaseError> {
        // Error-first: need a session with a token
        let Some(current) = self.current_user() else {
            return Err(AuthError::NoSignedInUser.into());
        };
        let provider_id = credential.provider_id().to_string();
        if current.is_linked_with(&provider_id) {
            return Err(AuthError::ProviderAlreadyLinked.into());
        }
        let Some(id_token) = current.id_token() else {
            return Err(AuthError::InvalidUserToken.into());
        };

        let post_body = idp_post_body(&credential)?;
        let user_data: IdpResponse = self
            .post(
                "accounts:signInWithIdp",
                serde_json::json!({
                    "idToken": id_token,
                    "postBody": post_body,
                    "requestUri": "http://localhost",
                    "returnSecureToken": true,
                    "returnIdpCredential": true
                }),
            )
            .await?;

        let profile = user_data.profile();
        let user = Arc::new(user_data.into_user(&provider_id, Some(&current)));

        self.set_current_user(Some(Arc::clone(&user)));
        tracing::debug!(uid = %user.uid, provider = %provider_id, "linked credential");

        Ok(AuthResult {
            user,
            additional_user_info: Some(AdditionalUserInfo {
                provider_id,
                is_new_user: false,
                profile,
            }),
        })
    }

    /// POST to an Identity Toolkit endpoint and decode the success body
    async fn post<T: DeserializeOwned>(&self, endpoint: &str, body: serde_json::Value) -> Result<T, FirebaseError> {
        let url = format!("{}/{}?key={}", self.inner.base_url, endpoint, self.inner.api_key);

        let response = self.inner.http_client.post(&url).json(&body).send().await?;

        // Handle error responses first
        if !response.status().is_success() {
            let status = response.status();
            let error_body: serde_json::Value = response.json().await.unwrap_or_default();
            let error_message = error_body["error"]["message"].as_str().unwrap_or("UNKNOWN_ERROR");
            tracing::debug!(%status, endpoint, error_message, "identity toolkit rejected request");
            return Err(AuthError::from_error_code(error_message).into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for Auth {
    fn current_user(&self) -> Option<Arc<User>> {
        Auth::current_user(self)
    }

    async fn sign_in_anonymously(&self) -> Result<AuthResult, FirebaseError> {
        Auth::sign_in_anonymously(self).await
    }

    async fn sign_in_with_credential(&self, credential: Credential) -> Result<AuthResult, FirebaseError> {
        Auth::sign_in_with_credential(self, credential).await
    }

    async fn link_with_credential(&self, credential: Credential) -> Result<AuthResult, FirebaseError> {
        Auth::link_with_credential(self, credential).await
    }

    async fn sign_out(&self) -> Result<(), FirebaseError> {
        Auth::sign_out(self);
        Ok(())
    }
}

/// Build the `postBody` form for `signInWithIdp`
fn idp_post_body(credential: &Credential) -> Result<String, AuthError> {
    let id_token = credential.id_token();
    let access_token = credential.access_token();

    // Error-first: validate at least one token provided
    if id_token.is_none() && access_token.is_none() {
        return Err(AuthError::InvalidCredential(format!(
            "{} credential requires id_token or access_token",
            credential.provider_id()
        )));
    }

    let mut post_body = format!("providerId={}", credential.provider_id());
    if let Some(id_token_val) = id_token {
        post_body.push_str(&format!("&id_token={}", id_token_val));
    }
    if let Some(access_token_val) = access_token {
        post_body.push_str(&format!("&access_token={}", access_token_val));
    }
    Ok(post_body)
}

fn token_expiration(expires_in: Option<&str>) -> Option<i64> {
    // Default: 1 hour expiration
    let seconds = expires_in.and_then(|s| s.parse::<i64>().ok()).unwrap_or(3600);
    Some(chrono::Utc::now().timestamp() + seconds)
}

/// `accounts:signUp` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
}

impl SignInResponse {
    fn into_user(self) -> User {
        let token_expiration = token_expiration(self.expires_in.as_deref());
        User {
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name,
            photo_url: None,
            email_verified: false,
            is_anonymous: false,
            metadata: UserMetadata::now(),
            provider_data: vec![],
            id_token: Some(self.id_token),
            refresh_token: Some(self.refresh_token),
            token_expiration,
        }
    }
}

/// `accounts:signInWithIdp` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdpResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    email_verified: Option<bool>,
    federated_id: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
    is_new_user: Option<bool>,
    raw_user_info: Option<String>,
}

impl IdpResponse {
    fn profile(&self) -> Option<serde_json::Value> {
        self.raw_user_info
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// Build the signed-in user; `previous` is the session being linked
    fn into_user(self, provider_id: &str, previous: Option<&User>) -> User {
        let token_expiration = token_expiration(self.expires_in.as_deref());
        let info = UserInfo {
            uid: self.federated_id.clone().unwrap_or_else(|| self.local_id.clone()),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            photo_url: self.photo_url.clone(),
            provider_id: provider_id.to_string(),
        };

        let (metadata, mut provider_data) = match previous {
            Some(prev) => (prev.metadata.clone(), prev.provider_data.clone()),
            None => (UserMetadata::now(), vec![]),
        };
        provider_data.retain(|existing| existing.provider_id != provider_id);
        provider_data.push(info);

        User {
            uid: self.local_id,
            email: self.email.or_else(|| previous.and_then(|p| p.email.clone())),
            display_name: self
                .display_name
                .or_else(|| previous.and_then(|p| p.display_name.clone())),
            photo_url: self.photo_url.or_else(|| previous.and_then(|p| p.photo_url.clone())),
            email_verified: self.email_verified.unwrap_or(false),
            is_anonymous: false,
            metadata,
            provider_data,
            id_token: Some(self.id_token),
            refresh_token: Some(self.refresh_token),
            token_expiration,
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.inner.base_url)
            .finish()
    }
}
