//! Google Sign-In
//!
//! Secondary provider. The consent UI itself belongs to the host (a native
//! SDK sheet, a browser popup, a test double) and is reached through
//! [`ConsentPresenter`], much like a popup handler in web OAuth flows.
//! This module owns the parts around it: request shape, token checks,
//! credential construction and the remembered account.

use crate::anchor::Surface;
use crate::auth::types::Credential;
use crate::error::AuthError;
use crate::provider::FederatedSignIn;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// Scopes requested when none are configured
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// What the host needs to show the consent flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    /// OAuth client ID from the app configuration
    pub client_id: String,
    /// Surface to present on
    pub anchor: Surface,
    /// Requested scopes
    pub scopes: Vec<String>,
}

/// Google account returned by a completed consent flow
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GoogleAccount {
    /// Google subject identifier
    pub user_id: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// OIDC ID token
    pub id_token: Option<String>,
    /// OAuth access token
    pub access_token: String,
}

impl std::fmt::Debug for GoogleAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAccount")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Host-side consent UI
///
/// Return [`AuthError::Cancelled`] when the user dismisses the flow and
/// [`AuthError::Unknown`] with the SDK's message for anything else.
#[async_trait]
pub trait ConsentPresenter: Send + Sync {
    /// Show the consent flow and wait for its outcome
    async fn present(&self, request: ConsentRequest) -> Result<GoogleAccount, AuthError>;

    /// Revoke any host-side session; default does nothing
    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Google Sign-In secondary provider
pub struct GoogleSignIn {
    presenter: Arc<dyn ConsentPresenter>,
    scopes: Vec<String>,
    current: RwLock<Option<GoogleAccount>>,
}

impl GoogleSignIn {
    /// Create a provider using the given consent UI
    pub fn new(presenter: Arc<dyn ConsentPresenter>) -> Self {
        Self {
            presenter,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            current: RwLock::new(None),
        }
    }

    /// Request an additional scope
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Requested scopes
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Account from the last successful sign-in
    pub fn current_account(&self) -> Option<GoogleAccount> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_current(&self, account: Option<GoogleAccount>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = account;
    }
}

#[async_trait]
impl FederatedSignIn for GoogleSignIn {
    async fn sign_in(&self, client_id: &str, anchor: Surface) -> Result<Credential, AuthError> {
        if client_id.trim().is_empty() {
            return Err(AuthError::MissingClientId);
        }

        tracing::debug!(anchor = %anchor.id, "presenting Google consent");
        let request = ConsentRequest {
            client_id: client_id.to_string(),
            anchor,
            scopes: self.scopes.clone(),
        };
        let account = self.presenter.present(request).await?;

        let Some(id_token) = account.id_token.clone().filter(|token| !token.is_empty()) else {
            return Err(AuthError::MissingIdToken);
        };
        let credential = Credential::google(id_token, account.access_token.clone());
        self.set_current(Some(account));
        Ok(credential)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.set_current(None);
        self.presenter.sign_out().await
    }
}

impl std::fmt::Debug for GoogleSignIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSignIn")
            .field("scopes", &self.scopes)
            .field("signed_in", &self.current_account().is_some())
            .finish()
    }
}
