//! Provider seams
//!
//! The bridge talks to its identity providers only through these traits.
//! [`crate::Auth`] implements [`IdentityProvider`] over the Identity Toolkit
//! REST API and [`crate::GoogleSignIn`] implements [`FederatedSignIn`]; hosts
//! and tests can substitute their own.

use crate::anchor::Surface;
use crate::auth::types::{AuthResult, Credential, User};
use crate::error::{AuthError, FirebaseError};
use async_trait::async_trait;
use std::sync::Arc;

/// Primary identity provider
///
/// Owns the session state. Completion may happen on any runtime thread.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if any. Must not block.
    fn current_user(&self) -> Option<Arc<User>>;

    /// Create a new anonymous session
    async fn sign_in_anonymously(&self) -> Result<AuthResult, FirebaseError>;

    /// Exchange a federated credential for a session
    async fn sign_in_with_credential(&self, credential: Credential) -> Result<AuthResult, FirebaseError>;

    /// Attach a federated credential to the current session
    ///
    /// Fails with [`AuthError::ProviderAlreadyLinked`] when the credential's
    /// provider is already linked to the account.
    async fn link_with_credential(&self, credential: Credential) -> Result<AuthResult, FirebaseError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), FirebaseError>;
}

/// Secondary (federated) identity provider
///
/// Runs an interactive consent flow presented on `anchor` and yields a
/// credential the primary provider can consume.
#[async_trait]
pub trait FederatedSignIn: Send + Sync {
    /// Run the consent flow for the given OAuth client
    async fn sign_in(&self, client_id: &str, anchor: Surface) -> Result<Credential, AuthError>;

    /// Forget the federated account
    async fn sign_out(&self) -> Result<(), AuthError>;
}
