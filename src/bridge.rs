//! Auth bridge
//!
//! [`AuthBridge`] turns caller operations into provider calls and provider
//! results into [`AuthEvent`]s. Operations never block and never return a
//! result; completion is always signaled by an event delivered through the
//! [`EventPump`] returned from [`BridgeBuilder::build`].
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use firebase_auth_bridge::{AuthBridge, AuthEvent};
//!
//! let (bridge, mut pump) = AuthBridge::builder()
//!     .config_resource("assets/GoogleService-Info.json")
//!     .build()?;
//!
//! bridge.initialize();
//! bridge.sign_in_anonymously();
//!
//! while let Some(event) = pump.next_event().await {
//!     if let AuthEvent::AuthSuccess(user) = &event {
//!         println!("signed in as {}", user.uid);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::anchor::{find_presentation_anchor, Headless, UiHierarchy};
use crate::app::{AppOptions, DEFAULT_CONFIG_RESOURCE};
use crate::auth::types::{Credential, UserRecord};
use crate::auth::Auth;
use crate::error::{AuthError, FirebaseError};
use crate::events::{self, AuthEvent, EventPump, MainContext};
use crate::provider::{FederatedSignIn, IdentityProvider};
use once_cell::sync::OnceCell;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Operations a host can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Load configuration and configure providers
    Initialize,
    /// Create or reuse an anonymous session
    SignInAnonymously,
    /// Sign in through Google
    SignInWithGoogle,
    /// Link the anonymous session to a Google account
    LinkAnonymousWithGoogle,
    /// Sign out of both providers
    SignOut,
    /// Query whether a session exists
    IsSignedIn,
    /// Query the current user record
    GetCurrentUserData,
}

impl Operation {
    /// Every operation, in host order
    pub const ALL: [Operation; 7] = [
        Operation::Initialize,
        Operation::SignInAnonymously,
        Operation::SignInWithGoogle,
        Operation::LinkAnonymousWithGoogle,
        Operation::SignOut,
        Operation::IsSignedIn,
        Operation::GetCurrentUserData,
    ];

    /// Host-facing method name
    pub fn name(self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::SignInAnonymously => "sign_in_anonymously",
            Operation::SignInWithGoogle => "sign_in_with_google",
            Operation::LinkAnonymousWithGoogle => "link_anonymous_with_google",
            Operation::SignOut => "sign_out",
            Operation::IsSignedIn => "is_signed_in",
            Operation::GetCurrentUserData => "get_current_user_data",
        }
    }

    /// Look up an operation by host-facing method name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

/// Immediate reply to [`AuthBridge::invoke`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Fire-and-forget operation started; watch for events
    Dispatched,
    /// Answer to [`Operation::IsSignedIn`]
    SignedIn(bool),
    /// Answer to [`Operation::GetCurrentUserData`]
    UserData(UserRecord),
}

#[derive(Debug, Clone)]
enum ConfigSource {
    Resource(PathBuf),
    Json(String),
}

/// Providers configured by a successful `initialize`
#[derive(Clone)]
struct Providers {
    options: AppOptions,
    primary: Arc<dyn IdentityProvider>,
}

struct BridgeInner {
    /// Write-once initialization state
    state: OnceCell<Providers>,
    config: ConfigSource,
    http_timeout: Duration,
    injected_primary: Option<Arc<dyn IdentityProvider>>,
    secondary: Option<Arc<dyn FederatedSignIn>>,
    ui: Arc<dyn UiHierarchy>,
    main: MainContext,
    runtime: tokio::runtime::Handle,
}

/// Builder for [`AuthBridge`]
pub struct BridgeBuilder {
    config: ConfigSource,
    http_timeout: Duration,
    primary: Option<Arc<dyn IdentityProvider>>,
    secondary: Option<Arc<dyn FederatedSignIn>>,
    ui: Arc<dyn UiHierarchy>,
    runtime: Option<tokio::runtime::Handle>,
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self {
            config: ConfigSource::Resource(PathBuf::from(DEFAULT_CONFIG_RESOURCE)),
            http_timeout: crate::auth::auth::DEFAULT_TIMEOUT,
            primary: None,
            secondary: None,
            ui: Arc::new(Headless),
            runtime: None,
        }
    }
}

impl BridgeBuilder {
    /// Path of the bundled configuration resource
    pub fn config_resource(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = ConfigSource::Resource(path.into());
        self
    }

    /// Configuration resource contents embedded in the binary
    pub fn config_json(mut self, json: impl Into<String>) -> Self {
        self.config = ConfigSource::Json(json.into());
        self
    }

    /// HTTP timeout for the default REST provider
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Use this primary provider instead of the REST [`Auth`]
    pub fn primary_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.primary = Some(provider);
        self
    }

    /// Secondary provider; without one Google flows report "not supported"
    pub fn federated_provider(mut self, provider: Arc<dyn FederatedSignIn>) -> Self {
        self.secondary = Some(provider);
        self
    }

    /// UI hierarchy used to find the presentation anchor
    pub fn ui_hierarchy(mut self, ui: Arc<dyn UiHierarchy>) -> Self {
        self.ui = ui;
        self
    }

    /// Runtime that provider calls run on; defaults to the current one
    pub fn runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the bridge and the pump its events arrive on
    pub fn build(self) -> Result<(AuthBridge, EventPump), FirebaseError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => tokio::runtime::Handle::try_current()
                .map_err(|_| FirebaseError::internal("AuthBridge requires a tokio runtime"))?,
        };

        tracing::debug!(
            federated_sign_in = self.secondary.is_some(),
            "auth bridge capabilities"
        );

        let (main, pump) = events::channel();
        let bridge = AuthBridge {
            inner: Arc::new(BridgeInner {
                state: OnceCell::new(),
                config: self.config,
                http_timeout: self.http_timeout,
                injected_primary: self.primary,
                secondary: self.secondary,
                ui: self.ui,
                main,
                runtime,
            }),
        };
        Ok((bridge, pump))
    }
}

/// Bridge between a host and the identity providers
pub struct AuthBridge {
    inner: Arc<BridgeInner>,
}

impl AuthBridge {
    /// Start building a bridge
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    /// Invoke an operation through the dispatch table
    pub fn invoke(&self, operation: Operation) -> Reply {
        tracing::debug!(operation = operation.name(), "invoke");
        match operation {
            Operation::Initialize => self.initialize(),
            Operation::SignInAnonymously => self.sign_in_anonymously(),
            Operation::SignInWithGoogle => self.sign_in_with_google(),
            Operation::LinkAnonymousWithGoogle => self.link_anonymous_with_google(),
            Operation::SignOut => self.sign_out(),
            Operation::IsSignedIn => return Reply::SignedIn(self.is_signed_in()),
            Operation::GetCurrentUserData => return Reply::UserData(self.get_current_user_data()),
        }
        Reply::Dispatched
    }

    /// Load configuration and configure the providers
    ///
    /// No-op once initialized. Emits `initialized` or
    /// `initialization_failed`; a failed attempt can be retried.
    pub fn initialize(&self) {
        if self.is_initialized() {
            tracing::debug!("already initialized");
            return;
        }

        match self.inner.configure() {
            Err(err) => {
                self.inner.emit(AuthEvent::InitializationFailed(err.to_event_message()));
            }
            Ok(providers) => {
                let project_id = providers.options.project_id.clone();
                // Lost a race with another initialize; that one emitted
                if self.inner.state.set(providers).is_err() {
                    return;
                }
                tracing::info!(project_id = %project_id, "auth bridge initialized");
                self.inner.emit(AuthEvent::Initialized);
            }
        }
    }

    /// Sign in anonymously, reusing an existing session
    ///
    /// Emits `auth_success` or `auth_failure`.
    pub fn sign_in_anonymously(&self) {
        let Some(providers) = self.inner.state.get() else {
            self.inner.emit(AuthEvent::AuthFailure(AuthError::NotInitialized.to_string()));
            return;
        };

        // Reuse the session instead of minting a second anonymous identity
        if let Some(user) = providers.primary.current_user() {
            tracing::debug!(uid = %user.uid, "session exists, skipping anonymous sign-in");
            self.inner.emit(AuthEvent::AuthSuccess(UserRecord::from(user.as_ref())));
            return;
        }

        let primary = Arc::clone(&providers.primary);
        self.spawn(move |bridge| async move {
            let event = match primary.sign_in_anonymously().await {
                Ok(result) => AuthEvent::AuthSuccess(UserRecord::from(result.user.as_ref())),
                Err(err) => AuthEvent::AuthFailure(err.to_event_message()),
            };
            emit_if_alive(&bridge, event);
        });
    }

    /// Sign in with Google
    ///
    /// Emits `auth_success` or `auth_failure`.
    pub fn sign_in_with_google(&self) {
        let Some(providers) = self.inner.state.get() else {
            self.inner.emit(AuthEvent::AuthFailure(AuthError::NotInitialized.to_string()));
            return;
        };

        let primary = Arc::clone(&providers.primary);
        self.spawn(move |bridge| async move {
            let credential = match federated_credential(&bridge).await {
                Err(err) => {
                    emit_if_alive(&bridge, AuthEvent::AuthFailure(err.to_string()));
                    return;
                }
                Ok(credential) => credential,
            };

            let event = match primary.sign_in_with_credential(credential).await {
                Ok(result) => AuthEvent::AuthSuccess(UserRecord::from(result.user.as_ref())),
                Err(err) => AuthEvent::AuthFailure(err.to_event_message()),
            };
            emit_if_alive(&bridge, event);
        });
    }

    /// Link the current anonymous session to a Google account
    ///
    /// Emits `link_success` or `link_failure`. An already-linked provider
    /// counts as success.
    pub fn link_anonymous_with_google(&self) {
        let Some(providers) = self.inner.state.get() else {
            self.inner.emit(AuthEvent::LinkFailure(AuthError::NotInitialized.to_string()));
            return;
        };
        let Some(current) = providers.primary.current_user() else {
            self.inner.emit(AuthEvent::LinkFailure(AuthError::NoSignedInUser.to_string()));
            return;
        };
        if !current.is_anonymous {
            self.inner.emit(AuthEvent::LinkFailure(AuthError::NotAnonymous.to_string()));
            return;
        }

        let primary = Arc::clone(&providers.primary);
        self.spawn(move |bridge| async move {
            let credential: Credential = match federated_credential(&bridge).await {
                Err(err) => {
                    emit_if_alive(&bridge, AuthEvent::LinkFailure(err.to_string()));
                    return;
                }
                Ok(credential) => credential,
            };

            let event = match primary.link_with_credential(credential).await {
                Ok(result) => AuthEvent::LinkSuccess(UserRecord::from(result.user.as_ref())),
                Err(FirebaseError::Auth(AuthError::ProviderAlreadyLinked)) => {
                    tracing::debug!(uid = %current.uid, "provider already linked, reporting success");
                    let user = primary.current_user().unwrap_or(current);
                    AuthEvent::LinkSuccess(UserRecord::from(user.as_ref()))
                }
                Err(err) => AuthEvent::LinkFailure(err.to_event_message()),
            };
            emit_if_alive(&bridge, event);
        });
    }

    /// Sign out of the secondary provider, then the primary one
    ///
    /// Emits `sign_out_success(true)` or `auth_failure`; the failure does not
    /// say which step failed.
    pub fn sign_out(&self) {
        let Some(providers) = self.inner.state.get() else {
            self.inner.emit(AuthEvent::AuthFailure(AuthError::NotInitialized.to_string()));
            return;
        };

        let primary = Arc::clone(&providers.primary);
        let secondary = self.inner.secondary.clone();
        self.spawn(move |bridge| async move {
            if let Some(secondary) = secondary {
                if let Err(err) = secondary.sign_out().await {
                    emit_if_alive(&bridge, AuthEvent::AuthFailure(err.to_string()));
                    return;
                }
            }

            let event = match primary.sign_out().await {
                Ok(()) => AuthEvent::SignOutSuccess(true),
                Err(err) => AuthEvent::AuthFailure(err.to_event_message()),
            };
            emit_if_alive(&bridge, event);
        });
    }

    /// Whether a session exists; false before initialization
    pub fn is_signed_in(&self) -> bool {
        self.inner
            .state
            .get()
            .is_some_and(|providers| providers.primary.current_user().is_some())
    }

    /// Current user record, or [`UserRecord::empty`] without a session
    pub fn get_current_user_data(&self) -> UserRecord {
        let user = self
            .inner
            .state
            .get()
            .and_then(|providers| providers.primary.current_user());
        UserRecord::from(user.as_deref())
    }

    /// Whether `initialize` has succeeded
    pub fn is_initialized(&self) -> bool {
        self.inner.state.get().is_some()
    }

    /// Whether Google flows can run on this host
    pub fn supports_google_sign_in(&self) -> bool {
        self.inner.secondary.is_some()
    }

    /// Loaded configuration, once initialized
    pub fn options(&self) -> Option<&AppOptions> {
        self.inner.state.get().map(|providers| &providers.options)
    }

    /// Handle for queueing work on the designated context
    pub fn main_context(&self) -> MainContext {
        self.inner.main.clone()
    }

    /// Run an operation on the runtime, holding only a weak reference
    fn spawn<F, Fut>(&self, operation: F)
    where
        F: FnOnce(Weak<BridgeInner>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let bridge = Arc::downgrade(&self.inner);
        self.inner.runtime.spawn(operation(bridge));
    }
}

impl std::fmt::Debug for AuthBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthBridge")
            .field("initialized", &self.is_initialized())
            .field("google_sign_in", &self.supports_google_sign_in())
            .finish()
    }
}

impl BridgeInner {
    fn configure(&self) -> Result<Providers, FirebaseError> {
        let options = match &self.config {
            ConfigSource::Resource(path) => AppOptions::from_resource(path)?,
            ConfigSource::Json(raw) => AppOptions::from_json(raw)?,
        };

        let primary: Arc<dyn IdentityProvider> = match &self.injected_primary {
            Some(provider) => Arc::clone(provider),
            None => Arc::new(Auth::with_timeout(&options, self.http_timeout)?),
        };

        Ok(Providers { options, primary })
    }

    fn emit(&self, event: AuthEvent) {
        let event = with_failure_message(event);
        match &event {
            AuthEvent::InitializationFailed(message)
            | AuthEvent::AuthFailure(message)
            | AuthEvent::LinkFailure(message) => {
                tracing::warn!(event = event.name(), %message, "auth operation failed");
            }
            _ => tracing::info!(event = event.name(), "auth operation completed"),
        }
        self.main.emit(event);
    }
}

/// Failure events always carry a non-empty message
fn with_failure_message(event: AuthEvent) -> AuthEvent {
    const FALLBACK: &str = "Unknown error";
    match event {
        AuthEvent::InitializationFailed(m) if m.trim().is_empty() => {
            AuthEvent::InitializationFailed(FALLBACK.to_string())
        }
        AuthEvent::AuthFailure(m) if m.trim().is_empty() => AuthEvent::AuthFailure(FALLBACK.to_string()),
        AuthEvent::LinkFailure(m) if m.trim().is_empty() => AuthEvent::LinkFailure(FALLBACK.to_string()),
        other => other,
    }
}

/// Emit from an in-flight operation unless the bridge is gone
fn emit_if_alive(bridge: &Weak<BridgeInner>, event: AuthEvent) {
    match bridge.upgrade() {
        Some(inner) => inner.emit(event),
        None => tracing::debug!(event = event.name(), "bridge dropped, discarding event"),
    }
}

/// Obtain a credential through the secondary provider's interactive flow
async fn federated_credential(bridge: &Weak<BridgeInner>) -> Result<Credential, AuthError> {
    let (secondary, client_id, ui, main) = {
        let Some(inner) = bridge.upgrade() else {
            return Err(AuthError::Cancelled);
        };
        let Some(secondary) = inner.secondary.clone() else {
            return Err(AuthError::PlatformNotSupported);
        };
        let Some(providers) = inner.state.get() else {
            return Err(AuthError::NotInitialized);
        };
        let Some(client_id) = providers.options.oauth_client_id() else {
            return Err(AuthError::MissingClientId);
        };
        (secondary, client_id.to_string(), Arc::clone(&inner.ui), inner.main.clone())
    };

    // The UI hierarchy may only be queried on the designated context
    let anchor = main
        .run_on_main(move || find_presentation_anchor(ui.as_ref()))
        .await
        .ok()
        .flatten()
        .ok_or(AuthError::NoPresentationAnchor)?;

    secondary.sign_in(&client_id, anchor).await
}
