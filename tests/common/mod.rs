//! In-memory providers and UI for bridge tests

#![allow(dead_code)]

use async_trait::async_trait;
use firebase_auth_bridge::anchor::{ActivationState, Window, WindowScene};
use firebase_auth_bridge::auth::types::{AuthResult, UserInfo, GOOGLE_PROVIDER_ID};
use firebase_auth_bridge::{
    AuthBridge, AuthError, AuthEvent, Credential, EventPump, FederatedSignIn, FirebaseError,
    IdentityProvider, Surface, UiHierarchy, User,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const CONFIG: &str = r#"{
    "API_KEY": "test-api-key",
    "PROJECT_ID": "test-project",
    "CLIENT_ID": "test-client.apps.googleusercontent.com"
}"#;

pub const CONFIG_WITHOUT_CLIENT_ID: &str = r#"{
    "API_KEY": "test-api-key",
    "PROJECT_ID": "test-project"
}"#;

/// Primary provider keeping its session in memory
#[derive(Default)]
pub struct FakeAuth {
    current: Mutex<Option<Arc<User>>>,
    next_uid: AtomicUsize,
    pub anonymous_calls: AtomicUsize,
    pub credential_calls: AtomicUsize,
    pub link_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub anonymous_error: Mutex<Option<AuthError>>,
    pub credential_error: Mutex<Option<AuthError>>,
    pub link_error: Mutex<Option<AuthError>>,
    pub sign_out_error: Mutex<Option<AuthError>>,
    pub hold: Mutex<Option<Arc<Notify>>>,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_user(user: User) -> Arc<Self> {
        let auth = Self::default();
        *auth.current.lock().unwrap() = Some(Arc::new(user));
        Arc::new(auth)
    }

    pub fn fail_anonymous(&self, err: AuthError) {
        *self.anonymous_error.lock().unwrap() = Some(err);
    }

    pub fn fail_credential(&self, err: AuthError) {
        *self.credential_error.lock().unwrap() = Some(err);
    }

    pub fn fail_link(&self, err: AuthError) {
        *self.link_error.lock().unwrap() = Some(err);
    }

    pub fn fail_sign_out(&self, err: AuthError) {
        *self.sign_out_error.lock().unwrap() = Some(err);
    }

    /// Make anonymous sign-in wait until the returned gate is notified
    pub fn hold_anonymous(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn set_current(&self, user: Option<Arc<User>>) {
        *self.current.lock().unwrap() = user;
    }

    fn result(&self, user: User) -> AuthResult {
        let user = Arc::new(user);
        self.set_current(Some(Arc::clone(&user)));
        AuthResult {
            user,
            additional_user_info: None,
        }
    }
}

fn google_info() -> UserInfo {
    UserInfo {
        uid: "google-sub-1".to_string(),
        display_name: Some("Player One".to_string()),
        email: Some("player@gmail.com".to_string()),
        photo_url: Some("https://lh3.googleusercontent.com/p.png".to_string()),
        provider_id: GOOGLE_PROVIDER_ID.to_string(),
    }
}

#[async_trait]
impl IdentityProvider for FakeAuth {
    fn current_user(&self) -> Option<Arc<User>> {
        self.current.lock().unwrap().clone()
    }

    async fn sign_in_anonymously(&self) -> Result<AuthResult, FirebaseError> {
        self.anonymous_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.hold.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.anonymous_error.lock().unwrap().clone() {
            return Err(err.into());
        }
        let n = self.next_uid.fetch_add(1, Ordering::SeqCst);
        Ok(self.result(User::anonymous(format!("anon-{n}"))))
    }

    async fn sign_in_with_credential(&self, credential: Credential) -> Result<AuthResult, FirebaseError> {
        self.credential_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.credential_error.lock().unwrap().clone() {
            return Err(err.into());
        }
        assert_eq!(credential.provider_id(), GOOGLE_PROVIDER_ID);
        let user = User::new("google-user")
            .with_email("player@gmail.com")
            .with_display_name("Player One")
            .with_photo_url("https://lh3.googleusercontent.com/p.png")
            .with_provider(google_info());
        Ok(self.result(user))
    }

    async fn link_with_credential(&self, credential: Credential) -> Result<AuthResult, FirebaseError> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        let Some(current) = self.current_user() else {
            return Err(AuthError::NoSignedInUser.into());
        };
        if let Some(err) = self.link_error.lock().unwrap().clone() {
            return Err(err.into());
        }
        if current.is_linked_with(credential.provider_id()) {
            return Err(AuthError::ProviderAlreadyLinked.into());
        }
        let linked = User::new(current.uid.clone())
            .with_email("player@gmail.com")
            .with_display_name("Player One")
            .with_provider(google_info());
        Ok(self.result(linked))
    }

    async fn sign_out(&self) -> Result<(), FirebaseError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.sign_out_error.lock().unwrap().clone() {
            return Err(err.into());
        }
        self.set_current(None);
        Ok(())
    }
}

/// Secondary provider with a scripted outcome
pub struct FakeGoogle {
    outcome: Mutex<Result<Credential, AuthError>>,
    sign_out_error: Mutex<Option<AuthError>>,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub anchors: Mutex<Vec<String>>,
    pub client_ids: Mutex<Vec<String>>,
}

impl FakeGoogle {
    pub fn new() -> Arc<Self> {
        Self::with_outcome(Ok(Credential::google("google-id-token", "google-access-token")))
    }

    pub fn with_outcome(outcome: Result<Credential, AuthError>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(outcome),
            sign_out_error: Mutex::new(None),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            anchors: Mutex::new(Vec::new()),
            client_ids: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_sign_out(&self, err: AuthError) {
        *self.sign_out_error.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl FederatedSignIn for FakeGoogle {
    async fn sign_in(&self, client_id: &str, anchor: Surface) -> Result<Credential, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.anchors.lock().unwrap().push(anchor.id);
        self.client_ids.lock().unwrap().push(client_id.to_string());
        self.outcome.lock().unwrap().clone()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        match self.sign_out_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A foreground scene whose key window shows `root`
pub struct FakeUi {
    root: Surface,
}

impl FakeUi {
    pub fn new(root: Surface) -> Arc<Self> {
        Arc::new(Self { root })
    }

    /// Game view inside a navigation stack with a settings sheet on top
    pub fn game_with_settings_sheet() -> Arc<Self> {
        let game = Surface::plain("game-view").presenting(Surface::plain("settings-sheet"));
        Self::new(Surface::navigation("root-nav", Some(game)))
    }
}

impl UiHierarchy for FakeUi {
    fn scenes(&self) -> Vec<WindowScene> {
        vec![WindowScene {
            activation: ActivationState::ForegroundActive,
            windows: vec![Window {
                is_key: true,
                root: Some(self.root.clone()),
            }],
        }]
    }
}

/// Bridge wired to fakes, configured from `config`
pub fn bridge_with(
    config: &str,
    auth: &Arc<FakeAuth>,
    google: Option<&Arc<FakeGoogle>>,
) -> (AuthBridge, EventPump) {
    let mut builder = AuthBridge::builder()
        .config_json(config)
        .primary_provider(Arc::clone(auth) as Arc<dyn IdentityProvider>)
        .ui_hierarchy(FakeUi::game_with_settings_sheet());
    if let Some(google) = google {
        builder = builder.federated_provider(Arc::clone(google) as Arc<dyn FederatedSignIn>);
    }
    builder.build().expect("bridge builds inside a runtime")
}

/// Bridge already past `initialize`, with the `initialized` event consumed
pub fn initialized_bridge(
    auth: &Arc<FakeAuth>,
    google: Option<&Arc<FakeGoogle>>,
) -> (AuthBridge, EventPump) {
    let (bridge, mut pump) = bridge_with(CONFIG, auth, google);
    bridge.initialize();
    assert_eq!(pump.try_next_event(), Some(AuthEvent::Initialized));
    (bridge, pump)
}

/// Wait for the next event, failing the test after a few seconds
pub async fn next_event(pump: &mut EventPump) -> AuthEvent {
    tokio::time::timeout(Duration::from_secs(5), pump.next_event())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
