//! Firebase Auth Bridge
//!
//! Exposes Firebase Authentication and Google Sign-In to event-driven hosts
//! such as game-engine scripting layers. Operations are fire-and-forget;
//! results come back as [`AuthEvent`]s on the host's designated context.
//!
//! # Example (Anonymous Auth)
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use firebase_auth_bridge::{AuthBridge, AuthEvent};
//!
//! let (bridge, mut pump) = AuthBridge::builder()
//!     .config_resource("GoogleService-Info.json")
//!     .build()?;
//!
//! bridge.initialize();
//! bridge.sign_in_anonymously();
//!
//! while let Some(event) = pump.next_event().await {
//!     match event {
//!         AuthEvent::AuthSuccess(user) => println!("Signed in: {}", user.uid),
//!         AuthEvent::AuthFailure(message) => eprintln!("Failed: {}", message),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod anchor;
pub mod app;
pub mod bridge;
pub mod error;
pub mod events;
pub mod google;
pub mod logging;
pub mod provider;

// Auth module
pub mod auth {
    //! Firebase Authentication

    pub mod auth;
    pub mod types;

    pub use auth::Auth;
}

// Re-exports for convenience
pub use anchor::{Surface, UiHierarchy};
pub use app::AppOptions;
pub use auth::{types::{Credential, User, UserRecord}, Auth};
pub use bridge::{AuthBridge, BridgeBuilder, Operation, Reply};
pub use error::{AuthError, ConfigError, FirebaseError};
pub use events::{AuthEvent, EventPump, MainContext};
pub use google::{ConsentPresenter, GoogleSignIn};
pub use provider::{FederatedSignIn, IdentityProvider};
