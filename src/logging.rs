//! Logging setup
//!
//! The crate logs through `tracing`. Hosts that don't install their own
//! subscriber can call [`init_tracing`].

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "firebase_auth_bridge=info";

/// Install a fmt subscriber filtered by `RUST_LOG`
///
/// Returns false if a global subscriber was already set.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
