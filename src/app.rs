//! App configuration
//!
//! Loads [`AppOptions`] from the bundled configuration resource. The resource
//! is a JSON object using the `GoogleService-Info` key names:
//!
//! ```json
//! {
//!   "API_KEY": "AIza...",
//!   "PROJECT_ID": "my-project",
//!   "CLIENT_ID": "1234-abc.apps.googleusercontent.com",
//!   "GOOGLE_APP_ID": "1:1234:ios:abcd",
//!   "BUNDLE_ID": "com.example.game"
//! }
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Default resource name looked up by the bridge
pub const DEFAULT_CONFIG_RESOURCE: &str = "GoogleService-Info.json";

/// Firebase App configuration options
///
/// Holds the credentials and project configuration that the primary and
/// secondary providers use.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AppOptions {
    /// Firebase API key
    #[serde(rename = "API_KEY", default)]
    pub api_key: String,
    /// Google Cloud project ID
    #[serde(rename = "PROJECT_ID", default)]
    pub project_id: String,
    /// OAuth client ID used by Google Sign-In
    #[serde(rename = "CLIENT_ID", default)]
    pub client_id: Option<String>,
    /// Firebase app ID
    #[serde(rename = "GOOGLE_APP_ID", default)]
    pub app_id: Option<String>,
    /// Application bundle identifier
    #[serde(rename = "BUNDLE_ID", default)]
    pub bundle_id: Option<String>,
    /// Storage bucket
    #[serde(rename = "STORAGE_BUCKET", default)]
    pub storage_bucket: Option<String>,
    /// `host:port` of a Firebase Auth emulator; REST calls go there when set
    #[serde(rename = "AUTH_EMULATOR_HOST", default)]
    pub auth_emulator_host: Option<String>,
}

impl AppOptions {
    /// Create options from an API key and project ID
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            client_id: None,
            app_id: None,
            bundle_id: None,
            storage_bucket: None,
            auth_emulator_host: None,
        }
    }

    /// Set the OAuth client ID
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Point REST calls at an Auth emulator
    pub fn with_auth_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.auth_emulator_host = Some(host.into());
        self
    }

    /// Load options from a bundled resource file
    ///
    /// # Example
    /// ```no_run
    /// use firebase_auth_bridge::AppOptions;
    ///
    /// let options = AppOptions::from_resource("GoogleService-Info.json")?;
    /// println!("project: {}", options.project_id);
    /// # Ok::<(), firebase_auth_bridge::error::ConfigError>(())
    /// ```
    pub fn from_resource(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        // Error case first: resource missing from the bundle
        if !path.exists() {
            return Err(ConfigError::NotFound(display));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        Self::from_json(&raw).map_err(|err| match err {
            ConfigError::Malformed { source, .. } => ConfigError::Malformed { path: display, source },
            other => other,
        })
    }

    /// Parse options from the resource's JSON text
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let options: AppOptions = serde_json::from_str(raw).map_err(|source| ConfigError::Malformed {
            path: "<inline>".to_string(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Check required keys
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("API_KEY"));
        }
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::MissingField("PROJECT_ID"));
        }
        Ok(())
    }

    /// OAuth client ID, if configured and non-empty
    pub fn oauth_client_id(&self) -> Option<&str> {
        self.client_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}
