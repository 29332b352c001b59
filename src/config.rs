//! Runtime configuration assembled from CLI flags and the environment.

use anyhow::{bail, Result};
use log::{debug, warn};
use std::env;
use std::time::Duration;

pub const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";

/// Applied to every HTTP call (token, search, image download).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog client credentials.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Both values must be non-empty.
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self> {
        let client_id = client_id.trim();
        let client_secret = client_secret.trim();
        if client_id.is_empty() || client_secret.is_empty() {
            bail!(
                "Spotify credentials are not set. Set {} and {} (environment, .env.local or .env)",
                CLIENT_ID_VAR,
                CLIENT_SECRET_VAR
            );
        }
        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let client_id = env::var(CLIENT_ID_VAR).unwrap_or_default();
        let client_secret = env::var(CLIENT_SECRET_VAR).unwrap_or_default();
        Self::new(&client_id, &client_secret)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Replace artwork that is already embedded
    pub force_overwrite: bool,
    pub credentials: Credentials,
    pub http_timeout: Duration,
}

impl Config {
    /// Load `.env.local` (or `.env`) and read credentials from the environment.
    pub fn load(force_overwrite: bool) -> Result<Self> {
        load_env_files();
        Ok(Self {
            force_overwrite,
            credentials: Credentials::from_env()?,
            http_timeout: HTTP_TIMEOUT,
        })
    }
}

/// Variables already present in the process environment are not overridden.
fn load_env_files() {
    match dotenvy::from_filename(".env.local") {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(local_err) => match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(err) => warn!(
                "No .env.local or .env file loaded ({}; {})",
                local_err, err
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_trimmed() {
        let creds = Credentials::new("  id ", "secret\n").unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.client_secret, "secret");
    }

    #[test]
    fn test_empty_credentials_rejected() {
        assert!(Credentials::new("", "secret").is_err());
        assert!(Credentials::new("id", "   ").is_err());
        let err = Credentials::new("", "").unwrap_err();
        assert!(err.to_string().contains(CLIENT_ID_VAR));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("id", "hunter2").unwrap();
        let shown = format!("{:?}", creds);
        assert!(shown.contains("id"));
        assert!(!shown.contains("hunter2"));
    }
}
