//! Spotify catalog client.
//!
//! Authenticates with the client-credentials grant and searches tracks by
//! title and artist. The access token lives in an explicit [`Session`] that is
//! renewed shortly before it expires, so long batches keep working.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use serde::Deserialize;
use std::io;
use std::time::{Duration, Instant};

use crate::config::Credentials;
use crate::models::{ArtworkCandidate, SearchTerms};

pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// Renew the token when it expires within this window.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Used when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

// ============================================================================
// Wire Models
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_lifetime")]
    expires_in: u64,
}

fn default_lifetime() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: TrackPage,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<TrackItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub album: AlbumObject,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlbumObject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<ImageObject>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArtistObject {
    #[serde(default)]
    pub name: String,
}

/// Width and height may be null in catalog responses.
#[derive(Debug, Default, Deserialize)]
pub struct ImageObject {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl From<&ImageObject> for ArtworkCandidate {
    fn from(image: &ImageObject) -> Self {
        ArtworkCandidate {
            url: image.url.clone(),
            width: image.width.unwrap_or(0),
            height: image.height.unwrap_or(0),
        }
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Tallest candidate; the first one listed wins ties.
pub fn select_largest(candidates: &[ArtworkCandidate]) -> Option<&ArtworkCandidate> {
    // Not max_by_key: that returns the last of equal maxima.
    candidates.iter().fold(None, |best, candidate| match best {
        Some(b) if candidate.height <= b.height => Some(b),
        _ => Some(candidate),
    })
}

/// Best image of the top search match, if any.
pub fn best_artwork(response: &SearchResponse) -> Option<ArtworkCandidate> {
    let top = response.tracks.items.first()?;
    let candidates: Vec<ArtworkCandidate> = top.album.images.iter().map(Into::into).collect();
    select_largest(&candidates).cloned()
}

/// Field-filtered query text, e.g. `track:Song artist:Band`.
/// Reserved characters in the terms are passed through unchanged.
pub fn build_query(terms: &SearchTerms) -> String {
    format!("track:{} artist:{}", terms.title, terms.artist)
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("token request rejected with HTTP {status}: {body}")]
    AuthRejected { status: u16, body: String },

    #[error("search rejected with HTTP {status}: {body}")]
    SearchRejected { status: u16, body: String },

    #[error("catalog request failed: {0}")]
    Transport(Box<ureq::Transport>),

    #[error("could not decode {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    fn from_ureq(error: ureq::Error, rejected: fn(u16, String) -> CatalogError) -> Self {
        match error {
            ureq::Error::Status(status, response) => {
                rejected(status, response.into_string().unwrap_or_default())
            }
            ureq::Error::Transport(transport) => CatalogError::Transport(Box::new(transport)),
        }
    }

    fn is_unauthorized(&self) -> bool {
        matches!(self, CatalogError::SearchRejected { status: 401, .. })
    }
}

// ============================================================================
// Session and Client
// ============================================================================

/// Bearer token with its expiry instant.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
    expires_at: Instant,
}

impl Session {
    pub fn new(access_token: String, lifetime: Duration, now: Instant) -> Self {
        Self {
            access_token,
            expires_at: now + lifetime,
        }
    }

    /// True once `now` is within [`EXPIRY_MARGIN`] of expiry.
    pub fn needs_refresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Looks up cover artwork for a track.
pub trait ArtworkLocator {
    /// `Ok(None)` when the catalog has no match or the match has no images.
    fn locate(&mut self, terms: &SearchTerms) -> Result<Option<ArtworkCandidate>, CatalogError>;
}

pub struct SpotifyCatalog {
    agent: ureq::Agent,
    credentials: Credentials,
    token_url: String,
    search_url: String,
    session: Option<Session>,
}

impl SpotifyCatalog {
    /// Create a client for the public Spotify endpoints and authenticate immediately.
    pub fn connect(agent: ureq::Agent, credentials: Credentials) -> Result<Self, CatalogError> {
        Self::connect_to(agent, credentials, TOKEN_URL, SEARCH_URL)
    }

    /// Same as [`SpotifyCatalog::connect`] against explicit token and search URLs.
    pub fn connect_to(
        agent: ureq::Agent,
        credentials: Credentials,
        token_url: &str,
        search_url: &str,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self {
            agent,
            credentials,
            token_url: token_url.to_string(),
            search_url: search_url.to_string(),
            session: None,
        };
        catalog.authenticate()?;
        Ok(catalog)
    }

    fn authenticate(&mut self) -> Result<&Session, CatalogError> {
        let basic = STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));
        let response = self
            .agent
            .post(&self.token_url)
            .set("Authorization", &format!("Basic {basic}"))
            .send_form(&[("grant_type", "client_credentials")])
            .map_err(|e| CatalogError::from_ureq(e, |status, body| {
                CatalogError::AuthRejected { status, body }
            }))?;
        let token: TokenResponse = response
            .into_json()
            .map_err(|source| CatalogError::Decode { what: "token", source })?;

        info!("Authenticated with Spotify (token valid for {}s)", token.expires_in);
        let session = Session::new(
            token.access_token,
            Duration::from_secs(token.expires_in),
            Instant::now(),
        );
        Ok(&*self.session.insert(session))
    }

    fn access_token(&mut self) -> Result<String, CatalogError> {
        match &self.session {
            Some(session) if !session.needs_refresh(Instant::now()) => {
                Ok(session.access_token.clone())
            }
            _ => {
                debug!("Access token missing or about to expire, re-authenticating");
                Ok(self.authenticate()?.access_token.clone())
            }
        }
    }

    fn search(&mut self, query: &str) -> Result<SearchResponse, CatalogError> {
        let token = self.access_token()?;
        let response = self
            .agent
            .get(&self.search_url)
            .set("Authorization", &format!("Bearer {token}"))
            .query("q", query)
            .query("type", "track")
            .query("limit", "1")
            .call()
            .map_err(|e| CatalogError::from_ureq(e, |status, body| {
                CatalogError::SearchRejected { status, body }
            }))?;
        response
            .into_json()
            .map_err(|source| CatalogError::Decode { what: "search", source })
    }
}

impl ArtworkLocator for SpotifyCatalog {
    fn locate(&mut self, terms: &SearchTerms) -> Result<Option<ArtworkCandidate>, CatalogError> {
        let query = build_query(terms);
        debug!("Searching catalog: {}", query);

        let response = match self.search(&query) {
            Err(e) if e.is_unauthorized() => {
                debug!("Search unauthorized, retrying with a fresh token");
                self.session = None;
                self.search(&query)?
            }
            other => other?,
        };

        if let Some(top) = response.tracks.items.first() {
            let artists: Vec<&str> = top.artists.iter().map(|a| a.name.as_str()).collect();
            debug!(
                "Top match: '{}' by {} from '{}' ({} images)",
                top.name,
                artists.join(", "),
                top.album.name,
                top.album.images.len()
            );
        }

        let best = best_artwork(&response);
        if let Some(candidate) = &best {
            debug!(
                "Selected image {}x{}: {}",
                candidate.width, candidate.height, candidate.url
            );
        }
        Ok(best)
    }
}
