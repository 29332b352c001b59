//! Image download and the per-process scratch image path.

use log::{debug, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shared blocking HTTP agent with an overall per-call timeout.
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("image download from {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("image download from {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Transport>,
    },

    #[error("could not create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("image transfer from {url} was interrupted: {source}")]
    Interrupted {
        url: String,
        #[source]
        source: io::Error,
    },
}

/// Streams a remote image to a local file.
pub trait ImageFetcher {
    /// Returns the number of bytes written to `dest`.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

pub struct HttpImageFetcher {
    agent: ureq::Agent,
}

impl HttpImageFetcher {
    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => FetchError::Transport {
                url: url.to_string(),
                source: Box::new(transport),
            },
        })?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let mut file = File::create(dest).map_err(|source| FetchError::Create {
            path: dest.to_path_buf(),
            source,
        })?;
        let written = io::copy(&mut response.into_reader(), &mut file).map_err(|source| {
            FetchError::Interrupted {
                url: url.to_string(),
                source,
            }
        })?;
        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}

// ============================================================================
// Scratch Image
// ============================================================================

/// Process-wide location for the downloaded image.
#[derive(Debug, Clone)]
pub struct ScratchImage {
    path: PathBuf,
}

impl ScratchImage {
    /// `<tmp>/artwork-embed-<pid>.jpg`
    pub fn for_process() -> Self {
        let name = format!("artwork-embed-{}.jpg", std::process::id());
        Self::at(std::env::temp_dir().join(name))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Guard that deletes the scratch file when dropped.
    pub fn claim(&self) -> ScratchGuard<'_> {
        ScratchGuard { path: &self.path }
    }
}

pub struct ScratchGuard<'a> {
    path: &'a Path,
}

impl ScratchGuard<'_> {
    pub fn path(&self) -> &Path {
        self.path
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        match fs::remove_file(self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove scratch image {}: {}", self.path.display(), e),
        }
    }
}
