//! Core data models for the artwork embedding pipeline.
//!
//! This module contains the plain data carried between pipeline stages:
//! tag values read from a file, the resolved search terms, the chosen remote
//! image and the per-file embedding job.

use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Container Families
// ============================================================================

/// Audio container category. Governs which embedding strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFamily {
    Mp3,
    /// mp4/m4a/mov family (ISO base media)
    Mp4,
    Flac,
    /// Embedded through the generic remux
    Wav,
}

impl ContainerFamily {
    /// Map a probe format name to a known family.
    /// Only the first comma-separated alternate is considered ("mov,mp4,m4a" -> "mov").
    pub fn from_probe_name(name: &str) -> Option<Self> {
        let first = name.split(',').next().unwrap_or("").trim();
        match first.to_ascii_lowercase().as_str() {
            "mp3" => Some(ContainerFamily::Mp3),
            "mov" | "mp4" | "m4a" | "3gp" | "3g2" | "mj2" | "ipod" => Some(ContainerFamily::Mp4),
            "flac" => Some(ContainerFamily::Flac),
            "wav" => Some(ContainerFamily::Wav),
            _ => None,
        }
    }

    /// Infer the family from a file extension (case-insensitive).
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(ContainerFamily::Mp3),
            "m4a" | "mp4" => Some(ContainerFamily::Mp4),
            "flac" => Some(ContainerFamily::Flac),
            "wav" => Some(ContainerFamily::Wav),
            _ => None,
        }
    }

    /// Output container name passed to the remuxer (`-f`).
    pub fn muxer(self) -> &'static str {
        match self {
            ContainerFamily::Mp3 => "mp3",
            ContainerFamily::Mp4 => "mp4",
            ContainerFamily::Flac => "flac",
            ContainerFamily::Wav => "wav",
        }
    }
}

impl fmt::Display for ContainerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.muxer())
    }
}

// ============================================================================
// Tags and Search Terms
// ============================================================================

/// Tag values read from an audio file. Missing tags are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTriple {
    pub artist: String,
    pub album: String,
    pub title: String,
}

/// Artist/title pair submitted to the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    pub artist: String,
    pub title: String,
}

// ============================================================================
// Artwork and Jobs
// ============================================================================

/// One image offered by the catalog for a search match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkCandidate {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Everything the committer needs to embed one image into one file.
/// Owned by a single pipeline run and never shared across files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingJob {
    pub source: PathBuf,
    pub artwork: PathBuf,
    pub family: ContainerFamily,
    pub replace_existing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_name_first_token() {
        assert_eq!(ContainerFamily::from_probe_name("mp3"), Some(ContainerFamily::Mp3));
        assert_eq!(
            ContainerFamily::from_probe_name("mov,mp4,m4a,3gp,3g2,mj2"),
            Some(ContainerFamily::Mp4)
        );
        assert_eq!(ContainerFamily::from_probe_name("flac"), Some(ContainerFamily::Flac));
        assert_eq!(ContainerFamily::from_probe_name("wav"), Some(ContainerFamily::Wav));
        assert_eq!(ContainerFamily::from_probe_name("ogg"), None);
        assert_eq!(ContainerFamily::from_probe_name(""), None);
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(
            ContainerFamily::from_extension(Path::new("/music/a.M4A")),
            Some(ContainerFamily::Mp4)
        );
        assert_eq!(
            ContainerFamily::from_extension(Path::new("b.FLAC")),
            Some(ContainerFamily::Flac)
        );
        assert_eq!(ContainerFamily::from_extension(Path::new("c.ogg")), None);
        assert_eq!(ContainerFamily::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_muxer_names() {
        assert_eq!(ContainerFamily::Mp4.muxer(), "mp4");
        assert_eq!(ContainerFamily::Flac.muxer(), "flac");
        assert_eq!(ContainerFamily::Wav.to_string(), "wav");
    }
}
