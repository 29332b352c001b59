//! Search term resolution.
//!
//! Turns the tag triple of a file into the artist/title pair sent to the
//! catalog, deriving the title from the filename when the tag is empty.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::models::{SearchTerms, TagTriple};

/// Substituted when the artist tag is empty.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Matches a leading track index followed by separators: "01 - ", "7. ", "003_"
pub static TRACK_INDEX_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,3}[\s._-]+").unwrap());

/// Matches a bare leading track index: "7Song" -> "Song"
pub static TRACK_INDEX_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,3}").unwrap());

// ============================================================================
// RESOLUTION
// ============================================================================

/// Derive a title from a filename.
///
/// Strips the extension, then a leading 1-3 digit index (with its separators
/// when present), trims whitespace and turns underscores into spaces.
pub fn title_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Only the first matching pattern applies
    let stripped = if TRACK_INDEX_PREFIX.is_match(&stem) {
        TRACK_INDEX_PREFIX.replace(&stem, "")
    } else {
        TRACK_INDEX_BARE.replace(&stem, "")
    };

    let title = stripped.trim().replace('_', " ");
    debug!("Title from filename: '{}' -> '{}'", stem, title);
    title
}

/// Resolve search terms, or `None` when no title can be found.
pub fn resolve_search_terms(tags: &TagTriple, path: &Path) -> Option<SearchTerms> {
    let artist = if tags.artist.trim().is_empty() {
        UNKNOWN_ARTIST.to_string()
    } else {
        tags.artist.clone()
    };

    let title = if tags.title.trim().is_empty() {
        title_from_filename(path)
    } else {
        tags.title.clone()
    };

    if title.is_empty() {
        return None;
    }
    Some(SearchTerms { artist, title })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(artist: &str, album: &str, title: &str) -> TagTriple {
        TagTriple {
            artist: artist.to_string(),
            album: album.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_title_from_filename_separators() {
        assert_eq!(title_from_filename(Path::new("07 - Song Name.mp3")), "Song Name");
        assert_eq!(title_from_filename(Path::new("01. Intro.flac")), "Intro");
        assert_eq!(title_from_filename(Path::new("/music/003_Deep_Cut.m4a")), "Deep Cut");
        assert_eq!(title_from_filename(Path::new("12-Finale.wav")), "Finale");
    }

    #[test]
    fn test_title_from_filename_bare_digits() {
        assert_eq!(title_from_filename(Path::new("7Song.mp3")), "Song");
        // Only up to three digits are an index
        assert_eq!(title_from_filename(Path::new("1999 Party.mp3")), "9 Party");
    }

    #[test]
    fn test_title_from_filename_no_index() {
        assert_eq!(title_from_filename(Path::new("a.mp3")), "a");
        assert_eq!(title_from_filename(Path::new("  Spaced Out  .mp3")), "Spaced Out");
    }

    #[test]
    fn test_title_from_filename_only_digits() {
        assert_eq!(title_from_filename(Path::new("01.mp3")), "");
        assert_eq!(title_from_filename(Path::new("42 - .mp3")), "");
    }

    #[test]
    fn test_tags_used_verbatim() {
        let terms = resolve_search_terms(&tags("Artist", "Album", "Title"), Path::new("01 x.mp3"));
        assert_eq!(
            terms,
            Some(SearchTerms {
                artist: "Artist".to_string(),
                title: "Title".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_artist_defaults() {
        let terms = resolve_search_terms(&tags("", "", "Title"), Path::new("x.mp3")).unwrap();
        assert_eq!(terms.artist, UNKNOWN_ARTIST);
        assert_eq!(terms.title, "Title");
    }

    #[test]
    fn test_empty_title_uses_filename() {
        let terms = resolve_search_terms(&tags("X", "Y", ""), Path::new("/lib/a.mp3")).unwrap();
        assert_eq!(terms.artist, "X");
        assert_eq!(terms.title, "a");
    }

    #[test]
    fn test_whitespace_only_tags_count_as_empty() {
        let terms = resolve_search_terms(&tags("  ", "", " \t"), Path::new("02 Song.mp3")).unwrap();
        assert_eq!(terms.artist, UNKNOWN_ARTIST);
        assert_eq!(terms.title, "Song");
    }

    #[test]
    fn test_unresolvable_title() {
        assert_eq!(resolve_search_terms(&tags("X", "Y", ""), Path::new("05.mp3")), None);
    }
}
