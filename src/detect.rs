//! Format detection and artwork presence checks.

use log::debug;
use std::path::Path;

use crate::media::{MediaError, MediaTool};
use crate::models::ContainerFamily;

/// Detect the container family of `path`. Never fails.
///
/// Order of preference:
/// 1. probe format name (first comma-separated alternate) mapped to a known family
/// 2. file extension
/// 3. `mp3`
pub fn detect_family(tool: &dyn MediaTool, path: &Path) -> ContainerFamily {
    let probe_name = match tool.probe(path) {
        Ok(report) => report.format.map(|f| f.format_name).unwrap_or_default(),
        Err(e) => {
            debug!("Format probe failed for {}: {}", path.display(), e);
            String::new()
        }
    };

    if let Some(family) = ContainerFamily::from_probe_name(&probe_name) {
        return family;
    }
    if let Some(family) = ContainerFamily::from_extension(path) {
        return family;
    }

    debug!(
        "No known family for {} (probe name '{}'), assuming mp3",
        path.display(),
        probe_name
    );
    ContainerFamily::Mp3
}

/// Whether `path` already carries a front-cover image stream.
///
/// `Ok(false)` means the file was probed and has no such stream; an `Err`
/// means presence could not be determined.
pub fn has_front_cover(tool: &dyn MediaTool, path: &Path) -> Result<bool, MediaError> {
    let report = tool.probe(path)?;
    Ok(report.streams.iter().any(|s| s.is_front_cover()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::{FakeMediaTool, ART_MARKER};
    use std::fs;

    #[test]
    fn test_known_probe_name_wins_over_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mislabelled.mp3");
        fs::write(&path, b"audio").unwrap();
        let tool = FakeMediaTool::with_format("flac");
        assert_eq!(detect_family(&tool, &path), ContainerFamily::Flac);
    }

    #[test]
    fn test_mov_family_maps_to_mp4() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.m4a");
        fs::write(&path, b"audio").unwrap();
        let tool = FakeMediaTool::with_format("mov,mp4,m4a,3gp,3g2,mj2");
        assert_eq!(detect_family(&tool, &path), ContainerFamily::Mp4);
    }

    #[test]
    fn test_probe_failure_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.WAV");
        fs::write(&path, b"audio").unwrap();
        let tool = FakeMediaTool {
            fail_probe: true,
            ..Default::default()
        };
        assert_eq!(detect_family(&tool, &path), ContainerFamily::Wav);
    }

    #[test]
    fn test_unrecognized_name_and_extension_defaults_to_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.oga");
        fs::write(&path, b"audio").unwrap();
        let tool = FakeMediaTool::with_format("ogg");
        assert_eq!(detect_family(&tool, &path), ContainerFamily::Mp3);
    }

    #[test]
    fn test_unrecognized_name_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.m4a");
        fs::write(&path, b"audio").unwrap();
        let tool = FakeMediaTool::with_format("matroska,webm");
        assert_eq!(detect_family(&tool, &path), ContainerFamily::Mp4);
    }

    #[test]
    fn test_nothing_known_defaults_to_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery.bin");
        fs::write(&path, b"audio").unwrap();
        let tool = FakeMediaTool {
            fail_probe: true,
            ..Default::default()
        };
        assert_eq!(detect_family(&tool, &path), ContainerFamily::Mp3);
    }

    #[test]
    fn test_front_cover_presence() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("bare.mp3");
        let covered = dir.path().join("covered.mp3");
        fs::write(&bare, b"audio").unwrap();
        fs::write(&covered, [b"audio".as_slice(), ART_MARKER].concat()).unwrap();
        let tool = FakeMediaTool::with_format("mp3");

        assert!(!has_front_cover(&tool, &bare).unwrap());
        assert!(has_front_cover(&tool, &covered).unwrap());
    }

    #[test]
    fn test_presence_probe_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        fs::write(&path, b"audio").unwrap();
        let tool = FakeMediaTool {
            fail_probe: true,
            ..Default::default()
        };
        assert!(has_front_cover(&tool, &path).is_err());
    }
}
