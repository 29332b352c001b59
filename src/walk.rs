//! Directory walker: finds audio files under a root and runs the pipeline on
//! each one, isolating per-file failures.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::pipeline::{FileOutcome, Pipeline, PipelineError, SkipReason};
use crate::progress::{create_progress_bar, create_spinner, log_progress, report_interval};

/// Extensions picked up by the walker, compared case-insensitively.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "m4a", "flac", "wav"];

pub fn is_candidate(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|ext| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// All candidate files under `root`, in file-name order.
///
/// Fails only when `root` itself cannot be read; unreadable entries below it
/// are logged and skipped. Symbolic links are not followed or processed.
pub fn collect_candidates(root: &Path) -> Result<Vec<PathBuf>> {
    fs::read_dir(root).with_context(|| format!("Cannot read directory {}", root.display()))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !is_candidate(entry.path()) {
            continue;
        }
        if entry.path_is_symlink() {
            debug!("Skipping symbolic link {}", entry.path().display());
        } else if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

// ============================================================================
// Run Summary
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkSummary {
    pub embedded: usize,
    /// Subset of `embedded` that replaced existing artwork
    pub replaced: usize,
    pub skipped_present: usize,
    pub skipped_no_title: usize,
    pub skipped_no_match: usize,
    pub failed: Vec<PathBuf>,
}

impl WalkSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_present + self.skipped_no_title + self.skipped_no_match
    }

    pub fn total(&self) -> usize {
        self.embedded + self.skipped() + self.failed.len()
    }

    /// Count one file's result and log it.
    pub fn record(&mut self, path: &Path, result: Result<FileOutcome, PipelineError>) {
        match result {
            Ok(FileOutcome::Embedded { replaced }) => {
                self.embedded += 1;
                if replaced {
                    self.replaced += 1;
                }
            }
            Ok(FileOutcome::Skipped(reason)) => {
                warn!("Skipping {}: {}", path.display(), reason);
                match reason {
                    SkipReason::ArtworkPresent => self.skipped_present += 1,
                    SkipReason::NoTitle => self.skipped_no_title += 1,
                    SkipReason::NoMatch => self.skipped_no_match += 1,
                }
            }
            Err(e) => {
                error!("Failed to process {}: {}", path.display(), e);
                self.failed.push(path.to_path_buf());
            }
        }
    }
}

/// Walk `root` and process every candidate file in order.
pub fn process_directory(pipeline: &mut Pipeline, root: &Path) -> Result<WalkSummary> {
    let spinner = create_spinner(root);
    let files = collect_candidates(root);
    spinner.finish_and_clear();
    let files = files?;
    info!("Found {} audio files under {}", files.len(), root.display());

    let total = files.len() as u64;
    let interval = report_interval(total);
    let pb = create_progress_bar(total, "Embedding artwork");
    let mut summary = WalkSummary::default();

    for (i, path) in files.iter().enumerate() {
        if let Some(name) = path.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        let result = pb.suspend(|| pipeline.process_file(path));
        pb.suspend(|| summary.record(path, result));
        pb.inc(1);
        log_progress("embed", i as u64 + 1, total, interval);
    }
    pb.finish_and_clear();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ScratchImage;
    use crate::media::testing::{has_marker, FakeMediaTool};
    use crate::models::TagTriple;
    use crate::pipeline::testing::{candidate, FakeCatalog, FakeFetcher, FakeTags};
    use std::collections::HashMap;

    fn pipeline(dir: &Path, tool: FakeMediaTool, found: bool) -> Pipeline {
        let mut tags = HashMap::new();
        for name in ["one.mp3", "two.MP3", "three.flac"] {
            tags.insert(
                name.to_string(),
                TagTriple {
                    artist: "X".to_string(),
                    album: "Y".to_string(),
                    title: name.to_string(),
                },
            );
        }
        let catalog = FakeCatalog {
            candidate: found.then(candidate),
            ..Default::default()
        };
        Pipeline::new(
            Box::new(tool),
            Box::new(FakeTags(tags)),
            Box::new(catalog),
            Box::new(FakeFetcher::default()),
            ScratchImage::at(dir.join("scratch.jpg")),
            false,
        )
    }

    #[test]
    fn test_is_candidate() {
        assert!(is_candidate(Path::new("a.mp3")));
        assert!(is_candidate(Path::new("a.M4A")));
        assert!(is_candidate(Path::new("dir/a.Flac")));
        assert!(is_candidate(Path::new("a.wav")));
        assert!(!is_candidate(Path::new("a.ogg")));
        assert!(!is_candidate(Path::new("cover.jpg")));
        assert!(!is_candidate(Path::new("mp3")));
    }

    #[test]
    fn test_collect_filters_and_sorts() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("disc2");
        fs::create_dir(&nested).unwrap();
        for name in ["b.mp3", "a.FLAC", "notes.txt", "cover.jpg"] {
            fs::write(root.path().join(name), b"x").unwrap();
        }
        fs::write(nested.join("c.m4a"), b"x").unwrap();

        let files = collect_candidates(root.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.FLAC"),
                PathBuf::from("b.mp3"),
                PathBuf::from("disc2/c.m4a"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_audio_not_collected() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("elsewhere.mp3");
        fs::write(&target, b"x").unwrap();
        fs::write(root.path().join("real.mp3"), b"x").unwrap();
        std::os::unix::fs::symlink(&target, root.path().join("linked.mp3")).unwrap();

        let files = collect_candidates(root.path()).unwrap();
        assert_eq!(files, vec![root.path().join("real.mp3")]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        assert!(collect_candidates(&root.path().join("nope")).is_err());
    }

    #[test]
    fn test_one_failure_does_not_stop_batch() {
        let root = tempfile::tempdir().unwrap();
        let music = root.path().join("music");
        fs::create_dir(&music).unwrap();
        for name in ["one.mp3", "two.MP3", "three.flac", "readme.txt"] {
            fs::write(music.join(name), b"audio").unwrap();
        }
        let tool = FakeMediaTool {
            format_name: Some("mp3".to_string()),
            fail_sources: vec!["two.MP3".to_string()],
            ..Default::default()
        };
        let mut pipeline = pipeline(root.path(), tool, true);

        let summary = process_directory(&mut pipeline, &music).unwrap();
        assert_eq!(summary.embedded, 2);
        assert_eq!(summary.failed, vec![music.join("two.MP3")]);
        assert_eq!(summary.total(), 3);

        assert!(has_marker(&fs::read(music.join("one.mp3")).unwrap()));
        assert!(has_marker(&fs::read(music.join("three.flac")).unwrap()));
        assert_eq!(fs::read(music.join("two.MP3")).unwrap(), b"audio");
        assert_eq!(fs::read(music.join("readme.txt")).unwrap(), b"audio");
        let leftovers: Vec<_> = fs::read_dir(&music)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".backup") || n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "leftover side files: {:?}", leftovers);
    }

    #[test]
    fn test_no_match_counts_as_skip() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("one.mp3"), b"audio").unwrap();
        let mut pipeline = pipeline(root.path(), FakeMediaTool::with_format("mp3"), false);

        let summary = process_directory(&mut pipeline, root.path()).unwrap();
        assert_eq!(summary.skipped_no_match, 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.embedded, 0);
        assert!(summary.failed.is_empty());
    }
}
