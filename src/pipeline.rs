//! Per-file artwork pipeline.
//!
//! presence check -> search terms -> catalog lookup -> image download ->
//! strategy selection -> transactional commit
//!
//! Expected misses (artwork already present, no usable title, no catalog
//! match) are reported as [`FileOutcome::Skipped`]; everything else that goes
//! wrong for a file is a [`PipelineError`]. Neither stops a batch.

use log::{debug, info, warn};
use std::fmt;
use std::path::Path;

use crate::catalog::{ArtworkLocator, CatalogError};
use crate::commit::{commit_embedding, CommitError};
use crate::detect::{detect_family, has_front_cover};
use crate::fetch::{FetchError, ImageFetcher, ScratchImage};
use crate::media::MediaTool;
use crate::models::EmbeddingJob;
use crate::resolve::resolve_search_terms;
use crate::tags::TagReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Front cover present and replacement not forced
    ArtworkPresent,
    /// No title tag and nothing usable in the filename
    NoTitle,
    /// Catalog returned no match, or a match without images
    NoMatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::ArtworkPresent => "artwork already present (use --force to replace)",
            SkipReason::NoTitle => "no title tag and no title derivable from the filename",
            SkipReason::NoMatch => "no artwork found in the catalog",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Embedded { replaced: bool },
    Skipped(SkipReason),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("could not read tags: {0}")]
    Tags(#[from] lofty::error::LoftyError),

    #[error("artwork search failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

pub struct Pipeline {
    tool: Box<dyn MediaTool>,
    tags: Box<dyn TagReader>,
    locator: Box<dyn ArtworkLocator>,
    fetcher: Box<dyn ImageFetcher>,
    scratch: ScratchImage,
    force_overwrite: bool,
}

impl Pipeline {
    pub fn new(
        tool: Box<dyn MediaTool>,
        tags: Box<dyn TagReader>,
        locator: Box<dyn ArtworkLocator>,
        fetcher: Box<dyn ImageFetcher>,
        scratch: ScratchImage,
        force_overwrite: bool,
    ) -> Self {
        Self {
            tool,
            tags,
            locator,
            fetcher,
            scratch,
            force_overwrite,
        }
    }

    pub fn process_file(&mut self, path: &Path) -> Result<FileOutcome, PipelineError> {
        info!("Processing {}", path.display());

        let has_artwork = match has_front_cover(self.tool.as_ref(), path) {
            Ok(present) => present,
            Err(e) => {
                warn!(
                    "Could not check existing artwork of {} ({}), continuing as if none",
                    path.display(),
                    e
                );
                false
            }
        };
        if has_artwork && !self.force_overwrite {
            return Ok(FileOutcome::Skipped(SkipReason::ArtworkPresent));
        }
        if has_artwork {
            info!("Existing artwork will be replaced");
        }

        let tags = self.tags.read(path)?;
        debug!(
            "Tags: artist='{}' album='{}' title='{}'",
            tags.artist, tags.album, tags.title
        );

        let Some(terms) = resolve_search_terms(&tags, path) else {
            return Ok(FileOutcome::Skipped(SkipReason::NoTitle));
        };
        debug!("Search terms: artist='{}' title='{}'", terms.artist, terms.title);

        let Some(candidate) = self.locator.locate(&terms)? else {
            return Ok(FileOutcome::Skipped(SkipReason::NoMatch));
        };

        let scratch = self.scratch.claim();
        self.fetcher.fetch(&candidate.url, scratch.path())?;

        let family = detect_family(self.tool.as_ref(), path);
        debug!("Detected container family: {}", family);

        let job = EmbeddingJob {
            source: path.to_path_buf(),
            artwork: scratch.path().to_path_buf(),
            family,
            replace_existing: has_artwork,
        };
        let codec = commit_embedding(self.tool.as_ref(), &job)?;
        info!(
            "Embedded {}x{} artwork into {} (image codec {})",
            candidate.width,
            candidate.height,
            path.display(),
            codec.as_ffmpeg()
        );

        Ok(FileOutcome::Embedded {
            replaced: has_artwork,
        })
    }
}
