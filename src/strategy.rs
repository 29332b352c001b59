//! Container-specific embedding strategies.
//!
//! Each container family maps to one [`EmbedStrategy`]: which source streams
//! to keep, how to tag the cover, and an ordered list of image codecs to try.
//! The fallback chain is data; [`EmbedStrategy::embed`] walks it until one
//! remux succeeds.
//!
//! | Family | Attempts (image codec) | Cover tagging |
//! |---|---|---|
//! | mp3 | mjpeg | ID3v2.3 title/comment |
//! | mp4 | copy, png, mjpeg | attached_pic + title/comment, faststart |
//! | flac, wav | copy | attached_pic |

use log::{debug, warn};
use std::path::Path;

use crate::media::{MediaError, MediaTool, RemuxSpec};
use crate::models::{ContainerFamily, EmbeddingJob};

/// Keeps only the first source stream (the audio of a file without artwork).
const MAP_FIRST_STREAM: &str = "0:0";
/// Keeps every audio stream and drops any existing image track.
const MAP_AUDIO_ONLY: &str = "0:a";

const COVER_TITLE: &str = "title=Album cover";
const COVER_COMMENT: &str = "comment=Cover (front)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCodec {
    /// Stream-copy the downloaded image
    Copy,
    /// Re-encode as JPEG
    Mjpeg,
    /// Re-encode as lossless PNG
    Png,
}

impl ImageCodec {
    pub fn as_ffmpeg(self) -> &'static str {
        match self {
            ImageCodec::Copy => "copy",
            ImageCodec::Mjpeg => "mjpeg",
            ImageCodec::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoverTagging {
    /// ID3v2.3 with per-stream title/comment
    Id3v2,
    /// Attached-picture disposition only
    AttachedPic,
    /// Attached-picture disposition plus title/comment on the image stream
    AttachedPicWithTitle,
}

impl CoverTagging {
    fn stream_options(self) -> Vec<(String, String)> {
        let pairs: &[(&str, &str)] = match self {
            CoverTagging::Id3v2 => &[
                ("-id3v2_version", "3"),
                ("-metadata:s:v", COVER_TITLE),
                ("-metadata:s:v", COVER_COMMENT),
            ],
            CoverTagging::AttachedPic => &[("-disposition:v:0", "attached_pic")],
            CoverTagging::AttachedPicWithTitle => &[
                ("-disposition:v:0", "attached_pic"),
                ("-metadata:s:v:0", COVER_TITLE),
                ("-metadata:s:v:0", COVER_COMMENT),
            ],
        };
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("all {attempts} {muxer} embedding attempt(s) failed, last error: {last}")]
pub struct EmbedError {
    pub muxer: String,
    pub attempts: usize,
    #[source]
    pub last: MediaError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedStrategy {
    muxer: &'static str,
    source_map: &'static str,
    primary: ImageCodec,
    fallbacks: Vec<ImageCodec>,
    tagging: CoverTagging,
    faststart: bool,
}

impl EmbedStrategy {
    /// Pick the strategy for a family. Replacing only changes the source
    /// stream mapping; codecs and tagging are identical.
    pub fn select(family: ContainerFamily, replace_existing: bool) -> Self {
        let muxer = family.muxer();
        match family {
            ContainerFamily::Mp3 => Self {
                muxer,
                source_map: if replace_existing {
                    MAP_AUDIO_ONLY
                } else {
                    MAP_FIRST_STREAM
                },
                primary: ImageCodec::Mjpeg,
                fallbacks: Vec::new(),
                tagging: CoverTagging::Id3v2,
                faststart: false,
            },
            ContainerFamily::Mp4 => Self {
                muxer,
                source_map: MAP_AUDIO_ONLY,
                primary: ImageCodec::Copy,
                fallbacks: vec![ImageCodec::Png, ImageCodec::Mjpeg],
                tagging: CoverTagging::AttachedPicWithTitle,
                faststart: true,
            },
            ContainerFamily::Flac | ContainerFamily::Wav => Self {
                muxer,
                source_map: MAP_AUDIO_ONLY,
                primary: ImageCodec::Copy,
                fallbacks: Vec::new(),
                tagging: CoverTagging::AttachedPic,
                faststart: false,
            },
        }
    }

    /// Image codecs in attempt order.
    pub fn image_codecs(&self) -> Vec<ImageCodec> {
        std::iter::once(self.primary)
            .chain(self.fallbacks.iter().copied())
            .collect()
    }

    fn spec(&self, codec: ImageCodec, job: &EmbeddingJob, output: &Path) -> RemuxSpec {
        RemuxSpec {
            source: job.source.clone(),
            artwork: job.artwork.clone(),
            output: output.to_path_buf(),
            source_map: self.source_map.to_string(),
            image_codec: codec.as_ffmpeg().to_string(),
            stream_options: self.tagging.stream_options(),
            muxer: self.muxer.to_string(),
            movflags: self.faststart.then(|| "+faststart".to_string()),
        }
    }

    /// Ordered remux invocations writing to `output`.
    #[cfg(test)]
    fn attempts(&self, job: &EmbeddingJob, output: &Path) -> Vec<RemuxSpec> {
        self.image_codecs()
            .into_iter()
            .map(|codec| self.spec(codec, job, output))
            .collect()
    }

    fn try_codec(
        &self,
        tool: &dyn MediaTool,
        codec: ImageCodec,
        job: &EmbeddingJob,
        output: &Path,
    ) -> Result<(), MediaError> {
        debug!(
            "Embedding into {} as {} (image codec {})",
            job.source.display(),
            self.muxer,
            codec.as_ffmpeg()
        );
        tool.remux(&self.spec(codec, job, output))
    }

    /// Run attempts in order until one succeeds. Returns the codec that worked.
    pub fn embed(
        &self,
        tool: &dyn MediaTool,
        job: &EmbeddingJob,
        output: &Path,
    ) -> Result<ImageCodec, EmbedError> {
        let mut last_error = match self.try_codec(tool, self.primary, job, output) {
            Ok(()) => return Ok(self.primary),
            Err(e) => e,
        };

        let mut previous = self.primary;
        for &codec in &self.fallbacks {
            warn!(
                "Image codec {} rejected for {}, retrying with {}: {}",
                previous.as_ffmpeg(),
                job.source.display(),
                codec.as_ffmpeg(),
                last_error
            );
            match self.try_codec(tool, codec, job, output) {
                Ok(()) => return Ok(codec),
                Err(e) => last_error = e,
            }
            previous = codec;
        }

        Err(EmbedError {
            muxer: self.muxer.to_string(),
            attempts: 1 + self.fallbacks.len(),
            last: last_error,
        })
    }
}
