//! Artwork embedding library: finds cover art for audio files and embeds it
//! through ffmpeg with a backup/validate/rename commit.

pub mod catalog;
pub mod commit;
pub mod config;
pub mod detect;
pub mod fetch;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod resolve;
pub mod strategy;
pub mod tags;
pub mod walk;
