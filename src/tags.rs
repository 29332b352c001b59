//! Tag reading backed by `lofty`.

use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use lofty::tag::Tag;
use std::path::Path;

use crate::models::TagTriple;

/// Reads the artist/album/title triple of an audio file.
pub trait TagReader {
    fn read(&self, path: &Path) -> Result<TagTriple, lofty::error::LoftyError>;
}

/// Primary tag first, then any other tag in the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<TagTriple, lofty::error::LoftyError> {
        let tagged_file = lofty::read_from_path(path)?;
        let primary_tag = tagged_file.primary_tag();
        let tags = tagged_file.tags();

        Ok(TagTriple {
            artist: first_non_empty(primary_tag, tags, |tag| {
                tag.artist().map(|v| v.into_owned())
            }),
            album: first_non_empty(primary_tag, tags, |tag| tag.album().map(|v| v.into_owned())),
            title: first_non_empty(primary_tag, tags, |tag| tag.title().map(|v| v.into_owned())),
        })
    }
}

/// Values are trimmed; a whitespace-only value counts as missing.
fn first_non_empty<F>(primary_tag: Option<&Tag>, tags: &[Tag], extractor: F) -> String
where
    F: Fn(&Tag) -> Option<String>,
{
    primary_tag
        .into_iter()
        .chain(tags.iter())
        .filter_map(&extractor)
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}
