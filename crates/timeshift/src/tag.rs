// Metadata tagging collaborator. Tagging is best-effort: the orchestrator
// logs failures and keeps the artifact.

use crate::error::EngineError;
use lofty::config::{ParseOptions, WriteOptions};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;

/// Descriptive fields written into a finished artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFields {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Four-digit broadcast year.
    pub year: String,
    /// Free-text description of the broadcast.
    pub comment: String,
    /// ISO 639-2 language of the comment.
    pub language: String,
}

pub trait Tagger: Send + Sync {
    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<(), EngineError>;
}

/// [`Tagger`] backed by lofty, writing into whatever primary tag the file
/// format carries (ID3v2 for AAC/MP3 artifacts).
pub struct LoftyTagger;

impl Tagger for LoftyTagger {
    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<(), EngineError> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| EngineError::tagging(e.to_string()))?
            .options(ParseOptions::new())
            .read()
            .map_err(|e| EngineError::tagging(e.to_string()))?;

        if tagged_file.primary_tag_mut().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        {
            let tag = tagged_file
                .primary_tag_mut()
                .ok_or_else(|| EngineError::tagging("file format carries no writable tag"))?;
            tag.set_title(fields.title.clone());
            tag.set_artist(fields.artist.clone());
            tag.set_album(fields.album.clone());
            if let Ok(year) = fields.year.parse::<u32>() {
                tag.set_year(year);
            }
            tag.set_comment(fields.comment.clone());
            let _ = tag.insert_text(ItemKey::Language, fields.language.clone());
        }

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| EngineError::tagging(e.to_string()))
    }
}
