//! Metadata extraction from audio file tags.
//!
//! Reads through lofty's format-agnostic tag view first, then applies native
//! overrides for the container schemes whose common view is unreliable
//! (ID3v2 frames for mp3, ilst atoms for m4a).

use crate::models::MetadataRecord;
use anyhow::Result;
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::read_from_path;
use lofty::tag::{ItemKey, Tag, TagType};
use std::path::Path;
use tracing::{debug, warn};

/// Audio container suffixes this tool recognizes, without the dot.
pub const KNOWN_EXTENSIONS: [&str; 9] =
    ["mp3", "flac", "ogg", "m4a", "wma", "wav", "aac", "ape", "wv"];

pub fn is_known_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');
    KNOWN_EXTENSIONS.iter().any(|k| k.eq_ignore_ascii_case(ext))
}

/// Read one file's tags into a normalized record.
///
/// One implementation per container family; all of them return the same
/// record shape so format quirks stay inside the reader.
pub trait TagReader {
    fn read(&self, path: &Path) -> Result<MetadataRecord>;
}

/// Extract a file's metadata, never failing: any read error is logged and an
/// empty record is returned so the caller can treat the file as untagged.
pub fn extract(path: &Path) -> MetadataRecord {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match reader_for(&ext).read(path) {
        Ok(record) => record,
        Err(e) => {
            warn!("failed to read tags from {}: {}", path.display(), e);
            MetadataRecord::default()
        }
    }
}

/// Pick the reader for a file by its lower-cased extension. Formats without
/// a native override scheme all go through the common view.
fn reader_for(extension: &str) -> &'static dyn TagReader {
    match extension {
        "mp3" => &Id3TagReader,
        "m4a" => &IlstTagReader,
        _ => &CommonTagReader,
    }
}

struct CommonTagReader;

impl TagReader for CommonTagReader {
    fn read(&self, path: &Path) -> Result<MetadataRecord> {
        let tagged = read_from_path(path)?;
        let mut record = MetadataRecord::default();
        match tagged.primary_tag().or_else(|| tagged.first_tag()) {
            Some(tag) => fill_common(&mut record, tag),
            None => debug!("no tags found in {}", path.display()),
        }
        Ok(record)
    }
}

struct Id3TagReader;

impl TagReader for Id3TagReader {
    fn read(&self, path: &Path) -> Result<MetadataRecord> {
        let tagged = read_from_path(path)?;
        let mut record = MetadataRecord::default();
        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            fill_common(&mut record, tag);
        }
        if let Some(id3) = tagged.tag(TagType::Id3v2) {
            override_native(&mut record, id3);
            if let Some(track) = first_string(id3, &ItemKey::TrackNumber) {
                // TRCK may carry "track/total"; keep the track component only.
                record.track = truncate_track_total(&track);
            }
        }
        Ok(record)
    }
}

struct IlstTagReader;

impl TagReader for IlstTagReader {
    fn read(&self, path: &Path) -> Result<MetadataRecord> {
        let tagged = read_from_path(path)?;
        let mut record = MetadataRecord::default();
        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            fill_common(&mut record, tag);
        }
        if let Some(ilst) = tagged.tag(TagType::Mp4Ilst) {
            override_native(&mut record, ilst);
            // trkn is a (number, total) pair; lofty exposes the first element
            // as the track-number item.
            if let Some(track) = first_string(ilst, &ItemKey::TrackNumber) {
                record.track = track;
            }
        }
        Ok(record)
    }
}

/// Fill a record from the format-agnostic tag view. Fields the tag does not
/// carry are left as they were.
fn fill_common(record: &mut MetadataRecord, tag: &Tag) {
    if let Some(v) = tag.title() {
        record.title = v.trim().to_string();
    }
    if let Some(v) = tag.artist() {
        record.artist = v.trim().to_string();
    }
    if let Some(v) = tag.album() {
        record.album = v.trim().to_string();
    }
    if let Some(v) = tag.genre() {
        record.genre = v.trim().to_string();
    }
    if let Some(v) = tag.track() {
        record.track = v.to_string();
    }
    if let Some(v) = tag
        .get_string(&ItemKey::RecordingDate)
        .or_else(|| tag.get_string(&ItemKey::Year))
    {
        record.year = v.trim().to_string();
    } else if let Some(y) = tag.year() {
        record.year = y.to_string();
    }
}

/// Re-read the native scheme's items on top of the common view, taking the
/// first value whenever a field stores several.
fn override_native(record: &mut MetadataRecord, tag: &Tag) {
    if let Some(v) = first_string(tag, &ItemKey::TrackTitle) {
        record.title = v;
    }
    if let Some(v) = first_string(tag, &ItemKey::TrackArtist) {
        record.artist = v;
    }
    if let Some(v) = first_string(tag, &ItemKey::AlbumTitle) {
        record.album = v;
    }
    if let Some(v) = first_string(tag, &ItemKey::RecordingDate) {
        record.year = v;
    }
    if let Some(v) = first_string(tag, &ItemKey::Genre) {
        record.genre = v;
    }
}

fn first_string(tag: &Tag, key: &ItemKey) -> Option<String> {
    tag.get_strings(key).next().map(|s| s.trim().to_string())
}

/// Discard the "/total" part of a "track/total" value.
pub fn truncate_track_total(raw: &str) -> String {
    raw.split('/').next().unwrap_or("").trim().to_string()
}
