use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Normalized view of one file's tags. Empty string means the field was
/// absent or unreadable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub track: String,
    pub year: String,
    pub genre: String,
}

impl MetadataRecord {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.artist.is_empty()
            && self.album.is_empty()
            && self.track.is_empty()
            && self.year.is_empty()
            && self.genre.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Renamed,
    Skipped,
    Failed,
    Unchanged,
}

/// One file under consideration, created fresh per processing pass.
///
/// Invariant: `final_path` is set if and only if `candidate_name` is present
/// and the conflict resolver did not choose skip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileItem {
    pub original_path: PathBuf,
    /// Lower-cased, includes the leading dot; empty when the file has none.
    pub extension: String,
    pub metadata: MetadataRecord,
    pub candidate_name: Option<String>,
    pub final_path: Option<PathBuf>,
    pub outcome: Outcome,
    pub error: Option<String>,
}

impl FileItem {
    pub fn new(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        Self {
            original_path: path.to_path_buf(),
            extension,
            metadata: MetadataRecord::default(),
            candidate_name: None,
            final_path: None,
            outcome: Outcome::Unchanged,
            error: None,
        }
    }

    pub fn display_name(&self) -> String {
        self.original_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.original_path.display().to_string())
    }
}

/// Result of one batch invocation. `succeeded` equals the number of
/// `Renamed` outcomes; every other outcome counts as `failed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenamePlan {
    pub items: Vec<FileItem>,
    pub succeeded: usize,
    pub failed: usize,
}

/// What to do when a generated destination already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Overwrite,
    Skip,
    #[default]
    Suffix,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "suffix" => Ok(Self::Suffix),
            other => anyhow::bail!(
                "unknown conflict policy '{}' (expected overwrite, skip or suffix)",
                other
            ),
        }
    }
}

/// Emitted once per processed file, in processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 1-based position within the batch.
    pub index: usize,
    pub total: usize,
    pub display_name: String,
    pub status: String,
}
