use crate::models::ConflictPolicy;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    #[serde(default)]
    pub dry_run: bool,
    /// Whitelist of file extensions to treat as audio files.
    /// Examples: ["*.mp3", "*.flac", "wav"]. Case-insensitive.
    #[serde(default = "default_file_extensions")]
    pub file_extensions: Vec<String>,
    /// Character cap applied to generated names. None = unlimited.
    #[serde(default)]
    pub max_filename_length: Option<usize>,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_template() -> String { "%artist% - %title%".into() }
fn default_log_dir() -> PathBuf { "/var/log/tag-renamer".into() }

fn default_file_extensions() -> Vec<String> {
    vec![
        "*.mp3",
        "*.flac",
        "*.ogg",
        "*.m4a",
        "*.wma",
        "*.wav",
        "*.aac",
        "*.ape",
        "*.wv",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Configuration errors that must abort before a batch starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.root_folder.is_dir() {
            anyhow::bail!(
                "root_folder {} is not an existing directory",
                self.root_folder.display()
            );
        }
        if self.file_extensions.iter().all(|e| e.trim().is_empty()) {
            anyhow::bail!("no file extensions enabled");
        }
        if self.template.trim().is_empty() {
            anyhow::bail!("rename template is empty");
        }
        Ok(())
    }
}
