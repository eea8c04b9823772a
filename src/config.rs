use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub target_directory: PathBuf,
    pub ignore_patterns: Vec<String>,
    pub script_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
    pub audio_extensions: Vec<String>,
    pub max_file_size: usize,
    pub checks: CheckConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Check names to run; empty means every registered check.
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Collapse findings that differ only by location into one record
    /// annotated with every location.
    pub group_duplicates: bool,
    /// Include LOW-severity parse diagnostics in the output.
    pub include_parse_warnings: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_directory: PathBuf::from("."),
            ignore_patterns: vec![
                ".git".to_string(),
                "tl".to_string(),
                "saves".to_string(),
                "cache".to_string(),
                "*.bak".to_string(),
                "*.rpy.orig".to_string(),
            ],
            script_extensions: vec!["rpy".to_string()],
            image_extensions: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "webp".to_string(),
                "bmp".to_string(),
                "gif".to_string(),
                "tga".to_string(),
            ],
            audio_extensions: vec![
                "ogg".to_string(),
                "mp3".to_string(),
                "wav".to_string(),
                "opus".to_string(),
                "flac".to_string(),
            ],
            max_file_size: 4 * 1024 * 1024,
            checks: CheckConfig { enabled: Vec::new() },
            report: ReportConfig {
                group_duplicates: true,
                include_parse_warnings: true,
            },
        }
    }
}

impl Config {
    /// Get the default config file path (~/.renlint.toml)
    pub fn default_config_path() -> crate::Result<PathBuf> {
        let home_dir = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(PathBuf::from(home_dir).join(".renlint.toml"))
    }

    /// Load config from the default location, falling back to defaults if
    /// no file exists.
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading configuration");
            Self::from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific file path
    pub fn from_file(path: &PathBuf) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a file
    pub fn to_file(&self, path: &PathBuf) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create a config file with all available options documented
    pub fn create_documented_config() -> String {
        r#"# renlint configuration file
# Controls which files are scanned and which checks run.

# Project root to analyze (defaults to current directory). If it contains
# a game/ subfolder, that subfolder is scanned.
target_directory = "."

# Path components and glob patterns excluded from scanning. The tl/
# translation tree and save/cache folders are skipped by default.
ignore_patterns = [
    ".git",
    "tl",
    "saves",
    "cache",
    "*.bak",
    "*.rpy.orig",
]

# Script file extensions to parse
script_extensions = ["rpy"]

# Extensions indexed as images / audio for asset resolution
image_extensions = ["png", "jpg", "jpeg", "webp", "bmp", "gif", "tga"]
audio_extensions = ["ogg", "mp3", "wav", "opus", "flac"]

# Maximum script file size in bytes (default 4MB)
max_file_size = 4194304

[checks]
# Check names to run; [] runs everything. Available: Labels, Logic,
# Variables, Menus, Assets, Characters, Flow, Call Cycles, Call Safety,
# Empty Labels, Text Tags
enabled = []

[report]
# Collapse identical findings that differ only by location
group_duplicates = true

# Surface per-line parse diagnostics as LOW findings
include_parse_warnings = true
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_config_round_trips() {
        let parsed: Config = toml::from_str(&Config::create_documented_config()).unwrap();
        assert_eq!(parsed.script_extensions, vec!["rpy"]);
        assert!(parsed.report.group_duplicates);
    }

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.max_file_size, config.max_file_size);
    }
}
