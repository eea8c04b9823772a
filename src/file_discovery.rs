use crate::config::Config;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptFile {
    pub path: PathBuf,
    /// Path relative to the scan root, with forward slashes. This is the
    /// form findings carry.
    pub rel_path: String,
    pub size: u64,
}

/// Where an asset reference landed against the on-disk tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLookup {
    Found,
    /// Exists, but only under different casing; carries the actual name.
    CaseMismatch(String),
    Missing,
}

/// Case-insensitive index of the files under the asset root. Lookups are
/// case-insensitive but the actual on-disk casing is preserved so mismatch
/// findings can name it.
#[derive(Debug, Default, Clone)]
pub struct AssetIndex {
    /// lowercased derived image name -> actual derived name
    image_names: HashMap<String, String>,
    /// lowercased relative file path -> actual relative path
    file_paths: HashMap<String, String>,
}

impl AssetIndex {
    /// Resolve an image name as the engine would: by its space-joined path
    /// under the images directory, or by its leading tag word alone.
    pub fn lookup_image(&self, name: &str) -> AssetLookup {
        if let Some(actual) = self.image_names.get(&name.to_lowercase()) {
            if actual == name {
                return AssetLookup::Found;
            }
            return AssetLookup::CaseMismatch(actual.clone());
        }
        let tag = name.split_whitespace().next().unwrap_or(name);
        if let Some(actual) = self.image_names.get(&tag.to_lowercase()) {
            if actual == tag {
                return AssetLookup::Found;
            }
            return AssetLookup::CaseMismatch(actual.clone());
        }
        AssetLookup::Missing
    }

    /// Resolve a slash-separated relative file path (audio, movies).
    pub fn lookup_path(&self, rel_path: &str) -> AssetLookup {
        let norm = rel_path.trim_start_matches('/').replace('\\', "/");
        match self.file_paths.get(&norm.to_lowercase()) {
            Some(actual) if *actual == norm => AssetLookup::Found,
            Some(actual) => AssetLookup::CaseMismatch(actual.clone()),
            None => AssetLookup::Missing,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_paths.is_empty() && self.image_names.is_empty()
    }
}

pub struct FileDiscovery {
    config: Config,
}

impl FileDiscovery {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The directory actually scanned: the conventional `game/` subfolder
    /// when present, the root itself otherwise.
    pub fn resolve_scan_root(root: &Path) -> PathBuf {
        let game_dir = root.join("game");
        if game_dir.is_dir() {
            game_dir
        } else {
            root.to_path_buf()
        }
    }

    /// Recursively enumerate script files under the scan root, honoring
    /// ignore rules and skipping engine-shipped code.
    pub fn discover_scripts(&self, scan_root: &Path) -> crate::Result<Vec<ScriptFile>> {
        let mut files = Vec::new();

        let mut walker_builder = WalkBuilder::new(scan_root);
        walker_builder
            .standard_filters(true)
            .hidden(false)
            .git_ignore(true);

        for result in walker_builder.build() {
            let entry = result?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }
            if !self.has_script_extension(path) {
                continue;
            }
            if is_engine_file(scan_root, path) {
                continue;
            }
            if self.should_ignore_file(path) {
                continue;
            }

            let metadata = fs::metadata(path)?;
            if metadata.len() > self.config.max_file_size as u64 {
                debug!(path = %path.display(), "skipping oversized script file");
                continue;
            }

            files.push(ScriptFile {
                path: path.to_path_buf(),
                rel_path: rel_path_str(scan_root, path),
                size: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(files)
    }

    fn has_script_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.config.script_extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }

    fn should_ignore_file(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.config.ignore_patterns {
            if let Some(ext) = pattern.strip_prefix("*.") {
                if let Some(filename) = path.file_name() {
                    if filename.to_string_lossy().ends_with(&format!(".{}", ext)) {
                        return true;
                    }
                }
            } else if pattern.contains('*') {
                let regex_pattern = pattern.replace('.', r"\.").replace('*', ".*");
                if let Ok(re) = regex::Regex::new(&regex_pattern) {
                    if re.is_match(&path_str) {
                        return true;
                    }
                }
            } else {
                for component in path.components() {
                    if component.as_os_str().to_string_lossy() == *pattern {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Walk the asset tree once and build the case-insensitive index. Built
    /// separately from parsed references; only the Assets check reads it.
    pub fn build_asset_index(&self, scan_root: &Path) -> AssetIndex {
        let mut index = AssetIndex::default();

        for entry in WalkDir::new(scan_root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = rel_path_str(scan_root, entry.path());
            index.file_paths.insert(rel.to_lowercase(), rel.clone());

            // The engine auto-registers images from files under images/:
            // images/bg/park.png defines image "bg park".
            if let Some(image_rel) = rel.strip_prefix("images/") {
                if self.has_image_extension(entry.path()) {
                    let name = strip_extension(image_rel).replace('/', " ");
                    if let Some(tag) = name.split_whitespace().next() {
                        index
                            .image_names
                            .entry(tag.to_lowercase())
                            .or_insert_with(|| tag.to_string());
                    }
                    index.image_names.insert(name.to_lowercase(), name);
                }
            }
        }

        if index.is_empty() {
            warn!(root = %scan_root.display(), "asset index is empty");
        }
        index
    }

    fn has_image_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.config.image_extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

/// Engine files live under a `renpy/` directory shipped with every game.
/// The developer did not write them; scanning them only produces noise.
fn is_engine_file(scan_root: &Path, path: &Path) -> bool {
    path.strip_prefix(scan_root)
        .map(|rel| rel.components().any(|c| c.as_os_str() == "renpy"))
        .unwrap_or(false)
}

fn rel_path_str(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn strip_extension(rel: &str) -> String {
    match rel.rfind('.') {
        Some(pos) if !rel[pos..].contains('/') => rel[..pos].to_string(),
        _ => rel.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn discovers_scripts_and_skips_engine_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let game = tmp.path().join("game");
        touch(&game.join("script.rpy"));
        touch(&game.join("chapter2.rpy"));
        touch(&game.join("renpy/common/00library.rpy"));
        touch(&game.join("notes.txt"));

        let scan_root = FileDiscovery::resolve_scan_root(tmp.path());
        assert_eq!(scan_root, game);

        let discovery = FileDiscovery::new(Config::default());
        let files = discovery.discover_scripts(&scan_root).unwrap();
        let rels: Vec<_> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["chapter2.rpy", "script.rpy"]);
    }

    #[test]
    fn asset_index_resolves_images_and_casing() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("images/bg/park.png"));
        touch(&root.join("images/Animations/intro.webp"));
        touch(&root.join("audio/theme.ogg"));

        let discovery = FileDiscovery::new(Config::default());
        let index = discovery.build_asset_index(root);

        assert_eq!(index.lookup_image("bg park"), AssetLookup::Found);
        assert_eq!(index.lookup_image("bg"), AssetLookup::Found);
        assert_eq!(
            index.lookup_image("animations intro"),
            AssetLookup::CaseMismatch("Animations intro".to_string())
        );
        assert_eq!(index.lookup_image("bg beach"), AssetLookup::Missing);

        assert_eq!(index.lookup_path("audio/theme.ogg"), AssetLookup::Found);
        assert_eq!(
            index.lookup_path("Audio/Theme.ogg"),
            AssetLookup::CaseMismatch("audio/theme.ogg".to_string())
        );
        assert_eq!(index.lookup_path("audio/missing.ogg"), AssetLookup::Missing);
    }
}
