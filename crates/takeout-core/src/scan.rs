use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::date::json::SidecarIndex;
use crate::error::Issue;
use crate::folder_classify;
use crate::media::{GroupingKey, Media};
use crate::sanitize::restore_if_encoded;
use crate::ThrottledProgress;

/// Result of scanning the input tree
pub struct ScanResult {
    /// One media per discovered file, in path order
    pub media: Vec<Media>,
    /// Every .json file found, for sidecar lookups
    pub sidecars: SidecarIndex,
    pub issues: Vec<Issue>,
}

/// Check if a file is a photo or video we should organize
pub fn is_media_file(path: &Path) -> bool {
    let is_mts = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mts"));
    is_mts
        || mime_guess::from_path(path).first().is_some_and(|m| {
            m.type_() == mime_guess::mime::IMAGE || m.type_() == mime_guess::mime::VIDEO
        })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Works out which grouping the files of a directory belong to.
struct Classifier<'a> {
    root: &'a Path,
    cache: HashMap<PathBuf, GroupingKey>,
}

impl<'a> Classifier<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            cache: HashMap::new(),
        }
    }

    /// Nearest year or album folder between `dir` and the input root.
    /// Anything outside both counts as ungrouped.
    fn key_for(&mut self, dir: &Path) -> GroupingKey {
        if let Some(key) = self.cache.get(dir) {
            return key.clone();
        }
        let key = if dir == self.root || !dir.starts_with(self.root) {
            GroupingKey::Primary
        } else if folder_classify::is_chronology_folder(dir) {
            GroupingKey::Primary
        } else if folder_classify::is_grouping_folder(dir) {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            GroupingKey::Named(restore_if_encoded(&name))
        } else {
            match dir.parent() {
                Some(parent) => self.key_for(parent),
                None => GroupingKey::Primary,
            }
        };
        self.cache.insert(dir.to_path_buf(), key.clone());
        key
    }
}

/// Walk the input tree, collecting media files and JSON sidecars.
pub fn scan_input(input: &Path, progress: &ThrottledProgress) -> anyhow::Result<ScanResult> {
    let mut issues = Vec::new();
    let mut files: Vec<(PathBuf, u64)> = Vec::new();

    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| input.to_path_buf());
                log::warn!("Cannot scan {}: {}", path.display(), e);
                issues.push(Issue::Scan {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => files.push((entry.into_path(), meta.len())),
            Err(e) => issues.push(Issue::Scan {
                path: entry.into_path(),
                reason: e.to_string(),
            }),
        }
    }

    let total = files.len() as u64;
    let mut classifier = Classifier::new(input);
    let mut sidecars = SidecarIndex::new();
    let mut media = Vec::new();

    for (i, (path, size)) in files.into_iter().enumerate() {
        progress.report("scan", i as u64, total, "Scanning files");

        if is_json(&path) {
            sidecars.insert(&path);
            continue;
        }
        if !is_media_file(&path) {
            log::debug!("Skipping non-media file {}", path.display());
            continue;
        }

        let key = match path.parent() {
            Some(dir) => classifier.key_for(dir),
            None => GroupingKey::Primary,
        };
        media.push(Media::new(key, path, size));
    }

    log::info!(
        "Found {} media file(s) and {} sidecar(s) in {}",
        media.len(),
        sidecars.len(),
        input.display()
    );

    Ok(ScanResult {
        media,
        sidecars,
        issues,
    })
}
