pub mod album;
pub mod album_json;
pub mod date;
pub mod dedup;
pub mod error;
pub mod extras;
pub mod folder_classify;
pub mod link;
pub mod media;
pub mod sanitize;
pub mod scan;
pub mod writer;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use error::{ConfigError, Issue};
pub use writer::{AlbumBehavior, DateDivision};

fn default_copy() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Copy files out of the input; false moves them
    #[serde(default = "default_copy")]
    pub copy: bool,
    #[serde(default)]
    pub date_division: DateDivision,
    #[serde(default)]
    pub album_behavior: AlbumBehavior,
    #[serde(default)]
    pub skip_extras: bool,
    #[serde(default)]
    pub dates: date::DateOptions,
    /// Where the album record goes in json mode (default: <output>/albums-info.json)
    #[serde(default)]
    pub album_json: Option<PathBuf>,
}

impl ProcessOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            copy: true,
            date_division: DateDivision::default(),
            album_behavior: AlbumBehavior::default(),
            skip_extras: false,
            dates: date::DateOptions::default(),
            album_json: None,
        }
    }

    /// Reject option sets that cannot run before touching any file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.input.is_dir() {
            return Err(ConfigError::InputNotFound {
                path: self.input.clone(),
            });
        }
        let input = absolute(&self.input);
        let output = absolute(&self.output);
        if output.starts_with(&input) {
            return Err(ConfigError::OutputInsideInput { input, output });
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub stage: String,
    pub current: u64,
    pub total: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessResult {
    pub total_media: u64,
    pub duplicates_removed: u64,
    pub albums_merged: u64,
    pub extras_removed: u64,
    pub files_written: u64,
    pub links_created: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Type alias for progress callback; it may borrow from the caller's frame.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Throttled progress reporter, emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: std::sync::Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: std::sync::Mutex::new(Instant::now() - std::time::Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let Ok(mut last) = self.last_emit.lock() else {
                return;
            };
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Issues gathered across stages, each unreadable file reported once.
#[derive(Default)]
struct IssueLog {
    unreadable: HashSet<PathBuf>,
    warnings: Vec<String>,
}

impl IssueLog {
    fn extend(&mut self, issues: Vec<Issue>) {
        for issue in issues {
            if let Issue::Unreadable { path, .. } = &issue {
                if !self.unreadable.insert(path.clone()) {
                    continue;
                }
            }
            self.warnings.push(issue.to_string());
        }
    }
}

/// Run the full processing pipeline with progress reporting.
pub fn process(
    options: &ProcessOptions,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<ProcessResult> {
    options.validate()?;
    let tp = ThrottledProgress::new(progress_callback);
    let mut issues = IssueLog::default();

    // Stage 1: Scan the input tree
    let scan = scan::scan_input(&options.input, &tp)?;
    issues.extend(scan.issues);
    let mut media_list = scan.media;
    let total_media = media_list.len() as u64;

    if media_list.is_empty() {
        log::info!("No media found in {}", options.input.display());
        return Ok(ProcessResult {
            warnings: issues.warnings,
            ..ProcessResult::default()
        });
    }

    // Stage 2: Resolve capture dates
    if scan.sidecars.is_empty() {
        log::info!("No JSON sidecars found, dates come from EXIF and file names only");
    }
    let resolver = date::DateResolver::standard(Arc::new(scan.sidecars), &options.dates);
    log::debug!("Date strategies: {}", resolver.strategy_names().join(", "));
    let counter = AtomicU64::new(0);
    media_list.par_iter_mut().for_each(|m| {
        m.date = resolver.resolve(m.primary_file());
        let current = counter.fetch_add(1, Ordering::Relaxed);
        tp.report("date", current, total_media, "Resolving dates");
    });
    let undated = media_list.iter().filter(|m| m.date.is_none()).count();
    log::info!(
        "Resolved dates for {} of {} media",
        media_list.len() - undated,
        media_list.len()
    );

    // Stage 3: Deduplicate within each grouping
    let hashes = dedup::HashCache::new();
    let dedup_result = dedup::deduplicate(media_list, &hashes, &tp);
    issues.extend(dedup_result.issues);
    media_list = dedup_result.media;

    // Stage 4: Fuse album copies with their originals
    let merge_result = album::merge_albums(media_list, &hashes, &tp);
    issues.extend(merge_result.issues);
    media_list = merge_result.media;

    // Stage 5: Drop edited variants
    let mut extras_removed = 0;
    if options.skip_extras {
        let (kept, removed) = extras::remove_extras(media_list);
        media_list = kept;
        extras_removed = removed;
    }

    // Stage 6: Write output
    fs::create_dir_all(&options.output)?;
    let linker = link::detect_linker(&options.output);
    let write_options = writer::WriteOptions {
        output: options.output.clone(),
        copy: options.copy,
        date_division: options.date_division,
        album_behavior: options.album_behavior,
    };
    let write_result = writer::write_output(&media_list, &write_options, linker.as_ref(), &tp)?;
    issues.extend(write_result.issues);

    if options.album_behavior == AlbumBehavior::Json {
        let album_json_path = options
            .album_json
            .clone()
            .unwrap_or_else(|| options.output.join(album_json::ALBUMS_INFO_FILENAME));
        album_json::write_albums_info(
            &media_list,
            &write_result.assignments,
            &options.output.join(writer::ALL_PHOTOS_DIR),
            &album_json_path,
        )?;
    }

    let result = ProcessResult {
        total_media,
        duplicates_removed: dedup_result.removed as u64,
        albums_merged: merge_result.merged as u64,
        extras_removed: extras_removed as u64,
        files_written: write_result.files_written,
        links_created: write_result.links_created,
        failed: write_result.failed,
        warnings: issues.warnings,
    };
    log::info!(
        "Done: {} media, {} duplicates removed, {} album copies merged, {} files written, {} links",
        result.total_media,
        result.duplicates_removed,
        result.albums_merged,
        result.files_written,
        result.links_created
    );
    Ok(result)
}
