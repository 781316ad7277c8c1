use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Where a physical copy of a media file was discovered.
///
/// `Primary` is the ungrouped location (a year folder); `Named` is an album.
/// The derived ordering puts `Primary` first, then albums by name, so every
/// walk over `Media::files` is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupingKey {
    Primary,
    Named(String),
}

impl GroupingKey {
    pub fn album_name(&self) -> Option<&str> {
        match self {
            GroupingKey::Primary => None,
            GroupingKey::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingKey::Primary => write!(f, "<primary>"),
            GroupingKey::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Capture time and how much we trust it (lower = better).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTaken {
    pub date: NaiveDateTime,
    pub accuracy: u8,
}

/// One logical photo or video, possibly backed by several identical files.
#[derive(Debug, Clone)]
pub struct Media {
    /// Physical copies by the grouping they were found in. Never empty.
    pub files: BTreeMap<GroupingKey, PathBuf>,
    /// File size in bytes, taken at discovery
    pub size: u64,
    /// Resolved capture time
    pub date: Option<DateTaken>,
}

impl Media {
    pub fn new(key: GroupingKey, path: PathBuf, size: u64) -> Self {
        let mut files = BTreeMap::new();
        files.insert(key, path);
        Self {
            files,
            size,
            date: None,
        }
    }

    /// The file treated as the source of truth: the ungrouped copy when there
    /// is one, otherwise the first album copy in key order.
    pub fn primary_file(&self) -> &Path {
        self.files
            .get(&GroupingKey::Primary)
            .or_else(|| self.files.values().next())
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new(""))
    }

    pub fn filename(&self) -> String {
        self.primary_file()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Album names in key order.
    pub fn albums(&self) -> Vec<&str> {
        self.files.keys().filter_map(GroupingKey::album_name).collect()
    }

    /// Accuracy of the resolved date, `u8::MAX` when undated.
    pub fn best_accuracy(&self) -> u8 {
        self.date.map_or(u8::MAX, |d| d.accuracy)
    }
}
