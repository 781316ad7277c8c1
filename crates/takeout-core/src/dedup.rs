use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::error::Issue;
use crate::media::{GroupingKey, Media};
use crate::ThrottledProgress;

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 of file contents, computed at most once per path per run.
///
/// Kept apart from `Media` so entities stay plain discovery records while
/// hashing threads fill this map.
#[derive(Debug, Default)]
pub struct HashCache {
    hashes: RwLock<HashMap<PathBuf, String>>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.hashes.read().ok()?.get(path).cloned()
    }

    pub fn get_or_compute(&self, path: &Path) -> io::Result<String> {
        if let Some(hash) = self.get(path) {
            return Ok(hash);
        }
        let hash = hash_file(path)?;
        if let Ok(mut hashes) = self.hashes.write() {
            hashes.insert(path.to_path_buf(), hash.clone());
        }
        Ok(hash)
    }
}

/// Stream a file through SHA-256.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Whether identical content is only compared within one grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupScope {
    PerKey,
    Global,
}

/// Indices of content-identical media, each group ascending and of size > 1.
pub struct Identical {
    pub groups: Vec<Vec<usize>>,
    pub issues: Vec<Issue>,
}

/// Group media by size, hash only those sharing a size, then group by hash.
/// Files that cannot be hashed are left out of every group.
pub fn identical_groups(
    media: &[Media],
    cache: &HashCache,
    scope: GroupScope,
    progress: &ThrottledProgress,
    stage: &str,
) -> Identical {
    let bucket_key = |m: &Media| -> Option<GroupingKey> {
        match scope {
            GroupScope::PerKey => m.files.keys().next().cloned(),
            GroupScope::Global => None,
        }
    };

    // Group by size
    let mut size_groups: HashMap<(Option<GroupingKey>, u64), Vec<usize>> = HashMap::new();
    for (i, m) in media.iter().enumerate() {
        size_groups.entry((bucket_key(m), m.size)).or_default().push(i);
    }

    // Only hash files that share a size with at least one other file
    let mut needs_hash: Vec<usize> = size_groups
        .values()
        .filter(|indices| indices.len() > 1)
        .flatten()
        .copied()
        .collect();
    needs_hash.sort_unstable();

    let total = needs_hash.len() as u64;
    let counter = AtomicU64::new(0);
    let hashed: Vec<(usize, io::Result<String>)> = needs_hash
        .par_iter()
        .map(|&idx| {
            let result = cache.get_or_compute(media[idx].primary_file());
            let current = counter.fetch_add(1, Ordering::Relaxed);
            progress.report(stage, current, total, "Hashing files");
            (idx, result)
        })
        .collect();

    let mut issues = Vec::new();
    let mut hash_groups: HashMap<(Option<GroupingKey>, u64, String), Vec<usize>> = HashMap::new();
    for (idx, result) in hashed {
        match result {
            Ok(hash) => {
                let m = &media[idx];
                hash_groups
                    .entry((bucket_key(m), m.size, hash))
                    .or_default()
                    .push(idx);
            }
            Err(e) => {
                let path = media[idx].primary_file().to_path_buf();
                log::warn!("Cannot hash {}: {}", path.display(), e);
                issues.push(Issue::Unreadable {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = hash_groups
        .into_values()
        .filter(|g| g.len() > 1)
        .map(|mut g| {
            g.sort_unstable();
            g
        })
        .collect();
    groups.sort_unstable_by_key(|g| g[0]);

    Identical { groups, issues }
}

pub struct DedupResult {
    pub media: Vec<Media>,
    pub removed: usize,
    pub issues: Vec<Issue>,
}

fn path_len(m: &Media) -> usize {
    m.primary_file().to_string_lossy().chars().count()
}

/// Collapse byte-identical media found under the same grouping key.
///
/// The survivor has the most accurate date, then the shortest path, then
/// was discovered first. Survivors keep their discovery order.
pub fn deduplicate(media: Vec<Media>, cache: &HashCache, progress: &ThrottledProgress) -> DedupResult {
    let Identical { groups, issues } =
        identical_groups(&media, cache, GroupScope::PerKey, progress, "dedup");

    let mut remove_indices: HashSet<usize> = HashSet::new();
    for group in &groups {
        let mut sorted = group.clone();
        sorted.sort_by(|&a, &b| {
            media[a]
                .best_accuracy()
                .cmp(&media[b].best_accuracy())
                .then_with(|| path_len(&media[a]).cmp(&path_len(&media[b])))
                .then_with(|| a.cmp(&b))
        });
        for &idx in &sorted[1..] {
            log::debug!(
                "Duplicate {} of {}",
                media[idx].primary_file().display(),
                media[sorted[0]].primary_file().display()
            );
        }
        remove_indices.extend(&sorted[1..]);
    }

    let removed = remove_indices.len();
    let media = media
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !remove_indices.contains(i))
        .map(|(_, m)| m)
        .collect();

    DedupResult {
        media,
        removed,
        issues,
    }
}
