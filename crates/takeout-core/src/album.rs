use std::collections::HashMap;

use crate::dedup::{identical_groups, GroupScope, HashCache, Identical};
use crate::error::Issue;
use crate::media::Media;
use crate::ThrottledProgress;

pub struct MergeResult {
    pub media: Vec<Media>,
    /// Number of entities folded into another one
    pub merged: usize,
    pub issues: Vec<Issue>,
}

/// Fuse media with identical content found under different groupings.
///
/// Each group collapses into its first-discovered member, which receives the
/// union of all `files` and the most accurate date (first one on ties).
pub fn merge_albums(media: Vec<Media>, cache: &HashCache, progress: &ThrottledProgress) -> MergeResult {
    let Identical { groups, issues } =
        identical_groups(&media, cache, GroupScope::Global, progress, "albums");

    // member index -> index of the entity it folds into
    let mut target_of: HashMap<usize, usize> = HashMap::new();
    for group in &groups {
        for &member in &group[1..] {
            target_of.insert(member, group[0]);
        }
    }
    let merged = target_of.len();

    let mut slots: Vec<Option<Media>> = media.into_iter().map(Some).collect();
    for group in &groups {
        let head = group[0];
        for &member in &group[1..] {
            let Some(other) = slots[member].take() else {
                continue;
            };
            if let Some(target) = slots[head].as_mut() {
                fuse(target, other);
            }
        }
    }

    if merged > 0 {
        log::info!("Merged {} album copies into existing media", merged);
    }

    MergeResult {
        media: slots.into_iter().flatten().collect(),
        merged,
        issues,
    }
}

fn fuse(target: &mut Media, other: Media) {
    for (key, path) in other.files {
        target.files.entry(key).or_insert(path);
    }
    if let Some(date) = other.date {
        if date.accuracy < target.best_accuracy() {
            target.date = Some(date);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{DateTaken, GroupingKey};
    use chrono::NaiveDate;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn write(dir: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    fn at(day: u32, accuracy: u8) -> Option<DateTaken> {
        let date = NaiveDate::from_ymd_opt(2020, 1, day)?.and_hms_opt(0, 0, 0)?;
        Some(DateTaken { date, accuracy })
    }

    #[test]
    fn test_merge_keeps_every_key_and_best_date() {
        let dir = tempfile::tempdir().unwrap();
        let noop = |_: &str, _: u64, _: u64, _: &str| {};
        let progress = ThrottledProgress::new(&noop);

        let mut a = Media::new(GroupingKey::Primary, write(dir.path(), "2020/a.jpg", &[1, 2, 3]), 3);
        a.date = at(1, 2);
        let mut b = Media::new(
            GroupingKey::Named("Vacation".into()),
            write(dir.path(), "Vacation/b.jpg", &[1, 2, 3]),
            3,
        );
        b.date = at(2, 1);
        let c = Media::new(
            GroupingKey::Named("Trip".into()),
            write(dir.path(), "Trip/c.jpg", &[9, 9, 9]),
            3,
        );

        let result = merge_albums(vec![a, b, c], &HashCache::new(), &progress);
        assert_eq!(result.merged, 1);
        assert_eq!(result.media.len(), 2);

        let fused = &result.media[0];
        assert_eq!(fused.files.len(), 2);
        assert!(fused.files.contains_key(&GroupingKey::Primary));
        assert_eq!(fused.albums(), vec!["Vacation"]);
        assert_eq!(fused.date, at(2, 1));
        assert_eq!(result.media[1].albums(), vec!["Trip"]);
    }

    #[test]
    fn test_equal_accuracy_keeps_first_date() {
        let dir = tempfile::tempdir().unwrap();
        let noop = |_: &str, _: u64, _: u64, _: &str| {};
        let progress = ThrottledProgress::new(&noop);

        let mut a = Media::new(GroupingKey::Named("A".into()), write(dir.path(), "A/x.jpg", b"xx"), 2);
        a.date = at(5, 1);
        let mut b = Media::new(GroupingKey::Named("B".into()), write(dir.path(), "B/x.jpg", b"xx"), 2);
        b.date = at(6, 1);

        let result = merge_albums(vec![a, b], &HashCache::new(), &progress);
        assert_eq!(result.media.len(), 1);
        assert_eq!(result.media[0].date, at(5, 1));
        assert!(!result.media[0].files.contains_key(&GroupingKey::Primary));
        assert_eq!(result.media[0].albums(), vec!["A", "B"]);
    }
}
