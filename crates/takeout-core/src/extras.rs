use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::media::Media;

/// Localized "edited" suffixes (lowercase)
const EXTRA_FORMATS: &[&str] = &[
    "-edited",      // EN
    "-effects",     // EN
    "-smile",       // EN
    "-mix",         // EN
    "-edytowane",   // PL
    "-bearbeitet",  // DE
    "-bewerkt",     // NL
    "-編集済み",     // JA
    "-modificato",  // IT
    "-modifié",     // FR
    "-ha editado",  // ES
    "-editat",      // CA
];

/// Trailing "(n)" counter the exporter adds to repeated names
static COUNTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d+\)$").unwrap());

fn normalize(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

/// Base stem of a derivative name, or None if the stem has no extra suffix.
fn strip_extra(filename_without_ext: &str) -> Option<String> {
    let name = normalize(filename_without_ext);
    let name = COUNTER_RE.replace(&name, "").into_owned();
    EXTRA_FORMATS
        .iter()
        .find_map(|extra| name.strip_suffix(extra).map(str::to_string))
}

/// Check if a filename (without extension) matches an "extra" pattern
pub fn is_extra(filename_without_ext: &str) -> bool {
    strip_extra(filename_without_ext).is_some()
}

/// Remove extra suffix from filename if present (for JSON matching)
pub fn remove_extra(filename: &str) -> String {
    let normalized: String = filename.nfc().collect();
    let lower = normalized.to_lowercase();
    for extra in EXTRA_FORMATS {
        if let Some(pos) = lower.rfind(extra) {
            // Lowercasing can change byte offsets; only splice when they line up.
            if lower.len() == normalized.len() && normalized.is_char_boundary(pos) {
                let mut result = normalized.clone();
                result.replace_range(pos..pos + extra.len(), "");
                return result;
            }
        }
    }
    normalized
}

fn stem_of(m: &Media) -> String {
    let name = m.filename();
    Path::new(&name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&name)
        .to_string()
}

/// Drop edited variants whose original is still in the set.
///
/// Orphaned edits (no original with the same base stem) are kept.
/// Returns the surviving media and the number removed.
pub fn remove_extras(media: Vec<Media>) -> (Vec<Media>, usize) {
    let originals: HashSet<String> = media
        .iter()
        .map(stem_of)
        .filter(|stem| !is_extra(stem))
        .map(|stem| normalize(&stem))
        .collect();

    let before = media.len();
    let kept: Vec<Media> = media
        .into_iter()
        .filter(|m| match strip_extra(&stem_of(m)) {
            Some(base) => !originals.contains(&base),
            None => true,
        })
        .collect();
    let removed = before - kept.len();
    if removed > 0 {
        log::info!("Removed {} edited variant(s) with an original present", removed);
    }
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::GroupingKey;
    use std::path::PathBuf;

    fn media(path: &str) -> Media {
        Media::new(GroupingKey::Primary, PathBuf::from(path), 10)
    }

    #[test]
    fn test_is_extra() {
        assert!(is_extra("IMG_1234-edited"));
        assert!(is_extra("IMG_1234-EDITED"));
        assert!(is_extra("IMG_1234-bearbeitet(1)"));
        assert!(is_extra("写真-編集済み"));
        assert!(!is_extra("IMG_1234"));
        assert!(!is_extra("edited"));
    }

    #[test]
    fn test_remove_extra() {
        assert_eq!(remove_extra("IMG_1234-edited.jpg"), "IMG_1234.jpg");
        assert_eq!(remove_extra("IMG_1234.jpg"), "IMG_1234.jpg");
    }

    #[test]
    fn test_edit_removed_when_original_present() {
        let input = vec![
            media("2020/IMG_1.jpg"),
            media("2020/IMG_1-edited.jpg"),
            media("2020/IMG_2-edited.jpg"),
        ];
        let (kept, removed) = remove_extras(input);
        assert_eq!(removed, 1);
        let names: Vec<String> = kept.iter().map(Media::filename).collect();
        assert_eq!(names, vec!["IMG_1.jpg", "IMG_2-edited.jpg"]);
    }

    #[test]
    fn test_original_with_other_extension_counts() {
        let (kept, removed) = remove_extras(vec![
            media("2020/IMG_3.HEIC"),
            media("2020/img_3-Edited.jpg"),
        ]);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 1);
    }
}
