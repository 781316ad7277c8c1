use chrono::NaiveDateTime;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use super::DateExtractor;
use crate::extras;
use crate::media::DateTaken;

static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d+\)\.").unwrap());
static EXTRA_REGEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<extra>-[A-Za-zÀ-ÖØ-öø-ÿ]+(\(\d\))?)\.\w+$").unwrap());
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d\)\.").unwrap());

/// Exporter limit on sidecar file names, ".json" included
const MAX_JSON_NAME_LEN: usize = 51;
const SUPPLEMENTAL_SUFFIX: &str = ".supplemental-metadata";

/// Parse Google's JSON metadata and extract photoTakenTime
pub fn parse_google_json(json_bytes: &[u8]) -> Option<NaiveDateTime> {
    let data: serde_json::Value = serde_json::from_slice(json_bytes).ok()?;
    let ts = data.get("photoTakenTime")?.get("timestamp")?;
    let epoch = match ts.as_str() {
        Some(s) => s.trim().parse::<i64>().ok()?,
        None => ts.as_i64()?,
    };

    // Convert UTC epoch to local naive datetime
    let utc = chrono::DateTime::from_timestamp(epoch, 0)?;
    Some(utc.with_timezone(&chrono::Local).naive_local())
}

/// Names of all `.json` files per directory, gathered once during the scan.
#[derive(Debug, Default)]
pub struct SidecarIndex {
    by_dir: HashMap<PathBuf, BTreeSet<String>>,
}

impl SidecarIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, json_path: &Path) {
        let (Some(dir), Some(name)) = (json_path.parent(), json_path.file_name()) else {
            return;
        };
        self.by_dir
            .entry(dir.to_path_buf())
            .or_default()
            .insert(name.to_string_lossy().into_owned());
    }

    pub fn len(&self) -> usize {
        self.by_dir.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dir.is_empty()
    }

    fn contains(&self, dir: &Path, json_name: &str) -> bool {
        self.by_dir.get(dir).is_some_and(|names| names.contains(json_name))
    }

    /// Sidecars in `dir` starting with `prefix`, smallest name first.
    fn with_prefix<'a>(&'a self, dir: &Path, prefix: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.by_dir
            .get(dir)
            .into_iter()
            .flat_map(move |names| names.range(prefix.to_string()..))
            .take_while(move |name| name.starts_with(prefix))
            .filter(|name| name.ends_with(".json"))
    }
}

/// Reads capture time from the per-file JSON companion.
///
/// Exact mode only follows the exporter's deterministic naming rules. Fuzzy
/// mode (`--try-hard`) also strips edit suffixes and counters and accepts any
/// sidecar whose name starts with the media name; among several such
/// candidates the smallest name wins.
pub struct SidecarExtractor {
    index: Arc<SidecarIndex>,
    fuzzy: bool,
}

impl SidecarExtractor {
    pub fn exact(index: Arc<SidecarIndex>) -> Self {
        Self { index, fuzzy: false }
    }

    pub fn fuzzy(index: Arc<SidecarIndex>) -> Self {
        Self { index, fuzzy: true }
    }

    /// Path of the sidecar this extractor would read for `media_path`.
    pub fn find_sidecar(&self, media_path: &Path) -> Option<PathBuf> {
        let dir = media_path.parent()?;
        let filename = media_path.file_name()?.to_str()?;

        let methods: Vec<fn(&str) -> String> = if self.fuzzy {
            vec![
                extras::remove_extra as fn(&str) -> String,
                remove_extra_regex,
                remove_digit,
            ]
        } else {
            vec![
                identity as fn(&str) -> String,
                supplemental,
                shorten_name,
                bracket_swap,
                no_extension,
            ]
        };

        for method in methods {
            let json_name = format!("{}.json", method(filename));
            if self.index.contains(dir, &json_name) {
                return Some(dir.join(json_name));
            }
        }

        if self.fuzzy {
            let prefix = format!("{}.", filename);
            let found = self.index.with_prefix(dir, &prefix).next().cloned();
            if let Some(name) = found {
                return Some(dir.join(name));
            }
        }

        None
    }
}

impl DateExtractor for SidecarExtractor {
    fn name(&self) -> &'static str {
        if self.fuzzy {
            "json-tryhard"
        } else {
            "json"
        }
    }

    fn extract(&self, path: &Path) -> Option<DateTaken> {
        let sidecar = self.find_sidecar(path)?;
        let bytes = match std::fs::read(&sidecar) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("Cannot read sidecar {}: {}", sidecar.display(), e);
                return None;
            }
        };
        let date = parse_google_json(&bytes)?;
        let accuracy = if self.fuzzy { 4 } else { 1 };
        Some(DateTaken { date, accuracy })
    }
}

fn identity(filename: &str) -> String {
    filename.to_string()
}

fn supplemental(filename: &str) -> String {
    format!("{}{}", filename, SUPPLEMENTAL_SUFFIX)
}

fn shorten_name(filename: &str) -> String {
    let max_len = MAX_JSON_NAME_LEN - ".json".len();
    if filename.len() + ".json".len() > MAX_JSON_NAME_LEN {
        let mut end = max_len;
        while end > 0 && !filename.is_char_boundary(end) {
            end -= 1;
        }
        filename[..end].to_string()
    } else {
        filename.to_string()
    }
}

fn bracket_swap(filename: &str) -> String {
    if let Some(m) = BRACKET_RE.find_iter(filename).last() {
        let bracket = m.as_str().replace('.', "");
        if let Some(pos) = filename.rfind(&bracket) {
            let mut result = String::with_capacity(filename.len());
            result.push_str(&filename[..pos]);
            result.push_str(&filename[pos + bracket.len()..]);
            result.push_str(&bracket);
            return result;
        }
    }
    filename.to_string()
}

fn no_extension(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}

fn remove_extra_regex(filename: &str) -> String {
    let matches: Vec<_> = EXTRA_REGEX_RE.find_iter(filename).collect();
    if matches.len() == 1 {
        if let Some(caps) = EXTRA_REGEX_RE.captures(filename) {
            if let Some(extra) = caps.name("extra") {
                let mut result = filename.to_string();
                result.replace_range(extra.start()..extra.end(), "");
                return result;
            }
        }
    }
    filename.to_string()
}

fn remove_digit(filename: &str) -> String {
    DIGIT_RE.replace_all(filename, ".").to_string()
}
