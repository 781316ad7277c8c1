use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use super::DateExtractor;
use crate::media::DateTaken;

/// Accuracy of a filename carrying full date and time
const FULL_TIMESTAMP: u8 = 2;
/// Accuracy of a filename carrying only the day
const DATE_ONLY: u8 = 3;

struct DatePattern {
    regex: &'static LazyLock<Regex>,
    format: &'static str,
    /// Number of leading characters of the match to parse
    take: Option<usize>,
    accuracy: u8,
}

static RE_0: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(01|02|03|04|05|06|07|08|09|10|11|12)[0-3]\d-\d{6})").unwrap());
static RE_1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(01|02|03|04|05|06|07|08|09|10|11|12)[0-3]\d_\d{6})").unwrap());
static RE_2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}-(01|02|03|04|05|06|07|08|09|10|11|12)-[0-3]\d-\d{2}-\d{2}-\d{2})").unwrap());
static RE_3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}-(01|02|03|04|05|06|07|08|09|10|11|12)-[0-3]\d-\d{6})").unwrap());
static RE_4: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(01|02|03|04|05|06|07|08|09|10|11|12)[0-3]\d{7})").unwrap());
static RE_5: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}_(01|02|03|04|05|06|07|08|09|10|11|12)_[0-3]\d_\d{2}_\d{2}_\d{2})").unwrap());
// WhatsApp: IMG-20190509-WA0001
static RE_6: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(01|02|03|04|05|06|07|08|09|10|11|12)[0-3]\d)-WA\d+").unwrap());
// Plain day stamp: 2019-05-09 or 2019_05_09 with no time
static RE_7: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}[-_](01|02|03|04|05|06|07|08|09|10|11|12)[-_][0-3]\d)").unwrap());

static PATTERNS: &[DatePattern] = &[
    DatePattern { regex: &RE_0, format: "%Y%m%d-%H%M%S", take: None, accuracy: FULL_TIMESTAMP },
    DatePattern { regex: &RE_1, format: "%Y%m%d_%H%M%S", take: None, accuracy: FULL_TIMESTAMP },
    DatePattern { regex: &RE_2, format: "%Y-%m-%d-%H-%M-%S", take: None, accuracy: FULL_TIMESTAMP },
    DatePattern { regex: &RE_3, format: "%Y-%m-%d-%H%M%S", take: None, accuracy: FULL_TIMESTAMP },
    DatePattern { regex: &RE_4, format: "%Y%m%d%H%M%S", take: Some(14), accuracy: FULL_TIMESTAMP },
    DatePattern { regex: &RE_5, format: "%Y_%m_%d_%H_%M_%S", take: None, accuracy: FULL_TIMESTAMP },
    DatePattern { regex: &RE_6, format: "%Y%m%d", take: None, accuracy: DATE_ONLY },
    DatePattern { regex: &RE_7, format: "%Y-%m-%d", take: None, accuracy: DATE_ONLY },
];

fn parse(pat: &DatePattern, s: &str) -> Option<NaiveDateTime> {
    if pat.accuracy == DATE_ONLY {
        let day = s.replace('_', "-");
        return NaiveDate::parse_from_str(&day, pat.format).ok()?.and_hms_opt(0, 0, 0);
    }
    NaiveDateTime::parse_from_str(s, pat.format).ok()
}

/// Guess a capture time from camera, screenshot and messenger naming schemes.
pub fn guess_date_from_filename(filename: &str) -> Option<DateTaken> {
    let basename = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    for pat in PATTERNS {
        if let Some(caps) = pat.regex.captures(basename) {
            if let Some(date_str) = caps.name("date") {
                let s = date_str.as_str();
                let s = match pat.take {
                    Some(n) => &s[..n.min(s.len())],
                    None => s,
                };
                if let Some(date) = parse(pat, s) {
                    return Some(DateTaken { date, accuracy: pat.accuracy });
                }
            }
        }
    }

    None
}

pub struct FilenameGuesser;

impl DateExtractor for FilenameGuesser {
    fn name(&self) -> &'static str {
        "guess"
    }

    fn extract(&self, path: &Path) -> Option<DateTaken> {
        guess_date_from_filename(path.file_name()?.to_str()?)
    }
}
