pub mod exif;
pub mod guess;
pub mod json;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::media::DateTaken;
use json::{SidecarExtractor, SidecarIndex};

/// One way of finding out when a file was captured.
///
/// Implementations report their own accuracy in the returned `DateTaken`
/// (lower = more trustworthy). "Not found" is `None`, never an error.
pub trait DateExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, path: &Path) -> Option<DateTaken>;
}

/// Which strategies the standard chain includes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DateOptions {
    /// Infer dates from filename patterns
    pub guess: bool,
    /// Fall back to fuzzy sidecar matching for otherwise undated files
    pub try_hard: bool,
    /// Evaluate every strategy and keep the most accurate result
    pub exhaustive: bool,
}

impl Default for DateOptions {
    fn default() -> Self {
        Self {
            guess: true,
            try_hard: false,
            exhaustive: false,
        }
    }
}

/// Ordered chain of extractors, injected at construction.
pub struct DateResolver {
    extractors: Vec<Box<dyn DateExtractor>>,
    exhaustive: bool,
}

impl DateResolver {
    pub fn new(extractors: Vec<Box<dyn DateExtractor>>) -> Self {
        Self {
            extractors,
            exhaustive: false,
        }
    }

    pub fn exhaustive(mut self, exhaustive: bool) -> Self {
        self.exhaustive = exhaustive;
        self
    }

    /// Sidecar JSON, EXIF, filename guess, then fuzzy sidecar (try-hard only).
    pub fn standard(sidecars: Arc<SidecarIndex>, options: &DateOptions) -> Self {
        let mut extractors: Vec<Box<dyn DateExtractor>> = vec![
            Box::new(SidecarExtractor::exact(sidecars.clone())),
            Box::new(exif::ExifExtractor),
        ];
        if options.guess {
            extractors.push(Box::new(guess::FilenameGuesser));
        }
        if options.try_hard {
            extractors.push(Box::new(SidecarExtractor::fuzzy(sidecars)));
        }
        Self::new(extractors).exhaustive(options.exhaustive)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Resolve using the configured mode.
    pub fn resolve(&self, path: &Path) -> Option<DateTaken> {
        if self.exhaustive {
            self.resolve_exhaustive(path)
        } else {
            self.resolve_first(path)
        }
    }

    /// First strategy that yields a date wins.
    pub fn resolve_first(&self, path: &Path) -> Option<DateTaken> {
        self.extractors.iter().find_map(|e| e.extract(path))
    }

    /// Run every strategy; lowest accuracy wins, earlier strategy on ties.
    pub fn resolve_exhaustive(&self, path: &Path) -> Option<DateTaken> {
        let mut best: Option<DateTaken> = None;
        for extractor in &self.extractors {
            if let Some(found) = extractor.extract(path) {
                if best.map_or(true, |b| found.accuracy < b.accuracy) {
                    best = Some(found);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Fixed(&'static str, u8, u32);

    impl DateExtractor for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn extract(&self, _path: &Path) -> Option<DateTaken> {
            let date = NaiveDate::from_ymd_opt(2020, 1, self.2)?.and_hms_opt(0, 0, 0)?;
            Some(DateTaken { date, accuracy: self.1 })
        }
    }

    struct Nothing;

    impl DateExtractor for Nothing {
        fn name(&self) -> &'static str {
            "nothing"
        }

        fn extract(&self, _path: &Path) -> Option<DateTaken> {
            None
        }
    }

    #[test]
    fn test_first_success_wins() {
        let resolver = DateResolver::new(vec![
            Box::new(Nothing),
            Box::new(Fixed("guess", 3, 1)),
            Box::new(Fixed("json", 1, 2)),
        ]);
        assert_eq!(resolver.resolve(Path::new("x.jpg")).unwrap().accuracy, 3);
    }

    #[test]
    fn test_exhaustive_picks_lowest_tier() {
        let resolver = DateResolver::new(vec![
            Box::new(Fixed("guess", 3, 1)),
            Box::new(Fixed("json", 1, 2)),
            Box::new(Fixed("exif", 1, 3)),
        ])
        .exhaustive(true);
        let got = resolver.resolve(Path::new("x.jpg")).unwrap();
        assert_eq!(got.accuracy, 1);
        assert_eq!(got.date.format("%d").to_string(), "02");
    }

    #[test]
    fn test_unresolved_is_none() {
        let resolver = DateResolver::new(vec![Box::new(Nothing)]);
        assert!(resolver.resolve(Path::new("x.jpg")).is_none());
    }

    #[test]
    fn test_standard_chain_order() {
        let index = Arc::new(SidecarIndex::new());
        let chain = DateResolver::standard(index.clone(), &DateOptions::default());
        assert_eq!(chain.strategy_names(), vec!["json", "exif", "guess"]);

        let options = DateOptions { guess: false, try_hard: true, exhaustive: false };
        let chain = DateResolver::standard(index, &options);
        assert_eq!(chain.strategy_names(), vec!["json", "exif", "json-tryhard"]);
    }

    #[test]
    fn test_standard_chain_guesses_from_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_20190509_154733.jpg");
        std::fs::write(&path, b"no exif here").unwrap();
        let chain = DateResolver::standard(Arc::new(SidecarIndex::new()), &DateOptions::default());
        assert_eq!(chain.resolve(&path).unwrap().accuracy, 2);
    }
}
