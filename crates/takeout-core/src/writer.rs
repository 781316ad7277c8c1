use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Issue;
use crate::link::{LinkCreator, ShortcutCreator};
use crate::media::{DateTaken, Media};
use crate::sanitize::sanitize_for_filesystem;
use crate::ThrottledProgress;

/// Folder under the output root holding one copy of every media file
pub const ALL_PHOTOS_DIR: &str = "ALL_PHOTOS";
/// Bucket for undated media when dividing by date
pub const DATE_UNKNOWN_DIR: &str = "date-unknown";

/// What happens to album membership in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlbumBehavior {
    /// Files in ALL_PHOTOS, links in album folders
    #[default]
    Shortcut,
    /// Files in ALL_PHOTOS and a full copy in every album folder
    DuplicateCopy,
    /// Files in album folders, links in ALL_PHOTOS
    ReverseShortcut,
    /// Files in ALL_PHOTOS, album membership in albums-info.json
    Json,
    /// Files in ALL_PHOTOS, albums ignored
    Nothing,
}

/// How deep ALL_PHOTOS is split by capture date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateDivision {
    #[default]
    None,
    Year,
    YearMonth,
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub output: PathBuf,
    /// Copy sources instead of moving them
    pub copy: bool,
    pub date_division: DateDivision,
    pub album_behavior: AlbumBehavior,
}

/// Result of the write phase.
pub struct WriteResult {
    /// Path inside ALL_PHOTOS per media, None if it could not be placed
    pub assignments: Vec<Option<PathBuf>>,
    pub files_written: u64,
    pub links_created: u64,
    pub failed: u64,
    pub issues: Vec<Issue>,
}

/// Directory inside ALL_PHOTOS for a capture date.
pub fn date_dir(root: &Path, date: Option<&DateTaken>, division: DateDivision) -> PathBuf {
    match (division, date) {
        (DateDivision::None, _) => root.to_path_buf(),
        (_, None) => root.join(DATE_UNKNOWN_DIR),
        (DateDivision::Year, Some(d)) => root.join(d.date.format("%Y").to_string()),
        (DateDivision::YearMonth, Some(d)) => root
            .join(d.date.format("%Y").to_string())
            .join(d.date.format("%m").to_string()),
    }
}

/// Suffix for albums whose folder would clash with ALL_PHOTOS
const ALBUM_CLASH_SUFFIX: &str = " (album)";

pub fn album_dir(output: &Path, album: &str) -> PathBuf {
    let mut name = sanitize_for_filesystem(album);
    if name.eq_ignore_ascii_case(ALL_PHOTOS_DIR) {
        name.push_str(ALBUM_CLASH_SUFFIX);
    }
    output.join(name)
}

/// Hands out destination paths that neither exist on disk nor were handed out
/// earlier in this run, appending "(n)" before the extension when needed.
struct NameAllocator {
    used: HashSet<PathBuf>,
    // Use counters per base path to avoid O(n²) worst case
    counters: HashMap<PathBuf, u32>,
    created_dirs: HashSet<PathBuf>,
}

impl NameAllocator {
    fn new() -> Self {
        Self {
            used: HashSet::new(),
            counters: HashMap::new(),
            created_dirs: HashSet::new(),
        }
    }

    fn is_free(&self, path: &Path) -> bool {
        // symlink_metadata also sees dangling links
        !self.used.contains(path) && fs::symlink_metadata(path).is_err()
    }

    fn allocate(&mut self, dir: &Path, filename: &str) -> io::Result<PathBuf> {
        // Create directory only once per unique path
        if !self.created_dirs.contains(dir) {
            fs::create_dir_all(dir)?;
            self.created_dirs.insert(dir.to_path_buf());
        }

        let base_dest = dir.join(filename);
        let start = self.counters.get(&base_dest).copied().unwrap_or(0);
        let dest = if start == 0 && self.is_free(&base_dest) {
            base_dest
        } else {
            let stem = Path::new(filename)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("file");
            let ext = Path::new(filename)
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("");

            // Start from the current counter value (avoid re-checking already used numbers)
            let mut n = start;
            let candidate = loop {
                n += 1;
                let new_name = if ext.is_empty() {
                    format!("{}({})", stem, n)
                } else {
                    format!("{}({}).{}", stem, n, ext)
                };
                let candidate = dir.join(&new_name);
                if self.is_free(&candidate) {
                    break candidate;
                }
            };
            self.counters.insert(base_dest, n);
            candidate
        };

        self.used.insert(dest.clone());
        Ok(dest)
    }
}

/// One physical write: copy or move `source` to `dest`.
#[derive(Debug, Clone)]
struct Transfer {
    source: PathBuf,
    dest: PathBuf,
}

#[derive(Debug, Clone)]
enum Extra {
    /// Another physical copy from its own source
    Transfer(Transfer),
    /// A copy of the anchor's written file
    CopyOfAnchor(PathBuf),
    /// A link pointing at the anchor's written file, and where a full copy
    /// goes if no kind of link can be made
    Link { link: PathBuf, copy: PathBuf },
}

/// Everything written for one media: exactly one physical anchor plus extras.
#[derive(Debug)]
struct Plan {
    anchor: Transfer,
    extras: Vec<Extra>,
    /// Entry inside ALL_PHOTOS (the anchor, or a link in reverse mode)
    primary_entry: PathBuf,
}

#[derive(Default)]
struct Outcome {
    written: u64,
    links: u64,
    /// What actually landed in ALL_PHOTOS
    primary_entry: Option<PathBuf>,
    failed: bool,
    issues: Vec<Issue>,
}

/// Reserve a link name in `dir`, plus a plain name for the copy fallback
/// when the linker renames links.
fn plan_link(
    dir: &Path,
    filename: &str,
    linker: &dyn LinkCreator,
    names: &mut NameAllocator,
) -> io::Result<(PathBuf, PathBuf)> {
    let link_name = linker.link_path(Path::new(filename));
    let link = names.allocate(dir, &link_name.to_string_lossy())?;
    let copy = if link_name.as_os_str() == filename {
        link.clone()
    } else {
        names.allocate(dir, filename)?
    };
    Ok((link, copy))
}

fn plan_media(
    m: &Media,
    options: &WriteOptions,
    linker: &dyn LinkCreator,
    names: &mut NameAllocator,
) -> io::Result<Plan> {
    let all_photos = options.output.join(ALL_PHOTOS_DIR);
    let primary_dir = date_dir(&all_photos, m.date.as_ref(), options.date_division);
    let filename = m.filename();
    let primary_source = m.primary_file().to_path_buf();

    let albums: Vec<(&str, &PathBuf)> = m
        .files
        .iter()
        .filter_map(|(key, path)| key.album_name().map(|name| (name, path)))
        .collect();

    match options.album_behavior {
        AlbumBehavior::ReverseShortcut if !albums.is_empty() => {
            let (auth_album, auth_source) = albums[0];
            let anchor = Transfer {
                source: auth_source.clone(),
                dest: names.allocate(&album_dir(&options.output, auth_album), &filename)?,
            };
            let (primary_entry, copy) = plan_link(&primary_dir, &filename, linker, names)?;
            let mut extras = vec![Extra::Link {
                link: primary_entry.clone(),
                copy,
            }];
            for (album, _) in &albums[1..] {
                let (link, copy) =
                    plan_link(&album_dir(&options.output, album), &filename, linker, names)?;
                extras.push(Extra::Link { link, copy });
            }
            Ok(Plan { anchor, extras, primary_entry })
        }
        behavior => {
            let anchor = Transfer {
                source: primary_source.clone(),
                dest: names.allocate(&primary_dir, &filename)?,
            };
            let mut extras = Vec::new();
            for (album, source) in &albums {
                let dir = album_dir(&options.output, album);
                match behavior {
                    AlbumBehavior::Shortcut => {
                        let (link, copy) = plan_link(&dir, &filename, linker, names)?;
                        extras.push(Extra::Link { link, copy });
                    }
                    AlbumBehavior::DuplicateCopy => {
                        let dest = names.allocate(&dir, &filename)?;
                        if **source == primary_source {
                            extras.push(Extra::CopyOfAnchor(dest));
                        } else {
                            extras.push(Extra::Transfer(Transfer {
                                source: (*source).clone(),
                                dest,
                            }));
                        }
                    }
                    _ => {}
                }
            }
            let primary_entry = anchor.dest.clone();
            Ok(Plan { anchor, extras, primary_entry })
        }
    }
}

/// Copy or move one file. Under move the source is only removed once the
/// destination is confirmed complete.
fn transfer(t: &Transfer, copy: bool) -> io::Result<()> {
    if !copy && fs::rename(&t.source, &t.dest).is_ok() {
        return Ok(());
    }

    // rename fails across filesystems, fall back to copy (+ delete when moving)
    let source_size = fs::metadata(&t.source)?.len();
    if let Err(e) = fs::copy(&t.source, &t.dest) {
        let _ = fs::remove_file(&t.dest);
        return Err(e);
    }
    let dest_size = fs::metadata(&t.dest)?.len();
    if dest_size != source_size {
        let _ = fs::remove_file(&t.dest);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "Copy verification failed: source {} bytes, dest {} bytes",
                source_size, dest_size
            ),
        ));
    }
    if !copy {
        fs::remove_file(&t.source)?;
    }
    Ok(())
}

fn set_mtime(path: &Path, date: Option<&DateTaken>) {
    if let Some(d) = date {
        if let Some(local) = d.date.and_local_timezone(chrono::Local).single() {
            let ft = filetime::FileTime::from_unix_time(local.timestamp(), 0);
            filetime::set_file_mtime(path, ft).ok();
        }
    }
}

/// Link, falling back to a shortcut file and then to a full copy at `copy`.
/// Returns the path created, if any.
fn place_link(
    linker: &dyn LinkCreator,
    target: &Path,
    link: &Path,
    copy: &Path,
    outcome: &mut Outcome,
) -> Option<PathBuf> {
    let err = match linker.create_link(target, link) {
        Ok(created) => {
            outcome.links += 1;
            return Some(created);
        }
        Err(e) => e,
    };

    if linker.kind() != "shortcut" {
        let shortcut = ShortcutCreator.link_path(link);
        if let Ok(created) = ShortcutCreator.create_link(target, &shortcut) {
            log::warn!("Symlink {} failed ({}), wrote shortcut", link.display(), err);
            outcome.links += 1;
            outcome.issues.push(Issue::ShortcutFallback {
                link: created.clone(),
                reason: err.to_string(),
            });
            return Some(created);
        }
    }

    let fallback = Transfer {
        source: target.to_path_buf(),
        dest: copy.to_path_buf(),
    };
    match transfer(&fallback, true) {
        Ok(()) => {
            log::warn!("Could not link {} ({}), copied instead", link.display(), err);
            outcome.written += 1;
            outcome.issues.push(Issue::CopyFallback {
                link: copy.to_path_buf(),
                reason: err.to_string(),
            });
            Some(copy.to_path_buf())
        }
        Err(e) => {
            outcome.failed = true;
            outcome.issues.push(Issue::Write {
                dest: copy.to_path_buf(),
                reason: e.to_string(),
            });
            None
        }
    }
}

fn execute(m: &Media, plan: &Plan, copy: bool, linker: &dyn LinkCreator) -> Outcome {
    let mut outcome = Outcome::default();
    let anchor_ok = match transfer(&plan.anchor, copy) {
        Ok(()) => {
            set_mtime(&plan.anchor.dest, m.date.as_ref());
            outcome.written += 1;
            true
        }
        Err(e) => {
            log::warn!("Failed to write {}: {}", plan.anchor.dest.display(), e);
            outcome.failed = true;
            outcome.issues.push(Issue::Write {
                dest: plan.anchor.dest.clone(),
                reason: e.to_string(),
            });
            false
        }
    };
    if anchor_ok && plan.anchor.dest == plan.primary_entry {
        outcome.primary_entry = Some(plan.anchor.dest.clone());
    }

    for extra in &plan.extras {
        match extra {
            Extra::Transfer(t) => match transfer(t, copy) {
                Ok(()) => {
                    set_mtime(&t.dest, m.date.as_ref());
                    outcome.written += 1;
                }
                Err(e) => {
                    outcome.failed = true;
                    outcome.issues.push(Issue::Write {
                        dest: t.dest.clone(),
                        reason: e.to_string(),
                    });
                }
            },
            Extra::CopyOfAnchor(dest) | Extra::Link { link: dest, .. } if !anchor_ok => {
                outcome.issues.push(Issue::MissingLinkTarget {
                    link: dest.clone(),
                    target: plan.anchor.dest.clone(),
                });
            }
            Extra::CopyOfAnchor(dest) => {
                let t = Transfer {
                    source: plan.anchor.dest.clone(),
                    dest: dest.clone(),
                };
                match transfer(&t, true) {
                    Ok(()) => {
                        set_mtime(dest, m.date.as_ref());
                        outcome.written += 1;
                    }
                    Err(e) => {
                        outcome.failed = true;
                        outcome.issues.push(Issue::Write {
                            dest: dest.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Extra::Link { link, copy } => {
                let created = place_link(linker, &plan.anchor.dest, link, copy, &mut outcome);
                if *link == plan.primary_entry {
                    outcome.primary_entry = created;
                }
            }
        }
    }
    outcome
}

/// Place every media under the output root.
///
/// Destination names are assigned sequentially first, so no two media ever
/// race for a name; the writes then run in parallel, one task per media.
pub fn write_output(
    media: &[Media],
    options: &WriteOptions,
    linker: &dyn LinkCreator,
    progress: &ThrottledProgress,
) -> anyhow::Result<WriteResult> {
    fs::create_dir_all(&options.output)?;

    // Phase 1: Assign destination paths (sequential - needs collision tracking)
    let mut names = NameAllocator::new();
    let mut issues = Vec::new();
    let mut plans: Vec<Option<Plan>> = Vec::with_capacity(media.len());
    for m in media {
        match plan_media(m, options, linker, &mut names) {
            Ok(plan) => plans.push(Some(plan)),
            Err(e) => {
                let dest = options.output.join(m.filename());
                log::warn!("Cannot prepare {}: {}", dest.display(), e);
                issues.push(Issue::Write {
                    dest,
                    reason: e.to_string(),
                });
                plans.push(None);
            }
        }
    }
    let planning_failures = issues.len() as u64;

    // Phase 2: Write files in parallel
    let total = media.len() as u64;
    let counter = AtomicU64::new(0);
    let outcomes: Vec<Option<Outcome>> = media
        .par_iter()
        .zip(plans.par_iter())
        .map(|(m, plan)| {
            let outcome = plan
                .as_ref()
                .map(|plan| execute(m, plan, options.copy, linker));
            let current = counter.fetch_add(1, Ordering::Relaxed);
            progress.report("write", current, total, "Writing files");
            outcome
        })
        .collect();

    let mut result = WriteResult {
        assignments: Vec::with_capacity(media.len()),
        files_written: 0,
        links_created: 0,
        failed: planning_failures,
        issues,
    };
    for outcome in outcomes {
        match outcome {
            Some(outcome) => {
                result.files_written += outcome.written;
                result.links_created += outcome.links;
                if outcome.failed {
                    result.failed += 1;
                }
                result.issues.extend(outcome.issues);
                result.assignments.push(outcome.primary_entry);
            }
            None => result.assignments.push(None),
        }
    }

    log::info!(
        "Wrote {} file(s) and {} link(s) to {}",
        result.files_written,
        result.links_created,
        options.output.display()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::SymlinkCreator;
    use crate::media::GroupingKey;
    use chrono::NaiveDate;

    fn source(dir: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    fn options(output: &Path, album_behavior: AlbumBehavior) -> WriteOptions {
        WriteOptions {
            output: output.to_path_buf(),
            copy: true,
            date_division: DateDivision::None,
            album_behavior,
        }
    }

    fn in_album(input: &Path) -> Media {
        let mut m = Media::new(
            GroupingKey::Primary,
            source(input, "Photos from 2020/a.jpg", b"abc"),
            3,
        );
        m.files.insert(
            GroupingKey::Named("Vacation".into()),
            source(input, "Vacation/a.jpg", b"abc"),
        );
        m
    }

    fn run(media: &[Media], options: &WriteOptions, linker: &dyn LinkCreator) -> WriteResult {
        let noop = |_: &str, _: u64, _: u64, _: &str| {};
        let progress = ThrottledProgress::new(&noop);
        write_output(media, options, linker, &progress).unwrap()
    }

    #[test]
    fn test_date_dir() {
        let root = Path::new("/out/ALL_PHOTOS");
        let date = DateTaken {
            date: NaiveDate::from_ymd_opt(2021, 3, 9)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            accuracy: 1,
        };
        assert_eq!(date_dir(root, Some(&date), DateDivision::None), root);
        assert_eq!(date_dir(root, None, DateDivision::None), root);
        assert_eq!(date_dir(root, Some(&date), DateDivision::Year), root.join("2021"));
        assert_eq!(
            date_dir(root, Some(&date), DateDivision::YearMonth),
            root.join("2021").join("03")
        );
        assert_eq!(date_dir(root, None, DateDivision::Year), root.join(DATE_UNKNOWN_DIR));
    }

    #[test]
    fn test_album_dir_is_sanitized() {
        assert_eq!(album_dir(Path::new("/out"), "a/b"), Path::new("/out/a%2F%b"));
    }

    #[test]
    fn test_album_named_like_primary_area() {
        let out = Path::new("/out");
        assert_eq!(album_dir(out, "ALL_PHOTOS"), out.join("ALL_PHOTOS (album)"));
        assert_eq!(album_dir(out, "all_photos"), out.join("all_photos (album)"));
        assert_ne!(album_dir(out, "ALL_PHOTOS"), out.join(ALL_PHOTOS_DIR));
    }

    #[test]
    fn test_names_are_unique_within_run() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let first = Media::new(GroupingKey::Primary, source(input.path(), "x/a.jpg", b"1"), 1);
        let second = Media::new(GroupingKey::Primary, source(input.path(), "y/a.jpg", b"2"), 1);
        let third = Media::new(GroupingKey::Primary, source(input.path(), "z/a.jpg", b"3"), 1);

        let result = run(
            &[first, second, third],
            &options(output.path(), AlbumBehavior::Nothing),
            &SymlinkCreator,
        );
        let all = output.path().join(ALL_PHOTOS_DIR);
        assert_eq!(
            result.assignments,
            vec![
                Some(all.join("a.jpg")),
                Some(all.join("a(1).jpg")),
                Some(all.join("a(2).jpg")),
            ]
        );
        assert_eq!(fs::read(all.join("a(1).jpg")).unwrap(), b"2");
    }

    #[test]
    fn test_rerun_never_overwrites() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let m = Media::new(GroupingKey::Primary, source(input.path(), "a.jpg", b"abc"), 3);
        let opts = options(output.path(), AlbumBehavior::Nothing);

        run(std::slice::from_ref(&m), &opts, &SymlinkCreator);
        let second = run(&[m], &opts, &SymlinkCreator);

        let all = output.path().join(ALL_PHOTOS_DIR);
        assert_eq!(second.assignments, vec![Some(all.join("a(1).jpg"))]);
        assert!(all.join("a.jpg").exists());
        assert!(all.join("a(1).jpg").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_shortcut_mode_one_file_one_link() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let result = run(
            &[in_album(input.path())],
            &options(output.path(), AlbumBehavior::Shortcut),
            &SymlinkCreator,
        );
        assert_eq!(result.files_written, 1);
        assert_eq!(result.links_created, 1);

        let physical = output.path().join(ALL_PHOTOS_DIR).join("a.jpg");
        let link = output.path().join("Vacation").join("a.jpg");
        assert!(fs::symlink_metadata(&physical).unwrap().file_type().is_file());
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&link).unwrap(), b"abc");
    }

    #[test]
    fn test_shortcut_files_when_symlinks_unavailable() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let result = run(
            &[in_album(input.path())],
            &options(output.path(), AlbumBehavior::Shortcut),
            &ShortcutCreator,
        );
        assert_eq!(result.links_created, 1);
        let text = fs::read_to_string(output.path().join("Vacation").join("a.jpg.url")).unwrap();
        assert!(text.contains("ALL_PHOTOS/a.jpg"));
    }

    /// A linker whose links always fail, posing as the given kind.
    struct FailingLinker(&'static str);

    impl LinkCreator for FailingLinker {
        fn kind(&self) -> &'static str {
            self.0
        }

        fn link_path(&self, planned: &Path) -> PathBuf {
            if self.0 == "shortcut" {
                ShortcutCreator.link_path(planned)
            } else {
                planned.to_path_buf()
            }
        }

        fn create_link(&self, _target: &Path, _link: &Path) -> io::Result<PathBuf> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "no links here"))
        }
    }

    #[test]
    fn test_failed_symlink_falls_back_to_shortcut() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let result = run(
            &[in_album(input.path())],
            &options(output.path(), AlbumBehavior::Shortcut),
            &FailingLinker("symlink"),
        );
        assert_eq!(result.files_written, 1);
        assert_eq!(result.links_created, 1);
        assert_eq!(result.failed, 0);

        let shortcut = output.path().join("Vacation").join("a.jpg.url");
        assert!(fs::read_to_string(&shortcut).unwrap().starts_with("[InternetShortcut]"));
        assert!(matches!(
            &result.issues[..],
            [Issue::ShortcutFallback { link, .. }] if *link == shortcut
        ));
    }

    #[test]
    fn test_failed_symlink_and_shortcut_fall_back_to_copy() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        // The shortcut name is already taken, so the shortcut fallback fails too
        source(output.path(), "Vacation/a.jpg.url", b"taken");

        let result = run(
            &[in_album(input.path())],
            &options(output.path(), AlbumBehavior::Shortcut),
            &FailingLinker("symlink"),
        );
        assert_eq!(result.files_written, 2);
        assert_eq!(result.links_created, 0);

        let copy = output.path().join("Vacation").join("a.jpg");
        assert_eq!(fs::read(&copy).unwrap(), b"abc");
        assert_eq!(
            fs::read(output.path().join("Vacation").join("a.jpg.url")).unwrap(),
            b"taken"
        );
        assert!(matches!(
            &result.issues[..],
            [Issue::CopyFallback { link, .. }] if *link == copy
        ));
    }

    #[test]
    fn test_failed_shortcut_copy_keeps_media_name() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let result = run(
            &[in_album(input.path())],
            &options(output.path(), AlbumBehavior::Shortcut),
            &FailingLinker("shortcut"),
        );
        assert_eq!(result.files_written, 2);

        let album = output.path().join("Vacation");
        assert_eq!(fs::read(album.join("a.jpg")).unwrap(), b"abc");
        assert!(!album.join("a.jpg.url").exists());
        assert!(matches!(&result.issues[..], [Issue::CopyFallback { .. }]));
    }

    #[test]
    fn test_duplicate_copy_mode() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let result = run(
            &[in_album(input.path())],
            &options(output.path(), AlbumBehavior::DuplicateCopy),
            &SymlinkCreator,
        );
        assert_eq!(result.files_written, 2);
        assert_eq!(result.links_created, 0);
        let copy = output.path().join("Vacation").join("a.jpg");
        assert!(fs::symlink_metadata(&copy).unwrap().file_type().is_file());
        assert_eq!(fs::read(copy).unwrap(), b"abc");
    }

    #[cfg(unix)]
    #[test]
    fn test_reverse_shortcut_mode() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let loose = Media::new(GroupingKey::Primary, source(input.path(), "b.jpg", b"b"), 1);
        let result = run(
            &[in_album(input.path()), loose],
            &options(output.path(), AlbumBehavior::ReverseShortcut),
            &SymlinkCreator,
        );
        assert_eq!(result.files_written, 2);
        assert_eq!(result.links_created, 1);

        let all = output.path().join(ALL_PHOTOS_DIR);
        let physical = output.path().join("Vacation").join("a.jpg");
        assert!(fs::symlink_metadata(&physical).unwrap().file_type().is_file());
        assert!(fs::symlink_metadata(all.join("a.jpg")).unwrap().file_type().is_symlink());
        assert!(fs::symlink_metadata(all.join("b.jpg")).unwrap().file_type().is_file());
        assert_eq!(result.assignments[0], Some(all.join("a.jpg")));
    }

    #[test]
    fn test_json_mode_writes_no_album_folders() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let result = run(
            &[in_album(input.path())],
            &options(output.path(), AlbumBehavior::Json),
            &SymlinkCreator,
        );
        assert_eq!(result.files_written, 1);
        assert_eq!(result.links_created, 0);
        assert!(!output.path().join("Vacation").exists());
    }

    #[test]
    fn test_move_removes_only_transferred_source() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let m = in_album(input.path());
        let primary = m.primary_file().to_path_buf();
        let album_copy = input.path().join("Vacation").join("a.jpg");

        let mut opts = options(output.path(), AlbumBehavior::Nothing);
        opts.copy = false;
        let result = run(&[m], &opts, &SymlinkCreator);

        assert_eq!(result.failed, 0);
        assert!(!primary.exists());
        assert!(album_copy.exists());
        assert_eq!(fs::read(output.path().join(ALL_PHOTOS_DIR).join("a.jpg")).unwrap(), b"abc");
    }

    #[test]
    fn test_failed_write_keeps_source() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut m = Media::new(GroupingKey::Primary, source(input.path(), "a.jpg", b"abc"), 3);
        m.date = Some(DateTaken {
            date: NaiveDate::from_ymd_opt(2020, 5, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            accuracy: 1,
        });
        // A plain file where the year folder should go
        source(output.path(), "ALL_PHOTOS/2020", b"");

        let mut opts = options(output.path(), AlbumBehavior::Nothing);
        opts.copy = false;
        opts.date_division = DateDivision::Year;
        let result = run(&[m], &opts, &SymlinkCreator);

        assert_eq!(result.failed, 1);
        assert_eq!(result.assignments, vec![None]);
        assert!(matches!(result.issues[0], Issue::Write { .. }));
        assert!(input.path().join("a.jpg").exists());
    }

    #[test]
    fn test_undated_goes_to_date_unknown() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let m = Media::new(GroupingKey::Primary, source(input.path(), "a.jpg", b"abc"), 3);
        let mut opts = options(output.path(), AlbumBehavior::Nothing);
        opts.date_division = DateDivision::YearMonth;
        run(&[m], &opts, &SymlinkCreator);
        assert!(output
            .path()
            .join(ALL_PHOTOS_DIR)
            .join(DATE_UNKNOWN_DIR)
            .join("a.jpg")
            .exists());
    }
}
