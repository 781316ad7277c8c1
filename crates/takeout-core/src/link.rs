use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Creates a file-system entry at one path that points at another.
pub trait LinkCreator: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Path that will actually be created for a planned link path.
    fn link_path(&self, planned: &Path) -> PathBuf {
        planned.to_path_buf()
    }

    /// Create a link exactly at `link` pointing at `target`; never overwrites.
    fn create_link(&self, target: &Path, link: &Path) -> io::Result<PathBuf>;
}

/// Relative symbolic links.
pub struct SymlinkCreator;

#[cfg(unix)]
fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink_file(_original: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks are not supported"))
}

impl LinkCreator for SymlinkCreator {
    fn kind(&self) -> &'static str {
        "symlink"
    }

    fn create_link(&self, target: &Path, link: &Path) -> io::Result<PathBuf> {
        let base = link.parent().unwrap_or_else(|| Path::new("."));
        let rel = pathdiff::diff_paths(target, base).unwrap_or_else(|| target.to_path_buf());
        symlink_file(&rel, link)?;
        Ok(link.to_path_buf())
    }
}

/// Windows drive prefix such as `C:`, kept verbatim in file URLs
fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// `.url` Internet Shortcut files, opened by the platform shell like a link.
/// Used where symlinks need privileges the process does not have.
pub struct ShortcutCreator;

impl ShortcutCreator {
    fn file_url(target: &Path) -> io::Result<String> {
        let absolute = fs::canonicalize(target)?;
        let mut path = absolute.to_string_lossy().replace('\\', "/");
        if let Some(stripped) = path.strip_prefix("//?/") {
            path = stripped.to_string();
        }
        let segments: Vec<String> = path
            .split('/')
            .map(|segment| {
                if is_drive(segment) {
                    segment.to_string()
                } else {
                    urlencoding::encode(segment).into_owned()
                }
            })
            .collect();
        let mut url = String::from("file://");
        if !path.starts_with('/') {
            url.push('/');
        }
        url.push_str(&segments.join("/"));
        Ok(url)
    }
}

impl LinkCreator for ShortcutCreator {
    fn kind(&self) -> &'static str {
        "shortcut"
    }

    fn link_path(&self, planned: &Path) -> PathBuf {
        let mut name = planned.as_os_str().to_owned();
        name.push(".url");
        PathBuf::from(name)
    }

    fn create_link(&self, target: &Path, link: &Path) -> io::Result<PathBuf> {
        let url = Self::file_url(target)?;
        let mut file = OpenOptions::new().write(true).create_new(true).open(link)?;
        write!(file, "[InternetShortcut]\r\nURL={}\r\n", url)?;
        Ok(link.to_path_buf())
    }
}

/// Pick the link flavour the output filesystem supports, by trying a symlink.
pub fn detect_linker(dir: &Path) -> Box<dyn LinkCreator> {
    let check = dir.join(".takeout-link-check");
    let check_link = dir.join(".takeout-link-check.link");
    let _ = fs::remove_file(&check_link);

    let supported = fs::write(&check, b"").is_ok()
        && SymlinkCreator.create_link(&check, &check_link).is_ok();

    let _ = fs::remove_file(&check_link);
    let _ = fs::remove_file(&check);

    if supported {
        Box::new(SymlinkCreator)
    } else {
        log::info!("Symlinks unsupported in {}, using shortcut files", dir.display());
        Box::new(ShortcutCreator)
    }
}
