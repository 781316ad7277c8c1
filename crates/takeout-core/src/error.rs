use std::path::PathBuf;

use thiserror::Error;

/// Options that make a run impossible before any file is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Input directory not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Output directory {output} must not be inside the input directory {input}")]
    OutputInsideInput { input: PathBuf, output: PathBuf },
}

/// Non-fatal problems collected during a run and reported at the end.
#[derive(Error, Debug, Clone)]
pub enum Issue {
    #[error("Could not read {path}, treated as unique: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Could not scan {path}: {reason}")]
    Scan { path: PathBuf, reason: String },

    #[error("Failed to write {dest}: {reason}")]
    Write { dest: PathBuf, reason: String },

    #[error("Skipped link {link}: target {target} was not written")]
    MissingLinkTarget { link: PathBuf, target: PathBuf },

    #[error("Symlink {link} failed ({reason}), wrote a shortcut file instead")]
    ShortcutFallback { link: PathBuf, reason: String },

    #[error("Could not link {link} ({reason}), wrote a full copy instead")]
    CopyFallback { link: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_includes_path() {
        let issue = Issue::Unreadable {
            path: PathBuf::from("/takeout/broken.jpg"),
            reason: "permission denied".to_string(),
        };
        let message = issue.to_string();
        assert!(message.contains("/takeout/broken.jpg"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn config_error_names_both_paths() {
        let error = ConfigError::OutputInsideInput {
            input: PathBuf::from("/takeout"),
            output: PathBuf::from("/takeout/out"),
        };
        let message = error.to_string();
        assert!(message.contains("/takeout/out"));
    }
}
