//! Lazy, restartable file discovery over input folders.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::WalkDir;

/// A discovery source: one folder plus the glob patterns to match files
/// against, relative to that folder.
///
/// [`Input::paths`] yields a fresh lazy iterator every call; re-invoking it
/// re-walks the filesystem, so discovery is restartable and has no side
/// effects beyond directory reads.
#[derive(Debug)]
pub struct Input {
    folder: PathBuf,
    patterns: Vec<Pattern>,
}

impl Input {
    /// Compile an input. The folder must exist (paths are made absolute
    /// here); an invalid glob pattern is a configuration error.
    pub fn new(folder: &Path, patterns: &[String]) -> Result<Self, Box<dyn std::error::Error>> {
        let folder = folder
            .canonicalize()
            .map_err(|e| format!("input folder '{}': {}", folder.display(), e))?;
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| format!("invalid pattern '{}': {}", p, e).into())
            })
            .collect::<Result<Vec<_>, Box<dyn std::error::Error>>>()?;
        if patterns.is_empty() {
            return Err(format!("input folder '{}' has no patterns", folder.display()).into());
        }
        Ok(Self { folder, patterns })
    }

    /// Lazily yield the absolute path of every matching file.
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        debug!(folder = %self.folder.display(), "walking input folder");
        WalkDir::new(&self.folder)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(move |entry| {
                let relative = entry
                    .path()
                    .strip_prefix(&self.folder)
                    .unwrap_or_else(|_| entry.path());
                self.patterns
                    .iter()
                    .any(|pattern| pattern.matches_path_with(relative, options))
            })
            .map(|entry| entry.into_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_patterns_select_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join("nested/b.PNG"));
        touch(&dir.path().join("nested/c.txt"));

        let input = Input::new(dir.path(), &["**/*.png".to_string()]).unwrap();
        let mut found: Vec<String> = input
            .paths()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        found.sort();
        // Matching is case-insensitive, like typical image collections need.
        assert_eq!(found, vec!["a.png".to_string(), "b.PNG".to_string()]);
    }

    #[test]
    fn test_discovery_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"));

        let input = Input::new(dir.path(), &["*.png".to_string()]).unwrap();
        assert_eq!(input.paths().count(), 1);
        touch(&dir.path().join("b.png"));
        // A fresh walk sees the new file.
        assert_eq!(input.paths().count(), 2);
    }

    #[test]
    fn test_yields_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"));
        let input = Input::new(dir.path(), &["*.png".to_string()]).unwrap();
        assert!(input.paths().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        assert!(Input::new(Path::new("/no/such/folder"), &["*".to_string()]).is_err());
    }
}
