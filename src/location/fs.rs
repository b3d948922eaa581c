//! File system access for location resolution

use std::path::{Path, PathBuf};

use crate::errors::{LoaderError, LoaderResult};

/// A path matched by a location pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl FileStatus {
    pub fn new(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            is_dir,
        }
    }
}

/// Pattern expansion against some file system
pub trait FileSystem {
    /// Expands one pattern into the statuses of all matching paths.
    ///
    /// Zero matches is not an error.
    fn glob_status(&self, pattern: &str) -> LoaderResult<Vec<FileStatus>>;
}

/// The local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    fn status(path: &Path) -> Option<FileStatus> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(FileStatus::new(path, metadata.is_dir()))
    }
}

impl FileSystem for LocalFileSystem {
    fn glob_status(&self, pattern: &str) -> LoaderResult<Vec<FileStatus>> {
        let mut matches = Vec::new();

        for alternative in expand_braces(pattern) {
            if !is_glob_pattern(&alternative) {
                matches.extend(Self::status(Path::new(&alternative)));
                continue;
            }

            let paths = glob::glob(&alternative).map_err(|e| {
                LoaderError::parse(format!("Invalid location pattern: {}", e.msg), &alternative, e.pos)
            })?;
            for entry in paths {
                let path = entry.map_err(|e| {
                    LoaderError::io(
                        format!("Cannot read {}", e.path().display()),
                        std::io::Error::new(e.error().kind(), e.error().to_string()),
                    )
                })?;
                matches.extend(Self::status(&path));
            }
        }

        Ok(matches)
    }
}

/// Returns true if `pattern` contains glob metacharacters
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expands `{a,b}` alternatives, left to right, innermost groups included.
///
/// An unbalanced brace is left as literal text.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(open + i),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut expanded = Vec::new();
    for window in bounds.windows(2) {
        let choice = &pattern[window[0] + 1..window[1]];
        for tail in expand_braces(&format!("{}{}{}", prefix, choice, suffix)) {
            expanded.push(tail);
        }
    }
    expanded
}
