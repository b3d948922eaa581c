//! Location string resolution
//!
//! A location is a comma-separated list of path patterns. Each pattern is
//! expanded independently, in pattern order. Patterns that match nothing and
//! matches that are not table directories are logged as warnings; only an
//! empty aggregate result fails. Repeated paths are kept.

use std::path::PathBuf;

use super::fs::{FileSystem, LocalFileSystem};
use crate::config::{ConfigView, STRICT_DIRECTORIES};
use crate::errors::{LoaderError, LoaderResult};
use crate::observability::{log_event_with_fields, Event};

/// Resolves location strings into table directories
pub struct LocationResolver<F: FileSystem = LocalFileSystem> {
    fs: F,
    strict_directories: bool,
}

impl LocationResolver<LocalFileSystem> {
    /// Resolver over the local file system
    pub fn local() -> Self {
        Self::new(LocalFileSystem)
    }
}

impl<F: FileSystem> LocationResolver<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            strict_directories: false,
        }
    }

    /// Treat non-directory matches as configuration errors
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_directories = strict;
        self
    }

    /// Resolves `location` into an ordered list of table directories.
    ///
    /// Strictness is enabled by either the builder flag or the environment.
    pub fn resolve(&self, location: &str, env: &dyn ConfigView) -> LoaderResult<Vec<PathBuf>> {
        let strict = self.strict_directories || env.flag(STRICT_DIRECTORIES);
        let mut result = Vec::new();

        for pattern in split_location(location) {
            let matches = self.fs.glob_status(&pattern)?;

            if matches.is_empty() {
                log_event_with_fields(Event::PatternNoMatch, &[("pattern", pattern.as_str())]);
                continue;
            }

            for status in matches {
                if status.is_dir {
                    result.push(status.path);
                } else if strict {
                    return Err(LoaderError::configuration(format!(
                        "Input path {} is not a directory",
                        status.path.display()
                    )));
                } else {
                    let path = status.path.display().to_string();
                    log_event_with_fields(
                        Event::NotADirectory,
                        &[("path", path.as_str()), ("pattern", pattern.as_str())],
                    );
                }
            }
        }

        if result.is_empty() {
            return Err(LoaderError::no_table_specified().with_details(location.to_string()));
        }

        let count = result.len().to_string();
        log_event_with_fields(
            Event::LocationResolved,
            &[("location", location), ("tables", count.as_str())],
        );
        Ok(result)
    }
}

/// Splits a location on commas that are not inside `{...}`
pub fn split_location(location: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in location.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                patterns.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    patterns.push(current);

    patterns
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobEnv;
    use crate::errors::LoaderErrorCode;
    use crate::location::FileStatus;
    use std::collections::HashMap;

    struct FakeFs {
        matches: HashMap<String, Vec<FileStatus>>,
    }

    impl FakeFs {
        fn new(entries: Vec<(&str, Vec<(&str, bool)>)>) -> Self {
            let matches = entries
                .into_iter()
                .map(|(pattern, statuses)| {
                    let statuses = statuses
                        .into_iter()
                        .map(|(p, is_dir)| FileStatus::new(p, is_dir))
                        .collect();
                    (pattern.to_string(), statuses)
                })
                .collect();
            Self { matches }
        }
    }

    impl FileSystem for FakeFs {
        fn glob_status(&self, pattern: &str) -> LoaderResult<Vec<FileStatus>> {
            Ok(self.matches.get(pattern).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_split_location_respects_braces() {
        assert_eq!(split_location("a,b"), vec!["a", "b"]);
        assert_eq!(split_location("/t/{a,b}, c"), vec!["/t/{a,b}", "c"]);
        assert_eq!(split_location("a,,b,"), vec!["a", "b"]);
    }

    #[test]
    fn test_pattern_order_preserved() {
        let fs = FakeFs::new(vec![("dirB", vec![("dirB", true)]), ("dirA", vec![("dirA", true)])]);
        let paths = LocationResolver::new(fs).resolve("dirA,dirB", &JobEnv::new()).unwrap();
        assert_eq!(paths, vec![PathBuf::from("dirA"), PathBuf::from("dirB")]);
    }

    #[test]
    fn test_no_match_anywhere_fails() {
        let fs = FakeFs::new(Vec::new());
        let err = LocationResolver::new(fs).resolve("noMatch*", &JobEnv::new()).unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::ConfigurationError);
        assert_eq!(err.message(), "no table specified");
    }

    #[test]
    fn test_no_match_in_one_pattern_is_warning() {
        let fs = FakeFs::new(vec![("t1", vec![("t1", true)])]);
        let paths = LocationResolver::new(fs).resolve("none*,t1", &JobEnv::new()).unwrap();
        assert_eq!(paths, vec![PathBuf::from("t1")]);
    }

    #[test]
    fn test_non_directory_skipped_unless_strict() {
        let entries = || vec![("t*", vec![("t1", true), ("t.txt", false)])];

        let paths = LocationResolver::new(FakeFs::new(entries()))
            .resolve("t*", &JobEnv::new())
            .unwrap();
        assert_eq!(paths, vec![PathBuf::from("t1")]);

        let err = LocationResolver::new(FakeFs::new(entries()))
            .strict(true)
            .resolve("t*", &JobEnv::new())
            .unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::ConfigurationError);

        let mut env = JobEnv::new();
        env.set(STRICT_DIRECTORIES, "true");
        assert!(LocationResolver::new(FakeFs::new(entries())).resolve("t*", &env).is_err());
    }

    #[test]
    fn test_only_files_fails() {
        let fs = FakeFs::new(vec![("f", vec![("f", false)])]);
        let err = LocationResolver::new(fs).resolve("f", &JobEnv::new()).unwrap_err();
        assert_eq!(err.message(), "no table specified");
    }

    #[test]
    fn test_repeated_paths_kept() {
        let fs = FakeFs::new(vec![("t", vec![("t", true)])]);
        let paths = LocationResolver::new(fs).resolve("t,t", &JobEnv::new()).unwrap();
        assert_eq!(paths.len(), 2);
    }
}
