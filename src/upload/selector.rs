use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("invalid match pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("directory {0:?} is not valid UTF-8 and cannot be scanned")]
    NonUtf8Dir(PathBuf),

    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A file found by a post-event directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Finds the most recently modified file in `dir` whose name starts with
/// `matcher`.
///
/// `matcher` is a glob fragment; the directory part of the pattern is
/// escaped. Returns `Ok(None)` when nothing matches or every match vanished
/// before it could be stat'ed, and [`SelectError::NonUtf8Dir`] when `dir`
/// cannot be expressed as a glob pattern.
pub fn select_latest(dir: &Path, matcher: &str) -> Result<Option<CandidateFile>, SelectError> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| SelectError::NonUtf8Dir(dir.to_path_buf()))?;
    let pattern = format!("{}/{}*", glob::Pattern::escape(dir_str), matcher);

    let entries = glob::glob(&pattern).map_err(|source| SelectError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) if e.error().kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(SelectError::Stat {
                    path,
                    source: e.into_error(),
                });
            }
        }
    }

    pick_latest(paths)
}

/// Stats each path and keeps the one with the strictly latest modification
/// time. Ties keep the earlier path.
///
/// - Paths that no longer exist are skipped.
/// - Directories are skipped.
/// - Returns [`SelectError::Stat`] for any other stat failure.
pub fn pick_latest<I>(paths: I) -> Result<Option<CandidateFile>, SelectError>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut latest: Option<CandidateFile> = None;

    for path in paths {
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(source) => return Err(SelectError::Stat { path, source }),
        };

        if metadata.is_dir() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(source) => return Err(SelectError::Stat { path, source }),
        };

        match &latest {
            Some(current) if modified <= current.modified => {}
            _ => latest = Some(CandidateFile { path, modified }),
        }
    }

    Ok(latest)
}
