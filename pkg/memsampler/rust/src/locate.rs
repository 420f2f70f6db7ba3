// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Selection of the dump file belonging to the most recent run.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::naming::DumpPattern;

/// A dump file found in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFile {
    pub path: PathBuf,
    pub pid: u32,
    /// Run start embedded in the file name
    pub started: NaiveDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("failed to read dump directory {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no dump file found in {dir}")]
    NotFound { dir: PathBuf },
}

/// List every dump file directly inside `dir`, in directory order.
///
/// Subdirectories are not descended into. Entries that cannot be inspected,
/// have non UTF-8 names, or do not match `pattern` are skipped.
pub fn scan_dumps(dir: &Path, pattern: &DumpPattern) -> Result<Vec<DumpFile>, LocateError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LocateError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut dumps = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => continue,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %entry.path().display(), error = %e, "Skipping entry");
                continue;
            }
        }

        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(parsed) = pattern.parse(name) else {
            continue;
        };

        dumps.push(DumpFile {
            path: entry.path(),
            pid: parsed.pid,
            started: parsed.started,
        });
    }

    Ok(dumps)
}

/// Find the dump of the most recent run in `dir`.
///
/// The run with the greatest embedded start time wins. When several files
/// carry the same time, the one enumerated last wins; directory order is
/// filesystem dependent.
pub fn find_latest(dir: &Path, pattern: &DumpPattern) -> Result<DumpFile, LocateError> {
    let latest = scan_dumps(dir, pattern)?
        .into_iter()
        .reduce(|best, candidate| {
            if candidate.started >= best.started {
                candidate
            } else {
                best
            }
        });

    latest.ok_or_else(|| LocateError::NotFound {
        dir: dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_find_latest_picks_newest_run() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "svc_100_20240101120000.dat");
        let newest = touch(tmp.path(), "svc_300_20240301120000.dat");
        touch(tmp.path(), "svc_200_20240201120000.dat");

        let pattern = DumpPattern::for_service("svc");
        let latest = find_latest(tmp.path(), &pattern).unwrap();
        assert_eq!(latest.path, newest);
        assert_eq!(latest.pid, 300);
    }

    #[test]
    fn test_find_latest_ignores_foreign_and_malformed_files() {
        let tmp = TempDir::new().unwrap();
        let expected = touch(tmp.path(), "svc_100_20240101120000.dat");
        touch(tmp.path(), "svc_100_20991301120000.dat");
        touch(tmp.path(), "svc_abc_20990101120000.dat");
        touch(tmp.path(), "svc_100_20990101120000.dump");
        touch(tmp.path(), "other_100_20990101120000.dat");
        touch(tmp.path(), "svc_1_2_20990101120000.dat");
        touch(tmp.path(), "notes.txt");

        let pattern = DumpPattern::for_service("svc");
        let latest = find_latest(tmp.path(), &pattern).unwrap();
        assert_eq!(latest.path, expected);
    }

    #[test]
    fn test_find_latest_does_not_descend_into_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let expected = touch(tmp.path(), "svc_100_20240101120000.dat");
        let nested = tmp.path().join("archive");
        std::fs::create_dir(&nested).unwrap();
        touch(&nested, "svc_200_20990101120000.dat");
        // A directory whose own name matches the pattern is skipped too
        std::fs::create_dir(tmp.path().join("svc_300_20990101120000.dat")).unwrap();

        let pattern = DumpPattern::for_service("svc");
        let latest = find_latest(tmp.path(), &pattern).unwrap();
        assert_eq!(latest.path, expected);
        assert_eq!(scan_dumps(tmp.path(), &pattern).unwrap().len(), 1);
    }

    #[test]
    fn test_find_latest_empty_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "unrelated.log");

        let pattern = DumpPattern::for_service("svc");
        let result = find_latest(tmp.path(), &pattern);
        assert!(matches!(result, Err(LocateError::NotFound { .. })));
    }

    #[test]
    fn test_find_latest_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let pattern = DumpPattern::for_service("svc");
        let result = find_latest(&tmp.path().join("missing"), &pattern);
        assert!(matches!(result, Err(LocateError::ReadDir { .. })));
    }

    #[test]
    fn test_find_latest_same_timestamp_returns_one_of_them() {
        let tmp = TempDir::new().unwrap();
        let a = touch(tmp.path(), "svc_1_20240101120000.dat");
        let b = touch(tmp.path(), "svc_2_20240101120000.dat");

        let pattern = DumpPattern::for_service("svc");
        let latest = find_latest(tmp.path(), &pattern).unwrap();
        assert!(latest.path == a || latest.path == b);
    }

    #[test]
    fn test_find_latest_tie_is_last_seen() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "svc_1_20240101120000.dat");
        touch(tmp.path(), "svc_2_20240101120000.dat");

        let pattern = DumpPattern::for_service("svc");
        let scanned = scan_dumps(tmp.path(), &pattern).unwrap();
        let latest = find_latest(tmp.path(), &pattern).unwrap();
        assert_eq!(Some(&latest), scanned.last());
    }
}
