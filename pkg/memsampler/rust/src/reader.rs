// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Parsing of JSON Lines dump files.
//!
//! The whole file is read as one snapshot; the collector may still be
//! appending to it. Parsing is all-or-nothing with a single exception: a
//! last line lacking its newline terminator is an append that was in flight
//! (or cut short by a crash), and is dropped if it does not parse.

use std::path::{Path, PathBuf};

use crate::record::SampleRecord;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read dump file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Read every record of the dump at `path`, in file order.
pub fn read_dump(path: &Path) -> Result<Vec<SampleRecord>, ReadError> {
    let contents = std::fs::read(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dump(&contents)
}

/// Parse dump contents. Empty lines are ignored.
pub fn parse_dump(contents: &[u8]) -> Result<Vec<SampleRecord>, ReadError> {
    let terminated = contents.ends_with(b"\n");
    let mut lines = contents.split(|&b| b == b'\n').enumerate().peekable();
    let mut records = Vec::new();

    while let Some((idx, line)) = lines.next() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice(line) {
            Ok(record) => records.push(record),
            Err(_) if !terminated && lines.peek().is_none() => {
                tracing::debug!(line = idx + 1, "Ignoring partially written last record");
            }
            Err(source) => {
                return Err(ReadError::Malformed {
                    line: idx + 1,
                    source,
                });
            }
        }
    }

    Ok(records)
}
