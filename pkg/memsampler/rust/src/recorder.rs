// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Durable, append-only JSON Lines writer for sample records.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::record::SampleRecord;

/// Destination of sample records.
pub trait RecordSink: Send + 'static {
    /// Append one record. Previously appended records are never touched.
    fn append(&mut self, record: &SampleRecord) -> Result<(), RecordError>;

    /// File backing this sink, if any.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Recorder errors
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("failed to create dump file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize sample: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to append to dump file: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to sync dump file: {0}")]
    Sync(#[source] std::io::Error),
}

/// Writes one JSON object per line and syncs the file after every record.
///
/// Once `append` returns `Ok`, the record survives a crash of the process.
/// A crash in the middle of `append` can leave a truncated last line, which
/// the dump reader tolerates.
#[derive(Debug)]
pub struct Recorder {
    path: PathBuf,
    file: File,
}

impl Recorder {
    /// Create a new dump file. Fails if `path` already exists.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let path = path.into();
        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| RecordError::Create {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Created dump file");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for Recorder {
    fn append(&mut self, record: &SampleRecord) -> Result<(), RecordError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        self.file.write_all(&line).map_err(RecordError::Write)?;
        self.file.sync_all().map_err(RecordError::Sync)
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
