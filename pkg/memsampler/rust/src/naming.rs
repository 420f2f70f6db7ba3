// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Dump file naming: `<prefix><pid>_<YYYYMMDDHHMMSS><suffix>`.
//!
//! One file per process run. The name alone identifies the run, so the
//! viewer never has to open a file to decide which one is newest.

use chrono::NaiveDateTime;

/// Suffix of every dump file
pub const DUMP_SUFFIX: &str = ".dat";

/// strftime layout of the run-start timestamp embedded in the name
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const RUN_TIMESTAMP_LEN: usize = 14;

/// Fixed prefix and suffix surrounding `<pid>_<timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpPattern {
    prefix: String,
    suffix: String,
}

/// Identity of a run recovered from a dump file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpName {
    pub pid: u32,
    /// Run start, local wall-clock time
    pub started: NaiveDateTime,
}

impl DumpPattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Pattern used by a collector configured with `service_name`.
    pub fn for_service(service_name: &str) -> Self {
        Self::new(format!("{service_name}_"), DUMP_SUFFIX)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn file_name(&self, pid: u32, started: NaiveDateTime) -> String {
        format!(
            "{}{}_{}{}",
            self.prefix,
            pid,
            started.format(RUN_TIMESTAMP_FORMAT),
            self.suffix
        )
    }

    /// Parse a file name produced by [`Self::file_name`].
    ///
    /// Returns `None` for anything else: wrong prefix or suffix, a middle
    /// part that is not exactly `<pid>_<timestamp>`, a non-numeric pid, or a
    /// timestamp that is not 14 digits describing a real calendar instant.
    pub fn parse(&self, name: &str) -> Option<DumpName> {
        let pid_time = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;

        let mut parts = pid_time.split('_');
        let (Some(pid), Some(stamp), None) = (parts.next(), parts.next(), parts.next()) else {
            return None;
        };

        if pid.is_empty() || !pid.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let pid = pid.parse().ok()?;

        if stamp.len() != RUN_TIMESTAMP_LEN || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let started = NaiveDateTime::parse_from_str(stamp, RUN_TIMESTAMP_FORMAT).ok()?;

        Some(DumpName { pid, started })
    }
}
