// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Lightweight in-process memory sampler.
//!
//! A process embeds the collector to periodically capture its own memory
//! statistics (allocator heap counters plus OS resident/virtual size) and
//! append them as JSON Lines to a per-run dump file. The companion viewer
//! locates the most recent dump in a directory and serves a time-series chart.
//!
//! ## Architecture
//!
//! 1. **Sampler** (`sampler`, `procfs`) - reads jemalloc statistics and
//!    `/proc/self/status` into a [`SampleRecord`].
//! 2. **Recorder** (`recorder`) - durably appends one record per line.
//! 3. **Collector** (`collector`) - drives sampler and recorder on a timer,
//!    dropping ticks that fire while a write is still in flight.
//! 4. **Viewer** (`locate`, `reader`, `units`, `viewer`) - selects the newest
//!    dump, parses it, scales the values and renders the chart over HTTP.
//!
//! ## Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), dd_memsampler::SetupError> {
//! let config = dd_memsampler::CollectorConfig::default().with_service_name("my-service");
//! let handle = dd_memsampler::start(config)?;
//! tracing::info!(path = %handle.path().display(), "memory sampling enabled");
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod locate;
pub mod naming;
pub mod procfs;
pub mod reader;
pub mod record;
pub mod recorder;
pub mod sampler;
pub mod units;
pub mod viewer;

pub use collector::{start, Collector, CollectorHandle, CollectorStats, SetupError};
pub use config::{CollectorConfig, ConfigError};
pub use locate::{find_latest, scan_dumps, DumpFile, LocateError};
pub use naming::{DumpName, DumpPattern};
pub use reader::{parse_dump, read_dump, ReadError};
pub use record::SampleRecord;
pub use recorder::{RecordError, RecordSink, Recorder};
pub use sampler::{ProcessSampler, Sampler};
pub use units::{scale, Unit};
