// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Memory sampling for the calling process.
//!
//! Heap counters come from jemalloc's statistics. They describe the heap of
//! the whole process only when jemalloc is the global allocator, which the
//! viewer binary arranges through `tikv_jemallocator`; embedding applications
//! should do the same.

use chrono::Utc;
use tikv_jemalloc_ctl::{epoch, epoch_mib, stats};

use crate::procfs::{self, ProcessMemory};
use crate::record::SampleRecord;

/// Source of sample records, invoked once per collector tick.
pub trait Sampler: Send + 'static {
    fn sample(&mut self) -> SampleRecord;
}

impl<F> Sampler for F
where
    F: FnMut() -> SampleRecord + Send + 'static,
{
    fn sample(&mut self) -> SampleRecord {
        self()
    }
}

/// Allocator heap counters, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub sys: u64,
    pub heap_sys: u64,
    pub heap_alloc: u64,
    pub heap_inuse: u64,
    pub heap_released: u64,
    pub heap_idle: u64,
}

impl HeapStats {
    /// Derive the record counters from raw jemalloc statistics.
    ///
    /// `retained` pages were handed back to the OS but keep their address
    /// space, so they count toward `heap_sys` and `heap_released` the same way
    /// released spans do in a garbage-collected runtime.
    pub fn from_jemalloc(
        allocated: u64,
        active: u64,
        mapped: u64,
        retained: u64,
        metadata: u64,
    ) -> Self {
        let heap_sys = mapped.saturating_add(retained);
        Self {
            sys: heap_sys.saturating_add(metadata),
            heap_sys,
            heap_alloc: allocated,
            heap_inuse: active,
            heap_released: retained,
            heap_idle: heap_sys.saturating_sub(active),
        }
    }
}

/// Cached jemalloc MIBs, resolved once.
struct JemallocStats {
    epoch: epoch_mib,
    allocated: stats::allocated_mib,
    active: stats::active_mib,
    mapped: stats::mapped_mib,
    retained: stats::retained_mib,
    metadata: stats::metadata_mib,
}

impl JemallocStats {
    fn new() -> Result<Self, tikv_jemalloc_ctl::Error> {
        Ok(Self {
            epoch: epoch::mib()?,
            allocated: stats::allocated::mib()?,
            active: stats::active::mib()?,
            mapped: stats::mapped::mib()?,
            retained: stats::retained::mib()?,
            metadata: stats::metadata::mib()?,
        })
    }

    fn read(&self) -> Result<HeapStats, tikv_jemalloc_ctl::Error> {
        // Statistics are cached by jemalloc until the epoch advances.
        self.epoch.advance()?;

        Ok(HeapStats::from_jemalloc(
            self.allocated.read()? as u64,
            self.active.read()? as u64,
            self.mapped.read()? as u64,
            self.retained.read()? as u64,
            self.metadata.read()? as u64,
        ))
    }
}

/// Samples the current process: jemalloc heap plus `/proc/self/status`.
///
/// Probe failures never abort a sample. The affected counters are reported
/// as zero and the first failure of each probe is logged.
pub struct ProcessSampler {
    heap: Option<JemallocStats>,
    heap_warned: bool,
    os_warned: bool,
}

impl ProcessSampler {
    pub fn new() -> Self {
        let heap = match JemallocStats::new() {
            Ok(heap) => Some(heap),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "jemalloc statistics unavailable, heap counters will be zero"
                );
                None
            }
        };
        Self {
            heap,
            heap_warned: false,
            os_warned: false,
        }
    }

    fn heap_stats(&mut self) -> HeapStats {
        let Some(heap) = &self.heap else {
            return HeapStats::default();
        };
        match heap.read() {
            Ok(stats) => stats,
            Err(e) => {
                if !self.heap_warned {
                    tracing::warn!(error = %e, "Failed to read jemalloc statistics");
                    self.heap_warned = true;
                }
                HeapStats::default()
            }
        }
    }

    fn os_memory(&mut self) -> ProcessMemory {
        match procfs::self_memory() {
            Ok(mem) => mem,
            Err(e) => {
                if !self.os_warned {
                    tracing::warn!(
                        error = %e,
                        "Failed to read process memory, vms/rss will be zero"
                    );
                    self.os_warned = true;
                }
                ProcessMemory::default()
            }
        }
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for ProcessSampler {
    fn sample(&mut self) -> SampleRecord {
        let heap = self.heap_stats();
        let os = self.os_memory();

        SampleRecord {
            timestamp: Utc::now().timestamp(),
            sys: heap.sys,
            heap_sys: heap.heap_sys,
            heap_alloc: heap.heap_alloc,
            heap_inuse: heap.heap_inuse,
            heap_released: heap.heap_released,
            heap_idle: heap.heap_idle,
            vms: os.vms,
            rss: os.rss,
        }
    }
}
