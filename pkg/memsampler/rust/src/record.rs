// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! The sample record persisted once per collector tick.

use serde::{Deserialize, Serialize};

/// One observation of the process memory state at one instant.
///
/// Serialized as a single JSON object per dump line. All byte counters are
/// absolute values, not deltas. Older dumps used concatenated lower-case keys
/// (`heapsys`, `heapalloc`, ...); those are accepted on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Capture instant, Unix seconds
    pub timestamp: i64,
    /// Total bytes obtained from the OS by the allocator, metadata included
    pub sys: u64,
    /// Heap bytes obtained from the OS
    #[serde(alias = "heapsys")]
    pub heap_sys: u64,
    /// Bytes of live heap allocations
    #[serde(alias = "heapalloc")]
    pub heap_alloc: u64,
    /// Bytes in in-use heap pages
    #[serde(alias = "heapinuse")]
    pub heap_inuse: u64,
    /// Heap bytes returned to the OS
    #[serde(alias = "heapreleased")]
    pub heap_released: u64,
    /// Bytes in idle heap pages
    #[serde(alias = "heapidle")]
    pub heap_idle: u64,
    /// Process virtual memory size
    pub vms: u64,
    /// Process resident set size
    pub rss: u64,
}

impl SampleRecord {
    /// Names of the byte counters, in chart series order.
    pub const FIELD_NAMES: [&'static str; 8] = [
        "sys",
        "heap_sys",
        "heap_alloc",
        "heap_inuse",
        "heap_released",
        "heap_idle",
        "vms",
        "rss",
    ];

    /// Byte counters paired with their names, in [`Self::FIELD_NAMES`] order.
    pub fn field_values(&self) -> [(&'static str, u64); 8] {
        [
            ("sys", self.sys),
            ("heap_sys", self.heap_sys),
            ("heap_alloc", self.heap_alloc),
            ("heap_inuse", self.heap_inuse),
            ("heap_released", self.heap_released),
            ("heap_idle", self.heap_idle),
            ("vms", self.vms),
            ("rss", self.rss),
        ]
    }
}
