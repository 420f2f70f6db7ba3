// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Timer-driven sampling loop.
//!
//! The collector fires on deadlines `start + k * interval`, sampling and
//! appending each record on tokio's blocking pool, one tick at a time. Deadlines that pass
//! while a write is still in flight are dropped rather than queued, so a slow
//! disk can delay the loop but never makes it accumulate work.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{CollectorConfig, ConfigError};
use crate::naming::DumpPattern;
use crate::record::SampleRecord;
use crate::recorder::{RecordError, RecordSink, Recorder};
use crate::sampler::{ProcessSampler, Sampler};

/// Errors preventing the collector from starting.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid collector configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create dump directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    CreateFile(#[from] RecordError),

    #[error("the collector must be started from within a tokio runtime")]
    NoRuntime,
}

/// Counters describing the collector's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Records durably appended
    pub samples_written: u64,
    /// Appends that failed; their samples were dropped
    pub write_failures: u64,
    /// Ticks dropped because a write was still in flight
    pub ticks_skipped: u64,
}

#[derive(Debug, Default)]
struct SharedStats {
    samples_written: AtomicU64,
    write_failures: AtomicU64,
    ticks_skipped: AtomicU64,
}

impl SharedStats {
    fn snapshot(&self) -> CollectorStats {
        CollectorStats {
            samples_written: self.samples_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running collector.
///
/// Dropping the handle does not stop the loop; it runs for as long as the
/// runtime that spawned it.
#[derive(Debug)]
pub struct CollectorHandle {
    path: Option<PathBuf>,
    stats: Arc<SharedStats>,
    task: JoinHandle<()>,
}

impl CollectorHandle {
    /// Dump file written by this collector.
    ///
    /// Collectors built around a custom sink without a backing file report
    /// an empty path.
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    pub fn stats(&self) -> CollectorStats {
        self.stats.snapshot()
    }

    /// False once the loop has died: an append panicked or the schedule ran
    /// past the range of the clock.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Start sampling the current process into a new dump file.
///
/// Creates `config.dir` if needed and the file
/// `<service>_<pid>_<YYYYMMDDHHMMSS>.dat` inside it, then spawns the sampling
/// loop on the current tokio runtime. The first sample is taken one interval
/// after this call returns.
pub fn start(config: CollectorConfig) -> Result<CollectorHandle, SetupError> {
    config.validate()?;

    if tokio::runtime::Handle::try_current().is_err() {
        return Err(SetupError::NoRuntime);
    }

    std::fs::create_dir_all(&config.dir).map_err(|source| SetupError::CreateDir {
        path: config.dir.clone(),
        source,
    })?;

    let pattern = DumpPattern::for_service(&config.service_name);
    let file_name = pattern.file_name(std::process::id(), Local::now().naive_local());
    let recorder = Recorder::create(config.dir.join(file_name))?;

    tracing::info!(
        path = %recorder.path().display(),
        interval = ?config.interval,
        "Starting memory sampler"
    );

    Ok(Collector::new(ProcessSampler::new(), recorder, config.interval).spawn())
}

/// A sampler and a sink driven on a fixed interval.
pub struct Collector<S, K> {
    pipeline: Pipeline<S, K>,
    interval: Duration,
    stats: Arc<SharedStats>,
}

/// The blocking half of a tick, moved onto the blocking pool as a unit.
struct Pipeline<S, K> {
    sampler: S,
    sink: K,
    last_timestamp: Option<i64>,
}

impl<S: Sampler, K: RecordSink> Pipeline<S, K> {
    fn tick(&mut self) -> Result<(), RecordError> {
        let record = self.next_record();
        self.sink.append(&record)
    }

    /// Sample, keeping timestamps non-decreasing if the wall clock steps back.
    fn next_record(&mut self) -> SampleRecord {
        let mut record = self.sampler.sample();
        if let Some(last) = self.last_timestamp
            && record.timestamp < last
        {
            record.timestamp = last;
        }
        self.last_timestamp = Some(record.timestamp);
        record
    }
}

impl<S: Sampler, K: RecordSink> Collector<S, K> {
    pub fn new(sampler: S, sink: K, interval: Duration) -> Self {
        Self {
            pipeline: Pipeline {
                sampler,
                sink,
                last_timestamp: None,
            },
            interval,
            stats: Arc::new(SharedStats::default()),
        }
    }

    pub fn stats(&self) -> CollectorStats {
        self.stats.snapshot()
    }

    /// Take one sample and append it synchronously.
    ///
    /// A failed append drops the sample; the next tick proceeds normally.
    pub fn tick(&mut self) -> Result<(), RecordError> {
        let result = self.pipeline.tick();
        self.account(&result);
        result
    }

    /// Run the loop on the current tokio runtime.
    ///
    /// Panics if called outside a runtime; [`start`] checks for one first.
    pub fn spawn(self) -> CollectorHandle {
        let path = self.pipeline.sink.location().map(Path::to_path_buf);
        let stats = self.stats.clone();
        let task = tokio::spawn(self.run());
        CollectorHandle { path, stats, task }
    }

    async fn run(mut self) {
        let Some(mut deadline) = Instant::now().checked_add(self.interval) else {
            tracing::error!(
                interval = ?self.interval,
                "Sampling interval out of clock range, memory sampling stopped"
            );
            return;
        };

        loop {
            tokio::time::sleep_until(deadline).await;

            // Sampling reads procfs and allocator stats, so it runs off the
            // async workers together with the append.
            let mut pipeline = self.pipeline;
            let outcome = tokio::task::spawn_blocking(move || {
                let result = pipeline.tick();
                (pipeline, result)
            })
            .await;

            let (pipeline, result) = match outcome {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!(error = %e, "Dump writer panicked, memory sampling stopped");
                    return;
                }
            };
            self.pipeline = pipeline;
            self.account(&result);

            let Some((next, missed)) = next_deadline(deadline, Instant::now(), self.interval) else {
                tracing::error!(
                    interval = ?self.interval,
                    "Next sampling deadline out of clock range, memory sampling stopped"
                );
                return;
            };
            if missed > 0 {
                self.stats
                    .ticks_skipped
                    .fetch_add(u64::from(missed), Ordering::Relaxed);
                tracing::debug!(missed, "Dump write outlasted the interval, skipping ticks");
            }
            deadline = next;
        }
    }

    fn account(&self, result: &Result<(), RecordError>) {
        match result {
            Ok(()) => {
                self.stats.samples_written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    error = %e,
                    path = ?self.pipeline.sink.location(),
                    "Failed to append memory sample"
                );
            }
        }
    }
}

/// First deadline after `deadline` that has not already passed at `now`,
/// with the count of deadlines dropped to reach it. `None` when the
/// schedule runs past the range of the clock.
fn next_deadline(deadline: Instant, now: Instant, interval: Duration) -> Option<(Instant, u32)> {
    let next = deadline.checked_add(interval)?;
    if now <= next {
        return Some((next, 0));
    }
    let missed = ticks_missed(now - next, interval);
    let next = next.checked_add(interval.checked_mul(missed)?)?;
    Some((next, missed))
}

/// Number of deadlines that fell strictly inside a write that finished
/// `behind` after the next scheduled deadline.
fn ticks_missed(behind: Duration, interval: Duration) -> u32 {
    let missed = behind.as_nanos().div_ceil(interval.as_nanos());
    u32::try_from(missed).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Sink keeping records in memory, optionally slow or failing.
    #[derive(Clone, Default)]
    struct MemorySink {
        records: Arc<Mutex<Vec<SampleRecord>>>,
        delay: Duration,
        fail_first: Arc<AtomicU64>,
    }

    impl RecordSink for MemorySink {
        fn append(&mut self, record: &SampleRecord) -> Result<(), RecordError> {
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            let remaining = self.fail_first.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_first.store(remaining - 1, Ordering::SeqCst);
                return Err(RecordError::Write(std::io::Error::other("disk full")));
            }
            self.records.lock().unwrap().push(*record);
            Ok(())
        }
    }

    fn counting_sampler() -> impl Sampler {
        let mut n = 0;
        move || {
            n += 1;
            SampleRecord {
                timestamp: 1_700_000_000 + n,
                rss: n as u64,
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_ticks_missed() {
        let i = Duration::from_millis(100);
        assert_eq!(ticks_missed(Duration::from_nanos(1), i), 1);
        assert_eq!(ticks_missed(Duration::from_millis(100), i), 1);
        assert_eq!(ticks_missed(Duration::from_millis(101), i), 2);
        assert_eq!(ticks_missed(Duration::from_millis(250), i), 3);
    }

    #[tokio::test]
    async fn test_next_deadline() {
        let i = Duration::from_secs(10);
        let d = Instant::now();

        assert_eq!(next_deadline(d, d + Duration::from_secs(3), i), Some((d + i, 0)));
        assert_eq!(next_deadline(d, d + i, i), Some((d + i, 0)));
        // Write finished at 25s: deadlines at 10s and 20s are dropped.
        assert_eq!(
            next_deadline(d, d + Duration::from_secs(25), i),
            Some((d + i * 3, 2))
        );
        assert_eq!(next_deadline(d, d, Duration::MAX), None);
    }

    #[test]
    fn test_tick_appends_one_record() {
        let sink = MemorySink::default();
        let records = sink.records.clone();
        let mut collector = Collector::new(counting_sampler(), sink, Duration::from_secs(1));

        for _ in 0..3 {
            collector.tick().unwrap();
        }

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().map(|r| r.rss).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(collector.stats().samples_written, 3);
    }

    #[test]
    fn test_tick_failure_is_counted_and_dropped() {
        let sink = MemorySink {
            fail_first: Arc::new(AtomicU64::new(1)),
            ..Default::default()
        };
        let records = sink.records.clone();
        let mut collector = Collector::new(counting_sampler(), sink, Duration::from_secs(1));

        assert!(collector.tick().is_err());
        collector.tick().unwrap();

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rss, 2, "failed sample is not retried");
        assert_eq!(
            collector.stats(),
            CollectorStats {
                samples_written: 1,
                write_failures: 1,
                ticks_skipped: 0,
            }
        );
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut stamps = vec![100, 90, 120, 110].into_iter();
        let sampler = move || SampleRecord {
            timestamp: stamps.next().unwrap_or(0),
            ..Default::default()
        };
        let sink = MemorySink::default();
        let records = sink.records.clone();
        let mut collector = Collector::new(sampler, sink, Duration::from_secs(1));
        for _ in 0..4 {
            collector.tick().unwrap();
        }

        let stamps: Vec<i64> = records.lock().unwrap().iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![100, 100, 120, 120]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_writes_one_line_per_tick() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("svc_1_20240101120000.dat");
        let recorder = Recorder::create(&path).unwrap();
        let interval = Duration::from_secs(10);

        let handle = Collector::new(counting_sampler(), recorder, interval).spawn();
        assert_eq!(handle.path(), path.as_path());

        // Ticks fire at 10s, 20s and 30s.
        tokio::time::sleep(interval * 3 + interval / 2).await;

        let records = crate::reader::read_dump(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().map(|r| r.rss).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(handle.stats().samples_written, 3);
        assert!(handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_write_failures() {
        let sink = MemorySink {
            fail_first: Arc::new(AtomicU64::new(2)),
            ..Default::default()
        };
        let records = sink.records.clone();
        let interval = Duration::from_secs(5);

        let handle = Collector::new(counting_sampler(), sink, interval).spawn();
        tokio::time::sleep(interval * 4 + interval / 2).await;

        assert!(handle.is_running());
        assert_eq!(handle.stats().write_failures, 2);
        assert_eq!(handle.stats().samples_written, 2);
        let rss: Vec<u64> = records.lock().unwrap().iter().map(|r| r.rss).collect();
        assert_eq!(rss, vec![3, 4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_writes_skip_ticks_instead_of_queueing() {
        let sink = MemorySink {
            delay: Duration::from_millis(70),
            ..Default::default()
        };
        let records = sink.records.clone();
        let interval = Duration::from_millis(20);

        let handle = Collector::new(counting_sampler(), sink, interval).spawn();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let stats = handle.stats();
        let written = records.lock().unwrap().len() as u64;
        assert!(stats.ticks_skipped > 0, "expected skipped ticks: {stats:?}");
        // Each write takes 70ms, so at most ~7 can complete in 500ms even
        // though 25 deadlines elapsed.
        assert!(written <= 8, "writes were queued: {written}");
        assert!(written >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_interval_ends_loop_without_panic() {
        let sink = MemorySink::default();
        let records = sink.records.clone();

        let handle = Collector::new(counting_sampler(), sink, Duration::MAX).spawn();
        let result = handle.task.await;

        assert!(result.is_ok(), "loop panicked: {result:?}");
        assert!(records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_rejects_interval_beyond_maximum() {
        let tmp = TempDir::new().unwrap();
        let config = CollectorConfig::default()
            .with_dir(tmp.path())
            .with_interval(Duration::from_secs(u64::MAX));
        assert!(matches!(
            start(config),
            Err(SetupError::Config(ConfigError::IntervalTooLarge(_)))
        ));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_start_requires_runtime() {
        let tmp = TempDir::new().unwrap();
        let config = CollectorConfig::default().with_dir(tmp.path());
        assert!(matches!(start(config), Err(SetupError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let tmp = TempDir::new().unwrap();
        let config = CollectorConfig::default()
            .with_dir(tmp.path())
            .with_interval(Duration::ZERO);
        assert!(matches!(
            start(config),
            Err(SetupError::Config(ConfigError::ZeroInterval))
        ));
    }

    #[tokio::test]
    async fn test_start_fails_when_dir_cannot_be_created() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        let config = CollectorConfig::default().with_dir(blocker.join("dumps"));
        assert!(matches!(start(config), Err(SetupError::CreateDir { .. })));
    }

    #[tokio::test]
    async fn test_start_creates_named_dump_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("dumps");
        let config = CollectorConfig::default()
            .with_dir(&dir)
            .with_service_name("svc");

        let handle = start(config).unwrap();

        assert!(handle.path().exists());
        assert_eq!(handle.path().parent(), Some(dir.as_path()));
        let name = handle.path().file_name().unwrap().to_str().unwrap();
        let parsed = DumpPattern::for_service("svc").parse(name).unwrap();
        assert_eq!(parsed.pid, std::process::id());
        assert_eq!(std::fs::metadata(handle.path()).unwrap().len(), 0);
    }
}
