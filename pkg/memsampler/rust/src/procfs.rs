// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! OS-reported memory of the calling process.

use std::io;

/// Virtual and resident size of a process, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessMemory {
    pub vms: u64,
    pub rss: u64,
}

/// Read the memory footprint of the current process.
#[cfg(target_os = "linux")]
pub fn self_memory() -> io::Result<ProcessMemory> {
    let status = std::fs::read_to_string("/proc/self/status")?;
    parse_status(&status).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "VmSize/VmRSS missing from /proc/self/status",
        )
    })
}

#[cfg(not(target_os = "linux"))]
pub fn self_memory() -> io::Result<ProcessMemory> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process memory probe is only implemented for Linux",
    ))
}

/// Extract `VmSize` and `VmRSS` from the contents of `/proc/<pid>/status`.
///
/// Both lines are reported in kB by the kernel. Returns `None` if either is
/// missing or malformed.
pub fn parse_status(contents: &str) -> Option<ProcessMemory> {
    let mut vms = None;
    let mut rss = None;

    for line in contents.lines() {
        if let Some(value) = line.strip_prefix("VmSize:") {
            vms = parse_kb(value);
        } else if let Some(value) = line.strip_prefix("VmRSS:") {
            rss = parse_kb(value);
        }
        if vms.is_some() && rss.is_some() {
            break;
        }
    }

    Some(ProcessMemory {
        vms: vms?,
        rss: rss?,
    })
}

fn parse_kb(value: &str) -> Option<u64> {
    let mut fields = value.split_whitespace();
    let amount: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") => amount.checked_mul(1024),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "Name:\tcat
Umask:\t0022
State:\tR (running)
Pid:\t1234
VmPeak:\t    8480 kB
VmSize:\t    8480 kB
VmLck:\t       0 kB
VmHWM:\t    1012 kB
VmRSS:\t    1012 kB
RssAnon:\t      88 kB
Threads:\t1
";

    #[test]
    fn test_parse_status() {
        let mem = parse_status(STATUS).unwrap();
        assert_eq!(mem.vms, 8480 * 1024);
        assert_eq!(mem.rss, 1012 * 1024);
    }

    #[test]
    fn test_parse_status_missing_rss() {
        // Kernel threads have no VmRSS line.
        let status = "Name:\tkthreadd\nVmSize:\t 0 kB\n";
        assert_eq!(parse_status(status), None);
    }

    #[test]
    fn test_parse_status_bad_unit() {
        let status = "VmSize:\t 10 MB\nVmRSS:\t 5 kB\n";
        assert_eq!(parse_status(status), None);
    }

    #[test]
    fn test_parse_status_not_a_number() {
        let status = "VmSize:\t ten kB\nVmRSS:\t 5 kB\n";
        assert_eq!(parse_status(status), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_self_memory_reports_resident_pages() {
        let mem = self_memory().unwrap();
        assert!(mem.rss > 0);
        assert!(mem.vms >= mem.rss);
    }
}
