// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Display units for byte counters.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Binary (1024-based) unit used to present byte counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    Byte,
    KByte,
    #[default]
    MByte,
    GByte,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Byte => "Byte",
            Unit::KByte => "KByte",
            Unit::MByte => "MByte",
            Unit::GByte => "GByte",
        }
    }

    fn divisor(&self) -> f64 {
        match self {
            Unit::Byte => 1.0,
            Unit::KByte => KIB,
            Unit::MByte => MIB,
            Unit::GByte => GIB,
        }
    }
}

/// Convert a raw byte count into `unit`.
///
/// `GByte` divides by 1024³. Charts produced by the legacy viewer divided
/// gigabytes by 1024² as well, so their GByte values are 1024 times larger
/// than the ones produced here.
pub fn scale(bytes: u64, unit: Unit) -> f64 {
    bytes as f64 / unit.divisor()
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown unit: {0}, expected Byte, KByte, MByte or GByte")]
pub struct ParseUnitError(String);

impl FromStr for Unit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "byte" | "bytes" | "b" => Ok(Unit::Byte),
            "kbyte" | "kbytes" | "kb" | "kib" => Ok(Unit::KByte),
            "mbyte" | "mbytes" | "mb" | "mib" => Ok(Unit::MByte),
            "gbyte" | "gbytes" | "gb" | "gib" => Ok(Unit::GByte),
            _ => Err(ParseUnitError(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for Unit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
