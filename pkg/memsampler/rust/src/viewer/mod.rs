// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Chart viewer for dump files.
//!
//! - `chart` - chart model built from records, and HTML page rendering
//! - `server` - HTTP server serving the chart of the latest dump

pub mod chart;
pub mod server;

pub use chart::{render_page, Chart, Series};
pub use server::{router, run_server, AppState, ViewerConfig, ViewerError};
