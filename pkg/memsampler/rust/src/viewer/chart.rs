// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Line chart of a dump: one series per byte counter against local time.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;

use crate::record::SampleRecord;
use crate::units::{scale, Unit};

/// strftime layout of the x-axis labels
pub const LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ECHARTS_URL: &str = "https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js";

/// A named sequence of scaled values, one per record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: &'static str,
    pub data: Vec<f64>,
}

/// Chart data ready for rendering or JSON export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub unit: Unit,
    /// X-axis labels, capture instants in local time
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl Chart {
    pub fn from_records(records: &[SampleRecord], unit: Unit) -> Self {
        let labels = records.iter().map(|r| format_local(r.timestamp)).collect();

        let mut series: Vec<Series> = SampleRecord::FIELD_NAMES
            .iter()
            .map(|&name| Series {
                name,
                data: Vec::with_capacity(records.len()),
            })
            .collect();
        for record in records {
            for (series, (_, bytes)) in series.iter_mut().zip(record.field_values()) {
                series.data.push(scale(bytes, unit));
            }
        }

        Self {
            unit,
            labels,
            series,
        }
    }

    pub fn series(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    /// ECharts option object describing this chart.
    pub fn echarts_option(&self) -> serde_json::Value {
        let names: Vec<&str> = self.series.iter().map(|s| s.name).collect();
        let series: Vec<serde_json::Value> = self
            .series
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "type": "line",
                    "smooth": true,
                    "showSymbol": false,
                    "data": s.data,
                })
            })
            .collect();

        json!({
            "title": { "text": format!("unit: {}", self.unit) },
            "tooltip": { "trigger": "axis" },
            "legend": { "data": names, "top": 30 },
            "grid": { "top": 80, "left": 60, "right": 40 },
            "xAxis": { "type": "category", "boundaryGap": false, "data": self.labels },
            "yAxis": { "type": "value", "name": self.unit.as_str() },
            "dataZoom": [{ "type": "inside" }, { "type": "slider" }],
            "series": series,
        })
    }
}

/// Render a standalone HTML page drawing `chart` with ECharts.
pub fn render_page(chart: &Chart, title: &str) -> String {
    // `<` never appears raw inside the script block, so data cannot close it.
    let option = chart.echarts_option().to_string().replace('<', "\\u003c");
    let title = escape_html(title);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{ECHARTS_URL}"></script>
<style>html, body {{ margin: 0; height: 100%; }} #chart {{ width: 100%; height: 100%; min-height: 500px; }}</style>
</head>
<body>
<div id="chart"></div>
<script>
const chart = echarts.init(document.getElementById("chart"));
chart.setOption({option});
window.addEventListener("resize", () => chart.resize());
</script>
</body>
</html>
"#
    )
}

fn format_local(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(utc) => utc.with_timezone(&Local).format(LABEL_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
