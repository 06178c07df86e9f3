//! HTML listing served at `GET /` and by the `ListMetrics` RPC.

use crate::types::{Metric, MetricKind};
use std::fmt::Write;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_html(metrics: &[Metric]) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html><head><title>metrics</title></head><body>\n");
    for (kind, title) in [(MetricKind::Gauge, "gauges"), (MetricKind::Counter, "counters")] {
        let _ = write!(html, "<h3>{title}</h3>\n<ul>\n");
        for m in metrics.iter().filter(|m| m.kind == kind) {
            let _ = writeln!(html, "<li>{}: {}</li>", escape(&m.id), m.format_value());
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</body></html>\n");
    html
}
