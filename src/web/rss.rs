//! RSS 2.0 feed of recent check results.

use crate::config::MonitorTarget;
use crate::db::MonitorRecord;

use std::fmt::Write;

const FEED_LINK: &str = "http://localhost";

/// Render `records` (newest first) as an RSS document.
pub fn render_feed(records: &[MonitorRecord], monitors: &[MonitorTarget]) -> String {
    let mut out = String::with_capacity(256 + records.len() * 384);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<rss version=\"2.0\">\n<channel>\n");
    let _ = writeln!(out, "  <title>Status Feed</title>");
    let _ = writeln!(out, "  <link>{}</link>", FEED_LINK);
    let _ = writeln!(out, "  <description>Status updates for all monitors</description>");

    for record in records {
        let status_text = if record.is_up { "UP" } else { "DOWN" };
        let link = monitors
            .iter()
            .find(|m| m.name == record.monitor_name)
            .map(|m| m.url.as_str())
            .unwrap_or("N/A");

        let status_code = record
            .status_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let response_time = record
            .response_time
            .map(|t| format!("{:.0}ms", t * 1000.0))
            .unwrap_or_else(|| "N/A".to_string());
        let description = format!(
            "Status: {}<br/>Status Code: {}<br/>Response Time: {}",
            status_text, status_code, response_time
        );

        out.push_str("  <item>\n");
        let _ = writeln!(
            out,
            "    <guid isPermaLink=\"false\">{}-{}</guid>",
            escape(&record.monitor_name),
            record.timestamp.to_rfc3339()
        );
        let _ = writeln!(
            out,
            "    <title>{}: {}</title>",
            escape(&record.monitor_name),
            status_text
        );
        let _ = writeln!(out, "    <link>{}</link>", escape(link));
        let _ = writeln!(out, "    <description>{}</description>", escape(&description));
        let _ = writeln!(out, "    <pubDate>{}</pubDate>", record.timestamp.to_rfc2822());
        out.push_str("  </item>\n");
    }

    out.push_str("</channel>\n</rss>\n");
    out
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
