//! Rendering and delivery of the flushed report.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::core::annotation::Report;
use crate::io::config::ReportFormat;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    #[serde(flatten)]
    report: &'a Report,
}

/// Render the report in the requested format (trailing newline included).
pub fn render_report(report: &Report, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(report.render_text()),
        ReportFormat::Json => {
            let payload = JsonReport {
                generated_at: Utc::now().to_rfc3339(),
                report,
            };
            let mut buf = serde_json::to_string_pretty(&payload).context("serialize report")?;
            buf.push('\n');
            Ok(buf)
        }
    }
}

/// Print the rendered report to `out` and optionally persist it to `path`.
pub fn deliver_report<W: Write>(rendered: &str, out: &mut W, path: Option<&Path>) -> Result<()> {
    out.write_all(rendered.as_bytes()).context("write report")?;
    out.flush().context("flush report")?;
    if let Some(path) = path {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create report dir {}", parent.display()))?;
        }
        fs::write(path, rendered).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}
