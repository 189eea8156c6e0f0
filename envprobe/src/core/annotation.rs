//! Append-only annotation log and the final report it is flushed into.

use serde::Serialize;

use crate::core::diff::EnvChange;

/// One tagged text block of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationEntry {
    pub tag: String,
    pub body: String,
}

impl AnnotationEntry {
    fn render(&self) -> String {
        format!("{}:\n{}\n", self.tag, self.body)
    }
}

/// Ordered collection of annotations.
///
/// Entries can only be appended; the sink is consumed by [`AnnotationSink::flush`],
/// so a run is flushed at most once.
#[derive(Debug, Default)]
pub struct AnnotationSink {
    entries: Vec<AnnotationEntry>,
}

impl AnnotationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tag: &str, body: impl Into<String>) {
        self.entries.push(AnnotationEntry {
            tag: tag.to_string(),
            body: body.into(),
        });
    }

    /// Record one entry whose body is the given lines joined by newlines.
    pub fn record_lines<I, S>(&mut self, tag: &str, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let body = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.record(tag, body);
    }

    pub fn entries(&self) -> &[AnnotationEntry] {
        &self.entries
    }

    /// Close the log into a report. The report always signals failure.
    pub fn flush(self, aux_diff: Option<Vec<EnvChange>>) -> Report {
        Report {
            status: ReportStatus::Failed,
            entries: self.entries,
            aux_diff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Failed,
}

/// The single deliverable of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub status: ReportStatus,
    pub entries: Vec<AnnotationEntry>,
    /// Environment changes since run start; `None` when suppressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux_diff: Option<Vec<EnvChange>>,
}

impl Report {
    pub fn is_failure(&self) -> bool {
        self.status == ReportStatus::Failed
    }

    pub fn render_text(&self) -> String {
        let mut out: String = self.entries.iter().map(AnnotationEntry::render).collect();
        if let Some(changes) = &self.aux_diff {
            out.push_str("Environment changes during run:\n");
            if changes.is_empty() {
                out.push_str("(none)\n");
            }
            for change in changes {
                out.push_str(&change.render());
                out.push('\n');
            }
        }
        out
    }
}
