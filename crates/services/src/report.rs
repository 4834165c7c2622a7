//! Progress reports over remote statistics or local progress records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

use storage::LocalProgressSummary;
use translate_core::model::{
    AllStats, FileStats, LastUpdated, OverallStats, ProgressRecord, StatusLabel, UnitTally,
    WorkUnitId,
};

pub const PROJECT_REPORT_TITLE: &str = "Translation Project Report";
pub const LOCAL_REPORT_TITLE: &str = "Translation Completion Status";

/// One line of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub unit_name: String,
    pub file_path: String,
    pub completed: u32,
    pub total: u32,
    pub percent: u8,
    pub status: StatusLabel,
    pub last_updated: LastUpdated,
}

impl ReportRow {
    fn from_stats(stats: &FileStats) -> Self {
        Self {
            unit_name: stats.file_path.file_name().to_owned(),
            file_path: stats.file_path.to_string(),
            completed: stats.completed_entries,
            total: stats.total_entries,
            percent: stats.percent(),
            status: stats.status_label(),
            last_updated: stats.last_updated,
        }
    }

    fn from_record(unit: &WorkUnitId, record: &ProgressRecord) -> Self {
        let status = if record.is_complete() {
            StatusLabel::Complete
        } else if record.completed > 0 {
            StatusLabel::InProgress
        } else {
            StatusLabel::NotStarted
        };
        Self {
            unit_name: unit.file_name().to_owned(),
            file_path: unit.to_string(),
            completed: record.completed,
            total: record.total,
            percent: record.percent(),
            status,
            last_updated: LastUpdated::At(record.last_updated),
        }
    }

    fn progress_cell(&self) -> String {
        format!("{}/{} ({}%)", self.completed, self.total, self.percent)
    }
}

/// Rendered-ready report: a summary plus one row per unit, most complete
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub overall: OverallStats,
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Project report over authoritative remote statistics.
    #[must_use]
    pub fn from_stats(stats: &AllStats, generated_at: DateTime<Utc>) -> Self {
        let mut units: Vec<&FileStats> = stats.per_unit.iter().collect();
        // `sort_by` is stable: ties keep their input order.
        units.sort_by(|a, b| a.cmp_completion_desc(b));
        Self {
            title: PROJECT_REPORT_TITLE.to_owned(),
            generated_at,
            overall: stats.overall.clone(),
            rows: units.into_iter().map(ReportRow::from_stats).collect(),
        }
    }

    /// End-of-session report over this profile's local progress.
    #[must_use]
    pub fn from_local(summary: &LocalProgressSummary, generated_at: DateTime<Utc>) -> Self {
        let mut rows: Vec<ReportRow> = summary
            .records
            .iter()
            .map(|(unit, record)| ReportRow::from_record(unit, record))
            .collect();
        rows.sort_by(|a, b| {
            let lhs = u64::from(b.completed) * u64::from(a.total.max(1));
            let rhs = u64::from(a.completed) * u64::from(b.total.max(1));
            lhs.cmp(&rhs)
        });

        let tallied = OverallStats::tally(summary.records.values().map(|record| UnitTally {
            total: record.total,
            completed: record.completed,
            is_complete: record.is_complete(),
        }));
        let overall = OverallStats {
            overall_progress: summary.overall_percent,
            ..tallied
        };

        Self {
            title: LOCAL_REPORT_TITLE.to_owned(),
            generated_at,
            overall,
            rows,
        }
    }

    /// Plain-text table for terminals.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let o = &self.overall;
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "Generated {}", LastUpdated::At(self.generated_at));
        let _ = writeln!(out, "Overall progress: {}%", o.overall_progress);
        let _ = writeln!(
            out,
            "Files: {} completed out of {} total",
            o.completed_files, o.total_files
        );
        let _ = writeln!(
            out,
            "Sentences: {} completed out of {} total ({} remaining, about {} hour(s))",
            o.completed_entries, o.total_entries, o.remaining_entries, o.estimated_hours
        );

        if self.rows.is_empty() {
            let _ = writeln!(out, "\nNo units yet.");
            return out;
        }

        let progress: Vec<String> = self.rows.iter().map(ReportRow::progress_cell).collect();
        let name_w = self
            .rows
            .iter()
            .map(|r| r.unit_name.chars().count())
            .chain(std::iter::once("File".len()))
            .max()
            .unwrap_or_default();
        let progress_w = progress
            .iter()
            .map(String::len)
            .chain(std::iter::once("Progress".len()))
            .max()
            .unwrap_or_default();
        let status_w = "Not Started".len();

        let _ = writeln!(
            out,
            "\n{:<name_w$}  {:<progress_w$}  {:<status_w$}  Last Updated",
            "File", "Progress", "Status"
        );
        for (row, progress) in self.rows.iter().zip(&progress) {
            let _ = writeln!(
                out,
                "{:<name_w$}  {:<progress_w$}  {:<status_w$}  {}",
                row.unit_name,
                progress,
                row.status.as_str(),
                row.last_updated
            );
        }
        out
    }

    /// HTML fragment. All text is escaped.
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        let o = &self.overall;
        let _ = write!(
            out,
            "<div class=\"report-header\"><h2>{}</h2><p>Generated on {}</p></div>",
            ammonia::clean_text(&self.title),
            LastUpdated::At(self.generated_at)
        );
        let _ = write!(
            out,
            "<div class=\"report-summary\"><h3>Overall Progress: {}%</h3>\
             <p>Files: {} completed out of {} total</p>\
             <p>Sentences: {} completed out of {} total</p>\
             <p>Estimated time remaining: {} hour(s)</p></div>",
            o.overall_progress,
            o.completed_files,
            o.total_files,
            o.completed_entries,
            o.total_entries,
            o.estimated_hours
        );
        out.push_str(
            "<div class=\"report-details\"><h3>File Details</h3><table class=\"report-table\">\
             <thead><tr><th>File</th><th>Progress</th><th>Status</th><th>Last Updated</th></tr></thead><tbody>",
        );
        for row in &self.rows {
            let _ = write!(
                out,
                "<tr><td title=\"{}\">{}</td><td>{}</td><td><span class=\"{}\">{}</span></td><td>{}</td></tr>",
                ammonia::clean_text(&row.file_path),
                ammonia::clean_text(&row.unit_name),
                row.progress_cell(),
                status_class(row.status),
                row.status.as_str(),
                row.last_updated
            );
        }
        out.push_str("</tbody></table></div>");
        out
    }
}

fn status_class(status: StatusLabel) -> &'static str {
    match status {
        StatusLabel::Complete => "status-complete",
        StatusLabel::InProgress => "status-in-progress",
        StatusLabel::NotStarted => "status-not-started",
    }
}
