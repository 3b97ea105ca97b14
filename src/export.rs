//! CSV rendering for the report-log export

use chrono::{DateTime, Utc};

use crate::models::ReportLog;

const HEADER: [&str; 7] = [
    "Date",
    "Department",
    "Task",
    "Description",
    "Status",
    "Remark",
    "Files Count",
];

/// Wrap in double quotes, doubling any embedded quote
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn row<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| quote(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render logs as a 7-column CSV document, every field quoted
pub fn render_csv(logs: &[ReportLog]) -> String {
    let mut out = row(HEADER);
    out.push('\n');

    for log in logs {
        let fields = [
            log.date.format("%Y-%m-%d").to_string(),
            log.department.as_str().to_string(),
            log.task.clone(),
            log.description.clone(),
            log.status.as_str().to_string(),
            log.remark.clone(),
            log.files.len().to_string(),
        ];
        out.push_str(&row(fields));
        out.push('\n');
    }

    out
}

/// Download name, stamped with the export date
pub fn csv_filename(now: DateTime<Utc>) -> String {
    format!("report-logs-{}.csv", now.format("%Y-%m-%d"))
}
