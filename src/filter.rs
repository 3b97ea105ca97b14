//! Report-log filtering and the shared pagination helper

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ReportLog;

/// Raw filter parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub department: Option<String>,
    pub search: Option<String>,
}

/// Parsed filter; every populated field must match (AND-combined)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub department: Option<String>,
    /// Stored lowercased
    pub search: Option<String>,
}

/// Empty values and the "all" sentinel from select boxes mean "no filter"
fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "all")
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
///
/// Bare dates resolve to midnight UTC, or to the last millisecond of the day
/// when `end_of_day` is set so that end bounds stay inclusive.
pub fn parse_timestamp(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?
    } else {
        NaiveTime::MIN
    };
    Some(date.and_time(time).and_utc())
}

impl LogQuery {
    /// Validate the raw parameters into a filter
    pub fn parse(&self) -> Result<LogFilter, AppError> {
        let bound = |raw: &Option<String>, end: bool, label: &str| {
            present(raw)
                .map(|v| {
                    parse_timestamp(v, end)
                        .ok_or_else(|| AppError::Validation(format!("Invalid {}: {}", label, v)))
                })
                .transpose()
        };

        Ok(LogFilter {
            start: bound(&self.start_date, false, "startDate")?,
            end: bound(&self.end_date, true, "endDate")?,
            status: present(&self.status).map(str::to_string),
            department: present(&self.department).map(str::to_string),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase),
        })
    }
}

impl LogFilter {
    pub fn with_search(mut self, term: &str) -> Self {
        self.search = Some(term.to_lowercase());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == LogFilter::default()
    }

    pub fn matches(&self, log: &ReportLog) -> bool {
        if let Some(start) = self.start
            && log.date < start
        {
            return false;
        }
        if let Some(end) = self.end
            && log.date > end
        {
            return false;
        }
        if let Some(status) = &self.status
            && log.status.as_str() != status
        {
            return false;
        }
        if let Some(department) = &self.department
            && log.department.as_str() != department
        {
            return false;
        }
        if let Some(term) = &self.search {
            let hit = [&log.task, &log.description, &log.remark]
                .iter()
                .any(|field| field.to_lowercase().contains(term.as_str()));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Keep matching logs, preserving order
    pub fn apply(&self, logs: Vec<ReportLog>) -> Vec<ReportLog> {
        logs.into_iter().filter(|log| self.matches(log)).collect()
    }
}

/// One page of a larger list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice `items` into 1-indexed pages of `limit` entries.
///
/// Page numbers below 1 are treated as 1; a zero limit is treated as 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, limit: usize) -> Page<T> {
    let limit = limit.max(1);
    let page = page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(limit);
    let start = (page - 1).saturating_mul(limit).min(total);
    let end = (start + limit).min(total);

    Page {
        items: items[start..end].to_vec(),
        page,
        limit,
        total,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Department, LogStatus};

    fn log(id: &str, date: &str, status: LogStatus, dept: Department, task: &str) -> ReportLog {
        let date = parse_timestamp(date, false).unwrap();
        ReportLog {
            id: id.into(),
            date,
            task: task.into(),
            description: format!("{} description", task),
            status,
            department: dept,
            remark: String::new(),
            files: Vec::new(),
            created_at: date,
            updated_at: date,
        }
    }

    fn sample() -> Vec<ReportLog> {
        vec![
            log("1", "2024-03-01", LogStatus::Pending, Department::Pilots, "Inspect drone"),
            log("2", "2024-03-05T10:00:00Z", LogStatus::Completed, Department::Gis, "Map tiles"),
            log("3", "2024-03-10", LogStatus::Failed, Department::Pilots, "Battery swap"),
            log("4", "2024-03-15", LogStatus::InProgress, Department::Engineering, "Motor REPAIR"),
        ]
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = LogQuery::default().parse().unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(sample()).len(), 4);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let query = LogQuery {
            start_date: Some("2024-03-05".into()),
            end_date: Some("2024-03-10".into()),
            ..Default::default()
        };
        let ids: Vec<_> = query
            .parse()
            .unwrap()
            .apply(sample())
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn predicates_are_and_combined() {
        let query = LogQuery {
            department: Some("Pilots".into()),
            status: Some("failed".into()),
            ..Default::default()
        };
        let result = query.parse().unwrap().apply(sample());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "3");
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let filter = LogFilter::default().with_search("repair");
        let result = filter.apply(sample());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "4");

        let mut logs = sample();
        logs[0].remark = "Propeller CRACKED".into();
        let filter = LogFilter::default().with_search("cracked");
        assert_eq!(filter.apply(logs).len(), 1);
    }

    #[test]
    fn filtered_result_is_subset_satisfying_every_predicate() {
        let all = sample();
        let query = LogQuery {
            start_date: Some("2024-03-01".into()),
            department: Some("Pilots".into()),
            search: Some("a".into()),
            ..Default::default()
        };
        let filter = query.parse().unwrap();
        let result = filter.apply(all.clone());
        assert!(result.iter().all(|l| all.contains(l)));
        assert!(result.iter().all(|l| filter.matches(l)));
    }

    #[test]
    fn blank_and_all_values_are_ignored() {
        let query = LogQuery {
            status: Some("all".into()),
            department: Some("  ".into()),
            ..Default::default()
        };
        assert!(query.parse().unwrap().is_empty());
    }

    #[test]
    fn invalid_date_is_a_validation_error() {
        let query = LogQuery {
            start_date: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(matches!(query.parse(), Err(AppError::Validation(_))));
    }

    #[test]
    fn paginate_slices_pages() {
        let items: Vec<u32> = (1..=7).collect();
        let page = paginate(&items, 2, 3);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total_pages, 3);

        let last = paginate(&items, 3, 3);
        assert_eq!(last.items, vec![7]);

        let beyond = paginate(&items, 9, 3);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 7);
    }
}
