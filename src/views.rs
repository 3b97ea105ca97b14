//! Client-side list views over cached remote data and report logs
//!
//! A view holds the raw list last fetched, the active filter and sort, and
//! derives what is shown from them on demand. Mutations patch the cache
//! optimistically and hand back a [`Rollback`] to undo the patch if the
//! server rejects it.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::error::ClientError;
use crate::filter::{LogFilter, Page, paginate};
use crate::models::{
    Attachment, Priority, ReportLog, StaffMember, Task, TaskStatus, UpdateLogRequest,
};

/// How long an error banner stays up unless dismissed
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Items with a stable identity
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Task {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for StaffMember {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ReportLog {
    fn key(&self) -> &str {
        &self.id
    }
}

pub trait ItemFilter<T> {
    fn matches(&self, item: &T) -> bool;
}

/// A sort column. `compare` receives the direction so keys can keep some
/// values (such as missing dates) at the end either way.
pub trait SortKey<T>: Copy + PartialEq {
    fn compare(&self, a: &T, b: &T, direction: SortDirection) -> Ordering;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Orient an ascending comparison
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// Dismissible error message that hides itself after [`BANNER_TIMEOUT`]
#[derive(Debug, Clone)]
pub struct ErrorBanner {
    pub message: String,
    raised_at: Instant,
}

impl ErrorBanner {
    pub fn new(message: impl Into<String>, now: Instant) -> Self {
        Self {
            message: message.into(),
            raised_at: now,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) < BANNER_TIMEOUT
    }
}

/// Undo record for an optimistic change
#[derive(Debug, Clone)]
pub enum Rollback<T> {
    Patched { previous: T },
    Removed { index: usize, item: T },
}

pub struct ListView<T, F, K> {
    items: Vec<T>,
    state: LoadState,
    filter: F,
    sort: Option<(K, SortDirection)>,
    page: usize,
    page_size: usize,
    banner: Option<ErrorBanner>,
}

impl<T, F, K> ListView<T, F, K>
where
    T: Keyed + Clone,
    F: ItemFilter<T>,
    K: SortKey<T>,
{
    pub fn new(filter: F, page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            state: LoadState::Idle,
            filter,
            sort: None,
            page: 1,
            page_size: page_size.max(1),
            banner: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn begin_loading(&mut self) {
        self.state = LoadState::Loading;
    }

    /// Settle a fetch. A failure keeps the previous cache.
    pub fn finish_loading(&mut self, result: Result<Vec<T>, ClientError>) {
        match result {
            Ok(items) => {
                self.items = items;
                self.state = LoadState::Ready;
                self.clamp_page();
            }
            Err(e) => {
                self.state = LoadState::Error(e.user_message());
            }
        }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Replace the filter and go back to the first page
    pub fn set_filter(&mut self, filter: F) {
        self.filter = filter;
        self.page = 1;
    }

    /// Sort by `key`; choosing the active key again flips the direction
    pub fn sort_by(&mut self, key: K) {
        self.sort = match self.sort {
            Some((active, direction)) if active == key => Some((key, direction.flip())),
            _ => Some((key, SortDirection::Ascending)),
        };
    }

    pub fn sort(&self) -> Option<(K, SortDirection)> {
        self.sort
    }

    /// Filtered then sorted items. The sort is stable, so ties keep the
    /// order of the underlying list.
    pub fn visible(&self) -> Vec<&T> {
        let mut shown: Vec<&T> = self
            .items
            .iter()
            .filter(|item| self.filter.matches(item))
            .collect();

        if let Some((key, direction)) = self.sort {
            shown.sort_by(|a, b| key.compare(a, b, direction));
        }
        shown
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
        self.clamp_page();
    }

    fn clamp_page(&mut self) {
        let pages = self
            .items
            .iter()
            .filter(|item| self.filter.matches(item))
            .count()
            .div_ceil(self.page_size)
            .max(1);
        self.page = self.page.min(pages);
    }

    /// The current page of [`Self::visible`]
    pub fn current_page(&self) -> Page<T> {
        let shown: Vec<T> = self.visible().into_iter().cloned().collect();
        paginate(&shown, self.page, self.page_size)
    }

    /// Apply `change` to the cached item now; `None` if the key is unknown
    pub fn patch(&mut self, key: &str, change: impl FnOnce(&mut T)) -> Option<Rollback<T>> {
        let item = self.items.iter_mut().find(|item| item.key() == key)?;
        let previous = item.clone();
        change(item);
        Some(Rollback::Patched { previous })
    }

    /// Drop the cached item now; `None` if the key is unknown
    pub fn remove(&mut self, key: &str) -> Option<Rollback<T>> {
        let index = self.items.iter().position(|item| item.key() == key)?;
        let item = self.items.remove(index);
        Some(Rollback::Removed { index, item })
    }

    /// Swap in the server's version of an item after a confirmed change
    pub fn replace(&mut self, updated: T) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.key() == updated.key())
        {
            *item = updated;
        }
    }

    /// Undo an optimistic change and raise the error banner
    pub fn rollback(&mut self, undo: Rollback<T>, error: &ClientError, now: Instant) {
        match undo {
            Rollback::Patched { previous } => self.replace(previous),
            Rollback::Removed { index, item } => {
                let index = index.min(self.items.len());
                self.items.insert(index, item);
            }
        }
        self.banner = Some(ErrorBanner::new(error.user_message(), now));
    }

    /// Message to show, if the banner is up and has not timed out
    pub fn banner(&self, now: Instant) -> Option<&str> {
        self.banner
            .as_ref()
            .filter(|b| b.is_visible(now))
            .map(|b| b.message.as_str())
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    /// Matched case-insensitively against title and description
    pub search: Option<String>,
}

impl ItemFilter<Task> for TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| task.status != s) {
            return false;
        }
        if self.priority.is_some_and(|p| task.priority != p) {
            return false;
        }
        if let Some(assignee) = &self.assignee
            && task.assignee.as_deref() != Some(assignee.as_str())
        {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            if !contains_ci(&task.title, &term) && !contains_ci(&task.description, &term) {
                return false;
            }
        }
        true
    }
}

fn status_rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Pending => 0,
        TaskStatus::InProgress => 1,
        TaskStatus::InReview => 2,
        TaskStatus::Completed => 3,
        TaskStatus::Rejected => 4,
        TaskStatus::Unknown => 5,
    }
}

/// Missing values sort after present ones in both directions
fn cmp_missing_last<V: Ord>(a: Option<V>, b: Option<V>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortKey {
    Title,
    DueDate,
    Priority,
    Status,
    CreatedAt,
}

impl SortKey<Task> for TaskSortKey {
    fn compare(&self, a: &Task, b: &Task, direction: SortDirection) -> Ordering {
        let ord = match self {
            TaskSortKey::DueDate => return cmp_missing_last(a.due_date, b.due_date, direction),
            TaskSortKey::CreatedAt => {
                return cmp_missing_last(a.created_at, b.created_at, direction);
            }
            TaskSortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            TaskSortKey::Priority => a.priority.cmp(&b.priority),
            TaskSortKey::Status => status_rank(a.status).cmp(&status_rank(b.status)),
        };
        direction.apply(ord)
    }
}

pub type TaskListView = ListView<Task, TaskFilter, TaskSortKey>;

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Employment {
    Active,
    Inactive,
    Fired,
}

impl Employment {
    pub fn of(member: &StaffMember) -> Self {
        if member.is_fired {
            Employment::Fired
        } else if member.is_active {
            Employment::Active
        } else {
            Employment::Inactive
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaffFilter {
    pub department: Option<String>,
    pub employment: Option<Employment>,
    /// Matched case-insensitively against name, email and staff id
    pub search: Option<String>,
}

impl ItemFilter<StaffMember> for StaffFilter {
    fn matches(&self, member: &StaffMember) -> bool {
        if let Some(department) = &self.department
            && &member.department != department
        {
            return false;
        }
        if self.employment.is_some_and(|e| Employment::of(member) != e) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = [&member.name, &member.email, &member.staff_id]
                .iter()
                .any(|field| contains_ci(field, &term));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffSortKey {
    Name,
    StaffId,
    Department,
    Email,
}

impl SortKey<StaffMember> for StaffSortKey {
    fn compare(&self, a: &StaffMember, b: &StaffMember, direction: SortDirection) -> Ordering {
        let ord = match self {
            StaffSortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            StaffSortKey::StaffId => a.staff_id.cmp(&b.staff_id),
            StaffSortKey::Department => a.department.cmp(&b.department),
            StaffSortKey::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
        };
        direction.apply(ord)
    }
}

pub type StaffListView = ListView<StaffMember, StaffFilter, StaffSortKey>;

// ---------------------------------------------------------------------------
// Report logs
// ---------------------------------------------------------------------------

impl ItemFilter<ReportLog> for LogFilter {
    fn matches(&self, log: &ReportLog) -> bool {
        LogFilter::matches(self, log)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSortKey {
    Date,
    Task,
    Status,
    Department,
    CreatedAt,
}

impl SortKey<ReportLog> for LogSortKey {
    fn compare(&self, a: &ReportLog, b: &ReportLog, direction: SortDirection) -> Ordering {
        let ord = match self {
            LogSortKey::Date => a.date.cmp(&b.date),
            LogSortKey::Task => a.task.to_lowercase().cmp(&b.task.to_lowercase()),
            LogSortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            LogSortKey::Department => a.department.as_str().cmp(b.department.as_str()),
            LogSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        direction.apply(ord)
    }
}

pub type LogListView = ListView<ReportLog, LogFilter, LogSortKey>;

/// Where a saved [`LogEdit`] is applied
pub trait LogEditTarget {
    type Error;

    fn update_log(
        &self,
        id: &str,
        changes: UpdateLogRequest,
    ) -> impl Future<Output = Result<ReportLog, Self::Error>>;

    fn delete_file(&self, file_id: &str) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Pending edit of a report log. Attachments can be marked for removal
/// while editing; nothing is deleted until [`LogEdit::save`].
#[derive(Debug, Clone)]
pub struct LogEdit {
    log_id: String,
    attached: Vec<String>,
    marked: Vec<String>,
    pub changes: UpdateLogRequest,
}

impl LogEdit {
    pub fn new(log: &ReportLog) -> Self {
        Self {
            log_id: log.id.clone(),
            attached: log.files.iter().map(|f| f.id.clone()).collect(),
            marked: Vec::new(),
            changes: UpdateLogRequest::default(),
        }
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    /// Mark an attachment of this log; false if it is not attached or
    /// already marked
    pub fn mark_for_removal(&mut self, file_id: &str) -> bool {
        if !self.attached.iter().any(|id| id == file_id) || self.is_marked(file_id) {
            return false;
        }
        self.marked.push(file_id.to_string());
        true
    }

    pub fn unmark(&mut self, file_id: &str) -> bool {
        let before = self.marked.len();
        self.marked.retain(|id| id != file_id);
        self.marked.len() != before
    }

    pub fn is_marked(&self, file_id: &str) -> bool {
        self.marked.iter().any(|id| id == file_id)
    }

    /// Marked attachment ids, in marking order
    pub fn marked(&self) -> &[String] {
        &self.marked
    }

    /// Attachments of `log` that will survive the save
    pub fn kept_files<'a>(&self, log: &'a ReportLog) -> Vec<&'a Attachment> {
        log.files.iter().filter(|f| !self.is_marked(&f.id)).collect()
    }

    /// Send the field changes, then delete every marked attachment in turn.
    /// Stops at the first failure; deletes already sent are not undone.
    pub async fn save<B: LogEditTarget>(self, target: &B) -> Result<ReportLog, B::Error> {
        let mut log = target.update_log(&self.log_id, self.changes).await?;
        for file_id in &self.marked {
            target.delete_file(file_id).await?;
        }
        log.files.retain(|f| !self.marked.contains(&f.id));
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{CreateLogRequest, Department, IncomingFile, LogStatus};
    use crate::reports::ReportLogService;
    use crate::store::{AttachmentStore, LogStore};
    use chrono::{TimeZone, Utc};

    fn task(id: &str, title: &str, priority: Priority, status: TaskStatus) -> Task {
        Task {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status,
            priority,
            assignee: None,
            due_date: None,
            created_at: None,
        }
    }

    fn loaded_tasks() -> TaskListView {
        let mut view = TaskListView::new(TaskFilter::default(), 2);
        view.begin_loading();
        view.finish_loading(Ok(vec![
            task("1", "Charge batteries", Priority::High, TaskStatus::Pending),
            task("2", "Archive flights", Priority::Low, TaskStatus::Completed),
            task("3", "Calibrate gimbal", Priority::High, TaskStatus::InProgress),
            task("4", "Backup imagery", Priority::Medium, TaskStatus::Pending),
        ]));
        view
    }

    fn ids<T: Keyed>(items: &[&T]) -> Vec<String> {
        items.iter().map(|i| i.key().to_string()).collect()
    }

    #[test]
    fn load_state_transitions() {
        let mut view = TaskListView::new(TaskFilter::default(), 10);
        assert_eq!(view.state(), &LoadState::Idle);

        view.begin_loading();
        assert_eq!(view.state(), &LoadState::Loading);

        view.finish_loading(Err(ClientError::network("offline")));
        assert!(matches!(view.state(), LoadState::Error(_)));

        view.begin_loading();
        view.finish_loading(Ok(Vec::new()));
        assert_eq!(view.state(), &LoadState::Ready);
    }

    #[test]
    fn filters_are_and_combined() {
        let mut view = loaded_tasks();
        view.set_filter(TaskFilter {
            priority: Some(Priority::High),
            status: Some(TaskStatus::Pending),
            ..Default::default()
        });
        assert_eq!(ids(&view.visible()), vec!["1"]);

        view.set_filter(TaskFilter {
            search: Some("CAL".into()),
            ..Default::default()
        });
        assert_eq!(ids(&view.visible()), vec!["3"]);
    }

    #[test]
    fn sort_toggles_and_keeps_ties_in_order() {
        let mut view = loaded_tasks();

        view.sort_by(TaskSortKey::Priority);
        assert_eq!(ids(&view.visible()), vec!["2", "4", "1", "3"]);

        view.sort_by(TaskSortKey::Priority);
        assert_eq!(view.sort(), Some((TaskSortKey::Priority, SortDirection::Descending)));
        assert_eq!(ids(&view.visible()), vec!["1", "3", "4", "2"]);

        view.sort_by(TaskSortKey::Title);
        assert_eq!(ids(&view.visible()), vec!["2", "4", "3", "1"]);
    }

    #[test]
    fn undated_tasks_stay_last_when_descending() {
        let due = |id: &str, day: Option<u32>| Task {
            due_date: day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()),
            ..task(id, id, Priority::Medium, TaskStatus::Pending)
        };
        let mut view = TaskListView::new(TaskFilter::default(), DEFAULT_PAGE_SIZE);
        view.finish_loading(Ok(vec![due("none", None), due("d1", Some(1)), due("d2", Some(2))]));

        view.sort_by(TaskSortKey::DueDate);
        assert_eq!(ids(&view.visible()), vec!["d1", "d2", "none"]);

        view.sort_by(TaskSortKey::DueDate);
        assert_eq!(ids(&view.visible()), vec!["d2", "d1", "none"]);
    }

    #[test]
    fn pages_follow_the_visible_list() {
        let mut view = loaded_tasks();
        view.sort_by(TaskSortKey::Title);
        view.set_page(2);

        let page = view.current_page();
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        let page_ids: Vec<_> = page.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(page_ids, vec!["3", "1"]);

        view.set_page(7);
        assert_eq!(view.current_page().page, 2);

        view.set_filter(TaskFilter {
            priority: Some(Priority::Low),
            ..Default::default()
        });
        assert_eq!(view.current_page().page, 1);
    }

    #[test]
    fn failed_patch_rolls_back_and_shows_banner() {
        let mut view = loaded_tasks();
        let now = Instant::now();

        let undo = view
            .patch("1", |t| t.status = TaskStatus::InReview)
            .unwrap();
        assert_eq!(view.items()[0].status, TaskStatus::InReview);

        view.rollback(undo, &ClientError::from_status(500, "boom"), now);
        assert_eq!(view.items()[0].status, TaskStatus::Pending);
        assert!(view.banner(now).is_some());
        assert!(view.banner(now + BANNER_TIMEOUT).is_none());

        view.dismiss_banner();
        assert!(view.banner(now).is_none());
    }

    #[test]
    fn failed_remove_restores_position() {
        let mut view = loaded_tasks();
        let undo = view.remove("2").unwrap();
        assert_eq!(view.items().len(), 3);

        view.rollback(undo, &ClientError::from_status(404, "Task not found"), Instant::now());
        let order: Vec<_> = view.items().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "3", "4"]);
        assert_eq!(view.banner(Instant::now()), Some("Task not found"));

        assert!(view.remove("missing").is_none());
    }

    #[test]
    fn failed_reload_keeps_cache() {
        let mut view = loaded_tasks();
        view.begin_loading();
        view.finish_loading(Err(ClientError::from_status(503, "down")));
        assert_eq!(view.items().len(), 4);
    }

    #[test]
    fn staff_filter_by_employment_and_search() {
        let member = |id: &str, name: &str, active: bool, fired: bool| StaffMember {
            id: id.into(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            staff_id: format!("S-{}", id),
            department: "GIS".into(),
            is_active: active,
            is_fired: fired,
        };

        let mut view = StaffListView::new(StaffFilter::default(), DEFAULT_PAGE_SIZE);
        view.finish_loading(Ok(vec![
            member("1", "Ana", true, false),
            member("2", "Budi", false, false),
            member("3", "Citra", false, true),
        ]));

        view.set_filter(StaffFilter {
            employment: Some(Employment::Fired),
            ..Default::default()
        });
        assert_eq!(ids(&view.visible()), vec!["3"]);

        view.set_filter(StaffFilter {
            search: Some("s-2".into()),
            ..Default::default()
        });
        assert_eq!(ids(&view.visible()), vec!["2"]);

        view.set_filter(StaffFilter::default());
        view.sort_by(StaffSortKey::Name);
        view.sort_by(StaffSortKey::Name);
        assert_eq!(ids(&view.visible()), vec!["3", "2", "1"]);
    }

    async fn log_with_files(dir: &tempfile::TempDir) -> (ReportLogService, ReportLog) {
        let svc = ReportLogService::new(
            LogStore::new(dir.path().join("logs.json")),
            AttachmentStore::new(dir.path().join("uploads"), "/uploads"),
        );
        let log = svc
            .create(CreateLogRequest {
                task: Some("Survey".into()),
                description: Some("Field survey".into()),
                department: Some("GIS".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let file = |name: &str| IncomingFile {
            file_name: name.into(),
            data: b"data".to_vec(),
        };
        svc.upload_files(Some(&log.id), vec![file("map.png"), file("notes.txt")])
            .await
            .unwrap();
        let log = svc.get(&log.id).await.unwrap();
        (svc, log)
    }

    #[tokio::test]
    async fn marked_files_are_deleted_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, log) = log_with_files(&dir).await;
        let (map, notes) = (log.files[0].id.clone(), log.files[1].id.clone());

        let mut edit = LogEdit::new(&log);
        assert!(edit.mark_for_removal(&map));
        assert!(!edit.mark_for_removal(&map));
        assert!(!edit.mark_for_removal("not-attached"));
        assert_eq!(edit.kept_files(&log).len(), 1);
        edit.changes.remark = Some("Map redone".into());

        let saved = edit.save(&svc).await.unwrap();
        assert_eq!(saved.remark, "Map redone");
        assert_eq!(saved.files.len(), 1);
        assert_eq!(saved.files[0].id, notes);

        let stored = svc.get(&log.id).await.unwrap();
        assert_eq!(stored.files.len(), 1);
        assert!(matches!(
            svc.download_file(&map).await,
            Err(AppError::NotFound(_))
        ));
        assert!(svc.download_file(&notes).await.is_ok());
    }

    #[tokio::test]
    async fn unmarked_files_survive_save() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, log) = log_with_files(&dir).await;
        let map = log.files[0].id.clone();

        let mut edit = LogEdit::new(&log);
        edit.mark_for_removal(&map);
        assert!(edit.unmark(&map));
        assert!(!edit.is_marked(&map));
        assert!(edit.marked().is_empty());

        let saved = edit.save(&svc).await.unwrap();
        assert_eq!(saved.files.len(), 2);
        let (_, data) = svc.download_file(&map).await.unwrap();
        assert_eq!(data, b"data");
    }

    #[tokio::test]
    async fn save_of_missing_log_deletes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, log) = log_with_files(&dir).await;
        let map = log.files[0].id.clone();

        let mut edit = LogEdit::new(&log);
        edit.mark_for_removal(&map);
        svc.delete(&log.id).await.unwrap();

        assert!(matches!(edit.save(&svc).await, Err(AppError::NotFound(_))));
        assert!(dir.path().join("uploads").read_dir().unwrap().count() == 2);
    }

    #[test]
    fn log_view_reuses_server_filter() {
        let log = |id: &str, day: u32, dept: Department| {
            let date = Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap();
            ReportLog {
                id: id.into(),
                date,
                task: "Inspect".into(),
                description: "Check".into(),
                status: LogStatus::Pending,
                department: dept,
                remark: String::new(),
                files: Vec::new(),
                created_at: date,
                updated_at: date,
            }
        };

        let mut view = LogListView::new(LogFilter::default(), DEFAULT_PAGE_SIZE);
        view.finish_loading(Ok(vec![
            log("a", 3, Department::Pilots),
            log("b", 1, Department::Gis),
            log("c", 2, Department::Pilots),
        ]));

        view.set_filter(LogFilter {
            department: Some("Pilots".into()),
            ..Default::default()
        });
        view.sort_by(LogSortKey::Date);
        assert_eq!(ids(&view.visible()), vec!["c", "a"]);
    }
}
