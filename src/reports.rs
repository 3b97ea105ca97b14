//! Report-log operations over the file-backed stores

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::export;
use crate::filter::{LogFilter, parse_timestamp};
use crate::models::{
    Attachment, CreateLogRequest, Department, FileType, IncomingFile, LogStatus, ReportLog,
    UpdateLogRequest,
};
use crate::store::{AttachmentStore, LogStore};
use crate::views::LogEditTarget;

/// Report-log CRUD, attachments and exports
#[derive(Debug, Clone)]
pub struct ReportLogService {
    logs: LogStore,
    files: AttachmentStore,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(raw, false)
        .ok_or_else(|| AppError::Validation(format!("Invalid date: {}", raw)))
}

fn parse_status(raw: &str) -> Result<LogStatus> {
    raw.parse().map_err(AppError::Validation)
}

fn parse_department(raw: &str) -> Result<Department> {
    raw.parse().map_err(AppError::Validation)
}

fn log_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Log not found: {}", id))
}

impl ReportLogService {
    pub fn new(logs: LogStore, files: AttachmentStore) -> Self {
        Self { logs, files }
    }

    /// All logs matching `filter`, most recent first
    pub async fn list(&self, filter: &LogFilter) -> Result<Vec<ReportLog>> {
        Ok(filter.apply(self.logs.load().await?))
    }

    pub async fn get(&self, id: &str) -> Result<ReportLog> {
        self.logs
            .load()
            .await?
            .into_iter()
            .find(|log| log.id == id)
            .ok_or_else(|| log_not_found(id))
    }

    /// Validate and prepend a new log
    pub async fn create(&self, req: CreateLogRequest) -> Result<ReportLog> {
        let (Some(task), Some(description), Some(department)) = (
            required(req.task),
            required(req.description),
            required(req.department),
        ) else {
            return Err(AppError::Validation(
                "Task, description, and department are required".to_string(),
            ));
        };

        let department = parse_department(&department)?;
        let status = req
            .status
            .as_deref()
            .map(parse_status)
            .transpose()?
            .unwrap_or_default();
        let now = Utc::now();
        let date = req.date.as_deref().map(parse_date).transpose()?.unwrap_or(now);

        let log = ReportLog {
            id: Uuid::new_v4().to_string(),
            date,
            task,
            description,
            status,
            department,
            remark: req.remark.unwrap_or_default(),
            files: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut logs = self.logs.load().await?;
        logs.insert(0, log.clone());
        self.logs.save(&logs).await?;

        tracing::info!(log_id = %log.id, department = %log.department, "Report log created");
        Ok(log)
    }

    /// Merge the supplied fields over an existing log
    pub async fn update(&self, id: &str, req: UpdateLogRequest) -> Result<ReportLog> {
        let mut logs = self.logs.load().await?;
        let log = logs
            .iter_mut()
            .find(|log| log.id == id)
            .ok_or_else(|| log_not_found(id))?;

        if let Some(task) = req.task {
            log.task = required(Some(task))
                .ok_or_else(|| AppError::Validation("Task cannot be empty".to_string()))?;
        }
        if let Some(description) = req.description {
            log.description = required(Some(description))
                .ok_or_else(|| AppError::Validation("Description cannot be empty".to_string()))?;
        }
        if let Some(department) = req.department {
            log.department = parse_department(&department)?;
        }
        if let Some(status) = req.status {
            log.status = parse_status(&status)?;
        }
        if let Some(date) = req.date {
            log.date = parse_date(&date)?;
        }
        if let Some(remark) = req.remark {
            log.remark = remark;
        }
        log.touch(Utc::now());

        let updated = log.clone();
        self.logs.save(&logs).await?;

        tracing::info!(log_id = %id, "Report log updated");
        Ok(updated)
    }

    /// Remove a log. Its attachment binaries stay on disk.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut logs = self.logs.load().await?;
        let before = logs.len();
        logs.retain(|log| log.id != id);
        if logs.len() == before {
            return Err(log_not_found(id));
        }

        self.logs.save(&logs).await?;
        tracing::info!(log_id = %id, "Report log deleted");
        Ok(())
    }

    /// Store each file and append it to the log's attachments, in order
    pub async fn upload_files(
        &self,
        log_id: Option<&str>,
        files: Vec<IncomingFile>,
    ) -> Result<Vec<Attachment>> {
        let log_id = log_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("Log ID is required".to_string()))?;
        if files.is_empty() {
            return Err(AppError::Validation("No files provided".to_string()));
        }

        let mut logs = self.logs.load().await?;
        let log = logs
            .iter_mut()
            .find(|log| log.id == log_id)
            .ok_or_else(|| log_not_found(log_id))?;

        let mut created = Vec::with_capacity(files.len());
        for file in files {
            let id = Uuid::new_v4().to_string();
            let stored_name = AttachmentStore::stored_name(&id, &file.file_name);
            if let Err(e) = self.files.write(&stored_name, &file.data).await {
                self.discard(&created).await;
                return Err(e);
            }

            created.push(Attachment {
                file_url: self.files.url_for(&stored_name),
                file_type: FileType::from_file_name(&file.file_name),
                file_size: file.data.len() as u64,
                file_name: file.file_name,
                uploaded_at: Utc::now(),
                id,
            });
        }

        log.files.extend(created.iter().cloned());
        log.touch(Utc::now());
        if let Err(e) = self.logs.save(&logs).await {
            self.discard(&created).await;
            return Err(e);
        }

        tracing::info!(log_id = %log_id, count = created.len(), "Attachments uploaded");
        Ok(created)
    }

    /// Drop the binaries of attachments that never made it into the store
    async fn discard(&self, attachments: &[Attachment]) {
        for attachment in attachments {
            if let Some(stored_name) = AttachmentStore::stored_name_from_url(&attachment.file_url) {
                self.files.remove(stored_name).await;
            }
        }
    }

    /// Remove an attachment wherever it lives. The binary is removed on a
    /// best-effort basis after the metadata is saved.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let mut logs = self.logs.load().await?;

        let mut removed = None;
        for log in logs.iter_mut() {
            if let Some(pos) = log.files.iter().position(|f| f.id == file_id) {
                removed = Some((log.id.clone(), log.files.remove(pos)));
                log.touch(Utc::now());
                break;
            }
        }

        let (log_id, attachment) = removed
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;
        self.logs.save(&logs).await?;

        if let Some(stored_name) = AttachmentStore::stored_name_from_url(&attachment.file_url) {
            self.files.remove(stored_name).await;
        }

        tracing::info!(log_id = %log_id, file_id = %file_id, "Attachment deleted");
        Ok(())
    }

    /// Look up an attachment by its own id and read its binary
    pub async fn download_file(&self, file_id: &str) -> Result<(Attachment, Vec<u8>)> {
        let attachment = self
            .logs
            .load()
            .await?
            .into_iter()
            .flat_map(|log| log.files)
            .find(|f| f.id == file_id)
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;

        let stored_name = AttachmentStore::stored_name_from_url(&attachment.file_url)
            .ok_or_else(|| AppError::Internal(format!("Bad file URL: {}", attachment.file_url)))?;
        let data = self.files.read(stored_name).await?;
        Ok((attachment, data))
    }

    /// Read a stored binary by its storage name
    pub async fn read_upload(&self, stored_name: &str) -> Result<Vec<u8>> {
        self.files.read(stored_name).await
    }

    pub async fn export_csv(&self, filter: &LogFilter) -> Result<String> {
        let logs = self.list(filter).await?;
        Ok(export::render_csv(&logs))
    }

    /// Filtered logs for the client-side PDF renderer
    pub async fn export_pdf_data(&self, filter: &LogFilter) -> Result<Vec<ReportLog>> {
        self.list(filter).await
    }

    pub fn departments() -> Vec<&'static str> {
        Department::ALL.iter().map(Department::as_str).collect()
    }
}

impl LogEditTarget for ReportLogService {
    type Error = AppError;

    async fn update_log(&self, id: &str, changes: UpdateLogRequest) -> Result<ReportLog> {
        self.update(id, changes).await
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        ReportLogService::delete_file(self, file_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, ReportLogService) {
        let dir = tempfile::tempdir().unwrap();
        let svc = ReportLogService::new(
            LogStore::new(dir.path().join("data/logs.json")),
            AttachmentStore::new(dir.path().join("uploads"), "/uploads"),
        );
        (dir, svc)
    }

    fn drone_request() -> CreateLogRequest {
        CreateLogRequest {
            task: Some("Inspect drone".into()),
            description: Some("Pre-flight check".into()),
            department: Some("Pilots".into()),
            ..Default::default()
        }
    }

    fn file(name: &str, body: &[u8]) -> IncomingFile {
        IncomingFile {
            file_name: name.into(),
            data: body.to_vec(),
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_prepends() {
        let (_dir, svc) = service();
        let first = svc.create(drone_request()).await.unwrap();
        let second = svc
            .create(CreateLogRequest {
                task: Some("Process imagery".into()),
                department: Some("GIS".into()),
                ..drone_request()
            })
            .await
            .unwrap();

        assert_eq!(first.status, LogStatus::Pending);
        assert!(first.files.is_empty());

        let logs = svc.list(&LogFilter::default()).await.unwrap();
        assert_eq!(logs[0].id, second.id);
        assert_eq!(logs[1].id, first.id);
    }

    #[tokio::test]
    async fn create_without_required_fields_leaves_store_untouched() {
        let (_dir, svc) = service();
        svc.create(drone_request()).await.unwrap();

        for req in [
            CreateLogRequest { task: None, ..drone_request() },
            CreateLogRequest { description: Some("  ".into()), ..drone_request() },
            CreateLogRequest { department: None, ..drone_request() },
        ] {
            let err = svc.create(req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        assert_eq!(svc.list(&LogFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_unknown_department() {
        let (_dir, svc) = service();
        let err = svc
            .create(CreateLogRequest {
                department: Some("Marketing".into()),
                ..drone_request()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_merges_and_bumps_updated_at() {
        let (_dir, svc) = service();
        let log = svc.create(drone_request()).await.unwrap();

        let updated = svc
            .update(
                &log.id,
                UpdateLogRequest {
                    status: Some("completed".into()),
                    remark: Some("All clear".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, LogStatus::Completed);
        assert_eq!(updated.remark, "All clear");
        assert_eq!(updated.task, log.task);
        assert!(updated.updated_at > log.updated_at);
        assert_eq!(svc.get(&log.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let (_dir, svc) = service();
        let err = svc
            .update("missing", UpdateLogRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let (_dir, svc) = service();
        let a = svc.create(drone_request()).await.unwrap();
        svc.create(drone_request()).await.unwrap();

        svc.delete(&a.id).await.unwrap();
        let logs = svc.list(&LogFilter::default()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs.iter().all(|l| l.id != a.id));

        assert!(matches!(
            svc.delete("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(svc.list(&LogFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_appends_classified_attachments() {
        let (_dir, svc) = service();
        let log = svc.create(drone_request()).await.unwrap();

        let files = svc
            .upload_files(
                Some(&log.id),
                vec![
                    file("report.pdf", b"%PDF"),
                    file("photo.png", b"png"),
                    file("archive.zip", b"zip"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(files[0].file_type, FileType::Document);
        assert_eq!(files[1].file_type, FileType::Image);
        assert_eq!(files[2].file_type, FileType::Archive);
        assert_eq!(files[0].file_size, 4);
        assert!(files[0].file_url.starts_with("/uploads/"));

        let stored = svc.get(&log.id).await.unwrap();
        assert_eq!(stored.files, files);
        assert!(stored.updated_at > log.updated_at);

        let mut ids: Vec<_> = files.iter().map(|f| f.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn upload_validation() {
        let (_dir, svc) = service();
        let log = svc.create(drone_request()).await.unwrap();

        assert!(matches!(
            svc.upload_files(None, vec![file("a.txt", b"a")]).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            svc.upload_files(Some(&log.id), Vec::new()).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            svc.upload_files(Some("missing"), vec![file("a.txt", b"a")]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_upload_leaves_no_orphan_binaries() {
        let (dir, svc) = service();
        let log = svc.create(drone_request()).await.unwrap();

        let result = svc
            .upload_files(
                Some(&log.id),
                vec![file("good.pdf", b"%PDF"), file("bad.p\0f", b"??")],
            )
            .await;
        assert!(result.is_err());

        let leftover = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftover, 0);
        assert!(svc.get(&log.id).await.unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn delete_file_finds_owner_globally() {
        let (_dir, svc) = service();
        let a = svc.create(drone_request()).await.unwrap();
        let b = svc.create(drone_request()).await.unwrap();
        svc.upload_files(Some(&a.id), vec![file("a.txt", b"a")])
            .await
            .unwrap();
        let uploaded = svc
            .upload_files(Some(&b.id), vec![file("b.txt", b"b"), file("c.txt", b"c")])
            .await
            .unwrap();

        let (found, data) = svc.download_file(&uploaded[0].id).await.unwrap();
        assert_eq!(found.file_name, "b.txt");
        assert_eq!(data, b"b");

        svc.delete_file(&uploaded[0].id).await.unwrap();

        let owner = svc.get(&b.id).await.unwrap();
        assert_eq!(owner.files.len(), 1);
        assert_eq!(owner.files[0].id, uploaded[1].id);
        assert_eq!(svc.get(&a.id).await.unwrap().files.len(), 1);

        assert!(matches!(
            svc.download_file(&uploaded[0].id).await,
            Err(AppError::NotFound(_))
        ));
        let stored = AttachmentStore::stored_name_from_url(&uploaded[0].file_url).unwrap();
        assert!(matches!(
            svc.read_upload(stored).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_file(&uploaded[0].id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_file_survives_missing_binary() {
        let (dir, svc) = service();
        let log = svc.create(drone_request()).await.unwrap();
        let uploaded = svc
            .upload_files(Some(&log.id), vec![file("a.txt", b"a")])
            .await
            .unwrap();

        let stored = AttachmentStore::stored_name_from_url(&uploaded[0].file_url).unwrap();
        std::fs::remove_file(dir.path().join("uploads").join(stored)).unwrap();

        svc.delete_file(&uploaded[0].id).await.unwrap();
        assert!(svc.get(&log.id).await.unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn deleting_log_keeps_binaries() {
        let (dir, svc) = service();
        let log = svc.create(drone_request()).await.unwrap();
        let uploaded = svc
            .upload_files(Some(&log.id), vec![file("a.txt", b"a")])
            .await
            .unwrap();

        svc.delete(&log.id).await.unwrap();
        let stored = AttachmentStore::stored_name_from_url(&uploaded[0].file_url).unwrap();
        assert!(dir.path().join("uploads").join(stored).exists());
    }

    #[tokio::test]
    async fn export_uses_same_filter() {
        let (_dir, svc) = service();
        svc.create(drone_request()).await.unwrap();
        svc.create(CreateLogRequest {
            department: Some("GIS".into()),
            ..drone_request()
        })
        .await
        .unwrap();

        let filter = LogFilter {
            department: Some("GIS".into()),
            ..Default::default()
        };
        let csv = svc.export_csv(&filter).await.unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("\"GIS\""));

        let pdf = svc.export_pdf_data(&filter).await.unwrap();
        assert_eq!(pdf.len(), 1);
    }
}
