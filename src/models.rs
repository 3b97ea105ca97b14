//! Report-log data models and mirrors of the remote API entities
//!
//! Field names are camelCase on the wire to match the dashboard client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Progress state of a report log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Pending => "pending",
            LogStatus::InProgress => "in-progress",
            LogStatus::Completed => "completed",
            LogStatus::Failed => "failed",
        }
    }
}

impl FromStr for LogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LogStatus::Pending),
            "in-progress" => Ok(LogStatus::InProgress),
            "completed" => Ok(LogStatus::Completed),
            "failed" => Ok(LogStatus::Failed),
            other => Err(format!("Invalid status '{}'", other)),
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Department a report log belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    Pilots,
    #[serde(rename = "GIS")]
    Gis,
    Engineering,
    Operations,
    #[serde(rename = "Data Processing")]
    DataProcessing,
    #[serde(rename = "Quality Assurance")]
    QualityAssurance,
    Administration,
}

impl Department {
    pub const ALL: [Department; 7] = [
        Department::Pilots,
        Department::Gis,
        Department::Engineering,
        Department::Operations,
        Department::DataProcessing,
        Department::QualityAssurance,
        Department::Administration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Pilots => "Pilots",
            Department::Gis => "GIS",
            Department::Engineering => "Engineering",
            Department::Operations => "Operations",
            Department::DataProcessing => "Data Processing",
            Department::QualityAssurance => "Quality Assurance",
            Department::Administration => "Administration",
        }
    }
}

impl FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Invalid department '{}'", s))
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse attachment category derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Spreadsheet,
    Presentation,
    Image,
    Archive,
    Other,
}

impl FileType {
    /// Classify a client-supplied file name by its extension
    pub fn from_file_name(name: &str) -> Self {
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return FileType::Other,
        };

        match ext.as_str() {
            "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" | "md" => FileType::Document,
            "xls" | "xlsx" | "csv" | "ods" => FileType::Spreadsheet,
            "ppt" | "pptx" | "odp" | "key" => FileType::Presentation,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "tif" | "tiff" => {
                FileType::Image
            }
            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => FileType::Archive,
            _ => FileType::Other,
        }
    }
}

/// A file attached to a report log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: FileType,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// A dated record of departmental activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLog {
    pub id: String,
    pub date: DateTime<Utc>,
    pub task: String,
    pub description: String,
    #[serde(default)]
    pub status: LogStatus,
    pub department: Department,
    #[serde(default)]
    pub remark: String,
    /// Display order is insertion order
    #[serde(default)]
    pub files: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportLog {
    /// Refresh `updated_at`, never letting it stand still or go backwards
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self.updated_at + chrono::Duration::milliseconds(1);
        self.updated_at = now.max(floor);
    }
}

/// Body of `POST /reports/logs`
///
/// Everything is optional here so missing fields surface as a 400 with our
/// own message instead of an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    pub task: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub remark: Option<String>,
}

/// Body of `PATCH /reports/logs/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLogRequest {
    pub task: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub remark: Option<String>,
}

/// A file received in an upload request, before it is stored
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Response of `POST /reports/logs/files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub files: Vec<Attachment>,
}

/// Response of `GET /reports/logs/export/pdf`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfExportResponse {
    pub logs: Vec<ReportLog>,
}

// ---------------------------------------------------------------------------
// Remote API mirrors. The remote backend owns these; we only cache them.
// ---------------------------------------------------------------------------

/// Priority level for tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Workflow state of a remote task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    /// Submitted by staff, waiting for an admin
    InReview,
    Completed,
    Rejected,
    #[serde(other)]
    Unknown,
}

/// A task as returned by the remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields an update call may change on a remote task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

/// A staff record as returned by the remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub staff_id: String,
    #[serde(default)]
    pub department: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_fired: bool,
}

fn default_active() -> bool {
    true
}

/// Fields an update call may change on a remote staff record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_fired: Option<bool>,
}
