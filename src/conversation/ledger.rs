//! In-memory task and file ledgers.
//!
//! Both ledgers are flat, insertion-ordered collections. Entries are only
//! created by fulfilled pending actions; removal of an unknown id is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion state of a task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    /// The opposite status.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task.
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            status: TaskStatus::Pending,
            description: None,
            created_at,
        }
    }
}

/// Kind of simulated document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Doc,
    #[default]
    Txt,
}

impl FileType {
    /// File name extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Txt => "txt",
        }
    }

    /// Parse a lower-case wire name.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" | "docx" => Some(Self::Doc),
            "txt" | "text" => Some(Self::Txt),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedFile {
    pub id: String,
    /// `document_<unix-millis>.<ext>`.
    pub name: String,
    pub file_type: FileType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CreatedFile {
    /// Create a file whose name is derived from the creation time.
    pub fn new(file_type: FileType, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: format!(
                "document_{}.{}",
                created_at.timestamp_millis(),
                file_type.extension()
            ),
            file_type,
            content: content.into(),
            created_at,
        }
    }
}

/// Insertion-ordered task collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskLedger {
    tasks: Vec<Task>,
}

impl TaskLedger {
    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Flip a task's status, returning the new status. Unknown ids are ignored.
    pub fn toggle(&mut self, id: &str) -> Option<TaskStatus> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.status = task.status.flipped();
        Some(task.status)
    }

    /// Remove a task. Returns `false` (and changes nothing) for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Insertion-ordered file collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileLedger {
    files: Vec<CreatedFile>,
}

impl FileLedger {
    pub fn push(&mut self, file: CreatedFile) {
        self.files.push(file);
    }

    /// Remove a file. Returns `false` (and changes nothing) for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.id != id);
        self.files.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&CreatedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CreatedFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
