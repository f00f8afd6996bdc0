use serde::{Deserialize, Serialize};

use super::RawKeyword;

/// Lifecycle of a background import job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    #[default]
    Idle,
    Uploading,
    Combining,
    Queued,
    Processing,
    Complete,
    Error,
}

impl ProcessingState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Uploading | Self::Combining | Self::Queued | Self::Processing
        )
    }

    /// States in which the server may attach in-flight preview rows.
    pub fn accepts_preview(&self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileError {
    pub file_name: String,
    pub message: String,
}

/// Response of the processing status endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingStatus {
    pub status: ProcessingState,
    pub progress: f64,
    pub message: Option<String>,
    pub current_file_name: Option<String>,
    pub queued_files: Vec<String>,
    pub queued_jobs: u32,
    pub running_jobs: u32,
    pub succeeded_jobs: u32,
    pub failed_jobs: u32,
    pub file_errors: Vec<FileError>,
    pub uploaded_file_count: u32,
    pub processed_file_count: u32,
    pub uploaded_files: Vec<String>,
    pub processed_files: Vec<String>,
    pub locked: bool,
    pub keywords: Option<Vec<RawKeyword>>,
}

impl ProcessingStatus {
    /// Whether anything on the server is still moving for this project.
    pub fn has_active_signal(&self) -> bool {
        self.status.is_active()
            || !self.queued_files.is_empty()
            || self
                .current_file_name
                .as_deref()
                .is_some_and(|name| !name.is_empty())
            || self.queued_jobs > 0
            || self.running_jobs > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_status() {
        let status: ProcessingStatus =
            serde_json::from_str(r#"{"status": "processing", "progress": 42.5}"#).unwrap();
        assert_eq!(status.status, ProcessingState::Processing);
        assert!(status.has_active_signal());
        assert!(status.keywords.is_none());
    }

    #[test]
    fn test_idle_with_running_jobs_is_active() {
        let status: ProcessingStatus =
            serde_json::from_str(r#"{"status": "idle", "runningJobs": 1}"#).unwrap();
        assert!(!status.status.is_active());
        assert!(status.has_active_signal());
    }

    #[test]
    fn test_empty_current_file_is_not_active() {
        let status: ProcessingStatus =
            serde_json::from_str(r#"{"status": "complete", "currentFileName": ""}"#).unwrap();
        assert!(!status.has_active_signal());
    }
}
