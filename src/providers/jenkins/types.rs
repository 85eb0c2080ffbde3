use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A Jenkins view describing a pipeline.
///
/// Jobs appear in execution order. Fields this crate does not interpret are
/// kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineView {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Missing `jobs` degrades to an empty pipeline
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job URL as reported by Jenkins, normally with a trailing slash
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Jenkins ball color (e.g., "blue", "red", "notbuilt")
    #[serde(default)]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            color: None,
            extra: Map::new(),
        }
    }

    /// API URL of this job's most recent build.
    pub fn last_build_url(&self) -> String {
        format!("{}lastBuild/api/json", self.url)
    }

    /// URL that triggers a new build of this job.
    pub fn build_url(&self) -> String {
        format!("{}build", self.url)
    }

    /// Name to show users, falling back to the URL.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// Terminal result of a Jenkins build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    #[serde(other)]
    Other,
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unstable => "UNSTABLE",
            Self::Aborted => "ABORTED",
            Self::NotBuilt => "NOT_BUILT",
            Self::Other => "OTHER",
        };
        f.write_str(label)
    }
}

/// Last-build record of a job, as returned by `lastBuild/api/json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// Build start time in epoch milliseconds
    pub timestamp: i64,
    /// `None` while the build is still running
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub building: bool,
    /// Build duration in milliseconds
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub full_display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Build {
    pub fn is_success(&self) -> bool {
        self.result == Some(BuildResult::Success)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}
