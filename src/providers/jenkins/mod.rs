mod client;
#[cfg(test)]
pub(crate) mod fake;
mod pipeline;
mod types;

pub use client::{HttpResponse, JenkinsClient, Transport};
pub use pipeline::{JenkinsPipeline, DEFAULT_MAX_STATE_CACHE};
pub use types::{Build, BuildResult, Job, PipelineView};
