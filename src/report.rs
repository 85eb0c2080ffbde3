use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::providers::jenkins::{Build, BuildResult, Job, JenkinsPipeline, Transport};

/// Snapshot of a pipeline's run-state for display or export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub server: String,
    pub pipeline: String,
    pub collected_at: DateTime<Utc>,
    pub total_jobs: usize,
    pub complete: bool,
    pub waiting_manual_trigger: bool,
    pub next_step: Option<String>,
    pub steps: Vec<StepReport>,
}

/// One job of the pipeline and the last build observed for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub job: String,
    pub url: String,
    pub build_number: Option<u64>,
    pub result: Option<BuildResult>,
    pub building: bool,
    pub started_at: Option<DateTime<Utc>>,
}

impl StepReport {
    fn new(job: &Job, build: Option<&Build>) -> Self {
        Self {
            job: job.display_name().to_string(),
            url: job.url.clone(),
            build_number: build.and_then(|b| b.number),
            result: build.and_then(|b| b.result),
            building: build.is_some_and(|b| b.building),
            started_at: build.and_then(Build::started_at),
        }
    }

    /// True when a build was observed for this step
    pub fn has_run(&self) -> bool {
        self.started_at.is_some() || self.build_number.is_some()
    }
}

/// Finds the observed build of `job`.
///
/// Builds are matched by URL since skipped steps leave gaps in the state;
/// builds without a URL fall back to their position.
fn build_for<'a>(job: &Job, index: usize, state: &'a [Build]) -> Option<&'a Build> {
    state
        .iter()
        .find(|build| build.url.as_deref().is_some_and(|url| url.starts_with(&job.url)))
        .or_else(|| state.get(index).filter(|build| build.url.is_none()))
}

impl PipelineReport {
    /// Polls `pipeline` once and summarizes its state.
    ///
    /// Steps are listed for every job; jobs past the observed prefix carry no
    /// build data.
    pub async fn collect<T: Transport>(pipeline: &mut JenkinsPipeline<T>) -> Result<Self> {
        let jobs = pipeline.fetch_jobs().await?.to_vec();
        let state = pipeline.fetch_state().await?.to_vec();

        let complete = pipeline.is_complete().await?;
        let waiting_manual_trigger = pipeline.is_waiting_manual_trigger().await?;
        let next_step = pipeline
            .next_step()
            .await?
            .map(|job| job.display_name().to_string());

        let steps = jobs
            .iter()
            .enumerate()
            .map(|(index, job)| StepReport::new(job, build_for(job, index, &state)))
            .collect();

        Ok(Self {
            server: pipeline.jenkins_url().to_string(),
            pipeline: pipeline.pipeline_name().to_string(),
            collected_at: Utc::now(),
            total_jobs: jobs.len(),
            complete,
            waiting_manual_trigger,
            next_step,
            steps,
        })
    }

    /// Number of steps with an observed build
    pub fn steps_run(&self) -> usize {
        self.steps.iter().filter(|step| step.has_run()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::jenkins::fake::FakeTransport;
    use serde_json::json;

    const VIEW_URL: &str = "http://ci/view/release/api/json";

    fn transport_with_builds(builds: &[(&str, i64, &str)], jobs: &[&str]) -> FakeTransport {
        let transport = FakeTransport::new();
        let job_list: Vec<_> = jobs
            .iter()
            .map(|name| json!({"name": name, "url": format!("http://ci/job/{name}/")}))
            .collect();
        transport.respond_json(VIEW_URL, json!({"jobs": job_list}));

        for (name, timestamp, result) in builds {
            transport.respond_json(
                &format!("http://ci/job/{name}/lastBuild/api/json"),
                json!({
                    "number": 4,
                    "url": format!("http://ci/job/{name}/4/"),
                    "timestamp": timestamp,
                    "result": result
                }),
            );
        }
        transport
    }

    #[tokio::test]
    async fn test_report_waiting_pipeline() {
        let transport = transport_with_builds(
            &[("build", 1_000, "SUCCESS"), ("test", 2_000, "SUCCESS")],
            &["build", "test", "deploy"],
        );
        let mut pipeline = JenkinsPipeline::new(transport, "http://ci/", "release").unwrap();

        let report = PipelineReport::collect(&mut pipeline).await.unwrap();

        assert_eq!(report.server, "http://ci");
        assert_eq!(report.pipeline, "release");
        assert_eq!(report.total_jobs, 3);
        assert_eq!(report.steps_run(), 2);
        assert!(!report.complete);
        assert!(report.waiting_manual_trigger);
        assert_eq!(report.next_step.as_deref(), Some("deploy"));
        assert_eq!(report.steps[0].result, Some(BuildResult::Success));
        assert_eq!(report.steps[2].result, None);
    }

    #[tokio::test]
    async fn test_report_matches_builds_by_url() {
        let transport = transport_with_builds(
            &[
                ("build", 5_000, "SUCCESS"),
                ("test", 1_000, "SUCCESS"),
                ("deploy", 6_000, "FAILURE"),
            ],
            &["build", "test", "deploy"],
        );
        let mut pipeline = JenkinsPipeline::new(transport, "http://ci", "release").unwrap();

        let report = PipelineReport::collect(&mut pipeline).await.unwrap();

        assert_eq!(report.steps_run(), 2);
        assert!(!report.steps[1].has_run());
        assert_eq!(report.steps[2].result, Some(BuildResult::Failure));
        assert!(!report.waiting_manual_trigger);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let transport = transport_with_builds(&[("build", 1_000, "SUCCESS")], &["build"]);
        let mut pipeline = JenkinsPipeline::new(transport, "http://ci", "release").unwrap();

        let report = PipelineReport::collect(&mut pipeline).await.unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["complete"], json!(true));
        assert_eq!(value["steps"][0]["result"], json!("SUCCESS"));
        assert_eq!(value["next_step"], json!(null));
    }
}
