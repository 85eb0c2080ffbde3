use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Method;
use std::time::Duration;
use url::Url;

use crate::auth::Credentials;
use crate::error::{PiperError, Result};

use super::client::{HttpResponse, JenkinsClient, Transport};
use super::types::{Build, Job, PipelineView};

/// How long a polled pipeline state is trusted before it is polled again.
pub const DEFAULT_MAX_STATE_CACHE: Duration = Duration::from_secs(10);

/// Run-state of a Jenkins pipeline view.
///
/// A pipeline is the ordered list of jobs in a Jenkins view. Its state is the
/// prefix of those jobs whose last builds have been observed, polled job by
/// job through `lastBuild/api/json`.
///
/// The view definition is fetched once and kept for the lifetime of the
/// instance. The state is rebuilt from scratch whenever it is older than
/// `max_state_cache`. Methods that may hit the network are `async`; the
/// caches are mutated through `&mut self`, so sharing an instance across
/// tasks requires wrapping it in a lock.
pub struct JenkinsPipeline<T = JenkinsClient> {
    transport: T,
    jenkins_url: Url,
    pipeline_name: String,
    credentials: Option<Credentials>,
    max_state_cache: Duration,
    pipeline: Option<PipelineView>,
    state: Vec<Build>,
    state_last_updated: DateTime<Utc>,
}

impl<T: Transport> JenkinsPipeline<T> {
    /// Creates a pipeline client for the view `pipeline_name` on `jenkins_url`.
    ///
    /// # Errors
    ///
    /// Returns `PiperError::Config` if `jenkins_url` is not an absolute
    /// http(s)-style URL.
    pub fn new(transport: T, jenkins_url: &str, pipeline_name: impl Into<String>) -> Result<Self> {
        let mut jenkins_url = Url::parse(jenkins_url)
            .map_err(|e| PiperError::Config(format!("Invalid Jenkins URL: {e}")))?;

        if jenkins_url.cannot_be_a_base() {
            return Err(PiperError::Config(format!(
                "Invalid Jenkins URL: {jenkins_url} cannot be used as a base"
            )));
        }

        let trimmed = jenkins_url.path().trim_end_matches('/').to_string();
        jenkins_url.set_path(&trimmed);

        Ok(Self {
            transport,
            jenkins_url,
            pipeline_name: pipeline_name.into(),
            credentials: None,
            max_state_cache: DEFAULT_MAX_STATE_CACHE,
            pipeline: None,
            state: Vec::new(),
            state_last_updated: DateTime::<Utc>::MIN_UTC,
        })
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_max_state_cache(mut self, max_state_cache: Duration) -> Self {
        self.max_state_cache = max_state_cache;
        self
    }

    /// Base URL without a trailing slash
    pub fn jenkins_url(&self) -> &str {
        self.jenkins_url.as_str().trim_end_matches('/')
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    pub fn max_state_cache(&self) -> Duration {
        self.max_state_cache
    }

    /// API URL of the pipeline view, e.g. `https://ci/view/release/api/json`.
    ///
    /// Slashes in the view name are kept as path separators so nested views
    /// (`parent/view/child`) resolve.
    pub fn pipeline_url(&self) -> Url {
        let mut url = self.jenkins_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("view")
                .extend(self.pipeline_name.split('/').filter(|part| !part.is_empty()))
                .extend(["api", "json"]);
        }
        url
    }

    async fn request(&self, method: Method, url: &str) -> Result<HttpResponse> {
        self.transport
            .send(method, url, self.credentials.as_ref())
            .await
    }

    /// Returns the pipeline definition, fetching it on first use.
    ///
    /// A failed fetch leaves nothing cached, so the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns `Transport` on network failure, `UnexpectedStatus` on a
    /// non-2xx answer and `MalformedResponse` if the body is not a view.
    pub async fn fetch_definition(&mut self) -> Result<&PipelineView> {
        let view = match self.pipeline.take() {
            Some(view) => view,
            None => {
                let url = self.pipeline_url();
                debug!("Fetching pipeline definition from {url}");

                let response = self.request(Method::GET, url.as_str()).await?;
                if !response.is_success() {
                    return Err(PiperError::UnexpectedStatus {
                        status: response.status,
                        url: url.to_string(),
                    });
                }

                response.json::<PipelineView>(url.as_str())?
            }
        };

        let view: &PipelineView = self.pipeline.insert(view);
        Ok(view)
    }

    /// Jobs of the pipeline in execution order.
    pub async fn fetch_jobs(&mut self) -> Result<&[Job]> {
        Ok(&self.fetch_definition().await?.jobs)
    }

    /// True when no state is cached or the cached state is older than
    /// `max_state_cache`.
    pub fn is_state_stale(&self) -> bool {
        if self.state.is_empty() {
            return true;
        }

        let age = Utc::now().signed_duration_since(self.state_last_updated);
        match chrono::Duration::from_std(self.max_state_cache) {
            Ok(max_age) => age > max_age,
            Err(_) => false,
        }
    }

    /// Returns the builds observed for the pipeline, polling Jenkins when the
    /// cached state is stale.
    ///
    /// # Errors
    ///
    /// Returns `Transport` or `MalformedResponse` if polling fails. The
    /// previously cached state is kept in that case.
    pub async fn fetch_state(&mut self) -> Result<&[Build]> {
        if self.is_state_stale() {
            let jobs = self.fetch_jobs().await?.to_vec();
            let state = self.poll_state(&jobs).await?;

            debug!(
                "Pipeline {} state refreshed: {}/{} jobs observed",
                self.pipeline_name,
                state.len(),
                jobs.len()
            );

            self.state = state;
            self.state_last_updated = Utc::now();
        } else {
            debug!("Using cached state for pipeline {}", self.pipeline_name);
        }

        Ok(&self.state)
    }

    /// Walks the jobs in order, collecting last builds until a job has none.
    async fn poll_state(&self, jobs: &[Job]) -> Result<Vec<Build>> {
        let mut builds: Vec<Build> = Vec::with_capacity(jobs.len());

        for job in jobs {
            let url = job.last_build_url();
            let response = self.request(Method::GET, &url).await?;

            // Not run yet, or Jenkins cannot tell: later jobs are not inspected
            if !response.is_success() {
                break;
            }

            let last_job_time = builds.last().map_or(0, |build| build.timestamp);
            let build: Build = response.json(&url)?;

            if build.timestamp >= last_job_time {
                builds.push(build);
            } else {
                debug!(
                    "Skipping {}: last build predates the previous step",
                    job.display_name()
                );
            }
        }

        Ok(builds)
    }

    /// The most recent step that ran, in any result.
    pub async fn latest_step(&mut self) -> Result<Option<Build>> {
        Ok(self.fetch_state().await?.last().cloned())
    }

    /// True when every job ran and the last one succeeded.
    pub async fn is_complete(&mut self) -> Result<bool> {
        let (steps, last_succeeded) = {
            let state = self.fetch_state().await?;
            (state.len(), state.last().is_some_and(Build::is_success))
        };
        let job_count = self.fetch_jobs().await?.len();

        Ok(steps == job_count && last_succeeded)
    }

    /// True when the latest step succeeded but the pipeline is not complete,
    /// meaning the next job waits to be started by hand.
    ///
    /// A pipeline where nothing has run is not waiting.
    pub async fn is_waiting_manual_trigger(&mut self) -> Result<bool> {
        if self.is_complete().await? {
            return Ok(false);
        }

        Ok(self
            .latest_step()
            .await?
            .is_some_and(|build| build.is_success()))
    }

    /// The job after the latest observed step, if the pipeline is not complete.
    pub async fn next_step(&mut self) -> Result<Option<Job>> {
        if self.is_complete().await? {
            return Ok(None);
        }

        let steps = self.fetch_state().await?.len();
        Ok(self.fetch_jobs().await?.get(steps).cloned())
    }

    /// Triggers a build of `job`. The response is returned uninterpreted.
    pub async fn build_job(&self, job: &Job) -> Result<HttpResponse> {
        info!("Triggering build of {}", job.display_name());
        self.request(Method::POST, &job.build_url()).await
    }

    /// Starts the pipeline by building its first job.
    ///
    /// # Errors
    ///
    /// Returns `PiperError::EmptyPipeline` if the view has no jobs.
    pub async fn run(&mut self) -> Result<HttpResponse> {
        let first = self.fetch_jobs().await?.first().cloned();
        let Some(first) = first else {
            return Err(PiperError::EmptyPipeline(self.pipeline_name.clone()));
        };

        self.build_job(&first).await
    }

    /// Builds the next job if the pipeline waits on a manual trigger.
    ///
    /// Returns `None` when nothing is waiting.
    pub async fn trigger_manual_step(&mut self) -> Result<Option<HttpResponse>> {
        if !self.is_waiting_manual_trigger().await? {
            debug!("Pipeline {} is not waiting on a manual step", self.pipeline_name);
            return Ok(None);
        }

        match self.next_step().await? {
            Some(job) => Ok(Some(self.build_job(&job).await?)),
            None => Ok(None),
        }
    }
}
