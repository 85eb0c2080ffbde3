use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

use piper::config::{Config, OutputFormat};
use piper::providers::jenkins::{HttpResponse, JenkinsClient, JenkinsPipeline};
use piper::report::PipelineReport;

use crate::output::{self, Spinner};

#[derive(Parser)]
#[command(name = "piper")]
#[command(author, version, about = "Jenkins pipeline state and triggers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./piper.toml and friends)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Jenkins base URL
    #[arg(short, long, global = true, env = "JENKINS_URL")]
    url: Option<String>,

    /// Jenkins view holding the pipeline
    #[arg(short = 'P', long, global = true)]
    pipeline: Option<String>,

    #[arg(long, global = true, env = "JENKINS_USER")]
    username: Option<String>,

    /// Password or API token
    #[arg(long, global = true, env = "JENKINS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds a polled state is reused
    #[arg(long, global = true)]
    state_cache_seconds: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true)]
    timeout_seconds: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which steps of the pipeline have run
    Status {
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        #[arg(short, long, default_value_t = false)]
        pretty: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Start the pipeline by building its first job
    Run,
    /// Build the next job if the pipeline waits on a manual trigger
    Trigger,
}

impl Cli {
    /// Merges command-line overrides into the loaded configuration
    fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        let jenkins = &mut config.jenkins;

        if let Some(url) = &self.url {
            jenkins.url = Some(url.clone());
        }
        if let Some(pipeline) = &self.pipeline {
            jenkins.pipeline = Some(pipeline.clone());
        }
        if let Some(username) = &self.username {
            jenkins.username = Some(username.clone());
        }
        if let Some(token) = &self.token {
            jenkins.token = Some(token.clone());
        }
        if let Some(seconds) = self.state_cache_seconds {
            jenkins.state_cache_seconds = seconds;
        }
        if let Some(seconds) = self.timeout_seconds {
            jenkins.timeout_seconds = seconds;
        }

        Ok(config)
    }

    fn build_pipeline(config: &Config) -> Result<JenkinsPipeline> {
        let jenkins = &config.jenkins;

        let Some(url) = jenkins.url.as_deref() else {
            bail!("No Jenkins URL given; pass --url, set JENKINS_URL or add it to piper.toml");
        };
        let Some(pipeline_name) = jenkins.pipeline.as_deref() else {
            bail!("No pipeline given; pass --pipeline or add it to piper.toml");
        };

        let client = JenkinsClient::new(Some(jenkins.timeout()))?;
        let pipeline = JenkinsPipeline::new(client, url, pipeline_name)?
            .with_credentials(jenkins.credentials())
            .with_max_state_cache(jenkins.max_state_cache());

        Ok(pipeline)
    }

    async fn execute_status(
        config: &Config,
        pipeline: &mut JenkinsPipeline,
        format: Option<OutputFormat>,
        pretty: bool,
        output_path: Option<&PathBuf>,
    ) -> Result<()> {
        info!("Collecting state for pipeline: {}", pipeline.pipeline_name());

        let spinner = Spinner::start("Polling pipeline state");
        let report = match PipelineReport::collect(pipeline).await {
            Ok(report) => {
                spinner.finish("Polled pipeline state");
                report
            }
            Err(e) => {
                spinner.fail("Polling failed");
                return Err(e.into());
            }
        };

        if report.total_jobs == 0 {
            warn!("Pipeline {} has no jobs", report.pipeline);
        }

        let rendered = match format.unwrap_or(config.output.format) {
            OutputFormat::Summary => output::render_summary(&report),
            OutputFormat::Json if pretty || config.output.pretty => {
                serde_json::to_string_pretty(&report)?
            }
            OutputFormat::Json => serde_json::to_string(&report)?,
        };

        if let Some(output_path) = output_path {
            std::fs::write(output_path, rendered)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{rendered}");
        }

        Ok(())
    }

    fn check_triggered(job: &str, response: &HttpResponse) -> Result<()> {
        if !response.is_success() {
            bail!(
                "Jenkins refused to build {job} (status {}): {}",
                response.status,
                response.body.trim()
            );
        }

        println!("{} {}", output::magenta_bold("Triggered"), job);
        Ok(())
    }

    async fn execute_run(pipeline: &mut JenkinsPipeline) -> Result<()> {
        let first = pipeline
            .fetch_jobs()
            .await?
            .first()
            .map(|job| job.display_name().to_string())
            .unwrap_or_default();

        let response = pipeline.run().await?;
        Self::check_triggered(&first, &response)
    }

    async fn execute_trigger(pipeline: &mut JenkinsPipeline) -> Result<()> {
        let next = pipeline
            .next_step()
            .await?
            .map(|job| job.display_name().to_string());

        match pipeline.trigger_manual_step().await? {
            Some(response) => Self::check_triggered(next.as_deref().unwrap_or("next step"), &response),
            None => {
                println!("{}", output::dim("Pipeline is not waiting on a manual step"));
                Ok(())
            }
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.resolve_config()?;
        let mut pipeline = Self::build_pipeline(&config)?;

        match &self.command {
            Commands::Status {
                format,
                pretty,
                output,
            } => {
                Self::execute_status(&config, &mut pipeline, *format, *pretty, output.as_ref())
                    .await
            }
            Commands::Run => Self::execute_run(&mut pipeline).await,
            Commands::Trigger => Self::execute_trigger(&mut pipeline).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "piper",
            "--config",
            "does-not-exist.toml",
            "--url",
            "https://ci.example.com",
            "--pipeline",
            "release",
            "--state-cache-seconds",
            "3",
            "status",
        ]);

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.jenkins.url.as_deref(), Some("https://ci.example.com"));
        assert_eq!(config.jenkins.pipeline.as_deref(), Some("release"));
        assert_eq!(config.jenkins.state_cache_seconds, 3);
    }

    #[test]
    fn test_missing_pipeline_is_reported() {
        let mut config = Config::default();
        config.jenkins.url = Some("https://ci.example.com".to_string());

        let err = Cli::build_pipeline(&config).err().unwrap();
        assert!(err.to_string().contains("No pipeline given"));
    }

    #[test]
    fn test_status_flags_parse() {
        let cli = Cli::parse_from(["piper", "status", "--format", "json", "--pretty"]);
        assert!(matches!(
            cli.command,
            Commands::Status {
                format: Some(OutputFormat::Json),
                pretty: true,
                ..
            }
        ));
    }
}
