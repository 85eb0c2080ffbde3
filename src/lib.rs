//! Client for Jenkins build pipelines.
//!
//! A pipeline is a Jenkins view whose jobs run in order. [`JenkinsPipeline`]
//! polls the last build of each job to work out how far the pipeline has
//! progressed, whether it is complete, and whether the next job waits on a
//! manual trigger.

pub mod auth;
pub mod config;
pub mod error;
pub mod providers;
pub mod report;

pub use auth::Credentials;
pub use error::{PiperError, Result};
pub use providers::jenkins::JenkinsPipeline;
