pub mod jenkins;

pub use jenkins::{JenkinsClient, JenkinsPipeline};
