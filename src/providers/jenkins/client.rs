use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::auth::Credentials;
use crate::error::{PiperError, Result};

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON; `url` names the resource in the error.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|source| PiperError::MalformedResponse {
            url: url.to_string(),
            source,
        })
    }
}

/// Capability to issue HTTP requests against arbitrary URLs.
///
/// Timeouts and connection handling belong to the implementation; callers
/// get either a response (any status) or a transport error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HttpResponse>;
}

/// Jenkins transport backed by `reqwest`.
pub struct JenkinsClient {
    client: Client,
}

impl JenkinsClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!("piper/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| PiperError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Helper to attach basic auth when credentials are present
    fn auth_request(
        request: reqwest::RequestBuilder,
        credentials: Option<&Credentials>,
    ) -> reqwest::RequestBuilder {
        if let Some(credentials) = credentials {
            request.basic_auth(credentials.username(), Some(credentials.password()))
        } else {
            request
        }
    }
}

#[async_trait]
impl Transport for JenkinsClient {
    async fn send(
        &self,
        method: Method,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<HttpResponse> {
        debug!("{method} {url}");

        let request = Self::auth_request(self.client.request(method, url), credentials);
        let response = request.send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_status_classes() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(201, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
        assert!(!HttpResponse::new(101, "").is_success());
    }

    #[test]
    fn test_response_json_malformed() {
        let response = HttpResponse::new(200, "<html>login</html>");
        let err = response
            .json::<serde_json::Value>("http://ci/api/json")
            .unwrap_err();

        assert!(matches!(err, PiperError::MalformedResponse { ref url, .. } if url == "http://ci/api/json"));
    }

    #[tokio::test]
    async fn test_get_returns_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/job/a/lastBuild/api/json")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = JenkinsClient::new(None).unwrap();
        let url = format!("{}/job/a/lastBuild/api/json", server.url());
        let response = client.send(Method::GET, &url, None).await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body, "not found");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_credentials_sent_as_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/job/a/build")
            .match_header("authorization", "Basic dXNlcjpzZWNyZXQ=")
            .with_status(201)
            .create_async()
            .await;

        let client = JenkinsClient::new(Some(Duration::from_secs(5))).unwrap();
        let credentials = Credentials::new("user", "secret");
        let url = format!("{}/job/a/build", server.url());
        let response = client
            .send(Method::POST, &url, Some(&credentials))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let client = JenkinsClient::new(Some(Duration::from_secs(2))).unwrap();
        let err = client
            .send(Method::GET, "http://127.0.0.1:1/api/json", None)
            .await
            .unwrap_err();

        assert!(matches!(err, PiperError::Transport(_)));
    }
}
