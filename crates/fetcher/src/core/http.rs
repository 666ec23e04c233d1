//! HTTP transport
//!
//! One pooled client is built from the configuration and shared by every
//! fetch task. Response acceptability is checked here, before anything is
//! written to disk.

use reqwest::{Client, Response, StatusCode, header::CONTENT_TYPE};
use tracing::debug;

use crate::config::FetchConfig;
use crate::core::error::{FetchError, Result};

/// Decides whether a response's Content-Type is acceptable
///
/// `None` means the header was absent.
pub trait ContentTypeCheck: Send + Sync {
    fn accepts(&self, content_type: Option<&str>) -> bool;
}

impl<F> ContentTypeCheck for F
where
    F: Fn(Option<&str>) -> bool + Send + Sync,
{
    fn accepts(&self, content_type: Option<&str>) -> bool {
        self(content_type)
    }
}

/// Accepts a missing or empty Content-Type, or one that matches exactly
///
/// Responses without a type are let through and left to validation.
#[derive(Debug, Clone)]
pub struct ExactContentType {
    expected: String,
}

impl ExactContentType {
    pub fn new<S: Into<String>>(expected: S) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl ContentTypeCheck for ExactContentType {
    fn accepts(&self, content_type: Option<&str>) -> bool {
        match content_type {
            None => true,
            Some(value) if value.is_empty() => true,
            Some(value) => value == self.expected,
        }
    }
}

/// Shared HTTP client with connection reuse
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client from fetch configuration
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::Configuration {
                message: format!("failed to create HTTP client: {e}"),
                field: None,
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Issue a GET request, returning the response with its body unread
    pub async fn get(&self, url: &str) -> Result<Response> {
        let parsed = url::Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        debug!("GET {}", parsed);
        self.client
            .get(parsed)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
    }
}

/// Reject anything but a 200 response with an accepted Content-Type
pub fn assert_acceptable(url: &str, response: &Response, check: &dyn ContentTypeCheck) -> Result<()> {
    if response.status() != StatusCode::OK {
        return Err(FetchError::UnacceptableStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|value| value.to_str().unwrap_or("<non-ascii>"));

    if !check.accepts(content_type) {
        return Err(FetchError::UnacceptableContentType {
            url: url.to_string(),
            content_type: content_type.unwrap_or_default().to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn exact_content_type_policy() {
        let check = ExactContentType::new("application/pdf");
        assert!(check.accepts(None));
        assert!(check.accepts(Some("")));
        assert!(check.accepts(Some("application/pdf")));
        assert!(!check.accepts(Some("text/html")));
        assert!(!check.accepts(Some("application/pdf; charset=binary")));
    }

    #[test]
    fn closures_are_content_type_checks() {
        let any_pdf = |content_type: Option<&str>| {
            content_type.is_some_and(|value| value.starts_with("application/pdf"))
        };
        assert!(any_pdf.accepts(Some("application/pdf; charset=binary")));
        assert!(!any_pdf.accepts(None));
    }

    async fn response_for(template: ResponseTemplate) -> (MockServer, String, Response) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(template)
            .mount(&server)
            .await;

        let url = format!("{}/doc.pdf", server.uri());
        let client = HttpClient::from_config(&FetchConfig::default()).unwrap();
        let response = client.get(&url).await.unwrap();
        (server, url, response)
    }

    #[tokio::test]
    async fn non_200_status_is_rejected() {
        let (_server, url, response) = response_for(ResponseTemplate::new(404)).await;
        let check = ExactContentType::new("application/pdf");

        let err = assert_acceptable(&url, &response, &check).unwrap_err();
        assert!(matches!(err, FetchError::UnacceptableStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn html_body_is_rejected() {
        let template = ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html");
        let (_server, url, response) = response_for(template).await;
        let check = ExactContentType::new("application/pdf");

        let err = assert_acceptable(&url, &response, &check).unwrap_err();
        match err {
            FetchError::UnacceptableContentType { content_type, .. } => assert_eq!(content_type, "text/html"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn pdf_body_is_accepted() {
        let template = ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf");
        let (_server, url, response) = response_for(template).await;

        assert!(assert_acceptable(&url, &response, &ExactContentType::new("application/pdf")).is_ok());
    }

    #[tokio::test]
    async fn invalid_url_never_reaches_the_network() {
        let client = HttpClient::from_config(&FetchConfig::default()).unwrap();
        let err = client.get("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert!(err.allows_fallback());
    }
}
