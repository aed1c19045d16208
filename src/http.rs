//! Read-only resource access over HTTP.

use std::io;
use std::time::Duration;

use tracing::debug;

use artifact_index_core::error::{IndexError, Result};
use artifact_index_core::resource::{ResourceHandler, ResourceStream};

/// Serves `<base_url>/<name>` with blocking GETs. A 404 is a missing
/// resource; any other failure status is a transport error.
pub struct HttpResourceHandler {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpResourceHandler {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("aidx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IndexError::transport(base_url, io::Error::other(e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

impl ResourceHandler for HttpResourceHandler {
    fn open(&self, name: &str) -> Result<Option<ResourceStream>> {
        let url = self.url(name);
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| IndexError::transport(name, io::Error::other(e)))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(IndexError::transport(
                name,
                io::Error::other(format!("GET {} returned {}", url, status)),
            ));
        }
        Ok(Some(Box::new(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let handler =
            HttpResourceHandler::new("https://repo.example.org/index/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            handler.url("artifact-index.properties"),
            "https://repo.example.org/index/artifact-index.properties"
        );
    }

    #[test]
    fn unreachable_host_is_retryable() {
        let handler =
            HttpResourceHandler::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = match handler.open("idx.properties") {
            Err(e) => e,
            Ok(_) => panic!("expected a transport error"),
        };
        assert!(err.is_retryable());
    }
}
