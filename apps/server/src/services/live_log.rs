//! Client for the live execution controller's log endpoint.
//!
//! Used for builds that have not uploaded `build-log.txt` yet. Every failure
//! (connection, timeout, non-200 status, unreadable body) means the log is
//! unavailable; nothing here surfaces an error to the caller.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::BuildLog;
use crate::services::log_digest::digest;

/// HTTP connect timeout for the controller.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP total timeout for one log fetch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct LiveLogClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl LiveLogClient {
    /// `base_url` may omit the scheme, in which case `https://` is assumed.
    pub fn new(base_url: &str) -> AppResult<Self> {
        let base_url = base_url.trim_end_matches('/');
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.to_string()
        } else {
            format!("https://{}", base_url)
        };

        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::InvalidInput(format!("Live log client: {}", e)))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn log_url(&self, job: &str, build: &str) -> String {
        format!(
            "{}/log?job={}&id={}",
            self.base_url,
            urlencoding::encode(job),
            urlencoding::encode(build)
        )
    }

    /// Fetch and digest the running log of `job` / `build`.
    pub async fn fetch_log(&self, job: &str, build: &str) -> Option<BuildLog> {
        let url = self.log_url(job, build);

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Live log fetch failed");
                return None;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            debug!(url = %url, status = %response.status(), "Live log unavailable");
            return None;
        }

        match response.bytes().await {
            Ok(body) => Some(BuildLog {
                digest: digest(&body),
                source_url: Some(url),
            }),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to read live log body");
                None
            }
        }
    }
}
