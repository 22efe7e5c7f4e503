use std::time::Duration;

use tracing::info;

use crate::traits::HtmlSource;
use crate::{EtlError, Result};

const USER_AGENT: &str = "bank-etl/0.1";
const TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the page with a single GET. A failed request ends the run; there
/// are no retries.
pub struct HttpSource {
    url: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: TIMEOUT,
        }
    }
}

#[async_trait::async_trait]
impl HtmlSource for HttpSource {
    async fn fetch(&self) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        info!("Fetching HTML from: {}", self.url);

        let response = client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(EtlError::HttpStatus {
                status: response.status(),
                url: self.url.clone(),
            });
        }

        let html = response.text().await?;
        info!("Fetched {} bytes of HTML", html.len());
        Ok(html)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
