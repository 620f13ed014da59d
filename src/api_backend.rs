//! Shared HTTP plumbing for the hosted embedding and generation models

use crate::error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Backoff grows by this much after each failed attempt
pub const RETRY_BACKOFF_STEP: Duration = Duration::from_millis(200);

pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    retries: usize,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        retries: usize,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            retries,
        })
    }

    /// Build `{base}/models/{model}:{method}`, adding the API key when set
    pub fn model_endpoint(&self, model: &str, method: &str) -> Result<Url> {
        let model = model.trim_start_matches('/');
        let path = if model.starts_with("models/") {
            format!("{}:{}", model, method)
        } else {
            format!("models/{}:{}", model, method)
        };

        let mut url = self
            .base_url
            .join(&path)
            .map_err(|e| Error::Config(format!("Invalid model endpoint '{}': {}", path, e)))?;
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    /// POST a JSON body, retrying transport and HTTP-status failures
    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.retries {
            match self.client.post(url.clone()).json(body).send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => return Ok(ok.json::<T>().await?),
                    Err(e) => last_err = Some(Error::Http(e.without_url())),
                },
                Err(e) => last_err = Some(Error::Http(e.without_url())),
            }

            if attempt < self.retries {
                tokio::time::sleep(RETRY_BACKOFF_STEP * (attempt as u32 + 1)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Config("No request attempts were made".to_string())))
    }
}

/// Parse a base URL, ensuring a trailing slash so relative joins keep the path
fn parse_base_url(base_url: &str) -> Result<Url> {
    if base_url.ends_with('/') {
        Ok(Url::parse(base_url)?)
    } else {
        Ok(Url::parse(&format!("{}/", base_url))?)
    }
}
