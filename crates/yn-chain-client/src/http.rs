//! JSON-over-HTTP helpers shared by the LCD and GraphQL adapters.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::{ChainError, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ChainError::Config(format!("http client: {err}")))
}

/// Validates an endpoint URL and strips the trailing slash.
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(ChainError::Config("endpoint is not defined".to_owned()));
    }

    reqwest::Url::parse(trimmed).map_err(|err| ChainError::Config(format!("invalid endpoint {trimmed}: {err}")))?;
    Ok(trimmed.trim_end_matches('/').to_owned())
}

pub async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T> {
    debug!("GET {} {:?}", url, query);
    let response = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|err| network_error(url, err))?;

    read_json(url, response).await
}

pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    body: &B,
) -> Result<T> {
    debug!("POST {}", url);
    let response = http
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|err| network_error(url, err))?;

    read_json(url, response).await
}

async fn read_json<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChainError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|err| ChainError::MalformedResponse(format!("{url}: {err}")))
}

fn network_error(url: &str, err: reqwest::Error) -> ChainError {
    ChainError::Network {
        url: url.to_owned(),
        message: err.to_string(),
    }
}
