use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use yn_chain_client::http;
use yn_chain_client::{HostZonePage, HostZoneSource, PageRequest, Result};

pub const DEFAULT_STRIDE_LCD_ENDPOINT: &str = "https://stride-api.polkachu.com";
pub const HOST_ZONE_PATH: &str = "/Stride-Labs/stride/stakeibc/host_zone";

/// Chain whose rate is read from the REST snapshot, and the key it is stored under.
pub const CELESTIA_CHAIN_ID: &str = "celestia";
pub const ST_TIA_KEY: &str = "stTIA";

/// Stride `stakeibc` host-zone listing over REST.
pub struct StrideHostZoneClient {
    url: String,
    http: reqwest::Client,
}

impl StrideHostZoneClient {
    /// Client for the host-zone route under an LCD base URL.
    pub fn from_lcd(endpoint: &str, timeout: Duration) -> Result<Self> {
        let base = http::normalize_endpoint(endpoint)?;
        Self::from_url(&format!("{base}{HOST_ZONE_PATH}"), timeout)
    }

    /// Client for a complete host-zone URL.
    pub fn from_url(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: http::normalize_endpoint(url)?,
            http: http::build_http_client(timeout)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HostZoneSource for StrideHostZoneClient {
    async fn host_zones(&self, page: &PageRequest) -> Result<HostZonePage> {
        let mut params = Vec::new();
        if let Some(key) = page.key.as_deref().filter(|key| !key.is_empty()) {
            params.push(("pagination.key", key.to_owned()));
        }
        if let Some(limit) = page.limit {
            params.push(("pagination.limit", limit.to_string()));
        }

        let page: HostZonePage = http::get_json(&self.http, &self.url, &params).await?;
        debug!("received {} host zones from {}", page.host_zone.len(), self.url);
        Ok(page)
    }
}
