//! Endpoints, contracts and preset key lists for the dashboard.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use yn_api_types::{ChainId, OracleKey, SECRET_CHAIN_ID};
use yn_chain_client::ContractRef;
use yn_chain_client::http::{DEFAULT_REQUEST_TIMEOUT, normalize_endpoint};
use yn_chain_secret::graphql::DEFAULT_GRAPHQL_ENDPOINT;
use yn_chain_secret::{DEFAULT_GOV_ENDPOINT, DEFAULT_LCD_ENDPOINT, GovApiVersion};
use yn_chain_stride::{DEFAULT_STRIDE_LCD_ENDPOINT, HOST_ZONE_PATH};

pub const ORACLE_ADDRESS: &str = "secret10n2xl5jmez6r9umtdrth78k0vwmce0l5m9f5dm";
pub const ORACLE_CODE_HASH: &str = "32c4710842b97a526c243a68511b15f58d6e72a388af38a7221ff3244c754e91";
pub const STKD_SCRT_ADDRESS: &str = "secret1k6u0cy4feepm6pehnz804zmwakuwdapm69tuc4";
pub const STKD_SCRT_CODE_HASH: &str = "f6be719b3c6feb498d3554ca0398eb6b7e7db262acb33f84a8f12106da6bbb09";
pub const DSHD_PRICE_ID: &str = "563526c3-2187-4f3a-a41b-813f599bf59c";

pub const DEFAULT_PRICE_KEYS: &[&str] = &["BTC", "ETH", "SHD", "SCRT", "ATOM", "TIA", "SILK"];
pub const DERIVATIVE_PRICE_KEYS: &[&str] = &["stkd-SCRT", "Stride ATOM", "Stride TIA"];
pub const SILK_PRICE_KEYS: &[&str] = &["SILK"];

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = DEFAULT_REQUEST_TIMEOUT.as_secs();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub chain_id: String,
    /// Node used for governance listings.
    pub gov_endpoint: String,
    pub gov_api_version: GovApiVersion,
    /// Node used for contract queries.
    pub lcd_endpoint: String,
    pub oracle: ContractRef,
    pub stkd_scrt: ContractRef,
    pub graphql_endpoint: String,
    pub dshd_price_id: String,
    pub stride_lcd_endpoint: String,
    /// Full URL of the host-zone snapshot used for the stTIA fallback.
    pub stride_host_zone_url: String,
    pub request_timeout_secs: u64,
    pub default_price_keys: Vec<String>,
    pub derivative_price_keys: Vec<String>,
    pub silk_price_keys: Vec<String>,
    /// Extra nodes a caller may name per request, on top of the gov and lcd endpoints.
    pub allowed_endpoints: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            chain_id: SECRET_CHAIN_ID.to_owned(),
            gov_endpoint: DEFAULT_GOV_ENDPOINT.to_owned(),
            gov_api_version: GovApiVersion::default(),
            lcd_endpoint: DEFAULT_LCD_ENDPOINT.to_owned(),
            oracle: ContractRef {
                address: ORACLE_ADDRESS.to_owned(),
                code_hash: ORACLE_CODE_HASH.to_owned(),
            },
            stkd_scrt: ContractRef {
                address: STKD_SCRT_ADDRESS.to_owned(),
                code_hash: STKD_SCRT_CODE_HASH.to_owned(),
            },
            graphql_endpoint: DEFAULT_GRAPHQL_ENDPOINT.to_owned(),
            dshd_price_id: DSHD_PRICE_ID.to_owned(),
            stride_lcd_endpoint: DEFAULT_STRIDE_LCD_ENDPOINT.to_owned(),
            stride_host_zone_url: format!("{DEFAULT_STRIDE_LCD_ENDPOINT}{HOST_ZONE_PATH}"),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            default_price_keys: owned(DEFAULT_PRICE_KEYS),
            derivative_price_keys: owned(DERIVATIVE_PRICE_KEYS),
            silk_price_keys: owned(SILK_PRICE_KEYS),
            allowed_endpoints: Vec::new(),
        }
    }
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| (*key).to_owned()).collect()
}

impl DashboardConfig {
    /// Defaults overridden by `YN_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(value) = var("YN_CHAIN_ID") {
            config.chain_id = value;
        }
        if let Some(value) = var("YN_SECRET_GOV_URL") {
            config.gov_endpoint = value;
        }
        if let Some(value) = var("YN_GOV_API_VERSION") {
            match value.as_str() {
                "v1" => config.gov_api_version = GovApiVersion::V1,
                "v1beta1" => config.gov_api_version = GovApiVersion::V1beta1,
                other => tracing::warn!("ignoring unknown YN_GOV_API_VERSION {:?}", other),
            }
        }
        if let Some(value) = var("YN_SECRET_LCD_URL") {
            config.lcd_endpoint = value;
        }
        if let Some(value) = var("YN_GRAPHQL_URL") {
            config.graphql_endpoint = value;
        }
        if let Some(value) = var("YN_STRIDE_LCD_URL") {
            config.stride_lcd_endpoint = value;
        }
        if let Some(value) = var("YN_STRIDE_HOST_ZONE_URL") {
            config.stride_host_zone_url = value;
        }
        if let Some(value) = var("YN_ALLOWED_ENDPOINTS") {
            config.allowed_endpoints = value
                .split(',')
                .map(str::trim)
                .filter(|endpoint| !endpoint.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        if let Some(value) = var("YN_REQUEST_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout_secs = secs,
                _ => tracing::warn!("ignoring invalid YN_REQUEST_TIMEOUT_SECS {:?}", value),
            }
        }

        config
    }

    pub fn chain_id(&self) -> ChainId {
        ChainId(self.chain_id.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether a caller-supplied `endpoint` is one of the configured nodes.
    pub fn allows_endpoint(&self, endpoint: &str) -> bool {
        let Ok(wanted) = normalize_endpoint(endpoint) else {
            return false;
        };
        [&self.gov_endpoint, &self.lcd_endpoint]
            .into_iter()
            .chain(&self.allowed_endpoints)
            .filter_map(|known| normalize_endpoint(known).ok())
            .any(|known| known == wanted)
    }

    pub fn default_keys(&self) -> Vec<OracleKey> {
        keys(&self.default_price_keys)
    }

    pub fn derivative_keys(&self) -> Vec<OracleKey> {
        keys(&self.derivative_price_keys)
    }

    pub fn silk_keys(&self) -> Vec<OracleKey> {
        keys(&self.silk_price_keys)
    }
}

fn keys(raw: &[String]) -> Vec<OracleKey> {
    raw.iter().map(OracleKey::new).collect()
}
