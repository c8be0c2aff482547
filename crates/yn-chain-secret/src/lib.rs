//! Secret Network LCD adapter.
//!
//! Governance listing uses the standard Cosmos SDK REST routes. Contract
//! queries go to the compute query route with a base64 JSON payload; the
//! encryption envelope a public Secret node expects is left to the node or
//! query proxy in front of it.

pub mod graphql;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use yn_api_types::{ChainId, WalletAddress};
use yn_chain_client::http;
use yn_chain_client::{
    ChainClient, ChainClientFactory, ChainError, ChainQuerier, ContractRef, PageRequest, ProposalPage, Result,
};
use yn_wallet::OfflineSigner;

pub const DEFAULT_GOV_ENDPOINT: &str = "https://rpc.ankr.com/http/scrt_cosmos";
pub const DEFAULT_LCD_ENDPOINT: &str = "https://api.yolonode.com";

/// Which governance REST module to list proposals from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovApiVersion {
    /// Legacy `content`-based proposals.
    #[default]
    V1beta1,
    /// `messages`-based proposals.
    V1,
}

impl GovApiVersion {
    fn proposals_path(self) -> &'static str {
        match self {
            Self::V1beta1 => "/cosmos/gov/v1beta1/proposals",
            Self::V1 => "/cosmos/gov/v1/proposals",
        }
    }
}

pub struct SecretLcdClient {
    endpoint: String,
    gov_version: GovApiVersion,
    http: reqwest::Client,
}

impl SecretLcdClient {
    pub fn new(endpoint: &str, gov_version: GovApiVersion, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            endpoint: http::normalize_endpoint(endpoint)?,
            gov_version,
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Deserialize)]
struct ComputeQueryResponse {
    data: serde_json::Value,
}

fn pagination_params(page: &PageRequest) -> Vec<(&'static str, String)> {
    let mut params = Vec::with_capacity(3);
    if let Some(key) = page.key.as_deref().filter(|key| !key.is_empty()) {
        params.push(("pagination.key", key.to_owned()));
    }
    if let Some(limit) = page.limit {
        params.push(("pagination.limit", limit.to_string()));
    }
    if page.reverse {
        params.push(("pagination.reverse", "true".to_owned()));
    }
    params
}

/// Contract results arrive either inline or as base64-encoded JSON.
fn decode_contract_data(data: serde_json::Value) -> Result<serde_json::Value> {
    match data {
        serde_json::Value::String(encoded) => {
            let bytes = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|err| ChainError::MalformedResponse(format!("contract data is not base64: {err}")))?;
            serde_json::from_slice(&bytes)
                .map_err(|err| ChainError::MalformedResponse(format!("contract data is not JSON: {err}")))
        }
        other => Ok(other),
    }
}

#[async_trait]
impl ChainQuerier for SecretLcdClient {
    async fn gov_proposals(&self, page: &PageRequest) -> Result<ProposalPage> {
        let url = format!("{}{}", self.endpoint, self.gov_version.proposals_path());
        let page: ProposalPage = http::get_json(&self.http, &url, &pagination_params(page)).await?;
        debug!("received {} proposals from {}", page.proposals.len(), url);
        Ok(page)
    }

    async fn query_contract(&self, contract: &ContractRef, query: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}/compute/v1beta1/query/{}", self.endpoint, contract.address);
        let encoded = STANDARD.encode(query.to_string());
        let params = [("query", encoded), ("code_hash", contract.code_hash.clone())];
        let response: ComputeQueryResponse = http::get_json(&self.http, &url, &params).await?;
        decode_contract_data(response.data)
    }
}

/// Builds LCD-backed [`ChainClient`]s sharing one HTTP connection pool.
#[derive(Clone)]
pub struct SecretClientFactory {
    http: reqwest::Client,
    gov_version: GovApiVersion,
}

impl SecretClientFactory {
    pub fn new(gov_version: GovApiVersion, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http::build_http_client(timeout)?,
            gov_version,
        })
    }
}

impl Default for SecretClientFactory {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            gov_version: GovApiVersion::default(),
        }
    }
}

impl ChainClientFactory for SecretClientFactory {
    fn create_client(
        &self,
        endpoint: &str,
        chain_id: &ChainId,
        signer: Option<Arc<dyn OfflineSigner>>,
        wallet_address: Option<WalletAddress>,
    ) -> Result<ChainClient> {
        let querier = SecretLcdClient::new(endpoint, self.gov_version, self.http.clone())?;
        info!("creating Secret client for {} on {}", chain_id, querier.endpoint());

        let endpoint = querier.endpoint().to_owned();
        Ok(ChainClient::new(endpoint, chain_id.clone(), Arc::new(querier)).with_wallet(signer, wallet_address))
    }
}
