pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use yn_api_types::{ChainId, Pool, WalletAddress};
use yn_wallet::OfflineSigner;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("client configuration error: {0}")]
    Config(String),

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("GraphQL errors: {0}")]
    GraphQl(String),
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// Cosmos SDK pagination request (`pagination.key` / `limit` / `reverse`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub key: Option<String>,
    pub limit: Option<u64>,
    pub reverse: bool,
}

impl PageRequest {
    pub fn descending(limit: u64) -> Self {
        Self {
            key: None,
            limit: Some(limit),
            reverse: true,
        }
    }

    pub fn after(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Base64 cursor; `None` or empty on the last page.
    #[serde(default)]
    pub next_key: Option<String>,
    #[serde(default)]
    pub total: Option<String>,
}

impl PageResponse {
    pub fn next(&self) -> Option<&str> {
        self.next_key.as_deref().filter(|key| !key.is_empty())
    }
}

/// One page of governance proposals as returned by the node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalPage {
    #[serde(default)]
    pub proposals: Vec<serde_json::Value>,
    #[serde(default)]
    pub pagination: Option<PageResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRef {
    pub address: String,
    pub code_hash: String,
}

/// A chain registered with the liquid-staking module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostZone {
    pub chain_id: String,
    #[serde(default)]
    pub last_redemption_rate: Option<String>,
    #[serde(default)]
    pub redemption_rate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostZonePage {
    #[serde(default)]
    pub host_zone: Vec<HostZone>,
    #[serde(default)]
    pub pagination: Option<PageResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQlToken {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub description: Option<String>,
    pub logo_path: Option<String>,
    pub price_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlPrice {
    pub id: String,
    pub value: Option<f64>,
}

/// Read-only chain queries.
#[async_trait]
pub trait ChainQuerier: Send + Sync {
    async fn gov_proposals(&self, page: &PageRequest) -> Result<ProposalPage>;
    async fn query_contract(&self, contract: &ContractRef, query: &serde_json::Value) -> Result<serde_json::Value>;
}

#[async_trait]
pub trait HostZoneSource: Send + Sync {
    async fn host_zones(&self, page: &PageRequest) -> Result<HostZonePage>;
}

/// External price service (token catalog, pools and prices).
#[async_trait]
pub trait PriceService: Send + Sync {
    async fn pools(&self) -> Result<Vec<Pool>>;
    async fn tokens(&self) -> Result<Vec<GraphQlToken>>;
    async fn prices(&self, ids: &[String]) -> Result<Vec<GraphQlPrice>>;
}

/// Query client bound to one endpoint and chain, optionally carrying a signer.
#[derive(Clone)]
pub struct ChainClient {
    endpoint: String,
    chain_id: ChainId,
    signer: Option<Arc<dyn OfflineSigner>>,
    wallet_address: Option<WalletAddress>,
    querier: Arc<dyn ChainQuerier>,
}

impl ChainClient {
    pub fn new(endpoint: impl Into<String>, chain_id: ChainId, querier: Arc<dyn ChainQuerier>) -> Self {
        Self {
            endpoint: endpoint.into(),
            chain_id,
            signer: None,
            wallet_address: None,
            querier,
        }
    }

    pub fn with_wallet(mut self, signer: Option<Arc<dyn OfflineSigner>>, wallet_address: Option<WalletAddress>) -> Self {
        self.signer = signer;
        self.wallet_address = wallet_address;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn wallet_address(&self) -> Option<&WalletAddress> {
        self.wallet_address.as_ref()
    }

    pub fn signer(&self) -> Option<&Arc<dyn OfflineSigner>> {
        self.signer.as_ref()
    }

    pub fn is_signed(&self) -> bool {
        self.signer.is_some() && self.wallet_address.is_some()
    }

    pub async fn gov_proposals(&self, page: &PageRequest) -> Result<ProposalPage> {
        self.querier.gov_proposals(page).await
    }

    pub async fn query_contract(&self, contract: &ContractRef, query: &serde_json::Value) -> Result<serde_json::Value> {
        self.querier.query_contract(contract, query).await
    }
}

impl fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClient")
            .field("endpoint", &self.endpoint)
            .field("chain_id", &self.chain_id)
            .field("wallet_address", &self.wallet_address)
            .field("signed", &self.signer.is_some())
            .finish()
    }
}

/// Builds [`ChainClient`]s. Construction does no I/O.
pub trait ChainClientFactory: Send + Sync {
    fn create_client(
        &self,
        endpoint: &str,
        chain_id: &ChainId,
        signer: Option<Arc<dyn OfflineSigner>>,
        wallet_address: Option<WalletAddress>,
    ) -> Result<ChainClient>;
}
