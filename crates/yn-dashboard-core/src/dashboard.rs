//! The dashboard's named-function surface.
//!
//! Each method mirrors one exported function of the UI contract (listed in
//! [`EXPORTED_FUNCTIONS`]) and converts failures into the sentinel the UI
//! expects: an empty list, an empty map, `"No Data"` prices or an empty
//! address. The lower-level helpers in [`crate::prices`],
//! [`crate::proposals`] and [`crate::redemption`] return `Result`s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use yn_api_types::{OracleKey, Pool, PriceQuoteSet, Proposal, RedemptionRateSet};
use yn_chain_client::{ChainClient, ChainClientFactory, HostZoneSource, PriceService};
use yn_chain_secret::SecretClientFactory;
use yn_chain_secret::graphql::ShadeGraphQl;
use yn_chain_stride::StrideHostZoneClient;
use yn_wallet::{Account, WalletConnector};

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::proposals::ProposalQuery;
use crate::{prices, proposals, redemption};

/// Names under which the UI calls into the dashboard.
pub const EXPORTED_FUNCTIONS: &[&str] = &[
    "connectKeplrWallet",
    "disconnectKeplrWallet",
    "get_wallet_address",
    "fetchGovernanceProposals",
    "fetchSHDPrice",
    "fetchBatchPrices",
    "fetchDerivativePrices",
    "fetchSilkPrice",
    "fetchSTKDExchangeRate",
    "fetchAllShadeSwapPools",
    "fetchDSHDPrice",
    "fetchAllTokenPricesWithNames",
    "fetchRedemptionRates",
    "fetchRedemptionRateForTIA",
    "fetchAllRedemptionRates",
];

/// dSHD lookup result: a price or the reason there is none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DshdPrice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the dashboard calls out to, built once and passed around.
pub struct DashboardContext {
    pub config: DashboardConfig,
    pub wallet: WalletConnector,
    pub clients: Arc<dyn ChainClientFactory>,
    pub price_service: Arc<dyn PriceService>,
    pub host_zones: Arc<dyn HostZoneSource>,
    /// Single-request host-zone snapshot used for the stTIA rate.
    pub host_zone_snapshot: Arc<dyn HostZoneSource>,
}

impl DashboardContext {
    /// Wires the HTTP adapters described by `config`.
    pub fn from_config(config: DashboardConfig, wallet: WalletConnector) -> Result<Self> {
        let timeout = config.request_timeout();
        let clients = SecretClientFactory::new(config.gov_api_version, timeout)?;
        let price_service = ShadeGraphQl::new(&config.graphql_endpoint, timeout)?;
        let host_zones = StrideHostZoneClient::from_lcd(&config.stride_lcd_endpoint, timeout)?;
        let host_zone_snapshot = StrideHostZoneClient::from_url(&config.stride_host_zone_url, timeout)?;

        Ok(Self {
            config,
            wallet,
            clients: Arc::new(clients),
            price_service: Arc::new(price_service),
            host_zones: Arc::new(host_zones),
            host_zone_snapshot: Arc::new(host_zone_snapshot),
        })
    }
}

pub struct Dashboard {
    ctx: DashboardContext,
}

impl Dashboard {
    pub fn new(ctx: DashboardContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &DashboardContext {
        &self.ctx
    }

    /// `connectKeplrWallet`
    pub async fn connect_keplr_wallet(&self) -> Option<Account> {
        self.ctx.wallet.connect().await
    }

    /// `disconnectKeplrWallet`
    pub fn disconnect_keplr_wallet(&self) {
        self.ctx.wallet.disconnect();
    }

    /// `get_wallet_address`
    pub async fn get_wallet_address(&self) -> String {
        self.ctx.wallet.wallet_address().await
    }

    /// Client for `endpoint`, signed when a wallet is present and connects.
    async fn gov_client(&self, endpoint: &str) -> Result<ChainClient> {
        let account = if self.ctx.wallet.is_available() {
            self.ctx.wallet.connect().await
        } else {
            None
        };
        let (signer, address) = match account {
            Some(account) => (Some(account.signer), Some(account.address)),
            None => (None, None),
        };
        Ok(self
            .ctx
            .clients
            .create_client(endpoint, &self.ctx.config.chain_id(), signer, address)?)
    }

    fn query_client(&self, endpoint: Option<&str>) -> Result<ChainClient> {
        let endpoint = endpoint.unwrap_or(self.ctx.config.lcd_endpoint.as_str());
        Ok(self
            .ctx
            .clients
            .create_client(endpoint, &self.ctx.config.chain_id(), None, None)?)
    }

    /// `fetchGovernanceProposals`: newest first, at most `limit` (default
    /// 50, at most 100). Empty on any failure.
    pub async fn fetch_governance_proposals(&self, limit: Option<usize>, endpoint: Option<&str>) -> Vec<Proposal> {
        let query = limit.map(ProposalQuery::with_limit).unwrap_or_default();
        let endpoint = endpoint.unwrap_or(self.ctx.config.gov_endpoint.as_str());

        let result = match self.gov_client(endpoint).await {
            Ok(client) => proposals::fetch_proposals(&client, &query).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(proposals) => {
                info!("fetched {} governance proposals", proposals.len());
                proposals
            }
            Err(err) => {
                error!("error fetching proposals: {}", err);
                Vec::new()
            }
        }
    }

    /// `fetchSHDPrice`
    pub async fn fetch_shd_price(&self) -> Result<String> {
        self.fetch_price(&OracleKey::new("SHD")).await
    }

    pub async fn fetch_price(&self, key: &OracleKey) -> Result<String> {
        let client = self.query_client(None)?;
        prices::fetch_price(&client, &self.ctx.config.oracle, key).await
    }

    /// `fetchBatchPrices`: one entry per requested key, whatever fails.
    pub async fn fetch_batch_prices(&self, keys: Option<Vec<OracleKey>>, endpoint: Option<&str>) -> PriceQuoteSet {
        let keys = keys.unwrap_or_else(|| self.ctx.config.default_keys());
        match self.query_client(endpoint) {
            Ok(client) => prices::fetch_batch_prices(&client, &self.ctx.config.oracle, &keys).await,
            Err(err) => {
                error!("cannot build query client: {}", err);
                PriceQuoteSet::unavailable(&keys, err.to_string())
            }
        }
    }

    /// `fetchDerivativePrices`
    pub async fn fetch_derivative_prices(&self, keys: Option<Vec<OracleKey>>, endpoint: Option<&str>) -> PriceQuoteSet {
        let keys = keys.unwrap_or_else(|| self.ctx.config.derivative_keys());
        self.fetch_batch_prices(Some(keys), endpoint).await
    }

    /// `fetchSilkPrice`
    pub async fn fetch_silk_price(&self, keys: Option<Vec<OracleKey>>, endpoint: Option<&str>) -> PriceQuoteSet {
        let keys = keys.unwrap_or_else(|| self.ctx.config.silk_keys());
        self.fetch_batch_prices(Some(keys), endpoint).await
    }

    /// All-or-nothing batch; the unavailable set on failure.
    pub async fn fetch_prices_atomic(&self, keys: Vec<OracleKey>) -> PriceQuoteSet {
        let result = match self.query_client(None) {
            Ok(client) => prices::fetch_prices_atomic(&client, &self.ctx.config.oracle, &keys).await,
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| {
            error!("batch price query failed: {}", err);
            PriceQuoteSet::unavailable(&keys, err.to_string())
        })
    }

    /// `fetchSTKDExchangeRate`
    pub async fn fetch_stkd_exchange_rate(&self) -> Result<f64> {
        let client = self.query_client(None)?;
        let now = chrono::Utc::now().timestamp();
        let info = prices::fetch_stkd_exchange_rate(&client, &self.ctx.config.stkd_scrt, now).await?;
        Ok(info.exchange_rate)
    }

    /// `fetchAllShadeSwapPools`
    pub async fn fetch_all_shade_swap_pools(&self) -> Vec<Pool> {
        prices::fetch_all_pools(self.ctx.price_service.as_ref())
            .await
            .unwrap_or_else(|err| {
                error!("error fetching ShadeSwap pools: {}", err);
                Vec::new()
            })
    }

    /// `fetchDSHDPrice`
    pub async fn fetch_dshd_price(&self) -> DshdPrice {
        match prices::fetch_dshd_price(self.ctx.price_service.as_ref(), &self.ctx.config.dshd_price_id).await {
            Ok(price) => DshdPrice {
                price: Some(price),
                error: None,
            },
            Err(err) => {
                warn!("dSHD price unavailable: {}", err);
                DshdPrice {
                    price: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// `fetchAllTokenPricesWithNames`
    pub async fn fetch_all_token_prices_with_names(&self) -> Result<BTreeMap<String, String>> {
        prices::fetch_token_prices_with_names(self.ctx.price_service.as_ref())
            .await
            .inspect_err(|err| error!("error fetching token prices: {}", err))
    }

    /// `fetchRedemptionRates`
    pub async fn fetch_redemption_rates(&self) -> Result<RedemptionRateSet> {
        redemption::fetch_redemption_rates(self.ctx.host_zones.as_ref()).await
    }

    /// `fetchRedemptionRateForTIA`
    pub async fn fetch_redemption_rate_for_tia(&self) -> f64 {
        redemption::fetch_redemption_rate_for_tia(self.ctx.host_zone_snapshot.as_ref()).await
    }

    /// `fetchAllRedemptionRates`: empty on failure of the primary listing.
    pub async fn fetch_all_redemption_rates(&self) -> RedemptionRateSet {
        redemption::fetch_all_redemption_rates(self.ctx.host_zones.as_ref(), self.ctx.host_zone_snapshot.as_ref())
            .await
            .unwrap_or_else(|err| {
                error!("error fetching all redemption rates: {}", err);
                RedemptionRateSet::new()
            })
    }
}
