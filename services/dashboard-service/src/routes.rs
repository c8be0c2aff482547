use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use yn_api_types::{OracleKey, Pool, PriceQuoteSet, Proposal, RedemptionRateSet};
use tracing::warn;
use yn_dashboard_core::{DshdPrice, EXPORTED_FUNCTIONS};

use crate::{ApiResult, AppState, ErrorResponse, bad_gateway, bad_request};

#[derive(Debug, Serialize)]
pub(crate) struct FunctionsResponse {
    functions: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub(crate) struct PriceResponse {
    key: String,
    price: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExchangeRateResponse {
    exchange_rate: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RateResponse {
    rate: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProposalsQuery {
    limit: Option<usize>,
    endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchQuery {
    /// Comma-separated oracle keys; the preset applies when absent.
    keys: Option<String>,
    endpoint: Option<String>,
}

impl BatchQuery {
    fn keys(&self) -> Option<Vec<OracleKey>> {
        let keys: Vec<OracleKey> = self
            .keys
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(OracleKey::new)
            .collect();
        (!keys.is_empty()).then_some(keys)
    }
}

/// Caller-supplied node, accepted only when it is a configured endpoint.
fn checked_endpoint<'a>(
    state: &AppState,
    endpoint: Option<&'a str>,
) -> Result<Option<&'a str>, (StatusCode, Json<ErrorResponse>)> {
    match endpoint.filter(|endpoint| !endpoint.trim().is_empty()) {
        Some(endpoint) if !state.dashboard.context().config.allows_endpoint(endpoint) => {
            warn!("rejected unconfigured endpoint {:?}", endpoint);
            Err(bad_request("endpoint is not in the configured allow-list"))
        }
        endpoint => Ok(endpoint),
    }
}

pub(crate) async fn functions() -> Json<FunctionsResponse> {
    Json(FunctionsResponse {
        functions: EXPORTED_FUNCTIONS,
    })
}

pub(crate) async fn gov_proposals(
    State(state): State<AppState>,
    Query(query): Query<ProposalsQuery>,
) -> ApiResult<Vec<Proposal>> {
    let endpoint = checked_endpoint(&state, query.endpoint.as_deref())?;
    Ok(Json(state.dashboard.fetch_governance_proposals(query.limit, endpoint).await))
}

pub(crate) async fn shd_price(State(state): State<AppState>) -> ApiResult<PriceResponse> {
    let price = state.dashboard.fetch_shd_price().await.map_err(bad_gateway)?;
    Ok(Json(PriceResponse {
        key: "SHD".to_owned(),
        price,
    }))
}

pub(crate) async fn oracle_price(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<PriceResponse> {
    if key.trim().is_empty() {
        return Err(bad_request("oracle key cannot be empty"));
    }
    let price = state
        .dashboard
        .fetch_price(&OracleKey::new(key.trim()))
        .await
        .map_err(bad_gateway)?;
    Ok(Json(PriceResponse { key, price }))
}

pub(crate) async fn batch_prices(State(state): State<AppState>, Query(query): Query<BatchQuery>) -> ApiResult<PriceQuoteSet> {
    let endpoint = checked_endpoint(&state, query.endpoint.as_deref())?;
    Ok(Json(state.dashboard.fetch_batch_prices(query.keys(), endpoint).await))
}

pub(crate) async fn atomic_prices(State(state): State<AppState>, Query(query): Query<BatchQuery>) -> ApiResult<PriceQuoteSet> {
    let keys = query.keys().ok_or_else(|| bad_request("keys are required"))?;
    Ok(Json(state.dashboard.fetch_prices_atomic(keys).await))
}

pub(crate) async fn derivative_prices(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
) -> ApiResult<PriceQuoteSet> {
    let endpoint = checked_endpoint(&state, query.endpoint.as_deref())?;
    Ok(Json(state.dashboard.fetch_derivative_prices(query.keys(), endpoint).await))
}

pub(crate) async fn silk_price(State(state): State<AppState>, Query(query): Query<BatchQuery>) -> ApiResult<PriceQuoteSet> {
    let endpoint = checked_endpoint(&state, query.endpoint.as_deref())?;
    Ok(Json(state.dashboard.fetch_silk_price(query.keys(), endpoint).await))
}

pub(crate) async fn stkd_exchange_rate(State(state): State<AppState>) -> ApiResult<ExchangeRateResponse> {
    let exchange_rate = state.dashboard.fetch_stkd_exchange_rate().await.map_err(bad_gateway)?;
    Ok(Json(ExchangeRateResponse { exchange_rate }))
}

pub(crate) async fn dshd_price(State(state): State<AppState>) -> Json<DshdPrice> {
    Json(state.dashboard.fetch_dshd_price().await)
}

pub(crate) async fn token_prices(State(state): State<AppState>) -> ApiResult<BTreeMap<String, String>> {
    let prices = state
        .dashboard
        .fetch_all_token_prices_with_names()
        .await
        .map_err(bad_gateway)?;
    Ok(Json(prices))
}

pub(crate) async fn shadeswap_pools(State(state): State<AppState>) -> Json<Vec<Pool>> {
    Json(state.dashboard.fetch_all_shade_swap_pools().await)
}

pub(crate) async fn redemption_rates(State(state): State<AppState>) -> ApiResult<RedemptionRateSet> {
    let rates = state.dashboard.fetch_redemption_rates().await.map_err(bad_gateway)?;
    Ok(Json(rates))
}

pub(crate) async fn redemption_rate_tia(State(state): State<AppState>) -> Json<RateResponse> {
    Json(RateResponse {
        rate: state.dashboard.fetch_redemption_rate_for_tia().await,
    })
}

pub(crate) async fn all_redemption_rates(State(state): State<AppState>) -> Json<RedemptionRateSet> {
    Json(state.dashboard.fetch_all_redemption_rates().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use yn_api_types::{ChainId, WalletAddress};
    use yn_chain_client::{
        ChainClient, ChainClientFactory, ChainError, ChainQuerier, ContractRef, GraphQlPrice, GraphQlToken,
        HostZonePage, HostZoneSource, PageRequest, PriceService, ProposalPage,
    };
    use yn_dashboard_core::{Dashboard, DashboardConfig, DashboardContext};
    use yn_wallet::{OfflineSigner, WalletConnector};

    /// Node that knows one oracle key and has no proposals.
    struct FakeNode;

    #[async_trait]
    impl ChainQuerier for FakeNode {
        async fn gov_proposals(&self, _page: &PageRequest) -> yn_chain_client::Result<ProposalPage> {
            Ok(ProposalPage::default())
        }

        async fn query_contract(&self, _contract: &ContractRef, query: &Value) -> yn_chain_client::Result<Value> {
            match query["get_price"]["key"].as_str() {
                Some("BTC") => Ok(json!({ "key": "BTC", "data": { "rate": "65000500000000000000000" } })),
                _ => Err(ChainError::Network {
                    url: "http://node".to_owned(),
                    message: "connection reset".to_owned(),
                }),
            }
        }
    }

    /// Records the endpoint of every client it builds.
    #[derive(Default)]
    struct FakeFactory {
        built: Arc<Mutex<Vec<String>>>,
    }

    impl ChainClientFactory for FakeFactory {
        fn create_client(
            &self,
            endpoint: &str,
            chain_id: &ChainId,
            signer: Option<Arc<dyn OfflineSigner>>,
            wallet_address: Option<WalletAddress>,
        ) -> yn_chain_client::Result<ChainClient> {
            self.built.lock().unwrap().push(endpoint.to_owned());
            Ok(ChainClient::new(endpoint, chain_id.clone(), Arc::new(FakeNode)).with_wallet(signer, wallet_address))
        }
    }

    struct OfflinePrices;

    #[async_trait]
    impl PriceService for OfflinePrices {
        async fn pools(&self) -> yn_chain_client::Result<Vec<Pool>> {
            Err(ChainError::GraphQl("offline".to_owned()))
        }

        async fn tokens(&self) -> yn_chain_client::Result<Vec<GraphQlToken>> {
            Err(ChainError::GraphQl("offline".to_owned()))
        }

        async fn prices(&self, _ids: &[String]) -> yn_chain_client::Result<Vec<GraphQlPrice>> {
            Err(ChainError::GraphQl("offline".to_owned()))
        }
    }

    struct OfflineZones;

    #[async_trait]
    impl HostZoneSource for OfflineZones {
        async fn host_zones(&self, _page: &PageRequest) -> yn_chain_client::Result<HostZonePage> {
            Err(ChainError::Status {
                url: "http://stride".to_owned(),
                status: 503,
                body: "unavailable".to_owned(),
            })
        }
    }

    fn test_app() -> axum::Router {
        test_app_with(FakeFactory::default())
    }

    fn test_app_with(factory: FakeFactory) -> axum::Router {
        let ctx = DashboardContext {
            config: DashboardConfig::default(),
            wallet: WalletConnector::unavailable(),
            clients: Arc::new(factory),
            price_service: Arc::new(OfflinePrices),
            host_zones: Arc::new(OfflineZones),
            host_zone_snapshot: Arc::new(OfflineZones),
        };
        app(AppState {
            dashboard: Arc::new(Dashboard::new(ctx)),
        })
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        get_from(test_app(), uri).await
    }

    async fn get_from(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "dashboard-service");
    }

    #[tokio::test]
    async fn functions_lists_contract() {
        let (_, body) = get("/functions").await;
        let names = body["functions"].as_array().unwrap();
        assert_eq!(names.len(), EXPORTED_FUNCTIONS.len());
        assert!(names.contains(&json!("fetchAllRedemptionRates")));
    }

    #[tokio::test]
    async fn batch_prices_parse_keys() {
        let (status, body) = get("/prices/batch?keys=BTC,%20ATOM,,").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prices"]["BTC"], "65000.5000");
        assert_eq!(body["prices"]["ATOM"], "No Data");
        assert_eq!(body["prices"].as_object().unwrap().len(), 2);
        assert!(body.get("fetchedAt").is_some());
    }

    #[tokio::test]
    async fn oracle_price_errors_are_bad_gateway() {
        let (status, body) = get("/prices/oracle/BTC").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"], "65000.5000");

        let (status, body) = get("/prices/shd").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn atomic_prices_require_keys() {
        let (status, _) = get("/prices/batch/atomic").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sentinel_routes_degrade() {
        let (status, body) = get("/gov/proposals?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        assert_eq!(get("/shadeswap/pools").await.1, json!([]));
        assert_eq!(get("/stride/redemption-rates/all").await.1, json!({}));
        assert_eq!(get("/stride/redemption-rates/tia").await.1["rate"], 1.0);
        assert!(get("/prices/dshd").await.1["error"].is_string());
    }

    #[tokio::test]
    async fn failing_lookups_surface_errors() {
        assert_eq!(get("/prices/tokens").await.0, StatusCode::BAD_GATEWAY);
        assert_eq!(get("/stride/redemption-rates").await.0, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unconfigured_endpoints_are_rejected() {
        let factory = FakeFactory::default();
        let built = factory.built.clone();
        let app = test_app_with(factory);

        for uri in [
            "/prices/batch?keys=BTC&endpoint=http://10.0.0.1",
            "/prices/derivatives?endpoint=http%3A%2F%2F169.254.169.254%2Flatest%2Fmeta-data",
            "/prices/silk?endpoint=http://localhost:6379",
            "/gov/proposals?limit=5&endpoint=http://internal.svc:8080",
        ] {
            let (status, body) = get_from(app.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].as_str().unwrap().contains("allow-list"));
        }
        assert!(built.lock().unwrap().is_empty());

        let (status, body) = get_from(app, "/prices/batch?keys=BTC&endpoint=https://api.yolonode.com/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prices"]["BTC"], "65000.5000");
        assert_eq!(built.lock().unwrap().len(), 1);
    }
}
