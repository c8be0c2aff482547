//! Shade price service over GraphQL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{error, info};
use yn_api_types::Pool;
use yn_chain_client::http;
use yn_chain_client::{ChainError, GraphQlPrice, GraphQlToken, PriceService, Result};

pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://prodv1.securesecrets.org/graphql";

const POOLS_QUERY: &str = "query getPools { pools { id token0Id token1Id } }";

const TOKENS_QUERY: &str =
    "query getTokens { tokens { id name symbol description logoPath PriceToken { priceId } } }";

const PRICES_QUERY: &str = "query getPrices($ids: [String!]) { prices(query: { ids: $ids }) { id value } }";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'a> {
    operation_name: &'a str,
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct PoolsData {
    #[serde(default)]
    pools: Vec<Pool>,
}

#[derive(Debug, Deserialize)]
struct PriceTokenRow {
    #[serde(rename = "priceId")]
    price_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenRow {
    id: String,
    #[serde(default)]
    name: String,
    symbol: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    logo_path: Option<String>,
    #[serde(default, rename = "PriceToken")]
    price_token: Vec<PriceTokenRow>,
}

#[derive(Debug, Deserialize)]
struct TokensData {
    #[serde(default)]
    tokens: Vec<TokenRow>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    id: String,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PricesData {
    #[serde(default)]
    prices: Vec<PriceRow>,
}

pub struct ShadeGraphQl {
    endpoint: String,
    http: reqwest::Client,
}

impl ShadeGraphQl {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            endpoint: http::normalize_endpoint(endpoint)?,
            http: http::build_http_client(timeout)?,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation_name: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let request = GraphQlRequest {
            operation_name,
            query,
            variables,
        };
        let response: GraphQlResponse<T> = http::post_json(&self.http, &self.endpoint, &request).await?;

        if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
            error!("GraphQL errors ({}): {:?}", operation_name, errors);
            return Err(ChainError::GraphQl(serde_json::Value::Array(errors).to_string()));
        }

        response
            .data
            .ok_or_else(|| ChainError::MalformedResponse(format!("{operation_name}: response has no data")))
    }
}

#[async_trait]
impl PriceService for ShadeGraphQl {
    async fn pools(&self) -> Result<Vec<Pool>> {
        let data: PoolsData = self.execute("getPools", POOLS_QUERY, serde_json::json!({})).await?;
        info!("fetched {} pools", data.pools.len());
        Ok(data.pools)
    }

    async fn tokens(&self) -> Result<Vec<GraphQlToken>> {
        let data: TokensData = self.execute("getTokens", TOKENS_QUERY, serde_json::json!({})).await?;
        info!("fetched {} tokens", data.tokens.len());

        Ok(data
            .tokens
            .into_iter()
            .map(|row| GraphQlToken {
                id: row.id,
                name: row.name,
                symbol: row.symbol,
                description: row.description,
                logo_path: row.logo_path,
                price_ids: row.price_token.into_iter().map(|p| p.price_id).collect(),
            })
            .collect())
    }

    async fn prices(&self, ids: &[String]) -> Result<Vec<GraphQlPrice>> {
        let data: PricesData = self
            .execute("getPrices", PRICES_QUERY, serde_json::json!({ "ids": ids }))
            .await?;

        Ok(data
            .prices
            .into_iter()
            .map(|row| GraphQlPrice {
                id: row.id,
                value: row.value,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/graphql")
    }

    fn service(endpoint: &str) -> ShadeGraphQl {
        ShadeGraphQl::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn tokens_flatten_price_ids() {
        let router = Router::new().route(
            "/graphql",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["operationName"], "getTokens");
                Json(serde_json::json!({
                    "data": { "tokens": [
                        { "id": "t1", "name": "Shade", "symbol": "SHD", "PriceToken": [{ "priceId": "p1" }] },
                        { "id": "t2", "name": "Nothing", "symbol": "NIL", "PriceToken": [] }
                    ] }
                }))
            }),
        );
        let endpoint = serve(router).await;

        let tokens = service(&endpoint).tokens().await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].price_ids, vec!["p1".to_owned()]);
        assert!(tokens[1].price_ids.is_empty());
    }

    #[tokio::test]
    async fn prices_pass_ids_as_variables() {
        let router = Router::new().route(
            "/graphql",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["variables"]["ids"], serde_json::json!(["p1", "p2"]));
                Json(serde_json::json!({
                    "data": { "prices": [ { "id": "p1", "value": 1.5 }, { "id": "p2", "value": null } ] }
                }))
            }),
        );
        let endpoint = serve(router).await;

        let prices = service(&endpoint)
            .prices(&["p1".to_owned(), "p2".to_owned()])
            .await
            .unwrap();
        assert_eq!(prices[0].value, Some(1.5));
        assert_eq!(prices[1].value, None);
    }

    #[tokio::test]
    async fn graphql_errors_fail_the_call() {
        let router = Router::new().route(
            "/graphql",
            post(|| async {
                Json(serde_json::json!({ "data": null, "errors": [{ "message": "boom" }] }))
            }),
        );
        let endpoint = serve(router).await;

        let err = service(&endpoint).pools().await.unwrap_err();
        assert!(matches!(err, ChainError::GraphQl(message) if message.contains("boom")));
    }
}
