//! YoloNode dashboard browser bridge.
//!
//! Exposes the dashboard's named functions to page scripts. Wallet calls go
//! to the Keplr extension in the page; data calls go to dashboard-service,
//! which returns results with sentinels already applied.

pub mod api;
pub mod dom;
#[cfg(target_arch = "wasm32")]
pub mod keplr;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use yn_wallet::WalletConnector;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

fn connector() -> WalletConnector {
    #[cfg(target_arch = "wasm32")]
    {
        keplr::connector()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        WalletConnector::unavailable()
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// GET `path`, or `fallback` with the error logged.
async fn get_or(path: &str, fallback: serde_json::Value, what: &str) -> Result<JsValue, JsValue> {
    match api::get_json(path).await {
        Ok(value) => to_js(&value),
        Err(err) => {
            gloo_console::error!(format!("error fetching {}: {}", what, err));
            to_js(&fallback)
        }
    }
}

/// GET `path`; failures reject the returned promise.
async fn get_or_reject(path: &str, what: &str) -> Result<JsValue, JsValue> {
    match api::get_json(path).await {
        Ok(value) => to_js(&value),
        Err(err) => {
            gloo_console::error!(format!("error fetching {}: {}", what, err));
            Err(JsValue::from_str(&err))
        }
    }
}

fn keys_param(keys: Option<Vec<String>>) -> Option<String> {
    keys.map(|keys| keys.join(","))
}

/// Resolves to `{signer, address}`, or `null`. Also fires
/// `keplr-wallet-connected` on `window`.
#[wasm_bindgen(js_name = connectKeplrWallet)]
pub async fn connect_keplr_wallet() -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        keplr::connect_wallet().await
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = connector().connect().await;
        JsValue::NULL
    }
}

#[wasm_bindgen(js_name = disconnectKeplrWallet)]
pub fn disconnect_keplr_wallet() {
    connector().disconnect();
    gloo_console::log!("wallet disconnected");
}

/// Resolves to the first account's address, or `""`.
#[wasm_bindgen(js_name = get_wallet_address)]
pub async fn get_wallet_address() -> String {
    connector().wallet_address().await
}

#[wasm_bindgen(js_name = fetchGovernanceProposals)]
pub async fn fetch_governance_proposals(limit: Option<u32>, endpoint: Option<String>) -> Result<JsValue, JsValue> {
    let path = api::with_query(
        "/gov/proposals",
        &[("limit", limit.map(|l| l.to_string())), ("endpoint", endpoint)],
    );
    get_or(&path, serde_json::json!([]), "governance proposals").await
}

#[wasm_bindgen(js_name = fetchSHDPrice)]
pub async fn fetch_shd_price() -> Result<JsValue, JsValue> {
    let body = api::get_json("/prices/shd").await.map_err(|err| {
        gloo_console::error!(format!("error fetching SHD price: {}", err));
        JsValue::from_str(&err)
    })?;
    match body.get("price").and_then(|price| price.as_str()) {
        Some(price) => Ok(JsValue::from_str(price)),
        None => Err(JsValue::from_str("SHD price missing from response")),
    }
}

async fn batch(route: &str, keys: Option<Vec<String>>, endpoint: Option<String>) -> Result<JsValue, JsValue> {
    let path = api::with_query(route, &[("keys", keys_param(keys)), ("endpoint", endpoint)]);
    get_or_reject(&path, route).await
}

#[wasm_bindgen(js_name = fetchBatchPrices)]
pub async fn fetch_batch_prices(keys: Option<Vec<String>>, endpoint: Option<String>) -> Result<JsValue, JsValue> {
    batch("/prices/batch", keys, endpoint).await
}

#[wasm_bindgen(js_name = fetchDerivativePrices)]
pub async fn fetch_derivative_prices(keys: Option<Vec<String>>, endpoint: Option<String>) -> Result<JsValue, JsValue> {
    batch("/prices/derivatives", keys, endpoint).await
}

#[wasm_bindgen(js_name = fetchSilkPrice)]
pub async fn fetch_silk_price(keys: Option<Vec<String>>, endpoint: Option<String>) -> Result<JsValue, JsValue> {
    batch("/prices/silk", keys, endpoint).await
}

#[wasm_bindgen(js_name = fetchSTKDExchangeRate)]
pub async fn fetch_stkd_exchange_rate() -> Result<f64, JsValue> {
    let body = api::get_json("/prices/stkd-exchange-rate").await.map_err(|err| {
        gloo_console::error!(format!("error fetching stkd-SCRT exchange rate: {}", err));
        JsValue::from_str(&err)
    })?;
    body.get("exchange_rate")
        .and_then(|rate| rate.as_f64())
        .ok_or_else(|| JsValue::from_str("exchange rate missing from response"))
}

#[wasm_bindgen(js_name = fetchAllShadeSwapPools)]
pub async fn fetch_all_shade_swap_pools() -> Result<JsValue, JsValue> {
    get_or("/shadeswap/pools", serde_json::json!([]), "ShadeSwap pools").await
}

/// Resolves to `{price}` or `{error}`.
#[wasm_bindgen(js_name = fetchDSHDPrice)]
pub async fn fetch_dshd_price() -> Result<JsValue, JsValue> {
    match api::get_json("/prices/dshd").await {
        Ok(value) => to_js(&value),
        Err(err) => to_js(&serde_json::json!({ "error": err })),
    }
}

/// Resolves to `undefined` when either lookup fails.
#[wasm_bindgen(js_name = fetchAllTokenPricesWithNames)]
pub async fn fetch_all_token_prices_with_names() -> Result<JsValue, JsValue> {
    match api::get_json("/prices/tokens").await {
        Ok(value) => to_js(&value),
        Err(err) => {
            gloo_console::error!(format!("error fetching token prices: {}", err));
            Ok(JsValue::UNDEFINED)
        }
    }
}

#[wasm_bindgen(js_name = fetchRedemptionRates)]
pub async fn fetch_redemption_rates() -> Result<JsValue, JsValue> {
    get_or_reject("/stride/redemption-rates", "redemption rates").await
}

#[wasm_bindgen(js_name = fetchRedemptionRateForTIA)]
pub async fn fetch_redemption_rate_for_tia() -> f64 {
    const FALLBACK: f64 = 1.0;
    match api::get_json("/stride/redemption-rates/tia").await {
        Ok(body) => body.get("rate").and_then(|rate| rate.as_f64()).unwrap_or(FALLBACK),
        Err(err) => {
            gloo_console::error!(format!("error fetching stTIA redemption rate: {}", err));
            FALLBACK
        }
    }
}

#[wasm_bindgen(js_name = fetchAllRedemptionRates)]
pub async fn fetch_all_redemption_rates() -> Result<JsValue, JsValue> {
    get_or("/stride/redemption-rates/all", serde_json::json!({}), "all redemption rates").await
}
