//! Oracle and price-service lookups.
//!
//! Oracle rates are 18-decimal fixed-point integers. They are converted with
//! integer arithmetic and shown with [`DISPLAY_DECIMALS`] places, rounding
//! half up. Batch lookups never fail as a whole: each requested key ends up
//! with either a formatted price or one of the sentinels.

use chrono::Utc;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info, warn};
use yn_api_types::{DerivativeInfo, ERROR_FORMATTING, NO_DATA, OracleKey, Pool, PriceQuoteSet};
use yn_chain_client::{ChainClient, ContractRef, PriceService};

use crate::error::{FetchError, Result};

/// Decimal places of oracle rates.
pub const RATE_DECIMALS: u32 = 18;
/// Decimal places of the staking derivative's price.
pub const STKD_PRICE_DECIMALS: u32 = 6;
/// Decimal places shown for every price.
pub const DISPLAY_DECIMALS: u32 = 4;

/// Renders an unsigned fixed-point integer string with `digits` decimals.
pub fn format_fixed_point(raw: &str, scale: u32, digits: u32) -> Result<String> {
    let invalid = |reason: &str| FetchError::Formatting {
        rate: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not an unsigned integer"));
    }
    let value: u128 = trimmed.parse().map_err(|_| invalid("out of range"))?;
    let divisor = 10u128
        .checked_pow(scale)
        .ok_or_else(|| invalid("scale out of range"))?;

    let mut whole = value / divisor;
    let fraction = value % divisor;
    if digits == 0 {
        if fraction * 2 >= divisor {
            whole += 1;
        }
        return Ok(whole.to_string());
    }

    let shown = if digits >= scale {
        fraction * 10u128.pow(digits - scale)
    } else {
        let unit = 10u128.pow(scale - digits);
        let mut shown = fraction / unit;
        if (fraction % unit) * 2 >= unit {
            shown += 1;
        }
        if shown == 10u128.pow(digits) {
            whole += 1;
            shown = 0;
        }
        shown
    };

    Ok(format!("{whole}.{shown:0width$}", width = digits as usize))
}

/// Oracle rate as a display price.
pub fn format_rate(rate: &str) -> Result<String> {
    format_fixed_point(rate, RATE_DECIMALS, DISPLAY_DECIMALS)
}

pub fn format_decimal(value: f64) -> String {
    format!("{value:.prec$}", prec = DISPLAY_DECIMALS as usize)
}

fn price_query(key: &OracleKey) -> Value {
    json!({ "get_price": { "key": key.as_str() } })
}

/// `data.rate` of an oracle answer, or a top-level `rate`.
fn extract_rate(response: &Value) -> Option<String> {
    let rate = response
        .get("data")
        .and_then(|data| data.get("rate"))
        .or_else(|| response.get("rate"))?;
    match rate {
        Value::String(rate) if !rate.is_empty() => Some(rate.clone()),
        Value::Number(rate) => Some(rate.to_string()),
        _ => None,
    }
}

fn quote_from_rate(key: &OracleKey, rate: Option<String>) -> String {
    let Some(rate) = rate else {
        warn!("no rate for {} in oracle response", key);
        return NO_DATA.to_owned();
    };
    match format_rate(&rate) {
        Ok(price) => price,
        Err(err) => {
            error!("failed to format price for {}: {}", key, err);
            ERROR_FORMATTING.to_owned()
        }
    }
}

/// Single oracle lookup. Unlike the batch calls, failures surface as errors.
pub async fn fetch_price(client: &ChainClient, oracle: &ContractRef, key: &OracleKey) -> Result<String> {
    let response = client.query_contract(oracle, &price_query(key)).await.map_err(|err| {
        error!("error fetching {} price: {}", key, err);
        err
    })?;
    let rate = extract_rate(&response)
        .ok_or_else(|| FetchError::MalformedResponse(format!("oracle returned no rate for {key}")))?;
    format_rate(&rate)
}

/// One oracle query per distinct key.
pub async fn fetch_batch_prices(client: &ChainClient, oracle: &ContractRef, keys: &[OracleKey]) -> PriceQuoteSet {
    let mut prices = BTreeMap::new();

    for key in keys {
        if prices.contains_key(key.as_str()) {
            continue;
        }
        let quote = match client.query_contract(oracle, &price_query(key)).await {
            Ok(response) => quote_from_rate(key, extract_rate(&response)),
            Err(err) => {
                warn!("oracle query for {} failed: {}", key, err);
                NO_DATA.to_owned()
            }
        };
        prices.insert(key.as_str().to_owned(), quote);
    }

    info!("fetched {} oracle prices", prices.len());
    PriceQuoteSet {
        prices,
        fetched_at: Utc::now(),
        error: None,
    }
}

/// All keys in one `get_prices` query; a failed query fails the whole set.
pub async fn fetch_prices_atomic(client: &ChainClient, oracle: &ContractRef, keys: &[OracleKey]) -> Result<PriceQuoteSet> {
    let names: Vec<&str> = keys.iter().map(OracleKey::as_str).collect();
    let response = client
        .query_contract(oracle, &json!({ "get_prices": { "keys": names } }))
        .await?;
    let entries = response
        .as_array()
        .ok_or_else(|| FetchError::MalformedResponse("get_prices did not return a list".to_owned()))?;

    let by_key: HashMap<&str, &Value> = entries
        .iter()
        .filter_map(|entry| Some((entry.get("key")?.as_str()?, entry)))
        .collect();

    let prices = keys
        .iter()
        .map(|key| {
            let rate = by_key.get(key.as_str()).and_then(|entry| extract_rate(entry));
            (key.as_str().to_owned(), quote_from_rate(key, rate))
        })
        .collect();

    Ok(PriceQuoteSet {
        prices,
        fetched_at: Utc::now(),
        error: None,
    })
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// stkd-SCRT staking info at `time` (unix seconds).
pub async fn fetch_stkd_exchange_rate(client: &ChainClient, stkd: &ContractRef, time: i64) -> Result<DerivativeInfo> {
    let response = client
        .query_contract(stkd, &json!({ "staking_info": { "time": time } }))
        .await
        .map_err(|err| {
            error!("error fetching stkd-SCRT exchange rate: {}", err);
            err
        })?;
    let info = response.get("staking_info").unwrap_or(&response);

    let price = optional_string(info.get("price"))
        .ok_or_else(|| FetchError::MalformedResponse("staking_info has no price".to_owned()))?;
    let exact = format_fixed_point(&price, STKD_PRICE_DECIMALS, STKD_PRICE_DECIMALS)?;
    let exchange_rate = exact.parse::<f64>().map_err(|err| FetchError::Formatting {
        rate: price.clone(),
        reason: err.to_string(),
    })?;

    Ok(DerivativeInfo {
        price,
        exchange_rate,
        total_derivative_token_supply: optional_string(info.get("total_derivative_token_supply")),
        bonded_scrt: optional_string(info.get("scrt_under_management").or_else(|| info.get("bonded_scrt"))),
    })
}

pub async fn fetch_all_pools(service: &dyn PriceService) -> Result<Vec<Pool>> {
    Ok(service.pools().await?)
}

/// Price of a single price-service id.
pub async fn fetch_dshd_price(service: &dyn PriceService, price_id: &str) -> Result<String> {
    let prices = service.prices(&[price_id.to_owned()]).await?;
    prices
        .into_iter()
        .find(|price| price.id == price_id)
        .and_then(|price| price.value)
        .map(format_decimal)
        .ok_or_else(|| FetchError::MalformedResponse("No price data available".to_owned()))
}

/// Token symbol to price, for every token whose first price id has a quote.
pub async fn fetch_token_prices_with_names(service: &dyn PriceService) -> Result<BTreeMap<String, String>> {
    let tokens = service.tokens().await?;
    let priced: Vec<(&str, &str)> = tokens
        .iter()
        .filter_map(|token| Some((token.symbol.as_str(), token.price_ids.first()?.as_str())))
        .collect();
    if priced.is_empty() {
        warn!("no tokens carry a price id");
        return Ok(BTreeMap::new());
    }

    let ids: Vec<String> = priced.iter().map(|(_, id)| (*id).to_owned()).collect();
    let quotes: HashMap<String, Option<f64>> = service
        .prices(&ids)
        .await?
        .into_iter()
        .map(|price| (price.id, price.value))
        .collect();

    let mut prices = BTreeMap::new();
    for (symbol, id) in priced {
        if let Some(value) = quotes.get(id) {
            let quote = value.map(format_decimal).unwrap_or_else(|| NO_DATA.to_owned());
            prices.insert(symbol.to_owned(), quote);
        }
    }
    info!("priced {} of {} tokens", prices.len(), tokens.len());
    Ok(prices)
}
