use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const SECRET_CHAIN_ID: &str = "secret-4";

/// Recorded for a requested price key that has no usable rate.
pub const NO_DATA: &str = "No Data";
/// Recorded for a requested price key whose rate could not be converted.
pub const ERROR_FORMATTING: &str = "Error Formatting";

pub const UNTITLED_PROPOSAL: &str = "Untitled Proposal";
pub const NO_DESCRIPTION: &str = "No description available";
pub const UNKNOWN_END_DATE: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn secret() -> Self {
        Self(SECRET_CHAIN_ID.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbol identifying an oracle price feed, e.g. `SHD` or `stkd-SCRT`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct OracleKey(pub String);

impl OracleKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OracleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Governance proposal in display form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub voting_end_time: Option<DateTime<Utc>>,
    /// `voting_end_time` rendered for display, or `"Unknown"`.
    pub voting_end_label: String,
    pub submit_time: DateTime<Utc>,
    /// The upstream record, untouched.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuoteSet {
    pub prices: BTreeMap<String, String>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PriceQuoteSet {
    /// A set where every requested key carries the `"No Data"` sentinel.
    pub fn unavailable<'a>(keys: impl IntoIterator<Item = &'a OracleKey>, error: impl Into<String>) -> Self {
        Self {
            prices: keys
                .into_iter()
                .map(|key| (key.0.clone(), NO_DATA.to_owned()))
                .collect(),
            fetched_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Chain key to redemption rate (derivative per underlying).
pub type RedemptionRateSet = BTreeMap<String, f64>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: String,
    pub token0_id: String,
    pub token1_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivativeInfo {
    pub price: String,
    pub exchange_rate: f64,
    pub total_derivative_token_supply: Option<String>,
    pub bonded_scrt: Option<String>,
}
