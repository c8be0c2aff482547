//! Dashboard data layer: governance proposals, oracle and GraphQL prices,
//! liquid-staking redemption rates, behind one named-function contract.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod prices;
pub mod proposals;
pub mod redemption;

pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardContext, DshdPrice, EXPORTED_FUNCTIONS};
pub use error::{FetchError, Result};
