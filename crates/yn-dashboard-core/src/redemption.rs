//! Liquid-staking redemption rates from Stride host zones.

use tracing::{error, info, warn};
use yn_api_types::RedemptionRateSet;
use yn_chain_client::{HostZoneSource, PageRequest, PageResponse};
use yn_chain_stride::{CELESTIA_CHAIN_ID, ST_TIA_KEY};

use crate::error::Result;

pub const MAX_HOST_ZONE_PAGES: usize = 50;
/// stTIA rate used when the snapshot has nothing usable.
pub const FALLBACK_REDEMPTION_RATE: f64 = 1.0;

const RATE_SCALE: f64 = 1e18;

/// Decimal strings are taken as-is; bare integers are 18-decimal fixed point.
pub fn parse_redemption_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let rate = if raw.contains('.') {
        raw.parse::<f64>().ok()?
    } else {
        raw.parse::<u128>().ok()? as f64 / RATE_SCALE
    };
    rate.is_finite().then_some(rate)
}

/// Plain float, as the snapshot reports it.
fn parse_snapshot_rate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|rate| rate.is_finite())
}

/// Every host zone's last redemption rate, keyed by chain id.
pub async fn fetch_redemption_rates(source: &dyn HostZoneSource) -> Result<RedemptionRateSet> {
    let mut rates = RedemptionRateSet::new();
    let mut next_key: Option<String> = None;

    for _ in 0..MAX_HOST_ZONE_PAGES {
        let page = source
            .host_zones(&PageRequest::default().after(next_key.take()))
            .await
            .inspect_err(|err| error!("error fetching redemption rates: {}", err))?;

        for zone in &page.host_zone {
            match zone.last_redemption_rate.as_deref().map(|raw| (raw, parse_redemption_rate(raw))) {
                Some((_, Some(rate))) => {
                    rates.insert(zone.chain_id.clone(), rate);
                }
                Some((raw, None)) => warn!("unparseable redemption rate {:?} for {}", raw, zone.chain_id),
                None => {}
            }
        }

        match page.pagination.as_ref().and_then(PageResponse::next) {
            Some(key) => next_key = Some(key.to_owned()),
            None => {
                info!("fetched {} redemption rates", rates.len());
                return Ok(rates);
            }
        }
    }

    warn!("host zone listing exceeded {} pages; returning partial rates", MAX_HOST_ZONE_PAGES);
    Ok(rates)
}

/// stTIA redemption rate from the snapshot, or [`FALLBACK_REDEMPTION_RATE`].
pub async fn fetch_redemption_rate_for_tia(snapshot: &dyn HostZoneSource) -> f64 {
    let page = match snapshot.host_zones(&PageRequest::default()).await {
        Ok(page) => page,
        Err(err) => {
            error!("error fetching stTIA redemption rate: {}", err);
            return FALLBACK_REDEMPTION_RATE;
        }
    };

    page.host_zone
        .iter()
        .find(|zone| zone.chain_id == CELESTIA_CHAIN_ID)
        .and_then(|zone| zone.last_redemption_rate.as_deref())
        .and_then(parse_snapshot_rate)
        .unwrap_or_else(|| {
            warn!("no stTIA redemption rate in snapshot; using {}", FALLBACK_REDEMPTION_RATE);
            FALLBACK_REDEMPTION_RATE
        })
}

/// Listing and snapshot fetched concurrently; the snapshot's stTIA rate
/// is added under its own key.
pub async fn fetch_all_redemption_rates(
    primary: &dyn HostZoneSource,
    snapshot: &dyn HostZoneSource,
) -> Result<RedemptionRateSet> {
    let (rates, tia) = tokio::join!(fetch_redemption_rates(primary), fetch_redemption_rate_for_tia(snapshot));
    let mut rates = rates?;
    rates.insert(ST_TIA_KEY.to_owned(), tia);
    Ok(rates)
}
