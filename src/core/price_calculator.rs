//! Shipping, VAT and totals for a USD price shown in a target currency.

use crate::domain::model::PriceBreakdown;
use crate::domain::ports::RateSource;

/// Inclusive upper bound in USD → shipping cost in USD, ascending.
const SHIPPING_TIERS: [(f64, f64); 6] = [
    (50.0, 17.99),
    (100.0, 19.99),
    (150.0, 21.99),
    (200.0, 23.99),
    (250.0, 25.99),
    (300.0, 27.99),
];

const TOP_TIER_COST: f64 = 30.00;

/// Shipping cost in USD: the first tier whose bound is at least `amount_usd`.
pub fn shipping_for(amount_usd: f64) -> f64 {
    SHIPPING_TIERS
        .iter()
        .find(|(max, _)| amount_usd <= *max)
        .map(|(_, cost)| *cost)
        .unwrap_or(TOP_TIER_COST)
}

/// `None` when `target` has no rate.
pub fn breakdown<R: RateSource + ?Sized>(
    rates: &R,
    amount_usd: f64,
    target: &str,
    vat_rate: f64,
) -> Option<PriceBreakdown> {
    let rate = rates.rate(target)?;

    let base = amount_usd * rate;
    let shipping = shipping_for(amount_usd) * rate;
    let vat = (base + shipping) * vat_rate;

    Some(PriceBreakdown {
        base,
        shipping,
        vat,
        total: base + shipping + vat,
    })
}
