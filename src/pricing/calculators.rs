//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no formula surface, no database access.
//! Everything here works on values already read back from the calculation
//! template.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::warn;

use super::models::{LaborClass, LaborEstimate, PriceAdjustment, ServiceType};

/// Markup applied to the inject-spray price for pipe injection.
pub const PIPE_INJECTION_MARKUP: Decimal = dec!(1.3);

/// Flat per-m² rate for termite spraying.
pub const SPRAY_RATE_PER_M2: Decimal = dec!(12250);

/// Flat per-m² rate for pipe refills.
pub const PIPE_REFILL_RATE_PER_M2: Decimal = dec!(33600);

/// Display price multiplier.
pub const PSYCHOLOGICAL_MULTIPLIER: Decimal = dec!(1.2);

/// GPRC bundle discount.
pub const BUNDLE_DISCOUNT_PERCENT: u32 = 10;

/// Round to specified decimal places, halves away from zero.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use hama_pricing::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(3));
/// assert_eq!(round_money(dec!(-2.5), 0), dec!(-3));
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a surface number to a Decimal. `None` for NaN and infinities.
pub fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value)
}

/// Apply the service-specific adjustment to a raw price.
///
/// # Arguments
/// * `service_type` - Priced service type
/// * `raw_price` - Unadjusted price (template output, or a derived price)
/// * `area` - Treated area in m², used by the flat-rate services
///
/// # Returns
/// Final and psychological price, both rounded to whole rupiah. The
/// psychological price is derived from the unrounded final price. `None`
/// when either price does not fit in a `Decimal`.
pub fn apply_service_adjustment(
    service_type: ServiceType,
    raw_price: Decimal,
    area: Decimal,
) -> Option<PriceAdjustment> {
    let final_price = match service_type {
        ServiceType::TermitePipeInjection => raw_price.checked_mul(PIPE_INJECTION_MARKUP)?,
        ServiceType::TermiteSpray => area.checked_mul(SPRAY_RATE_PER_M2)?,
        ServiceType::TermitePipeRefill => area.checked_mul(PIPE_REFILL_RATE_PER_M2)?,
        ServiceType::TermiteInjectSpray
        | ServiceType::Baiting
        | ServiceType::GeneralPestControl
        | ServiceType::GprcBundle => raw_price,
    };
    let psychological_price = final_price.checked_mul(PSYCHOLOGICAL_MULTIPLIER)?;

    Some(PriceAdjustment {
        final_price: round_money(final_price, 0),
        psychological_price: round_money(psychological_price, 0),
    })
}

/// Guarantee period offered for a service type.
///
/// Must be kept in step with [`apply_service_adjustment`].
pub fn guarantee_period(service_type: ServiceType) -> &'static str {
    match service_type {
        ServiceType::TermitePipeInjection => "5 tahun",
        ServiceType::TermiteInjectSpray | ServiceType::TermitePipeRefill => "3 tahun",
        ServiceType::TermiteSpray
        | ServiceType::Baiting
        | ServiceType::GeneralPestControl
        | ServiceType::GprcBundle => "1 tahun",
    }
}

/// Estimate job duration and crew size from treated area.
///
/// Baiting uses a two-step table; everything else uses independent ladders
/// for days and workers.
pub fn estimate_labor(area: f64, service_type: ServiceType) -> LaborEstimate {
    match service_type.labor_class() {
        LaborClass::Baiting => {
            if area >= 1000.0 {
                LaborEstimate { days: 2, workers: 3 }
            } else if area >= 1.0 {
                LaborEstimate { days: 1, workers: 2 }
            } else {
                warn!(area, service_type = %service_type, "Area outside baiting labor table");
                LaborEstimate { days: 0, workers: 0 }
            }
        }
        LaborClass::Treatment => {
            let days = if area <= 200.0 {
                4
            } else if area <= 400.0 {
                7
            } else if area <= 500.0 {
                10
            } else {
                30
            };
            let workers = if area <= 300.0 {
                2
            } else if area <= 500.0 {
                3
            } else {
                5
            };
            LaborEstimate { days, workers }
        }
    }
}

/// Discounted price of the general pest + rodent control bundle.
pub fn bundle_price(gpc_price: Decimal, rc_price: Decimal) -> Option<Decimal> {
    let factor = Decimal::from(100 - BUNDLE_DISCOUNT_PERCENT) / dec!(100);
    gpc_price.checked_add(rc_price)?.checked_mul(factor)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}

/// Format as whole rupiah: `Rp 1.225.000`.
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = round_money(amount, 0);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let digits = rounded.abs().trunc().to_string();
    format!("Rp {}{}", sign, group_thousands(&digits))
}

/// Format with two decimals in the Indonesian convention: `Rp 1.234.567,89`.
pub fn format_rupiah_with_cents(amount: Decimal) -> String {
    let rounded = round_money(amount, 2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let abs = rounded.abs();
    let whole = abs.trunc();
    let cents = ((abs - whole) * dec!(100)).trunc().to_i64().unwrap_or(0);
    format!(
        "Rp {}{},{:02}",
        sign,
        group_thousands(&whole.to_string()),
        cents
    )
}
