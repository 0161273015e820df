//! Response DTOs for pricing API endpoints.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::calculators::format_rupiah;
use super::models::{ComparativePrice, GprcQuote, LaborEstimate, PriceQuote, ServiceType};

/// Money value for JSON responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoneyResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub formatted: String,
}

impl From<Decimal> for MoneyResponse {
    fn from(amount: Decimal) -> Self {
        Self {
            amount,
            formatted: format_rupiah(amount),
        }
    }
}

/// Response for the raw price calculation
#[derive(Debug, Serialize)]
pub struct CalculatePriceResponse {
    pub success: bool,
    pub final_price: f64,
    pub formatted_final_price: String,
}

/// Comparative prices keyed by chemical name
pub type ComparativePricesResponse = BTreeMap<String, ComparativePrice>;

/// Response for a full quote
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub service_type: ServiceType,
    pub base_price: MoneyResponse,
    pub final_price: MoneyResponse,
    pub psychological_price: MoneyResponse,
    pub guarantee_period: String,
    pub labor: LaborEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparative_breakdown: Option<ComparativePricesResponse>,
}

impl From<PriceQuote> for QuoteResponse {
    fn from(quote: PriceQuote) -> Self {
        Self {
            service_type: quote.service_type,
            base_price: quote.base_price.into(),
            final_price: quote.final_price.into(),
            psychological_price: quote.psychological_price.into(),
            guarantee_period: quote.guarantee_period.to_string(),
            labor: quote.labor,
            comparative_breakdown: quote.comparative_breakdown,
        }
    }
}

/// Response for the GPRC bundle
#[derive(Debug, Serialize)]
pub struct GprcQuoteResponse {
    pub gpc_price: MoneyResponse,
    pub rc_price: MoneyResponse,
    pub bundle_price: MoneyResponse,
    pub final_price: MoneyResponse,
    pub psychological_price: MoneyResponse,
    pub discount_percentage: u32,
    pub guarantee_period: String,
}

impl From<GprcQuote> for GprcQuoteResponse {
    fn from(quote: GprcQuote) -> Self {
        Self {
            gpc_price: quote.gpc_price.into(),
            rc_price: quote.rc_price.into(),
            bundle_price: quote.bundle_price.into(),
            final_price: quote.final_price.into(),
            psychological_price: quote.psychological_price.into(),
            discount_percentage: quote.discount_percentage,
            guarantee_period: quote.guarantee_period.to_string(),
        }
    }
}
