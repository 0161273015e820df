//! Domain types for the pricing engine.
//!
//! These are the validated, typed forms of incoming requests and the results
//! the engine produces. Nothing here is persisted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How technicians travel to the job site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    #[serde(rename = "mobil", alias = "car")]
    Car,
    #[serde(rename = "motor", alias = "motorcycle")]
    Motorcycle,
}

impl Transport {
    pub fn other(self) -> Transport {
        match self {
            Transport::Car => Transport::Motorcycle,
            Transport::Motorcycle => Transport::Car,
        }
    }
}

/// Priced service type.
///
/// The serialized names are the ones used by the proposal templates; the
/// aliases accept the descriptive names as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "inject_spraying", alias = "termite_inject_spray")]
    TermiteInjectSpray,
    #[serde(
        rename = "pipanasi",
        alias = "termite_pipe_injection",
        alias = "pipe_injection"
    )]
    TermitePipeInjection,
    #[serde(
        rename = "refill_pipanasi",
        alias = "termite_pipe_refill",
        alias = "pipe_refill"
    )]
    TermitePipeRefill,
    #[serde(rename = "spraying", alias = "termite_spray", alias = "spray")]
    TermiteSpray,
    #[serde(rename = "baiting")]
    Baiting,
    #[serde(rename = "general_pest_control")]
    GeneralPestControl,
    #[serde(rename = "gprc_bundle")]
    GprcBundle,
}

/// Labor-estimation class of a service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaborClass {
    /// Baiting and rodent work.
    Baiting,
    /// Spraying, injection, general pest control and bundles.
    Treatment,
}

impl ServiceType {
    pub const ALL: [ServiceType; 7] = [
        ServiceType::TermiteInjectSpray,
        ServiceType::TermitePipeInjection,
        ServiceType::TermitePipeRefill,
        ServiceType::TermiteSpray,
        ServiceType::Baiting,
        ServiceType::GeneralPestControl,
        ServiceType::GprcBundle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::TermiteInjectSpray => "inject_spraying",
            ServiceType::TermitePipeInjection => "pipanasi",
            ServiceType::TermitePipeRefill => "refill_pipanasi",
            ServiceType::TermiteSpray => "spraying",
            ServiceType::Baiting => "baiting",
            ServiceType::GeneralPestControl => "general_pest_control",
            ServiceType::GprcBundle => "gprc_bundle",
        }
    }

    pub fn labor_class(self) -> LaborClass {
        match self {
            ServiceType::Baiting => LaborClass::Baiting,
            _ => LaborClass::Treatment,
        }
    }

    /// Termite treatments that consume soil chemical and can be compared
    /// per chemical.
    pub fn supports_chemical_comparison(self) -> bool {
        matches!(
            self,
            ServiceType::TermiteInjectSpray
                | ServiceType::TermitePipeInjection
                | ServiceType::TermitePipeRefill
                | ServiceType::TermiteSpray
        )
    }

    /// Service type whose inputs are written to the calculation template.
    ///
    /// Pipe injection is priced as a markup on the inject-spray computation.
    pub fn surface_service_type(self) -> ServiceType {
        match self {
            ServiceType::TermitePipeInjection => ServiceType::TermiteInjectSpray,
            other => other,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown service type: {0}")]
pub struct UnknownServiceType(pub String);

impl FromStr for ServiceType {
    type Err = UnknownServiceType;

    /// Case-insensitive; accepts both template names and descriptive names
    /// (`Inject_Spraying`, `termite_spray`, `Pipanasi`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let service = match key.as_str() {
            "inject_spraying" | "termite_inject_spray" | "inject_spray" => {
                ServiceType::TermiteInjectSpray
            }
            "pipanasi" | "termite_pipe_injection" | "pipe_injection" => {
                ServiceType::TermitePipeInjection
            }
            "refill_pipanasi" | "termite_pipe_refill" | "pipe_refill" => {
                ServiceType::TermitePipeRefill
            }
            "spraying" | "termite_spray" | "spray" => ServiceType::TermiteSpray,
            "baiting" => ServiceType::Baiting,
            "general_pest_control" | "gpc" => ServiceType::GeneralPestControl,
            "gprc_bundle" | "gprc" => ServiceType::GprcBundle,
            _ => return Err(UnknownServiceType(s.to_string())),
        };
        Ok(service)
    }
}

/// A validated pricing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub client_name: String,
    pub address: String,
    /// Treated area in m², always > 0.
    pub area_treatment: f64,
    pub distance_km: f64,
    pub floor_count: u32,
    pub monitoring_months: u32,
    pub transport: Transport,
    pub service_type: ServiceType,
    /// Service-specific items (preparation set).
    pub consumables: BTreeMap<String, f64>,
    /// Shared boilerplate items (additional set).
    pub additional_items: BTreeMap<String, f64>,
}

impl ServiceRequest {
    pub fn with_service_type(&self, service_type: ServiceType) -> ServiceRequest {
        ServiceRequest {
            service_type,
            ..self.clone()
        }
    }
}

/// Estimated job duration and crew size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaborEstimate {
    pub days: u32,
    pub workers: u32,
}

/// Final and display prices after the service-specific adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceAdjustment {
    pub final_price: Decimal,
    pub psychological_price: Decimal,
}

/// Isolated unit price for one soil chemical.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparativePrice {
    pub price: i64,
    pub formatted_price: String,
    pub auto_quantity_liter: f64,
}

/// Full quote for one service request.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub service_type: ServiceType,
    pub base_price: Decimal,
    pub final_price: Decimal,
    pub psychological_price: Decimal,
    pub guarantee_period: &'static str,
    pub labor: LaborEstimate,
    pub comparative_breakdown: Option<BTreeMap<String, ComparativePrice>>,
}

/// General pest control + rodent control bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct GprcQuote {
    pub gpc_price: Decimal,
    pub rc_price: Decimal,
    pub bundle_price: Decimal,
    pub final_price: Decimal,
    pub psychological_price: Decimal,
    pub discount_percentage: u32,
    pub guarantee_period: &'static str,
}
