//! Domain types for proposal composition.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::models::{ServiceRequest, ServiceType};

/// Service offered on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceCode {
    #[serde(rename = "TC")]
    Tc,
    #[serde(rename = "GPC")]
    Gpc,
    #[serde(rename = "RC")]
    Rc,
    #[serde(rename = "GPRC")]
    Gprc,
}

impl ServiceCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceCode::Tc => "TC",
            ServiceCode::Gpc => "GPC",
            ServiceCode::Rc => "RC",
            ServiceCode::Gprc => "GPRC",
        }
    }

    pub fn parse(value: &str) -> Option<ServiceCode> {
        match value.trim() {
            "TC" => Some(ServiceCode::Tc),
            "GPC" => Some(ServiceCode::Gpc),
            "RC" => Some(ServiceCode::Rc),
            "GPRC" => Some(ServiceCode::Gprc),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceCode::Tc => "Termite Control (Pengendalian Rayap)",
            ServiceCode::Gpc => "General Pest Control (Pengendalian Hama Umum)",
            ServiceCode::Rc => "Rodent Control (Pengendalian Tikus)",
            ServiceCode::Gprc => "GPRC Bundle (Hama Umum + Tikus)",
        }
    }

    /// Pests covered, as shown in combination comparison tables.
    pub fn target_name(self) -> &'static str {
        match self {
            ServiceCode::Tc => "rayap",
            ServiceCode::Gpc => "serangga kecoa, semut, nyamuk, lalat",
            ServiceCode::Rc => "tikus",
            ServiceCode::Gprc => "serangga kecoa, semut, nyamuk, lalat, tikus",
        }
    }
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inspection photo group attached to a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGroup {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Validated proposal request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalInput {
    pub client_type: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub services: Vec<ServiceCode>,
    /// Termite treatment chosen for TC, if any.
    pub tc_treatment: Option<ServiceType>,
    pub service_details: BTreeMap<String, serde_json::Value>,
    pub images: Vec<ImageGroup>,
    /// Common job data plus the whole preparation and additional baskets.
    pub job: ServiceRequest,
}

impl ProposalInput {
    pub fn termite_treatment(&self) -> ServiceType {
        self.tc_treatment.unwrap_or(ServiceType::TermiteInjectSpray)
    }

    pub fn is_single(&self, code: ServiceCode) -> bool {
        self.services == [code]
    }
}

/// Preparation basket split by service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeparatedItems {
    pub tc: BTreeMap<String, f64>,
    pub rc: BTreeMap<String, f64>,
    pub gpc: BTreeMap<String, f64>,
    pub gprc: BTreeMap<String, f64>,
}

impl SeparatedItems {
    pub fn for_service(&self, code: ServiceCode) -> &BTreeMap<String, f64> {
        match code {
            ServiceCode::Tc => &self.tc,
            ServiceCode::Rc => &self.rc,
            ServiceCode::Gpc => &self.gpc,
            ServiceCode::Gprc => &self.gprc,
        }
    }
}

/// One priced option on a proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalOption {
    pub name: String,
    pub display_name: String,
    pub treatment: ServiceType,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub final_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub psychological_price: Decimal,
    pub guarantee_period: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_liter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "rust_decimal::serde::str_option")]
    pub gpc_component: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none", with = "rust_decimal::serde::str_option")]
    pub rc_component: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<u32>,
}

/// Row of a GPC/RC vs GPRC comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOption {
    pub target_name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub final_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub psychological_price: Decimal,
}

/// Options priced for one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServicePrices {
    pub service: ServiceCode,
    pub options: Vec<ProposalOption>,
}

/// How the proposal presents its prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalPricing {
    /// Termite control alone: one option per soil chemical, or the standard
    /// treatment.
    TermiteComparison {
        options: Vec<ProposalOption>,
        area_treatment: f64,
    },
    /// GPC or RC against the GPRC bundle.
    Combination { options: Vec<ComparisonOption> },
    /// Every other selection: each service priced on its own.
    Services { services: Vec<ServicePrices> },
}

/// Material line for the proposal's material list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialLine {
    pub name: String,
    pub quantity: f64,
}

/// Priced proposal, waiting for its number.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalDraft {
    pub input: ProposalInput,
    pub template_name: &'static str,
    pub pricing: ProposalPricing,
    pub materials: Vec<MaterialLine>,
}

/// Everything the document adapter needs to fill a proposal template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proposal {
    pub number: String,
    pub template_name: String,
    pub file_name: String,
    pub placeholders: BTreeMap<String, String>,
    pub pricing: ProposalPricing,
    pub materials: Vec<MaterialLine>,
    pub inspection_images: Vec<String>,
}
