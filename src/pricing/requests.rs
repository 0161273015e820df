//! Request DTOs for pricing API endpoints.
//!
//! Field names follow the inspection form payloads (`luasTanah`,
//! `preparationSet`, ...). Everything is validated here into a
//! [`ServiceRequest`] before it reaches the calculator.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::models::{ServiceRequest, ServiceType, Transport};
use super::services::PricingError;

/// Largest treated area accepted, in m².
pub const MAX_AREA_M2: f64 = 10_000_000.0;

/// Largest travel distance accepted, in km.
pub const MAX_DISTANCE_KM: f64 = 10_000.0;

/// Item name → quantity as sent by the client (numbers or numeric strings).
pub type RawItemSet = BTreeMap<String, Value>;

/// Accept an object, `null`, or an empty array (which PHP-style clients send
/// for an empty basket).
pub fn item_set<'de, D>(deserializer: D) -> Result<RawItemSet, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Map(RawItemSet),
        List(Vec<Value>),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(RawItemSet::new()),
        Some(Raw::Map(items)) => Ok(items),
        Some(Raw::List(list)) if list.is_empty() => Ok(RawItemSet::new()),
        Some(Raw::List(_)) => Err(D::Error::custom(
            "item set must be an object of item name to quantity",
        )),
    }
}

/// Validate item quantities, collecting one message per bad entry.
pub fn validate_items(field: &str, raw: &RawItemSet, errors: &mut Vec<String>) -> BTreeMap<String, f64> {
    let mut items = BTreeMap::new();
    for (name, value) in raw {
        let quantity = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Null => Some(0.0),
            _ => None,
        };
        match quantity {
            Some(q) if q.is_finite() && q >= 0.0 => {
                items.insert(name.clone(), q);
            }
            _ => errors.push(format!("{}.{} must be a non-negative number", field, name)),
        }
    }
    items
}

pub fn parse_transport(value: &str) -> Option<Transport> {
    match value.trim().to_ascii_lowercase().as_str() {
        "mobil" | "car" => Some(Transport::Car),
        "motor" | "motorcycle" => Some(Transport::Motorcycle),
        _ => None,
    }
}

fn default_service_type() -> String {
    ServiceType::TermiteInjectSpray.as_str().to_string()
}

/// Request body shared by the pricing endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculatePriceRequest {
    #[serde(rename = "luasTanah")]
    pub luas_tanah: Option<f64>,
    #[serde(rename = "jarakTempuh")]
    pub jarak_tempuh: Option<f64>,
    #[serde(rename = "jumlahLantai")]
    pub jumlah_lantai: Option<i64>,
    #[serde(rename = "monitoringPerBulan")]
    pub monitoring_per_bulan: Option<i64>,
    pub transport: Option<String>,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(rename = "preparationSet", default, deserialize_with = "item_set")]
    pub preparation_set: RawItemSet,
    #[serde(rename = "additionalSet", default, deserialize_with = "item_set")]
    pub additional_set: RawItemSet,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub address: String,
}

impl CalculatePriceRequest {
    /// Validate into a typed request, or a list of every violation found.
    pub fn validate(&self) -> Result<ServiceRequest, PricingError> {
        let mut errors = Vec::new();

        if self.client_name.trim().is_empty() {
            errors.push("client_name is required".to_string());
        }
        if self.address.trim().is_empty() {
            errors.push("address is required".to_string());
        }

        let area_treatment = match self.luas_tanah {
            Some(area) if area > MAX_AREA_M2 => {
                errors.push(format!("luasTanah must not exceed {}", MAX_AREA_M2));
                0.0
            }
            Some(area) if area.is_finite() && area > 0.0 => area,
            Some(_) => {
                errors.push("luasTanah must be greater than 0".to_string());
                0.0
            }
            None => {
                errors.push("luasTanah is required".to_string());
                0.0
            }
        };

        let distance_km = match self.jarak_tempuh {
            Some(distance) if distance > MAX_DISTANCE_KM => {
                errors.push(format!("jarakTempuh must not exceed {}", MAX_DISTANCE_KM));
                0.0
            }
            Some(distance) if distance.is_finite() && distance >= 0.0 => distance,
            Some(_) => {
                errors.push("jarakTempuh must be 0 or greater".to_string());
                0.0
            }
            None => {
                errors.push("jarakTempuh is required".to_string());
                0.0
            }
        };

        let floor_count = match self.jumlah_lantai.map(u32::try_from) {
            Some(Ok(floors)) if floors >= 1 => floors,
            Some(_) => {
                errors.push("jumlahLantai must be at least 1".to_string());
                1
            }
            None => {
                errors.push("jumlahLantai is required".to_string());
                1
            }
        };

        let monitoring_months = match self.monitoring_per_bulan.map(u32::try_from) {
            Some(Ok(months)) => months,
            Some(Err(_)) => {
                errors.push("monitoringPerBulan must be 0 or greater".to_string());
                0
            }
            None => {
                errors.push("monitoringPerBulan is required".to_string());
                0
            }
        };

        let transport = match self.transport.as_deref().map(parse_transport) {
            Some(Some(transport)) => transport,
            Some(None) => {
                errors.push("transport must be one of: mobil, motor".to_string());
                Transport::Car
            }
            None => {
                errors.push("transport is required".to_string());
                Transport::Car
            }
        };

        let service_type = self.service_type.parse::<ServiceType>().unwrap_or_else(|e| {
            errors.push(e.to_string());
            ServiceType::TermiteInjectSpray
        });

        let consumables = validate_items("preparationSet", &self.preparation_set, &mut errors);
        let additional_items = validate_items("additionalSet", &self.additional_set, &mut errors);

        if !errors.is_empty() {
            return Err(PricingError::InvalidRequest(errors));
        }

        Ok(ServiceRequest {
            client_name: self.client_name.clone(),
            address: self.address.clone(),
            area_treatment,
            distance_km,
            floor_count,
            monitoring_months,
            transport,
            service_type,
            consumables,
            additional_items,
        })
    }
}
