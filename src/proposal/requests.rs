//! Request DTOs for proposal generation.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::pricing::models::{ServiceRequest, ServiceType, Transport};
use crate::pricing::requests::{
    item_set, parse_transport, validate_items, RawItemSet, MAX_AREA_M2, MAX_DISTANCE_KM,
};

use super::models::{ImageGroup, ProposalInput, ServiceCode};

/// Treatments that have their own proposal template.
const TC_TREATMENTS: [ServiceType; 5] = [
    ServiceType::TermitePipeInjection,
    ServiceType::TermitePipeRefill,
    ServiceType::TermiteSpray,
    ServiceType::TermiteInjectSpray,
    ServiceType::Baiting,
];

/// Request to generate a multi-service proposal
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateProposalRequest {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_type: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub service_types: Vec<String>,
    #[serde(default)]
    pub service_details: Option<BTreeMap<String, Value>>,
    pub area_treatment: Option<f64>,
    pub floor_count: Option<i64>,
    pub distance_km: Option<f64>,
    pub transport: Option<String>,
    pub monitoring_duration_months: Option<i64>,
    #[serde(default, deserialize_with = "item_set")]
    pub preparation_set_items: RawItemSet,
    #[serde(default, deserialize_with = "item_set")]
    pub additional_set_items: RawItemSet,
    #[serde(default)]
    pub images: Option<Vec<ImageGroup>>,
}

fn tc_treatment(details: &BTreeMap<String, Value>) -> Option<ServiceType> {
    let treatment = details.get("TC")?.get("treatment")?.as_str()?;
    let parsed = treatment.parse::<ServiceType>().ok()?;
    TC_TREATMENTS.contains(&parsed).then_some(parsed)
}

fn require<T>(value: Option<T>, field: &str, errors: &mut Vec<String>) -> Option<T> {
    if value.is_none() {
        errors.push(format!("{} is required", field));
    }
    value
}

impl GenerateProposalRequest {
    pub fn validate(&self) -> Result<ProposalInput, Vec<String>> {
        let mut errors = Vec::new();

        if self.client_name.trim().is_empty() {
            errors.push("client_name is required".to_string());
        }
        if self.address.trim().is_empty() {
            errors.push("address is required".to_string());
        }
        if let Some(email) = self.client_email.as_deref().filter(|e| !e.is_empty()) {
            let valid = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
            if !valid {
                errors.push("client_email must be a valid email address".to_string());
            }
        }

        let mut services = Vec::new();
        if self.service_types.is_empty() {
            errors.push("service_types must contain at least one service".to_string());
        }
        for raw in &self.service_types {
            match ServiceCode::parse(raw) {
                Some(code) if !services.contains(&code) => services.push(code),
                Some(_) => {}
                None => errors.push(format!("service_types contains unknown service: {}", raw)),
            }
        }

        let area_treatment = match require(self.area_treatment, "area_treatment", &mut errors) {
            Some(area) if area > MAX_AREA_M2 => {
                errors.push(format!("area_treatment must not exceed {}", MAX_AREA_M2));
                0.0
            }
            Some(area) if !(area.is_finite() && area > 0.0) => {
                errors.push("area_treatment must be greater than 0".to_string());
                0.0
            }
            area => area.unwrap_or(0.0),
        };
        let distance_km = match require(self.distance_km, "distance_km", &mut errors) {
            Some(distance) if distance > MAX_DISTANCE_KM => {
                errors.push(format!("distance_km must not exceed {}", MAX_DISTANCE_KM));
                0.0
            }
            Some(distance) if !(distance.is_finite() && distance >= 0.0) => {
                errors.push("distance_km must be 0 or greater".to_string());
                0.0
            }
            distance => distance.unwrap_or(0.0),
        };
        let floor_count = match require(self.floor_count, "floor_count", &mut errors) {
            Some(floors) => u32::try_from(floors).ok().filter(|f| *f >= 1).unwrap_or_else(|| {
                errors.push("floor_count must be at least 1".to_string());
                1
            }),
            None => 1,
        };
        let monitoring_months = match require(
            self.monitoring_duration_months,
            "monitoring_duration_months",
            &mut errors,
        ) {
            Some(months) => u32::try_from(months).unwrap_or_else(|_| {
                errors.push("monitoring_duration_months must be 0 or greater".to_string());
                0
            }),
            None => 0,
        };
        let transport = match require(self.transport.as_deref(), "transport", &mut errors) {
            Some(raw) => parse_transport(raw).unwrap_or_else(|| {
                errors.push("transport must be one of: mobil, motor".to_string());
                Transport::Car
            }),
            None => Transport::Car,
        };

        let consumables = validate_items("preparation_set_items", &self.preparation_set_items, &mut errors);
        let additional_items = validate_items("additional_set_items", &self.additional_set_items, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        let service_details = self.service_details.clone().unwrap_or_default();
        Ok(ProposalInput {
            client_type: self.client_type.clone(),
            client_email: self.client_email.clone(),
            client_phone: self.client_phone.clone(),
            services,
            tc_treatment: tc_treatment(&service_details),
            images: self.images.clone().unwrap_or_default(),
            service_details,
            job: ServiceRequest {
                client_name: self.client_name.clone(),
                address: self.address.clone(),
                area_treatment,
                distance_km,
                floor_count,
                monitoring_months,
                transport,
                service_type: ServiceType::TermiteInjectSpray,
                consumables,
                additional_items,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "client_name": "PT Maju Jaya",
            "client_email": "admin@majujaya.co.id",
            "address": "Jl. Sudirman 10",
            "service_types": ["TC"],
            "service_details": {"TC": {"treatment": "Pipanasi", "status": "Terdeteksi Rayap"}},
            "area_treatment": 150,
            "floor_count": 2,
            "distance_km": 12,
            "transport": "mobil",
            "monitoring_duration_months": 3,
            "preparation_set_items": {"Expose Soil Treatent per Liter Larutan": 3},
            "additional_set_items": []
        })
    }

    #[test]
    fn test_valid_proposal_request() {
        let request: GenerateProposalRequest = serde_json::from_value(valid_body()).unwrap();
        let input = request.validate().unwrap();

        assert_eq!(input.services, vec![ServiceCode::Tc]);
        assert_eq!(input.tc_treatment, Some(ServiceType::TermitePipeInjection));
        assert_eq!(input.job.area_treatment, 150.0);
        assert_eq!(input.job.monitoring_months, 3);
        assert_eq!(input.job.consumables.len(), 1);
        assert!(input.job.additional_items.is_empty());
    }

    #[test]
    fn test_unknown_treatment_falls_back() {
        let mut body = valid_body();
        body["service_details"] = json!({"TC": {"treatment": "Inject & Spraying"}});
        let request: GenerateProposalRequest = serde_json::from_value(body).unwrap();
        let input = request.validate().unwrap();

        assert_eq!(input.tc_treatment, None);
        assert_eq!(input.termite_treatment(), ServiceType::TermiteInjectSpray);
    }

    #[test]
    fn test_invalid_proposal_request() {
        let request: GenerateProposalRequest = serde_json::from_value(json!({
            "client_email": "not-an-email",
            "service_types": ["TC", "XX"],
            "area_treatment": -5,
            "transport": "kapal"
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();

        assert!(errors.contains(&"client_name is required".to_string()));
        assert!(errors.contains(&"client_email must be a valid email address".to_string()));
        assert!(errors.contains(&"service_types contains unknown service: XX".to_string()));
        assert!(errors.contains(&"area_treatment must be greater than 0".to_string()));
        assert!(errors.contains(&"floor_count is required".to_string()));
        assert!(errors.contains(&"transport must be one of: mobil, motor".to_string()));
    }

    #[test]
    fn test_area_and_distance_limits() {
        let mut body = valid_body();
        body["area_treatment"] = json!(1e25);
        body["distance_km"] = json!(20000);
        let request: GenerateProposalRequest = serde_json::from_value(body).unwrap();
        let errors = request.validate().unwrap_err();

        assert_eq!(
            errors,
            vec![
                "area_treatment must not exceed 10000000",
                "distance_km must not exceed 10000",
            ]
        );
    }

    #[test]
    fn test_duplicate_services_are_collapsed() {
        let mut body = valid_body();
        body["service_types"] = json!(["GPC", "GPRC", "GPC"]);
        let request: GenerateProposalRequest = serde_json::from_value(body).unwrap();
        let input = request.validate().unwrap();
        assert_eq!(input.services, vec![ServiceCode::Gpc, ServiceCode::Gprc]);
    }
}
