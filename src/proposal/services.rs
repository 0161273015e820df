//! Proposal composition.
//!
//! Splits the inspection baskets by service, prices each service (or the
//! comparison the selection calls for), picks the document template and
//! builds the placeholder values. Filling the Word document itself is left
//! to the document adapter.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::pricing::calculators::{
    apply_service_adjustment, estimate_labor, format_rupiah, guarantee_period,
};
use crate::pricing::catalog::{chemical_details, ConsumableCatalog, ItemCategory};
use crate::pricing::models::{ServiceRequest, ServiceType};
use crate::pricing::services::{finite, run_blocking, PriceCalculator, PricingError};
use crate::workbook::SurfaceSource;

use super::models::{
    ComparisonOption, MaterialLine, Proposal, ProposalDraft, ProposalInput, ProposalOption,
    ProposalPricing, SeparatedItems, ServiceCode, ServicePrices,
};
use super::queries::{format_proposal_number, next_proposal_sequence, proposal_service_code};

/// Template used for GPRC and every multi-service proposal.
pub const INTEGRATED_TEMPLATE: &str = "integrated_pest_management_(gprc)";

/// Proposal generation error types
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("Invalid proposal request")]
    InvalidRequest(Vec<String>),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Split the preparation basket by catalogue category. GPRC takes both the
/// rodent and general pest items.
pub fn separate_items(catalog: &ConsumableCatalog, preparation: &BTreeMap<String, f64>) -> SeparatedItems {
    let tc = catalog.restrict(preparation, ItemCategory::Termite);
    let rc = catalog.restrict(preparation, ItemCategory::Rodent);
    let gpc = catalog.restrict(preparation, ItemCategory::GeneralPest);
    let gprc = rc.iter().chain(&gpc).map(|(n, q)| (n.clone(), *q)).collect();

    SeparatedItems { tc, rc, gpc, gprc }
}

/// Whether the selection is presented as a price comparison.
pub fn needs_price_comparison(services: &[ServiceCode]) -> bool {
    match services {
        [ServiceCode::Tc] => true,
        [a, b] => {
            let has = |code: ServiceCode| *a == code || *b == code;
            has(ServiceCode::Gprc) && (has(ServiceCode::Gpc) || has(ServiceCode::Rc))
        }
        _ => false,
    }
}

/// Document template for the selected services.
pub fn template_for(input: &ProposalInput) -> &'static str {
    match input.services.as_slice() {
        [ServiceCode::Tc] => input
            .tc_treatment
            .map(ServiceType::as_str)
            .unwrap_or(ServiceType::TermiteInjectSpray.as_str()),
        [ServiceCode::Gpc] => "gpc",
        [ServiceCode::Rc] => "baiting",
        _ => INTEGRATED_TEMPLATE,
    }
}

fn service_request(input: &ProposalInput, service_type: ServiceType, consumables: &BTreeMap<String, f64>) -> ServiceRequest {
    ServiceRequest {
        service_type,
        consumables: consumables.clone(),
        ..input.job.clone()
    }
}

fn termite_options<S: SurfaceSource>(
    calc: &PriceCalculator<S>,
    input: &ProposalInput,
    items: &SeparatedItems,
) -> Result<Vec<ProposalOption>, PricingError> {
    // Chemical options are always priced as inject spraying; the chosen
    // treatment only selects the document template.
    let treatment = ServiceType::TermiteInjectSpray;
    let request = service_request(input, treatment, &items.tc);
    let comparisons = calc.comparative_prices(&request)?;
    let area = finite(input.job.area_treatment)?;

    if comparisons.is_empty() {
        let quote = calc.quote(&request)?;
        return Ok(vec![ProposalOption {
            name: "Standard Treatment".to_string(),
            display_name: "Standard Treatment".to_string(),
            treatment,
            base_price: quote.base_price,
            final_price: quote.final_price,
            psychological_price: quote.psychological_price,
            guarantee_period: quote.guarantee_period.to_string(),
            description: String::new(),
            quantity_liter: None,
            treatment_name: None,
            gpc_component: None,
            rc_component: None,
            discount_percentage: None,
        }]);
    }

    comparisons
        .into_iter()
        .map(|(chemical, price)| {
            let base_price = Decimal::from(price.price);
            let adjustment = apply_service_adjustment(treatment, base_price, area)
                .ok_or(PricingError::Overflow)?;
            let details = chemical_details(&chemical);
            Ok(ProposalOption {
                display_name: details.display_name.to_string(),
                description: details.description.to_string(),
                treatment_name: Some(details.treatment_name.to_string()),
                name: chemical,
                treatment,
                base_price,
                final_price: adjustment.final_price,
                psychological_price: adjustment.psychological_price,
                guarantee_period: guarantee_period(treatment).to_string(),
                quantity_liter: Some(price.auto_quantity_liter),
                gpc_component: None,
                rc_component: None,
                discount_percentage: None,
            })
        })
        .collect()
}

fn single_option<S: SurfaceSource>(
    calc: &PriceCalculator<S>,
    request: &ServiceRequest,
    name: &str,
    display_name: &str,
    description: &str,
) -> Result<ProposalOption, PricingError> {
    let quote = calc.quote(request)?;
    Ok(ProposalOption {
        name: name.to_string(),
        display_name: display_name.to_string(),
        treatment: quote.service_type,
        base_price: quote.base_price,
        final_price: quote.final_price,
        psychological_price: quote.psychological_price,
        guarantee_period: quote.guarantee_period.to_string(),
        description: description.to_string(),
        quantity_liter: None,
        treatment_name: None,
        gpc_component: None,
        rc_component: None,
        discount_percentage: None,
    })
}

fn gprc_option<S: SurfaceSource>(
    calc: &PriceCalculator<S>,
    input: &ProposalInput,
    items: &SeparatedItems,
) -> Result<ProposalOption, PricingError> {
    let request = service_request(input, ServiceType::GprcBundle, &items.gprc);
    let bundle = calc.gprc_quote(&request)?;
    Ok(ProposalOption {
        name: "GPRC Bundle (GPC + RC)".to_string(),
        display_name: "Paket GPRC (Hama Umum + Tikus)".to_string(),
        treatment: ServiceType::GprcBundle,
        base_price: bundle.bundle_price,
        final_price: bundle.final_price,
        psychological_price: bundle.psychological_price,
        guarantee_period: bundle.guarantee_period.to_string(),
        description: "Paket bundling pengendalian hama umum dan tikus dengan diskon 10%".to_string(),
        quantity_liter: None,
        treatment_name: None,
        gpc_component: Some(bundle.gpc_price),
        rc_component: Some(bundle.rc_price),
        discount_percentage: Some(bundle.discount_percentage),
    })
}

/// Price one service's options.
pub fn price_service<S: SurfaceSource>(
    calc: &PriceCalculator<S>,
    code: ServiceCode,
    input: &ProposalInput,
    items: &SeparatedItems,
) -> Result<ServicePrices, PricingError> {
    let options = match code {
        ServiceCode::Tc => termite_options(calc, input, items)?,
        ServiceCode::Gpc => vec![single_option(
            calc,
            &service_request(input, ServiceType::GeneralPestControl, &items.gpc),
            "General Pest Control",
            "Pengendalian Hama Umum",
            "Layanan pengendalian hama umum (kecoa, semut, lalat, nyamuk, dll)",
        )?],
        ServiceCode::Rc => vec![single_option(
            calc,
            &service_request(input, ServiceType::Baiting, &items.rc),
            "Rodent Control - Baiting",
            "Pengendalian Tikus - Umpan",
            "Pengendalian tikus menggunakan metode umpan racun",
        )?],
        ServiceCode::Gprc => vec![gprc_option(calc, input, items)?],
    };

    Ok(ServicePrices { service: code, options })
}

fn comparison_row(code: ServiceCode, option: &ProposalOption) -> ComparisonOption {
    ComparisonOption {
        target_name: code.target_name().to_string(),
        final_price: option.final_price,
        psychological_price: option.psychological_price,
    }
}

/// Price the selection and assemble everything except the proposal number.
pub fn draft_proposal<S: SurfaceSource>(
    calc: &PriceCalculator<S>,
    input: ProposalInput,
) -> Result<ProposalDraft, PricingError> {
    let items = separate_items(calc.catalog(), &input.job.consumables);

    let pricing = if needs_price_comparison(&input.services) {
        if input.is_single(ServiceCode::Tc) {
            ProposalPricing::TermiteComparison {
                options: termite_options(calc, &input, &items)?,
                area_treatment: input.job.area_treatment,
            }
        } else {
            // GPC or RC first, GPRC second
            let mut codes = input.services.clone();
            codes.sort_by_key(|code| *code == ServiceCode::Gprc);

            let mut options = Vec::with_capacity(codes.len());
            for code in codes {
                let prices = price_service(calc, code, &input, &items)?;
                if let Some(option) = prices.options.first() {
                    options.push(comparison_row(code, option));
                }
            }
            ProposalPricing::Combination { options }
        }
    } else {
        let services = input
            .services
            .iter()
            .map(|code| price_service(calc, *code, &input, &items))
            .collect::<Result<Vec<_>, _>>()?;
        ProposalPricing::Services { services }
    };

    let mut materials: Vec<MaterialLine> = Vec::new();
    let selected = input.services.iter().flat_map(|code| items.for_service(*code));
    for (name, quantity) in selected.chain(&input.job.additional_items) {
        match materials.iter_mut().find(|line| &line.name == name) {
            Some(line) => line.quantity = *quantity,
            None => materials.push(MaterialLine {
                name: name.clone(),
                quantity: *quantity,
            }),
        }
    }

    Ok(ProposalDraft {
        template_name: template_for(&input),
        input,
        pricing,
        materials,
    })
}

/// Render a number the way the proposal templates show it (no trailing `.0`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// `proposal_{SERVICES}_{client}_{Y-m-d_H-i-s}.docx`
pub fn output_file_name(services: &[ServiceCode], client_name: &str, now: NaiveDateTime) -> String {
    let client: String = client_name
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let services = services.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("_");
    format!(
        "proposal_{}_{}_{}.docx",
        services,
        client,
        now.format("%Y-%m-%d_%H-%M-%S")
    )
}

fn detail_text(details: &Value, key: &str, separator: &str, default: &str) -> String {
    match details.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(separator),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

fn service_detail_placeholders(code: ServiceCode, details: &Value, out: &mut BTreeMap<String, String>) {
    let fields: &[(&str, &str, &str, &str)] = match code {
        ServiceCode::Tc => &[
            ("tc_treatment", "treatment", ", ", "Inject & Spraying"),
            ("tc_status", "status", ", ", "Terdeteksi Rayap"),
        ],
        ServiceCode::Gpc => &[
            ("gpc_target_hama", "targetHama", ", ", ""),
            ("gpc_area_aplikasi", "areaAplikasi", ", ", "Seluruh Area"),
            ("gpc_bahan_aktif", "bahanAktifKimia", ", ", "-"),
            ("gpc_status", "status", ", ", "Terdeteksi Hama"),
            ("gpc_treatment", "treatment", ", ", ""),
        ],
        ServiceCode::Rc => &[
            ("rc_tingkat_infestasi", "tingkatInfestasi", ", ", "Sedang"),
            (
                "rc_rekomendasi_sanitasi",
                "rekomendasiSanitasi",
                ", ",
                "Perbaikan sanitasi diperlukan",
            ),
            ("rc_treatment", "treatment", " & ", ""),
        ],
        ServiceCode::Gprc => &[
            ("gprc_target_hama", "targetHama", ", ", ""),
            ("gprc_tingkat_infestasi", "tingkatInfestasi", ", ", "Sedang"),
            ("gprc_treatment", "treatment", ", ", ""),
        ],
    };

    for (placeholder, key, separator, default) in fields {
        out.insert(
            placeholder.to_string(),
            detail_text(details, key, separator, default),
        );
    }
}

fn price_placeholders(pricing: &ProposalPricing, out: &mut BTreeMap<String, String>) {
    let mut set = |key: &str, value: String| {
        out.insert(key.to_string(), value);
    };

    match pricing {
        ProposalPricing::TermiteComparison { options, area_treatment } => match options.as_slice() {
            [option] => {
                set("service_name", option.display_name.clone());
                set("service_description", option.description.clone());
                set("final_price", format_rupiah(option.final_price));
                set("psychological_price", format_rupiah(option.psychological_price));
                set("guarantee_period", option.guarantee_period.clone());
                set("area_treatment", format_number(*area_treatment));
            }
            _ => {
                set("final_price", String::new());
                set("psychological_price", String::new());
            }
        },
        ProposalPricing::Services { services } => {
            if let Some(option) = services.first().and_then(|s| s.options.first()) {
                set("final_price", format_rupiah(option.final_price));
                set("psychological_price", format_rupiah(option.psychological_price));
                set("guarantee_period", option.guarantee_period.clone());
            }
        }
        ProposalPricing::Combination { .. } => {}
    }
}

/// Attach the proposal number and build the placeholder values.
pub fn finish_proposal(draft: ProposalDraft, number: String, now: NaiveDateTime) -> Proposal {
    let input = &draft.input;
    let job = &input.job;

    let (labor_type, guarantee) = match input.services.as_slice() {
        [ServiceCode::Tc] => (input.termite_treatment(), guarantee_period(input.termite_treatment())),
        [ServiceCode::Rc] => (ServiceType::Baiting, guarantee_period(ServiceType::Baiting)),
        _ => (ServiceType::GeneralPestControl, guarantee_period(ServiceType::GprcBundle)),
    };
    let labor = estimate_labor(job.area_treatment, labor_type);

    let service_label = match input.services.as_slice() {
        [single] => single.label().to_string(),
        many => many.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("_"),
    };

    let or_dash = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or("-")
            .to_string()
    };

    let inspection_images: Vec<String> = input
        .images
        .iter()
        .filter(|group| group.paths.first().is_some_and(|p| !p.is_empty()))
        .map(|group| {
            group
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "Tidak ada detail".to_string())
        })
        .collect();

    let mut placeholders = BTreeMap::from([
        ("number".to_string(), number.clone()),
        ("type".to_string(), "Penawaran Harga Pest Control".to_string()),
        ("client_name".to_string(), job.client_name.clone()),
        ("client_type".to_string(), or_dash(&input.client_type)),
        ("client_email".to_string(), or_dash(&input.client_email)),
        ("client_phone".to_string(), or_dash(&input.client_phone)),
        ("address".to_string(), job.address.clone()),
        ("area_treatment".to_string(), format_number(job.area_treatment)),
        ("guarantee".to_string(), guarantee.to_string()),
        ("estimated_time".to_string(), format!("{} hari", labor.days)),
        ("total_technician".to_string(), format!("{} orang", labor.workers)),
        ("service_type_label".to_string(), service_label),
        ("date".to_string(), now.format("%d %B %Y").to_string()),
        (
            "inspection_heading".to_string(),
            if inspection_images.is_empty() { "" } else { "HASIL INSPEKSI" }.to_string(),
        ),
    ]);

    price_placeholders(&draft.pricing, &mut placeholders);
    for code in &input.services {
        if let Some(details) = input.service_details.get(code.as_str()) {
            service_detail_placeholders(*code, details, &mut placeholders);
        }
    }

    Proposal {
        file_name: output_file_name(&input.services, &job.client_name, now),
        number,
        template_name: draft.template_name.to_string(),
        placeholders,
        pricing: draft.pricing,
        materials: draft.materials,
        inspection_images,
    }
}

/// Price, number and assemble a proposal.
///
/// The number is only taken once pricing succeeded, so failed requests do
/// not consume sequence values.
pub async fn generate_proposal<S: SurfaceSource>(
    pool: &PgPool,
    calculator: Arc<PriceCalculator<S>>,
    input: ProposalInput,
) -> Result<Proposal, ProposalError> {
    let draft = run_blocking(calculator, move |calc| draft_proposal(calc, input)).await?;

    let sequence = next_proposal_sequence(pool).await?;
    let now = Local::now().naive_local();
    let number = format_proposal_number(
        sequence,
        proposal_service_code(&draft.input.services),
        now.date(),
    );
    info!(number = %number, template = draft.template_name, "Proposal number issued");

    Ok(finish_proposal(draft, number, now))
}
