//! Pricing service: fills a fresh calculation surface per computation and
//! turns the result into quotes.
//!
//! Surface loading and evaluation is blocking work; async callers go through
//! [`run_blocking`].

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::prelude::*;
use tracing::{debug, info};

use crate::workbook::{FormulaSurface, SurfaceError, SurfaceSource, TemplateSource};

use super::calculators::{
    apply_service_adjustment, bundle_price, estimate_labor, format_rupiah, guarantee_period,
    round_money, to_decimal, BUNDLE_DISCOUNT_PERCENT,
};
use super::catalog::{
    auto_quantity_cell, selected_soil_chemicals, ConsumableCatalog, ItemCategory, SOIL_CHEMICALS,
};
use super::models::{ComparativePrice, GprcQuote, PriceQuote, ServiceRequest, ServiceType};
use super::sheet::{self, RESULT};

/// Pricing calculation error types
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Calculated value is not a finite number: {0}")]
    NonFinite(f64),

    #[error("Price calculation overflowed")]
    Overflow,

    #[error("Invalid pricing request")]
    InvalidRequest(Vec<String>),

    #[error("Pricing task failed: {0}")]
    Task(String),
}

pub(crate) fn finite(value: f64) -> Result<Decimal, PricingError> {
    to_decimal(value).ok_or(PricingError::NonFinite(value))
}

/// Replace the soil chemicals in `consumables` with exactly `candidate` at
/// quantity 1 and every other chemical at 0.
pub fn isolate_candidate(consumables: &BTreeMap<String, f64>, candidate: &str) -> BTreeMap<String, f64> {
    let mut isolated: BTreeMap<String, f64> = consumables
        .iter()
        .filter(|(name, _)| !SOIL_CHEMICALS.contains(&name.as_str()))
        .map(|(name, qty)| (name.clone(), *qty))
        .collect();

    for chemical in SOIL_CHEMICALS {
        let qty = if chemical == candidate { 1.0 } else { 0.0 };
        isolated.insert(chemical.to_string(), qty);
    }
    isolated
}

/// Price calculator over a source of calculation surfaces.
#[derive(Debug)]
pub struct PriceCalculator<S: SurfaceSource = TemplateSource> {
    source: S,
    catalog: &'static ConsumableCatalog,
}

impl<S: SurfaceSource> PriceCalculator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            catalog: ConsumableCatalog::standard(),
        }
    }

    pub fn catalog(&self) -> &'static ConsumableCatalog {
        self.catalog
    }

    /// Load a private surface and write the whole request into it.
    pub fn filled_surface(&self, request: &ServiceRequest) -> Result<S::Surface, PricingError> {
        let service_type = request.service_type.surface_service_type();
        let labor = estimate_labor(request.area_treatment, service_type);

        let mut surface = self.source.load()?;
        sheet::fill_general(&mut surface, request)?;
        sheet::fill_transport(&mut surface, request.transport, request.monitoring_months)?;
        sheet::fill_labor(&mut surface, request.transport, labor)?;
        sheet::fill_consumables(
            &mut surface,
            self.catalog,
            service_type,
            &request.consumables,
            &request.additional_items,
        )?;
        Ok(surface)
    }

    /// Raw, unadjusted price read from the result cell.
    pub fn calculated_price(&self, request: &ServiceRequest) -> Result<f64, PricingError> {
        let mut surface = self.filled_surface(request)?;
        let price = surface.number(RESULT)?;
        if !price.is_finite() {
            return Err(PricingError::NonFinite(price));
        }

        debug!(service_type = %request.service_type, price, "Calculated raw price");
        Ok(price)
    }

    /// Isolated price per selected soil chemical.
    ///
    /// Empty when the service type has no chemical comparison or no chemical
    /// is selected.
    pub fn comparative_prices(
        &self,
        request: &ServiceRequest,
    ) -> Result<BTreeMap<String, ComparativePrice>, PricingError> {
        let mut prices = BTreeMap::new();
        if !request.service_type.supports_chemical_comparison() {
            return Ok(prices);
        }

        for candidate in selected_soil_chemicals(&request.consumables) {
            let isolated = ServiceRequest {
                consumables: isolate_candidate(&request.consumables, candidate),
                ..request.clone()
            };

            let mut surface = self.filled_surface(&isolated)?;
            let raw = surface.number(RESULT)?;
            let auto_quantity = surface.number(auto_quantity_cell(candidate))?;

            let price = round_money(finite(raw)?, 0);
            prices.insert(
                candidate.to_string(),
                ComparativePrice {
                    price: price.to_i64().ok_or(PricingError::Overflow)?,
                    formatted_price: format_rupiah(price),
                    auto_quantity_liter: (auto_quantity * 100.0).round() / 100.0,
                },
            );
        }

        Ok(prices)
    }

    /// Full quote for a single service type.
    pub fn quote(&self, request: &ServiceRequest) -> Result<PriceQuote, PricingError> {
        let service_type = request.service_type;
        let area = finite(request.area_treatment)?;

        let base_price = if service_type == ServiceType::GprcBundle {
            self.gprc_quote(request)?.bundle_price
        } else {
            finite(self.calculated_price(request)?)?
        };

        let adjustment = apply_service_adjustment(service_type, base_price, area)
            .ok_or(PricingError::Overflow)?;

        let comparative_breakdown = if selected_soil_chemicals(&request.consumables).len() > 1 {
            Some(self.comparative_prices(request)?).filter(|prices| !prices.is_empty())
        } else {
            None
        };

        info!(
            service_type = %service_type,
            final_price = %adjustment.final_price,
            "Quote calculated"
        );

        Ok(PriceQuote {
            service_type,
            base_price,
            final_price: adjustment.final_price,
            psychological_price: adjustment.psychological_price,
            guarantee_period: guarantee_period(service_type),
            labor: estimate_labor(request.area_treatment, service_type),
            comparative_breakdown,
        })
    }

    /// General pest control + rodent control bundle.
    pub fn gprc_quote(&self, request: &ServiceRequest) -> Result<GprcQuote, PricingError> {
        let gpc_request = ServiceRequest {
            service_type: ServiceType::GeneralPestControl,
            consumables: self
                .catalog
                .restrict(&request.consumables, ItemCategory::GeneralPest),
            ..request.clone()
        };
        let rc_request = ServiceRequest {
            service_type: ServiceType::Baiting,
            consumables: self.catalog.restrict(&request.consumables, ItemCategory::Rodent),
            ..request.clone()
        };

        let gpc_price = finite(self.calculated_price(&gpc_request)?)?;
        let rc_price = finite(self.calculated_price(&rc_request)?)?;
        let bundle = bundle_price(gpc_price, rc_price).ok_or(PricingError::Overflow)?;

        let adjustment = apply_service_adjustment(
            ServiceType::GprcBundle,
            bundle,
            finite(request.area_treatment)?,
        )
        .ok_or(PricingError::Overflow)?;

        Ok(GprcQuote {
            gpc_price,
            rc_price,
            bundle_price: bundle,
            final_price: adjustment.final_price,
            psychological_price: adjustment.psychological_price,
            discount_percentage: BUNDLE_DISCOUNT_PERCENT,
            guarantee_period: guarantee_period(ServiceType::GprcBundle),
        })
    }
}

/// Run a calculator job on the blocking thread pool.
pub async fn run_blocking<S, T, F>(
    calculator: Arc<PriceCalculator<S>>,
    job: F,
) -> Result<T, PricingError>
where
    S: SurfaceSource,
    T: Send + 'static,
    F: FnOnce(&PriceCalculator<S>) -> Result<T, PricingError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&calculator))
        .await
        .map_err(|e| PricingError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::catalog::{AGENDA_SOIL, EXPOSE_SOIL, PREMISE_SOIL};
    use crate::pricing::models::Transport;
    use rust_decimal_macros::dec;

    const TEMPLATE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates/calculation_template.toml");

    fn calculator() -> PriceCalculator {
        PriceCalculator::new(TemplateSource::new(TEMPLATE))
    }

    fn request(service_type: ServiceType) -> ServiceRequest {
        ServiceRequest {
            client_name: "PT Maju Jaya".into(),
            address: "Jl. Sudirman 10, Jakarta".into(),
            area_treatment: 100.0,
            distance_km: 10.0,
            floor_count: 1,
            monitoring_months: 1,
            transport: Transport::Car,
            service_type,
            consumables: BTreeMap::new(),
            additional_items: BTreeMap::new(),
        }
    }

    fn items(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(n, q)| (n.to_string(), *q)).collect()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 0.01, "{} != {}", a, b);
    }

    // ==================== calculated_price tests ====================

    #[test]
    fn test_baseline_price_without_consumables() {
        let price = calculator()
            .calculated_price(&request(ServiceType::TermiteInjectSpray))
            .unwrap();

        // area 250,000 + car operations 2,500,000, plus 35% overhead
        assert!(price.is_finite() && price > 0.0);
        assert_close(price, 3_712_500.0);
    }

    #[test]
    fn test_calculated_price_is_idempotent() {
        let calc = calculator();
        let mut req = request(ServiceType::TermiteInjectSpray);
        req.consumables = items(&[(EXPOSE_SOIL, 5.0), ("Queen Killer", 2.0)]);
        req.additional_items = items(&[("BAP", 1.0)]);

        let first = calc.calculated_price(&req).unwrap();
        let second = calc.calculated_price(&req).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_transport_modes_are_exclusive() {
        let calc = calculator();
        let car = request(ServiceType::TermiteInjectSpray);
        let motor = ServiceRequest {
            transport: Transport::Motorcycle,
            ..car.clone()
        };

        let mut surface = calc.filled_surface(&car).unwrap();
        for cell in ["C31", "C32", "C42", "E42", "C46"] {
            assert_eq!(surface.number(cell).unwrap(), 0.0, "{}", cell);
        }
        let mut surface = calc.filled_surface(&motor).unwrap();
        for cell in ["C29", "C30", "C41", "E41", "C45"] {
            assert_eq!(surface.number(cell).unwrap(), 0.0, "{}", cell);
        }

        let car_price = calc.calculated_price(&car).unwrap();
        let motor_price = calc.calculated_price(&motor).unwrap();

        // car 2,500,000 vs motorcycle 1,750,000 in operations, times 1.35
        assert_close(car_price - motor_price, 1_012_500.0);
    }

    #[test]
    fn test_unknown_consumables_do_not_change_price() {
        let calc = calculator();
        let plain = request(ServiceType::GeneralPestControl);
        let with_unknown = ServiceRequest {
            consumables: items(&[("Mystery Powder", 10.0)]),
            ..plain.clone()
        };
        assert_eq!(
            calc.calculated_price(&plain).unwrap(),
            calc.calculated_price(&with_unknown).unwrap()
        );
    }

    #[test]
    fn test_baiting_ignores_soil_chemicals() {
        let calc = calculator();
        let plain = request(ServiceType::Baiting);
        let with_chemicals = ServiceRequest {
            consumables: items(&[(AGENDA_SOIL, 10.0), (EXPOSE_SOIL, 10.0)]),
            ..plain.clone()
        };
        assert_eq!(
            calc.calculated_price(&plain).unwrap(),
            calc.calculated_price(&with_chemicals).unwrap()
        );
    }

    #[test]
    fn test_missing_template() {
        let calc = PriceCalculator::new(TemplateSource::new("/nonexistent/template.toml"));
        let result = calc.calculated_price(&request(ServiceType::Baiting));
        assert!(matches!(
            result,
            Err(PricingError::Surface(SurfaceError::TemplateMissing(_)))
        ));
    }

    // ==================== comparative pricing tests ====================

    #[test]
    fn test_isolate_candidate() {
        let consumables = items(&[(AGENDA_SOIL, 5.0), (EXPOSE_SOIL, 3.0), ("Queen Killer", 2.0)]);
        let isolated = isolate_candidate(&consumables, EXPOSE_SOIL);

        assert_eq!(isolated[EXPOSE_SOIL], 1.0);
        assert_eq!(isolated[AGENDA_SOIL], 0.0);
        assert_eq!(isolated[PREMISE_SOIL], 0.0);
        assert_eq!(isolated["Queen Killer"], 2.0);
    }

    #[test]
    fn test_comparative_prices_isolate_each_candidate() {
        let calc = calculator();
        let mut req = request(ServiceType::TermiteInjectSpray);
        req.consumables = items(&[(AGENDA_SOIL, 5.0), (EXPOSE_SOIL, 3.0), ("Queen Killer", 2.0)]);

        let prices = calc.comparative_prices(&req).unwrap();
        assert_eq!(prices.len(), 2);

        let agenda_alone = ServiceRequest {
            consumables: items(&[(AGENDA_SOIL, 1.0), (EXPOSE_SOIL, 0.0), ("Queen Killer", 2.0)]),
            ..req.clone()
        };
        let expose_alone = ServiceRequest {
            consumables: items(&[(AGENDA_SOIL, 0.0), (EXPOSE_SOIL, 1.0), ("Queen Killer", 2.0)]),
            ..req.clone()
        };

        let agenda = calc.calculated_price(&agenda_alone).unwrap().round() as i64;
        let expose = calc.calculated_price(&expose_alone).unwrap().round() as i64;
        assert_eq!(prices[AGENDA_SOIL].price, agenda);
        assert_eq!(prices[EXPOSE_SOIL].price, expose);

        let original = calc.calculated_price(&req).unwrap().round() as i64;
        assert_ne!(prices[AGENDA_SOIL].price, original);
        assert_ne!(prices[EXPOSE_SOIL].price, original);
    }

    #[test]
    fn test_comparative_auto_quantity_cells() {
        let calc = calculator();
        let mut req = request(ServiceType::TermiteSpray);
        req.consumables = items(&[(EXPOSE_SOIL, 1.0), (PREMISE_SOIL, 1.0)]);

        let prices = calc.comparative_prices(&req).unwrap();
        // K66 = area * 0.05, K65 = area * 0.04
        assert_eq!(prices[EXPOSE_SOIL].auto_quantity_liter, 5.0);
        assert_eq!(prices[PREMISE_SOIL].auto_quantity_liter, 4.0);
        assert!(prices[PREMISE_SOIL].formatted_price.starts_with("Rp "));
    }

    #[test]
    fn test_comparative_prices_empty_without_candidates() {
        let calc = calculator();
        let mut req = request(ServiceType::TermiteInjectSpray);
        req.consumables = items(&[("Queen Killer", 2.0), (AGENDA_SOIL, 0.0)]);
        assert!(calc.comparative_prices(&req).unwrap().is_empty());

        let mut baiting = request(ServiceType::Baiting);
        baiting.consumables = items(&[(AGENDA_SOIL, 1.0), (EXPOSE_SOIL, 1.0)]);
        assert!(calc.comparative_prices(&baiting).unwrap().is_empty());
    }

    // ==================== quote tests ====================

    #[test]
    fn test_spray_quote_example() {
        let quote = calculator().quote(&request(ServiceType::TermiteSpray)).unwrap();

        assert_eq!(quote.final_price, dec!(1225000));
        assert_eq!(quote.psychological_price, dec!(1470000));
        assert_eq!(quote.guarantee_period, "1 tahun");
        assert_eq!(quote.labor.days, 4);
        assert_eq!(quote.labor.workers, 2);
        assert!(quote.comparative_breakdown.is_none());
    }

    #[test]
    fn test_pipe_injection_quote_marks_up_inject_spray() {
        let calc = calculator();
        let inject = calc.quote(&request(ServiceType::TermiteInjectSpray)).unwrap();
        let pipe = calc.quote(&request(ServiceType::TermitePipeInjection)).unwrap();

        assert_eq!(pipe.base_price, inject.base_price);
        assert_eq!(pipe.final_price, round_money(inject.base_price * dec!(1.3), 0));
        assert_eq!(pipe.guarantee_period, "5 tahun");
    }

    #[test]
    fn test_quote_includes_breakdown_for_multiple_chemicals() {
        let calc = calculator();
        let mut req = request(ServiceType::TermiteInjectSpray);
        req.consumables = items(&[(EXPOSE_SOIL, 1.0)]);
        assert!(calc.quote(&req).unwrap().comparative_breakdown.is_none());

        req.consumables = items(&[(EXPOSE_SOIL, 1.0), (AGENDA_SOIL, 2.0), (PREMISE_SOIL, 3.0)]);
        let breakdown = calc.quote(&req).unwrap().comparative_breakdown.unwrap();
        assert_eq!(breakdown.len(), 3);
    }

    // ==================== GPRC tests ====================

    #[test]
    fn test_gprc_bundle_matches_component_prices() {
        let calc = calculator();
        let mut req = request(ServiceType::GprcBundle);
        req.consumables = items(&[
            ("Fly Catcher", 2.0),
            ("Unit Black Box", 4.0),
            (EXPOSE_SOIL, 9.0),
        ]);
        req.additional_items = items(&[("LOG BOOK", 1.0)]);

        let quote = calc.gprc_quote(&req).unwrap();

        let gpc_alone = ServiceRequest {
            service_type: ServiceType::GeneralPestControl,
            consumables: items(&[("Fly Catcher", 2.0)]),
            ..req.clone()
        };
        let rc_alone = ServiceRequest {
            service_type: ServiceType::Baiting,
            consumables: items(&[("Unit Black Box", 4.0)]),
            ..req.clone()
        };

        assert_eq!(quote.gpc_price, finite(calc.calculated_price(&gpc_alone).unwrap()).unwrap());
        assert_eq!(quote.rc_price, finite(calc.calculated_price(&rc_alone).unwrap()).unwrap());
        assert_eq!(quote.bundle_price, (quote.gpc_price + quote.rc_price) * dec!(0.9));
        assert_eq!(quote.final_price, round_money(quote.bundle_price, 0));
        assert_eq!(quote.discount_percentage, 10);
        assert_eq!(quote.guarantee_period, "1 tahun");
    }

    #[test]
    fn test_gprc_service_type_quote_uses_bundle() {
        let calc = calculator();
        let req = request(ServiceType::GprcBundle);
        let bundle = calc.gprc_quote(&req).unwrap();
        let quote = calc.quote(&req).unwrap();
        assert_eq!(quote.base_price, bundle.bundle_price);
        assert_eq!(quote.final_price, bundle.final_price);
    }

    // ==================== large area tests ====================

    fn huge_area(service_type: ServiceType) -> ServiceRequest {
        with_area(service_type, 1e25)
    }

    fn with_area(service_type: ServiceType, area_treatment: f64) -> ServiceRequest {
        ServiceRequest {
            area_treatment,
            ..request(service_type)
        }
    }

    #[test]
    fn test_flat_rate_quotes_overflow_on_huge_area() {
        let calc = calculator();
        let spray = calc.quote(&huge_area(ServiceType::TermiteSpray));
        assert!(matches!(spray, Err(PricingError::Overflow)), "{:?}", spray);

        let refill = calc.quote(&huge_area(ServiceType::TermitePipeRefill));
        assert!(
            matches!(refill, Err(PricingError::Overflow | PricingError::NonFinite(_))),
            "{:?}",
            refill
        );
    }

    #[test]
    fn test_markup_and_bundle_fail_cleanly_on_huge_area() {
        let calc = calculator();
        for st in [
            ServiceType::TermitePipeInjection,
            ServiceType::TermiteInjectSpray,
            ServiceType::GprcBundle,
        ] {
            let result = calc.quote(&with_area(st, 1e28));
            assert!(
                matches!(result, Err(PricingError::Overflow | PricingError::NonFinite(_))),
                "{}: {:?}",
                st,
                result
            );
        }
        assert!(calc.gprc_quote(&with_area(ServiceType::GprcBundle, 1e28)).is_err());
    }

    #[test]
    fn test_comparative_prices_fail_cleanly_on_huge_area() {
        let calc = calculator();
        let mut req = huge_area(ServiceType::TermiteInjectSpray);
        req.consumables = items(&[(AGENDA_SOIL, 1.0), (EXPOSE_SOIL, 1.0)]);

        let result = calc.comparative_prices(&req);
        assert!(matches!(
            result,
            Err(PricingError::Overflow | PricingError::NonFinite(_))
        ));
    }

    #[test]
    fn test_quotes_at_validated_area_limit() {
        let calc = calculator();
        let quote = calc.quote(&with_area(ServiceType::TermitePipeRefill, 10_000_000.0)).unwrap();
        assert_eq!(quote.final_price, dec!(336000000000));

        let mut req = with_area(ServiceType::TermiteInjectSpray, 10_000_000.0);
        req.consumables = items(&[(AGENDA_SOIL, 1.0), (EXPOSE_SOIL, 1.0)]);
        assert_eq!(calc.comparative_prices(&req).unwrap().len(), 2);
        assert!(calc.gprc_quote(&req).is_ok());
    }

    #[tokio::test]
    async fn test_run_blocking_reports_overflow() {
        let calc = Arc::new(calculator());
        let req = huge_area(ServiceType::TermiteSpray);
        let result = run_blocking(calc, move |c| c.quote(&req)).await;
        assert!(matches!(result, Err(PricingError::Overflow)));
    }

    #[tokio::test]
    async fn test_run_blocking() {
        let calc = Arc::new(calculator());
        let req = request(ServiceType::TermiteSpray);
        let quote = run_blocking(calc, move |c| c.quote(&req)).await.unwrap();
        assert_eq!(quote.final_price, dec!(1225000));
    }
}
