//! Writes a service request into the calculation template.
//!
//! Every function here only writes cells; reading the result is left to the
//! calculator.

use std::collections::BTreeMap;

use tracing::warn;

use crate::workbook::{FormulaSurface, SurfaceError};

use super::catalog::{ConsumableCatalog, SOIL_CHEMICALS};
use super::models::{LaborEstimate, ServiceRequest, ServiceType, Transport};

pub const CLIENT_NAME: &str = "C1";
pub const ADDRESS: &str = "C5";
pub const DISTANCE_KM: &str = "C20";
pub const AREA: &str = "C22";
pub const FLOORS: &str = "C23";

/// Quoted price.
pub const RESULT: &str = "O17";

/// Cells fed by one transport mode. The two modes drive separate cost
/// formulas and must never both be non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCells {
    pub treatment_trips: &'static str,
    pub monitoring_trips: &'static str,
    pub labor_days: &'static str,
    pub labor_workers: &'static str,
    pub monitoring_visits: &'static str,
}

const CAR: TransportCells = TransportCells {
    treatment_trips: "C29",
    monitoring_trips: "C30",
    labor_days: "C41",
    labor_workers: "E41",
    monitoring_visits: "C45",
};

const MOTORCYCLE: TransportCells = TransportCells {
    treatment_trips: "C31",
    monitoring_trips: "C32",
    labor_days: "C42",
    labor_workers: "E42",
    monitoring_visits: "C46",
};

impl TransportCells {
    pub fn of(transport: Transport) -> TransportCells {
        match transport {
            Transport::Car => CAR,
            Transport::Motorcycle => MOTORCYCLE,
        }
    }

    fn all(&self) -> [&'static str; 5] {
        [
            self.treatment_trips,
            self.monitoring_trips,
            self.labor_days,
            self.labor_workers,
            self.monitoring_visits,
        ]
    }
}

/// Client, address, distance, area and floors.
pub fn fill_general<S: FormulaSurface>(
    surface: &mut S,
    request: &ServiceRequest,
) -> Result<(), SurfaceError> {
    surface.set_text(CLIENT_NAME, &request.client_name)?;
    surface.set_text(ADDRESS, &request.address)?;
    surface.set_number(DISTANCE_KM, request.distance_km)?;
    surface.set_number(AREA, request.area_treatment)?;
    surface.set_number(FLOORS, f64::from(request.floor_count))?;
    Ok(())
}

/// Monitoring trips and visits for the chosen transport; the other
/// transport's cells are zeroed.
pub fn fill_transport<S: FormulaSurface>(
    surface: &mut S,
    transport: Transport,
    monitoring_months: u32,
) -> Result<(), SurfaceError> {
    for cell in TransportCells::of(transport.other()).all() {
        surface.set_number(cell, 0.0)?;
    }

    let cells = TransportCells::of(transport);
    let months = f64::from(monitoring_months);
    surface.set_number(cells.monitoring_trips, months)?;
    surface.set_number(cells.monitoring_visits, months)?;
    Ok(())
}

/// Treatment trips and labor for the chosen transport.
pub fn fill_labor<S: FormulaSurface>(
    surface: &mut S,
    transport: Transport,
    labor: LaborEstimate,
) -> Result<(), SurfaceError> {
    let idle = TransportCells::of(transport.other());
    for cell in [idle.treatment_trips, idle.labor_days, idle.labor_workers] {
        surface.set_number(cell, 0.0)?;
    }

    let cells = TransportCells::of(transport);
    let days = f64::from(labor.days);
    surface.set_number(cells.treatment_trips, days)?;
    surface.set_number(cells.labor_days, days)?;
    surface.set_number(cells.labor_workers, f64::from(labor.workers))?;
    Ok(())
}

/// Write item quantities to their catalogue cells.
///
/// All catalogue cells are zeroed first. Unknown item names are logged and
/// skipped. Baiting never consumes soil chemical, so those cells are forced
/// back to zero for it.
pub fn fill_consumables<S: FormulaSurface>(
    surface: &mut S,
    catalog: &ConsumableCatalog,
    service_type: ServiceType,
    consumables: &BTreeMap<String, f64>,
    additional_items: &BTreeMap<String, f64>,
) -> Result<(), SurfaceError> {
    for item in catalog.items() {
        surface.set_number(item.cell, 0.0)?;
    }

    for (name, quantity) in consumables.iter().chain(additional_items) {
        match catalog.get(name) {
            Some(item) => surface.set_number(item.cell, *quantity)?,
            None => warn!(item = %name, "Unmapped consumable in price calculation"),
        }
    }

    if service_type == ServiceType::Baiting {
        for chemical in SOIL_CHEMICALS {
            if let Some(item) = catalog.get(chemical) {
                surface.set_number(item.cell, 0.0)?;
            }
        }
    }

    Ok(())
}
