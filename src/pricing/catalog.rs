//! Consumable catalogue: item name → calculation template cell.
//!
//! The catalogue is partitioned into the four categories the proposal and
//! bundle logic slice by. Names are matched exactly, as sent by the
//! inspection forms (including their spelling).

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Catalogue category of a consumable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Termite,
    Rodent,
    GeneralPest,
    Additional,
}

/// One mapped consumable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogItem {
    pub name: &'static str,
    pub cell: &'static str,
    pub category: ItemCategory,
}

pub const AGENDA_SOIL: &str = "Agenda Soil Treatent per Liter Larutan";
pub const EXPOSE_SOIL: &str = "Expose Soil Treatent per Liter Larutan";
pub const PREMISE_SOIL: &str = "Premise Soil Treatent per Liter Larutan";

/// Mutually substitutable soil chemicals, in comparison order.
pub const SOIL_CHEMICALS: [&str; 3] = [EXPOSE_SOIL, PREMISE_SOIL, AGENDA_SOIL];

/// Cell holding the auto-computed solution quantity for a soil chemical.
///
/// Expose has its own cell; Agenda and Premise share one.
pub fn auto_quantity_cell(chemical: &str) -> &'static str {
    if chemical == EXPOSE_SOIL {
        "K66"
    } else {
        "K65"
    }
}

const TERMITE_ITEMS: &[(&str, &str)] = &[
    (AGENDA_SOIL, "C65"),
    (EXPOSE_SOIL, "C66"),
    ("Xterm AG Station", "C67"),
    ("Xterm IG Station", "C68"),
    ("Expose Wood Treatent per Liter Larutan", "C69"),
    ("Queen Killer", "C70"),
    (PREMISE_SOIL, "C71"),
    ("Mata Bor kayu 2mm", "C73"),
    ("Mata Bor kayu 3mm", "C74"),
    ("Jarum B&G", "C76"),
    ("Mata bor Hilti 6mm", "C77"),
    ("Mata Bor Hilti 8mm", "C78"),
    ("Mata Bor Hilti 10mm", "C79"),
    ("Semen Warna", "C80"),
    ("Premium", "C81"),
    ("Oli Fastron 10W-40SL", "C82"),
];

const ADDITIONAL_ITEMS: &[(&str, &str)] = &[
    ("Masker untuk Klien", "C95"),
    ("Company Profile", "C96"),
    ("Laporan/SPK/Surat/Kontrak", "C97"),
    ("BAP", "C98"),
    ("LOG BOOK", "C99"),
];

const RODENT_ITEMS: &[(&str, &str)] = &[
    ("Unit PP Tray", "C105"),
    ("Racumin Unit PP Tray", "C106"),
    ("Unit Black Box", "C107"),
    ("Racumin Block Black Box", "C108"),
    ("Unit Block Perangkap Masal", "C109"),
    ("Racumin Block Perangkap Masal", "C110"),
    ("Unit Glue Box Segitiga", "C111"),
    ("Racumin Glue Box Segitiga", "C112"),
];

const GENERAL_PEST_ITEMS: &[(&str, &str)] = &[
    ("SMASH 100 EC Fogging per Liter Larutan", "C115"),
    ("Clearmos Fogging per Liter Larutan", "C116"),
    ("Storin Fogging per Liter Larutan (White Oil)", "C117"),
    ("K Othrine Fogging per Liter Larutan", "C118"),
    ("CLEARMOS ULV PER LITER LARUTAN", "C119"),
    ("K OTHRINE ULV PER LITER LARUTAN", "C120"),
    ("Lavender per Liter Larutan", "C121"),
    ("Agenda RSD Semut/Rayap per Liter Larutan", "C122"),
    ("Storin per Liter Larutan", "C123"),
    ("TENOPA RSD Kecoa Jerman", "C124"),
    ("K OTHRINE per Liter Larutan", "C125"),
    ("Flygard Bait Lalat", "C126"),
    ("Agita WG Bait Lalat", "C127"),
    ("Blattanex Gel Bait trap", "C128"),
    ("Max Force Quantum Gel Semut", "C129"),
    ("Pohon Lalat", "C130"),
    ("Hoy Hoy (Kecoa)", "C131"),
    ("Vectobac Larvasida", "C132"),
    ("Abate Larvasida", "C133"),
    ("Fly Catcher", "C134"),
    ("Blackhole", "C135"),
    ("Cat Trap", "C136"),
    ("Conant", "C137"),
];

/// Immutable item → cell map, built once.
#[derive(Debug)]
pub struct ConsumableCatalog {
    items: Vec<CatalogItem>,
    by_name: HashMap<&'static str, usize>,
}

static STANDARD: LazyLock<ConsumableCatalog> = LazyLock::new(ConsumableCatalog::build);

impl ConsumableCatalog {
    /// The catalogue matching the shipped calculation template.
    pub fn standard() -> &'static ConsumableCatalog {
        &STANDARD
    }

    fn build() -> ConsumableCatalog {
        let groups = [
            (ItemCategory::Termite, TERMITE_ITEMS),
            (ItemCategory::Rodent, RODENT_ITEMS),
            (ItemCategory::GeneralPest, GENERAL_PEST_ITEMS),
            (ItemCategory::Additional, ADDITIONAL_ITEMS),
        ];

        let mut items = Vec::new();
        let mut by_name = HashMap::new();
        for (category, entries) in groups {
            for &(name, cell) in entries {
                by_name.insert(name, items.len());
                items.push(CatalogItem {
                    name,
                    cell,
                    category,
                });
            }
        }

        ConsumableCatalog { items, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&CatalogItem> {
        self.by_name.get(name).map(|&i| &self.items[i])
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn category(&self, name: &str) -> Option<ItemCategory> {
        self.get(name).map(|item| item.category)
    }

    /// Keep only the entries of `items` belonging to `category`.
    pub fn restrict(
        &self,
        items: &BTreeMap<String, f64>,
        category: ItemCategory,
    ) -> BTreeMap<String, f64> {
        items
            .iter()
            .filter(|(name, _)| self.category(name) == Some(category))
            .map(|(name, qty)| (name.clone(), *qty))
            .collect()
    }
}

/// Soil chemicals present in `consumables` with a positive quantity, in
/// comparison order.
pub fn selected_soil_chemicals(consumables: &BTreeMap<String, f64>) -> Vec<&'static str> {
    SOIL_CHEMICALS
        .into_iter()
        .filter(|chemical| consumables.get(*chemical).is_some_and(|qty| *qty > 0.0))
        .collect()
}

/// Proposal-facing details of a soil chemical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChemicalDetails<'a> {
    pub display_name: &'a str,
    pub description: &'static str,
    pub treatment_name: &'static str,
}

pub fn chemical_details(chemical: &str) -> ChemicalDetails<'_> {
    match chemical {
        EXPOSE_SOIL => ChemicalDetails {
            display_name: "Expose 55 SC",
            description: "Bahan aktif Fipronil (5.5%) - Dosis 5-10 ml/L",
            treatment_name: "Pipanisasi & Spraying Chemical Expose by KRISTAL",
        },
        AGENDA_SOIL => ChemicalDetails {
            display_name: "Agenda 25 EC",
            description: "Bahan aktif Fipronil (25%) - Dosis 10 ml/L - Koloni Eliminasi",
            treatment_name: "Pipanisasi & Spraying Chemical Agenda by Envu Indonesia",
        },
        PREMISE_SOIL => ChemicalDetails {
            display_name: "Premise 200 SL",
            description: "Bahan aktif Imidakloprid (20%) - Dosis 2.5 ml/L - Non-repellent",
            treatment_name: "Pipanisasi & Spraying Chemical Premise by Envu Indonesia",
        },
        other => ChemicalDetails {
            display_name: other,
            description: "",
            treatment_name: "",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_unique_cells_and_names() {
        let catalog = ConsumableCatalog::standard();
        let cells: HashSet<_> = catalog.items().iter().map(|i| i.cell).collect();
        let names: HashSet<_> = catalog.items().iter().map(|i| i.name).collect();
        assert_eq!(cells.len(), catalog.items().len());
        assert_eq!(names.len(), catalog.items().len());
        assert_eq!(catalog.items().len(), 52);
    }

    #[test]
    fn test_category_lookup() {
        let catalog = ConsumableCatalog::standard();
        assert_eq!(catalog.category(EXPOSE_SOIL), Some(ItemCategory::Termite));
        assert_eq!(catalog.category("Unit Black Box"), Some(ItemCategory::Rodent));
        assert_eq!(catalog.category("Fly Catcher"), Some(ItemCategory::GeneralPest));
        assert_eq!(catalog.category("BAP"), Some(ItemCategory::Additional));
        assert_eq!(catalog.category("Mystery Powder"), None);
    }

    #[test]
    fn test_restrict() {
        let catalog = ConsumableCatalog::standard();
        let items = BTreeMap::from([
            ("Fly Catcher".to_string(), 2.0),
            ("Unit Black Box".to_string(), 4.0),
            ("Mystery Powder".to_string(), 1.0),
        ]);

        let gpc = catalog.restrict(&items, ItemCategory::GeneralPest);
        assert_eq!(gpc, BTreeMap::from([("Fly Catcher".to_string(), 2.0)]));

        let rc = catalog.restrict(&items, ItemCategory::Rodent);
        assert_eq!(rc, BTreeMap::from([("Unit Black Box".to_string(), 4.0)]));
    }

    #[test]
    fn test_selected_soil_chemicals() {
        let consumables = BTreeMap::from([
            (AGENDA_SOIL.to_string(), 3.0),
            (EXPOSE_SOIL.to_string(), 5.0),
            (PREMISE_SOIL.to_string(), 0.0),
            ("Queen Killer".to_string(), 1.0),
        ]);
        assert_eq!(
            selected_soil_chemicals(&consumables),
            vec![EXPOSE_SOIL, AGENDA_SOIL]
        );
        assert!(selected_soil_chemicals(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_auto_quantity_cell_asymmetry() {
        assert_eq!(auto_quantity_cell(EXPOSE_SOIL), "K66");
        assert_eq!(auto_quantity_cell(AGENDA_SOIL), "K65");
        assert_eq!(auto_quantity_cell(PREMISE_SOIL), "K65");
    }

    #[test]
    fn test_chemical_details() {
        assert_eq!(chemical_details(EXPOSE_SOIL).display_name, "Expose 55 SC");
        assert!(chemical_details(PREMISE_SOIL)
            .description
            .contains("Imidakloprid"));

        let unknown = chemical_details("Other");
        assert_eq!(unknown.display_name, "Other");
        assert_eq!(unknown.description, "");
    }
}
