//! Formula surface used by the pricing engine.
//!
//! The engine only writes named input cells and reads named output cells; the
//! formula graph that turns quantities into a price lives in the calculation
//! template. [`Workbook`] is the shipped implementation: a template loaded
//! from TOML whose formulas are evaluated with rhai.

pub mod formula;
pub mod template;

use std::collections::HashMap;

use rhai::{Array, Dynamic, Engine, Scope, AST, FLOAT};

pub use template::TemplateSource;

use formula::{dependencies, expand_sum_ranges, normalize_cell_ref, RANGE_SUM_FN};

/// Errors raised by the formula surface.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Calculation template not found: {0}")]
    TemplateMissing(String),

    #[error("Failed to read calculation template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid calculation template: {0}")]
    Template(String),

    #[error("Formula error in {cell}: {message}")]
    Formula { cell: String, message: String },

    #[error("Circular reference through {0}")]
    CircularReference(String),

    #[error("Cell {0} does not hold a number")]
    NotNumeric(String),

    #[error("Invalid cell reference: {0}")]
    InvalidCell(String),
}

/// A spreadsheet-like surface: named inputs in, evaluated numbers out.
pub trait FormulaSurface {
    /// Write a number, replacing any formula or value in the cell.
    fn set_number(&mut self, cell: &str, value: f64) -> Result<(), SurfaceError>;

    /// Write a text value, replacing any formula or value in the cell.
    fn set_text(&mut self, cell: &str, value: &str) -> Result<(), SurfaceError>;

    /// Read a cell's numeric value, evaluating formulas as needed.
    fn number(&mut self, cell: &str) -> Result<f64, SurfaceError>;
}

/// Produces fresh, private surfaces.
///
/// Every call to `load` must return an instance that shares no state with
/// previously loaded ones.
pub trait SurfaceSource: Send + Sync + 'static {
    type Surface: FormulaSurface;

    fn load(&self) -> Result<Self::Surface, SurfaceError>;
}

/// Literal cell content.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone)]
struct Formula {
    source: String,
    ast: AST,
    dependencies: Vec<String>,
}

/// In-memory workbook with a rhai-evaluated formula graph.
///
/// Evaluated formula results are cached until the next write.
pub struct Workbook {
    values: HashMap<String, CellValue>,
    formulas: HashMap<String, Formula>,
    computed: HashMap<String, f64>,
    engine: Engine,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("values", &self.values.len())
            .field("formulas", &self.formulas.len())
            .field("computed", &self.computed.len())
            .finish()
    }
}

fn formula_engine() -> Engine {
    let mut engine = Engine::new();
    engine.register_fn(RANGE_SUM_FN, |values: Array| -> FLOAT {
        values.iter().filter_map(dynamic_to_f64).sum()
    });
    engine
}

fn dynamic_to_f64(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as f64))
}

impl Workbook {
    /// Build a workbook from literal values and formula sources.
    pub fn new<V, F>(values: V, formulas: F) -> Result<Self, SurfaceError>
    where
        V: IntoIterator<Item = (String, CellValue)>,
        F: IntoIterator<Item = (String, String)>,
    {
        let engine = formula_engine();

        let mut cells = HashMap::new();
        for (cell, value) in values {
            let cell = normalize_cell_ref(&cell).ok_or(SurfaceError::InvalidCell(cell))?;
            cells.insert(cell, value);
        }

        let mut compiled = HashMap::new();
        for (cell, source) in formulas {
            let cell = normalize_cell_ref(&cell).ok_or(SurfaceError::InvalidCell(cell))?;
            let expanded = expand_sum_ranges(&source)?;
            let ast = engine
                .compile_expression(&expanded)
                .or_else(|_| engine.compile(&expanded))
                .map_err(|e| SurfaceError::Formula {
                    cell: cell.clone(),
                    message: e.to_string(),
                })?;
            let deps = dependencies(&expanded);
            cells.remove(&cell);
            compiled.insert(
                cell,
                Formula {
                    source,
                    ast,
                    dependencies: deps,
                },
            );
        }

        Ok(Self {
            values: cells,
            formulas: compiled,
            computed: HashMap::new(),
            engine,
        })
    }

    /// Formula text of a cell, if it holds one.
    pub fn formula(&self, cell: &str) -> Option<&str> {
        let cell = normalize_cell_ref(cell)?;
        self.formulas.get(&cell).map(|f| f.source.as_str())
    }

    /// Literal value of a cell, if it holds one.
    pub fn value(&self, cell: &str) -> Option<&CellValue> {
        let cell = normalize_cell_ref(cell)?;
        self.values.get(&cell)
    }

    fn write(&mut self, cell: &str, value: CellValue) -> Result<(), SurfaceError> {
        let cell = normalize_cell_ref(cell).ok_or_else(|| SurfaceError::InvalidCell(cell.to_string()))?;
        self.formulas.remove(&cell);
        self.values.insert(cell, value);
        self.computed.clear();
        Ok(())
    }

    fn evaluate(&mut self, cell: &str, visiting: &mut Vec<String>) -> Result<f64, SurfaceError> {
        if let Some(value) = self.computed.get(cell) {
            return Ok(*value);
        }

        let Some(formula) = self.formulas.get(cell).cloned() else {
            // blank cells read as zero
            return match self.values.get(cell) {
                Some(CellValue::Number(n)) => Ok(*n),
                Some(CellValue::Text(_)) => Err(SurfaceError::NotNumeric(cell.to_string())),
                None => Ok(0.0),
            };
        };

        if visiting.iter().any(|c| c == cell) {
            return Err(SurfaceError::CircularReference(cell.to_string()));
        }
        visiting.push(cell.to_string());

        let mut scope = Scope::new();
        for dep in &formula.dependencies {
            let value = self.evaluate(dep, visiting)?;
            scope.push(dep.as_str(), value);
        }
        visiting.pop();

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &formula.ast)
            .map_err(|e| SurfaceError::Formula {
                cell: cell.to_string(),
                message: e.to_string(),
            })?;
        let value = dynamic_to_f64(&result).ok_or_else(|| SurfaceError::NotNumeric(cell.to_string()))?;

        self.computed.insert(cell.to_string(), value);
        Ok(value)
    }
}

impl FormulaSurface for Workbook {
    fn set_number(&mut self, cell: &str, value: f64) -> Result<(), SurfaceError> {
        self.write(cell, CellValue::Number(value))
    }

    fn set_text(&mut self, cell: &str, value: &str) -> Result<(), SurfaceError> {
        self.write(cell, CellValue::Text(value.to_string()))
    }

    fn number(&mut self, cell: &str) -> Result<f64, SurfaceError> {
        let cell = normalize_cell_ref(cell).ok_or_else(|| SurfaceError::InvalidCell(cell.to_string()))?;
        let mut visiting = Vec::new();
        self.evaluate(&cell, &mut visiting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook(values: &[(&str, f64)], formulas: &[(&str, &str)]) -> Workbook {
        Workbook::new(
            values
                .iter()
                .map(|(c, v)| (c.to_string(), CellValue::Number(*v))),
            formulas.iter().map(|(c, f)| (c.to_string(), f.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_evaluates_formula_chain() {
        let mut wb = workbook(
            &[("A1", 2.0), ("A2", 3.0)],
            &[("B1", "A1 * A2"), ("C1", "B1 + 1.5")],
        );
        assert_eq!(wb.number("C1").unwrap(), 7.5);
    }

    #[test]
    fn test_blank_cells_read_as_zero() {
        let mut wb = workbook(&[], &[("B1", "A1 + 4.0")]);
        assert_eq!(wb.number("B1").unwrap(), 4.0);
        assert_eq!(wb.number("Z99").unwrap(), 0.0);
    }

    #[test]
    fn test_sum_range() {
        let mut wb = workbook(
            &[("D1", 1.0), ("D2", 2.0), ("D4", 4.0)],
            &[("D10", "SUM(D1:D4) * 2.0")],
        );
        assert_eq!(wb.number("D10").unwrap(), 14.0);
    }

    #[test]
    fn test_write_invalidates_computed_values() {
        let mut wb = workbook(&[("A1", 1.0)], &[("B1", "A1 * 10.0")]);
        assert_eq!(wb.number("B1").unwrap(), 10.0);

        wb.set_number("A1", 5.0).unwrap();
        assert_eq!(wb.number("B1").unwrap(), 50.0);
    }

    #[test]
    fn test_write_replaces_formula() {
        let mut wb = workbook(&[("A1", 1.0)], &[("B1", "A1 * 10.0")]);
        wb.set_number("b1", 3.0).unwrap();
        assert_eq!(wb.formula("B1"), None);
        assert_eq!(wb.number("B1").unwrap(), 3.0);
    }

    #[test]
    fn test_conditional_formula() {
        let mut wb = workbook(
            &[("C66", 0.0), ("C22", 100.0)],
            &[("K66", "if C66 > 0.0 { C22 * 0.05 } else { 0.0 }")],
        );
        assert_eq!(wb.number("K66").unwrap(), 0.0);
        wb.set_number("C66", 1.0).unwrap();
        assert_eq!(wb.number("K66").unwrap(), 5.0);
    }

    #[test]
    fn test_circular_reference_is_an_error() {
        let mut wb = workbook(&[], &[("A1", "B1 + 1.0"), ("B1", "A1 + 1.0")]);
        assert!(matches!(
            wb.number("A1"),
            Err(SurfaceError::CircularReference(_))
        ));
    }

    #[test]
    fn test_text_cell_is_not_numeric() {
        let mut wb = workbook(&[], &[]);
        wb.set_text("C1", "PT Maju Jaya").unwrap();
        assert_eq!(wb.value("C1"), Some(&CellValue::Text("PT Maju Jaya".into())));
        assert!(matches!(wb.number("C1"), Err(SurfaceError::NotNumeric(_))));
    }

    #[test]
    fn test_invalid_cell_reference() {
        let mut wb = workbook(&[], &[]);
        assert!(matches!(
            wb.set_number("not a cell", 1.0),
            Err(SurfaceError::InvalidCell(_))
        ));
    }

    #[test]
    fn test_bad_formula_is_rejected_at_load() {
        let result = Workbook::new(
            Vec::<(String, CellValue)>::new(),
            vec![("A1".to_string(), "1.0 +* 2.0".to_string())],
        );
        assert!(matches!(result, Err(SurfaceError::Formula { .. })));
    }
}
