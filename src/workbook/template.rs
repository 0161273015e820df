//! Calculation template loading.
//!
//! A template is a TOML file:
//!
//! ```toml
//! [values]
//! H65 = 95000.0
//!
//! [text]
//! A1 = "Kalkulasi Harga"
//!
//! [formulas]
//! D65 = "C65 * H65"
//! O17 = "O15 + O16"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{CellValue, SurfaceError, SurfaceSource, Workbook};

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    values: BTreeMap<String, f64>,
    #[serde(default)]
    text: BTreeMap<String, String>,
    #[serde(default)]
    formulas: BTreeMap<String, String>,
}

impl Workbook {
    /// Parse a workbook from template TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, SurfaceError> {
        let file: TemplateFile =
            toml::from_str(content).map_err(|e| SurfaceError::Template(e.to_string()))?;

        let values = file
            .values
            .into_iter()
            .map(|(cell, v)| (cell, CellValue::Number(v)))
            .chain(
                file.text
                    .into_iter()
                    .map(|(cell, t)| (cell, CellValue::Text(t))),
            );

        Workbook::new(values, file.formulas)
    }

    /// Load a workbook from a template file on disk.
    pub fn open(path: &Path) -> Result<Self, SurfaceError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SurfaceError::TemplateMissing(path.display().to_string())
            } else {
                SurfaceError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;
        Workbook::from_toml_str(&content)
    }
}

/// Reads the calculation template from disk on every load.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    path: PathBuf,
}

impl TemplateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SurfaceSource for TemplateSource {
    type Surface = Workbook;

    fn load(&self) -> Result<Workbook, SurfaceError> {
        Workbook::open(&self.path).inspect_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to load calculation template");
        })
    }
}
