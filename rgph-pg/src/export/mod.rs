//! Exports XLSX: données complètes, données d'une zone, modèle d'import

pub mod template;
pub mod workbook;

use thiserror::Error;

use rgph_io::{write_workbook, FileFormat, Sheet, TabularError};

pub use template::{load_template, TEMPLATE_FILENAME};
pub use workbook::{load_full_export, load_zone_export};

/// Erreurs d'export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Type de zone non valide.")]
    InvalidZoneType,

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Tabular(#[from] TabularError),
}

/// Classeur prêt à être écrit
#[derive(Debug, Clone)]
pub struct WorkbookExport {
    pub filename: String,
    pub sheets: Vec<Sheet>,
}

impl WorkbookExport {
    pub const CONTENT_TYPE: &'static str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

    /// Lignes de données, toutes feuilles confondues
    pub fn data_rows(&self) -> usize {
        self.sheets.iter().map(Sheet::data_rows).sum()
    }

    /// Écrit le classeur (opération bloquante)
    pub fn render(&self) -> Result<Vec<u8>, TabularError> {
        write_workbook(&self.sheets)
    }
}
