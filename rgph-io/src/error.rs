//! Types d'erreurs pour le crate rgph-io

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture ou de l'écriture d'un fichier
#[derive(Debug, Error)]
pub enum TabularError {
    /// Erreur d'I/O lors de la lecture du fichier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Format de fichier non reconnu
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Fichier sans en-têtes ni lignes
    #[error("Empty file: {0}")]
    Empty(String),

    /// Erreur de lecture CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Classeur XLS/XLSX illisible
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// JSON invalide ou de structure inattendue
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Erreur de structure JSON (document valide mais forme inattendue)
    #[error("Unexpected JSON layout: {0}")]
    JsonLayout(String),

    /// Erreur d'écriture XLSX
    #[error("XLSX writer error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// GeoJSON invalide
    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    /// Propriété manquante ou invalide dans une feature GeoJSON
    #[error("Invalid property {property} in feature {feature}: {reason}")]
    InvalidProperty {
        feature: usize,
        property: String,
        reason: String,
    },
}

impl TabularError {
    /// Crée une erreur de classeur avec contexte
    pub fn workbook(reason: impl std::fmt::Display) -> Self {
        Self::Workbook(reason.to_string())
    }

    /// Crée une erreur de propriété GeoJSON
    pub fn invalid_property(
        feature: usize,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            feature,
            property: property.into(),
            reason: reason.into(),
        }
    }
}
