//! Lecteurs de fichiers tabulaires vers [`Dataset`]

pub mod csv;
pub mod json;
pub mod workbook;

use std::path::Path;

use tracing::debug;

use crate::{Dataset, FileFormat, TabularError};

/// Lit le contenu brut d'un fichier dans le format indiqué
pub fn read_bytes(bytes: &[u8], format: FileFormat) -> Result<Dataset, TabularError> {
    if bytes.is_empty() {
        return Err(TabularError::Empty(format!("{} payload", format)));
    }

    let mut dataset = match format {
        FileFormat::Csv => csv::read_csv(bytes)?,
        FileFormat::Xls | FileFormat::Xlsx => workbook::read_workbook(bytes, format)?,
        FileFormat::Json => json::read_json_records(bytes)?,
    };
    dataset.drop_blank_rows();

    debug!(
        format = %format,
        columns = dataset.headers.len(),
        rows = dataset.len(),
        "Dataset loaded"
    );
    Ok(dataset)
}

/// Lit un fichier, le format étant déduit de l'extension si non fourni
pub fn read_path(path: &Path, format: Option<FileFormat>) -> Result<Dataset, TabularError> {
    let format = match format {
        Some(f) => f,
        None => FileFormat::from_path(path)?,
    };
    let bytes = std::fs::read(path)?;
    read_bytes(&bytes, format)
}
