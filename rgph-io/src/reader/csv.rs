//! Lecture CSV
//!
//! Les exports Excel francophones utilisent souvent `;` et Windows-1252:
//! le séparateur est détecté sur la ligne d'en-tête et l'encodage retombe
//! sur Windows-1252 si le contenu n'est pas de l'UTF-8 valide.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;
use tracing::debug;

use crate::{Cell, Dataset, TabularError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Lit un CSV complet
pub fn read_csv(bytes: &[u8]) -> Result<Dataset, TabularError> {
    let text = decode(bytes);
    let delimiter = detect_delimiter(&text);

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(TabularError::Empty("CSV header line".into()));
    }

    let mut dataset = Dataset::new(headers);
    for record in reader.records() {
        let record = record?;
        dataset.push_row(record.iter().map(Cell::from).collect());
    }

    Ok(dataset)
}

/// Décode en UTF-8 (BOM toléré), sinon Windows-1252
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            debug!("CSV is not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded
        }
    }
}

/// Choisit entre tabulation, `,` et `;` selon la ligne d'en-tête.
/// À égalité, `;` l'emporte sur `,`, puis `,` sur la tabulation.
fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    [b'\t', b',', b';']
        .into_iter()
        .max_by_key(|d| first_line.bytes().filter(|b| b == d).count())
        .filter(|d| first_line.as_bytes().contains(d))
        .unwrap_or(b',')
}
