//! Lot d'import indexé par zone
//!
//! Une seule entrée par zone: une ligne ultérieure pour la même zone remplace
//! la précédente et produit un warning.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use rgph_io::Dataset;

use crate::config::DefaultsConfig;
use crate::import::columns::{is_template_annotation, ColumnMap};
use crate::import::directory::ZoneDirectory;
use crate::import::row::{build_row, ImportRecord, RowError};
use crate::models::ZoneKey;
use crate::report::{ErrorLevel, ImportError, ImportReport, ImportWarning};

/// Ligne rejetée
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// Numéro de ligne de données (à partir de 1)
    pub row: usize,
    pub zone: Option<String>,
    pub error: RowError,
}

/// Ligne remplacée par une ligne ultérieure de la même zone
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub row: usize,
    pub replaced_row: usize,
    pub zone: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    records: BTreeMap<ZoneKey, (usize, ImportRecord)>,
    pub rows_read: usize,
    pub failures: Vec<RowFailure>,
    pub replacements: Vec<Replacement>,
}

impl ImportBatch {
    /// Lot vide pour un fichier de `rows_read` lignes
    pub fn new(rows_read: usize) -> Self {
        Self {
            rows_read,
            ..Default::default()
        }
    }

    /// Ajoute l'enregistrement de la ligne `row`
    pub fn push(&mut self, row: usize, record: ImportRecord) {
        let code = record.code.clone();
        if let Some((replaced_row, _)) = self.records.insert(record.zone, (row, record)) {
            warn!(row, replaced_row, zone = %code, "Duplicate zone in file, last row wins");
            self.replacements.push(Replacement {
                row,
                replaced_row,
                zone: code,
            });
        }
    }

    pub fn fail(&mut self, row: usize, zone: Option<String>, error: RowError) {
        warn!(row, zone = zone.as_deref().unwrap_or("-"), kind = error.kind(), "Row skipped: {}", error);
        self.failures.push(RowFailure { row, zone, error });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Enregistrements, ordonnés par zone
    pub fn records(&self) -> impl Iterator<Item = &ImportRecord> {
        self.records.values().map(|(_, record)| record)
    }

    pub fn get(&self, zone: &ZoneKey) -> Option<&ImportRecord> {
        self.records.get(zone).map(|(_, record)| record)
    }

    /// Enregistrements sans sous-enregistrement éducation
    pub fn education_skipped(&self) -> usize {
        self.records().filter(|r| r.education.is_none()).count()
    }

    /// Reporte lectures, rejets et remplacements dans le rapport
    pub fn fill_report(&self, report: &mut ImportReport) {
        report.rows_read = self.rows_read;
        report.rows_replaced = self.replacements.len();
        report.education_skipped = self.education_skipped();

        for failure in &self.failures {
            report.record_error(ImportError {
                level: ErrorLevel::Error,
                row: Some(failure.row),
                zone: failure.zone.clone(),
                kind: Some(failure.error.kind().to_string()),
                message: failure.error.to_string(),
            });
        }
        for replacement in &self.replacements {
            report.record_warning(ImportWarning {
                row: Some(replacement.row),
                zone: replacement.zone.clone(),
                message: format!("replaces row {}", replacement.replaced_row),
            });
        }
    }
}

/// Convertit un fichier tabulaire en lot
pub fn build_batch(
    dataset: &Dataset,
    directory: &ZoneDirectory,
    defaults: &DefaultsConfig,
) -> ImportBatch {
    let map = ColumnMap::resolve(dataset);
    let missing = map.missing_demographic();
    if !missing.is_empty() {
        debug!(
            missing = ?missing.iter().map(|f| f.header()).collect::<Vec<_>>(),
            "Columns absent from file, defaults apply"
        );
    }
    if !map.has_education() {
        debug!("No education columns, education sub-records skipped");
    }

    let mut batch = ImportBatch::new(dataset.len());
    let mut annotations = 0;

    for row in 0..dataset.len() {
        if is_template_annotation(dataset, row) {
            annotations += 1;
            continue;
        }
        match build_row(dataset, &map, directory, defaults, row) {
            Ok(record) => batch.push(row + 1, record),
            Err(error) => {
                let zone = row_zone_label(dataset, &map, row);
                batch.fail(row + 1, zone, error);
            }
        }
    }

    if annotations > 0 {
        debug!(rows = annotations, "Template description and instruction rows ignored");
        batch.rows_read -= annotations;
    }

    debug!(
        rows = batch.rows_read,
        records = batch.len(),
        skipped = batch.failures.len(),
        "Batch built"
    );
    batch
}

/// Code le plus précis présent sur la ligne, pour les messages
fn row_zone_label(dataset: &Dataset, map: &ColumnMap, row: usize) -> Option<String> {
    use crate::import::columns::ZoneColumn;

    [
        ZoneColumn::CommuneCode,
        ZoneColumn::DepartmentCode,
        ZoneColumn::RegionCode,
        ZoneColumn::CountryCode,
    ]
    .into_iter()
    .find_map(|column| map.zone(column).and_then(|c| dataset.cell(row, c).as_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::directory::ZoneEntry;
    use crate::models::ZoneLevel;
    use rgph_io::Cell;

    fn directory() -> ZoneDirectory {
        let mut dir = ZoneDirectory::default();
        dir.insert(ZoneLevel::Country, ZoneEntry::new(1, None, "MR", "Mauritania"));
        dir.insert(ZoneLevel::Region, ZoneEntry::new(10, Some(1), "MR01", "Hodh Chargui"));
        dir.insert(ZoneLevel::Region, ZoneEntry::new(11, Some(1), "MR02", "Hodh El Gharbi"));
        dir
    }

    /// Fichier au format des exports (en-têtes français)
    fn dataset(rows: &[(&str, f64)]) -> Dataset {
        let mut ds = Dataset::new(
            [
                "Code Pays",
                "Code Région",
                "Niveau",
                "Population Totale",
                "Pourcentage Hommes",
                "Pourcentage Femmes",
                "Population 10+",
                "Taux Célibataire",
                "Taux Marié",
                "Taux Divorcé",
                "Taux Veuf",
                "Taux Scolarisation",
                "Taux d'Analphabétisme (10+)",
                "Population 15+",
                "Taux d'Analphabétisme (15+)",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        );
        for (code, total) in rows {
            let mut row = vec![Cell::from("MR"), Cell::from(*code), Cell::from("region")];
            row.push(Cell::from(*total));
            row.extend([49.0, 51.0, 1000.0, 40.0, 50.0, 5.0, 5.0, 60.0, 30.0, 900.0, 33.0].map(Cell::from));
            ds.push_row(row);
        }
        ds
    }

    #[test]
    fn test_unknown_codes_are_skipped() {
        let ds = dataset(&[("MR01", 100.0), ("MR77", 200.0), ("MR02", 300.0)]);
        let defaults = DefaultsConfig::from_preset("standard").unwrap();
        let batch = build_batch(&ds, &directory(), &defaults);

        assert_eq!(batch.rows_read, 3);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].row, 2);
        assert_eq!(batch.failures[0].zone.as_deref(), Some("MR77"));

        let mut report = ImportReport::new("2023");
        batch.fill_report(&mut report);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(report.skipped_by_kind["missing_reference"], 1);
        assert_eq!(report.education_skipped, 2);
    }

    #[test]
    fn test_duplicate_zone_last_row_wins() {
        let ds = dataset(&[("MR01", 100.0), ("MR01", 150.0)]);
        let defaults = DefaultsConfig::from_preset("standard").unwrap();
        let batch = build_batch(&ds, &directory(), &defaults);

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.replacements.len(), 1);
        assert_eq!(batch.replacements[0].replaced_row, 1);
        let record = batch.records().next().unwrap();
        assert_eq!(record.stats.total_population, 150);

        let mut report = ImportReport::new("2023");
        batch.fill_report(&mut report);
        assert_eq!(report.rows_replaced, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_filled_template_annotations_ignored() {
        use crate::import::columns::{template_columns, TEMPLATE_INSTRUCTIONS};

        let mut ds = dataset(&[("MR01", 100.0)]);
        let descriptions = ["Code du pays (obligatoire)", "Code de la région (obligatoire)"];
        let mut description_row: Vec<Cell> = descriptions.iter().map(|d| Cell::from(*d)).collect();
        description_row.resize(ds.headers.len(), Cell::Empty);
        ds.rows.insert(0, description_row);
        for line in TEMPLATE_INSTRUCTIONS {
            let mut row = vec![Cell::from(line)];
            row.resize(ds.headers.len(), Cell::Empty);
            ds.rows.push(row);
        }
        assert!(template_columns().iter().any(|(_, d)| *d == descriptions[0]));

        let defaults = DefaultsConfig::from_preset("standard").unwrap();
        let batch = build_batch(&ds, &directory(), &defaults);

        assert_eq!(batch.rows_read, 1);
        assert_eq!(batch.len(), 1);
        assert!(batch.failures.is_empty());
    }

    #[test]
    fn test_same_file_twice_same_batch() {
        let ds = dataset(&[("MR01", 100.0), ("MR02", 300.0)]);
        let defaults = DefaultsConfig::from_preset("standard").unwrap();
        let first = build_batch(&ds, &directory(), &defaults);
        let second = build_batch(&ds, &directory(), &defaults);
        assert_eq!(first.len(), second.len());
        assert!(first.records().eq(second.records()));
    }
}
