//! Rapport d'import avec dégradation gracieuse
//!
//! Les erreurs de ligne sont comptées et listées sans interrompre l'import;
//! seules les erreurs fatales (fichier illisible, transaction) l'annulent.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

/// Statut global de l'import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportStatus {
    /// Import réussi sans erreur
    Success,
    /// Import réussi, certaines lignes ignorées
    PartialSuccess,
    /// Import annulé (rollback)
    RolledBack,
    /// Aucune ligne importée
    Failed,
}

/// Niveau de sévérité des erreurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLevel {
    /// Erreur fatale: import abandonné
    Fatal,
    /// Erreur: ligne ignorée
    Error,
}

/// Erreur d'import avec contexte
#[derive(Debug, Clone, Serialize)]
pub struct ImportError {
    pub level: ErrorLevel,
    /// Numéro de ligne de données (1 = première ligne après les en-têtes)
    pub row: Option<usize>,
    /// Zone concernée (code ou identifiant)
    pub zone: Option<String>,
    /// Catégorie ("missing_reference", "validation"...)
    pub kind: Option<String>,
    pub message: String,
}

impl ImportError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            level: ErrorLevel::Fatal,
            row: None,
            zone: None,
            kind: None,
            message: message.into(),
        }
    }
}

/// Warning d'import: la ligne est importée mais quelque chose mérite attention
#[derive(Debug, Clone, Serialize)]
pub struct ImportWarning {
    pub row: Option<usize>,
    pub zone: String,
    pub message: String,
}

/// Statistiques par type (niveau administratif)
#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeStats {
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
}

impl TypeStats {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Rapport complet d'import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Libellé de l'import (année du recensement, "boundaries"...)
    pub label: String,
    /// Nom du fichier source
    pub source: Option<String>,
    /// Empreinte blake3 du fichier source
    pub checksum: Option<String>,
    pub duration_secs: f64,
    pub status: ImportStatus,

    /// Lignes lues dans le fichier
    pub rows_read: usize,
    /// Lignes insérées
    pub rows_imported: usize,
    /// Lignes mises à jour (limites administratives)
    pub rows_updated: usize,
    /// Lignes ignorées
    pub rows_skipped: usize,
    /// Lignes remplacées par une ligne ultérieure de la même zone
    pub rows_replaced: usize,

    /// Sous-enregistrements éducation insérés
    pub education_imported: usize,
    /// Lignes importées sans données d'éducation
    pub education_skipped: usize,

    /// Statistiques par niveau
    pub by_type: BTreeMap<String, TypeStats>,
    /// Lignes ignorées par catégorie d'erreur
    pub skipped_by_kind: BTreeMap<String, usize>,

    pub errors: Vec<ImportError>,
    pub warnings: Vec<ImportWarning>,
}

impl Default for ImportReport {
    fn default() -> Self {
        Self {
            label: String::new(),
            source: None,
            checksum: None,
            duration_secs: 0.0,
            status: ImportStatus::Success,
            rows_read: 0,
            rows_imported: 0,
            rows_updated: 0,
            rows_skipped: 0,
            rows_replaced: 0,
            education_imported: 0,
            education_skipped: 0,
            by_type: BTreeMap::new(),
            skipped_by_kind: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ImportReport {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    /// Enregistre une ligne insérée
    pub fn record_insert(&mut self, entity_type: &str) {
        self.rows_imported += 1;
        self.by_type
            .entry(entity_type.to_string())
            .or_default()
            .inserted += 1;
    }

    /// Enregistre une ligne mise à jour
    pub fn record_update(&mut self, entity_type: &str) {
        self.rows_updated += 1;
        self.by_type
            .entry(entity_type.to_string())
            .or_default()
            .updated += 1;
    }

    /// Enregistre une ligne ignorée
    pub fn record_error(&mut self, error: ImportError) {
        if error.level != ErrorLevel::Fatal {
            self.rows_skipped += 1;
            if let Some(ref kind) = error.kind {
                *self.skipped_by_kind.entry(kind.clone()).or_default() += 1;
            }
        }
        self.errors.push(error);
    }

    /// Enregistre une erreur pour un type donné (sans ligne associée)
    pub fn record_type_error(&mut self, entity_type: &str, error: ImportError) {
        self.by_type
            .entry(entity_type.to_string())
            .or_default()
            .errors += 1;
        self.record_error(error);
    }

    pub fn record_warning(&mut self, warning: ImportWarning) {
        self.warnings.push(warning);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        if self.status == ImportStatus::RolledBack {
            return;
        }

        let has_fatal = self.errors.iter().any(|e| e.level == ErrorLevel::Fatal);
        let has_errors = !self.errors.is_empty();
        let has_success = self.rows_imported > 0 || self.rows_updated > 0;

        self.status = if has_fatal {
            ImportStatus::Failed
        } else if has_errors && has_success {
            ImportStatus::PartialSuccess
        } else if has_errors {
            ImportStatus::Failed
        } else {
            ImportStatus::Success
        };
    }

    /// Marque l'import comme annulé: rien n'est conservé en base
    pub fn mark_rolled_back(&mut self, reason: &str) {
        self.errors.push(ImportError::fatal(reason));
        self.rows_imported = 0;
        self.rows_updated = 0;
        self.education_imported = 0;
        self.by_type.clear();
        self.status = ImportStatus::RolledBack;
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("IMPORT REPORT - {}", self.label);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        if let Some(ref source) = self.source {
            println!("Source: {}", source);
        }
        if let Some(ref checksum) = self.checksum {
            println!("Checksum: {}", checksum);
        }

        println!("\n--- SUMMARY ---");
        println!(
            "Rows: {} read, {} imported, {} updated, {} skipped, {} replaced",
            self.rows_read,
            self.rows_imported,
            self.rows_updated,
            self.rows_skipped,
            self.rows_replaced
        );
        if self.education_imported > 0 || self.education_skipped > 0 {
            println!(
                "Education: {} imported, {} without data",
                self.education_imported, self.education_skipped
            );
        }

        if !self.by_type.is_empty() {
            println!("\n--- BY LEVEL ---");
            for (type_name, stats) in &self.by_type {
                println!(
                    "  {}: {} inserted, {} updated, {} errors",
                    type_name, stats.inserted, stats.updated, stats.errors
                );
            }
        }

        if !self.skipped_by_kind.is_empty() {
            println!("\n--- SKIPPED BY KIND ---");
            for (kind, count) in &self.skipped_by_kind {
                println!("  {}: {}", kind, count);
            }
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(10) {
                match w.row {
                    Some(row) => println!("  [row {}] {}: {}", row, w.zone, w.message),
                    None => println!("  {}: {}", w.zone, w.message),
                }
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors.len());
            for e in self.errors.iter().take(20) {
                let location = match (e.row, &e.zone) {
                    (Some(row), Some(zone)) => format!("[row {}:{}]", row, zone),
                    (Some(row), None) => format!("[row {}]", row),
                    (None, Some(zone)) => format!("[{}]", zone),
                    _ => String::new(),
                };
                println!("  {:?} {} {}", e.level, location, e.message);
            }
            if self.errors.len() > 20 {
                println!("  ... and {} more", self.errors.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} imported, {} updated, {} skipped, {} errors",
            self.label,
            self.rows_imported,
            self.rows_updated,
            self.rows_skipped,
            self.errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_error(kind: &str) -> ImportError {
        ImportError {
            level: ErrorLevel::Error,
            row: Some(3),
            zone: Some("MR99".to_string()),
            kind: Some(kind.to_string()),
            message: "Region code MR99 not found".to_string(),
        }
    }

    #[test]
    fn test_import_report_default() {
        let report = ImportReport::default();
        assert_eq!(report.status, ImportStatus::Success);
        assert_eq!(report.rows_read, 0);
        assert_eq!(report.rows_imported, 0);
    }

    #[test]
    fn test_record_insert() {
        let mut report = ImportReport::new("2023");
        report.record_insert("region");
        report.record_insert("region");
        report.record_insert("commune");
        report.record_update("commune");

        assert_eq!(report.rows_imported, 3);
        assert_eq!(report.rows_updated, 1);
        assert_eq!(report.by_type.get("region").unwrap().inserted, 2);
        assert_eq!(report.by_type.get("commune").unwrap().total(), 2);
    }

    #[test]
    fn test_record_error_counts_by_kind() {
        let mut report = ImportReport::new("2023");
        report.record_error(row_error("missing_reference"));
        report.record_error(row_error("missing_reference"));
        report.record_type_error("region", row_error("validation"));

        assert_eq!(report.rows_skipped, 3);
        assert_eq!(report.skipped_by_kind["missing_reference"], 2);
        assert_eq!(report.skipped_by_kind["validation"], 1);
        assert_eq!(report.by_type["region"].errors, 1);
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut report = ImportReport::new("2023");
        report.record_insert("region");
        report.record_error(row_error("validation"));
        report.finalize();
        assert_eq!(report.status, ImportStatus::PartialSuccess);
    }

    #[test]
    fn test_finalize_failed_without_rows() {
        let mut report = ImportReport::new("2023");
        report.record_error(row_error("validation"));
        report.finalize();
        assert_eq!(report.status, ImportStatus::Failed);
    }

    #[test]
    fn test_rolled_back_is_final() {
        let mut report = ImportReport::new("2023");
        report.record_insert("region");
        report.education_imported = 1;
        report.mark_rolled_back("connection reset");
        report.finalize();

        assert_eq!(report.status, ImportStatus::RolledBack);
        assert_eq!(report.rows_imported, 0);
        assert_eq!(report.education_imported, 0);
        assert_eq!(report.rows_skipped, 0, "fatal errors are not row skips");
    }

    #[test]
    fn test_summary() {
        let mut report = ImportReport::new("2023");
        report.rows_imported = 63;
        report.rows_skipped = 2;
        let summary = report.summary();
        assert!(summary.contains("2023"));
        assert!(summary.contains("63 imported"));
    }

    #[test]
    fn test_serializes_to_json() {
        let mut report = ImportReport::new("2023");
        report.record_error(row_error("validation"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "Success");
        assert_eq!(json["errors"][0]["row"], 3);
        assert_eq!(json["skipped_by_kind"]["validation"], 1);
    }
}
