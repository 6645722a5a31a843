//! Orchestration d'un import: lecture, lot, remplacement transactionnel

use std::time::Instant;

use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tracing::{info, warn};

use rgph_io::{read_bytes, read_structured, Dataset, FileFormat, StructuredEntry, TabularError};

use crate::config::DefaultsConfig;
use crate::db::CensusImport;
use crate::import::batch::{build_batch, ImportBatch};
use crate::import::directory::ZoneDirectory;
use crate::import::structured::build_structured_batch;
use crate::report::{ImportError, ImportReport, ImportStatus};

/// Nature du contenu à importer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Tableau d'en-têtes et de lignes (CSV, XLS, XLSX, JSON en tableau)
    Tabular(FileFormat),
    /// Objet JSON indexé par code de zone
    Structured,
}

impl SourceKind {
    /// Un JSON dont la racine est un objet est lu au format structuré
    pub fn detect(format: FileFormat, bytes: &[u8]) -> Self {
        let root = bytes
            .strip_prefix(b"\xEF\xBB\xBF")
            .unwrap_or(bytes)
            .iter()
            .copied()
            .find(|b| !b.is_ascii_whitespace());
        match (format, root) {
            (FileFormat::Json, Some(b'{')) => SourceKind::Structured,
            _ => SourceKind::Tabular(format),
        }
    }
}

/// Contenu décodé
#[derive(Debug, Clone)]
pub enum ParsedSource {
    Tabular(Dataset),
    Structured(Vec<StructuredEntry>),
}

impl ParsedSource {
    /// Décode le contenu (opération bloquante)
    pub fn parse(bytes: &[u8], kind: SourceKind) -> Result<Self, TabularError> {
        match kind {
            SourceKind::Tabular(format) => read_bytes(bytes, format).map(ParsedSource::Tabular),
            SourceKind::Structured => read_structured(bytes).map(ParsedSource::Structured),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ParsedSource::Tabular(dataset) => dataset.len(),
            ParsedSource::Structured(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Construit le lot à partir de l'annuaire des zones
    pub fn build_batch(&self, directory: &ZoneDirectory, defaults: &DefaultsConfig) -> ImportBatch {
        match self {
            ParsedSource::Tabular(dataset) => build_batch(dataset, directory, defaults),
            ParsedSource::Structured(entries) => {
                build_structured_batch(entries, directory, defaults)
            }
        }
    }
}

/// Empreinte blake3 (hexadécimal) du contenu importé
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Paramètres d'un import
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub year: i32,
    pub is_projection: bool,
    pub source_name: String,
    pub checksum: String,
    pub source: ParsedSource,
    pub defaults: DefaultsConfig,
}

/// Importe le contenu pour un recensement.
///
/// Les erreurs de ligne sont reportées dans le rapport. Seules l'absence de
/// connexion et le chargement de l'annuaire remontent en erreur; un échec de
/// la transaction est reporté comme rollback.
pub async fn run_import(pool: &Pool, schema: &str, request: ImportRequest) -> Result<ImportReport> {
    let start = Instant::now();
    let mut report = ImportReport::new(&request.year.to_string());
    report.source = Some(request.source_name.clone());
    report.checksum = Some(request.checksum.clone());

    let mut client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    let directory = ZoneDirectory::load(&client, schema)
        .await
        .context("Failed to load administrative zones")?;
    if directory.is_empty() {
        warn!("No administrative zones in database, import boundaries first");
    }

    let batch = request.source.build_batch(&directory, &request.defaults);
    batch.fill_report(&mut report);

    if batch.is_empty() {
        warn!(year = request.year, "Nothing to import, census data left untouched");
        report.record_error(ImportError::fatal("No valid rows in file"));
        report.set_duration(start.elapsed());
        report.finalize();
        return Ok(report);
    }

    let import = CensusImport::begin(&mut client, schema, request.year, request.is_projection)
        .await?;

    let outcome = async {
        let summary = import.replace(&batch).await?;
        import
            .record_run(
                &request.source_name,
                &request.checksum,
                batch.rows_read,
                summary.inserted,
                batch.failures.len(),
            )
            .await?;
        Ok::<_, anyhow::Error>(summary)
    }
    .await;

    match outcome {
        Ok(summary) => match import.commit().await {
            Ok(census) => {
                for record in batch.records() {
                    report.record_insert(record.level.as_str());
                }
                report.education_imported = summary.education;
                info!(
                    census_id = census.id,
                    year = census.year,
                    replaced = summary.deleted,
                    inserted = summary.inserted,
                    "Census data imported"
                );
            }
            Err(e) => report.mark_rolled_back(&format!("{:#}", e)),
        },
        Err(e) => {
            let reason = format!("{:#}", e);
            import.rollback(&reason).await;
            report.mark_rolled_back(&reason);
        }
    }

    report.set_duration(start.elapsed());
    report.finalize();
    if report.status == ImportStatus::RolledBack {
        warn!(year = request.year, "Import rolled back");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_json_layout() {
        assert_eq!(
            SourceKind::detect(FileFormat::Json, b"  {\"01\": {}}"),
            SourceKind::Structured
        );
        assert_eq!(
            SourceKind::detect(FileFormat::Json, b"\xEF\xBB\xBF[{}]"),
            SourceKind::Tabular(FileFormat::Json)
        );
        assert_eq!(
            SourceKind::detect(FileFormat::Csv, b"{"),
            SourceKind::Tabular(FileFormat::Csv)
        );
    }

    #[test]
    fn test_checksum_stable() {
        let a = checksum(b"Region Code;Total Population\nMR01;430668\n");
        assert_eq!(a.len(), 64);
        assert_eq!(a, checksum(b"Region Code;Total Population\nMR01;430668\n"));
        assert_ne!(a, checksum(b""));
    }

    #[test]
    fn test_parse_unknown_layout() {
        let parsed = ParsedSource::parse(b"[1, 2]", SourceKind::Tabular(FileFormat::Json));
        assert!(parsed.is_err());
        let parsed = ParsedSource::parse(b"{\"01\": {\"population\": 5}}", SourceKind::Structured)
            .unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
