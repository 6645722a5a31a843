//! Import des limites administratives (GeoJSON des communes)

use std::time::Instant;

use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tracing::{error, info, warn};

use rgph_io::parse_boundaries;

use crate::report::{ErrorLevel, ImportError, ImportReport};
use crate::store::hierarchy::upsert_boundaries;

/// Importe un FeatureCollection de communes dans une transaction.
///
/// Les features invalides sont ignorées et listées dans le rapport; une
/// erreur SQL annule tout l'import.
pub async fn run_boundary_import(
    pool: &Pool,
    schema: &str,
    bytes: &[u8],
    source_name: &str,
) -> Result<ImportReport> {
    let start = Instant::now();
    let mut report = ImportReport::new("boundaries");
    report.source = Some(source_name.to_string());
    report.checksum = Some(crate::import::pipeline::checksum(bytes));

    let set = parse_boundaries(bytes).context("Failed to parse GeoJSON boundaries")?;
    report.rows_read = set.communes.len() + set.errors.len();

    for e in &set.errors {
        warn!(error = %e, "Feature skipped");
        report.record_error(ImportError {
            level: ErrorLevel::Error,
            row: None,
            zone: None,
            kind: Some("validation".into()),
            message: e.to_string(),
        });
    }

    if set.is_empty() {
        report.record_error(ImportError::fatal("No valid commune feature in file"));
        report.set_duration(start.elapsed());
        report.finalize();
        return Ok(report);
    }

    let mut client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    let transaction = client
        .transaction()
        .await
        .context("Failed to begin transaction")?;

    match upsert_boundaries(&transaction, schema, &set, &mut report).await {
        Ok(()) => {
            transaction
                .commit()
                .await
                .context("Failed to commit boundaries")?;
            info!(
                inserted = report.rows_imported,
                updated = report.rows_updated,
                "Boundaries committed"
            );
        }
        Err(e) => {
            error!(error = %e, "Rolling back boundary import");
            if let Err(rollback_error) = transaction.rollback().await {
                error!(error = %rollback_error, "Explicit rollback failed (will rollback on drop anyway)");
            }
            report.mark_rolled_back(&e.to_string());
        }
    }

    report.set_duration(start.elapsed());
    report.finalize();
    Ok(report)
}
