//! Transaction atomique pour l'import d'un recensement
//!
//! Suppression des données du recensement puis insertion du lot: en cas
//! d'erreur, le rollback laisse les données précédentes intactes.

use anyhow::{Context, Result};
use deadpool_postgres::{Object, Transaction};
use tracing::{error, info};

use crate::import::batch::ImportBatch;
use crate::models::Census;
use crate::store;
use crate::store::demographics::ReplaceSummary;

/// Gestionnaire de transaction pour un import de recensement
pub struct CensusImport<'a> {
    transaction: Transaction<'a>,
    schema: String,
    census: Census,
}

impl<'a> CensusImport<'a> {
    /// Démarre la transaction et obtient (ou crée) le recensement
    pub async fn begin(
        client: &'a mut Object,
        schema: &str,
        year: i32,
        is_projection: bool,
    ) -> Result<Self> {
        let transaction = client
            .transaction()
            .await
            .context("Failed to begin transaction")?;

        let census = store::census::get_or_create(&transaction, schema, year, is_projection)
            .await
            .context("Failed to get or create census")?;

        info!(
            census_id = census.id,
            year,
            is_projection,
            "Starting census import transaction"
        );

        Ok(Self {
            transaction,
            schema: schema.to_string(),
            census,
        })
    }

    /// Remplace les données du recensement par le lot
    pub async fn replace(&self, batch: &ImportBatch) -> Result<ReplaceSummary> {
        store::demographics::replace_for_census(
            &self.transaction,
            &self.schema,
            self.census.id,
            batch,
        )
        .await
        .context("Failed to replace census data")
    }

    /// Trace l'import dans `import_runs`
    pub async fn record_run(
        &self,
        source: &str,
        checksum: &str,
        rows_read: usize,
        rows_imported: usize,
        rows_skipped: usize,
    ) -> Result<i32> {
        store::demographics::record_import_run(
            &self.transaction,
            &self.schema,
            self.census.id,
            source,
            checksum,
            rows_read,
            rows_imported,
            rows_skipped,
        )
        .await
        .context("Failed to record import run")
    }

    /// Valide et commit la transaction
    pub async fn commit(self) -> Result<Census> {
        self.transaction
            .commit()
            .await
            .context("Failed to commit transaction")?;

        info!(census_id = self.census.id, year = self.census.year, "Census import committed");
        Ok(self.census)
    }

    /// Annule la transaction
    pub async fn rollback(self, reason: &str) {
        error!(
            census_id = self.census.id,
            year = self.census.year,
            reason = %reason,
            "Rolling back census import"
        );

        if let Err(e) = self.transaction.rollback().await {
            error!(error = %e, "Explicit rollback failed (will rollback on drop anyway)");
        }
    }
}
