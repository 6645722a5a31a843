//! Correction des noms administratifs (pcode → nom canonique)

use std::collections::BTreeMap;

use deadpool_postgres::GenericClient;
use tracing::{debug, info};

use crate::config::NameCorrections;
use crate::models::ZoneLevel;

/// Zone renommée
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub level: ZoneLevel,
    pub code: String,
    pub old_name: String,
    pub new_name: String,
}

/// Résultat d'une passe de corrections
#[derive(Debug, Clone, Default)]
pub struct CorrectionReport {
    pub renamed: Vec<Rename>,
    /// Codes déjà corrects
    pub unchanged: usize,
    /// Codes absents de la base
    pub not_found: Vec<String>,
}

fn target(level: ZoneLevel) -> Option<(&'static str, &'static str, &'static str)> {
    match level {
        ZoneLevel::Region => Some(("region", "adm1_pcode", "adm1_en")),
        ZoneLevel::Department => Some(("department", "adm2_pcode", "adm2_en")),
        ZoneLevel::Commune => Some(("commune", "adm3_pcode", "adm3_en")),
        ZoneLevel::Country => None,
    }
}

async fn apply_level<C: GenericClient>(
    client: &C,
    schema: &str,
    level: ZoneLevel,
    names: &BTreeMap<String, String>,
    report: &mut CorrectionReport,
) -> Result<(), tokio_postgres::Error> {
    let Some((table, code_column, name_column)) = target(level) else {
        return Ok(());
    };
    let sql = format!(
        r#"
        WITH current AS (
            SELECT id, {name} AS name FROM {s}.{t} WHERE {code} = $1 FOR UPDATE
        ), renamed AS (
            UPDATE {s}.{t} z SET {name} = $2
            FROM current
            WHERE z.id = current.id AND current.name IS DISTINCT FROM $2
            RETURNING current.name AS old_name
        )
        SELECT (SELECT COUNT(*) FROM current) AS found,
               (SELECT old_name FROM renamed LIMIT 1) AS old_name
        "#,
        s = schema,
        t = table,
        code = code_column,
        name = name_column,
    );
    let stmt = client.prepare_cached(&sql).await?;

    for (code, name) in names {
        let row = client.query_one(&stmt, &[code, name]).await?;
        let found: i64 = row.get("found");
        let old_name: Option<String> = row.get("old_name");

        match (found, old_name) {
            (0, _) => {
                debug!(level = %level, code = %code, "Zone not found, correction skipped");
                report.not_found.push(code.clone());
            }
            (_, Some(old_name)) => {
                info!(level = %level, code = %code, from = %old_name, to = %name, "Zone renamed");
                report.renamed.push(Rename {
                    level,
                    code: code.clone(),
                    old_name,
                    new_name: name.clone(),
                });
            }
            (_, None) => report.unchanged += 1,
        }
    }
    Ok(())
}

/// Applique la table de corrections (à exécuter dans une transaction)
pub async fn apply_corrections<C: GenericClient>(
    client: &C,
    schema: &str,
    corrections: &NameCorrections,
) -> Result<CorrectionReport, tokio_postgres::Error> {
    let mut report = CorrectionReport::default();
    apply_level(client, schema, ZoneLevel::Region, &corrections.regions, &mut report).await?;
    apply_level(client, schema, ZoneLevel::Department, &corrections.departments, &mut report)
        .await?;
    apply_level(client, schema, ZoneLevel::Commune, &corrections.communes, &mut report).await?;
    Ok(report)
}
