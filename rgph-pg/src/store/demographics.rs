//! Statistiques démographiques et niveaux d'instruction

use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::debug;

use crate::import::batch::ImportBatch;
use crate::import::columns::DemographicField;
use crate::models::{DemographicData, DemographicStats, EducationShares, ImportRun};
use crate::store::Param;

const ZONE_COLUMNS: [&str; 5] = ["census_id", "country_id", "region_id", "department_id", "commune_id"];

const EDUCATION_COLUMNS: [&str; 6] = [
    "no_education",
    "preschool",
    "primary_level",
    "middle_school",
    "high_school",
    "university",
];

fn stat_columns() -> impl Iterator<Item = &'static str> {
    DemographicField::ALL.into_iter().map(DemographicField::column)
}

/// Colonnes écrites dans `demographic_data`, dans l'ordre de [`row_params`]
fn insert_columns() -> Vec<&'static str> {
    ZONE_COLUMNS.into_iter().chain(stat_columns()).collect()
}

fn select_sql(schema: &str) -> String {
    let data_columns = std::iter::once("id")
        .chain(insert_columns())
        .map(|c| format!("d.{}", c))
        .chain(EDUCATION_COLUMNS.iter().map(|c| format!("e.{}", c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {} FROM {s}.demographic_data d LEFT JOIN {s}.education_level e ON e.demographic_data_id = d.id",
        data_columns,
        s = schema
    )
}

fn stats_params(stats: &DemographicStats) -> [Param<'_>; 14] {
    [
        &stats.total_population,
        &stats.male_percentage,
        &stats.female_percentage,
        &stats.urban_percentage,
        &stats.rural_percentage,
        &stats.population_10_plus,
        &stats.single_rate,
        &stats.married_rate,
        &stats.divorced_rate,
        &stats.widowed_rate,
        &stats.school_enrollment_rate,
        &stats.illiteracy_rate_10_plus,
        &stats.population_15_plus,
        &stats.illiteracy_rate_15_plus,
    ]
}

fn row_params<'a>(
    census: &'a i32,
    zone: [&'a Option<i32>; 4],
    stats: &'a DemographicStats,
) -> Vec<Param<'a>> {
    let mut params: Vec<Param<'a>> = Vec::with_capacity(ZONE_COLUMNS.len() + 15);
    params.push(census);
    params.extend(zone.into_iter().map(|z| z as Param<'a>));
    params.extend(stats_params(stats));
    params
}

fn from_row(row: &Row) -> Result<DemographicData, tokio_postgres::Error> {
    let stats = DemographicStats {
        total_population: row.try_get("total_population")?,
        male_percentage: row.try_get("male_percentage")?,
        female_percentage: row.try_get("female_percentage")?,
        urban_percentage: row.try_get("urban_percentage")?,
        rural_percentage: row.try_get("rural_percentage")?,
        population_10_plus: row.try_get("population_10_plus")?,
        single_rate: row.try_get("single_rate")?,
        married_rate: row.try_get("married_rate")?,
        divorced_rate: row.try_get("divorced_rate")?,
        widowed_rate: row.try_get("widowed_rate")?,
        school_enrollment_rate: row.try_get("school_enrollment_rate")?,
        illiteracy_rate_10_plus: row.try_get("illiteracy_rate_10_plus")?,
        population_15_plus: row.try_get("population_15_plus")?,
        illiteracy_rate_15_plus: row.try_get("illiteracy_rate_15_plus")?,
    };

    let education = match row.try_get::<_, Option<f64>>("no_education")? {
        Some(no_education) => Some(EducationShares {
            no_education,
            preschool: row.try_get("preschool")?,
            primary: row.try_get("primary_level")?,
            middle_school: row.try_get("middle_school")?,
            high_school: row.try_get("high_school")?,
            university: row.try_get("university")?,
        }),
        None => None,
    };

    Ok(DemographicData {
        id: row.try_get("id")?,
        census: row.try_get("census_id")?,
        country: row.try_get("country_id")?,
        region: row.try_get("region_id")?,
        department: row.try_get("department_id")?,
        commune: row.try_get("commune_id")?,
        stats,
        education,
    })
}

/// Données d'un recensement
pub async fn list_for_census<C: GenericClient>(
    client: &C,
    schema: &str,
    census_id: i32,
) -> Result<Vec<DemographicData>, tokio_postgres::Error> {
    let sql = format!("{} WHERE d.census_id = $1 ORDER BY d.id", select_sql(schema));
    client
        .query(sql.as_str(), &[&census_id])
        .await?
        .iter()
        .map(from_row)
        .collect()
}

pub async fn get<C: GenericClient>(
    client: &C,
    schema: &str,
    id: i32,
) -> Result<Option<DemographicData>, tokio_postgres::Error> {
    let sql = format!("{} WHERE d.id = $1", select_sql(schema));
    client
        .query_opt(sql.as_str(), &[&id])
        .await?
        .as_ref()
        .map(from_row)
        .transpose()
}

fn insert_sql(schema: &str) -> String {
    let columns = insert_columns();
    let placeholders = (1..=columns.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {}.demographic_data ({}) VALUES ({}) RETURNING id",
        schema,
        columns.join(", "),
        placeholders
    )
}

fn education_upsert_sql(schema: &str) -> String {
    format!(
        r#"
        INSERT INTO {}.education_level (demographic_data_id, {})
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (demographic_data_id) DO UPDATE SET
            no_education = EXCLUDED.no_education,
            preschool = EXCLUDED.preschool,
            primary_level = EXCLUDED.primary_level,
            middle_school = EXCLUDED.middle_school,
            high_school = EXCLUDED.high_school,
            university = EXCLUDED.university
        "#,
        schema,
        EDUCATION_COLUMNS.join(", ")
    )
}

async fn write_education<C: GenericClient>(
    client: &C,
    schema: &str,
    data_id: i32,
    education: Option<&EducationShares>,
) -> Result<(), tokio_postgres::Error> {
    match education {
        Some(e) => {
            let stmt = client.prepare_cached(&education_upsert_sql(schema)).await?;
            client
                .execute(
                    &stmt,
                    &[
                        &data_id,
                        &e.no_education,
                        &e.preschool,
                        &e.primary,
                        &e.middle_school,
                        &e.high_school,
                        &e.university,
                    ],
                )
                .await?;
        }
        None => {
            let sql = format!(
                "DELETE FROM {}.education_level WHERE demographic_data_id = $1",
                schema
            );
            client.execute(sql.as_str(), &[&data_id]).await?;
        }
    }
    Ok(())
}

/// Insère une ligne et son sous-enregistrement éducation
pub async fn insert<C: GenericClient>(
    client: &C,
    schema: &str,
    data: &DemographicData,
) -> Result<i32, tokio_postgres::Error> {
    let params = row_params(
        &data.census,
        [&data.country, &data.region, &data.department, &data.commune],
        &data.stats,
    );
    let row = client.query_one(insert_sql(schema).as_str(), &params).await?;
    let id: i32 = row.get(0);
    write_education(client, schema, id, data.education.as_ref()).await?;
    Ok(id)
}

/// Met à jour une ligne; l'éducation absente est supprimée.
/// Retourne `false` si l'id n'existe pas.
pub async fn update<C: GenericClient>(
    client: &C,
    schema: &str,
    id: i32,
    data: &DemographicData,
) -> Result<bool, tokio_postgres::Error> {
    let columns = insert_columns();
    let assignments = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", c, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {}.demographic_data SET {} WHERE id = ${}",
        schema,
        assignments,
        columns.len() + 1
    );

    let mut params = row_params(
        &data.census,
        [&data.country, &data.region, &data.department, &data.commune],
        &data.stats,
    );
    params.push(&id);
    if client.execute(sql.as_str(), &params).await? == 0 {
        return Ok(false);
    }
    write_education(client, schema, id, data.education.as_ref()).await?;
    Ok(true)
}

pub async fn delete<C: GenericClient>(
    client: &C,
    schema: &str,
    id: i32,
) -> Result<bool, tokio_postgres::Error> {
    let sql = format!("DELETE FROM {}.demographic_data WHERE id = $1", schema);
    Ok(client.execute(sql.as_str(), &[&id]).await? > 0)
}

/// Résultat d'un remplacement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub deleted: u64,
    pub inserted: usize,
    pub education: usize,
}

/// Remplace toutes les données d'un recensement par le lot.
///
/// À exécuter dans une transaction: la suppression et les insertions forment
/// un seul remplacement.
pub async fn replace_for_census<C: GenericClient>(
    client: &C,
    schema: &str,
    census_id: i32,
    batch: &ImportBatch,
) -> Result<ReplaceSummary, tokio_postgres::Error> {
    let deleted = client
        .execute(
            format!("DELETE FROM {}.demographic_data WHERE census_id = $1", schema).as_str(),
            &[&census_id],
        )
        .await?;

    let insert = client.prepare_cached(&insert_sql(schema)).await?;
    let education = client.prepare_cached(&education_upsert_sql(schema)).await?;

    let mut summary = ReplaceSummary {
        deleted,
        ..Default::default()
    };
    for record in batch.records() {
        let zone = &record.zone;
        let params = row_params(
            &census_id,
            [&zone.country, &zone.region, &zone.department, &zone.commune],
            &record.stats,
        );
        let id: i32 = client.query_one(&insert, &params).await?.get(0);
        summary.inserted += 1;

        if let Some(e) = &record.education {
            client
                .execute(
                    &education,
                    &[
                        &id,
                        &e.no_education,
                        &e.preschool,
                        &e.primary,
                        &e.middle_school,
                        &e.high_school,
                        &e.university,
                    ],
                )
                .await?;
            summary.education += 1;
        }
    }

    debug!(
        census_id,
        deleted = summary.deleted,
        inserted = summary.inserted,
        education = summary.education,
        "Census data replaced"
    );
    Ok(summary)
}

/// Nombre de lignes d'un recensement
pub async fn count_for_census<C: GenericClient>(
    client: &C,
    schema: &str,
    census_id: i32,
) -> Result<i64, tokio_postgres::Error> {
    let sql = format!(
        "SELECT COUNT(*) FROM {}.demographic_data WHERE census_id = $1",
        schema
    );
    Ok(client.query_one(sql.as_str(), &[&census_id]).await?.get(0))
}

/// Trace d'un import validé
#[allow(clippy::too_many_arguments)]
pub async fn record_import_run<C: GenericClient>(
    client: &C,
    schema: &str,
    census_id: i32,
    source: &str,
    checksum: &str,
    rows_read: usize,
    rows_imported: usize,
    rows_skipped: usize,
) -> Result<i32, tokio_postgres::Error> {
    let sql = format!(
        r#"
        INSERT INTO {}.import_runs
            (census_id, source, checksum, rows_read, rows_imported, rows_skipped)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
        schema
    );
    let counts = [rows_read, rows_imported, rows_skipped].map(|n| n as i32);
    let row = client
        .query_one(
            sql.as_str(),
            &[&census_id, &source, &checksum, &counts[0], &counts[1], &counts[2]],
        )
        .await?;
    Ok(row.get(0))
}

/// Imports d'un recensement, du plus récent au plus ancien
pub async fn list_import_runs<C: GenericClient>(
    client: &C,
    schema: &str,
    census_id: i32,
) -> Result<Vec<ImportRun>, tokio_postgres::Error> {
    let sql = format!(
        r#"
        SELECT id, census_id, source, checksum, rows_read, rows_imported, rows_skipped, imported_at
        FROM {}.import_runs WHERE census_id = $1 ORDER BY imported_at DESC, id DESC
        "#,
        schema
    );
    client
        .query(sql.as_str(), &[&census_id])
        .await?
        .iter()
        .map(|row| {
            Ok(ImportRun {
                id: row.try_get("id")?,
                census: row.try_get("census_id")?,
                source: row.try_get("source")?,
                checksum: row.try_get("checksum")?,
                rows_read: row.try_get("rows_read")?,
                rows_imported: row.try_get("rows_imported")?,
                rows_skipped: row.try_get("rows_skipped")?,
                imported_at: row.try_get("imported_at")?,
            })
        })
        .collect()
}
