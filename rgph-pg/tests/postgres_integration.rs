//! Tests d'intégration PostgreSQL
//!
//! Ces tests nécessitent une base PostgreSQL disponible.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! # Avec PostgreSQL local
//! cargo test --test postgres_integration -- --ignored
//!
//! # Avec Docker
//! docker run -d --name postgres-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgres:16
//! PGPASSWORD=test cargo test --test postgres_integration -- --ignored
//! ```

use anyhow::Result;
use deadpool_postgres::Pool;

use rgph_io::{FileFormat, Sheet};
use rgph_pg::config::DefaultsConfig;
use rgph_pg::db::{create_pool, create_schema, DatabaseConfig, SslMode};
use rgph_pg::export;
use rgph_pg::import::{
    checksum, run_boundary_import, run_import, ImportRequest, ParsedSource, SourceKind,
};
use rgph_pg::models::{Region, ZoneLevel};
use rgph_pg::report::ImportStatus;
use rgph_pg::store;

/// Configuration de test
fn test_config() -> DatabaseConfig {
    DatabaseConfig {
        host: std::env::var("PGHOST").unwrap_or_else(|_| "localhost".into()),
        port: std::env::var("PGPORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432),
        dbname: std::env::var("PGDATABASE").unwrap_or_else(|_| "rgph_test".into()),
        user: std::env::var("PGUSER").unwrap_or_else(|_| "postgres".into()),
        password: std::env::var("PGPASSWORD").ok(),
        pool_size: 4,
        ssl_mode: SslMode::Disable,
    }
}

fn feature(commune: &str, dept: &str, region: &str, x: f64) -> String {
    format!(
        r#"{{"type":"Feature","properties":{{
            "ADM0_EN":"Mauritania","ADM0_PCODE":"MR",
            "ADM1_EN":"Region {region}","ADM1_PCODE":"{region}",
            "ADM2_EN":"Dept {dept}","ADM2_PCODE":"{dept}",
            "ADM3_EN":"Commune {commune}","ADM3_PCODE":"{commune}",
            "date":"2017-12-04","validOn":"2018-01-22","AREA_SQKM":120.5}},
          "geometry":{{"type":"Polygon","coordinates":[[[{x},18.0],[{x1},18.0],[{x1},19.0],[{x},19.0],[{x},18.0]]]}}}}"#,
        x1 = x + 1.0
    )
}

fn boundaries() -> Vec<u8> {
    let features = [
        feature("MR01101", "MR011", "MR01", -10.0),
        feature("MR01102", "MR011", "MR01", -9.0),
        feature("MR02101", "MR021", "MR02", -8.0),
    ];
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
    .into_bytes()
}

const HEADER: &str = "Country Code;Region Code;Department Code;Commune Code;niveau_donnee;\
Total Population;Male Population;Female Population;Population 10+;Single Rate;Married Rate;\
Divorced Rate;Widowed Rate;School Enrollment Rate;Illiteracy Rate 10+;Population 15+;\
Illiteracy Rate 15+";

fn census_csv(rows: &[&str]) -> Vec<u8> {
    let mut content = String::from(HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    content.into_bytes()
}

const REGION_01: &str = "MR;MR01;;;region;430668;49,1;50,9;300000;39;52;3;6;61;35;280000;38";
const REGION_02: &str = "MR;MR02;;;region;294109;48.5;51.5;200000;40;51;4;5;58;41;190000;44";
const COMMUNE_01101: &str = "MR;MR01;MR011;MR01101;commune;48000;49;51;33000;41;50;4;5;55;40;30000;43";
const UNKNOWN_REGION: &str = "MR;MR99;;;region;1000;50;50;800;40;50;5;5;60;30;700;33";

/// Crée un schéma de test et charge les limites administratives
async fn setup(schema: &str) -> Result<Pool> {
    let pool = create_pool(&test_config())?;
    create_schema(&pool, schema, true).await?;

    let report = run_boundary_import(&pool, schema, &boundaries(), "communes.geojson").await?;
    assert_eq!(report.status, ImportStatus::Success);
    Ok(pool)
}

async fn teardown(pool: &Pool, schema: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
        .await?;
    Ok(())
}

async fn import_csv(
    pool: &Pool,
    schema: &str,
    year: i32,
    is_projection: bool,
    bytes: &[u8],
) -> Result<rgph_pg::ImportReport> {
    let source = ParsedSource::parse(bytes, SourceKind::detect(FileFormat::Csv, bytes))?;
    let request = ImportRequest {
        year,
        is_projection,
        source_name: "rgph.csv".into(),
        checksum: checksum(bytes),
        source,
        defaults: DefaultsConfig::from_preset("standard")?,
    };
    run_import(pool, schema, request).await
}

async fn census_rows(pool: &Pool, schema: &str, year: i32) -> Result<i64> {
    let client = pool.get().await?;
    let census = store::census::find_by_year(&client, schema, year)
        .await?
        .ok_or_else(|| anyhow::anyhow!("census {} missing", year))?;
    Ok(store::demographics::count_for_census(&client, schema, census.id).await?)
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_boundaries_build_hierarchy() -> Result<()> {
    let schema = "rgph_test_boundaries";
    let pool = setup(schema).await?;
    let client = pool.get().await?;

    let regions = store::list::<Region, _>(&client, schema).await?;
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].adm0_pcode, "MR");

    // Second import: mêmes pcodes, uniquement des mises à jour
    let report = run_boundary_import(&pool, schema, &boundaries(), "communes.geojson").await?;
    assert_eq!(report.rows_imported, 0);
    assert!(report.rows_updated >= 3);

    drop(client);
    teardown(&pool, schema).await
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_import_twice_same_count() -> Result<()> {
    let schema = "rgph_test_import";
    let pool = setup(schema).await?;
    let csv = census_csv(&[REGION_01, REGION_02, COMMUNE_01101, UNKNOWN_REGION]);

    let first = import_csv(&pool, schema, 2023, false, &csv).await?;
    assert_eq!(first.status, ImportStatus::PartialSuccess);
    assert_eq!(first.rows_imported, 3);
    assert_eq!(first.rows_skipped, 1);
    assert_eq!(census_rows(&pool, schema, 2023).await?, 3);

    let second = import_csv(&pool, schema, 2023, false, &csv).await?;
    assert_eq!(second.rows_imported, 3);
    assert_eq!(census_rows(&pool, schema, 2023).await?, 3);

    // Les taux sont bornés et arrondis
    let client = pool.get().await?;
    let census = store::census::find_by_year(&client, schema, 2023).await?.unwrap();
    let data = store::demographics::list_for_census(&client, schema, census.id).await?;
    assert!(data.iter().all(|d| d.validate().is_ok()));
    assert!(data.iter().any(|d| (d.stats.male_percentage - 49.1).abs() < 1e-9));

    let runs = store::demographics::list_import_runs(&client, schema, census.id).await?;
    assert_eq!(runs.len(), 2);

    drop(client);
    teardown(&pool, schema).await
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_empty_batch_keeps_previous_data() -> Result<()> {
    let schema = "rgph_test_empty";
    let pool = setup(schema).await?;

    import_csv(&pool, schema, 2013, false, &census_csv(&[REGION_01])).await?;
    let report = import_csv(&pool, schema, 2013, false, &census_csv(&[UNKNOWN_REGION])).await?;
    assert_eq!(report.status, ImportStatus::Failed);
    assert_eq!(census_rows(&pool, schema, 2013).await?, 1);

    teardown(&pool, schema).await
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_export_counts_match_data() -> Result<()> {
    let schema = "rgph_test_export";
    let pool = setup(schema).await?;
    import_csv(&pool, schema, 2023, false, &census_csv(&[REGION_01, COMMUNE_01101])).await?;

    let client = pool.get().await?;
    let full = export::load_full_export(&client, schema, Some(2023)).await?;
    assert_eq!(full.filename, "donnees_mauritanie_2023.xlsx");
    let rows: Vec<usize> = full.sheets.iter().map(Sheet::data_rows).collect();
    assert_eq!(rows, vec![1, 0, 1]);
    assert!(!full.render()?.is_empty());

    let regions = store::list::<Region, _>(&client, schema).await?;
    let without_data = regions.iter().find(|r| r.adm1_pcode == "MR02").unwrap();
    let zone = export::load_zone_export(&client, schema, ZoneLevel::Region, without_data.id, None).await?;
    assert_eq!(zone.sheets[0].rows[0][2], rgph_io::Cell::from("N/A"));

    let template = export::load_template(&client, schema).await?;
    assert_eq!(template.data_rows(), 2 + 2 + 3);

    drop(client);
    teardown(&pool, schema).await
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_census_prefers_real_over_projection() -> Result<()> {
    let schema = "rgph_test_census";
    let pool = setup(schema).await?;

    import_csv(&pool, schema, 2030, true, &census_csv(&[REGION_01, REGION_02])).await?;
    import_csv(&pool, schema, 2030, false, &census_csv(&[REGION_01])).await?;

    let client = pool.get().await?;
    let census = store::census::find_by_year(&client, schema, 2030).await?.unwrap();
    assert!(!census.is_projection);
    assert_eq!(census_rows(&pool, schema, 2030).await?, 1);
    assert_eq!(store::census::years(&client, schema).await?, vec![2030]);

    drop(client);
    teardown(&pool, schema).await
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_foreign_key_violation() -> Result<()> {
    let schema = "rgph_test_constraints";
    let pool = setup(schema).await?;
    let client = pool.get().await?;

    let mut region = store::list::<Region, _>(&client, schema).await?.remove(0);
    region.country = 9999;
    region.adm1_pcode = "MR77".into();
    let err = store::insert(&client, schema, &region).await.unwrap_err();
    assert_eq!(
        err.code(),
        Some(&tokio_postgres::error::SqlState::FOREIGN_KEY_VIOLATION)
    );

    drop(client);
    teardown(&pool, schema).await
}
