//! Création du schéma: hiérarchie, recensements, statistiques

use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tracing::info;

use crate::import::columns::{DemographicField, ValueKind};

/// Tables créées, dans l'ordre des dépendances
pub const TABLES: [&str; 8] = [
    "country",
    "region",
    "department",
    "commune",
    "census",
    "demographic_data",
    "education_level",
    "import_runs",
];

/// Crée le schéma et les tables (idempotent)
pub async fn create_schema(pool: &Pool, schema: &str, drop_existing: bool) -> Result<()> {
    let client = pool.get().await.context("Failed to get connection from pool")?;

    if drop_existing {
        client
            .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema), &[])
            .await
            .context("Failed to drop schema")?;
    }

    client
        .batch_execute(&schema_sql(schema))
        .await
        .with_context(|| format!("Failed to create schema {}", schema))?;

    info!(schema = %schema, tables = TABLES.len(), "Schema ready");
    Ok(())
}

/// DDL complet du schéma
pub fn schema_sql(schema: &str) -> String {
    let rate_checks = DemographicField::ALL
        .iter()
        .filter(|f| f.kind() == ValueKind::Rate)
        .map(|f| format!("{} BETWEEN 0 AND 100", f.column()))
        .collect::<Vec<_>>()
        .join("\n                AND ");

    let stat_columns = DemographicField::ALL
        .iter()
        .map(|f| match f.kind() {
            ValueKind::Count => format!("{} BIGINT NOT NULL CHECK ({} >= 0)", f.column(), f.column()),
            ValueKind::Rate => format!("{} DOUBLE PRECISION NOT NULL", f.column()),
        })
        .collect::<Vec<_>>()
        .join(",\n            ");

    format!(
        r#"
        CREATE SCHEMA IF NOT EXISTS {s};

        CREATE TABLE IF NOT EXISTS {s}.country (
            id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            code VARCHAR(10) NOT NULL UNIQUE,
            geo_json JSONB NOT NULL DEFAULT '{{}}'::jsonb
        );

        CREATE TABLE IF NOT EXISTS {s}.region (
            id SERIAL PRIMARY KEY,
            country_id INTEGER NOT NULL REFERENCES {s}.country(id) ON DELETE CASCADE,
            adm0_en VARCHAR(100) NOT NULL,
            adm0_pcode VARCHAR(10) NOT NULL,
            adm1_en VARCHAR(100) NOT NULL,
            adm1_pcode VARCHAR(10) NOT NULL UNIQUE,
            geo_json JSONB NOT NULL,
            date DATE NOT NULL,
            valid_on DATE NOT NULL,
            valid_to DATE,
            area_sqkm DOUBLE PRECISION NOT NULL
        );

        CREATE TABLE IF NOT EXISTS {s}.department (
            id SERIAL PRIMARY KEY,
            region_id INTEGER NOT NULL REFERENCES {s}.region(id) ON DELETE CASCADE,
            adm2_en VARCHAR(100) NOT NULL,
            adm2_pcode VARCHAR(10) NOT NULL UNIQUE,
            geo_json JSONB NOT NULL,
            date DATE NOT NULL,
            valid_on DATE NOT NULL,
            valid_to DATE,
            area_sqkm DOUBLE PRECISION NOT NULL
        );

        CREATE TABLE IF NOT EXISTS {s}.commune (
            id SERIAL PRIMARY KEY,
            department_id INTEGER NOT NULL REFERENCES {s}.department(id) ON DELETE CASCADE,
            adm3_en VARCHAR(100) NOT NULL,
            adm3_pcode VARCHAR(10) NOT NULL UNIQUE,
            adm3_ref VARCHAR(100),
            real_name VARCHAR(100) NOT NULL,
            geo_json JSONB NOT NULL,
            date DATE NOT NULL,
            valid_on DATE NOT NULL,
            valid_to DATE,
            area_sqkm DOUBLE PRECISION NOT NULL
        );

        CREATE TABLE IF NOT EXISTS {s}.census (
            id SERIAL PRIMARY KEY,
            year INTEGER NOT NULL,
            is_projection BOOLEAN NOT NULL DEFAULT FALSE,
            UNIQUE (year, is_projection)
        );

        CREATE TABLE IF NOT EXISTS {s}.demographic_data (
            id SERIAL PRIMARY KEY,
            census_id INTEGER NOT NULL REFERENCES {s}.census(id) ON DELETE CASCADE,
            country_id INTEGER REFERENCES {s}.country(id) ON DELETE CASCADE,
            region_id INTEGER REFERENCES {s}.region(id) ON DELETE CASCADE,
            department_id INTEGER REFERENCES {s}.department(id) ON DELETE CASCADE,
            commune_id INTEGER REFERENCES {s}.commune(id) ON DELETE CASCADE,
            {stat_columns},
            CONSTRAINT demographic_data_zone_check
                CHECK (num_nonnulls(country_id, region_id, department_id, commune_id) >= 1),
            CONSTRAINT demographic_data_rates_check
                CHECK ({rate_checks})
        );

        CREATE UNIQUE INDEX IF NOT EXISTS demographic_data_zone_key
            ON {s}.demographic_data (
                census_id,
                COALESCE(country_id, 0),
                COALESCE(region_id, 0),
                COALESCE(department_id, 0),
                COALESCE(commune_id, 0)
            );

        CREATE INDEX IF NOT EXISTS demographic_data_census_idx
            ON {s}.demographic_data (census_id);

        CREATE TABLE IF NOT EXISTS {s}.education_level (
            id SERIAL PRIMARY KEY,
            demographic_data_id INTEGER NOT NULL UNIQUE
                REFERENCES {s}.demographic_data(id) ON DELETE CASCADE,
            no_education DOUBLE PRECISION NOT NULL,
            preschool DOUBLE PRECISION NOT NULL,
            primary_level DOUBLE PRECISION NOT NULL,
            middle_school DOUBLE PRECISION NOT NULL,
            high_school DOUBLE PRECISION NOT NULL,
            university DOUBLE PRECISION NOT NULL,
            CONSTRAINT education_level_rates_check CHECK (
                no_education BETWEEN 0 AND 100
                AND preschool BETWEEN 0 AND 100
                AND primary_level BETWEEN 0 AND 100
                AND middle_school BETWEEN 0 AND 100
                AND high_school BETWEEN 0 AND 100
                AND university BETWEEN 0 AND 100
            )
        );

        CREATE TABLE IF NOT EXISTS {s}.import_runs (
            id SERIAL PRIMARY KEY,
            census_id INTEGER NOT NULL REFERENCES {s}.census(id) ON DELETE CASCADE,
            source TEXT NOT NULL,
            checksum TEXT NOT NULL,
            rows_read INTEGER NOT NULL,
            rows_imported INTEGER NOT NULL,
            rows_skipped INTEGER NOT NULL,
            imported_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
        s = schema,
        stat_columns = stat_columns,
        rate_checks = rate_checks,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_sql_constraints() {
        let sql = schema_sql("rgph");
        for table in TABLES {
            assert!(
                sql.contains(&format!("CREATE TABLE IF NOT EXISTS rgph.{} (", table)),
                "{}",
                table
            );
        }
        assert!(sql.contains("total_population BIGINT NOT NULL CHECK (total_population >= 0)"));
        assert!(sql.contains("illiteracy_rate_15_plus BETWEEN 0 AND 100"));
        assert!(!sql.contains("population_15_plus BETWEEN"));
        assert!(sql.contains("num_nonnulls(country_id, region_id, department_id, commune_id) >= 1"));
        assert!(sql.contains("DEFAULT '{}'::jsonb"));
    }
}
