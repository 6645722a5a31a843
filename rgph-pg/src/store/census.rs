//! Recensements
//!
//! Un recensement est identifié par (année, projection). Les recherches par
//! année préfèrent le recensement réel à la projection; le plus récent est
//! celui de l'année la plus élevée.

use deadpool_postgres::GenericClient;
use tokio_postgres::Row;

use crate::models::Census;
use crate::store::{Entity, Param};

impl Entity for Census {
    const TABLE: &'static str = "census";
    const COLUMNS: &'static [&'static str] = &["year", "is_projection"];
    const ORDER_BY: &'static str = "year, is_projection";

    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            year: row.try_get("year")?,
            is_projection: row.try_get("is_projection")?,
        })
    }

    fn params(&self) -> Vec<Param<'_>> {
        vec![&self.year, &self.is_projection]
    }

    fn validate(&self) -> Result<(), String> {
        if !(1900..=2200).contains(&self.year) {
            return Err(format!("year out of range: {}", self.year));
        }
        Ok(())
    }
}

/// Recensement (année, projection), créé s'il n'existe pas
pub async fn get_or_create<C: GenericClient>(
    client: &C,
    schema: &str,
    year: i32,
    is_projection: bool,
) -> Result<Census, tokio_postgres::Error> {
    let sql = format!(
        r#"
        INSERT INTO {}.census (year, is_projection) VALUES ($1, $2)
        ON CONFLICT (year, is_projection) DO UPDATE SET year = EXCLUDED.year
        RETURNING id, year, is_projection
        "#,
        schema
    );
    let row = client.query_one(sql.as_str(), &[&year, &is_projection]).await?;
    Census::from_row(&row)
}

/// Recensement d'une année, le recensement réel avant la projection
pub async fn find_by_year<C: GenericClient>(
    client: &C,
    schema: &str,
    year: i32,
) -> Result<Option<Census>, tokio_postgres::Error> {
    let sql = format!(
        "SELECT id, year, is_projection FROM {}.census WHERE year = $1 ORDER BY is_projection LIMIT 1",
        schema
    );
    client
        .query_opt(sql.as_str(), &[&year])
        .await?
        .as_ref()
        .map(Census::from_row)
        .transpose()
}

/// Recensement le plus récent
pub async fn latest<C: GenericClient>(
    client: &C,
    schema: &str,
) -> Result<Option<Census>, tokio_postgres::Error> {
    let sql = format!(
        "SELECT id, year, is_projection FROM {}.census ORDER BY year DESC, is_projection LIMIT 1",
        schema
    );
    client
        .query_opt(sql.as_str(), &[])
        .await?
        .as_ref()
        .map(Census::from_row)
        .transpose()
}

/// Recensement d'une année donnée, ou le plus récent
pub async fn resolve<C: GenericClient>(
    client: &C,
    schema: &str,
    year: Option<i32>,
) -> Result<Option<Census>, tokio_postgres::Error> {
    match year {
        Some(year) => find_by_year(client, schema, year).await,
        None => latest(client, schema).await,
    }
}

/// Années disponibles, croissantes
pub async fn years<C: GenericClient>(
    client: &C,
    schema: &str,
) -> Result<Vec<i32>, tokio_postgres::Error> {
    let sql = format!("SELECT DISTINCT year FROM {}.census ORDER BY year", schema);
    Ok(client
        .query(sql.as_str(), &[])
        .await?
        .iter()
        .map(|row| row.get(0))
        .collect())
}
