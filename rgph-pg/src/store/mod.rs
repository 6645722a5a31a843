//! Accès aux tables
//!
//! Les entités simples (hiérarchie, recensements) partagent un CRUD générique
//! via le trait [`Entity`]; les statistiques démographiques ont leur propre
//! module (jointure avec les niveaux d'instruction).
//!
//! Toutes les fonctions acceptent un client ou une transaction
//! ([`GenericClient`]).

pub mod census;
pub mod corrections;
pub mod demographics;
pub mod hierarchy;

use deadpool_postgres::GenericClient;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

/// Paramètre de requête
pub type Param<'a> = &'a (dyn ToSql + Sync);

/// Table exposée en CRUD
pub trait Entity: Sized {
    const TABLE: &'static str;
    /// Colonnes écrites, dans l'ordre de [`Entity::params`] (hors `id`)
    const COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;

    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error>;

    fn params(&self) -> Vec<Param<'_>>;

    /// Validation applicative avant écriture
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

fn select_list<E: Entity>() -> String {
    format!("id, {}", E::COLUMNS.join(", "))
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn list<E: Entity, C: GenericClient>(
    client: &C,
    schema: &str,
) -> Result<Vec<E>, tokio_postgres::Error> {
    let sql = format!(
        "SELECT {} FROM {}.{} ORDER BY {}",
        select_list::<E>(),
        schema,
        E::TABLE,
        E::ORDER_BY
    );
    client
        .query(sql.as_str(), &[])
        .await?
        .iter()
        .map(E::from_row)
        .collect()
}

pub async fn get<E: Entity, C: GenericClient>(
    client: &C,
    schema: &str,
    id: i32,
) -> Result<Option<E>, tokio_postgres::Error> {
    let sql = format!(
        "SELECT {} FROM {}.{} WHERE id = $1",
        select_list::<E>(),
        schema,
        E::TABLE
    );
    client
        .query_opt(sql.as_str(), &[&id])
        .await?
        .as_ref()
        .map(E::from_row)
        .transpose()
}

pub async fn insert<E: Entity, C: GenericClient>(
    client: &C,
    schema: &str,
    entity: &E,
) -> Result<E, tokio_postgres::Error> {
    let sql = format!(
        "INSERT INTO {}.{} ({}) VALUES ({}) RETURNING {}",
        schema,
        E::TABLE,
        E::COLUMNS.join(", "),
        placeholders(E::COLUMNS.len()),
        select_list::<E>()
    );
    let row = client.query_one(sql.as_str(), &entity.params()).await?;
    E::from_row(&row)
}

/// Met à jour toutes les colonnes; `None` si l'id n'existe pas
pub async fn update<E: Entity, C: GenericClient>(
    client: &C,
    schema: &str,
    id: i32,
    entity: &E,
) -> Result<Option<E>, tokio_postgres::Error> {
    let assignments = E::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", c, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {}.{} SET {} WHERE id = ${} RETURNING {}",
        schema,
        E::TABLE,
        assignments,
        E::COLUMNS.len() + 1,
        select_list::<E>()
    );

    let mut params = entity.params();
    params.push(&id);
    client
        .query_opt(sql.as_str(), &params)
        .await?
        .as_ref()
        .map(E::from_row)
        .transpose()
}

/// Supprime une ligne; `false` si l'id n'existe pas
pub async fn delete<E: Entity, C: GenericClient>(
    client: &C,
    schema: &str,
    id: i32,
) -> Result<bool, tokio_postgres::Error> {
    let sql = format!("DELETE FROM {}.{} WHERE id = $1", schema, E::TABLE);
    Ok(client.execute(sql.as_str(), &[&id]).await? > 0)
}
