//! Statistiques démographiques et années de recensement

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{ApiError, AppState};
use crate::models::DemographicData;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<String>,
}

/// Filtre `?year=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    Latest,
    Year(i32),
    /// Valeur non numérique: résultat vide
    Invalid,
}

impl YearFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None => YearFilter::Latest,
            Some(raw) => raw.parse().map(YearFilter::Year).unwrap_or(YearFilter::Invalid),
        }
    }
}

fn check(data: &DemographicData) -> Result<(), ApiError> {
    data.validate().map_err(ApiError::BadRequest)
}

/// Données d'un recensement (le plus récent si l'année est absente)
async fn list(
    state: web::Data<AppState>,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse, ApiError> {
    let year = match YearFilter::parse(query.year.as_deref()) {
        YearFilter::Latest => None,
        YearFilter::Year(year) => Some(year),
        YearFilter::Invalid => {
            debug!(year = ?query.year, "Non-numeric year, empty result");
            return Ok(HttpResponse::Ok().json(Vec::<DemographicData>::new()));
        }
    };

    let client = state.pool.get().await?;
    let data = match store::census::resolve(&client, &state.schema, year).await? {
        Some(census) => {
            store::demographics::list_for_census(&client, &state.schema, census.id).await?
        }
        None => Vec::new(),
    };
    Ok(HttpResponse::Ok().json(data))
}

async fn retrieve(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let client = state.pool.get().await?;
    store::demographics::get(&client, &state.schema, id)
        .await?
        .map(|data| HttpResponse::Ok().json(data))
        .ok_or_else(|| ApiError::not_found("Demographic data", id))
}

/// Création: ligne et éducation dans une même transaction
async fn create(
    state: web::Data<AppState>,
    body: web::Json<DemographicData>,
) -> Result<HttpResponse, ApiError> {
    let data = body.into_inner();
    check(&data)?;

    let mut client = state.pool.get().await?;
    let transaction = client.transaction().await?;
    let id = store::demographics::insert(&transaction, &state.schema, &data).await?;
    let created = store::demographics::get(&transaction, &state.schema, id).await?;
    transaction.commit().await?;

    info!(id, census = data.census, zone = %data.zone(), "Demographic data created");
    created
        .map(|data| HttpResponse::Created().json(data))
        .ok_or_else(|| ApiError::not_found("Demographic data", id))
}

async fn update(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<DemographicData>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let data = body.into_inner();
    check(&data)?;

    let mut client = state.pool.get().await?;
    let transaction = client.transaction().await?;
    if !store::demographics::update(&transaction, &state.schema, id, &data).await? {
        return Err(ApiError::not_found("Demographic data", id));
    }
    let updated = store::demographics::get(&transaction, &state.schema, id).await?;
    transaction.commit().await?;

    updated
        .map(|data| HttpResponse::Ok().json(data))
        .ok_or_else(|| ApiError::not_found("Demographic data", id))
}

async fn destroy(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let client = state.pool.get().await?;
    if store::demographics::delete(&client, &state.schema, id).await? {
        info!(id, "Demographic data deleted");
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::not_found("Demographic data", id))
    }
}

async fn census_years(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let client = state.pool.get().await?;
    let years = store::census::years(&client, &state.schema).await?;
    Ok(HttpResponse::Ok().json(years))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/demographics/")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/demographics/{id}/")
            .route(web::get().to(retrieve))
            .route(web::put().to(update))
            .route(web::delete().to(destroy)),
    )
    .service(web::resource("/census-years/").route(web::get().to(census_years)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_filter() {
        assert_eq!(YearFilter::parse(None), YearFilter::Latest);
        assert_eq!(YearFilter::parse(Some("2023")), YearFilter::Year(2023));
        assert_eq!(YearFilter::parse(Some(" 2013 ")), YearFilter::Year(2013));
        assert_eq!(YearFilter::parse(Some("abc")), YearFilter::Invalid);
        assert_eq!(YearFilter::parse(Some("")), YearFilter::Invalid);
    }
}
