//! CRUD générique sur la hiérarchie administrative

use actix_web::{web, HttpResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::api::{ApiError, AppState};
use crate::models::{Commune, Country, Department, Region};
use crate::store::{self, Entity};

/// Entité exposée sous `/api/{PATH}/`
pub trait Resource: Entity + Serialize + DeserializeOwned + 'static {
    const PATH: &'static str;
    const NAME: &'static str;
}

impl Resource for Country {
    const PATH: &'static str = "countries";
    const NAME: &'static str = "Country";
}

impl Resource for Region {
    const PATH: &'static str = "regions";
    const NAME: &'static str = "Region";
}

impl Resource for Department {
    const PATH: &'static str = "departments";
    const NAME: &'static str = "Department";
}

impl Resource for Commune {
    const PATH: &'static str = "communes";
    const NAME: &'static str = "Commune";
}

async fn list<E: Resource>(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let client = state.pool.get().await?;
    let items = store::list::<E, _>(&client, &state.schema).await?;
    Ok(HttpResponse::Ok().json(items))
}

async fn retrieve<E: Resource>(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let client = state.pool.get().await?;
    store::get::<E, _>(&client, &state.schema, id)
        .await?
        .map(|item| HttpResponse::Ok().json(item))
        .ok_or_else(|| ApiError::not_found(E::NAME, id))
}

async fn create<E: Resource>(
    state: web::Data<AppState>,
    body: web::Json<E>,
) -> Result<HttpResponse, ApiError> {
    let entity = body.into_inner();
    entity.validate().map_err(ApiError::BadRequest)?;

    let client = state.pool.get().await?;
    let created = store::insert(&client, &state.schema, &entity).await?;
    info!(table = E::TABLE, "Row created");
    Ok(HttpResponse::Created().json(created))
}

async fn update<E: Resource>(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<E>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let entity = body.into_inner();
    entity.validate().map_err(ApiError::BadRequest)?;

    let client = state.pool.get().await?;
    store::update(&client, &state.schema, id, &entity)
        .await?
        .map(|item| HttpResponse::Ok().json(item))
        .ok_or_else(|| ApiError::not_found(E::NAME, id))
}

async fn destroy<E: Resource>(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let client = state.pool.get().await?;
    if store::delete::<E, _>(&client, &state.schema, id).await? {
        info!(table = E::TABLE, id, "Row deleted");
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::not_found(E::NAME, id))
    }
}

/// Enregistre `/{PATH}/` et `/{PATH}/{id}/`
pub fn resource<E: Resource>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(format!("/{}/", E::PATH))
            .route(web::get().to(list::<E>))
            .route(web::post().to(create::<E>)),
    )
    .service(
        web::resource(format!("/{}/{{id}}/", E::PATH))
            .route(web::get().to(retrieve::<E>))
            .route(web::put().to(update::<E>))
            .route(web::delete().to(destroy::<E>)),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    resource::<Country>(cfg);
    resource::<Region>(cfg);
    resource::<Department>(cfg);
    resource::<Commune>(cfg);
}
