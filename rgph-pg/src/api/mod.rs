//! Serveur HTTP (actix-web)
//!
//! - `/api/...`: CRUD de la hiérarchie, données démographiques, années
//! - `/export-all-data/`, `/export-zone-data/...`: classeurs XLSX
//! - `/admin/...`: import de fichier et modèle (jeton optionnel)

pub mod crud;
pub mod demographics;
pub mod error;
pub mod files;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tracing::info;

use crate::config::ServerConfig;

pub use error::ApiError;

/// Taille maximale d'un fichier importé
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// État partagé entre les workers
pub struct AppState {
    pub pool: Pool,
    pub schema: String,
    pub admin_token: Option<String>,
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

/// Routes de l'application
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .service(
            web::scope("/api")
                .configure(crud::configure)
                .configure(demographics::configure),
        )
        .configure(files::configure_exports)
        .service(web::scope("/admin").configure(files::configure_admin));
}

/// Lance le serveur jusqu'à son arrêt
pub async fn serve(config: ServerConfig, pool: Pool) -> Result<()> {
    let state = web::Data::new(AppState {
        pool,
        schema: config.schema.clone(),
        admin_token: config.admin_token.clone(),
    });

    info!(
        bind = %config.bind,
        port = config.port,
        schema = %config.schema,
        admin_token = config.admin_token.is_some(),
        "Starting HTTP server"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind.as_str(), config.port))
    .with_context(|| format!("Failed to bind {}:{}", config.bind, config.port))?
    .run()
    .await
    .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;

    use crate::db::{create_pool, DatabaseConfig};

    /// État sans base joignable: seules les routes qui échouent avant
    /// d'obtenir une connexion sont testées
    fn offline_state(admin_token: Option<&str>) -> web::Data<AppState> {
        let config = DatabaseConfig {
            host: "127.0.0.1".into(),
            port: 1,
            ..Default::default()
        };
        web::Data::new(AppState {
            pool: create_pool(&config).unwrap(),
            schema: "rgph".into(),
            admin_token: admin_token.map(String::from),
        })
    }

    #[actix_web::test]
    async fn test_non_numeric_year_returns_empty_list() {
        let app = test::init_service(
            App::new()
                .app_data(offline_state(None))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/demographics/?year=abc")
            .to_request();
        let body: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_invalid_zone_type() {
        let app = test::init_service(
            App::new()
                .app_data(offline_state(None))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/export-zone-data/3/wilaya/")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Type de zone non valide.");
    }

    #[actix_web::test]
    async fn test_admin_routes() {
        let app = test::init_service(
            App::new()
                .app_data(offline_state(Some("secret")))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admin/import-all-data/?census_year=2023&file_format=csv")
            .set_payload("Region Code;Total Population\n")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/admin/import-all-data/?census_year=2023&file_format=pdf")
            .insert_header(("Authorization", "Bearer secret"))
            .set_payload("%PDF")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/admin/import-all-data/?file_format=csv")
            .insert_header(("Authorization", "Bearer secret"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
