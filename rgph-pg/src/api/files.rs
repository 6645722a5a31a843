//! Exports XLSX et routes d'administration (import, modèle)

use actix_web::http::header::{self, ContentDisposition};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};

use rgph_io::FileFormat;

use crate::api::demographics::YearFilter;
use crate::api::{ApiError, AppState};
use crate::config::{DefaultsConfig, DEFAULT_PRESET};
use crate::export::{self, ExportError, WorkbookExport};
use crate::import::{checksum, run_import, ImportRequest, ParsedSource, SourceKind};
use crate::models::ZoneLevel;
use crate::report::ImportStatus;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub year: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub census_year: i32,
    pub file_format: String,
    #[serde(default)]
    pub projection: bool,
    /// Nom du preset de valeurs par défaut
    pub defaults: Option<String>,
    /// Nom du fichier d'origine (rapport et trace d'import)
    pub filename: Option<String>,
}

fn export_year(raw: Option<&str>) -> Result<Option<i32>, ApiError> {
    match YearFilter::parse(raw) {
        YearFilter::Latest => Ok(None),
        YearFilter::Year(year) => Ok(Some(year)),
        YearFilter::Invalid => Err(ApiError::BadRequest(format!(
            "Année invalide : {}",
            raw.unwrap_or_default()
        ))),
    }
}

/// Type de zone d'une URL d'export (région, département ou commune)
pub fn parse_zone_type(raw: &str) -> Result<ZoneLevel, ExportError> {
    match raw.parse::<ZoneLevel>() {
        Ok(ZoneLevel::Country) | Err(_) => Err(ExportError::InvalidZoneType),
        Ok(level) => Ok(level),
    }
}

/// Vérifie le jeton d'administration s'il est configuré
pub fn authorize(req: &HttpRequest, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    match provided {
        Some(token) if token == expected => Ok(()),
        _ => {
            warn!(path = %req.path(), "Rejected admin request");
            Err(ApiError::Unauthorized("Invalid or missing admin token".into()))
        }
    }
}

/// Écrit le classeur sur un thread bloquant et le renvoie en pièce jointe
async fn workbook_response(export: WorkbookExport) -> Result<HttpResponse, ApiError> {
    let filename = export.filename.clone();
    let bytes = web::block(move || export.render())
        .await?
        .map_err(ExportError::from)?;

    Ok(HttpResponse::Ok()
        .content_type(WorkbookExport::CONTENT_TYPE)
        .insert_header(ContentDisposition::attachment(filename))
        .body(bytes))
}

async fn export_all_data(
    state: web::Data<AppState>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, ApiError> {
    let year = export_year(query.year.as_deref())?;
    let client = state.pool.get().await?;
    let export = export::load_full_export(&client, &state.schema, year).await?;
    workbook_response(export).await
}

async fn export_zone_data(
    state: web::Data<AppState>,
    path: web::Path<(i32, String)>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, ApiError> {
    let (zone_id, zone_type) = path.into_inner();
    let level = parse_zone_type(&zone_type)?;
    let year = export_year(query.year.as_deref())?;

    let client = state.pool.get().await?;
    let export = export::load_zone_export(&client, &state.schema, level, zone_id, year).await?;
    workbook_response(export).await
}

/// Import d'un fichier (corps de la requête) pour un recensement
async fn import_all_data(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ImportQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    authorize(&req, state.admin_token.as_deref())?;

    let query = query.into_inner();
    let format: FileFormat = query.file_format.parse().map_err(|_| {
        ApiError::BadRequest(format!("Format de fichier non valide : {}", query.file_format))
    })?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("Fichier vide".into()));
    }
    let defaults = DefaultsConfig::from_preset(query.defaults.as_deref().unwrap_or(DEFAULT_PRESET))
        .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))?;

    let checksum = checksum(&body);
    let kind = SourceKind::detect(format, &body);
    let source = web::block(move || ParsedSource::parse(&body, kind)).await??;
    info!(
        year = query.census_year,
        format = %format,
        rows = source.len(),
        "Upload parsed"
    );

    let request = ImportRequest {
        year: query.census_year,
        is_projection: query.projection,
        source_name: query
            .filename
            .unwrap_or_else(|| format!("upload.{}", format.extension())),
        checksum,
        source,
        defaults,
    };
    let report = run_import(&state.pool, &state.schema, request).await?;

    let response = match report.status {
        ImportStatus::Failed | ImportStatus::RolledBack => HttpResponse::UnprocessableEntity(),
        _ => HttpResponse::Ok(),
    }
    .json(&report);
    Ok(response)
}

async fn download_template(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    authorize(&req, state.admin_token.as_deref())?;
    let client = state.pool.get().await?;
    let export = export::load_template(&client, &state.schema).await?;
    workbook_response(export).await
}

pub fn configure_exports(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/export-all-data/").route(web::get().to(export_all_data)))
        .service(
            web::resource("/export-zone-data/{zone_id}/{zone_type}/")
                .route(web::get().to(export_zone_data)),
        );
}

pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/import-all-data/").route(web::post().to(import_all_data)))
        .service(
            web::resource("/download-all-template/").route(web::get().to(download_template)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_parse_zone_type() {
        assert_eq!(parse_zone_type("region").unwrap(), ZoneLevel::Region);
        assert_eq!(parse_zone_type("Department").unwrap(), ZoneLevel::Department);
        assert_eq!(parse_zone_type("commune").unwrap(), ZoneLevel::Commune);
        assert!(matches!(parse_zone_type("country"), Err(ExportError::InvalidZoneType)));
        assert!(matches!(parse_zone_type("wilaya"), Err(ExportError::InvalidZoneType)));
    }

    #[test]
    fn test_export_year() {
        assert_eq!(export_year(None).unwrap(), None);
        assert_eq!(export_year(Some("2023")).unwrap(), Some(2023));
        assert!(export_year(Some("vingt")).is_err());
    }

    #[test]
    fn test_authorize() {
        let req = TestRequest::default().to_http_request();
        assert!(authorize(&req, None).is_ok());
        assert!(authorize(&req, Some("secret")).is_err());

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer secret"))
            .to_http_request();
        assert!(authorize(&req, Some("secret")).is_ok());
        assert!(authorize(&req, Some("other")).is_err());
    }
}
