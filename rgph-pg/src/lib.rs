//! # rgph-pg
//!
//! Backend des données du Recensement Général de la Population et de
//! l'Habitat (RGPH) de Mauritanie.
//!
//! ## Features
//!
//! - Hiérarchie administrative (pays, régions, départements, communes)
//!   chargée depuis un GeoJSON de communes
//! - Import des statistiques démographiques (CSV, XLS, XLSX, JSON) par
//!   recensement, en remplacement transactionnel
//! - Exports XLSX (complet, par zone) et modèle d'import pré-rempli
//! - API REST (actix-web)
//!
//! ## Usage CLI
//!
//! ```bash
//! rgph init-db
//! rgph import-boundaries --path ./mrt_communes.geojson
//! rgph import --path ./rgph_2023.xlsx --year 2023
//! rgph export --year 2023 --output ./exports/
//! rgph serve
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod export;
pub mod import;
pub mod models;
pub mod report;
pub mod store;

pub use config::{DefaultsConfig, ServerConfig};
pub use db::{create_pool, DatabaseConfig};
pub use report::{ImportReport, ImportStatus};
