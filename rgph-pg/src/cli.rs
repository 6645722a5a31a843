//! Définition et implémentation des commandes CLI
//!
//! - `serve`: API REST, exports et administration
//! - `init-db`: création du schéma
//! - `import-boundaries`, `import`, `import-structured`: chargements
//! - `export`, `export-zone`, `template`: classeurs XLSX
//! - `correct-names`, `census`: maintenance

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use deadpool_postgres::Pool;
use tracing::{info, warn};

use rgph_io::FileFormat;
use rgph_pg::config::{
    validate_schema_name, DefaultsConfig, NameCorrections, ServerConfig, DEFAULT_PRESET,
    DEFAULT_SCHEMA,
};
use rgph_pg::db::{create_pool, create_schema, check_connection, DatabaseConfig};
use rgph_pg::export::{self, WorkbookExport};
use rgph_pg::import::{
    checksum, run_boundary_import, run_import, ImportRequest, ParsedSource, SourceKind,
};
use rgph_pg::models::{Census, ZoneLevel};
use rgph_pg::report::ImportReport;
use rgph_pg::store::{self, Entity};

/// Options de connexion PostgreSQL (surchargent l'environnement)
#[derive(Args, Debug, Clone)]
pub struct DbArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / rgph)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,

    /// Target PostgreSQL schema (défaut : env RGPH_SCHEMA / rgph)
    #[arg(long)]
    pub schema: Option<String>,
}

impl DbArgs {
    pub fn schema(&self) -> Result<String> {
        let schema = self
            .schema
            .clone()
            .or_else(|| std::env::var("RGPH_SCHEMA").ok())
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        validate_schema_name(&schema)?;
        Ok(schema)
    }

    /// Ouvre le pool et vérifie la connexion
    pub async fn connect(&self) -> Result<Pool> {
        let mut db_config = DatabaseConfig::from_env();
        db_config.apply_overrides(
            self.host.clone(),
            self.database.clone(),
            self.user.clone(),
            self.password.clone(),
            self.port,
            self.ssl.clone(),
        )?;
        println!("Database: {}", db_config.target());

        let pool = create_pool(&db_config)?;
        let version = check_connection(&pool).await?;
        println!("Connected to PostgreSQL {}", version);
        Ok(pool)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the REST API, exports and admin routes
    Serve {
        /// Bind address (défaut : env RGPH_BIND / 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,

        /// HTTP port (défaut : env RGPH_PORT / 8000)
        #[arg(long)]
        http_port: Option<u16>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Create the schema and tables
    InitDb {
        /// Drop the schema before creating it
        #[arg(long)]
        drop: bool,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Import administrative boundaries (GeoJSON FeatureCollection of communes)
    ImportBoundaries {
        /// Path to the GeoJSON file
        #[arg(short, long)]
        path: PathBuf,

        /// Save the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Import census data (CSV, XLS, XLSX, JSON)
    Import {
        /// Path to the data file
        #[arg(short, long)]
        path: PathBuf,

        /// Census year
        #[arg(short, long)]
        year: i32,

        /// Import as a projection rather than a census
        #[arg(long)]
        projection: bool,

        /// File format (csv, xls, xlsx, json or MIME type); default: file extension
        #[arg(long)]
        format: Option<String>,

        /// Defaults preset (strict/standard/estimates) or path to a JSON file
        #[arg(long, default_value = DEFAULT_PRESET)]
        defaults: String,

        /// Save the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Import census data from the structured JSON format (keyed by zone code)
    ImportStructured {
        /// Path to the JSON file
        #[arg(short, long)]
        path: PathBuf,

        /// Census year
        #[arg(short, long)]
        year: i32,

        /// Import as a projection rather than a census
        #[arg(long)]
        projection: bool,

        /// Defaults preset (strict/standard/estimates) or path to a JSON file
        #[arg(long, default_value = DEFAULT_PRESET)]
        defaults: String,

        /// Save the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Export all data of a census to XLSX
    Export {
        /// Census year (défaut : recensement le plus récent)
        #[arg(short, long)]
        year: Option<i32>,

        /// Output file or directory (défaut : répertoire courant)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Export the data of one zone to XLSX
    ExportZone {
        /// Zone id
        #[arg(long)]
        id: i32,

        /// Zone type: region, department, commune
        #[arg(long = "type")]
        zone_type: String,

        /// Census year (défaut : recensement le plus récent)
        #[arg(short, long)]
        year: Option<i32>,

        /// Output file or directory (défaut : répertoire courant)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Write the pre-filled import template
    Template {
        /// Output file or directory (défaut : répertoire courant)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Apply the administrative name corrections
    CorrectNames {
        /// Corrections JSON file (défaut : table embarquée)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Report the changes without committing them
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Manage censuses
    Census {
        #[command(subcommand)]
        command: CensusCommand,
    },
}

#[derive(Subcommand)]
pub enum CensusCommand {
    /// List censuses with their row counts and last import
    List {
        #[command(flatten)]
        db: DbArgs,
    },

    /// Create a census (no-op if it exists)
    Add {
        #[arg(short, long)]
        year: i32,

        #[arg(long)]
        projection: bool,

        #[command(flatten)]
        db: DbArgs,
    },
}

/// Exécute la commande serve
pub async fn cmd_serve(bind: Option<String>, port: Option<u16>, db: &DbArgs) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(bind) = bind {
        config.bind = bind;
    }
    if let Some(port) = port {
        config.port = port;
    }
    config.schema = db.schema()?;

    let pool = db.connect().await?;
    println!("Listening on http://{}:{}", config.bind, config.port);
    rgph_pg::api::serve(config, pool).await
}

/// Exécute la commande init-db
pub async fn cmd_init_db(drop: bool, db: &DbArgs) -> Result<()> {
    let schema = db.schema()?;
    let pool = db.connect().await?;
    create_schema(&pool, &schema, drop).await?;
    println!("Schema {} ready", schema);
    Ok(())
}

fn finish_report(report: &ImportReport, path: Option<&Path>) -> Result<()> {
    report.display();
    info!(summary = %report.summary(), "Import finished");
    if let Some(path) = path {
        report.save_to_file(path)?;
        println!("Report saved to {}", path.display());
    }
    Ok(())
}

/// Exécute la commande import-boundaries
pub async fn cmd_import_boundaries(path: &Path, report_path: Option<&Path>, db: &DbArgs) -> Result<()> {
    let schema = db.schema()?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    println!("=== Import boundaries ===");
    println!("Path: {}", path.display());
    println!("Schema: {}", schema);

    let pool = db.connect().await?;
    let report = run_boundary_import(&pool, &schema, &bytes, &source_name(path)).await?;
    finish_report(&report, report_path)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Paramètres communs des commandes d'import
pub struct ImportArgs<'a> {
    pub path: &'a Path,
    pub year: i32,
    pub projection: bool,
    pub defaults: &'a str,
    pub report: Option<&'a Path>,
}

/// Exécute les commandes import et import-structured
pub async fn cmd_import(
    args: ImportArgs<'_>,
    format: Option<&str>,
    structured: bool,
    db: &DbArgs,
) -> Result<()> {
    let schema = db.schema()?;
    let format = match format {
        Some(f) => f.parse::<FileFormat>()?,
        None if structured => FileFormat::Json,
        None => FileFormat::from_path(args.path)?,
    };
    let defaults = DefaultsConfig::from_arg(args.defaults)?;

    let start = Instant::now();
    let bytes = std::fs::read(args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let kind = if structured {
        SourceKind::Structured
    } else {
        SourceKind::detect(format, &bytes)
    };
    let source = ParsedSource::parse(&bytes, kind)
        .with_context(|| format!("Failed to parse {}", args.path.display()))?;

    println!("=== Import {} ===", args.year);
    println!("Path: {}", args.path.display());
    println!("Format: {} ({:?})", format, kind);
    println!("Rows: {}", source.len());
    println!("Projection: {}", args.projection);
    println!("Defaults: {}", args.defaults);
    println!("Schema: {}", schema);
    info!(
        path = %args.path.display(),
        rows = source.len(),
        parse_ms = start.elapsed().as_millis() as u64,
        "File parsed"
    );

    let pool = db.connect().await?;
    let request = ImportRequest {
        year: args.year,
        is_projection: args.projection,
        source_name: source_name(args.path),
        checksum: checksum(&bytes),
        source,
        defaults,
    };
    let report = run_import(&pool, &schema, request).await?;
    finish_report(&report, args.report)
}

/// Chemin de sortie: fichier explicite, ou nom par défaut dans un répertoire
fn output_path(output: Option<&Path>, filename: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(filename),
    }
}

fn write_export(export: &WorkbookExport, output: Option<&Path>) -> Result<PathBuf> {
    let path = output_path(output, &export.filename);
    let bytes = export.render()?;
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Exécute la commande export
pub async fn cmd_export(year: Option<i32>, output: Option<&Path>, db: &DbArgs) -> Result<()> {
    let schema = db.schema()?;
    let pool = db.connect().await?;
    let client = pool.get().await.context("Failed to get connection from pool")?;

    let export = export::load_full_export(&client, &schema, year).await?;
    if export.data_rows() == 0 {
        warn!(year = ?year, "No data for the selected census");
    }
    for sheet in &export.sheets {
        println!("  {}: {} rows", sheet.name, sheet.data_rows());
    }
    let path = write_export(&export, output)?;
    println!("Export written to {}", path.display());
    Ok(())
}

/// Exécute la commande export-zone
pub async fn cmd_export_zone(
    id: i32,
    zone_type: &str,
    year: Option<i32>,
    output: Option<&Path>,
    db: &DbArgs,
) -> Result<()> {
    let level = match zone_type.parse::<ZoneLevel>() {
        Ok(ZoneLevel::Country) | Err(_) => {
            anyhow::bail!("Invalid zone type: {}. Use: region, department, commune", zone_type)
        }
        Ok(level) => level,
    };
    let schema = db.schema()?;
    let pool = db.connect().await?;
    let client = pool.get().await.context("Failed to get connection from pool")?;

    let export = export::load_zone_export(&client, &schema, level, id, year).await?;
    let path = write_export(&export, output)?;
    println!("Export written to {}", path.display());
    Ok(())
}

/// Exécute la commande template
pub async fn cmd_template(output: Option<&Path>, db: &DbArgs) -> Result<()> {
    let schema = db.schema()?;
    let pool = db.connect().await?;
    let client = pool.get().await.context("Failed to get connection from pool")?;

    let export = export::load_template(&client, &schema).await?;
    if export.data_rows() == 0 {
        warn!("No administrative zones in database, template has no rows");
    }
    let path = write_export(&export, output)?;
    println!("Template written to {} ({} rows)", path.display(), export.data_rows());
    Ok(())
}

/// Exécute la commande correct-names
pub async fn cmd_correct_names(file: Option<&Path>, dry_run: bool, db: &DbArgs) -> Result<()> {
    let corrections = match file {
        Some(path) => NameCorrections::load(path)?,
        None => NameCorrections::embedded()?,
    };
    let schema = db.schema()?;

    println!("=== Name corrections ===");
    println!("Entries: {}", corrections.len());
    println!("Dry run: {}", dry_run);

    let pool = db.connect().await?;
    let mut client = pool.get().await.context("Failed to get connection from pool")?;
    let transaction = client.transaction().await.context("Failed to begin transaction")?;

    let report = store::corrections::apply_corrections(&transaction, &schema, &corrections)
        .await
        .context("Failed to apply name corrections")?;

    if dry_run {
        transaction.rollback().await.context("Failed to rollback")?;
    } else {
        transaction.commit().await.context("Failed to commit name corrections")?;
    }

    for rename in &report.renamed {
        println!(
            "  {} {}: {} -> {}",
            rename.level, rename.code, rename.old_name, rename.new_name
        );
    }
    println!(
        "Renamed: {}, unchanged: {}, not found: {}",
        report.renamed.len(),
        report.unchanged,
        report.not_found.len()
    );
    if !report.not_found.is_empty() {
        println!("Not found: {}", report.not_found.join(", "));
    }
    Ok(())
}

/// Exécute les sous-commandes census
pub async fn cmd_census(command: &CensusCommand) -> Result<()> {
    match command {
        CensusCommand::List { db } => {
            let schema = db.schema()?;
            let pool = db.connect().await?;
            let client = pool.get().await.context("Failed to get connection from pool")?;

            let censuses = store::list::<Census, _>(&client, &schema).await?;
            if censuses.is_empty() {
                println!("No census");
            }
            for census in censuses {
                let rows = store::demographics::count_for_census(&client, &schema, census.id).await?;
                let runs = store::demographics::list_import_runs(&client, &schema, census.id).await?;
                let kind = if census.is_projection { "projection" } else { "census" };
                match runs.first() {
                    Some(run) => println!(
                        "  {} ({}): {} rows, last import {} from {}",
                        census.year,
                        kind,
                        rows,
                        run.imported_at.format("%Y-%m-%d %H:%M"),
                        run.source
                    ),
                    None => println!("  {} ({}): {} rows", census.year, kind, rows),
                }
            }
        }
        CensusCommand::Add { year, projection, db } => {
            let census = Census {
                id: 0,
                year: *year,
                is_projection: *projection,
            };
            census.validate().map_err(anyhow::Error::msg)?;

            let schema = db.schema()?;
            let pool = db.connect().await?;
            let client = pool.get().await.context("Failed to get connection from pool")?;
            let census = store::census::get_or_create(&client, &schema, *year, *projection).await?;
            println!("Census {} ready (id {})", census.year, census.id);
        }
    }
    Ok(())
}
