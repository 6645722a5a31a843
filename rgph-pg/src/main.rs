//! Point d'entrée CLI pour rgph

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{Commands, ImportArgs};

/// Backend des données du recensement (RGPH) de Mauritanie
#[derive(Parser)]
#[command(name = "rgph")]
#[command(author, version)]
#[command(about = "Import, export et API REST des données du recensement (RGPH)")]
#[command(long_about = "Charge les limites administratives et les données démographiques du RGPH dans PostgreSQL, les expose en REST et les exporte en XLSX.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Serve {
            bind,
            http_port,
            db,
        } => cli::cmd_serve(bind, http_port, &db).await?,
        Commands::InitDb { drop, db } => cli::cmd_init_db(drop, &db).await?,
        Commands::ImportBoundaries { path, report, db } => {
            cli::cmd_import_boundaries(&path, report.as_deref(), &db).await?
        }
        Commands::Import {
            path,
            year,
            projection,
            format,
            defaults,
            report,
            db,
        } => {
            let args = ImportArgs {
                path: &path,
                year,
                projection,
                defaults: &defaults,
                report: report.as_deref(),
            };
            cli::cmd_import(args, format.as_deref(), false, &db).await?
        }
        Commands::ImportStructured {
            path,
            year,
            projection,
            defaults,
            report,
            db,
        } => {
            let args = ImportArgs {
                path: &path,
                year,
                projection,
                defaults: &defaults,
                report: report.as_deref(),
            };
            cli::cmd_import(args, None, true, &db).await?
        }
        Commands::Export { year, output, db } => {
            cli::cmd_export(year, output.as_deref(), &db).await?
        }
        Commands::ExportZone {
            id,
            zone_type,
            year,
            output,
            db,
        } => cli::cmd_export_zone(id, &zone_type, year, output.as_deref(), &db).await?,
        Commands::Template { output, db } => cli::cmd_template(output.as_deref(), &db).await?,
        Commands::CorrectNames { file, dry_run, db } => {
            cli::cmd_correct_names(file.as_deref(), dry_run, &db).await?
        }
        Commands::Census { command } => cli::cmd_census(&command).await?,
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
