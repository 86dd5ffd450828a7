mod aliases;
mod catalog;
mod jobs;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use partsdb_core::JobKind;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "partsdb-cli")]
#[command(about = "Parts catalog back office command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Upsert brand aliases from the YAML seed file
    SeedAliases {
        /// Seed file (defaults to `PARTSDB_ALIASES_PATH`)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show which canonical brands a name resolves to
    Resolve {
        /// Brand name or alias to look up
        query: String,
    },
    /// Bulk upsert catalog items from a JSON array of `{brand, key, payload}`
    Import {
        /// JSON file to import
        file: PathBuf,
    },
    /// Run an external update job in the foreground
    SubmitJob {
        /// `price_photo_update` or `trast_price_update`
        kind: JobKind,
    },
    /// Print the status store entries and recent jobs
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("partsdb-cli: no command given, see --help");
        return Ok(());
    };

    let config = partsdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = partsdb_db::connect_pool(
        &config.database_url,
        partsdb_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match command {
        Commands::Migrate => {
            let applied = partsdb_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
        }
        Commands::SeedAliases { path } => {
            let path = path.unwrap_or_else(|| config.aliases_path.clone());
            aliases::run_seed_aliases(&pool, &path).await?;
        }
        Commands::Resolve { query } => aliases::run_resolve(&pool, &query).await?,
        Commands::Import { file } => catalog::run_import(&pool, &config, &file).await?,
        Commands::SubmitJob { kind } => jobs::run_submit_job(&pool, &config, kind).await?,
        Commands::Status => jobs::run_status(&pool).await?,
    }

    Ok(())
}
