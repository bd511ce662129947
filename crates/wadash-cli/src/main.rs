mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "wadash-cli")]
#[command(about = "WhatsApp export dashboard command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create the default admin and user accounts if missing
    SeedUsers,
    /// List the date folders available for an assembly
    Dates {
        assembly: String,
        /// Root of the export tree
        #[arg(long, env = "WADASH_DATA_ROOT", default_value = "./database")]
        data_root: PathBuf,
    },
    /// Write a spreadsheet report without the server or database
    Export(report::ExportArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Migrate) => {
            let pool = connect().await?;
            let applied = wadash_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Some(Commands::SeedUsers) => {
            let pool = connect().await?;
            let created = wadash_db::seed_default_users(&pool).await?;
            println!("created {created} user(s)");
        }
        Some(Commands::Dates {
            assembly,
            data_root,
        }) => {
            let root = wadash_analytics::DataRoot::new(data_root);
            for date in wadash_analytics::resolver::available_dates(&root, &assembly)? {
                println!("{date}");
            }
        }
        Some(Commands::Export(args)) => {
            let written = report::run_export(&args, chrono::Local::now().date_naive())?;
            println!("wrote {}", written.display());
        }
        None => println!("wadash-cli: run with --help to list commands"),
    }

    Ok(())
}

async fn connect() -> anyhow::Result<sqlx::PgPool> {
    let config = wadash_core::load_app_config()?;
    let pool = wadash_db::connect_pool(
        &config.database_url,
        wadash_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    Ok(pool)
}
