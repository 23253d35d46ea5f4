mod book_cmd;
mod client;
mod config;
mod serve_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use salon_core::booking::PgBookingStore;
use salon_db::pool::{self, Provisioned};

use config::{CliOverrides, PortfolioBackend, SalonConfig, StorageBackend};

#[derive(Parser)]
#[command(name = "salon", about = "Booking site backend and booking client")]
struct Cli {
    /// Database URL (overrides SALON_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a salon config file (no database required)
    Init {
        /// Booking storage backend: memory or postgres
        #[arg(long, default_value_t = StorageBackend::default())]
        storage: StorageBackend,

        /// PostgreSQL connection URL
        #[arg(long, default_value = salon_db::config::DbConfig::DEFAULT_URL)]
        db_url: String,

        /// Directory holding portfolio images
        #[arg(long, default_value = config::DEFAULT_IMAGE_DIR)]
        image_dir: PathBuf,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database and run migrations
    DbInit,
    /// Start the booking API server
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Booking storage backend: memory or postgres
        #[arg(long)]
        storage: Option<StorageBackend>,

        /// Portfolio backend: disk or memory
        #[arg(long)]
        portfolio: Option<PortfolioBackend>,

        /// Directory holding portfolio images
        #[arg(long)]
        image_dir: Option<PathBuf>,
    },
    /// Fill in the booking form and send it to a running server
    Book {
        /// Base URL of the salon server
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,

        /// Preferred date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Preferred time
        #[arg(long)]
        time: String,

        /// Service to book; repeat for more than one
        #[arg(long = "service")]
        services: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_init(
    storage: StorageBackend,
    db_url: &str,
    image_dir: PathBuf,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut cfg = config::ConfigFile::default();
    cfg.storage.backend = storage;
    cfg.database.url = db_url.to_string();
    cfg.portfolio.dir = image_dir;

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!("  storage.backend = {}", cfg.storage.backend);
    println!("  database.url = {db_url}");
    println!("  portfolio.dir = {}", cfg.portfolio.dir.display());
    if storage == StorageBackend::Postgres {
        println!();
        println!("Next: run `salon db-init` to create and migrate the database.");
    }

    Ok(())
}

/// Execute the `salon db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = SalonConfig::resolve(&CliOverrides {
        database_url: cli_db_url.map(str::to_owned),
        ..Default::default()
    })?;

    println!("Initializing salon database...");

    let provisioned = pool::ensure_database_exists(&resolved.db_config).await?;
    let db_name = resolved.db_config.database_name().unwrap_or("?");
    match provisioned {
        Provisioned::Created => println!("  created database {db_name}"),
        Provisioned::AlreadyPresent => println!("  database {db_name} already exists"),
    }

    let store = PgBookingStore::connect(&resolved.db_config).await?;
    let bookings = store.count().await?;
    println!(
        "  schema: {} migration(s) applied",
        pool::MIGRATOR.iter().count()
    );
    println!("  bookings: {bookings} stored");
    store.close().await;

    println!("salon db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            storage,
            db_url,
            image_dir,
            force,
        } => {
            cmd_init(storage, &db_url, image_dir, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve {
            bind,
            port,
            storage,
            portfolio,
            image_dir,
        } => {
            let resolved = SalonConfig::resolve(&CliOverrides {
                bind,
                port,
                storage,
                database_url: cli.database_url,
                portfolio,
                image_dir,
            })?;
            serve_cmd::run_serve(&resolved).await?;
        }
        Commands::Book {
            server,
            name,
            email,
            phone,
            date,
            time,
            services,
        } => {
            let args = book_cmd::BookArgs {
                name,
                email,
                phone,
                date,
                time,
                services,
            };
            if let Err(e) = book_cmd::run_book(&server, args).await {
                eprintln!("{e:#}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
