//! Studiomap - business directory listing service
//!
//! Serves the directory map and list pages over HTTP and offers a few
//! maintenance commands: searching the directory from the terminal and
//! creating or validating configuration files.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use studiomap_core::{store, CompanyStatus, Partner, Result, StudiomapConfig, StudiomapError};
use studiomap_infra::{init_logger, logger_config_from_env, LoggerConfig};
use studiomap_serve::cache::ListingCacheConfig;
use studiomap_serve::{ListingService, ServerBuilder};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "studiomap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Studiomap - business directory with map and list views")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (json, yaml, pretty)
    #[arg(short, long, default_value = "pretty", global = true)]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the directory web server
    Serve {
        /// Server host address
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// PostgreSQL URL (in-memory store when unset)
        #[arg(long)]
        database_url: Option<String>,
    },

    /// Search the directory the way the listing pages do
    Search {
        /// Search terms, space separated
        #[arg(default_value = "")]
        terms: Vec<String>,

        /// Company status (open or closed)
        #[arg(short, long, default_value = "open")]
        status: String,

        /// Print the map markers instead of the list rows
        #[arg(long)]
        map: bool,

        /// Print one page of `listing.page_size` companies (pretty output)
        #[arg(long)]
        page: Option<usize>,
    },

    /// Write a default configuration file
    Init {
        /// Configuration file path
        #[arg(default_value = "studiomap.yaml")]
        path: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        path: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = StudiomapConfig::load(cli.config.as_deref())?;

    let mut logger = logger_config_from_env(LoggerConfig::from(&config.logging));
    if cli.verbose {
        logger = logger.with_level("debug");
    }
    init_logger(logger)?;

    debug!("Starting Studiomap v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve {
            ref host,
            port,
            ref database_url,
        } => handle_serve(config, host.clone(), port, database_url.clone()).await,
        Commands::Search {
            ref terms,
            ref status,
            map,
            page,
        } => {
            let search = terms.join(" ");
            handle_search(&config, &search, status, map, page, &cli.output).await
        }
        Commands::Init { ref path } => handle_init(path),
        Commands::Validate { ref path } => handle_validate(path, &cli.output),
        Commands::Version => {
            println!("{}", studiomap_core::version_info());
            Ok(())
        }
    }
}

async fn handle_serve(
    config: StudiomapConfig,
    host: Option<String>,
    port: Option<u16>,
    database_url: Option<String>,
) -> Result<()> {
    let mut builder = ServerBuilder::from_config(config);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }
    if let Some(url) = database_url {
        builder = builder.database_url(url);
    }

    let server = builder.build().await?;
    info!(
        "Directory available at http://{}:{}{}",
        server.config().host,
        server.config().port,
        studiomap_core::MAP_URL
    );
    server.start().await
}

async fn handle_search(
    config: &StudiomapConfig,
    search: &str,
    status: &str,
    map: bool,
    page: Option<usize>,
    output: &str,
) -> Result<()> {
    let status: CompanyStatus = status.parse()?;
    let store = store::open(&config.database).await?;
    let listing = ListingService::new(
        store,
        ListingCacheConfig::from(config.listing.list_cache),
        ListingCacheConfig::from(config.listing.map_cache),
    )?;

    if output == "pretty" {
        let partners = match page {
            Some(page) => {
                listing
                    .search_page(search, status, page, config.listing.page_size)
                    .await?
            }
            None => listing.search(search, status).await?,
        };
        print_partners(&partners, search, status);
        return Ok(());
    }

    let payload = if map {
        listing.map_payload(search, status, false).await?.geoloc
    } else {
        listing.list_payload(search, status, false).await?
    };
    let value: serde_json::Value = serde_json::from_str(&payload)?;

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&value)?),
        "yaml" => print!("{}", serde_yaml::to_string(&value)?),
        other => {
            return Err(StudiomapError::validation(format!(
                "Unknown output format: {}",
                other
            )))
        }
    }
    Ok(())
}

fn handle_init(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(StudiomapError::validation(format!(
            "Configuration file already exists: {:?}. Remove it first or use a different path.",
            path
        )));
    }

    StudiomapConfig::default().to_file(path)?;
    println!("Configuration initialized at {:?}", path);
    println!("Set database.url to serve a PostgreSQL directory, then run:");
    println!("  studiomap --config {:?} serve", path);
    Ok(())
}

fn handle_validate(path: &Path, output: &str) -> Result<()> {
    info!("Validating configuration at {:?}", path);

    if !path.exists() {
        return Err(StudiomapError::not_found(format!(
            "Configuration file not found: {:?}",
            path
        )));
    }

    let config = StudiomapConfig::from_file(path)?;
    let result = config.validate();

    match (output, &result) {
        ("json", _) => {
            let report = serde_json::json!({
                "valid": result.is_ok(),
                "error": result.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        (_, Ok(())) => {
            println!("Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!(
                "  Database: {}",
                config.database.url.as_deref().unwrap_or("in-memory")
            );
            println!(
                "  List cache: {} entries, {}s",
                config.listing.list_cache.max_size, config.listing.list_cache.ttl_seconds
            );
            println!(
                "  Map cache: {} entries, {}s",
                config.listing.map_cache.max_size, config.listing.map_cache.ttl_seconds
            );
        }
        (_, Err(e)) => println!("Configuration is invalid: {}", e),
    }

    result
}

fn print_partners(partners: &[Partner], search: &str, status: CompanyStatus) {
    println!();
    println!("{} {} companies matching {:?}", partners.len(), status, search);
    println!("{:=<50}", "");

    for partner in partners {
        let industries: Vec<&str> = partner.industry_names().collect();
        println!(
            "  {:<30} {:<20} {}",
            partner.name,
            partner.full_location(),
            industries.join(", ")
        );
        println!("    {}", partner.url());
    }
}
