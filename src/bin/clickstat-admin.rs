use anyhow::Result;
use clap::{Parser, Subcommand};
use clickstat::analytics::StatsAggregator;
use clickstat::config::Config;
use clickstat::registry::SiteRegistry;
use clickstat::storage;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "clickstat-admin")]
#[command(about = "clickstat site management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sites and clicks tables if they do not exist
    Init,
    /// Register a site, or print the id of the site already using this URL
    AddSite {
        /// Display name of the site
        name: String,
        /// Destination URL visitors are redirected to
        url: String,
    },
    /// List all registered sites
    ListSites,
    /// Show the click history of a site
    Stats {
        /// Site id
        site_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage = storage::connect(&config.database).await?;

    // Ensure database is initialized
    storage.init().await?;

    let registry = SiteRegistry::new(Arc::clone(&storage), true);

    match cli.command {
        Commands::Init => {
            println!("✓ Database initialized");
        }
        Commands::AddSite { name, url } => {
            let (site_id, created) = registry.get_or_create_site(&name, &url).await?;
            if created {
                println!("✓ Site added, site_id = {}", site_id);
            } else {
                println!("⚠ Site already registered, site_id = {}", site_id);
            }
        }
        Commands::ListSites => {
            let sites = registry.list_sites().await?;
            if sites.is_empty() {
                println!("No sites registered.");
            } else {
                println!("{:<8} {:<30} {}", "ID", "Name", "URL");
                println!("{}", "-".repeat(80));
                for site in sites {
                    println!("{:<8} {:<30} {}", site.id, site.name, site.url);
                }
            }
        }
        Commands::Stats { site_id } => {
            let stats = StatsAggregator::new(storage).get_stats(site_id).await?;
            println!("{} ({})", stats.site.name, stats.site.url);
            println!("Total clicks: {}", stats.total_clicks);
            if stats.total_clicks > 0 {
                println!();
                println!("{:<26} {:<20} {:<20} {}", "Time", "City", "Region", "Country");
                println!("{}", "-".repeat(80));
                for click in stats.clicks {
                    println!(
                        "{:<26} {:<20} {:<20} {}",
                        click.created_at,
                        click.city.as_deref().unwrap_or("-"),
                        click.region.as_deref().unwrap_or("-"),
                        click.country.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
    }

    Ok(())
}
