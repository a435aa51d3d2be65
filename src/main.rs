//! nexus - search torrent sites from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use nexus::{log, scrapers, Dispatch, Registry, Settings};

#[derive(Debug, Parser)]
#[command(name = "nexus", version, about = "Aggregate torrent search results from several sites")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search one site, or every site when --site is omitted
    Search {
        query: String,
        #[arg(long)]
        site: Option<String>,
        /// Restrict to a category (requires --site)
        #[arg(long, requires = "site")]
        category: Option<String>,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },
    /// Latest uploads on a site
    Recent {
        #[arg(long)]
        site: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },
    /// Most popular torrents on a site
    Trending {
        #[arg(long)]
        site: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },
    /// List the enabled sites and the base URL each one uses
    Sites,
    /// Show the tail of the scraper log
    Logs {
        #[arg(long, default_value_t = 50)]
        lines: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Search {
            query,
            site,
            category,
            page,
            limit,
        } => {
            let registry = open_registry().await?;
            let limit = limit as usize;
            match (site.as_deref(), category.as_deref()) {
                (Some(site), Some(category)) => {
                    let result = registry
                        .category_search(site, &query, category, page, limit)
                        .await?;
                    print_json(&result)?;
                }
                (site, _) => {
                    let dispatch: Dispatch = registry.dispatch(site, &query, page, limit).await?;
                    print_json(&dispatch)?;
                }
            }
        }
        Command::Recent {
            site,
            category,
            page,
            limit,
        } => {
            let registry = open_registry().await?;
            let result = registry
                .recent(&site, category.as_deref(), page, limit as usize)
                .await?;
            print_json(&result)?;
        }
        Command::Trending {
            site,
            category,
            page,
            limit,
        } => {
            let registry = open_registry().await?;
            let result = registry
                .trending(&site, category.as_deref(), page, limit as usize)
                .await?;
            print_json(&result)?;
        }
        Command::Sites => {
            let registry = open_registry().await?;
            for key in scrapers::SCRAPERS {
                match registry.get(key) {
                    Some(adapter) => println!("{:15} {}", key, adapter.base_url()),
                    None => println!("{:15} (disabled)", key),
                }
            }
        }
        // reads the previous run's log, so it must not reinitialize it
        Command::Logs { lines } => {
            for line in log::read_recent_logs(lines) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Load settings, start logging and build every enabled site
async fn open_registry() -> Result<Registry> {
    let settings = Settings::load().context("invalid configuration")?;
    log::init_log();
    Registry::from_settings(&settings)
        .await
        .context("failed to set up sites")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
