//! CLI binary for pricegear.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pricegear::{AppConfig, logging};
use pricegear_scrape::{
    AggregateResponse, CallerId, OperationClass, PriceAggregator, SearchQuery, adapters,
    catalog_rows,
};

/// Pricegear: live price comparison across Bangladeshi hardware storefronts.
#[derive(Parser)]
#[command(name = "pricegear", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Search every storefront for a term.
    Search {
        /// Search term.
        term: String,
        /// Apply the per-caller admission quota for this caller id.
        #[arg(long)]
        caller: Option<String>,
        /// Print the aggregate response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search and print catalog rows as JSON lines.
    Export {
        /// Search term.
        term: String,
        /// Apply the per-caller refresh quota for this caller id.
        #[arg(long)]
        caller: Option<String>,
    },

    /// List the configured storefronts.
    Sources,

    /// Print readiness as JSON.
    Health,

    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig { force } = cli.command {
        return init_config(cli.config, force);
    }

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let _log_guard = logging::init(&config.logging)?;

    match cli.command {
        Command::Search { term, caller, json } => {
            let aggregator = PriceAggregator::from_config(&config.scrape)?;
            let result = search(&aggregator, &term, caller.map(CallerId::new), json).await;
            aggregator.shutdown().await;
            result
        }
        Command::Export { term, caller } => {
            let aggregator = PriceAggregator::from_config(&config.scrape)?;
            let result = export(&aggregator, &term, caller.map(CallerId::new)).await;
            aggregator.shutdown().await;
            result
        }
        Command::Sources => {
            for adapter in adapters::build(&config.scrape.sources) {
                let info = adapter.info();
                println!("{:<12} {:<7} {}", info.name, adapter.kind().label(), info.base_url);
            }
            Ok(())
        }
        Command::Health => {
            let aggregator = PriceAggregator::from_config(&config.scrape)?;
            let health = aggregator.health().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            aggregator.shutdown().await;
            Ok(())
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

async fn search(
    aggregator: &PriceAggregator,
    term: &str,
    caller: Option<CallerId>,
    json: bool,
) -> anyhow::Result<()> {
    let aggregation = aggregator.aggregate_detailed(caller.as_ref(), term).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&aggregation.response)?);
    } else {
        print_response(&aggregation.response, aggregation.cached);
    }
    Ok(())
}

fn print_response(response: &AggregateResponse, cached: bool) {
    if response.is_empty() {
        println!("No products found.");
        return;
    }
    for group in &response.results {
        println!("{} ({} products)", group.source, group.products.len());
        for product in &group.products {
            println!("  {:>12}  {}", product.price.display(), product.name);
            if let Some(url) = &product.product_url {
                println!("                {url}");
            }
        }
    }
    if cached {
        println!("(served from cache)");
    }
}

async fn export(
    aggregator: &PriceAggregator,
    term: &str,
    caller: Option<CallerId>,
) -> anyhow::Result<()> {
    let query = SearchQuery::new(term)?;
    if let Some(caller) = &caller {
        aggregator.admit(caller, OperationClass::Refresh)?;
    }
    let response = aggregator.aggregate(term).await?;
    let rows = catalog_rows(&response, &query, chrono::Utc::now());
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    tracing::info!(rows = rows.len(), "catalog export complete");
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(AppConfig::default_config_path);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default().save_to_file(&path)?;
    println!("wrote {}", path.display());
    Ok(())
}
