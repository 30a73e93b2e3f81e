// censuscodes - resolve Census states/counties and query vacancy rates

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use censuscodes::{HttpFetcher, Registry, RegistryCell, RegistryConfig, VacancyClient};

static REGISTRY: RegistryCell = RegistryCell::new();

/// Census geographic reference codes and housing vacancy lookups.
#[derive(Parser, Debug)]
#[command(name = "censuscodes", version, about)]
struct Cli {
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every state.
    States,
    /// Resolve a county by full name, e.g. "Bronx County, New York".
    County { full_name: String },
    /// List every county with the given name, across all states.
    Search { name: String },
    /// Print the (redacted) API request URL for a county and year.
    Url { year: u16, full_name: String },
    /// Fetch the housing vacancy rate for a county and year.
    Vacancy { year: u16, full_name: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RegistryConfig::load()?;

    let fetcher = HttpFetcher::new()?;
    let registry = REGISTRY
        .get_or_load(&config, &fetcher)
        .context("Failed to build geographic reference registry")?;

    match cli.command {
        Commands::States => run_states(&registry, cli.json),
        Commands::County { full_name } => run_county(&registry, &full_name, cli.json),
        Commands::Search { name } => run_search(&registry, &name, cli.json),
        Commands::Url { year, full_name } => {
            let client = VacancyClient::new(Arc::clone(&registry), &config.api);
            let county = client.resolve_by_full_name(&full_name)?;
            println!("{}", client.redacted_url(year, &county)?);
            Ok(())
        }
        Commands::Vacancy { year, full_name } => {
            let client = VacancyClient::new(Arc::clone(&registry), &config.api);
            let records = client.fetch_by_full_name(year, &full_name)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for r in &records {
                    let rate = r
                        .vacancy_rate
                        .map(|v| format!("{:.2}%", v))
                        .unwrap_or_else(|| "n/a".to_string());
                    println!(
                        "{} {}{}: {} of {} units vacant ({})",
                        r.year, r.state_fips, r.county_fips, r.vacant_units, r.total_units, rate
                    );
                }
            }
            Ok(())
        }
    }
}

fn run_states(registry: &Registry, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(registry.states())?);
        return Ok(());
    }
    for state in registry.states() {
        println!(
            "{}  {}  {} ({} counties)",
            state.code,
            state.fips,
            state.name,
            state.counties.len()
        );
    }
    Ok(())
}

fn run_county(registry: &Registry, full_name: &str, json: bool) -> Result<()> {
    let county = registry.resolve_full_name(full_name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(county.as_ref())?);
    } else {
        println!("{}", full_name);
        println!("  state:      {} ({})", county.state, county.state_fips);
        println!("  county:     {}", county.fips);
        println!("  ns_code:    {}", county.ns_code);
        println!("  ucgid:      {}", county.ucgid());
    }
    Ok(())
}

fn run_search(registry: &Registry, name: &str, json: bool) -> Result<()> {
    let matches = registry.resolve_counties_named(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(matches)?);
        return Ok(());
    }
    for county in matches {
        println!(
            "{}{}  {}",
            county.state_fips,
            county.fips,
            county.full_name.as_deref().unwrap_or(&county.name)
        );
    }
    Ok(())
}
