// Command-line entry point
// Without a subcommand the interactive UI starts; `search` and `last` print plain tables.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flight_finder::config::{app_dir, AppConfig};
use flight_finder::render::{offer_rows, TABLE_HEADERS};
use flight_finder::store::{JsonStore, StoreError, LAST_OFFERS_KEY};
use flight_finder::{build_provider, tui, FlightOffer, ProviderKind, SearchRequest};

const LOG_FILE_NAME: &str = "flight_finder.log";

#[derive(Parser)]
#[command(name = "flight-finder", version, about = "Search flight offers from the terminal")]
struct Cli {
    /// Config file to use instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider to query, overriding the config file
    #[arg(long, value_enum, global = true)]
    provider: Option<ProviderKind>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single search and print the offers
    Search {
        /// Origin IATA code
        #[arg(long)]
        from: String,

        /// Destination IATA code
        #[arg(long)]
        to: String,

        /// Departure date, YYYY-MM-DD
        #[arg(long)]
        date: String,

        #[arg(long)]
        adults: Option<u32>,

        /// Maximum number of offers
        #[arg(long)]
        max: Option<u32>,
    },

    /// Print the offers of the most recent search
    Last,
}

fn init_logging(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    // The terminal belongs to the UI, so everything goes to a file
    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_finder=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}

fn write_offer_table<W: Write>(offers: &[FlightOffer], mut writer: W) -> io::Result<()> {
    let rows = offer_rows(offers);
    if rows.is_empty() {
        return writeln!(writer, "No offers found");
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::DynamicFullWidth);
    table.set_header(TABLE_HEADERS.to_vec());
    for row in &rows {
        table.add_row(row.cells().to_vec());
    }

    writeln!(writer, "{table}")
}

async fn run_search(
    config: &AppConfig,
    store: &JsonStore,
    request: SearchRequest,
) -> Result<()> {
    let provider = build_provider(config).context("failed to build provider")?;
    info!(
        provider = provider.name(),
        origin = %request.origin,
        destination = %request.destination,
        "one-shot search"
    );

    let offers = provider
        .search(&request)
        .await
        .with_context(|| {
            format!(
                "search {} -> {} on {} failed",
                request.origin,
                request.destination,
                request.depart_date_string()
            )
        })?;
    tui::persist_offers(store, &offers);

    write_offer_table(&offers, io::stdout().lock())?;
    Ok(())
}

fn print_last<W: Write>(store: &JsonStore, mut writer: W) -> Result<()> {
    match store.read::<Vec<FlightOffer>>(LAST_OFFERS_KEY) {
        Ok(offers) => write_offer_table(&offers, writer)?,
        Err(StoreError::NotFound(_)) => writeln!(
            writer,
            "No stored results yet in {}",
            store.root().display()
        )?,
        Err(e) => return Err(e).context("failed to read stored results"),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }
    for name in config.missing_secrets() {
        warn!(setting = name, "credential is not configured");
    }

    let store = JsonStore::open_default().context("failed to locate store")?;

    match cli.command {
        None => {
            let provider = build_provider(&config).context("failed to build provider")?;
            tui::run(&config, provider, store).await
        }
        Some(Command::Search {
            from,
            to,
            date,
            adults,
            max,
        }) => {
            let adults = adults.unwrap_or(config.adults);
            let mut request =
                SearchRequest::new(&from, &to, &date, adults)?.with_currency(&config.currency);
            // Zero from either source leaves the cap to the provider
            if let Some(max) = max.or((config.max_results > 0).then_some(config.max_results)) {
                request = request.with_max_results(max);
            }
            run_search(&config, &store, request).await
        }
        Some(Command::Last) => print_last(&store, io::stdout().lock()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dir = app_dir().context("failed to locate config directory")?;
    let _guard = init_logging(&dir)?;

    let result = run(cli).await;
    if let Err(e) = &result {
        error!("exiting with error: {:#}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use flight_finder::normalize::{parse_money, parse_timestamp};
    use flight_finder::Segment;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_command() {
        let cli = Cli::try_parse_from([
            "flight-finder",
            "--provider",
            "amadeus",
            "search",
            "--from",
            "CPH",
            "--to",
            "YYZ",
            "--date",
            "2025-06-01",
            "--max",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.provider, Some(ProviderKind::Amadeus));
        match cli.command {
            Some(Command::Search { from, max, adults, .. }) => {
                assert_eq!(from, "CPH");
                assert_eq!(max, Some(3));
                assert_eq!(adults, None);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_offer_table_output() {
        let offer = FlightOffer {
            provider: "test".to_string(),
            offer_id: "1".to_string(),
            total_price: parse_money("199.99", "CAD", 2).unwrap(),
            segments: vec![Segment {
                from: "CPH".to_string(),
                to: "YYZ".to_string(),
                depart_at: parse_timestamp("2025-06-01T09:30:00Z").unwrap(),
                arrive_at: parse_timestamp("2025-06-01T18:00:00Z").unwrap(),
                carrier: "AC".to_string(),
                flight_no: "AC883".to_string(),
                cabin: "ECONOMY".to_string(),
            }],
        };

        let mut out = Vec::new();
        write_offer_table(&[offer], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Route"));
        assert!(text.contains("199.99"));

        let mut out = Vec::new();
        write_offer_table(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No offers found\n");
    }

    #[test]
    fn test_print_last_names_store_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("store"));

        let mut out = Vec::new();
        print_last(&store, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("No stored results yet in "));
        assert!(text.contains(&store.root().display().to_string()));

        store.write(LAST_OFFERS_KEY, &Vec::<FlightOffer>::new()).unwrap();
        let mut out = Vec::new();
        print_last(&store, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No offers found\n");
    }
}
