use std::sync::Arc;

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{Address, U256};
use arbot::arb::{
    ArbitrageEngine, ArbitrageRequest, EngineError, EngineEvent, InMemoryLedger, LogSink,
    MetricsSink, TokenLedger,
};
use arbot::config::Config;
use arbot::notify::{SlackNotifier, TelegramNotifier};
use arbot::utils::constants::SIMULATION_DECIMALS;
use arbot::utils::logger::setup_logger;
use arbot::venues::FixedRateVenue;
use clap::{Args, Parser, Subcommand};
use eyre::{Error, Result};
use itertools::Itertools;
use log::{info, warn};
use metrics_exporter_prometheus::PrometheusBuilder;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one round trip against two in-memory venues
    Simulate(SimulateArgs),
    /// Send slack message
    Slack { message: String },
    /// Send slack error message
    SlackError { message: String },
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Amount of token A committed, in whole tokens
    #[arg(long, default_value = "1")]
    amount: String,
    /// Payout percentage of the buy venue
    #[arg(long, default_value_t = 95)]
    buy_factor: u64,
    /// Payout percentage of the sell venue
    #[arg(long, default_value_t = 110)]
    sell_factor: u64,
    /// Liquidity of each token held by each venue, in whole tokens
    #[arg(long, default_value = "1000")]
    liquidity: String,
    /// Do not submit when the quote already shows a loss
    #[arg(long)]
    skip_losing: bool,
    /// Announce executed arbitrages on Slack and Telegram
    #[arg(long)]
    notify: bool,
    /// Print the Prometheus metrics recorded during the run
    #[arg(long)]
    metrics: bool,
}

/// Parses a whole-token amount into base units
fn parse_amount(amount: &str) -> Result<U256> {
    Ok(parse_units(amount, SIMULATION_DECIMALS)?.get_absolute())
}

/// Builds the in-memory world, runs the round trip and returns the emitted events
fn simulate(config: &Config, args: &SimulateArgs) -> Result<Vec<EngineEvent>> {
    let amount = parse_amount(&args.amount)?;
    let liquidity = parse_amount(&args.liquidity)?;
    let operator = config.operator_or_default();
    let (token_a, token_b) = (
        Address::left_padding_from(b"TKNA"),
        Address::left_padding_from(b"TKNB"),
    );

    let ledger = Arc::new(InMemoryLedger::new());
    let engine = ArbitrageEngine::new(config.engine_config(), ledger.clone());
    engine.subscribe(Arc::new(LogSink));
    if args.metrics {
        engine.subscribe(Arc::new(MetricsSink::new(engine.address(), SIMULATION_DECIMALS)));
    }

    for (label, factor) in [("DEX1", args.buy_factor), ("DEX2", args.sell_factor)] {
        let handle = Address::left_padding_from(label.as_bytes());
        ledger.mint(token_a, handle, liquidity)?;
        ledger.mint(token_b, handle, liquidity)?;
        engine.register_venue(operator, Arc::new(FixedRateVenue::new(handle, factor)), label)?;
    }

    ledger.mint(token_a, operator, amount)?;
    ledger.transfer(token_a, operator, engine.address(), amount)?;

    info!(
        "Venues: {}",
        engine.venues().iter().map(ToString::to_string).join(", ")
    );

    let request = ArbitrageRequest {
        token_in: token_a,
        token_out: token_b,
        amount,
        buy_venue: 0,
        sell_venue: 1,
    };

    let quote = engine.quote_arbitrage(&request)?;
    info!(
        "Quote: {} -> {} -> {} ({} bps)",
        format_units(quote.amount_in(), SIMULATION_DECIMALS)?,
        format_units(quote.intermediate_amount(), SIMULATION_DECIMALS)?,
        format_units(quote.amount_out(), SIMULATION_DECIMALS)?,
        quote.profit_margin()
    );
    if args.skip_losing && !quote.is_profitable() {
        warn!("Quote shows no profit, not submitting");
        return Ok(engine.events());
    }

    match engine.execute_arbitrage(operator, &request) {
        Ok(outcome) => info!(
            "Profit: {} token A",
            format_units(outcome.profit.unsigned_abs(), SIMULATION_DECIMALS)?
        ),
        Err(err @ EngineError::NoProfitMade { .. }) => warn!("Round trip reverted: {err}"),
        Err(err) => return Err(err.into()),
    }

    info!(
        "Custody after round trip: {} token A",
        format_units(engine.balance_of(token_a)?, SIMULATION_DECIMALS)?
    );
    Ok(engine.events())
}

async fn run_simulation(config: Config, args: SimulateArgs) -> Result<(), Error> {
    let prometheus = if args.metrics {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let events = simulate(&config, &args)?;
    for event in &events {
        println!("{}", event.to_json());
    }
    if let Some(handle) = prometheus {
        print!("{}", handle.render());
    }

    if args.notify {
        notify(&config, &events).await?;
    }
    Ok(())
}

/// Sends `events` to every configured chat
async fn notify(config: &Config, events: &[EngineEvent]) -> Result<(), Error> {
    let mut sent = false;

    if let Some(token) = config.slack_token.as_deref() {
        let notifier = SlackNotifier::with_token(token)?;
        for event in events {
            notifier.send_event(event).await?;
        }
        sent = true;
    }

    if let (Some(token), Some(chat_id)) = (
        config.telegram_token.as_deref(),
        config.telegram_chat_id.as_deref(),
    ) {
        let notifier = TelegramNotifier::with_credentials(token, chat_id)?;
        for event in events {
            notifier.send_event(event).await?;
        }
        sent = true;
    }

    if !sent {
        warn!("--notify given but neither SLACK_OAUTH_TOKEN nor TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID is set");
    }
    Ok(())
}

async fn send_slack_message(message: &str) -> Result<(), Error> {
    let notifier = SlackNotifier::new()?;
    notifier.send(message).await?;
    Ok(())
}

async fn send_slack_error_message(message: &str) -> Result<(), Error> {
    let notifier = SlackNotifier::new()?;
    notifier.send_error(message).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_logger()?;
    let config = Config::from_env()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate(args) => run_simulation(config, args).await?,
        Commands::Slack { message } => send_slack_message(&message).await?,
        Commands::SlackError { message } => send_slack_error_message(&message).await?,
    }

    Ok(())
}
