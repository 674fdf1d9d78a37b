//! Scenario runner for the matching engine and the inventory ledger

use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use common::decimal::{Price, Quantity};
use common::error::{ErrorExt, Result};
use common::model::inventory::{ItemId, LocationId, StockSnapshot};
use common::model::order::{NewOrder, Side};
use common::model::trade::Trade;
use dotenv::dotenv;
use inventory_service::{InventoryConfig, InventoryLedger};
use matching_engine::{EngineConfig, MatchingEngine};
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level (overrides RUST_LOG)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print scenario reports as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cross a resting book with an incoming order
    Matching,
    /// Receive, reserve, commit, release and transfer stock
    Inventory,
    /// Race concurrent reservations against a fixed stock
    Stress {
        /// Number of concurrent callers
        #[arg(short, long, default_value_t = 8)]
        callers: usize,

        /// Reservations attempted by each caller
        #[arg(short, long, default_value_t = 50)]
        attempts: usize,

        /// Units on hand before the race starts
        #[arg(short, long, default_value_t = 100)]
        stock: u64,
    },
    /// Run every scenario
    All,
}

#[derive(Debug, Serialize)]
struct MatchingReport {
    symbol: String,
    trades: Vec<Trade>,
    best_bid: Option<Price>,
    best_ask: Option<Price>,
    last_price: Option<Price>,
    bids: Vec<(Price, Quantity)>,
    asks: Vec<(Price, Quantity)>,
}

#[derive(Debug, Serialize)]
struct InventoryReport {
    levels: Vec<StockSnapshot>,
    rejected_reserve: Option<String>,
}

#[derive(Debug, Serialize)]
struct StressReport {
    callers: usize,
    attempts: usize,
    granted: usize,
    rejected: usize,
    level: StockSnapshot,
    elapsed_ms: u128,
}

fn init_tracing(log_level: Option<&str>) {
    // DEBUG=1 in .env raises the default level
    let env_debug = std::env::var("DEBUG").unwrap_or_else(|_| "0".to_string());
    let default_level = if env_debug == "1" { Level::DEBUG } else { Level::INFO };

    let env_filter = match log_level {
        Some(level) => EnvFilter::new(format!(
            "core_demo={0},matching_engine={0},inventory_service={0},inventory_audit={0}",
            level
        )),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(default_level).into())
            .from_env_lossy(),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .finish();

    // Only set the global subscriber if it hasn't been set already
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        debug!("Tracing initialized");
    }
}

fn run_matching(config: EngineConfig) -> Result<MatchingReport> {
    let symbol = "BTC/USD";
    let depth = config.default_depth;
    let engine = MatchingEngine::with_config(config);
    let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    engine
        .place_order(NewOrder::new(alice, symbol, Side::Sell, dec!(101), dec!(5)))
        .with_context(|| "placing resting ask")?;
    engine
        .place_order(NewOrder::new(bob, symbol, Side::Sell, dec!(102), dec!(5)))
        .with_context(|| "placing resting ask")?;
    engine
        .place_order(NewOrder::new(carol, symbol, Side::Buy, dec!(99), dec!(3)))
        .with_context(|| "placing resting bid")?;

    let result = engine
        .place_order(NewOrder::new(carol, symbol, Side::Buy, dec!(102), dec!(7)))
        .with_context(|| "placing crossing bid")?;
    for trade in &result.trades {
        info!(
            "Trade {} x{} @ {} (buy {} / sell {})",
            symbol, trade.quantity, trade.price, trade.buyer_order_id, trade.seller_order_id
        );
    }

    let (bids, asks) = engine.market_depth(symbol, depth)?;
    Ok(MatchingReport {
        symbol: symbol.to_string(),
        trades: result.trades,
        best_bid: engine.best_bid(symbol),
        best_ask: engine.best_ask(symbol),
        last_price: engine.last_price(symbol),
        bids,
        asks,
    })
}

fn run_inventory(config: InventoryConfig) -> Result<InventoryReport> {
    let ledger = InventoryLedger::with_config(config);
    let milk = ItemId::new("MILK-1L")?;
    let (wh_a, wh_b) = (LocationId::new("BLR-A")?, LocationId::new("BLR-B")?);

    ledger
        .receive_stock(&milk, &wh_a, 100, "initial")
        .with_context(|| "receiving initial stock")?;

    let order_1 = ledger.reserve(&milk, &wh_a, 30, "order#1")?;
    ledger.commit(order_1, "ship")?;

    let order_2 = ledger.reserve(&milk, &wh_a, 20, "order#2")?;
    ledger.release(order_2, "cancel")?;

    ledger
        .transfer(&milk, &wh_a, &wh_b, 50, "rebalance")
        .with_context(|| format!("moving {} from {} to {}", milk, wh_a, wh_b))?;

    let rejected_reserve = match ledger.reserve(&milk, &wh_a, 25, "order#3") {
        Ok(id) => {
            warn!("Reservation {} unexpectedly granted", id);
            None
        }
        Err(e) => {
            info!("Reservation rejected as expected: {}", e);
            Some(e.to_string())
        }
    };

    Ok(InventoryReport {
        levels: ledger.stock_levels(),
        rejected_reserve,
    })
}

async fn run_stress(
    config: InventoryConfig,
    callers: usize,
    attempts: usize,
    stock: u64,
) -> std::result::Result<StressReport, Box<dyn std::error::Error>> {
    let ledger = Arc::new(InventoryLedger::with_config(config));
    let item = ItemId::new("SKU-STRESS")?;
    let location = LocationId::new("DC-1")?;
    ledger.receive_stock(&item, &location, stock, "stress seed")?;

    let started = Instant::now();
    let handles: Vec<_> = (0..callers)
        .map(|caller| {
            let ledger = ledger.clone();
            let (item, location) = (item.clone(), location.clone());
            tokio::task::spawn_blocking(move || {
                (0..attempts)
                    .filter(|attempt| {
                        let reference = format!("caller{}-{}", caller, attempt);
                        ledger.reserve(&item, &location, 1, &reference).is_ok()
                    })
                    .count()
            })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        granted += handle.await?;
    }
    let elapsed_ms = started.elapsed().as_millis();

    let level = ledger.get_stock(&item, &location);
    if level.reserved != granted as u64 || level.reserved > level.on_hand {
        warn!("Stress run left inconsistent level {:?}", level);
    }
    info!(
        "{} callers granted {} of {} reservations in {} ms",
        callers,
        granted,
        callers * attempts,
        elapsed_ms
    );

    Ok(StressReport {
        callers,
        attempts,
        granted,
        rejected: callers * attempts - granted,
        level,
        elapsed_ms,
    })
}

fn report<T: Serialize + std::fmt::Debug>(json: bool, name: &str, value: &T) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => warn!("Failed to serialize {} report: {}", name, e),
        }
    } else {
        info!("{} report: {:?}", name, value);
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let engine_config = EngineConfig::from_env()?;
    let inventory_config = InventoryConfig::from_env()?;
    debug!("Engine config: {:?}", engine_config);
    debug!("Inventory config: {:?}", inventory_config);

    match cli.command {
        Commands::Matching => {
            report(cli.json, "matching", &run_matching(engine_config)?);
        }
        Commands::Inventory => {
            report(cli.json, "inventory", &run_inventory(inventory_config)?);
        }
        Commands::Stress {
            callers,
            attempts,
            stock,
        } => {
            let stress = run_stress(inventory_config, callers, attempts, stock).await?;
            report(cli.json, "stress", &stress);
        }
        Commands::All => {
            report(cli.json, "matching", &run_matching(engine_config)?);
            report(cli.json, "inventory", &run_inventory(inventory_config.clone())?);
            let stress = run_stress(inventory_config, 8, 50, 100).await?;
            report(cli.json, "stress", &stress);
        }
    }

    Ok(())
}
