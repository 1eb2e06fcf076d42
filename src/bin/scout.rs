use anyhow::Context;
use clap::Parser;
use momentum_scout_bot::market::{build_supplier, SupplierKind};
use momentum_scout_bot::sink::{CsvSummaryLog, CsvTradeLog};
use momentum_scout_bot::{Scout, ScoutConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "scout", about = "Paper-trading momentum scout")]
struct Args {
    /// JSON config file; built-in defaults when omitted.
    #[arg(long, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Market data source: `sim` or `dexscreener`.
    #[arg(long, env = "SCOUT_SUPPLIER")]
    supplier: Option<String>,

    /// Seed for the random baseline strategy and the simulator.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    trade_log: Option<PathBuf>,

    #[arg(long)]
    summary_log: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "SCOUT_JSON_LOGS")]
    json_logs: bool,
}

fn parse_supplier(s: &str) -> anyhow::Result<SupplierKind> {
    match s.to_ascii_lowercase().as_str() {
        "sim" | "simulated" => Ok(SupplierKind::Sim),
        "dexscreener" | "dex" => Ok(SupplierKind::DexScreener),
        other => anyhow::bail!("unknown supplier {other:?} (expected sim or dexscreener)"),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<ScoutConfig> {
    let mut cfg = match &args.config {
        Some(path) => ScoutConfig::from_json_file(path)?,
        None => ScoutConfig::default(),
    };
    if let Some(s) = &args.supplier {
        cfg.supplier.kind = parse_supplier(s)?;
    }
    if let Some(seed) = args.seed {
        cfg.strategy.seed = seed;
        cfg.supplier.sim.seed = seed;
    }
    if let Some(p) = &args.trade_log {
        cfg.sinks.trade_log_path = p.clone();
    }
    if let Some(p) = &args.summary_log {
        cfg.sinks.summary_path = p.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let cfg = load_config(&args)?;
    tracing::info!(
        supplier = ?cfg.supplier.kind,
        strategy = ?cfg.strategy.kind,
        trade_log = %cfg.sinks.trade_log_path.display(),
        summary_log = %cfg.sinks.summary_path.display(),
        "configuration loaded"
    );

    let supplier = build_supplier(&cfg.supplier).context("build market data supplier")?;
    let trades = Arc::new(CsvTradeLog::open(&cfg.sinks.trade_log_path)?);
    let summaries = Arc::new(CsvSummaryLog::open(&cfg.sinks.summary_path)?);

    let mut scout = Scout::new(&cfg, supplier)
        .with_trade_sink(trades)
        .with_summary_sink(summaries);
    let scoreboard = scout.scoreboard().clone();

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received; shutting down");
            let _ = stop_tx.send(true);
        }
    });

    scout.run(stop_rx).await?;

    println!("{}", serde_json::to_string_pretty(&scoreboard.snapshot_kv())?);
    Ok(())
}
