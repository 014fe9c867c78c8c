use anyhow::Context;
use chrono::{Duration as ChronoDuration, FixedOffset, Utc};
use clap::Parser;
use common::logger::init_tracing;
use sampler::{
    cli::{Cli, Command, ReportArgs, RunArgs, SinkKind},
    config::AppConfig,
    db::Db,
    market::{binance::P2pClient, sampler::P2pSideSampler},
    metrics::counters::TickCounters,
    pipeline::SamplingPipeline,
    report::{build_report, render_report},
    scheduler::AlignedScheduler,
    shutdown::setup_signal_handlers,
    sink::{ConsoleSink, FanoutSink, JsonlSink, Sink, SqlxSnapshotStore},
    snapshot::SnapshotBuilder,
    time::SystemClock,
};
use tracing::info;

/// Connects the snapshot database and makes sure the schema exists.
async fn init_store(cfg: &AppConfig) -> anyhow::Result<SqlxSnapshotStore> {
    let db = Db::connect(&cfg.database_url)
        .await
        .with_context(|| format!("failed to connect {}", cfg.database_url))?;
    db.migrate().await.context("failed to migrate snapshot schema")?;

    Ok(SqlxSnapshotStore::new(db.pool.clone()))
}

async fn build_sinks(cfg: &AppConfig, args: &RunArgs) -> anyhow::Result<FanoutSink> {
    let mut kinds: Vec<SinkKind> = Vec::with_capacity(args.sinks.len());
    for kind in &args.sinks {
        if !kinds.contains(kind) {
            kinds.push(*kind);
        }
    }

    let mut sinks: Vec<Box<dyn Sink>> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        match kind {
            SinkKind::Console => sinks.push(Box::new(ConsoleSink)),
            SinkKind::Store => sinks.push(Box::new(init_store(cfg).await?)),
            SinkKind::Jsonl => sinks.push(Box::new(
                JsonlSink::open(&args.jsonl_path)
                    .await
                    .with_context(|| format!("failed to open {}", args.jsonl_path.display()))?,
            )),
        }
    }

    if sinks.is_empty() {
        anyhow::bail!("at least one sink is required");
    }

    Ok(FanoutSink::new(sinks))
}

async fn run(cfg: AppConfig, args: RunArgs) -> anyhow::Result<()> {
    info!(
        fiat = %cfg.market.fiat,
        asset = %cfg.market.asset,
        pay_methods = ?cfg.market.pay_methods,
        interval_minutes = cfg.interval_minutes,
        buy_trans_amount = cfg.buy_trans_amount,
        sell_trans_amount = cfg.sell_trans_amount,
        sinks = ?args.sinks,
        "starting p2p sampler"
    );

    let client = P2pClient::new(&cfg.base_url, cfg.request_timeout)?;
    let source = P2pSideSampler::new(client, cfg.market.clone());
    let builder = SnapshotBuilder::new(source, cfg.buy_trans_amount, cfg.sell_trans_amount);
    let sink = build_sinks(&cfg, &args).await?;
    let pipeline = SamplingPipeline::new(builder, sink);

    let shutdown = setup_signal_handlers();
    let mut scheduler = AlignedScheduler::new(
        SystemClock,
        cfg.interval_minutes,
        cfg.shutdown_grace,
        TickCounters::default(),
    );

    scheduler.run(&pipeline, shutdown).await;

    Ok(())
}

async fn report(cfg: AppConfig, args: ReportArgs) -> anyhow::Result<()> {
    let offset = FixedOffset::east_opt(args.utc_offset_hours * 3600)
        .with_context(|| format!("invalid utc offset: {}", args.utc_offset_hours))?;

    let store = init_store(&cfg).await?;
    let since = Utc::now() - ChronoDuration::days(args.days);
    let snapshots = store.fetch_since(since).await?;

    info!(count = snapshots.len(), days = args.days, "loaded snapshots for report");

    let report = build_report(&snapshots, offset);
    println!("{}", render_report(&report, args.days));

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv(); // load .env if present

    let cli = Cli::parse();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing("p2p-sampler", cli.json_logs || is_production);

    let cfg = AppConfig::from_env()?;

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run(cfg, args).await,
        Command::Report(args) => report(cfg, args).await,
    }
}
