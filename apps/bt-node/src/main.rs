//! bt-node — the bus-tracker pipeline process.
//!
//! `bt-node all` runs every stage in one process over the in-process broker:
//! the fleet simulator publishes to the updates topic, the stream processor
//! workers fold each update into the position stores and republish it, and
//! the fan-out bridge pushes processed events to every connected observer,
//! over WebSocket (`OBSERVER_WS_ADDR`) or NDJSON lines (`OBSERVER_ADDR`).
//!
//! With the `kafka` feature the stages can also run as separate processes
//! (`simulate`, `process`, `bridge`) against a real broker.
//!
//! Configuration comes from the environment (see `PipelineConfig`) or from a
//! JSON file passed with `--config`.  Ctrl-C stops every stage.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use structopt::StructOpt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use bt_core::{Clock, PipelineConfig, Route, SystemClock};
use bt_fanout::{FanoutBridge, FanoutHub, ObserverServer};
use bt_fleet::{FleetBuilder, FleetDriver, LogObserver};
use bt_processor::{run_density_sweep, MemoryStore, QueryView, StreamProcessor};
use bt_spatial::GridSpec;
use bt_transport::{assign_partitions, MemoryBroker, RetryPolicy, RetryingPublisher, StartFrom};

// ── Constants ─────────────────────────────────────────────────────────────────

const BRIDGE_GROUP:   &str     = "fanout-bridge";
const STATS_INTERVAL: Duration = Duration::from_secs(60);
const LOG_EVERY_TICKS: u64     = 60;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(StructOpt)]
#[structopt(name = "bt-node", about = "Bus position simulator and event pipeline")]
struct Flags {
    /// JSON config file.  Without it settings come from the environment.
    #[structopt(long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Option<Command>,
}

#[derive(StructOpt)]
enum Command {
    /// Simulator, processor, bridge and observer servers in one process.
    All,
    /// Fleet simulator only, publishing to Kafka.
    Simulate,
    /// Stream processor workers only, consuming from Kafka.
    Process,
    /// Fan-out bridge and observer servers only, consuming from Kafka.
    Bridge,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let flags = Flags::from_args();
    let config = load_config(flags.config.as_deref())?;
    let shutdown = shutdown_on_ctrl_c();

    match flags.cmd.unwrap_or(Command::All) {
        Command::All => run_all(&config, shutdown).await,
        Command::Simulate => stages::simulate(&config, shutdown).await,
        Command::Process => stages::process(&config, shutdown).await,
        Command::Bridge => stages::bridge(&config, shutdown).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::from_env()?,
    };
    config.validate()?;
    info!("seed {}", config.seed);
    Ok(config)
}

/// Routes from `ROUTES_PATH`, or the built-in list when none is configured.
fn load_routes(config: &PipelineConfig) -> Result<Vec<Route>> {
    let routes = match &config.routes_path {
        Some(path) => bt_catalog::load_routes(path)
            .with_context(|| format!("loading routes from {}", path.display()))?,
        None => bt_catalog::fallback_routes()?,
    };
    info!("loaded {} routes", routes.len());
    Ok(routes)
}

/// The returned flag turns `true` on the first Ctrl-C.
fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received, shutting down"),
            Err(e) => warn!("cannot listen for ctrl-c: {e}"),
        }
        let _ = stop.send(true);
    });
    shutdown
}

/// The WebSocket and NDJSON observer listeners.
async fn bind_observer_servers(config: &PipelineConfig) -> Result<Vec<ObserverServer>> {
    let ws = ObserverServer::bind_websocket(config.observer_ws_addr.as_str())
        .await
        .with_context(|| format!("binding WebSocket observer server to {}", config.observer_ws_addr))?;
    let lines = ObserverServer::bind(config.observer_addr.as_str())
        .await
        .with_context(|| format!("binding observer server to {}", config.observer_addr))?;
    Ok(vec![ws, lines])
}

async fn join_all(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            warn!("pipeline task failed: {e}");
        }
    }
}

// ── All stages in one process ─────────────────────────────────────────────────

async fn run_all(config: &PipelineConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
    let routes = load_routes(config)?;
    let retry = RetryPolicy::default();
    let broker = MemoryBroker::new(config.partitions);
    let publisher = Arc::new(RetryingPublisher::new(broker.producer(), retry));
    let grid = GridSpec::new(config.grid_cells_per_degree);
    let mut tasks = Vec::new();

    // Stream processor workers, each on its own share of the partitions.
    let store = Arc::new(MemoryStore::new(grid, config.density_ttl()));
    let processor = Arc::new(StreamProcessor::new(
        Arc::clone(&store),
        Arc::clone(&publisher),
        SystemClock,
        grid,
        &config.events_topic,
    ));
    let workers = config.processor_workers as u32;
    for worker in 0..workers {
        let partitions = assign_partitions(config.partitions, workers, worker);
        let sub = broker.subscribe_partitions(
            &config.updates_topic,
            &config.consumer_group,
            StartFrom::Earliest,
            partitions,
        )?;
        let processor = Arc::clone(&processor);
        let shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            processor.run(sub, shutdown, retry).await;
        }));
    }
    tasks.push(tokio::spawn(run_density_sweep(
        Arc::clone(&store),
        SystemClock,
        config.density_sweep_interval(),
        shutdown.clone(),
    )));
    tasks.push(tokio::spawn(log_stats(
        QueryView::new(Arc::clone(&store), processor.stats(), SystemClock),
        shutdown.clone(),
    )));

    // Fan-out: subscribe before the simulator starts so no event is missed.
    let hub = FanoutHub::default();
    let events = broker.subscribe(&config.events_topic, BRIDGE_GROUP, StartFrom::Latest)?;
    let bridge = FanoutBridge::new(hub.clone(), retry);
    let rx = shutdown.clone();
    tasks.push(tokio::spawn(async move {
        bridge.run(events, rx).await;
    }));
    for server in bind_observer_servers(config).await? {
        tasks.push(tokio::spawn(server.run(hub.clone(), shutdown.clone())));
    }

    // Simulator.
    let mut fleet = FleetBuilder::new(routes, config.seed)
        .vehicles_per_route(config.vehicles_per_route)
        .start_ms(SystemClock.now_ms())
        .build()?;
    let driver = FleetDriver::new(publisher, SystemClock, &config.updates_topic, config.tick_interval());
    let rx = shutdown.clone();
    tasks.push(tokio::spawn(async move {
        let mut observer = LogObserver::new(LOG_EVERY_TICKS);
        driver.run(&mut fleet, &mut observer, rx).await;
    }));

    join_all(tasks).await;
    info!("pipeline stopped");
    Ok(())
}

async fn log_stats<C: Clock>(view: QueryView<C>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(STATS_INTERVAL);
    interval.tick().await;
    while !*shutdown.borrow() {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = interval.tick() => {
                let stats = view.stats();
                info!(
                    "{} vehicles tracked; processed {}, dropped {}, store errors {}, republish errors {}",
                    view.snapshot().len(),
                    stats.processed,
                    stats.dropped,
                    stats.store_errors,
                    stats.republish_errors
                );
            }
        }
    }
}

// ── Individual stages over Kafka ──────────────────────────────────────────────

#[cfg(feature = "kafka")]
mod stages {
    use super::*;

    use bt_transport::{KafkaPublisher, KafkaSubscriber};

    pub async fn simulate(config: &PipelineConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
        let routes = load_routes(config)?;
        let publisher = Arc::new(RetryingPublisher::new(
            KafkaPublisher::connect(&config.broker)?,
            RetryPolicy::default(),
        ));
        let mut fleet = FleetBuilder::new(routes, config.seed)
            .vehicles_per_route(config.vehicles_per_route)
            .start_ms(SystemClock.now_ms())
            .build()?;
        let driver = FleetDriver::new(publisher, SystemClock, &config.updates_topic, config.tick_interval());
        let mut observer = LogObserver::new(LOG_EVERY_TICKS);
        driver.run(&mut fleet, &mut observer, shutdown).await;
        Ok(())
    }

    pub async fn process(config: &PipelineConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
        let retry = RetryPolicy::default();
        let grid = GridSpec::new(config.grid_cells_per_degree);
        let store = Arc::new(MemoryStore::new(grid, config.density_ttl()));
        let publisher = Arc::new(RetryingPublisher::new(KafkaPublisher::connect(&config.broker)?, retry));
        let processor = Arc::new(StreamProcessor::new(
            Arc::clone(&store),
            publisher,
            SystemClock,
            grid,
            &config.events_topic,
        ));

        let mut tasks = Vec::new();
        for _ in 0..config.processor_workers {
            let sub = KafkaSubscriber::connect(
                &config.broker,
                &config.consumer_group,
                &config.updates_topic,
                StartFrom::Latest,
            )?;
            let processor = Arc::clone(&processor);
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                processor.run(sub, shutdown, retry).await;
            }));
        }
        tasks.push(tokio::spawn(run_density_sweep(
            Arc::clone(&store),
            SystemClock,
            config.density_sweep_interval(),
            shutdown.clone(),
        )));
        tasks.push(tokio::spawn(log_stats(
            QueryView::new(store, processor.stats(), SystemClock),
            shutdown,
        )));
        join_all(tasks).await;
        Ok(())
    }

    pub async fn bridge(config: &PipelineConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
        let hub = FanoutHub::default();
        let sub = KafkaSubscriber::connect(&config.broker, BRIDGE_GROUP, &config.events_topic, StartFrom::Latest)?;
        let servers = bind_observer_servers(config)
            .await?
            .into_iter()
            .map(|server| tokio::spawn(server.run(hub.clone(), shutdown.clone())))
            .collect();
        FanoutBridge::new(hub, RetryPolicy::default()).run(sub, shutdown).await;
        join_all(servers).await;
        Ok(())
    }
}

#[cfg(not(feature = "kafka"))]
mod stages {
    use super::*;

    fn kafka_required(stage: &str) -> Result<()> {
        Err(bt_core::BtError::Config(format!(
            "`{stage}` runs against Kafka; rebuild with `--features kafka` or use `all`"
        ))
        .into())
    }

    pub async fn simulate(_: &PipelineConfig, _: watch::Receiver<bool>) -> Result<()> {
        kafka_required("simulate")
    }

    pub async fn process(_: &PipelineConfig, _: watch::Receiver<bool>) -> Result<()> {
        kafka_required("process")
    }

    pub async fn bridge(_: &PipelineConfig, _: watch::Receiver<bool>) -> Result<()> {
        kafka_required("bridge")
    }
}
