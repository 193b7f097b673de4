//! `PipelineConfig` — environment-style settings shared by every stage.
//!
//! Each process reads the keys it needs from the environment (or a JSON file
//! with the same field names in snake case).  Unset keys fall back to the
//! defaults below; malformed values are a startup error.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{BtError, BtResult};

/// Settings for the simulator, processor, and fan-out stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Transport broker address (`host:port`).
    pub broker: String,
    /// Simulator → processor topic.
    pub updates_topic: String,
    /// Processor → fan-out channel.
    pub events_topic: String,
    /// Consumer group of the stream processor.
    pub consumer_group: String,
    /// Fleet tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Vehicles simulated on each route.
    pub vehicles_per_route: usize,
    /// Density grid resolution: cells per degree on each axis.
    pub grid_cells_per_degree: u32,
    /// Sliding expiry of a density cell, in seconds.
    pub density_ttl_secs: u64,
    /// Interval of the active density sweep, in seconds.
    pub density_sweep_secs: u64,
    /// Listen address of the NDJSON observer push server.
    pub observer_addr: String,
    /// Listen address of the WebSocket observer push server.
    pub observer_ws_addr: String,
    /// Stream processor worker count.
    pub processor_workers: usize,
    /// Partitions per topic in the in-process broker.
    pub partitions: u32,
    /// Master RNG seed.  The same seed reproduces the same fleet.
    pub seed: u64,
    /// Route catalog file (`.csv` or `.json`).  `None` uses the built-in list.
    pub routes_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            broker:                "localhost:9092".to_string(),
            updates_topic:         "bus-updates".to_string(),
            events_topic:          "bus-events".to_string(),
            consumer_group:        "bus-tracker-group".to_string(),
            tick_interval_ms:      1_000,
            vehicles_per_route:    10,
            grid_cells_per_degree: 1_000,
            density_ttl_secs:      300,
            density_sweep_secs:    30,
            observer_addr:         "0.0.0.0:3001".to_string(),
            observer_ws_addr:      "0.0.0.0:3000".to_string(),
            processor_workers:     1,
            partitions:            8,
            seed:                  time_seed(),
            routes_path:           None,
        }
    }
}

impl PipelineConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> BtResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> BtResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("KAFKA_BROKER")   { cfg.broker = v; }
        if let Some(v) = lookup("UPDATES_TOPIC")  { cfg.updates_topic = v; }
        if let Some(v) = lookup("EVENTS_TOPIC")   { cfg.events_topic = v; }
        if let Some(v) = lookup("CONSUMER_GROUP") { cfg.consumer_group = v; }
        if let Some(v) = lookup("OBSERVER_ADDR")  { cfg.observer_addr = v; }
        if let Some(v) = lookup("OBSERVER_WS_ADDR") { cfg.observer_ws_addr = v; }
        if let Some(v) = lookup("ROUTES_PATH")    { cfg.routes_path = Some(PathBuf::from(v)); }

        parse_into(&lookup, "TICK_INTERVAL_MS", &mut cfg.tick_interval_ms)?;
        parse_into(&lookup, "VEHICLES_PER_ROUTE", &mut cfg.vehicles_per_route)?;
        parse_into(&lookup, "GRID_CELLS_PER_DEGREE", &mut cfg.grid_cells_per_degree)?;
        parse_into(&lookup, "DENSITY_TTL_SECS", &mut cfg.density_ttl_secs)?;
        parse_into(&lookup, "DENSITY_SWEEP_SECS", &mut cfg.density_sweep_secs)?;
        parse_into(&lookup, "PROCESSOR_WORKERS", &mut cfg.processor_workers)?;
        parse_into(&lookup, "PARTITIONS", &mut cfg.partitions)?;
        parse_into(&lookup, "SEED", &mut cfg.seed)?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Load settings from a JSON file.  Missing fields take their defaults.
    pub fn from_json_file(path: &std::path::Path) -> BtResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| BtError::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values no stage can run with.
    pub fn validate(&self) -> BtResult<()> {
        let positive = [
            ("TICK_INTERVAL_MS", self.tick_interval_ms),
            ("GRID_CELLS_PER_DEGREE", self.grid_cells_per_degree as u64),
            ("DENSITY_TTL_SECS", self.density_ttl_secs),
            ("DENSITY_SWEEP_SECS", self.density_sweep_secs),
            ("PROCESSOR_WORKERS", self.processor_workers as u64),
            ("PARTITIONS", self.partitions as u64),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(BtError::Config(format!("{key} must be greater than zero")));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[inline]
    pub fn density_ttl(&self) -> Duration {
        Duration::from_secs(self.density_ttl_secs)
    }

    #[inline]
    pub fn density_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.density_sweep_secs)
    }
}

fn parse_into<F, T>(lookup: &F, key: &str, slot: &mut T) -> BtResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| BtError::Config(format!("{key}={raw:?}: {e}")))?;
    }
    Ok(())
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}
