//! CAN Monitor Host Simulator - Main Entry Point
//!
//! Plays the role of the host firmware: loads the persisted config, drives
//! the capture module from a periodic tick, and publishes state snapshots at
//! the selected UI poll rate. The controller is simulated.

mod traffic;

use anyhow::Context;
use can_monitor::{config_hints, CanMonitor, HostModule, MonotonicClock, Settings, CONFIG_KEY};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use traffic::TrafficGenerator;
use twai_driver::MockTwai;

/// Simulator options, read from `host-sim.{toml,json,yaml}` and `SIM_*` variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SimConfig {
    /// Host scheduler period
    tick_ms: u64,
    /// Stop after this long; run until Ctrl-C when unset
    duration_secs: Option<u64>,
    /// Frames put on the bus per tick
    frames_per_tick: u32,
    /// Raise a bus error every N ticks (0 = never)
    error_every_ticks: u32,
    /// Host config document holding the module settings
    host_config: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            duration_secs: None,
            frames_per_tick: 3,
            error_every_ticks: 0,
            host_config: "cfg.json".to_string(),
        }
    }
}

impl SimConfig {
    fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("host-sim").required(false))
            .add_source(config::Environment::with_prefix("SIM"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// Initialize logging
fn init_logging() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Read the host config document, or start from an enabled default
fn load_host_config(path: &Path) -> anyhow::Result<Value> {
    if !path.exists() {
        warn!("{} not found, starting with capture enabled", path.display());
        let settings = Settings {
            enabled: true,
            ..Default::default()
        };
        let mut doc = Map::new();
        doc.insert(CONFIG_KEY.to_string(), settings.to_json());
        return Ok(Value::Object(doc));
    }

    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Write the module section back, keeping every other section of the document
fn save_host_config(path: &Path, module: &impl HostModule) -> anyhow::Result<()> {
    let mut doc = match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str::<Map<String, Value>>(&text)
            .with_context(|| format!("parsing {}, not overwriting it", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    module.add_to_config(&mut doc);

    let text = serde_json::to_string_pretty(&Value::Object(doc))?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn publish(module: &impl HostModule, lite: bool) {
    let mut state = Map::new();
    module.add_to_state(&mut state, lite);
    info!("state {}", serde_json::Value::Object(state));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("=== CAN Monitor Simulator v{} ===", env!("CARGO_PKG_VERSION"));

    let sim = SimConfig::load()?;
    info!("Simulator config: {:?}", sim);

    let bus = MockTwai::new();
    let mut module = CanMonitor::new(bus.clone(), MonotonicClock::new());

    let host_config = Path::new(&sim.host_config);
    if !module.read_from_config(&load_host_config(host_config)?) {
        warn!("Host config incomplete, defaults applied");
    }
    module.setup();

    for (field, hint) in config_hints() {
        debug!("hint {}: {}", field, hint);
    }

    let mut info_doc = Map::new();
    module.add_to_info(&mut info_doc);
    info!("info {}", serde_json::Value::Object(info_doc));

    let mut traffic = TrafficGenerator::new(sim.frames_per_tick, sim.error_every_ticks);
    let mut ticker = tokio::time::interval(Duration::from_millis(sim.tick_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let deadline = sim.duration_secs.map(|s| Instant::now() + Duration::from_secs(s));
    let mut last_publish = Instant::now();
    let mut publishes: u64 = 0;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                traffic.drive(&bus);
                HostModule::tick(&mut module);

                if last_publish.elapsed() >= module.settings().poll_rate().interval() {
                    // Full snapshot every tenth publish, lite otherwise
                    publish(&module, publishes % 10 != 0);
                    publishes += 1;
                    last_publish = Instant::now();
                }

                if deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }
            }
        }
    }

    let mut info_doc = Map::new();
    module.add_to_info(&mut info_doc);
    info!("info {}", serde_json::Value::Object(info_doc));

    save_host_config(host_config, &module)?;
    module.teardown();
    info!("Simulator stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_monitor::ManualClock;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("can-monitor-sim-{}-{}.json", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn module() -> CanMonitor<MockTwai, ManualClock> {
        CanMonitor::new(MockTwai::new(), ManualClock::new(0))
    }

    #[test]
    fn test_save_keeps_other_sections() {
        let path = scratch("keep");
        std::fs::write(&path, r#"{"nw":{"ssid":"garage"},"CAN_TWAI":{"enabled":true}}"#).unwrap();

        save_host_config(&path, &module()).unwrap();

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["nw"]["ssid"], "garage");
        assert_eq!(doc[CONFIG_KEY]["enabled"], false);
        assert_eq!(doc[CONFIG_KEY]["bitrate"], 500_000);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_save_refuses_unparseable_document() {
        let path = scratch("corrupt");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(save_host_config(&path, &module()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_save_creates_missing_document() {
        let path = scratch("missing");

        save_host_config(&path, &module()).unwrap();

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(doc[CONFIG_KEY].is_object());
        std::fs::remove_file(&path).unwrap();
    }
}
