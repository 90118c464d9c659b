// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Zonewatch - Camera Zone Intrusion & Loitering Monitor
//!
//! Supervises every configured camera, records intrusion and loitering
//! events, and answers event/camera queries from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use zonewatch::events::{EventFilter, EventStore, MemoryEventStore, RuleKind, SqliteEventStore};
use zonewatch::inference::PersonSimulator;
use zonewatch::ingestion::SimulatedSource;
use zonewatch::registry::{CameraRegistry, NewCamera};
use zonewatch::{Config, Engine, EventBus, VERSION};

/// Zonewatch - Camera Zone Intrusion & Loitering Monitor
#[derive(Parser, Debug)]
#[command(name = "zonewatch")]
#[command(author = "Zonewatch Project")]
#[command(version = VERSION)]
#[command(about = "Zone intrusion and loitering detection for network cameras")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging (includes the per-frame debug overlay)
    #[arg(long)]
    trace: bool,

    /// Demo mode with simulated cameras and detector
    #[arg(long)]
    demo: bool,

    /// Data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Supervise all configured cameras until Ctrl+C
    Run,

    /// List recorded events, oldest first
    Events {
        /// Only events from this camera
        #[arg(long)]
        camera_id: Option<i64>,

        /// Only events of this rule (intrusion, loitering)
        #[arg(long)]
        rule: Option<RuleKind>,

        /// Maximum number of events
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one event
    Event {
        /// Event id
        id: i64,
    },

    /// List configured cameras
    Cameras,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);

    if let Some(Command::InitConfig { force }) = args.command {
        return init_config(&config_path, force);
    }

    // Load or create configuration
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(data_dir) = args.data_dir {
        config.database.path = data_dir.join("events.db");
        config.data_dir = data_dir;
    }
    if args.trace {
        config.stream.debug_overlay = true;
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            info!("Zonewatch v{} - Camera Zone Intrusion & Loitering Monitor", VERSION);
            info!("Configuration loaded from {:?}", config_path);
            info!("Demo mode: {}", config.demo_mode);

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(config))
        }
        Command::Events { camera_id, rule, limit } => {
            let store = open_store(&config)?;
            let filter = EventFilter {
                camera_id,
                rule,
                limit,
            };
            for event in store.query(&filter)? {
                println!("{}", serde_json::to_string(&event)?);
            }
            Ok(())
        }
        Command::Event { id } => {
            let store = open_store(&config)?;
            let event = store.get(id)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
            Ok(())
        }
        Command::Cameras => {
            let registry = CameraRegistry::new();
            for camera in &config.cameras {
                registry.create(NewCamera {
                    name: camera.name.clone(),
                    location: camera.location.clone(),
                    address: camera.address.clone(),
                });
            }
            for record in registry.list() {
                println!("{}", serde_json::to_string(&record)?);
            }
            Ok(())
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

fn init_config(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists; pass --force to overwrite", path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Config::default().save(path)?;
    println!("Wrote default configuration to {:?}", path);
    Ok(())
}

/// Event store for read-only commands; queries need the database
fn open_store(config: &Config) -> Result<SqliteEventStore> {
    if !config.database.enabled {
        anyhow::bail!("Event database is disabled in the configuration");
    }
    Ok(SqliteEventStore::open(&config.database)?)
}

/// Supervise every configured camera until Ctrl+C
async fn run(config: Config) -> Result<()> {
    if !config.demo_mode {
        anyhow::bail!(
            "No video backend is built into this binary. Enable demo_mode or pass --demo to run the simulated cameras"
        );
    }

    // Initialize event store
    let store: Arc<dyn EventStore> = if config.database.enabled {
        let store = SqliteEventStore::open(&config.database)?;
        if config.database.retention_days > 0 {
            store.purge_older_than(config.database.retention_days)?;
        }
        Arc::new(store)
    } else {
        warn!("Event database disabled, events are kept in memory only");
        Arc::new(MemoryEventStore::new())
    };

    let registry = Arc::new(CameraRegistry::new());
    let bus = Arc::new(EventBus::default());

    // Print every persisted event
    let mut events = bus.subscribe_events();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(stored) => {
                    let event = &stored.event;
                    match event.duration_sec {
                        Some(duration) => info!(
                            "[EVENT] #{} camera={} {} in {} ({:.1}s) {} {:.2} {}",
                            stored.id,
                            event.camera_id,
                            event.rule,
                            event.zone,
                            duration,
                            event.object_type,
                            event.confidence,
                            event.bbox.to_text()
                        ),
                        None => info!(
                            "[EVENT] #{} camera={} {} in {} {} {:.2} {}",
                            stored.id,
                            event.camera_id,
                            event.rule,
                            event.zone,
                            event.object_type,
                            event.confidence,
                            event.bbox.to_text()
                        ),
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Event printer lagged, skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let cameras = config.cameras.clone();
    let simulator = config.simulator.clone();
    let mut engine = Engine::new(config, store.clone(), registry.clone(), bus.clone())?;

    for camera in &cameras {
        let id = engine
            .add_camera(
                camera,
                Box::new(SimulatedSource::new(simulator.clone())),
                PersonSimulator::new(&simulator)?,
            )
            .await?;
        info!(id, name = %camera.name, zones = camera.zones.len(), "Camera added");
    }

    engine.start().await?;

    info!("Zonewatch running");
    info!("   Press Ctrl+C to shutdown");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");

    for (id, stats) in engine.stop().await? {
        info!(
            camera = id,
            frames = stats.frames,
            events = stats.events_stored,
            read_failures = stats.read_failures,
            "Stream finished"
        );
    }

    drop(engine);
    drop(bus);
    printer.abort();

    info!(stored = store.count()?, "Zonewatch shutdown complete");

    Ok(())
}
