//! Headless dungeon crawl
//!
//! Generates a dungeon, seats the configured players and runs the turn engine
//! on a virtual clock until the session ends or the time limit passes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use dc_core::agent::Intent;
use dc_core::config::{PlayerTemplate, SimConfig};
use dc_core::spawn::CreatureSpawner;
use dc_core::world::{Dungeon, WorldMap};
use dc_core::{GameRng, Session, SessionEvent};

/// Run a dungeon crawl session without a screen
#[derive(Parser, Debug)]
#[command(name = "dcrawl")]
#[command(author, version, about = "Dungeon crawl turn engine, headless", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// RNG seed for both the dungeon and the session
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Number of players (copies of the first configured player)
    #[arg(short = 'p', long = "players")]
    players: Option<usize>,

    /// Number of floors
    #[arg(short = 'f', long = "floors")]
    floors: Option<usize>,

    /// Virtual seconds to run before giving up
    #[arg(short = 't', long = "time", default_value_t = 600)]
    time: u64,

    /// Session option override, `name=value`; repeatable
    #[arg(short = 'O', long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,

    /// Print every event as a JSON line
    #[arg(short = 'e', long = "events")]
    events: bool,

    /// Print the final floor
    #[arg(short = 'm', long = "map")]
    map: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SimConfig::default(),
    };

    for raw in &args.overrides {
        let Some((name, value)) = raw.split_once('=') else {
            bail!("override '{}' is not of the form name=value", raw);
        };
        config
            .session
            .set_option(name.trim(), value.trim())
            .with_context(|| format!("bad override '{}'", raw))?;
    }
    if let Some(seed) = args.seed {
        config.session.seed = Some(seed);
    }
    if let Some(floors) = args.floors {
        config.dungeon.floors = floors;
    }
    if let Some(count) = args.players {
        let template = config.players.first().cloned().unwrap_or_default();
        config.players = (1..=count)
            .map(|n| PlayerTemplate {
                name: if count > 1 {
                    format!("{} {}", template.name, n)
                } else {
                    template.name.clone()
                },
                ..template.clone()
            })
            .collect();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn report(session: &mut Session<Dungeon, CreatureSpawner>, json: bool) -> Result<()> {
    for event in session.drain_events() {
        if json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match event {
            SessionEvent::Redraw => {}
            SessionEvent::Descend { floor } | SessionEvent::Ascend { floor } => {
                info!(floor, "floor changed")
            }
            other => info!(event = ?other, "session event"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(&args)?;

    // One seed drives generation and play so runs can be replayed
    let seed = config
        .session
        .seed
        .unwrap_or_else(|| GameRng::from_entropy().seed());
    config.session.seed = Some(seed);
    let mut rng = GameRng::new(seed);
    let dungeon = Dungeon::generate(&config.dungeon, &mut rng);
    info!(seed, floors = dungeon.depth(), "dungeon generated");

    let spawner = CreatureSpawner::new(config.creature.clone());
    let mut session = Session::new(config.session.clone(), dungeon, spawner)?;
    for template in &config.players {
        let Some(id) = session
            .add_player(template)
            .with_context(|| format!("could not seat player '{}'", template.name))?
        else {
            bail!("session ended before player '{}' joined", template.name);
        };
        info!(%id, name = %template.name, "player joined");
    }
    session.start()?;

    let limit = Duration::from_secs(args.time);
    loop {
        report(&mut session, args.events)?;
        if session.is_finished() || session.now() >= limit {
            break;
        }
        // No input device here: manual players pass their turn
        if let Some(id) = session.awaiting_input() {
            session.submit(id, Intent::Wait)?;
            continue;
        }
        if !session.step()? {
            warn!("engine stalled with nothing scheduled");
            break;
        }
    }
    report(&mut session, args.events)?;

    let state = session.state();
    info!(
        phase = %state.phase(),
        floor = state.current_floor(),
        rounds = state.rounds(),
        elapsed = ?session.now(),
        "session ended"
    );
    if args.map {
        if let Some(floor) = session.world().floor(state.current_floor()) {
            println!("{}", floor.render());
        }
    }
    println!("{}", serde_json::to_string_pretty(&session.scores())?);
    Ok(())
}
