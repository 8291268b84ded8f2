//! Danmaku headless runner
//!
//! Loads the pattern files into the "enemy" collection, spawns the player
//! and runs fixed ticks until the player is hit or `max_ticks` elapse. The
//! number of ticks survived is the score.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::{Value, json};

use danmaku::consts::PLAYER_SIZE;
use danmaku::pattern::{Built, PatternNode};
use danmaku::sim::color::BLUE;
use danmaku::sim::{Entity, Key, KeyEvent, SimEvent, Sprite, TickInput, World, tick};
use danmaku::{HighScores, Settings};

/// Ticks between autopilot direction changes
const STRAFE_TICKS: u32 = 90;

/// Run bullet patterns against an autopiloted player and record the score
#[derive(Parser)]
#[command(name = "danmaku")]
#[command(version)]
struct Cli {
    /// Settings JSON file (defaults are used when absent)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// High score file
    #[arg(long, default_value = "scores.json")]
    scores: PathBuf,

    /// Pattern files loaded into the "enemy" collection
    #[arg(required = true)]
    patterns: Vec<PathBuf>,
}

fn spawn_player(world: &mut World) -> Result<()> {
    let node = PatternNode::from_value(&json!({"__type__": "Event", "pos": "__midbottom__"}))?;
    let Built::Mover(mover) = world.build(&node)? else {
        bail!("player pattern did not build a mover");
    };
    let sprite = Sprite::block(PLAYER_SIZE, PLAYER_SIZE, BLUE);
    world.insert_named("player", "player", Entity::new(mover.position, mover.motion, sprite))?;
    Ok(())
}

/// Strafe left and right so the run isn't a sitting target
fn autopilot(tick: u32) -> TickInput {
    let events = match tick % (2 * STRAFE_TICKS) {
        0 => vec![KeyEvent::Up(Key::Right), KeyEvent::Down(Key::Left)],
        t if t == STRAFE_TICKS => vec![KeyEvent::Up(Key::Left), KeyEvent::Down(Key::Right)],
        _ => Vec::new(),
    };
    TickInput { events }
}

fn player_hit(world: &World) -> bool {
    world
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::Collision { left, .. } if left.0 == "player"))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = cli
        .settings
        .as_deref()
        .map(Settings::load)
        .unwrap_or_default();
    let seed = settings.seed.unwrap_or_else(rand::random);
    log::info!("Danmaku starting ({}, seed {})", settings.difficulty.as_str(), seed);

    let mut world = World::new(&settings, seed);
    spawn_player(&mut world)?;

    for path in &cli.patterns {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let value: Value = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        world
            .load_pattern("enemy", &value)
            .with_context(|| format!("loading {}", path.display()))?;
    }

    let mut survived = 0;
    while survived < settings.max_ticks {
        tick(&mut world, &autopilot(survived));
        survived += 1;
        if player_hit(&world) {
            log::info!("Player hit at tick {}", survived);
            break;
        }
    }

    let score = u64::from(survived);
    let mut scores = HighScores::load(&cli.scores);
    match scores.add_score(score) {
        Some(rank) => {
            println!("Survived {score} ticks: new high score #{rank}");
            scores.save(&cli.scores)?;
        }
        None => println!("Survived {score} ticks"),
    }
    Ok(())
}
