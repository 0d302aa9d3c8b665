//! Jolly Roger Demo Client
//!
//! Syncs with the epoch clock, renders the area around the origin of the
//! current dungeon, plans a route and prepares the commitment for it.

use anyhow::Context;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jolly_roger::{
    game::{
        controller::{GameController, GameState, Player},
        Dungeon,
    },
    network::{EpochFeed, SystemClock},
    storage::{AccountKey, AccountStore, FileStore},
    Address, Direction, GameConfig, Position, VERSION,
};

/// Rooms rendered on each side of the origin.
const RADIUS: i32 = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let config = GameConfig::from_env();
    info!("Jolly Roger v{}", VERSION);
    info!(
        "Epoch period: {}s, commit window: {}s",
        config.clock.period, config.clock.action_period
    );

    let mut feed = EpochFeed::new(SystemClock, config.clock);
    let view = feed.poll_once().await?;
    info!(
        "Epoch {} ({}), {}",
        view.epoch.number,
        view.epoch.hash,
        if view.phase.committing { "commit window open" } else { "revealing" }
    );

    let player = Player {
        address: Address([0x42; 20]),
        position: Position::new(0, 0),
    };
    let mut account = AccountStore::new(FileStore::open(&config.data_dir)?);
    account.load(&AccountKey {
        address: player.address,
        chain_id: 31337,
        genesis_hash: None,
    });

    let mut controller = GameController::new(account).with_path_limit(config.path_limit);
    controller.apply_game_state(GameState {
        epoch: view.epoch,
        player: Some(player),
    })?;
    controller.apply_phase(view.phase);

    if let Some(dungeon) = controller.dungeon() {
        for line in render(dungeon, player.position) {
            info!("{}", line);
        }
    }

    demo_route(&mut controller, player.position)?;

    info!("=== Following the epoch clock ===");
    let mut views = feed.subscribe();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let poll_interval = config.poll_interval;
    let handle = tokio::spawn(feed.run(poll_interval, shutdown_rx));

    for _ in 0..3 {
        if tokio::time::timeout(poll_interval * 2, views.changed()).await.is_err() {
            break;
        }
        let view = *views.borrow_and_update();
        info!(
            "Epoch {}: {}s left to commit, {}s to epoch end",
            view.epoch.number, view.phase.time_left_to_commit, view.phase.time_left_to_epoch_end
        );
    }

    let _ = shutdown_tx.send(());
    handle.await?;
    Ok(())
}

/// Plan a route to the farthest reachable room in the window and prepare
/// its commitment.
fn demo_route(controller: &mut GameController<FileStore>, origin: Position) -> anyhow::Result<()> {
    info!("=== Planning route ===");
    let mut targets: Vec<Position> = (-RADIUS..=RADIUS)
        .flat_map(|y| (-RADIUS..=RADIUS).map(move |x| origin.offset(x, y)))
        .collect();
    targets.sort_by_key(|p| std::cmp::Reverse((p.x - origin.x).abs() + (p.y - origin.y).abs()));

    let mut routed = None;
    for target in targets {
        match controller.click_room(target)? {
            Some(len) if len > 0 => {
                routed = Some((target, len));
                break;
            }
            _ => {}
        }
    }
    let Some((target, len)) = routed else {
        info!("Origin is walled in this epoch");
        return Ok(());
    };
    info!("Route to {} takes {} moves", target, len);

    if controller.pick_treasure(true)?.changed() {
        info!("Picking up the treasure at {}", target);
    }

    let record = controller.prepare_commit(&mut rand::thread_rng(), 0)?;
    let commit = record.commit_call();
    info!(
        "Commitment {} over {} actions for epoch {}",
        commit.commitment_hash,
        record.preimage.actions.len(),
        record.epoch.number
    );
    Ok(())
}

/// ASCII map of the rooms around `center`.
///
/// `@` player, `$` treasure, `M` monster, `-` and `|` open exits.
fn render(dungeon: &Dungeon, center: Position) -> Vec<String> {
    let mut lines = Vec::new();
    for dy in -RADIUS..=RADIUS {
        let mut rooms = String::new();
        let mut doors = String::new();
        for dx in -RADIUS..=RADIUS {
            let position = center.offset(dx, dy);
            let room = dungeon.room(position);
            let glyph = if position == center {
                '@'
            } else if room.treasure {
                '$'
            } else if room.monster {
                'M'
            } else {
                'o'
            };
            rooms.push(glyph);
            if dx < RADIUS {
                rooms.push(if room.exits.has(Direction::East) { '-' } else { ' ' });
            }
            doors.push(if room.exits.has(Direction::South) { '|' } else { ' ' });
            if dx < RADIUS {
                doors.push(' ');
            }
        }
        lines.push(rooms);
        if dy < RADIUS {
            lines.push(doors);
        }
    }
    lines
}
