use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use quadrant_server::config::ServerConfig;
use quadrant_server::game::bots::{fill_bots, BotScheduler, DefaultBrain};
use quadrant_server::game::constants::timing;
use quadrant_server::game::spatial::PlayerGrid;
use quadrant_server::game::{tick, tournament, World};
use quadrant_server::net::hub::Hub;
use quadrant_server::net::protocol::{Outbox, ServerMessage, Snapshot, Target};
use quadrant_server::net::server::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Quadrant Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    info!(
        "Configuration loaded: {}:{}, seed={:#x}",
        config.bind_address, config.port, config.seed
    );

    let world = Arc::new(World::new(config.seed));
    if config.initial_bots_per_team > 0 {
        let mut state = world.state.write();
        let added = fill_bots(&mut state, config.initial_bots_per_team);
        info!("Seeded {added} bots");
    }

    let (hub, hub_rx) = Hub::new();
    tokio::spawn(hub.clone().run(hub_rx));

    // Shutdown signal fans out to the game loop and the HTTP server
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let bots = BotScheduler::new(Box::new(DefaultBrain::new(config.seed)));
    let loop_handle = tokio::spawn(game_loop(
        world.clone(),
        hub.clone(),
        bots,
        shutdown_rx.clone(),
    ));

    let app = router(AppState {
        world: world.clone(),
        hub: hub.clone(),
    });
    let addr = std::net::SocketAddr::new(config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr} (ws endpoint at /ws)");

    let mut http_shutdown = shutdown_rx.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = http_shutdown.changed().await;
    });

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = loop_handle.await;
    info!("Server stopped");
    Ok(())
}

/// The timer task driving the simulation kernel at the fixed tick rate
async fn game_loop(
    world: Arc<World>,
    hub: Arc<Hub>,
    mut bots: BotScheduler,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_millis(timing::TICK_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut grid = PlayerGrid::default();

    info!("Game loop started at {} Hz", timing::TICK_RATE);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        // Kernel and snapshot run under one write-lock span; everything the
        // tick wants delivered goes out after the lock drops
        let (output, snapshot) = {
            let mut state = world.state.write();
            let output = tick::tick(&mut state, &mut grid, &mut bots);
            let snapshot = Snapshot::from_state(&state);
            (output, snapshot)
        };

        let victory = output.victory_declared;
        hub.flush(output.outbox);
        hub.send(Target::All, ServerMessage::Update(snapshot));

        if victory {
            let world = world.clone();
            let hub = hub.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(timing::VICTORY_RESET_SECS)).await;
                let mut outbox = Outbox::new();
                {
                    let mut state = world.state.write();
                    tournament::post_victory_reset(&mut state, &mut outbox);
                }
                hub.flush(outbox);
            });
        }
    }

    info!("Game loop stopped");
}
