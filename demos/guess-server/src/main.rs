use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wager::prelude::*;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const STARTING_BALANCE: i64 = 1000;
const DEMO_BET: i64 = 100;

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

/// Reads `WAGER_SEED`. Unset means an OS-seeded source.
fn random_from_env() -> Result<Arc<dyn RandomSource>, std::num::ParseIntError> {
    Ok(match std::env::var("WAGER_SEED") {
        Ok(seed) => Arc::new(SeededRandom::from_seed(seed.trim().parse()?)),
        Err(_) => Arc::new(SeededRandom::from_os_rng()),
    })
}

/// Opens two funded accounts and issues a token for each.
async fn seed_demo(
    store: &Store,
    tokens: &TokenRegistry,
) -> ((UserId, String), (UserId, String)) {
    let alice = store.open_account(STARTING_BALANCE);
    let bob = store.open_account(STARTING_BALANCE);
    let alice_token = tokens.issue(alice).await;
    let bob_token = tokens.issue(bob).await;
    ((alice, alice_token), (bob, bob_token))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind = std::env::var("WAGER_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let store = Arc::new(Store::new());
    let tokens = TokenRegistry::new();
    let ((alice, alice_token), (bob, bob_token)) = seed_demo(&store, &tokens).await;

    let server = WagerServerBuilder::new()
        .bind(&bind)
        .store(Arc::clone(&store))
        .random(random_from_env()?)
        .build(tokens)
        .await?;
    let addr = server.local_addr()?;
    let room = server.handle().create_room(DEMO_BET, alice).await?;

    tracing::info!(%addr, room_id = %room.id, bet = DEMO_BET, "demo room open");
    tracing::info!(
        user_id = %alice,
        url = %format!("ws://{addr}/ws/rooms/{}/?token={alice_token}", room.id.0),
        "player 1"
    );
    tracing::info!(
        user_id = %bob,
        url = %format!("ws://{addr}/ws/rooms/{}/?token={bob_token}", room.id.0),
        "player 2"
    );

    // Seat the second player right away so the demo is playable with
    // nothing but two WebSocket clients.
    let init = server.handle().join_room(room.id, bob).await?;
    tracing::info!(room_id = %room.id, turn = ?init.snapshot.turn, "demo room started");

    server.run().await?;
    Ok(())
}
