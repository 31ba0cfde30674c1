use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;

use barberbook_backend::app;
use barberbook_backend::app_state::AppState;
use barberbook_backend::config;
use barberbook_backend::db;
use barberbook_backend::db::repositories::{PgAvailabilityStore, PgBookingLedger};
use barberbook_backend::scheduling::conflict::ConflictResolver;
use barberbook_backend::scheduling::events::EventPublisher;
use barberbook_backend::scheduling::service::SchedulingService;
use barberbook_backend::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let env = config::init()?.clone();

    let telemetry = telemetry::init_telemetry(None).await?;

    let db = db::init_pool()
        .await
        .context("Failed to initialize database pool")?;

    let events = EventPublisher::new(env.scheduling.event_capacity);
    let resolver = ConflictResolver::with_buffers(
        env.scheduling.pre_buffer_minutes,
        env.scheduling.post_buffer_minutes,
    );
    let scheduling = SchedulingService::new(
        PgBookingLedger::new(db.clone()),
        PgAvailabilityStore::new(db.clone()),
        resolver,
        events.clone(),
    )
    .with_slot_increment(env.scheduling.slot_increment_minutes);

    let state = AppState::new(db, env.clone(), Arc::new(scheduling), events);
    let app = app::create_router(state);

    let addr = env.server_addr();
    info!("{} listening on {}", env.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application")?;

    telemetry.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
