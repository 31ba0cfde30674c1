use std::sync::Arc;

use sqlx::PgPool;

use crate::config;
use crate::db::repositories::{PgAvailabilityStore, PgBookingLedger};
use crate::scheduling::events::EventPublisher;
use crate::scheduling::service::SchedulingService;

pub type Scheduler = SchedulingService<PgBookingLedger, PgAvailabilityStore>;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub env: config::Config,
    pub scheduling: Arc<Scheduler>,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(
        db: PgPool,
        env: config::Config,
        scheduling: Arc<Scheduler>,
        events: EventPublisher,
    ) -> Self {
        Self {
            db,
            env,
            scheduling,
            events,
        }
    }
}
