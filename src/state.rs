use std::sync::Arc;

use crate::bus::EventBus;
use crate::catalog::CatalogReader;
use crate::config::BookingSettings;
use crate::db::{DbPool, OrmConn};
use crate::subscription::SubscriptionGate;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub catalog: CatalogReader,
    pub gate: Arc<dyn SubscriptionGate>,
    pub bus: EventBus,
    pub settings: BookingSettings,
}
