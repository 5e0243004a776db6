use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::DeliveryEvent;
use crate::models::order::Order;
use crate::models::rider::Rider;
use crate::observability::metrics::Metrics;

/// The two independently owned document collections plus the event fan-out.
/// No lock ever spans both collections; each entry is mutated through its
/// own exclusive dashmap reference.
pub struct AppState {
    pub riders: DashMap<Uuid, Rider>,
    /// Unique index enforcing one rider profile per user account.
    pub riders_by_user: DashMap<Uuid, Uuid>,
    pub orders: DashMap<Uuid, Order>,
    pub delivery_events_tx: broadcast::Sender<DeliveryEvent>,
    pub strict_transitions: bool,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, strict_transitions: bool) -> Self {
        let (delivery_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            riders: DashMap::new(),
            riders_by_user: DashMap::new(),
            orders: DashMap::new(),
            delivery_events_tx,
            strict_transitions,
            metrics: Metrics::new(),
        }
    }

    /// Resolve the rider profile owned by an authenticated user.
    pub fn rider_id_for_user(&self, user_id: Uuid) -> Result<Uuid, AppError> {
        self.riders_by_user
            .get(&user_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| AppError::NotFound("no rider profile for this account".to_string()))
    }

    pub fn publish(&self, event: DeliveryEvent) {
        // Nobody listening is fine; the stream is observational only.
        let _ = self.delivery_events_tx.send(event);
    }
}
