use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shared delivery lifecycle, mirrored between the order and the matching
/// record inside the rider document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    PendingAssignment,
    Assigned,
    Accepted,
    Rejected,
    PickedUp,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::PendingAssignment => "pending_assignment",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::Accepted => "accepted",
            DeliveryStatus::Rejected => "rejected",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// No further transitions happen for this rider-order pairing.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Rejected | DeliveryStatus::Delivered | DeliveryStatus::Failed
        )
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rider-side mirror of one order's delivery lifecycle. Appended on
/// assignment, updated in place by every later transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub order: Uuid,
    pub status: DeliveryStatus,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_notes: Option<String>,
    pub delivery_proof: Option<String>,
}

impl DeliveryRecord {
    pub fn new(order: Uuid, assigned_at: DateTime<Utc>) -> Self {
        Self {
            order,
            status: DeliveryStatus::Assigned,
            assigned_at,
            accepted_at: None,
            rejected_at: None,
            rejection_reason: None,
            picked_up_at: None,
            delivered_at: None,
            delivery_notes: None,
            delivery_proof: None,
        }
    }
}

/// Broadcast payload published on every assignment and transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub order_id: Uuid,
    pub rider_id: Uuid,
    pub status: DeliveryStatus,
    pub occurred_at: DateTime<Utc>,
}
