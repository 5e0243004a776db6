use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery::DeliveryStatus;

/// Coarse customer-facing commerce lifecycle, distinct from delivery
/// tracking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    /// Vendor who sells this product; orders may mix vendors.
    pub vendor_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub city: String,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub paid: f64,
    pub due: f64,
    pub delivery_details: DeliveryDetails,
    pub status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub assigned_rider: Option<Uuid>,
    pub rider_assignment_date: Option<DateTime<Utc>>,
    pub rider_accepted_date: Option<DateTime<Utc>>,
    pub rider_rejected_date: Option<DateTime<Utc>>,
    pub rider_rejection_reason: Option<String>,
    pub delivery_notes: Option<String>,
    pub delivery_proof: Option<String>,
    pub is_delivered: bool,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// A vendor may act on an order only if at least one line item is theirs.
    pub fn vendor_owns_items(&self, vendor_id: Uuid) -> bool {
        self.items.iter().any(|item| item.vendor_id == vendor_id)
    }

    pub fn is_assigned_to(&self, rider_id: Uuid) -> bool {
        self.assigned_rider == Some(rider_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{DeliveryDetails, LineItem, Order, OrderStatus};
    use crate::models::delivery::DeliveryStatus;

    fn order_with_vendors(vendors: &[Uuid]) -> Order {
        let items = vendors
            .iter()
            .map(|vendor_id| LineItem {
                product_id: Uuid::new_v4(),
                vendor_id: *vendor_id,
                name: "item".to_string(),
                quantity: 1,
                unit_price: 100.0,
            })
            .collect();

        Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            items,
            subtotal: 100.0,
            discount: 0.0,
            total: 100.0,
            paid: 0.0,
            due: 100.0,
            delivery_details: DeliveryDetails {
                address: "12 Road".to_string(),
                city: "Dhaka".to_string(),
                contact_phone: None,
            },
            status: OrderStatus::Pending,
            delivery_status: DeliveryStatus::PendingAssignment,
            assigned_rider: None,
            rider_assignment_date: None,
            rider_accepted_date: None,
            rider_rejected_date: None,
            rider_rejection_reason: None,
            delivery_notes: None,
            delivery_proof: None,
            is_delivered: false,
            actual_delivery_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn vendor_ownership_checks_any_line_item() {
        let ours = Uuid::new_v4();
        let theirs = Uuid::new_v4();

        let mixed = order_with_vendors(&[theirs, ours]);
        assert!(mixed.vendor_owns_items(ours));
        assert!(mixed.vendor_owns_items(theirs));
        assert!(!mixed.vendor_owns_items(Uuid::new_v4()));
    }
}
