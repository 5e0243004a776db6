use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::{DeliveryEvent, DeliveryRecord, DeliveryStatus};
use crate::state::AppState;

/// Link a rider to an order on behalf of a vendor.
///
/// Every precondition is checked before the first write; a failure leaves
/// both documents untouched. The writes themselves are two sequential,
/// independently committed entry mutations: the order first, then the
/// rider's delivery list. The pending/rejected guard runs inside the
/// exclusive order reference, so two racing assignment calls cannot both
/// pass it.
pub fn assign_rider_to_order(
    state: &AppState,
    vendor_id: Uuid,
    order_id: Uuid,
    rider_id: Uuid,
) -> Result<(), AppError> {
    let city = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if !order.vendor_owns_items(vendor_id) {
            return Err(AppError::NotAuthorized(
                "order has no items sold by this vendor".to_string(),
            ));
        }

        order.delivery_details.city.clone()
    };

    {
        let rider = state
            .riders
            .get(&rider_id)
            .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

        if !rider.is_available() {
            return Err(AppError::state_mismatch("available rider", rider.status));
        }

        if !rider.works_in_area(&city) {
            return Err(AppError::InvalidState(format!(
                "rider does not serve delivery area {city}"
            )));
        }
    }

    let now = Utc::now();

    {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        match order.delivery_status {
            DeliveryStatus::PendingAssignment | DeliveryStatus::Rejected => {}
            other => {
                return Err(AppError::state_mismatch(
                    "pending_assignment or rejected",
                    other,
                ));
            }
        }

        order.assigned_rider = Some(rider_id);
        order.rider_assignment_date = Some(now);
        order.delivery_status = DeliveryStatus::Assigned;
        // A fresh assignment after a rejection starts a clean pairing.
        order.rider_rejected_date = None;
        order.rider_rejection_reason = None;
        order.rider_accepted_date = None;
    }

    let mut rider = state
        .riders
        .get_mut(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;
    rider.deliveries.push(DeliveryRecord::new(order_id, now));
    rider.updated_at = now;
    drop(rider);

    state.metrics.active_deliveries.inc();
    state.publish(DeliveryEvent {
        order_id,
        rider_id,
        status: DeliveryStatus::Assigned,
        occurred_at: now,
    });

    info!(
        order_id = %order_id,
        rider_id = %rider_id,
        "rider assigned to order"
    );

    Ok(())
}
