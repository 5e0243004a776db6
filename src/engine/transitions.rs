//! Guarded transitions a rider drives on their current assignment. Each one
//! writes the order document first, then mirrors onto the rider's delivery
//! record; the two writes commit independently (no lock spans both).

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::stats;
use crate::error::AppError;
use crate::models::delivery::{DeliveryEvent, DeliveryStatus};
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

fn ensure_assigned_to(order: &Order, rider_id: Uuid) -> Result<(), AppError> {
    if order.is_assigned_to(rider_id) {
        Ok(())
    } else {
        Err(AppError::NotAuthorized(
            "order is not assigned to this rider".to_string(),
        ))
    }
}

pub fn accept_order(state: &AppState, rider_user: Uuid, order_id: Uuid) -> Result<(), AppError> {
    let rider_id = state.rider_id_for_user(rider_user)?;
    let now = Utc::now();

    {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        ensure_assigned_to(&order, rider_id)?;

        if order.delivery_status != DeliveryStatus::Assigned {
            return Err(AppError::state_mismatch("assigned", order.delivery_status));
        }

        order.delivery_status = DeliveryStatus::Accepted;
        order.rider_accepted_date = Some(now);
    }

    if let Some(mut rider) = state.riders.get_mut(&rider_id) {
        match rider.delivery_mut(order_id) {
            Some(record) => {
                record.status = DeliveryStatus::Accepted;
                record.accepted_at = Some(now);
            }
            None => {
                warn!(order_id = %order_id, rider_id = %rider_id, "no delivery record to mirror accept");
            }
        }
        rider.updated_at = now;
    }

    state
        .metrics
        .delivery_transitions_total
        .with_label_values(&["accepted"])
        .inc();
    state.publish(DeliveryEvent {
        order_id,
        rider_id,
        status: DeliveryStatus::Accepted,
        occurred_at: now,
    });

    info!(order_id = %order_id, rider_id = %rider_id, "delivery accepted");
    Ok(())
}

/// Rejection is terminal for this rider-order pairing and clears the
/// assignment, returning the order to an assignable state for a different
/// rider.
pub fn reject_order(
    state: &AppState,
    rider_user: Uuid,
    order_id: Uuid,
    reason: &str,
) -> Result<(), AppError> {
    let rider_id = state.rider_id_for_user(rider_user)?;
    let now = Utc::now();

    {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        ensure_assigned_to(&order, rider_id)?;

        if order.delivery_status != DeliveryStatus::Assigned {
            return Err(AppError::state_mismatch("assigned", order.delivery_status));
        }

        order.delivery_status = DeliveryStatus::Rejected;
        order.rider_rejected_date = Some(now);
        order.rider_rejection_reason = Some(reason.to_string());
        order.assigned_rider = None;
    }

    if let Some(mut rider) = state.riders.get_mut(&rider_id) {
        match rider.delivery_mut(order_id) {
            Some(record) => {
                record.status = DeliveryStatus::Rejected;
                record.rejected_at = Some(now);
                record.rejection_reason = Some(reason.to_string());
            }
            None => {
                warn!(order_id = %order_id, rider_id = %rider_id, "no delivery record to mirror reject");
            }
        }
        rider.updated_at = now;
    }

    state
        .metrics
        .delivery_transitions_total
        .with_label_values(&["rejected"])
        .inc();
    state.metrics.active_deliveries.dec();
    state.publish(DeliveryEvent {
        order_id,
        rider_id,
        status: DeliveryStatus::Rejected,
        occurred_at: now,
    });

    info!(order_id = %order_id, rider_id = %rider_id, reason = %reason, "delivery rejected");
    Ok(())
}

/// Progress report from the rider: picked_up, delivered or failed. Only
/// ownership is guarded by default; with strict transitions enabled the
/// accepted -> picked_up -> delivered/failed order is enforced as well.
/// A terminal status is final either way.
pub fn update_delivery_status(
    state: &AppState,
    rider_user: Uuid,
    order_id: Uuid,
    target: DeliveryStatus,
    notes: Option<String>,
    proof: Option<String>,
) -> Result<(), AppError> {
    match target {
        DeliveryStatus::PickedUp | DeliveryStatus::Delivered | DeliveryStatus::Failed => {}
        other => {
            return Err(AppError::Validation(format!(
                "unsupported delivery status update: {other}"
            )));
        }
    }

    let rider_id = state.rider_id_for_user(rider_user)?;
    let now = Utc::now();

    {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        ensure_assigned_to(&order, rider_id)?;

        if order.delivery_status.is_terminal() {
            return Err(AppError::state_mismatch(
                "a non-terminal state",
                order.delivery_status,
            ));
        }

        if state.strict_transitions {
            let expected = match target {
                DeliveryStatus::PickedUp => DeliveryStatus::Accepted,
                _ => DeliveryStatus::PickedUp,
            };
            if order.delivery_status != expected {
                return Err(AppError::state_mismatch(
                    expected.as_str(),
                    order.delivery_status,
                ));
            }
        }

        order.delivery_status = target;
        if let Some(notes) = &notes {
            order.delivery_notes = Some(notes.clone());
        }
        if let Some(proof) = &proof {
            order.delivery_proof = Some(proof.clone());
        }

        if target == DeliveryStatus::Delivered {
            order.status = OrderStatus::Delivered;
            order.is_delivered = true;
            order.actual_delivery_date = Some(now);
        }
    }

    if let Some(mut rider) = state.riders.get_mut(&rider_id) {
        match rider.delivery_mut(order_id) {
            Some(record) => {
                record.status = target;
                match target {
                    DeliveryStatus::PickedUp => record.picked_up_at = Some(now),
                    DeliveryStatus::Delivered => record.delivered_at = Some(now),
                    _ => {}
                }
                if let Some(notes) = &notes {
                    record.delivery_notes = Some(notes.clone());
                }
                if let Some(proof) = &proof {
                    record.delivery_proof = Some(proof.clone());
                }
            }
            None => {
                warn!(order_id = %order_id, rider_id = %rider_id, "no delivery record to mirror status update");
            }
        }

        // Terminal outcome: roll the counters while the entry lock is still
        // held, so concurrent terminal transitions for this rider serialize.
        if target.is_terminal() {
            stats::record_outcome(
                &mut rider,
                target == DeliveryStatus::Delivered,
                &state.metrics,
            );
        }
        rider.updated_at = now;
    }

    state
        .metrics
        .delivery_transitions_total
        .with_label_values(&[target.as_str()])
        .inc();
    if target.is_terminal() {
        state.metrics.active_deliveries.dec();
    }
    state.publish(DeliveryEvent {
        order_id,
        rider_id,
        status: target,
        occurred_at: now,
    });

    info!(order_id = %order_id, rider_id = %rider_id, status = %target, "delivery status updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{accept_order, reject_order, update_delivery_status};
    use crate::engine::assignment::assign_rider_to_order;
    use crate::engine::test_support::{insert_order, insert_rider, rider_user, state};
    use crate::error::AppError;
    use crate::models::delivery::DeliveryStatus;
    use crate::models::order::OrderStatus;
    use crate::state::AppState;

    fn assigned(state: &AppState) -> (Uuid, Uuid, Uuid) {
        let vendor = Uuid::new_v4();
        let rider_id = insert_rider(state, &["dhaka"]);
        let order_id = insert_order(state, vendor, "Dhaka");
        assign_rider_to_order(state, vendor, order_id, rider_id).unwrap();
        (vendor, rider_id, order_id)
    }

    #[test]
    fn accept_mirrors_state_onto_both_documents() {
        let state = state(false);
        let (_, rider_id, order_id) = assigned(&state);

        accept_order(&state, rider_user(&state, rider_id), order_id).unwrap();

        let order = state.orders.get(&order_id).unwrap();
        assert_eq!(order.delivery_status, DeliveryStatus::Accepted);
        assert!(order.rider_accepted_date.is_some());
        drop(order);

        let rider = state.riders.get(&rider_id).unwrap();
        let record = &rider.deliveries[0];
        assert_eq!(record.status, DeliveryStatus::Accepted);
        assert!(record.accepted_at.is_some());
    }

    #[test]
    fn accept_twice_is_a_state_error() {
        let state = state(false);
        let (_, rider_id, order_id) = assigned(&state);
        let user = rider_user(&state, rider_id);

        accept_order(&state, user, order_id).unwrap();
        let err = accept_order(&state, user, order_id).unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn accept_by_another_rider_is_not_authorized() {
        let state = state(false);
        let (_, _, order_id) = assigned(&state);
        let stranger = insert_rider(&state, &["dhaka"]);

        let err = accept_order(&state, rider_user(&state, stranger), order_id).unwrap_err();

        assert!(matches!(err, AppError::NotAuthorized(_)));
    }

    #[test]
    fn user_without_rider_profile_is_not_found() {
        let state = state(false);
        let (_, _, order_id) = assigned(&state);

        let err = accept_order(&state, Uuid::new_v4(), order_id).unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn reject_clears_assignment_and_frees_the_order() {
        let state = state(false);
        let (vendor, rider_id, order_id) = assigned(&state);

        reject_order(&state, rider_user(&state, rider_id), order_id, "too far").unwrap();

        {
            let order = state.orders.get(&order_id).unwrap();
            assert_eq!(order.delivery_status, DeliveryStatus::Rejected);
            assert_eq!(order.assigned_rider, None);
            assert_eq!(order.rider_rejection_reason.as_deref(), Some("too far"));
        }
        {
            let rider = state.riders.get(&rider_id).unwrap();
            let record = &rider.deliveries[0];
            assert_eq!(record.status, DeliveryStatus::Rejected);
            assert_eq!(record.rejection_reason.as_deref(), Some("too far"));
            // rejection is not a delivery outcome
            assert_eq!(rider.total_deliveries, 0);
        }

        // a different rider can now take the order
        let second = insert_rider(&state, &["dhaka"]);
        assign_rider_to_order(&state, vendor, order_id, second).unwrap();
        assert_eq!(
            state.orders.get(&order_id).unwrap().assigned_rider,
            Some(second)
        );

        // the original rider lost all authority over it
        let err = accept_order(&state, rider_user(&state, rider_id), order_id).unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized(_)));
    }

    #[test]
    fn lenient_mode_allows_delivered_straight_from_assigned() {
        let state = state(false);
        let (_, rider_id, order_id) = assigned(&state);

        update_delivery_status(
            &state,
            rider_user(&state, rider_id),
            order_id,
            DeliveryStatus::Delivered,
            Some("left at the reception".to_string()),
            Some("https://cdn.example/proof.jpg".to_string()),
        )
        .unwrap();

        let order = state.orders.get(&order_id).unwrap();
        assert_eq!(order.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.is_delivered);
        assert!(order.actual_delivery_date.is_some());
        assert_eq!(
            order.delivery_notes.as_deref(),
            Some("left at the reception")
        );
        drop(order);

        let rider = state.riders.get(&rider_id).unwrap();
        let record = &rider.deliveries[0];
        assert_eq!(record.status, DeliveryStatus::Delivered);
        assert_eq!(
            record.delivery_proof.as_deref(),
            Some("https://cdn.example/proof.jpg")
        );
        assert_eq!(rider.total_deliveries, 1);
        assert_eq!(rider.successful_deliveries, 1);
    }

    #[test]
    fn strict_mode_requires_accept_before_pickup() {
        let state = state(true);
        let (_, rider_id, order_id) = assigned(&state);
        let user = rider_user(&state, rider_id);

        let err = update_delivery_status(
            &state,
            user,
            order_id,
            DeliveryStatus::PickedUp,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        accept_order(&state, user, order_id).unwrap();
        update_delivery_status(&state, user, order_id, DeliveryStatus::PickedUp, None, None)
            .unwrap();
    }

    #[test]
    fn strict_mode_requires_pickup_before_delivered() {
        let state = state(true);
        let (_, rider_id, order_id) = assigned(&state);
        let user = rider_user(&state, rider_id);

        accept_order(&state, user, order_id).unwrap();
        let err = update_delivery_status(
            &state,
            user,
            order_id,
            DeliveryStatus::Delivered,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn terminal_states_are_final() {
        let state = state(false);
        let (_, rider_id, order_id) = assigned(&state);
        let user = rider_user(&state, rider_id);

        update_delivery_status(&state, user, order_id, DeliveryStatus::Failed, None, None)
            .unwrap();

        let err = update_delivery_status(
            &state,
            user,
            order_id,
            DeliveryStatus::Delivered,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let rider = state.riders.get(&rider_id).unwrap();
        assert_eq!(rider.total_deliveries, 1);
        assert_eq!(rider.failed_deliveries, 1);
    }

    #[test]
    fn update_status_rejects_non_progress_targets() {
        let state = state(false);
        let (_, rider_id, order_id) = assigned(&state);

        let err = update_delivery_status(
            &state,
            rider_user(&state, rider_id),
            order_id,
            DeliveryStatus::Accepted,
            None,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn full_lifecycle_keeps_documents_mirrored() {
        let state = state(false);
        let (_, rider_id, order_id) = assigned(&state);
        let user = rider_user(&state, rider_id);

        accept_order(&state, user, order_id).unwrap();
        for target in [DeliveryStatus::PickedUp, DeliveryStatus::Delivered] {
            update_delivery_status(&state, user, order_id, target, None, None).unwrap();

            let order_status = state.orders.get(&order_id).unwrap().delivery_status;
            let record_status = state
                .riders
                .get(&rider_id)
                .unwrap()
                .deliveries[0]
                .status;
            assert_eq!(order_status, target);
            assert_eq!(record_status, target);
        }
    }
}
