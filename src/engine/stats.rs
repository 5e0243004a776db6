use crate::models::rider::Rider;
use crate::observability::metrics::Metrics;

/// Roll the rider's delivery counters for one terminal outcome and refresh
/// the derived success-rate gauge. The caller holds the exclusive entry
/// reference for this rider, which is what keeps two terminal transitions
/// for the same rider from losing an increment.
pub fn record_outcome(rider: &mut Rider, success: bool, metrics: &Metrics) {
    rider.total_deliveries += 1;
    if success {
        rider.successful_deliveries += 1;
    } else {
        rider.failed_deliveries += 1;
    }

    metrics
        .rider_success_rate
        .with_label_values(&[&rider.id.to_string()])
        .set(rider.success_rate());
}

#[cfg(test)]
mod tests {
    use super::record_outcome;
    use crate::engine::test_support::{insert_rider, state};

    #[test]
    fn counters_add_up_after_a_run_of_outcomes() {
        let state = state(false);
        let rider_id = insert_rider(&state, &["dhaka"]);
        let mut rider = state.riders.get_mut(&rider_id).unwrap();

        let outcomes = [true, true, false, true, false];
        for success in outcomes {
            record_outcome(&mut rider, success, &state.metrics);
        }

        assert_eq!(rider.total_deliveries, 5);
        assert_eq!(rider.successful_deliveries, 3);
        assert_eq!(rider.failed_deliveries, 2);
        assert_eq!(
            rider.total_deliveries,
            rider.successful_deliveries + rider.failed_deliveries
        );
        assert!((rider.success_rate() - 0.6).abs() < 1e-9);
    }
}
