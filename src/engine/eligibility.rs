use crate::models::rider::{Rider, RiderStatus};
use crate::state::AppState;

/// Riders able to take a delivery for `city`: active, in the requested
/// status, and declaring the city as a service area (case-insensitive).
/// Ranked best-first by rating, ties broken by successful deliveries. An
/// empty result is a valid answer, not an error.
pub fn eligible_riders(state: &AppState, city: Option<&str>, status: RiderStatus) -> Vec<Rider> {
    let city = city.map(|c| c.trim().to_lowercase());

    let mut riders: Vec<Rider> = state
        .riders
        .iter()
        .filter_map(|entry| {
            let rider = entry.value();
            let serves_city = city
                .as_deref()
                .map_or(true, |c| rider.service_areas.iter().any(|area| area == c));

            if rider.is_active && rider.status == status && serves_city {
                Some(rider.clone())
            } else {
                None
            }
        })
        .collect();

    riders.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then_with(|| b.successful_deliveries.cmp(&a.successful_deliveries))
    });

    riders
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::eligible_riders;
    use crate::models::rider::{
        EmergencyContact, Rider, RiderStatus, VehicleInfo, WorkingHours,
    };
    use crate::state::AppState;

    fn rider(id_seed: u128, areas: &[&str], rating: f64, successful: u64) -> Rider {
        let now = Utc::now();
        Rider {
            id: Uuid::from_u128(id_seed),
            user_id: Uuid::from_u128(id_seed + 1000),
            vehicle_info: VehicleInfo {
                vehicle_type: "motorbike".to_string(),
                registration_number: "DH-1234".to_string(),
                license_number: "L-5678".to_string(),
                license_expiry: now + Duration::days(365),
                insurance_expiry: now + Duration::days(365),
            },
            bank_account: None,
            emergency_contact: EmergencyContact {
                name: "contact".to_string(),
                phone: "+880".to_string(),
                relationship: "sibling".to_string(),
            },
            service_areas: areas.iter().map(|a| a.to_string()).collect(),
            working_hours: WorkingHours {
                start: "09:00".to_string(),
                end: "21:00".to_string(),
                days: vec!["monday".to_string()],
            },
            status: RiderStatus::Available,
            is_active: true,
            rating,
            total_deliveries: successful,
            successful_deliveries: successful,
            failed_deliveries: 0,
            earnings: 0.0,
            deliveries: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn insert(state: &AppState, rider: Rider) {
        state.riders_by_user.insert(rider.user_id, rider.id);
        state.riders.insert(rider.id, rider);
    }

    #[test]
    fn filters_by_city_case_insensitively() {
        let state = AppState::new(16, false);
        insert(&state, rider(1, &["dhaka"], 4.0, 0));
        insert(&state, rider(2, &["chittagong"], 4.0, 0));

        let result = eligible_riders(&state, Some("Dhaka"), RiderStatus::Available);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, Uuid::from_u128(1));
    }

    #[test]
    fn excludes_inactive_and_non_matching_status() {
        let state = AppState::new(16, false);

        let mut offline = rider(1, &["dhaka"], 4.0, 0);
        offline.status = RiderStatus::Offline;
        insert(&state, offline);

        let mut inactive = rider(2, &["dhaka"], 4.0, 0);
        inactive.is_active = false;
        insert(&state, inactive);

        let mut suspended = rider(3, &["dhaka"], 4.0, 0);
        suspended.status = RiderStatus::Suspended;
        insert(&state, suspended);

        assert!(eligible_riders(&state, Some("dhaka"), RiderStatus::Available).is_empty());
    }

    #[test]
    fn ranks_by_rating_then_successful_deliveries() {
        let state = AppState::new(16, false);
        insert(&state, rider(1, &["dhaka"], 4.2, 10));
        insert(&state, rider(2, &["dhaka"], 4.8, 3));
        insert(&state, rider(3, &["dhaka"], 4.2, 25));

        let result = eligible_riders(&state, Some("dhaka"), RiderStatus::Available);

        let ids: Vec<Uuid> = result.iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                Uuid::from_u128(2),
                Uuid::from_u128(3),
                Uuid::from_u128(1)
            ]
        );
    }

    #[test]
    fn no_city_filter_returns_all_available() {
        let state = AppState::new(16, false);
        insert(&state, rider(1, &["dhaka"], 4.0, 0));
        insert(&state, rider(2, &["sylhet"], 4.5, 0));

        let result = eligible_riders(&state, None, RiderStatus::Available);
        assert_eq!(result.len(), 2);
    }
}
