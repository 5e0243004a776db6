use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::models::delivery::DeliveryStatus;
use crate::models::order::{DeliveryDetails, LineItem, Order, OrderStatus};
use crate::models::rider::{
    EmergencyContact, Rider, RiderStatus, VehicleInfo, WorkingHours,
};
use crate::state::AppState;

pub fn state(strict_transitions: bool) -> AppState {
    AppState::new(16, strict_transitions)
}

pub fn insert_rider(state: &AppState, areas: &[&str]) -> Uuid {
    let now = Utc::now();
    let rider = Rider {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
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
            phone: "+8801000000000".to_string(),
            relationship: "sibling".to_string(),
        },
        service_areas: areas.iter().map(|a| a.to_lowercase()).collect(),
        working_hours: WorkingHours {
            start: "09:00".to_string(),
            end: "21:00".to_string(),
            days: vec!["monday".to_string(), "friday".to_string()],
        },
        status: RiderStatus::Available,
        is_active: true,
        rating: 5.0,
        total_deliveries: 0,
        successful_deliveries: 0,
        failed_deliveries: 0,
        earnings: 0.0,
        deliveries: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let id = rider.id;
    state.riders_by_user.insert(rider.user_id, id);
    state.riders.insert(id, rider);
    id
}

pub fn rider_user(state: &AppState, rider_id: Uuid) -> Uuid {
    state.riders.get(&rider_id).unwrap().user_id
}

pub fn insert_order(state: &AppState, vendor_id: Uuid, city: &str) -> Uuid {
    let order = Order {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        items: vec![LineItem {
            product_id: Uuid::new_v4(),
            vendor_id,
            name: "item".to_string(),
            quantity: 2,
            unit_price: 250.0,
        }],
        subtotal: 500.0,
        discount: 0.0,
        total: 500.0,
        paid: 0.0,
        due: 500.0,
        delivery_details: DeliveryDetails {
            address: "12 Road, Block C".to_string(),
            city: city.to_string(),
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
    };

    let id = order.id;
    state.orders.insert(id, order);
    id
}
