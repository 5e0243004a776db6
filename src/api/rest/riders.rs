use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveTime, Utc};
use dashmap::mapref::entry::Entry;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Role, Session};
use crate::engine::eligibility::eligible_riders;
use crate::error::AppError;
use crate::models::order::Order;
use crate::models::rider::{
    BankAccount, EmergencyContact, Rider, RiderStatus, VehicleInfo, WorkingHours,
};
use crate::state::AppState;

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(register_rider).get(list_eligible_riders))
        .route("/riders/me/status", patch(update_rider_status))
        .route("/riders/me/orders", get(assigned_orders))
        .route("/riders/me/deliveries", get(delivery_history))
}

#[derive(Deserialize)]
pub struct RegisterRiderRequest {
    pub vehicle_info: VehicleInfo,
    pub bank_account: Option<BankAccount>,
    pub emergency_contact: EmergencyContact,
    pub service_areas: Vec<String>,
    pub working_hours: WorkingHours,
}

#[derive(Deserialize)]
pub struct EligibleRidersQuery {
    pub city: Option<String>,
    pub status: Option<RiderStatus>,
}

#[derive(Deserialize)]
pub struct UpdateRiderStatusRequest {
    pub status: RiderStatus,
}

async fn register_rider(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<RegisterRiderRequest>,
) -> Result<Json<Rider>, AppError> {
    session.require(Role::Rider)?;

    let now = Utc::now();

    if payload.vehicle_info.vehicle_type.trim().is_empty()
        || payload.vehicle_info.registration_number.trim().is_empty()
        || payload.vehicle_info.license_number.trim().is_empty()
    {
        return Err(AppError::Validation(
            "vehicle type, registration and license number are required".to_string(),
        ));
    }

    if payload.vehicle_info.license_expiry <= now {
        return Err(AppError::Validation(
            "license expiry must be in the future".to_string(),
        ));
    }

    if payload.vehicle_info.insurance_expiry <= now {
        return Err(AppError::Validation(
            "insurance expiry must be in the future".to_string(),
        ));
    }

    if payload.emergency_contact.name.trim().is_empty()
        || payload.emergency_contact.phone.trim().is_empty()
    {
        return Err(AppError::Validation(
            "emergency contact name and phone are required".to_string(),
        ));
    }

    let mut service_areas: Vec<String> = payload
        .service_areas
        .iter()
        .map(|area| area.trim().to_lowercase())
        .filter(|area| !area.is_empty())
        .collect();
    service_areas.sort();
    service_areas.dedup();

    if service_areas.is_empty() {
        return Err(AppError::Validation(
            "at least one service area is required".to_string(),
        ));
    }

    let working_hours = validate_working_hours(&payload.working_hours)?;

    let rider = Rider {
        id: Uuid::new_v4(),
        user_id: session.user_id,
        vehicle_info: payload.vehicle_info,
        bank_account: payload.bank_account,
        emergency_contact: payload.emergency_contact,
        service_areas,
        working_hours,
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

    // The unique index decides the winner if the same account registers
    // twice concurrently.
    match state.riders_by_user.entry(session.user_id) {
        Entry::Occupied(_) => {
            return Err(AppError::Validation(
                "a rider profile already exists for this account".to_string(),
            ));
        }
        Entry::Vacant(slot) => {
            slot.insert(rider.id);
        }
    }
    state.riders.insert(rider.id, rider.clone());

    Ok(Json(rider))
}

fn validate_working_hours(hours: &WorkingHours) -> Result<WorkingHours, AppError> {
    for raw in [&hours.start, &hours.end] {
        NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| {
            AppError::Validation(format!("working hours must be HH:MM, got {raw}"))
        })?;
    }

    let mut days: Vec<String> = hours
        .days
        .iter()
        .map(|day| day.trim().to_lowercase())
        .filter(|day| !day.is_empty())
        .collect();
    days.dedup();

    if days.is_empty() {
        return Err(AppError::Validation(
            "at least one working day is required".to_string(),
        ));
    }

    for day in &days {
        if !WEEKDAYS.contains(&day.as_str()) {
            return Err(AppError::Validation(format!("unknown weekday: {day}")));
        }
    }

    Ok(WorkingHours {
        start: hours.start.clone(),
        end: hours.end.clone(),
        days,
    })
}

/// Public read used by the vendor UI to pick a rider for a delivery area.
/// "No riders available for city X" is an empty list, not an error.
async fn list_eligible_riders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EligibleRidersQuery>,
) -> Json<Vec<Rider>> {
    let status = query.status.unwrap_or(RiderStatus::Available);
    Json(eligible_riders(&state, query.city.as_deref(), status))
}

/// Self-service availability toggle, independent of any in-flight delivery.
async fn update_rider_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<UpdateRiderStatusRequest>,
) -> Result<Json<Rider>, AppError> {
    session.require(Role::Rider)?;

    if payload.status == RiderStatus::Suspended {
        return Err(AppError::Validation(
            "suspension is not self-service".to_string(),
        ));
    }

    let rider_id = state.rider_id_for_user(session.user_id)?;
    let mut rider = state
        .riders
        .get_mut(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

    if rider.status == RiderStatus::Suspended {
        return Err(AppError::NotAuthorized(
            "suspended riders cannot change availability".to_string(),
        ));
    }

    rider.status = payload.status;
    rider.updated_at = Utc::now();

    Ok(Json(rider.clone()))
}

/// The rider's current workload: own assignments not yet in a terminal
/// state.
async fn assigned_orders(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Vec<Order>>, AppError> {
    session.require(Role::Rider)?;
    let rider_id = state.rider_id_for_user(session.user_id)?;

    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter_map(|entry| {
            let order = entry.value();
            if order.is_assigned_to(rider_id) && !order.delivery_status.is_terminal() {
                Some(order.clone())
            } else {
                None
            }
        })
        .collect();
    orders.sort_by(|a, b| b.rider_assignment_date.cmp(&a.rider_assignment_date));

    Ok(Json(orders))
}

/// Every order this rider was ever paired with, most recent first.
async fn delivery_history(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Vec<Order>>, AppError> {
    session.require(Role::Rider)?;
    let rider_id = state.rider_id_for_user(session.user_id)?;

    let rider = state
        .riders
        .get(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

    let orders: Vec<Order> = rider
        .deliveries
        .iter()
        .rev()
        .filter_map(|record| {
            state
                .orders
                .get(&record.order)
                .map(|entry| entry.value().clone())
        })
        .collect();

    Ok(Json(orders))
}
