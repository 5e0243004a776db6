use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{Role, Session};
use crate::engine::{assignment, transitions};
use crate::error::AppError;
use crate::models::delivery::DeliveryStatus;
use crate::models::order::{DeliveryDetails, LineItem, Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/assign", post(assign_rider))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/reject", post(reject_order))
        .route("/orders/:id/delivery-status", post(update_delivery_status))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineItem>,
    pub delivery_details: DeliveryDetails,
    pub discount: Option<f64>,
    pub paid: Option<f64>,
}

#[derive(Deserialize)]
pub struct AssignRiderRequest {
    pub rider_id: Uuid,
}

#[derive(Deserialize)]
pub struct RejectOrderRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct UpdateDeliveryStatusRequest {
    pub status: DeliveryStatus,
    pub notes: Option<String>,
    pub proof: Option<String>,
}

/// Checkout boundary: the surrounding cart/payment flow lands here with the
/// final line items. The order enters the delivery lifecycle unassigned.
async fn create_order(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    session.require(Role::Customer)?;

    if payload.items.is_empty() {
        return Err(AppError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }

    for item in &payload.items {
        if item.name.trim().is_empty() {
            return Err(AppError::Validation("item name is required".to_string()));
        }
        if item.quantity == 0 {
            return Err(AppError::Validation(format!(
                "item {} has zero quantity",
                item.name
            )));
        }
        if item.unit_price < 0.0 {
            return Err(AppError::Validation(format!(
                "item {} has a negative price",
                item.name
            )));
        }
    }

    if payload.delivery_details.address.trim().is_empty()
        || payload.delivery_details.city.trim().is_empty()
    {
        return Err(AppError::Validation(
            "delivery address and city are required".to_string(),
        ));
    }

    let subtotal: f64 = payload
        .items
        .iter()
        .map(|item| item.unit_price * f64::from(item.quantity))
        .sum();
    let discount = payload.discount.unwrap_or(0.0);
    let paid = payload.paid.unwrap_or(0.0);

    if discount < 0.0 || discount > subtotal {
        return Err(AppError::Validation(
            "discount must be between zero and the subtotal".to_string(),
        ));
    }

    let total = subtotal - discount;
    if paid < 0.0 || paid > total {
        return Err(AppError::Validation(
            "paid amount must be between zero and the total".to_string(),
        ));
    }

    let order = Order {
        id: Uuid::new_v4(),
        customer_id: session.user_id,
        items: payload.items,
        subtotal,
        discount,
        total,
        paid,
        due: total - paid,
        delivery_details: payload.delivery_details,
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

    state.orders.insert(order.id, order.clone());
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order.value().clone()))
}

async fn assign_rider(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AssignRiderRequest>,
) -> Result<Json<Value>, AppError> {
    session.require(Role::Vendor)?;

    let start = Instant::now();
    let result =
        assignment::assign_rider_to_order(&state, session.user_id, order_id, payload.rider_id);

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();

    result?;
    Ok(Json(json!({ "success": true })))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    session.require(Role::Rider)?;
    transitions::accept_order(&state, session.user_id, order_id)?;
    Ok(Json(json!({ "success": true })))
}

async fn reject_order(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<RejectOrderRequest>,
) -> Result<Json<Value>, AppError> {
    session.require(Role::Rider)?;

    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "rejection reason is required".to_string(),
        ));
    }

    transitions::reject_order(&state, session.user_id, order_id, reason)?;
    Ok(Json(json!({ "success": true })))
}

async fn update_delivery_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> Result<Json<Value>, AppError> {
    session.require(Role::Rider)?;
    transitions::update_delivery_status(
        &state,
        session.user_id,
        order_id,
        payload.status,
        payload.notes,
        payload.proof,
    )?;
    Ok(Json(json!({ "success": true })))
}
