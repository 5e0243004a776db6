use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery::DeliveryRecord;

/// Rider availability, toggled by the rider themselves. Independent of
/// `is_active`, the soft-disable flag. `Suspended` is set by back-office
/// tooling only, never through the self-service endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    Available,
    Busy,
    Offline,
    Suspended,
}

impl RiderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiderStatus::Available => "available",
            RiderStatus::Busy => "busy",
            RiderStatus::Offline => "offline",
            RiderStatus::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for RiderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub vehicle_type: String,
    pub registration_number: String,
    pub license_number: String,
    pub license_expiry: DateTime<Utc>,
    pub insurance_expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub account_name: String,
    pub account_number: String,
    pub bank_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

/// Daily working window plus the weekdays it applies to. `start`/`end` are
/// "HH:MM" strings, `days` lower-cased weekday names; both validated at
/// registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
    pub days: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    /// Owning user account, unique across riders.
    pub user_id: Uuid,
    pub vehicle_info: VehicleInfo,
    pub bank_account: Option<BankAccount>,
    pub emergency_contact: EmergencyContact,
    /// Lower-cased city names the rider delivers to. Never empty.
    pub service_areas: Vec<String>,
    pub working_hours: WorkingHours,
    pub status: RiderStatus,
    pub is_active: bool,
    pub rating: f64,
    pub total_deliveries: u64,
    pub successful_deliveries: u64,
    pub failed_deliveries: u64,
    pub earnings: f64,
    pub deliveries: Vec<DeliveryRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rider {
    pub fn is_available(&self) -> bool {
        self.is_active && self.status == RiderStatus::Available
    }

    pub fn works_in_area(&self, city: &str) -> bool {
        let city = city.trim().to_lowercase();
        self.service_areas.iter().any(|area| *area == city)
    }

    pub fn delivery_mut(&mut self, order_id: Uuid) -> Option<&mut DeliveryRecord> {
        self.deliveries
            .iter_mut()
            .find(|record| record.order == order_id)
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_deliveries == 0 {
            0.0
        } else {
            self.successful_deliveries as f64 / self.total_deliveries as f64
        }
    }
}
