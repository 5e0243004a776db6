use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Closed set of caller roles supplied by the upstream identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    Rider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Rider => "rider",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "customer" => Some(Role::Customer),
            "vendor" => Some(Role::Vendor),
            "rider" => Some(Role::Rider),
            _ => None,
        }
    }
}

/// Authenticated caller identity. Session issuance lives outside this
/// service; the identity layer injects `x-user-id` and `x-user-role` and
/// the core trusts them as-is.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
}

impl Session {
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::NotAuthorized(format!(
                "requires {} role",
                role.as_str()
            )))
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.parse::<Uuid>().ok())
            .ok_or(AppError::NotAuthenticated)?;

        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|value| value.to_str().ok())
            .and_then(Role::parse)
            .ok_or(AppError::NotAuthenticated)?;

        Ok(Session { user_id, role })
    }
}
