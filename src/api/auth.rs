use std::fmt;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// Role claims issued by the identity service. The engine trusts them as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Vendor,
    Delivery,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Delivery => "delivery",
            Role::Admin => "admin",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Option<Uuid>,
    pub role: Role,
    pub email: Option<String>,
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = match header_str(parts, "x-actor-role") {
            Some("customer") => Role::Customer,
            Some("vendor") => Role::Vendor,
            Some("delivery") => Role::Delivery,
            Some("admin") => Role::Admin,
            Some(other) => {
                return Err(AppError::Forbidden(format!("unknown actor role: {other}")));
            }
            None => return Err(AppError::Forbidden("missing actor role".to_string())),
        };

        let id = header_str(parts, "x-actor-id").and_then(|raw| raw.parse::<Uuid>().ok());
        let email = header_str(parts, "x-actor-email").map(str::to_string);

        Ok(Actor { id, role, email })
    }
}
