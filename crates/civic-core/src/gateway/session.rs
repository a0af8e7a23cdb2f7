use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::engagement::citizens::{Citizen, CitizenRegistry};

/// Caller identity resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub enum Session {
    Anonymous,
    Citizen(Citizen),
    Staff,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("missing or unknown session token")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(&'static str),
}

impl AccessError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl Session {
    pub fn require_citizen(&self) -> Result<&Citizen, AccessError> {
        match self {
            Session::Citizen(citizen) => Ok(citizen),
            Session::Staff => Err(AccessError::Forbidden(
                "staff sessions cannot act on behalf of a citizen",
            )),
            Session::Anonymous => Err(AccessError::Unauthenticated),
        }
    }

    pub fn require_staff(&self) -> Result<(), AccessError> {
        match self {
            Session::Staff => Ok(()),
            Session::Citizen(_) => Err(AccessError::Forbidden("staff session required")),
            Session::Anonymous => Err(AccessError::Unauthenticated),
        }
    }

    /// Label recorded in audit trails.
    pub fn actor(&self) -> String {
        match self {
            Session::Anonymous => "anonymous".to_string(),
            Session::Citizen(citizen) => citizen.id.0.clone(),
            Session::Staff => "staff".to_string(),
        }
    }
}

/// Resolves bearer tokens for every request passing through the gateway.
#[derive(Debug, Clone)]
pub struct Authenticator {
    registry: CitizenRegistry,
    staff_token: Option<Arc<str>>,
}

impl Authenticator {
    pub fn new(registry: CitizenRegistry, staff_token: Option<String>) -> Self {
        Self {
            registry,
            staff_token: staff_token.map(Arc::from),
        }
    }

    pub async fn resolve(&self, token: Option<&str>) -> Session {
        let Some(token) = token else {
            return Session::Anonymous;
        };

        if let Some(staff_token) = self.staff_token.as_deref() {
            if tokens_match(staff_token, token) {
                return Session::Staff;
            }
        }

        match self.registry.authenticate(token).await {
            Ok(Some(citizen)) => Session::Citizen(citizen),
            Ok(None) => Session::Anonymous,
            Err(err) => {
                warn!(error = %err, "session lookup failed; treating caller as anonymous");
                Session::Anonymous
            }
        }
    }
}

/// Byte comparison that does not stop at the first mismatch.
fn tokens_match(expected: &str, presented: &str) -> bool {
    let (expected, presented) = (expected.as_bytes(), presented.as_bytes());
    expected.len() == presented.len()
        && expected
            .iter()
            .zip(presented)
            .fold(0_u8, |diff, (left, right)| diff | (left ^ right))
            == 0
}

/// Auth scheme names are case-insensitive (RFC 9110).
fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

/// Middleware inserting the resolved [`Session`] into request extensions.
pub async fn resolve_session(
    State(authenticator): State<Authenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(&request).map(str::to_owned);
    let session = authenticator.resolve(token.as_deref()).await;
    request.extensions_mut().insert(session);
    next.run(request).await
}
