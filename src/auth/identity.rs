//! Caller identity, passed explicitly into every mutating operation.
//!
//! Authentication itself belongs to the upstream identity provider, which
//! forwards the resolved user in `X-User-Id` / `X-User-Name`. A request
//! without a usable id carries an unresolved context and every operation
//! that needs a caller fails with [`AppError::Unauthenticated`].

use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use serde::{Deserialize, Serialize};
use std::future::{Ready, ready};

use crate::errors::AppError;
use crate::store::is_valid_segment;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityContext(Option<Identity>);

impl IdentityContext {
    pub fn authenticated(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        IdentityContext(Some(Identity {
            id: id.into(),
            display_name: display_name.into(),
        }))
    }

    pub fn unresolved() -> Self {
        IdentityContext(None)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }

    pub fn require(&self) -> Result<&Identity, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthenticated)
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let Some(id) = header(USER_ID_HEADER) else {
            return IdentityContext::unresolved();
        };
        // Ids double as document path segments (one vote per voter).
        if !is_valid_segment(id) {
            log::warn!("Rejecting malformed user id header {id:?}");
            return IdentityContext::unresolved();
        }
        let display_name = header(USER_NAME_HEADER).unwrap_or(id);
        IdentityContext::authenticated(id, display_name)
    }
}

impl FromRequest for IdentityContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(IdentityContext::from_headers(req.headers())))
    }
}
