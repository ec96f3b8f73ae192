use std::future::{ready, Ready};

use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::errors::AppError;

/// Caller identity for one request.
///
/// Token validation belongs to the auth collaborator; this only carries the
/// bearer token through to the use cases that need an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    token: String,
}

impl SessionContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Short, log-safe reference to the session.
    pub fn actor(&self) -> String {
        let prefix: String = self.token.chars().take(6).collect();
        format!("{}…", prefix)
    }

    fn from_header(value: &str) -> Option<Self> {
        let token = value.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            return None;
        }
        Some(Self::new(token))
    }
}

impl FromRequest for SessionContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(SessionContext::from_header);
        ready(session.ok_or(AppError::Unauthorized))
    }
}
