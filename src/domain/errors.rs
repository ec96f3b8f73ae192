use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order not found")]
    NotFound,
    #[error("Package not found: {0}")]
    PackageNotFound(Uuid),
    #[error("Invalid basket line #{index}: {reason}")]
    InvalidBasketLine { index: usize, reason: String },
    #[error("Basket is empty")]
    EmptyBasket,
    #[error("Unknown order status: '{0}'")]
    UnknownStatus(String),
    #[error("Unknown payment status: '{0}'")]
    UnknownPaymentStatus(String),
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Order is already {0}")]
    StatusUnchanged(String),
    #[error("Order {id} was modified concurrently (expected version {expected})")]
    StaleOrder { id: Uuid, expected: i32 },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
