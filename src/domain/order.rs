use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::pricing::{BasketLine, PriceReconciliation};
use super::status::{OrderStatus, PaymentStatus};

/// Customer details copied at checkout; later profile edits do not touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerSnapshot {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliverySchedule {
    pub preferred_day: String,
    pub preferred_time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInfo {
    pub method: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub date: DateTime<Utc>,
    pub completed: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusInfo {
    pub current: OrderStatus,
    pub timeline: Vec<TimelineEntry>,
}

/// Persisted order. Pricing and lines are fixed at checkout; only `status`
/// and `payment` change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub package_id: Uuid,
    pub customer: CustomerSnapshot,
    pub shipping_address: ShippingAddress,
    pub delivery: DeliverySchedule,
    pub lines: Vec<BasketLine>,
    pub pricing: PriceReconciliation,
    pub payment: PaymentInfo,
    pub status: StatusInfo,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub method: String,
    pub status: PaymentStatus,
    pub transaction_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Checkout input after the basket has been accepted.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub package_id: Uuid,
    pub customer: CustomerSnapshot,
    pub shipping_address: ShippingAddress,
    pub delivery: DeliverySchedule,
    pub lines: Vec<BasketLine>,
    pub payment_method: String,
    pub prepaid: bool,
}

/// Order and payment built at checkout, to be stored in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order: Order,
    pub payment: Payment,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Human-readable order number, e.g. `ORD-20261017-3F9A1C2B`.
pub fn order_number(id: Uuid, created_at: DateTime<Utc>) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("ORD-{}-{}", created_at.format("%Y%m%d"), &simple[..8])
}
