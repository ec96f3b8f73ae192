use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{
    order_lines, order_outbox, order_timeline, orders, package_items, packages, payments,
};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PackageRow {
    pub id: Uuid,
    pub name: String,
    pub base_price: BigDecimal,
    pub value_price: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = package_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PackageItemRow {
    pub id: Uuid,
    pub package_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub unit: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub package_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub shipping_instructions: Option<String>,
    pub delivery_day: String,
    pub delivery_time: String,
    pub items_total_value: BigDecimal,
    pub package_base_price: BigDecimal,
    pub package_value_price: Option<BigDecimal>,
    pub price_adjustment: BigDecimal,
    pub final_price: BigDecimal,
    pub price_floored: bool,
    pub status: String,
    pub payment_method: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = order_lines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub unit: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = order_timeline)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TimelineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub status: String,
    pub occurred_at: DateTime<Utc>,
    pub completed: bool,
    pub description: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub method: String,
    pub status: String,
    pub transaction_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}
