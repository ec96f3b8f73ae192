use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::{self, DisplayStep, LifecycleWarning};
use crate::domain::order::{
    CheckoutInput, CustomerSnapshot, DeliverySchedule, Order, Payment, ShippingAddress,
};
use crate::domain::pricing::{AdjustmentKind, BasketLine};
use crate::domain::status::{OrderStatus, PaymentStatus};
use crate::errors::AppError;
use crate::session::SessionContext;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct BasketLineRequest {
    pub product_id: Uuid,
    pub name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "2.49"
    pub unit_price: String,
    pub quantity: i32,
    pub unit: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub package_id: Uuid,
    pub customer: CustomerSnapshot,
    pub shipping_address: ShippingAddress,
    pub delivery: DeliverySchedule,
    pub lines: Vec<BasketLineRequest>,
    pub payment_method: String,
    /// Payment already captured by the storefront.
    #[serde(default)]
    pub prepaid: bool,
}

impl CheckoutRequest {
    fn into_input(self) -> Result<CheckoutInput, DomainError> {
        let lines = self
            .lines
            .into_iter()
            .enumerate()
            .map(|(index, l)| {
                let unit_price = BigDecimal::from_str(&l.unit_price).map_err(|e| {
                    DomainError::InvalidBasketLine {
                        index,
                        reason: format!("invalid unit_price '{}': {}", l.unit_price, e),
                    }
                })?;
                Ok(BasketLine {
                    product_id: l.product_id,
                    name: l.name,
                    unit_price,
                    quantity: l.quantity,
                    unit: l.unit,
                    image_url: l.image_url,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(CheckoutInput {
            package_id: self.package_id,
            customer: self.customer,
            shipping_address: self.shipping_address,
            delivery: self.delivery,
            lines,
            payment_method: self.payment_method,
            prepaid: self.prepaid,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of `Pending`, `Processing`, `Out for Delivery`, `Delivered`, `Cancelled`.
    pub status: String,
    /// Version the caller last saw; rejected with 409 if the order has moved on.
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    /// One of `pending`, `processing`, `paid`, `refunded`, `failed`.
    pub status: String,
    pub transaction_ref: Option<String>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub unit: String,
    pub image_url: Option<String>,
    pub line_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PricingResponse {
    pub items_total_value: String,
    pub package_base_price: String,
    pub package_value_price: Option<String>,
    pub price_adjustment: String,
    pub final_price: String,
    pub adjustment_kind: AdjustmentKind,
    /// True when the final price was clamped to zero.
    pub floored: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSummaryResponse {
    pub method: String,
    pub is_paid: bool,
    pub paid_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimelineEntryResponse {
    pub status: OrderStatus,
    pub date: Option<String>,
    pub completed: bool,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub current: OrderStatus,
    pub timeline: Vec<TimelineEntryResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub package_id: Uuid,
    pub customer: CustomerSnapshot,
    pub shipping_address: ShippingAddress,
    pub delivery: DeliverySchedule,
    pub lines: Vec<OrderLineResponse>,
    pub pricing: PricingResponse,
    pub payment: PaymentSummaryResponse,
    pub status: StatusResponse,
    pub is_actionable: bool,
    pub requires_payment_warning: bool,
    pub version: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let is_actionable = lifecycle::is_actionable(&order);
        let requires_payment_warning = lifecycle::requires_payment_warning(&order);
        let adjustment_kind = order.pricing.kind();

        OrderResponse {
            id: order.id,
            order_number: order.order_number,
            package_id: order.package_id,
            customer: order.customer,
            shipping_address: order.shipping_address,
            delivery: order.delivery,
            lines: order
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    line_total: l.line_total().to_string(),
                    product_id: l.product_id,
                    name: l.name,
                    unit_price: l.unit_price.to_string(),
                    quantity: l.quantity,
                    unit: l.unit,
                    image_url: l.image_url,
                })
                .collect(),
            pricing: PricingResponse {
                items_total_value: order.pricing.items_total_value.to_string(),
                package_base_price: order.pricing.package_base_price.to_string(),
                package_value_price: order.pricing.package_value_price.map(|v| v.to_string()),
                price_adjustment: order.pricing.price_adjustment.to_string(),
                final_price: order.pricing.final_price.to_string(),
                adjustment_kind,
                floored: order.pricing.floored,
            },
            payment: PaymentSummaryResponse {
                method: order.payment.method,
                is_paid: order.payment.is_paid,
                paid_at: order.payment.paid_at.map(|d| d.to_rfc3339()),
            },
            status: StatusResponse {
                current: order.status.current,
                timeline: order
                    .status
                    .timeline
                    .into_iter()
                    .map(|e| TimelineEntryResponse {
                        status: e.status,
                        date: Some(e.date.to_rfc3339()),
                        completed: e.completed,
                        description: Some(e.description),
                    })
                    .collect(),
            },
            is_actionable,
            requires_payment_warning,
            version: order.version,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

impl From<DisplayStep> for TimelineEntryResponse {
    fn from(step: DisplayStep) -> Self {
        TimelineEntryResponse {
            status: step.status,
            date: step.date.map(|d| d.to_rfc3339()),
            completed: step.completed,
            description: step.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: String,
    pub currency: String,
    pub method: String,
    pub status: PaymentStatus,
    pub transaction_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        PaymentResponse {
            id: p.id,
            order_id: p.order_id,
            amount: p.amount.to_string(),
            currency: p.currency,
            method: p.method,
            status: p.status,
            transaction_ref: p.transaction_ref,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionResponse {
    pub order: OrderResponse,
    /// Non-blocking conditions for the caller to surface, e.g.
    /// `payment_not_confirmed`.
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentUpdateResponse {
    pub order: OrderResponse,
    pub payment: PaymentResponse,
}

fn warning_code(w: LifecycleWarning) -> String {
    match w {
        LifecycleWarning::PaymentNotConfirmed => "payment_not_confirmed".to_string(),
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Only orders currently in this status.
    pub status: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Checkout: prices the basket against its package and stores the order,
/// its payment record and an `OrderCreated` outbox event in one transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Missing or over-long contact field, or total out of range"),
        (status = 401, description = "Missing session"),
        (status = 422, description = "Empty basket, invalid line or unknown package"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<OrderService>,
    session: SessionContext,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner().into_input()?;

    let order = web::block(move || service.checkout(&session, input)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<OrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id)).await??;

    match order {
        Some(order) => Ok(HttpResponse::Ok().json(OrderResponse::from(order))),
        None => Err(AppError::NotFound),
    }
}

/// GET /orders
///
/// Returns a paginated list of orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("status" = Option<String>, Query, description = "Filter by current status"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 400, description = "Unknown status filter or page out of range"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    service: web::Data<OrderService>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result =
        web::block(move || service.list_orders(page, limit, params.status.as_deref())).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /orders/{id}/timeline
///
/// The five canonical statuses with the date each was reached, if any.
#[utoipa::path(
    get,
    path = "/orders/{id}/timeline",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Progress steps", body = [TimelineEntryResponse]),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_timeline(
    service: web::Data<OrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id))
        .await??
        .ok_or(AppError::NotFound)?;

    let steps: Vec<TimelineEntryResponse> = lifecycle::display_steps(&order)
        .into_iter()
        .map(TimelineEntryResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(steps))
}

/// PATCH /orders/{id}/status
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = TransitionResponse),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Missing session"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Illegal transition, unchanged status or stale version"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    service: web::Data<OrderService>,
    session: SessionContext,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();

    let outcome = web::block(move || {
        service.update_status(&session, order_id, &body.status, body.expected_version)
    })
    .await??;

    Ok(HttpResponse::Ok().json(TransitionResponse {
        warnings: outcome.warnings.iter().copied().map(warning_code).collect(),
        order: OrderResponse::from(outcome.order),
    }))
}

/// GET /orders/{id}/payment
#[utoipa::path(
    get,
    path = "/orders/{id}/payment",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Payment record", body = PaymentResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "payments"
)]
pub async fn get_payment(
    service: web::Data<OrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let payment = web::block(move || service.get_payment(order_id))
        .await??
        .ok_or(AppError::NotFound)?;

    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}

/// PATCH /orders/{id}/payment
///
/// Staff override of the payment status; any recognised value is accepted.
#[utoipa::path(
    patch,
    path = "/orders/{id}/payment",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment updated", body = PaymentUpdateResponse),
        (status = 400, description = "Unknown payment status or over-long transaction_ref"),
        (status = 401, description = "Missing session"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Stale version"),
    ),
    tag = "payments"
)]
pub async fn update_payment(
    service: web::Data<OrderService>,
    session: SessionContext,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();

    let update = web::block(move || {
        service.update_payment_status(
            &session,
            order_id,
            &body.status,
            body.transaction_ref,
            body.expected_version,
        )
    })
    .await??;

    Ok(HttpResponse::Ok().json(PaymentUpdateResponse {
        order: OrderResponse::from(update.order),
        payment: PaymentResponse::from(update.payment),
    }))
}
