use std::collections::HashMap;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    CustomerSnapshot, DeliverySchedule, ListResult, NewOrder, Order, Payment, PaymentInfo,
    ShippingAddress, StatusInfo, TimelineEntry,
};
use crate::domain::ports::OrderRepository;
use crate::domain::pricing::{BasketLine, PriceReconciliation};
use crate::domain::status::OrderStatus;
use crate::schema::{order_lines, order_outbox, order_timeline, orders, payments};

use super::models::{NewOutboxEventRow, OrderLineRow, OrderRow, PaymentRow, TimelineRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn order_row(order: &Order) -> OrderRow {
    OrderRow {
        id: order.id,
        order_number: order.order_number.clone(),
        package_id: order.package_id,
        customer_name: order.customer.name.clone(),
        customer_email: order.customer.email.clone(),
        customer_phone: order.customer.phone.clone(),
        shipping_street: order.shipping_address.street.clone(),
        shipping_city: order.shipping_address.city.clone(),
        shipping_postal_code: order.shipping_address.postal_code.clone(),
        shipping_instructions: order.shipping_address.instructions.clone(),
        delivery_day: order.delivery.preferred_day.clone(),
        delivery_time: order.delivery.preferred_time.clone(),
        items_total_value: order.pricing.items_total_value.clone(),
        package_base_price: order.pricing.package_base_price.clone(),
        package_value_price: order.pricing.package_value_price.clone(),
        price_adjustment: order.pricing.price_adjustment.clone(),
        final_price: order.pricing.final_price.clone(),
        price_floored: order.pricing.floored,
        status: order.status.current.to_string(),
        payment_method: order.payment.method.clone(),
        is_paid: order.payment.is_paid,
        paid_at: order.payment.paid_at,
        version: order.version,
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

fn line_rows(order: &Order) -> Vec<OrderLineRow> {
    order
        .lines
        .iter()
        .enumerate()
        .map(|(position, l)| OrderLineRow {
            id: Uuid::new_v4(),
            order_id: order.id,
            position: position as i32,
            product_id: l.product_id,
            name: l.name.clone(),
            unit_price: l.unit_price.clone(),
            quantity: l.quantity,
            unit: l.unit.clone(),
            image_url: l.image_url.clone(),
        })
        .collect()
}

fn timeline_rows(order: &Order) -> Vec<TimelineRow> {
    order
        .status
        .timeline
        .iter()
        .enumerate()
        .map(|(position, e)| TimelineRow {
            id: Uuid::new_v4(),
            order_id: order.id,
            position: position as i32,
            status: e.status.to_string(),
            occurred_at: e.date,
            completed: e.completed,
            description: e.description.clone(),
        })
        .collect()
}

fn payment_row(payment: &Payment) -> PaymentRow {
    PaymentRow {
        id: payment.id,
        order_id: payment.order_id,
        amount: payment.amount.clone(),
        currency: payment.currency.clone(),
        method: payment.method.clone(),
        status: payment.status.to_string(),
        transaction_ref: payment.transaction_ref.clone(),
        created_at: payment.created_at,
        updated_at: payment.updated_at,
    }
}

fn stored_status<T: std::str::FromStr<Err = DomainError>>(raw: &str) -> Result<T, DomainError> {
    raw.parse()
        .map_err(|e: DomainError| DomainError::Internal(format!("corrupt stored row: {}", e)))
}

fn into_order(
    row: OrderRow,
    lines: Vec<OrderLineRow>,
    timeline: Vec<TimelineRow>,
) -> Result<Order, DomainError> {
    let timeline = timeline
        .into_iter()
        .map(|t| {
            Ok(TimelineEntry {
                status: stored_status(&t.status)?,
                date: t.occurred_at,
                completed: t.completed,
                description: t.description,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(Order {
        id: row.id,
        order_number: row.order_number,
        package_id: row.package_id,
        customer: CustomerSnapshot {
            name: row.customer_name,
            email: row.customer_email,
            phone: row.customer_phone,
        },
        shipping_address: ShippingAddress {
            street: row.shipping_street,
            city: row.shipping_city,
            postal_code: row.shipping_postal_code,
            instructions: row.shipping_instructions,
        },
        delivery: DeliverySchedule {
            preferred_day: row.delivery_day,
            preferred_time: row.delivery_time,
        },
        lines: lines
            .into_iter()
            .map(|l| BasketLine {
                product_id: l.product_id,
                name: l.name,
                unit_price: l.unit_price,
                quantity: l.quantity,
                unit: l.unit,
                image_url: l.image_url,
            })
            .collect(),
        pricing: PriceReconciliation {
            items_total_value: row.items_total_value,
            package_base_price: row.package_base_price,
            package_value_price: row.package_value_price,
            price_adjustment: row.price_adjustment,
            final_price: row.final_price,
            floored: row.price_floored,
        },
        payment: PaymentInfo {
            method: row.payment_method,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
        },
        status: StatusInfo {
            current: stored_status(&row.status)?,
            timeline,
        },
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn into_payment(row: PaymentRow) -> Result<Payment, DomainError> {
    Ok(Payment {
        id: row.id,
        order_id: row.order_id,
        amount: row.amount,
        currency: row.currency,
        method: row.method,
        status: stored_status(&row.status)?,
        transaction_ref: row.transaction_ref,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

// ── Outbox ───────────────────────────────────────────────────────────────────

/// Debezium's EventRouter SMT derives the Kafka topic from `aggregate_type`.
fn write_event(
    conn: &mut PgConnection,
    order: &Order,
    event_type: &str,
    payload: Value,
) -> QueryResult<usize> {
    diesel::insert_into(order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: order.id.to_string(),
            event_type: event_type.to_string(),
            payload,
        })
        .execute(conn)
}

fn base_payload(order: &Order) -> Value {
    json!({
        "order_id": order.id,
        "order_number": order.order_number,
        "status": order.status.current.as_str(),
        "is_paid": order.payment.is_paid,
        "customer": {
            "name": order.customer.name,
            "email": order.customer.email,
        },
    })
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Conditional update of the order row; zero rows means someone else
    /// moved the version on.
    fn bump_version(
        conn: &mut PgConnection,
        order: &Order,
        next_version: i32,
    ) -> Result<(), DomainError> {
        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(order.id))
                .filter(orders::version.eq(order.version)),
        )
        .set((
            orders::status.eq(order.status.current.as_str()),
            orders::is_paid.eq(order.payment.is_paid),
            orders::paid_at.eq(order.payment.paid_at),
            orders::version.eq(next_version),
            orders::updated_at.eq(order.updated_at),
        ))
        .execute(conn)?;

        if updated == 0 {
            return Err(DomainError::StaleOrder {
                id: order.id,
                expected: order.version,
            });
        }
        Ok(())
    }

    /// The timeline only grows: refresh completion flags on stored entries
    /// and append the new ones.
    fn sync_timeline(conn: &mut PgConnection, order: &Order) -> Result<(), DomainError> {
        let stored: i64 = order_timeline::table
            .filter(order_timeline::order_id.eq(order.id))
            .count()
            .get_result(conn)?;

        let (existing, appended): (Vec<TimelineRow>, Vec<TimelineRow>) = timeline_rows(order)
            .into_iter()
            .partition(|r| i64::from(r.position) < stored);

        for row in existing {
            diesel::update(
                order_timeline::table
                    .filter(order_timeline::order_id.eq(order.id))
                    .filter(order_timeline::position.eq(row.position)),
            )
            .set(order_timeline::completed.eq(row.completed))
            .execute(conn)?;
        }
        if !appended.is_empty() {
            diesel::insert_into(order_timeline::table)
                .values(&appended)
                .execute(conn)?;
        }
        Ok(())
    }

    fn load_children(
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<(HashMap<Uuid, Vec<OrderLineRow>>, HashMap<Uuid, Vec<TimelineRow>>), DomainError>
    {
        let lines = order_lines::table
            .filter(order_lines::order_id.eq_any(ids.to_vec()))
            .order((order_lines::order_id, order_lines::position))
            .select(OrderLineRow::as_select())
            .load(conn)?;
        let timeline = order_timeline::table
            .filter(order_timeline::order_id.eq_any(ids.to_vec()))
            .order((order_timeline::order_id, order_timeline::position))
            .select(TimelineRow::as_select())
            .load(conn)?;

        let mut lines_by_order: HashMap<Uuid, Vec<OrderLineRow>> = HashMap::new();
        for line in lines {
            lines_by_order.entry(line.order_id).or_default().push(line);
        }
        let mut timeline_by_order: HashMap<Uuid, Vec<TimelineRow>> = HashMap::new();
        for entry in timeline {
            timeline_by_order.entry(entry.order_id).or_default().push(entry);
        }
        Ok((lines_by_order, timeline_by_order))
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, new_order: &NewOrder) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;
        let order = &new_order.order;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(orders::table)
                .values(&order_row(order))
                .execute(conn)?;
            diesel::insert_into(order_lines::table)
                .values(&line_rows(order))
                .execute(conn)?;
            diesel::insert_into(order_timeline::table)
                .values(&timeline_rows(order))
                .execute(conn)?;
            diesel::insert_into(payments::table)
                .values(&payment_row(&new_order.payment))
                .execute(conn)?;

            let mut payload = base_payload(order);
            payload["package_id"] = json!(order.package_id);
            payload["final_price"] = json!(order.pricing.final_price.to_string());
            payload["price_adjustment"] = json!(order.pricing.price_adjustment.to_string());
            payload["delivery"] = json!({
                "preferred_day": order.delivery.preferred_day,
                "preferred_time": order.delivery.preferred_time,
            });
            payload["lines"] = order
                .lines
                .iter()
                .map(|l| {
                    json!({
                        "product_id": l.product_id,
                        "name": l.name,
                        "quantity": l.quantity,
                        "unit_price": l.unit_price.to_string(),
                        "unit": l.unit,
                    })
                })
                .collect::<Vec<_>>()
                .into();
            write_event(conn, order, "OrderCreated", payload)?;

            Ok(order.clone())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let (mut lines, mut timeline) = Self::load_children(&mut conn, &[row.id])?;
        let order = into_order(
            row,
            lines.remove(&id).unwrap_or_default(),
            timeline.remove(&id).unwrap_or_default(),
        )?;
        Ok(Some(order))
    }

    fn find_payment(&self, order_id: Uuid) -> Result<Option<Payment>, DomainError> {
        let mut conn = self.pool.get()?;

        payments::table
            .filter(payments::order_id.eq(order_id))
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(into_payment)
            .transpose()
    }

    fn list(
        &self,
        page: i64,
        limit: i64,
        status: Option<OrderStatus>,
    ) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1).saturating_mul(limit);
        conn.transaction::<_, DomainError, _>(|conn| {
            let mut count_query = orders::table
                .select(diesel::dsl::count_star())
                .into_boxed();
            let mut page_query = orders::table.select(OrderRow::as_select()).into_boxed();
            if let Some(status) = status {
                count_query = count_query.filter(orders::status.eq(status.as_str()));
                page_query = page_query.filter(orders::status.eq(status.as_str()));
            }

            let total: i64 = count_query.get_result(conn)?;
            let rows: Vec<OrderRow> = page_query
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
            let (mut lines, mut timeline) = Self::load_children(conn, &ids)?;

            let items = rows
                .into_iter()
                .map(|row| {
                    let id = row.id;
                    into_order(
                        row,
                        lines.remove(&id).unwrap_or_default(),
                        timeline.remove(&id).unwrap_or_default(),
                    )
                })
                .collect::<Result<Vec<_>, DomainError>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn save_status(&self, order: &Order) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let next_version = order.version + 1;
            Self::bump_version(conn, order, next_version)?;
            Self::sync_timeline(conn, order)?;

            let mut payload = base_payload(order);
            if let Some(entry) = order.status.timeline.last() {
                payload["description"] = json!(entry.description);
                payload["changed_at"] = json!(entry.date);
            }
            write_event(conn, order, "OrderStatusChanged", payload)?;

            let mut saved = order.clone();
            saved.version = next_version;
            Ok(saved)
        })
    }

    fn save_payment(&self, order: &Order, payment: &Payment) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let next_version = order.version + 1;
            Self::bump_version(conn, order, next_version)?;

            diesel::update(payments::table.filter(payments::id.eq(payment.id)))
                .set((
                    payments::status.eq(payment.status.as_str()),
                    payments::transaction_ref.eq(payment.transaction_ref.clone()),
                    payments::updated_at.eq(payment.updated_at),
                ))
                .execute(conn)?;

            let mut payload = base_payload(order);
            payload["payment_id"] = json!(payment.id);
            payload["payment_status"] = json!(payment.status.as_str());
            payload["amount"] = json!(payment.amount.to_string());
            payload["currency"] = json!(payment.currency);
            write_event(conn, order, "PaymentStatusChanged", payload)?;

            let mut saved = order.clone();
            saved.version = next_version;
            Ok(saved)
        })
    }
}
