//! Order status state machine, payment gate and timeline upkeep.
//!
//! Every function here takes the latest persisted order by reference and
//! returns a new value; a failed call leaves the caller's order untouched.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{
    order_number, CheckoutInput, NewOrder, Order, Payment, PaymentInfo, StatusInfo, TimelineEntry,
};
use super::pricing::PriceReconciliation;
use super::status::{OrderStatus, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleWarning {
    /// Order marked delivered before payment was captured.
    PaymentNotConfirmed,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub order: Order,
    pub changed: bool,
    pub warnings: Vec<LifecycleWarning>,
}

impl TransitionOutcome {
    pub fn requires_payment_warning(&self) -> bool {
        requires_payment_warning(&self.order)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub order: Order,
    pub payment: Payment,
}

/// One row of the staff-facing progress view.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayStep {
    pub status: OrderStatus,
    pub date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub description: Option<String>,
}

fn describe(status: OrderStatus, is_paid: bool) -> String {
    match status {
        OrderStatus::Pending => "Order received and awaiting processing".to_string(),
        OrderStatus::Processing => "Order is being picked and packed".to_string(),
        OrderStatus::OutForDelivery => "Order has left the warehouse".to_string(),
        OrderStatus::Delivered if is_paid => "Order delivered to the customer".to_string(),
        OrderStatus::Delivered => {
            "Order delivered to the customer; payment not yet confirmed".to_string()
        }
        OrderStatus::Cancelled => "Order cancelled".to_string(),
    }
}

/// Build a freshly checked-out order in `Pending` with its payment record.
pub fn open_order(
    input: CheckoutInput,
    pricing: PriceReconciliation,
    currency: &str,
    now: DateTime<Utc>,
) -> NewOrder {
    let id = Uuid::new_v4();
    let is_paid = input.prepaid;
    let payment_status = if is_paid {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Pending
    };

    let payment = Payment {
        id: Uuid::new_v4(),
        order_id: id,
        amount: pricing.final_price.clone(),
        currency: currency.to_string(),
        method: input.payment_method.clone(),
        status: payment_status,
        transaction_ref: None,
        created_at: now,
        updated_at: now,
    };

    let order = Order {
        id,
        order_number: order_number(id, now),
        package_id: input.package_id,
        customer: input.customer,
        shipping_address: input.shipping_address,
        delivery: input.delivery,
        lines: input.lines,
        pricing,
        payment: PaymentInfo {
            method: input.payment_method,
            is_paid,
            paid_at: is_paid.then_some(now),
        },
        status: StatusInfo {
            current: OrderStatus::Pending,
            timeline: vec![TimelineEntry {
                status: OrderStatus::Pending,
                date: now,
                completed: true,
                description: describe(OrderStatus::Pending, is_paid),
            }],
        },
        version: 1,
        created_at: now,
        updated_at: now,
    };

    NewOrder { order, payment }
}

/// Move `order` to `target`.
///
/// A target equal to the current status yields `changed == false` and an
/// identical order. Delivering an unpaid order succeeds with a
/// [`LifecycleWarning::PaymentNotConfirmed`].
pub fn transition(
    order: &Order,
    target: &str,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, DomainError> {
    let target: OrderStatus = target.parse()?;
    let from = order.status.current;

    if from == target {
        return Ok(TransitionOutcome {
            order: order.clone(),
            changed: false,
            warnings: vec![],
        });
    }

    if !from.can_transition_to(target) {
        return Err(DomainError::InvalidTransition {
            from: from.to_string(),
            to: target.to_string(),
        });
    }

    let mut next = order.clone();
    if let Some(last) = next.status.timeline.last_mut() {
        last.completed = true;
    }
    next.status.timeline.push(TimelineEntry {
        status: target,
        date: now,
        completed: true,
        description: describe(target, next.payment.is_paid),
    });
    next.status.current = target;
    next.updated_at = now;

    let mut warnings = Vec::new();
    if target == OrderStatus::Delivered && !next.payment.is_paid {
        log::warn!(
            "order {} delivered with payment not confirmed",
            next.order_number
        );
        warnings.push(LifecycleWarning::PaymentNotConfirmed);
    }

    Ok(TransitionOutcome {
        order: next,
        changed: true,
        warnings,
    })
}

/// Set the payment status directly. Any recognised status is accepted from
/// any other; the order's `is_paid` flag follows it.
pub fn set_payment_status(
    order: &Order,
    payment: &Payment,
    target: &str,
    transaction_ref: Option<String>,
    now: DateTime<Utc>,
) -> Result<PaymentUpdate, DomainError> {
    let target: PaymentStatus = target.parse()?;

    let mut next_order = order.clone();
    match target {
        PaymentStatus::Paid => confirm_payment(&mut next_order.payment, now),
        PaymentStatus::Refunded => next_order.payment.is_paid = false,
        PaymentStatus::Pending | PaymentStatus::Processing | PaymentStatus::Failed => {
            next_order.payment.is_paid = false;
            next_order.payment.paid_at = None;
        }
    }
    next_order.updated_at = now;

    let mut next_payment = payment.clone();
    next_payment.status = target;
    if transaction_ref.is_some() {
        next_payment.transaction_ref = transaction_ref;
    }
    next_payment.updated_at = now;

    Ok(PaymentUpdate {
        order: next_order,
        payment: next_payment,
    })
}

/// Payment gate: record capture once, keeping the first capture time.
pub fn confirm_payment(payment: &mut PaymentInfo, now: DateTime<Utc>) {
    if !payment.is_paid {
        payment.is_paid = true;
        payment.paid_at = Some(now);
    }
}

pub fn is_actionable(order: &Order) -> bool {
    !order.status.current.is_terminal()
}

pub fn requires_payment_warning(order: &Order) -> bool {
    matches!(
        order.status.current,
        OrderStatus::Delivered | OrderStatus::OutForDelivery
    ) && !order.payment.is_paid
}

/// Project the stored timeline onto the five canonical statuses.
pub fn display_steps(order: &Order) -> Vec<DisplayStep> {
    OrderStatus::ALL
        .iter()
        .map(|status| {
            match order
                .status
                .timeline
                .iter()
                .rev()
                .find(|e| e.status == *status)
            {
                Some(entry) => DisplayStep {
                    status: *status,
                    date: Some(entry.date),
                    completed: entry.completed,
                    description: Some(entry.description.clone()),
                },
                None => DisplayStep {
                    status: *status,
                    date: None,
                    completed: false,
                    description: None,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::domain::order::{CustomerSnapshot, DeliverySchedule, ShippingAddress};
    use crate::domain::pricing::{reconcile, BasketLine, Package};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap()
    }

    fn checkout(prepaid: bool) -> NewOrder {
        let package = Package {
            id: Uuid::new_v4(),
            name: "Weekly Veg".to_string(),
            base_price: BigDecimal::from(100),
            value_price: Some(BigDecimal::from(120)),
            items: vec![],
        };
        let lines = vec![BasketLine {
            product_id: Uuid::new_v4(),
            name: "Carrots".to_string(),
            unit_price: BigDecimal::from_str("2.50").unwrap(),
            quantity: 4,
            unit: "kg".to_string(),
            image_url: None,
        }];
        let pricing = reconcile(&package, &lines).unwrap();
        let input = CheckoutInput {
            package_id: package.id,
            customer: CustomerSnapshot {
                name: "Ana Ruiz".to_string(),
                email: "ana@example.com".to_string(),
                phone: "+34 600 000 000".to_string(),
            },
            shipping_address: ShippingAddress {
                street: "Calle Mayor 1".to_string(),
                city: "Madrid".to_string(),
                postal_code: "28013".to_string(),
                instructions: None,
            },
            delivery: DeliverySchedule {
                preferred_day: "Saturday".to_string(),
                preferred_time: "Morning".to_string(),
            },
            lines,
            payment_method: "cash_on_delivery".to_string(),
            prepaid,
        };
        open_order(input, pricing, "EUR", t0())
    }

    fn order_in(status: &str) -> Order {
        let path: &[&str] = match status {
            "Pending" => &[],
            "Processing" => &["Processing"],
            "Out for Delivery" => &["Processing", "Out for Delivery"],
            "Delivered" => &["Processing", "Out for Delivery", "Delivered"],
            "Cancelled" => &["Processing", "Cancelled"],
            other => panic!("unexpected status {other}"),
        };
        let mut order = checkout(false).order;
        let mut at = t0();
        for step in path {
            at += Duration::hours(1);
            order = transition(&order, step, at).unwrap().order;
        }
        assert_eq!(order.status.current.as_str(), status);
        order
    }

    #[test]
    fn new_orders_start_pending_with_one_entry() {
        let new = checkout(false);
        assert_eq!(new.order.status.current, OrderStatus::Pending);
        assert_eq!(new.order.status.timeline.len(), 1);
        assert!(new.order.status.timeline[0].completed);
        assert!(!new.order.payment.is_paid);
        assert_eq!(new.payment.status, PaymentStatus::Pending);
        assert_eq!(new.payment.amount, new.order.pricing.final_price);
        assert_eq!(new.payment.order_id, new.order.id);
    }

    #[test]
    fn prepaid_checkout_is_marked_paid() {
        let new = checkout(true);
        assert!(new.order.payment.is_paid);
        assert_eq!(new.order.payment.paid_at, Some(t0()));
        assert_eq!(new.payment.status, PaymentStatus::Paid);
    }

    #[test]
    fn processing_to_out_for_delivery_appends_entry() {
        let mut order = order_in("Processing");
        order.status.timeline.last_mut().unwrap().completed = false;
        let now = t0() + Duration::days(1);

        let outcome = transition(&order, "Out for Delivery", now).unwrap();

        let timeline = &outcome.order.status.timeline;
        assert_eq!(timeline.len(), order.status.timeline.len() + 1);
        let last = timeline.last().unwrap();
        assert_eq!(last.status, OrderStatus::OutForDelivery);
        assert_eq!(last.date, now);
        assert!(last.completed);
        assert!(timeline[timeline.len() - 2].completed);
        assert_eq!(outcome.order.updated_at, now);
        assert!(outcome.changed);
    }

    #[test]
    fn delivered_is_terminal() {
        let order = order_in("Delivered");
        let err = transition(&order, "Processing", t0()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(order.status.current, OrderStatus::Delivered);
    }

    #[test]
    fn cancelled_is_terminal() {
        let order = order_in("Cancelled");
        for target in ["Pending", "Processing", "Out for Delivery", "Delivered"] {
            assert!(transition(&order, target, t0()).is_err());
        }
    }

    #[test]
    fn pending_can_cancel_directly() {
        let order = order_in("Pending");
        let outcome = transition(&order, "Cancelled", t0()).unwrap();
        assert_eq!(outcome.order.status.current, OrderStatus::Cancelled);
        assert!(!is_actionable(&outcome.order));
    }

    #[test]
    fn moving_backwards_is_rejected() {
        let order = order_in("Out for Delivery");
        let err = transition(&order, "Pending", t0()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidTransition { ref from, ref to }
                if from == "Out for Delivery" && to == "Pending"
        ));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let order = order_in("Pending");
        let err = transition(&order, "Shipped", t0()).unwrap_err();
        assert!(matches!(err, DomainError::UnknownStatus(_)));
    }

    #[test]
    fn same_status_is_a_no_op() {
        let order = order_in("Processing");
        let outcome = transition(&order, "Processing", t0() + Duration::days(3)).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.order, order);
    }

    #[test]
    fn delivering_unpaid_order_warns() {
        let order = order_in("Out for Delivery");
        let outcome = transition(&order, "Delivered", t0()).unwrap();
        assert_eq!(outcome.warnings, vec![LifecycleWarning::PaymentNotConfirmed]);
        assert!(outcome.requires_payment_warning());
    }

    #[test]
    fn delivering_paid_order_does_not_warn() {
        let mut order = order_in("Out for Delivery");
        confirm_payment(&mut order.payment, t0());
        let outcome = transition(&order, "Delivered", t0()).unwrap();
        assert!(outcome.warnings.is_empty());
        assert!(!outcome.requires_payment_warning());
    }

    #[test]
    fn out_for_delivery_unpaid_requires_warning() {
        assert!(requires_payment_warning(&order_in("Out for Delivery")));
        assert!(!requires_payment_warning(&order_in("Processing")));
    }

    #[test]
    fn every_path_from_pending_terminates() {
        let paths: [&[&str]; 4] = [
            &["Processing", "Out for Delivery", "Delivered"],
            &["Delivered"],
            &["Processing", "Cancelled"],
            &["Out for Delivery", "Cancelled"],
        ];
        for path in paths {
            let mut order = order_in("Pending");
            for step in path {
                order = transition(&order, step, t0()).unwrap().order;
            }
            assert!(!is_actionable(&order));
            for target in OrderStatus::ALL {
                if target != order.status.current {
                    assert!(transition(&order, target.as_str(), t0()).is_err());
                }
            }
        }
    }

    #[test]
    fn paid_sets_flag_and_keeps_first_capture_time() {
        let new = checkout(false);
        let later = t0() + Duration::hours(5);

        let update =
            set_payment_status(&new.order, &new.payment, "paid", Some("tx-1".into()), later)
                .unwrap();
        assert!(update.order.payment.is_paid);
        assert_eq!(update.order.payment.paid_at, Some(later));
        assert_eq!(update.payment.status, PaymentStatus::Paid);
        assert_eq!(update.payment.transaction_ref.as_deref(), Some("tx-1"));

        let again = set_payment_status(
            &update.order,
            &update.payment,
            "paid",
            None,
            later + Duration::hours(1),
        )
        .unwrap();
        assert_eq!(again.order.payment.paid_at, Some(later));
        assert_eq!(again.payment.transaction_ref.as_deref(), Some("tx-1"));
    }

    #[test]
    fn refund_clears_flag_but_keeps_capture_time() {
        let new = checkout(true);
        let update = set_payment_status(&new.order, &new.payment, "refunded", None, t0()).unwrap();
        assert!(!update.order.payment.is_paid);
        assert_eq!(update.order.payment.paid_at, Some(t0()));
        assert_eq!(update.payment.status, PaymentStatus::Refunded);
    }

    #[test]
    fn payment_status_can_be_overridden_backwards() {
        let new = checkout(true);
        let update = set_payment_status(&new.order, &new.payment, "pending", None, t0()).unwrap();
        assert!(!update.order.payment.is_paid);
        assert_eq!(update.order.payment.paid_at, None);
        assert_eq!(update.payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn unknown_payment_status_is_rejected() {
        let new = checkout(false);
        let err = set_payment_status(&new.order, &new.payment, "settled", None, t0()).unwrap_err();
        assert!(matches!(err, DomainError::UnknownPaymentStatus(_)));
    }

    #[test]
    fn display_steps_mark_unreached_statuses() {
        let order = order_in("Processing");
        let steps = display_steps(&order);

        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0].status, OrderStatus::Pending);
        assert!(steps[0].completed);
        assert!(steps[1].completed);
        assert!(steps[1].date.is_some());
        for step in &steps[2..] {
            assert!(!step.completed);
            assert!(step.date.is_none());
            assert!(step.description.is_none());
        }
    }
}
