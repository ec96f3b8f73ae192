use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::lifecycle::{self, PaymentUpdate, TransitionOutcome};
use crate::domain::order::{CheckoutInput, ListResult, Order, Payment};
use crate::domain::ports::{OrderRepository, PackageCatalog};
use crate::domain::pricing::reconcile;
use crate::domain::status::OrderStatus;
use crate::session::SessionContext;

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    catalog: Arc<dyn PackageCatalog>,
    currency: String,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        catalog: Arc<dyn PackageCatalog>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            catalog,
            currency: currency.into(),
        }
    }

    /// Price the basket and store the resulting order. Nothing is stored
    /// unless pricing succeeds.
    pub fn checkout(
        &self,
        session: &SessionContext,
        input: CheckoutInput,
    ) -> Result<Order, DomainError> {
        if input.lines.is_empty() {
            return Err(DomainError::EmptyBasket);
        }
        validate_contact(&input)?;

        let package = self
            .catalog
            .find_package(input.package_id)?
            .ok_or(DomainError::PackageNotFound(input.package_id))?;

        let pricing = reconcile(&package, &input.lines)?;
        if input.lines.iter().all(|l| l.quantity == 0) {
            return Err(DomainError::EmptyBasket);
        }

        let new_order = lifecycle::open_order(input, pricing, &self.currency, Utc::now());
        let order = self.repo.create(&new_order)?;

        log::info!(
            "order {} checked out by {}: package {} final price {} (adjustment {})",
            order.order_number,
            session.actor(),
            package.id,
            order.pricing.final_price,
            order.pricing.price_adjustment
        );
        Ok(order)
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn get_payment(&self, order_id: Uuid) -> Result<Option<Payment>, DomainError> {
        self.repo.find_payment(order_id)
    }

    pub fn list_orders(
        &self,
        page: i64,
        limit: i64,
        status: Option<&str>,
    ) -> Result<ListResult, DomainError> {
        if page < 1 || limit < 1 || (page - 1).checked_mul(limit).is_none() {
            return Err(DomainError::InvalidInput(format!(
                "page {} with limit {} is out of range",
                page, limit
            )));
        }
        let status = status.map(str::parse::<OrderStatus>).transpose()?;
        self.repo.list(page, limit, status)
    }

    /// Apply a staff status change to the latest stored order.
    pub fn update_status(
        &self,
        session: &SessionContext,
        id: Uuid,
        target: &str,
        expected_version: Option<i32>,
    ) -> Result<TransitionOutcome, DomainError> {
        let target_status: OrderStatus = target.parse()?;
        let order = self.load(id, expected_version)?;

        if order.status.current == target_status {
            return Err(DomainError::StatusUnchanged(target_status.to_string()));
        }

        let mut outcome = lifecycle::transition(&order, target, Utc::now())?;
        outcome.order = self.repo.save_status(&outcome.order)?;

        log::info!(
            "order {} moved {} -> {} by {}",
            outcome.order.order_number,
            order.status.current,
            outcome.order.status.current,
            session.actor()
        );
        Ok(outcome)
    }

    pub fn update_payment_status(
        &self,
        session: &SessionContext,
        order_id: Uuid,
        target: &str,
        transaction_ref: Option<String>,
        expected_version: Option<i32>,
    ) -> Result<PaymentUpdate, DomainError> {
        if let Some(reference) = &transaction_ref {
            check_length("transaction_ref", reference, TRANSACTION_REF_MAX_CHARS)?;
        }
        let order = self.load(order_id, expected_version)?;
        let payment = self.repo.find_payment(order_id)?.ok_or_else(|| {
            DomainError::Internal(format!("order {} has no payment record", order_id))
        })?;

        let mut update =
            lifecycle::set_payment_status(&order, &payment, target, transaction_ref, Utc::now())?;
        update.order = self.repo.save_payment(&update.order, &update.payment)?;

        log::info!(
            "order {} payment {} -> {} by {}",
            update.order.order_number,
            payment.status,
            update.payment.status,
            session.actor()
        );
        Ok(update)
    }

    fn load(&self, id: Uuid, expected_version: Option<i32>) -> Result<Order, DomainError> {
        let order = self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)?;
        match expected_version {
            Some(expected) if expected != order.version => {
                Err(DomainError::StaleOrder { id, expected })
            }
            _ => Ok(order),
        }
    }
}

const TRANSACTION_REF_MAX_CHARS: usize = 255;

fn check_length(field: &str, value: &str, max: usize) -> Result<(), DomainError> {
    if value.chars().count() > max {
        return Err(DomainError::InvalidInput(format!(
            "{} is longer than {} characters",
            field, max
        )));
    }
    Ok(())
}

fn validate_contact(input: &CheckoutInput) -> Result<(), DomainError> {
    let required = [
        ("customer.name", &input.customer.name),
        ("customer.email", &input.customer.email),
        ("customer.phone", &input.customer.phone),
        ("shipping_address.street", &input.shipping_address.street),
        ("shipping_address.city", &input.shipping_address.city),
        ("shipping_address.postal_code", &input.shipping_address.postal_code),
        ("payment_method", &input.payment_method),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(DomainError::InvalidInput(format!("{} is required", field)));
        }
    }
    if !input.customer.email.contains('@') {
        return Err(DomainError::InvalidInput(format!(
            "customer.email '{}' is not an email address",
            input.customer.email
        )));
    }

    let limited = [
        ("customer.name", &input.customer.name, 255),
        ("customer.email", &input.customer.email, 255),
        ("customer.phone", &input.customer.phone, 50),
        ("shipping_address.street", &input.shipping_address.street, 255),
        ("shipping_address.city", &input.shipping_address.city, 255),
        ("shipping_address.postal_code", &input.shipping_address.postal_code, 20),
        ("delivery.preferred_day", &input.delivery.preferred_day, 50),
        ("delivery.preferred_time", &input.delivery.preferred_time, 50),
        ("payment_method", &input.payment_method, 50),
    ];
    for (field, value, max) in limited {
        check_length(field, value, max)?;
    }
    Ok(())
}
