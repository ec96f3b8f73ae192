//! In-process ports for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, NewOrder, Order, Payment};
use crate::domain::ports::{OrderRepository, PackageCatalog};
use crate::domain::pricing::Package;
use crate::domain::status::OrderStatus;

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<Uuid, Order>>,
    payments: Mutex<HashMap<Uuid, Payment>>,
}

impl InMemoryOrderRepository {
    fn bump(&self, order: &Order) -> Result<Order, DomainError> {
        let mut orders = self.orders.lock().expect("orders lock");
        let stored = orders.get_mut(&order.id).ok_or(DomainError::NotFound)?;
        if stored.version != order.version {
            return Err(DomainError::StaleOrder {
                id: order.id,
                expected: order.version,
            });
        }
        let mut next = order.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create(&self, new_order: &NewOrder) -> Result<Order, DomainError> {
        self.orders
            .lock()
            .expect("orders lock")
            .insert(new_order.order.id, new_order.order.clone());
        self.payments
            .lock()
            .expect("payments lock")
            .insert(new_order.order.id, new_order.payment.clone());
        Ok(new_order.order.clone())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.lock().expect("orders lock").get(&id).cloned())
    }

    fn find_payment(&self, order_id: Uuid) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .lock()
            .expect("payments lock")
            .get(&order_id)
            .cloned())
    }

    fn list(
        &self,
        page: i64,
        limit: i64,
        status: Option<OrderStatus>,
    ) -> Result<ListResult, DomainError> {
        let orders = self.orders.lock().expect("orders lock");
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| status.map_or(true, |s| o.status.current == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit) as usize)
            .take(limit as usize)
            .collect();
        Ok(ListResult { items, total })
    }

    fn save_status(&self, order: &Order) -> Result<Order, DomainError> {
        self.bump(order)
    }

    fn save_payment(&self, order: &Order, payment: &Payment) -> Result<Order, DomainError> {
        let saved = self.bump(order)?;
        self.payments
            .lock()
            .expect("payments lock")
            .insert(order.id, payment.clone());
        Ok(saved)
    }
}

#[derive(Default)]
pub struct InMemoryPackageCatalog {
    packages: HashMap<Uuid, Package>,
}

impl InMemoryPackageCatalog {
    pub fn with(packages: Vec<Package>) -> Self {
        Self {
            packages: packages.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

impl PackageCatalog for InMemoryPackageCatalog {
    fn find_package(&self, id: Uuid) -> Result<Option<Package>, DomainError> {
        Ok(self.packages.get(&id).cloned())
    }
}
