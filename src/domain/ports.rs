use uuid::Uuid;

use super::errors::DomainError;
use super::order::{ListResult, NewOrder, Order, Payment};
use super::pricing::Package;
use super::status::OrderStatus;

pub trait OrderRepository: Send + Sync + 'static {
    /// Store a checked-out order, its lines, timeline, payment and creation
    /// event atomically.
    fn create(&self, new_order: &NewOrder) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_payment(&self, order_id: Uuid) -> Result<Option<Payment>, DomainError>;
    fn list(
        &self,
        page: i64,
        limit: i64,
        status: Option<OrderStatus>,
    ) -> Result<ListResult, DomainError>;
    /// Persist a status change if the stored version still equals
    /// `order.version`. Returns the order with its bumped version.
    fn save_status(&self, order: &Order) -> Result<Order, DomainError>;
    /// Persist a payment change under the same version check as
    /// [`OrderRepository::save_status`].
    fn save_payment(&self, order: &Order, payment: &Payment) -> Result<Order, DomainError>;
}

/// Read-only view of the package catalog.
pub trait PackageCatalog: Send + Sync + 'static {
    fn find_package(&self, id: Uuid) -> Result<Option<Package>, DomainError>;
}
