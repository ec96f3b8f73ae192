use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::PackageCatalog;
use crate::domain::pricing::{Package, PackageItem};
use crate::schema::{package_items, packages};

use super::models::{PackageItemRow, PackageRow};

/// Reads packages maintained by the catalog service. Never writes.
pub struct DieselPackageCatalog {
    pool: DbPool,
}

impl DieselPackageCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PackageCatalog for DieselPackageCatalog {
    fn find_package(&self, id: Uuid) -> Result<Option<Package>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = packages::table
            .filter(packages::id.eq(id))
            .select(PackageRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = package_items::table
            .filter(package_items::package_id.eq(row.id))
            .order(package_items::position.asc())
            .select(PackageItemRow::as_select())
            .load(&mut conn)?;

        Ok(Some(Package {
            id: row.id,
            name: row.name,
            base_price: row.base_price,
            value_price: row.value_price,
            items: items
                .into_iter()
                .map(|i| PackageItem {
                    product_id: i.product_id,
                    name: i.name,
                    unit_price: i.unit_price,
                    unit: i.unit,
                })
                .collect(),
        }))
    }
}
