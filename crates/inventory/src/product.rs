use serde::{Deserialize, Serialize};

use billkeep_core::{DomainError, DomainResult, ProductId, TenantId};

/// Product stock view.
///
/// `current_stock` is only ever written through the guards in
/// [`crate::stock`]; it never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub name: String,
    pub current_stock: i64,
}

impl Product {
    pub fn new(
        id: ProductId,
        tenant_id: TenantId,
        name: impl Into<String>,
        opening_stock: i64,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if opening_stock < 0 {
            return Err(DomainError::validation("opening stock cannot be negative"));
        }
        Ok(Self {
            id,
            tenant_id,
            name,
            current_stock: opening_stock,
        })
    }
}
