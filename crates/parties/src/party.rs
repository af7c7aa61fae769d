use serde::{Deserialize, Serialize};

use billkeep_core::{DomainError, DomainResult, PartyId, TenantId};

/// Party classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
    Both,
}

impl PartyKind {
    pub fn is_customer(self) -> bool {
        matches!(self, PartyKind::Customer | PartyKind::Both)
    }

    pub fn is_supplier(self) -> bool {
        matches!(self, PartyKind::Supplier | PartyKind::Both)
    }
}

/// Party master-data record.
///
/// No aggregate fields live here. Receivable/payable per party are derived
/// on read from invoices and payment events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub tenant_id: TenantId,
    pub name: String,
    pub kind: PartyKind,
}

impl Party {
    pub fn new(
        id: PartyId,
        tenant_id: TenantId,
        name: impl Into<String>,
        kind: PartyKind,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("party name cannot be empty"));
        }
        Ok(Self {
            id,
            tenant_id,
            name,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name() {
        let err = Party::new(PartyId::new(), TenantId::new(), "  ", PartyKind::Customer)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn both_kind_serves_both_sides() {
        assert!(PartyKind::Both.is_customer());
        assert!(PartyKind::Both.is_supplier());
        assert!(!PartyKind::Supplier.is_customer());
    }
}
