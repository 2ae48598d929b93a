use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, TenantId, WarehouseId};

const MAX_NAME_LEN: usize = 200;

/// A tenant's stock location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: WarehouseId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehousePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Warehouse {
    /// New warehouses start active.
    pub fn new(
        tenant_id: TenantId,
        id: WarehouseId,
        name: &str,
        location: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            tenant_id,
            name: validate_name(name)?,
            location: normalize_location(location),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply `patch`; absent fields keep their value.
    pub fn apply(&mut self, patch: &WarehousePatch, now: DateTime<Utc>) -> Result<(), DomainError> {
        if let Some(name) = &patch.name {
            self.name = validate_name(name)?;
        }
        if let Some(location) = &patch.location {
            self.location = normalize_location(Some(location.clone()));
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("warehouse name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DomainError::validation("warehouse name is too long"));
    }
    Ok(name.to_string())
}

fn normalize_location(location: Option<String>) -> Option<String> {
    location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}
