//! Vendor entity

use crate::entity::{Entity, EntityKind, NoAction};
use crate::{EntityId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a vendor relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VendorStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

/// Size bucket computed by the backend from `total_orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub status: VendorStatus,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub total_orders: u32,
    /// Server-derived; never part of a patch.
    #[serde(default)]
    pub company_size: Option<CompanySize>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VendorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VendorStatus>,
}

impl VendorPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewVendor {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Entity for Vendor {
    type Patch = VendorPatch;
    type Draft = NewVendor;
    type Action = NoAction;

    const KIND: EntityKind = EntityKind::Vendor;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn apply_patch(&mut self, patch: &VendorPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(address) = &patch.address {
            self.address = Some(address.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_payload_with_company_size() {
        let tenant = TenantId::new_v4();
        let json = serde_json::json!({
            "id": 1,
            "tenant_id": tenant,
            "name": "Boundary Vendor",
            "email": "boundary@vendor.com",
            "total_orders": 100,
            "company_size": "large",
            "status": "active",
            "created_at": "2024-01-01T00:00:00Z"
        });
        let vendor: Vendor = serde_json::from_value(json).unwrap();
        assert_eq!(vendor.id.as_str(), "1");
        assert_eq!(vendor.company_size, Some(CompanySize::Large));
        assert_eq!(vendor.total_orders, 100);
    }

    #[test]
    fn patch_only_serializes_present_fields() {
        let patch = VendorPatch::name("New Name");
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "name": "New Name" })
        );
    }
}
