//! Production items on the shop floor

use crate::entity::{guard_transition, Entity, EntityAction, EntityKind};
use crate::error::TransitionError;
use crate::{EntityId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    #[default]
    Scheduled,
    MaterialPreparation,
    InProgress,
    QualityCheck,
    Completed,
    OnHold,
    Cancelled,
    Rejected,
}

impl ProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStatus::Scheduled => "scheduled",
            ProductionStatus::MaterialPreparation => "material_preparation",
            ProductionStatus::InProgress => "in_progress",
            ProductionStatus::QualityCheck => "quality_check",
            ProductionStatus::Completed => "completed",
            ProductionStatus::OnHold => "on_hold",
            ProductionStatus::Cancelled => "cancelled",
            ProductionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ProductionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionItem {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub product_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub status: ProductionStatus,
    #[serde(default)]
    pub progress_percentage: u8,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductionItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProductionItem {
    pub product_name: String,
    pub quantity: u32,
}

impl Entity for ProductionItem {
    type Patch = ProductionItemPatch;
    type Draft = NewProductionItem;
    type Action = ProductionAction;

    const KIND: EntityKind = EntityKind::ProductionItem;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn apply_patch(&mut self, patch: &ProductionItemPatch) {
        if let Some(name) = &patch.product_name {
            self.product_name = name.clone();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(stage) = &patch.current_stage {
            self.current_stage = Some(stage.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductionAction {
    Start,
    Complete,
    UpdateProgress { percentage: u8 },
}

impl EntityAction<ProductionItem> for ProductionAction {
    fn segment(&self) -> &'static str {
        match self {
            ProductionAction::Start => "start",
            ProductionAction::Complete => "complete",
            ProductionAction::UpdateProgress { .. } => "progress",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ProductionAction::Start => "Start",
            ProductionAction::Complete => "Complete",
            ProductionAction::UpdateProgress { .. } => "Update Progress",
        }
    }

    fn completed(&self) -> &'static str {
        match self {
            ProductionAction::Start => "started",
            ProductionAction::Complete => "completed",
            ProductionAction::UpdateProgress { .. } => "progress updated",
        }
    }

    fn body(&self) -> Value {
        match self {
            ProductionAction::UpdateProgress { percentage } => {
                json!({ "progress_percentage": percentage })
            }
            _ => json!({}),
        }
    }

    fn apply_optimistic(&self, current: &ProductionItem) -> Result<ProductionItem, TransitionError> {
        use ProductionStatus::*;

        let mut next = current.clone();
        match self {
            ProductionAction::Start => {
                guard_transition(
                    EntityKind::ProductionItem,
                    "start",
                    &current.status,
                    &[Scheduled, MaterialPreparation, OnHold],
                )?;
                next.status = InProgress;
            }
            ProductionAction::Complete => {
                guard_transition(
                    EntityKind::ProductionItem,
                    "complete",
                    &current.status,
                    &[InProgress, QualityCheck],
                )?;
                next.status = Completed;
                next.progress_percentage = 100;
            }
            ProductionAction::UpdateProgress { percentage } => {
                if *percentage > 100 {
                    return Err(TransitionError::InvalidArgument {
                        action: "progress",
                        reason: format!("percentage must be within 0..=100, got {}", percentage),
                    });
                }
                guard_transition(
                    EntityKind::ProductionItem,
                    "progress",
                    &current.status,
                    &[InProgress],
                )?;
                next.progress_percentage = *percentage;
            }
        }
        Ok(next)
    }
}
