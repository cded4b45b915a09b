//! Invoice entity and its payment lifecycle

use crate::entity::{guard_transition, Entity, EntityAction, EntityKind};
use crate::error::TransitionError;
use crate::{EntityId, TenantId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    /// Set by the backend once `due_date` passes.
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub invoice_number: String,
    pub customer_name: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    /// Minor currency units.
    pub total_amount: i64,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvoicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewInvoice {
    pub customer_name: String,
    pub total_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entity for Invoice {
    type Patch = InvoicePatch;
    type Draft = NewInvoice;
    type Action = InvoiceAction;

    const KIND: EntityKind = EntityKind::Invoice;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn apply_patch(&mut self, patch: &InvoicePatch) {
        if let Some(customer) = &patch.customer_name {
            self.customer_name = customer.clone();
        }
        if let Some(amount) = patch.total_amount {
            self.total_amount = amount;
        }
        if let Some(due) = patch.due_date {
            self.due_date = Some(due);
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
    }
}

/// Server-side invoice transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceAction {
    Send,
    MarkPaid,
    Cancel { reason: Option<String> },
}

impl EntityAction<Invoice> for InvoiceAction {
    fn segment(&self) -> &'static str {
        match self {
            InvoiceAction::Send => "send",
            InvoiceAction::MarkPaid => "mark-paid",
            InvoiceAction::Cancel { .. } => "cancel",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            InvoiceAction::Send => "Send",
            InvoiceAction::MarkPaid => "Mark Paid",
            InvoiceAction::Cancel { .. } => "Cancel",
        }
    }

    fn completed(&self) -> &'static str {
        match self {
            InvoiceAction::Send => "sent",
            InvoiceAction::MarkPaid => "marked as paid",
            InvoiceAction::Cancel { .. } => "cancelled",
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            InvoiceAction::Cancel {
                reason: Some(reason),
            } => json!({ "reason": reason }),
            _ => json!({}),
        }
    }

    fn apply_optimistic(&self, current: &Invoice) -> Result<Invoice, TransitionError> {
        use InvoiceStatus::*;

        let (allowed, next): (&[InvoiceStatus], InvoiceStatus) = match self {
            InvoiceAction::Send => (&[Draft], Sent),
            InvoiceAction::MarkPaid => (&[Sent, Overdue], Paid),
            InvoiceAction::Cancel { .. } => (&[Draft, Sent, Overdue], Cancelled),
        };
        guard_transition(EntityKind::Invoice, self.segment(), &current.status, allowed)?;

        let mut next_invoice = current.clone();
        next_invoice.status = next;
        Ok(next_invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(status: InvoiceStatus) -> Invoice {
        Invoice {
            id: EntityId::from("inv-1"),
            tenant_id: TenantId::new_v4(),
            invoice_number: "INV-0001".to_string(),
            customer_name: "Acme".to_string(),
            status,
            total_amount: 150_000,
            due_date: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn send_then_pay() {
        let sent = InvoiceAction::Send
            .apply_optimistic(&invoice(InvoiceStatus::Draft))
            .unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);

        let paid = InvoiceAction::MarkPaid.apply_optimistic(&sent).unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
    }

    #[test]
    fn paid_invoices_cannot_be_cancelled() {
        let err = InvoiceAction::Cancel { reason: None }
            .apply_optimistic(&invoice(InvoiceStatus::Paid))
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel Invoice while it is paid");
    }

    #[test]
    fn cancel_body_carries_the_reason() {
        let action = InvoiceAction::Cancel {
            reason: Some("duplicate".to_string()),
        };
        assert_eq!(action.segment(), "cancel");
        assert_eq!(action.body(), json!({ "reason": "duplicate" }));
        assert_eq!(InvoiceAction::MarkPaid.segment(), "mark-paid");
    }
}
