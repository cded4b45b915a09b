//! Quote entity and the negotiation workflow

use crate::entity::{guard_transition, Entity, EntityAction, EntityKind};
use crate::error::TransitionError;
use crate::{EntityId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Open,
    Sent,
    Countered,
    Accepted,
    Rejected,
    /// Only ever set by the backend.
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Open => "open",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Countered => "countered",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Accepted | QuoteStatus::Rejected | QuoteStatus::Expired
        )
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub quote_number: String,
    pub customer_name: String,
    #[serde(default)]
    pub vendor_id: Option<EntityId>,
    #[serde(default)]
    pub status: QuoteStatus,
    /// Minor currency units.
    pub grand_total: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grand_total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewQuote {
    pub customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<EntityId>,
    pub grand_total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entity for Quote {
    type Patch = QuotePatch;
    type Draft = NewQuote;
    type Action = QuoteAction;

    const KIND: EntityKind = EntityKind::Quote;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn apply_patch(&mut self, patch: &QuotePatch) {
        if let Some(customer) = &patch.customer_name {
            self.customer_name = customer.clone();
        }
        if let Some(vendor) = &patch.vendor_id {
            self.vendor_id = Some(vendor.clone());
        }
        if let Some(total) = patch.grand_total {
            self.grand_total = total;
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteAction {
    Send,
    Accept { notes: Option<String> },
    Reject { reason: Option<String> },
    Counter { price: i64, notes: Option<String> },
}

const NEGOTIABLE: [QuoteStatus; 3] = [QuoteStatus::Open, QuoteStatus::Sent, QuoteStatus::Countered];

impl EntityAction<Quote> for QuoteAction {
    fn segment(&self) -> &'static str {
        match self {
            QuoteAction::Send => "send",
            QuoteAction::Accept { .. } => "accept",
            QuoteAction::Reject { .. } => "reject",
            QuoteAction::Counter { .. } => "counter",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            QuoteAction::Send => "Send",
            QuoteAction::Accept { .. } => "Accept",
            QuoteAction::Reject { .. } => "Reject",
            QuoteAction::Counter { .. } => "Counter",
        }
    }

    fn completed(&self) -> &'static str {
        match self {
            QuoteAction::Send => "sent",
            QuoteAction::Accept { .. } => "accepted",
            QuoteAction::Reject { .. } => "rejected",
            QuoteAction::Counter { .. } => "countered",
        }
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        match self {
            QuoteAction::Send => {}
            QuoteAction::Accept { notes } => {
                if let Some(notes) = notes {
                    body.insert("notes".to_string(), json!(notes));
                }
            }
            QuoteAction::Reject { reason } => {
                if let Some(reason) = reason {
                    body.insert("reason".to_string(), json!(reason));
                }
            }
            QuoteAction::Counter { price, notes } => {
                body.insert("price".to_string(), json!(price));
                if let Some(notes) = notes {
                    body.insert("notes".to_string(), json!(notes));
                }
            }
        }
        Value::Object(body)
    }

    fn apply_optimistic(&self, current: &Quote) -> Result<Quote, TransitionError> {
        let mut next = current.clone();
        match self {
            QuoteAction::Send => {
                guard_transition(
                    EntityKind::Quote,
                    "send",
                    &current.status,
                    &[QuoteStatus::Draft, QuoteStatus::Open],
                )?;
                next.status = QuoteStatus::Sent;
            }
            QuoteAction::Accept { .. } => {
                guard_transition(EntityKind::Quote, "accept", &current.status, &NEGOTIABLE)?;
                next.status = QuoteStatus::Accepted;
            }
            QuoteAction::Reject { .. } => {
                guard_transition(EntityKind::Quote, "reject", &current.status, &NEGOTIABLE)?;
                next.status = QuoteStatus::Rejected;
            }
            QuoteAction::Counter { price, .. } => {
                if *price < 0 {
                    return Err(TransitionError::InvalidArgument {
                        action: "counter",
                        reason: format!("price must not be negative, got {}", price),
                    });
                }
                guard_transition(EntityKind::Quote, "counter", &current.status, &NEGOTIABLE)?;
                next.status = QuoteStatus::Countered;
                next.grand_total = *price;
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(status: QuoteStatus) -> Quote {
        Quote {
            id: EntityId::from("q-7"),
            tenant_id: TenantId::new_v4(),
            quote_number: "QT-0007".to_string(),
            customer_name: "Globex".to_string(),
            vendor_id: Some(EntityId::from("3")),
            status,
            grand_total: 1_000_000,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn counter_sets_the_grand_total() {
        let countered = QuoteAction::Counter {
            price: 900_000,
            notes: Some("best offer".to_string()),
        }
        .apply_optimistic(&quote(QuoteStatus::Sent))
        .unwrap();
        assert_eq!(countered.status, QuoteStatus::Countered);
        assert_eq!(countered.grand_total, 900_000);
    }

    #[test]
    fn countered_quotes_can_still_be_accepted() {
        let accepted = QuoteAction::Accept { notes: None }
            .apply_optimistic(&quote(QuoteStatus::Countered))
            .unwrap();
        assert_eq!(accepted.status, QuoteStatus::Accepted);
        assert!(accepted.status.is_terminal());
    }

    #[test]
    fn terminal_and_draft_quotes_reject_negotiation() {
        for status in [QuoteStatus::Draft, QuoteStatus::Accepted, QuoteStatus::Expired] {
            let result = QuoteAction::Reject { reason: None }.apply_optimistic(&quote(status));
            assert!(matches!(result, Err(TransitionError::NotAllowed { .. })));
        }
    }

    #[test]
    fn negative_counter_price_is_invalid() {
        let result = QuoteAction::Counter {
            price: -1,
            notes: None,
        }
        .apply_optimistic(&quote(QuoteStatus::Open));
        assert!(matches!(
            result,
            Err(TransitionError::InvalidArgument { action: "counter", .. })
        ));
    }

    #[test]
    fn bodies_omit_absent_fields() {
        assert_eq!(QuoteAction::Accept { notes: None }.body(), json!({}));
        assert_eq!(
            QuoteAction::Counter {
                price: 5,
                notes: None
            }
            .body(),
            json!({ "price": 5 })
        );
    }
}
