use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::Collection;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DomainEventKind {
    ProductAdded,
    ProductDeleted,
    CustomerCreated,
    SaleRecorded,
    CustomerPaymentAccepted,
    PurchaseRecorded,
    PurchaseDeleted,
    PaymentRecorded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub collection: Collection,
    pub document_id: String,
    pub kind: DomainEventKind,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(
        kind: DomainEventKind,
        collection: Collection,
        document_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection,
            document_id: document_id.into(),
            kind,
            occurred_at: Utc::now(),
            payload,
        }
    }
}
