use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Collection {
    Invoices,
    Products,
    PurchaseInvoices,
    Payments,
    GstInvoices,
    Customers,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Invoices => "invoices",
            Collection::Products => "products",
            Collection::PurchaseInvoices => "PurchaseInvoices",
            Collection::Payments => "Payments",
            Collection::GstInvoices => "GSTInvoices",
            Collection::Customers => "customers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

/// A condition on a dotted field path such as `partyDetails.name`.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub path: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }

    pub fn lte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            op: FilterOp::Lte,
            value: value.into(),
        }
    }

    pub fn matches(&self, data: &Value) -> bool {
        let Some(field) = field_at(data, &self.path) else {
            return false;
        };

        match self.op {
            FilterOp::Eq => field == &self.value,
            FilterOp::Gte => matches!(
                compare_values(field, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lte => matches!(
                compare_values(field, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// Resolves a dotted path inside a JSON document.
pub fn field_at<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(data, |current, segment| current.get(segment))
}

/// Writes `value` at a dotted path, creating intermediate objects.
pub fn set_field(data: &mut Value, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = data;
    for segment in segments {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
            _ => return,
        };
    }

    if !current.is_object() {
        *current = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.data)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: Collection, data: Value) -> anyhow::Result<Document>;
    async fn get(&self, collection: Collection, id: &str) -> anyhow::Result<Option<Document>>;
    /// Applies field-path assignments, e.g. `("totals.dueAmount", "0.00")`.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        changes: Vec<(String, Value)>,
    ) -> anyhow::Result<Document>;
    async fn delete(&self, collection: Collection, id: &str) -> anyhow::Result<bool>;
    /// Returns documents matching every filter, in insertion order.
    async fn query(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> anyhow::Result<Vec<Document>>;
}
