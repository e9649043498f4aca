use billbook_core::{Amount, Document, GstRates, InvoiceLine, InvoiceTotals, Party};
use billbook_finance::{Allocation, LineItem};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored record together with its document id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub record: T,
}

impl<T: DeserializeOwned> Stored<T> {
    pub fn decode(document: &Document) -> serde_json::Result<Self> {
        Ok(Self {
            id: document.id.clone(),
            record: document.decode()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub customer_name: String,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "products")]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub paid_amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub invoice_id: String,
    pub customer_id: Uuid,
    pub products: Vec<InvoiceLine>,
    pub totals: InvoiceTotals,
}

/// One row of the purchase form before it is validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDraftLine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub quantity: Amount,
    #[serde(default)]
    pub rate: Amount,
    #[serde(default)]
    pub discount: Amount,
}

impl PurchaseDraftLine {
    /// Rows missing a name or size, or without a positive quantity and rate,
    /// are left off the invoice.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.size.trim().is_empty()
            && self.quantity.value() > Decimal::ZERO
            && self.rate.value() > Decimal::ZERO
    }

    pub fn to_line_item(&self) -> LineItem {
        LineItem::new(self.name.trim(), self.rate, self.quantity, self.discount)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDraft {
    #[serde(default)]
    pub invoice_date: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, alias = "partyDetails")]
    pub party: Party,
    #[serde(default)]
    pub products: Vec<PurchaseDraftLine>,
    /// Falls back to the tax profile's rates for `state` when absent.
    #[serde(default)]
    pub rates: Option<GstRates>,
    #[serde(default)]
    pub round_off: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub party_name: String,
    pub amount: Amount,
    #[serde(default = "default_payment_mode")]
    pub mode: String,
    #[serde(default)]
    pub voucher_number: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Identifies the customer by id when known, by exact name otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPaymentRequest {
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub customer_name: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPaymentReceipt {
    pub customer_name: String,
    pub amount: Decimal,
    pub allocations: Vec<Allocation>,
    pub remaining_due: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsRequest {
    #[serde(default, alias = "products")]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub paid_amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRequest {
    #[serde(default)]
    pub total_amount: Amount,
    #[serde(default)]
    pub cgst_rate: Amount,
    #[serde(default)]
    pub sgst_rate: Amount,
    #[serde(default)]
    pub igst_rate: Amount,
    #[serde(default)]
    pub round_off: Amount,
}

impl TaxRequest {
    pub fn rates(&self) -> GstRates {
        GstRates {
            cgst_rate: self.cgst_rate.value(),
            sgst_rate: self.sgst_rate.value(),
            igst_rate: self.igst_rate.value(),
        }
    }
}

/// Search text and page number for the invoice lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub page: usize,
}

impl ListQuery {
    pub fn search(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            page: 1,
        }
    }

    /// Case-insensitive substring match; a blank query admits everything.
    pub fn admits(&self, name: &str) -> bool {
        let needle = self.q.trim().to_lowercase();
        needle.is_empty() || name.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Pages are numbered from 1; page 0 is read as page 1.
    pub fn paginate(items: Vec<T>, page: usize, per_page: usize) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(per_page);

        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();

        Self {
            items,
            page,
            per_page,
            total_items,
            total_pages,
        }
    }
}

fn default_payment_mode() -> String {
    "Cash".to_string()
}
