use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: String, contact_number: Option<String>, address: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            contact_number,
            address,
            created_at: Utc::now(),
        }
    }

    pub fn to_ref(&self) -> CustomerRef {
        CustomerRef {
            customer_id: Some(self.id),
            name: self.name.clone(),
            contact_number: self.contact_number.clone(),
            address: self.address.clone(),
        }
    }
}

/// Customer details as embedded in a sales invoice. Older invoices carry no id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// A supplier on the purchase side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub gstin: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_name: String,
    #[serde(default)]
    pub product_unit: String,
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub transliterated_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceTotals {
    pub total_amount: Decimal,
    pub total_discount: Decimal,
    pub final_amount: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesInvoice {
    #[serde(default)]
    pub customer: CustomerRef,
    #[serde(default)]
    pub products: Vec<InvoiceLine>,
    #[serde(default)]
    pub totals: InvoiceTotals,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GstRates {
    pub cgst_rate: Decimal,
    pub sgst_rate: Decimal,
    pub igst_rate: Decimal,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxTotals {
    pub total_quantity: Decimal,
    pub total_amount: Decimal,
    pub total_discount: Decimal,
    pub taxable_amount: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_tax: Decimal,
    pub round_off: Decimal,
    pub grand_total: Decimal,
}

/// Stored in both the purchase book and the GST invoice book.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInvoice {
    #[serde(default)]
    pub invoice_number: u64,
    #[serde(default)]
    pub invoice_date: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub party_details: Party,
    #[serde(default)]
    pub products: Vec<PurchaseLine>,
    #[serde(flatten)]
    pub rates: GstRates,
    #[serde(default)]
    pub totals: TaxTotals,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub party_name: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub voucher_number: Option<String>,
    #[serde(default)]
    pub date: String,
}
