use std::collections::HashMap;

use billbook_core::{Party, Payment, PurchaseInvoice, SalesInvoice, accumulate, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The due-amount slice of one stored sales invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DueRecord {
    pub invoice_id: String,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub due_amount: Decimal,
}

impl DueRecord {
    pub fn from_invoice(invoice_id: impl Into<String>, invoice: &SalesInvoice) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            customer_id: invoice.customer.customer_id,
            customer_name: invoice.customer.name.clone(),
            contact_number: invoice.customer.contact_number.clone(),
            address: invoice.customer.address.clone(),
            due_amount: invoice.totals.due_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "camelCase")]
pub enum CustomerKey {
    Id(Uuid),
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DueInvoice {
    pub invoice_id: String,
    pub due_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDue {
    pub key: CustomerKey,
    pub name: String,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub total_due: Decimal,
    pub invoices: Vec<DueInvoice>,
}

/// Groups invoice dues per customer, in first-seen order.
///
/// Records carrying a customer id group by id. Records without one join the
/// id of the first identified record with exactly the same name, or else
/// group by that exact name. Contact details come from the first record of
/// each group.
pub fn aggregate_due_balances(records: &[DueRecord], only_outstanding: bool) -> Vec<CustomerDue> {
    let mut id_by_name: HashMap<&str, Uuid> = HashMap::new();
    for record in records {
        if let Some(id) = record.customer_id {
            id_by_name.entry(record.customer_name.as_str()).or_insert(id);
        }
    }

    let mut slots: HashMap<CustomerKey, usize> = HashMap::new();
    let mut groups: Vec<CustomerDue> = Vec::new();

    for record in records {
        let key = match record.customer_id {
            Some(id) => CustomerKey::Id(id),
            None if record.customer_name.is_empty() => continue,
            None => match id_by_name.get(record.customer_name.as_str()) {
                Some(id) => CustomerKey::Id(*id),
                None => CustomerKey::Name(record.customer_name.clone()),
            },
        };

        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            groups.push(CustomerDue {
                key,
                name: record.customer_name.clone(),
                contact_number: record.contact_number.clone(),
                address: record.address.clone(),
                total_due: Decimal::ZERO,
                invoices: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        accumulate(&mut group.total_due, round_money(record.due_amount));
        group.invoices.push(DueInvoice {
            invoice_id: record.invoice_id.clone(),
            due_amount: record.due_amount,
        });
    }

    if only_outstanding {
        groups.retain(|group| group.total_due > Decimal::ZERO);
    }
    groups
}

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("payment must be greater than zero")]
    NotPositive,
    #[error("payment {amount} exceeds outstanding {outstanding}")]
    ExceedsDue { amount: Decimal, outstanding: Decimal },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub invoice_id: String,
    pub deducted: Decimal,
    pub remaining_due: Decimal,
}

/// Spreads a customer payment over their invoices oldest first, never taking
/// an invoice below zero.
pub fn allocate_payment(
    customer: &CustomerDue,
    amount: Decimal,
) -> Result<Vec<Allocation>, AllocationError> {
    let amount = round_money(amount);
    if amount <= Decimal::ZERO {
        return Err(AllocationError::NotPositive);
    }
    if amount > customer.total_due {
        return Err(AllocationError::ExceedsDue {
            amount,
            outstanding: customer.total_due,
        });
    }

    let mut remaining = amount;
    let mut allocations = Vec::new();
    for invoice in &customer.invoices {
        if remaining <= Decimal::ZERO {
            break;
        }
        if invoice.due_amount <= Decimal::ZERO {
            continue;
        }

        let deducted = remaining.min(invoice.due_amount);
        remaining -= deducted;
        allocations.push(Allocation {
            invoice_id: invoice.invoice_id.clone(),
            deducted,
            remaining_due: invoice.due_amount - deducted,
        });
    }

    Ok(allocations)
}

/// What the business owes one supplier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartyPayable {
    #[serde(flatten)]
    pub party: Party,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub unpaid_amount: Decimal,
}

/// Sums purchase grand totals per exact party name and subtracts payments.
/// Payments to a party with no purchase on record are ignored.
pub fn aggregate_party_payables(
    purchases: &[PurchaseInvoice],
    payments: &[Payment],
) -> Vec<PartyPayable> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut payables: Vec<PartyPayable> = Vec::new();

    for invoice in purchases {
        let party = &invoice.party_details;
        if party.name.is_empty() {
            continue;
        }

        let slot = *slots.entry(party.name.as_str()).or_insert_with(|| {
            payables.push(PartyPayable {
                party: party.clone(),
                total_amount: Decimal::ZERO,
                paid_amount: Decimal::ZERO,
                unpaid_amount: Decimal::ZERO,
            });
            payables.len() - 1
        });
        accumulate(
            &mut payables[slot].total_amount,
            round_money(invoice.totals.grand_total),
        );
    }

    for payment in payments {
        if let Some(slot) = slots.get(payment.party_name.as_str()) {
            accumulate(&mut payables[*slot].paid_amount, round_money(payment.amount));
        }
    }

    for payable in &mut payables {
        payable.unpaid_amount = match payable.total_amount.checked_sub(payable.paid_amount) {
            Some(unpaid) => unpaid,
            None => {
                payable.paid_amount = Decimal::ZERO;
                payable.total_amount
            }
        };
    }
    payables
}
