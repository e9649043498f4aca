use billbook_core::{
    Collection, Customer, CustomerDirectory, Document, DocumentStore, DomainEvent,
    DomainEventKind, FieldFilter, IndianGstProfile, Party, PartyDirectory, Payment, Product,
    PurchaseInvoice, PurchaseLine, SalesInvoice, Suggestion, TaxProfile, Typeahead, accumulate,
    round_money,
};
use billbook_finance::{
    AllocationError, CustomerDue, CustomerKey, DashboardMetrics, DueRecord, Ledger, LedgerEvent,
    LedgerFilter, PartyPayable, aggregate_due_balances, aggregate_party_payables,
    allocate_payment, build_ledger, compute_line_item_totals, dashboard_metrics,
    gst_invoice_totals,
};
use billbook_inventory::ProductCatalog;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::contracts::{
    CustomerPaymentReceipt, CustomerPaymentRequest, ListQuery, Page, PaymentRequest,
    PurchaseDraft, PurchaseDraftLine, SaleReceipt, SaleRequest, Stored,
};

#[derive(Debug, Error)]
pub enum BooksError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BooksError>;

/// The two books that hold supplier invoices. Both store the same record
/// shape and number their invoices independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseBook {
    Purchase,
    Gst,
}

impl PurchaseBook {
    pub fn collection(self) -> Collection {
        match self {
            PurchaseBook::Purchase => Collection::PurchaseInvoices,
            PurchaseBook::Gst => Collection::GstInvoices,
        }
    }
}

pub struct Books<S> {
    store: S,
    tax_profile: IndianGstProfile,
}

impl<S: DocumentStore> Books<S> {
    pub fn new(store: S, tax_profile: IndianGstProfile) -> Self {
        Self { store, tax_profile }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub async fn add_product(&self, product: Product) -> Result<Stored<Product>> {
        if product.product_name.trim().is_empty() {
            return Err(BooksError::Validation("productName is required".to_string()));
        }
        if !product.product_code.is_empty()
            && self.catalog().await?.find_by_code(&product.product_code).is_some()
        {
            return Err(BooksError::Validation(format!(
                "product code {} is already in use",
                product.product_code
            )));
        }

        let stored = self.insert(Collection::Products, &product).await?;
        emit(
            DomainEventKind::ProductAdded,
            Collection::Products,
            &stored.id,
            json!({
                "productName": product.product_name,
                "productCode": product.product_code,
            }),
        );

        Ok(Stored {
            id: stored.id,
            record: product,
        })
    }

    pub async fn list_products(&self) -> Result<Vec<Stored<Product>>> {
        self.load(Collection::Products, &[]).await
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        if !self.store.delete(Collection::Products, id).await? {
            return Err(BooksError::NotFound(format!("product {id}")));
        }

        emit(DomainEventKind::ProductDeleted, Collection::Products, id, Value::Null);
        Ok(())
    }

    pub async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Suggestion<Product>>> {
        Ok(self.catalog().await?.search(query, limit))
    }

    pub async fn product_by_code(&self, code: &str) -> Result<Product> {
        self.catalog()
            .await?
            .find_by_code(code)
            .cloned()
            .ok_or_else(|| BooksError::NotFound(format!("product code {code}")))
    }

    pub async fn record_sale(&self, request: SaleRequest) -> Result<SaleReceipt> {
        let name = request.customer_name.trim();
        if name.is_empty() {
            return Err(BooksError::Validation("customerName is required".to_string()));
        }

        let customer = self
            .resolve_customer(name, &request.contact_number, &request.address)
            .await?;
        let mut customer_ref = customer.to_ref();
        if request.contact_number.is_some() {
            customer_ref.contact_number = request.contact_number.clone();
        }
        if request.address.is_some() {
            customer_ref.address = request.address.clone();
        }

        let line_totals = compute_line_item_totals(&request.items);
        let invoice = SalesInvoice {
            customer: customer_ref,
            products: line_totals.invoice_lines(&request.items),
            totals: line_totals.with_payment(request.paid_amount),
            timestamp: Some(Utc::now()),
        };

        let stored = self.insert(Collection::Invoices, &invoice).await?;
        emit(
            DomainEventKind::SaleRecorded,
            Collection::Invoices,
            &stored.id,
            json!({
                "customerId": customer.id,
                "finalAmount": invoice.totals.final_amount,
                "dueAmount": invoice.totals.due_amount,
            }),
        );

        Ok(SaleReceipt {
            invoice_id: stored.id,
            customer_id: customer.id,
            products: invoice.products,
            totals: invoice.totals,
        })
    }

    /// Sum of dues over every invoice billed to exactly this name.
    pub async fn customer_outstanding(&self, name: &str) -> Result<Decimal> {
        let invoices: Vec<Stored<SalesInvoice>> = self
            .load(Collection::Invoices, &[FieldFilter::eq("customer.name", name)])
            .await?;

        let mut outstanding = Decimal::ZERO;
        for invoice in &invoices {
            accumulate(&mut outstanding, round_money(invoice.record.totals.due_amount));
        }
        Ok(outstanding)
    }

    /// Sales invoices in the order they were recorded, narrowed to customer
    /// names containing `query.q` in any case.
    pub async fn list_sales_invoices(
        &self,
        query: &ListQuery,
        per_page: usize,
    ) -> Result<Page<Stored<SalesInvoice>>> {
        let invoices: Vec<Stored<SalesInvoice>> = self
            .load::<SalesInvoice>(Collection::Invoices, &[])
            .await?
            .into_iter()
            .filter(|invoice| query.admits(&invoice.record.customer.name))
            .collect();

        Ok(Page::paginate(invoices, query.page, per_page))
    }

    pub async fn customer_dues(&self, only_outstanding: bool) -> Result<Vec<CustomerDue>> {
        let records: Vec<DueRecord> = self
            .load::<SalesInvoice>(Collection::Invoices, &[])
            .await?
            .iter()
            .map(|invoice| DueRecord::from_invoice(invoice.id.clone(), &invoice.record))
            .collect();

        Ok(aggregate_due_balances(&records, only_outstanding))
    }

    pub async fn accept_customer_payment(
        &self,
        request: CustomerPaymentRequest,
    ) -> Result<CustomerPaymentReceipt> {
        let dues = self.customer_dues(false).await?;
        let customer = dues
            .iter()
            .find(|due| match request.customer_id {
                Some(id) => due.key == CustomerKey::Id(id),
                None => due.name == request.customer_name.trim(),
            })
            .ok_or_else(|| {
                BooksError::NotFound(format!("customer {}", request.customer_name.trim()))
            })?;

        let allocations = allocate_payment(customer, request.amount.value())?;
        for allocation in &allocations {
            let remaining = serde_json::to_value(allocation.remaining_due)?;
            let document = self
                .store
                .update(
                    Collection::Invoices,
                    &allocation.invoice_id,
                    vec![("totals.dueAmount".to_string(), remaining)],
                )
                .await?;
            emit(
                DomainEventKind::CustomerPaymentAccepted,
                Collection::Invoices,
                &document.id,
                json!({
                    "deducted": allocation.deducted,
                    "remainingDue": allocation.remaining_due,
                }),
            );
        }

        let paid = allocations
            .iter()
            .fold(Decimal::ZERO, |acc, allocation| acc + allocation.deducted);

        Ok(CustomerPaymentReceipt {
            customer_name: customer.name.clone(),
            amount: paid,
            remaining_due: customer.total_due - paid,
            allocations,
        })
    }

    pub async fn next_invoice_number(&self, book: PurchaseBook) -> Result<u64> {
        let invoices: Vec<Stored<PurchaseInvoice>> = self.load(book.collection(), &[]).await?;
        Ok(invoices
            .iter()
            .map(|invoice| invoice.record.invoice_number)
            .max()
            .map_or(1, |highest| highest + 1))
    }

    pub async fn record_purchase(
        &self,
        book: PurchaseBook,
        draft: PurchaseDraft,
    ) -> Result<Stored<PurchaseInvoice>> {
        if draft.party.name.trim().is_empty() {
            return Err(BooksError::Validation("party name is required".to_string()));
        }

        let rows: Vec<&PurchaseDraftLine> = draft
            .products
            .iter()
            .filter(|row| row.is_complete())
            .collect();
        if rows.is_empty() {
            return Err(BooksError::Validation(
                "at least one product with name, size, quantity and rate is required".to_string(),
            ));
        }
        if rows.len() < draft.products.len() {
            warn!(
                dropped = draft.products.len() - rows.len(),
                "incomplete purchase rows left off the invoice"
            );
        }

        let items: Vec<_> = rows.iter().map(|row| row.to_line_item()).collect();
        let rates = draft
            .rates
            .unwrap_or_else(|| self.tax_profile.rates_for(&draft.state));
        let totals = gst_invoice_totals(&items, rates, draft.round_off.value());

        let products = rows
            .iter()
            .zip(&items)
            .map(|(row, item)| PurchaseLine {
                name: item.name.clone(),
                size: row.size.trim().to_string(),
                quantity: item.quantity(),
                rate: item.unit_price(),
                discount: item.discount_percent(),
                amount: item.breakdown().amount,
            })
            .collect();

        let invoice_date = if draft.invoice_date.trim().is_empty() {
            Utc::now().date_naive().format("%Y-%m-%d").to_string()
        } else {
            draft.invoice_date.trim().to_string()
        };

        let invoice = PurchaseInvoice {
            invoice_number: self.next_invoice_number(book).await?,
            invoice_date,
            state: draft.state,
            party_details: draft.party,
            products,
            rates,
            totals,
        };

        let stored = self.insert(book.collection(), &invoice).await?;
        emit(
            DomainEventKind::PurchaseRecorded,
            book.collection(),
            &stored.id,
            json!({
                "invoiceNumber": invoice.invoice_number,
                "party": invoice.party_details.name,
                "grandTotal": invoice.totals.grand_total,
            }),
        );

        Ok(Stored {
            id: stored.id,
            record: invoice,
        })
    }

    /// One book ordered by invoice number, narrowed to party names containing
    /// `query.q` in any case.
    pub async fn list_purchases(
        &self,
        book: PurchaseBook,
        query: &ListQuery,
        per_page: usize,
    ) -> Result<Page<Stored<PurchaseInvoice>>> {
        let mut invoices: Vec<Stored<PurchaseInvoice>> = self
            .load::<PurchaseInvoice>(book.collection(), &[])
            .await?
            .into_iter()
            .filter(|invoice| query.admits(&invoice.record.party_details.name))
            .collect();
        invoices.sort_by_key(|invoice| invoice.record.invoice_number);

        Ok(Page::paginate(invoices, query.page, per_page))
    }

    pub async fn delete_purchase(&self, book: PurchaseBook, id: &str) -> Result<()> {
        let collection = book.collection();
        if !self.store.delete(collection, id).await? {
            return Err(BooksError::NotFound(format!("{} {id}", collection.name())));
        }

        emit(DomainEventKind::PurchaseDeleted, collection, id, Value::Null);
        Ok(())
    }

    pub async fn record_payment(&self, request: PaymentRequest) -> Result<Stored<Payment>> {
        let party_name = request.party_name.trim();
        if party_name.is_empty() {
            return Err(BooksError::Validation("partyName is required".to_string()));
        }
        let amount = round_money(request.amount.value());
        if amount <= Decimal::ZERO {
            return Err(BooksError::Validation(
                "payment amount must be greater than zero".to_string(),
            ));
        }

        let payment = Payment {
            party_name: party_name.to_string(),
            amount,
            mode: request.mode,
            voucher_number: request.voucher_number.filter(|voucher| !voucher.trim().is_empty()),
            date: request
                .date
                .map(|date| date.trim().to_string())
                .filter(|date| !date.is_empty())
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
        };

        let stored = self.insert(Collection::Payments, &payment).await?;
        emit(
            DomainEventKind::PaymentRecorded,
            Collection::Payments,
            &stored.id,
            json!({
                "party": payment.party_name,
                "amount": payment.amount,
            }),
        );

        Ok(Stored {
            id: stored.id,
            record: payment,
        })
    }

    pub async fn party_payables(&self) -> Result<Vec<PartyPayable>> {
        let purchases = self.purchases().await?;
        let payments = self.payments().await?;
        Ok(aggregate_party_payables(&purchases, &payments))
    }

    pub async fn payments_for(&self, party: &str) -> Result<Vec<Stored<Payment>>> {
        self.load(Collection::Payments, &[FieldFilter::eq("partyName", party)])
            .await
    }

    pub async fn party_ledger(
        &self,
        party: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Ledger> {
        self.ledger(LedgerFilter::for_party(party).between(from, to))
            .await
    }

    pub async fn combined_ledger(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Ledger> {
        self.ledger(LedgerFilter::default().between(from, to)).await
    }

    pub async fn party_suggestions(
        &self,
        book: PurchaseBook,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<Suggestion<Party>>> {
        Ok(self.parties(book).await?.search(prefix, limit))
    }

    /// Stored details for an exact party name, used to fill the party form.
    pub async fn resolve_party(&self, book: PurchaseBook, name: &str) -> Result<Party> {
        self.parties(book)
            .await?
            .resolve(name)
            .cloned()
            .ok_or_else(|| BooksError::NotFound(format!("party {name}")))
    }

    pub async fn customer_suggestions(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Suggestion<Customer>>> {
        let customers = self.customers().await?;
        Ok(CustomerDirectory::new(customers).search(query, limit))
    }

    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardMetrics> {
        let invoices: Vec<SalesInvoice> = self
            .load(Collection::Invoices, &[])
            .await?
            .into_iter()
            .map(|invoice: Stored<SalesInvoice>| invoice.record)
            .collect();

        Ok(dashboard_metrics(&invoices, now))
    }

    async fn ledger(&self, filter: LedgerFilter) -> Result<Ledger> {
        let debits: Vec<LedgerEvent> = self
            .load::<PurchaseInvoice>(
                Collection::PurchaseInvoices,
                &date_window("invoiceDate", &filter),
            )
            .await?
            .iter()
            .map(|invoice| LedgerEvent::from_purchase(&invoice.record))
            .collect();
        let credits: Vec<LedgerEvent> = self
            .load::<Payment>(Collection::Payments, &date_window("date", &filter))
            .await?
            .iter()
            .map(|payment| LedgerEvent::from_payment(&payment.record))
            .collect();

        Ok(build_ledger(&filter.apply(&debits), &filter.apply(&credits)))
    }

    async fn resolve_customer(
        &self,
        name: &str,
        contact_number: &Option<String>,
        address: &Option<String>,
    ) -> Result<Customer> {
        let existing: Vec<Stored<Customer>> = self
            .load(Collection::Customers, &[FieldFilter::eq("name", name)])
            .await?;
        if let Some(customer) = existing.into_iter().next() {
            return Ok(customer.record);
        }

        let customer = Customer::new(name.to_string(), contact_number.clone(), address.clone());
        let stored = self.insert(Collection::Customers, &customer).await?;
        emit(
            DomainEventKind::CustomerCreated,
            Collection::Customers,
            &stored.id,
            json!({
                "customerId": customer.id,
                "name": customer.name,
            }),
        );
        Ok(customer)
    }

    async fn catalog(&self) -> Result<ProductCatalog> {
        let products = self
            .list_products()
            .await?
            .into_iter()
            .map(|product| product.record)
            .collect();
        Ok(ProductCatalog::new(products))
    }

    async fn parties(&self, book: PurchaseBook) -> Result<PartyDirectory> {
        let invoices: Vec<Stored<PurchaseInvoice>> = self.load(book.collection(), &[]).await?;
        Ok(PartyDirectory::new(
            invoices.into_iter().map(|invoice| invoice.record.party_details),
        ))
    }

    async fn customers(&self) -> Result<Vec<Customer>> {
        let customers: Vec<Stored<Customer>> = self.load(Collection::Customers, &[]).await?;
        Ok(customers.into_iter().map(|customer| customer.record).collect())
    }

    async fn purchases(&self) -> Result<Vec<PurchaseInvoice>> {
        let invoices: Vec<Stored<PurchaseInvoice>> =
            self.load(Collection::PurchaseInvoices, &[]).await?;
        Ok(invoices.into_iter().map(|invoice| invoice.record).collect())
    }

    async fn payments(&self) -> Result<Vec<Payment>> {
        let payments: Vec<Stored<Payment>> = self.load(Collection::Payments, &[]).await?;
        Ok(payments.into_iter().map(|payment| payment.record).collect())
    }

    async fn load<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> Result<Vec<Stored<T>>> {
        let documents = self.store.query(collection, filters).await?;
        documents
            .iter()
            .map(|document| Stored::decode(document).map_err(BooksError::from))
            .collect()
    }

    async fn insert<T: Serialize>(&self, collection: Collection, record: &T) -> Result<Document> {
        let data = serde_json::to_value(record)?;
        Ok(self.store.insert(collection, data).await?)
    }
}

/// Store-side bounds for a dated ledger load. Stored dates are ISO strings
/// that may carry a UTC offset, so the window is a day wider on each side
/// and `LedgerFilter` makes the exact cut.
fn date_window(path: &str, filter: &LedgerFilter) -> Vec<FieldFilter> {
    let day = |date: NaiveDate| date.format("%Y-%m-%d").to_string();

    let mut filters = Vec::new();
    if let Some(from) = filter.from.and_then(|from| from.pred_opt()) {
        filters.push(FieldFilter::gte(path, day(from)));
    }
    if let Some(to) = filter.to.and_then(|to| to.checked_add_days(Days::new(2))) {
        filters.push(FieldFilter::lte(path, day(to)));
    }
    filters
}

fn emit(kind: DomainEventKind, collection: Collection, document_id: &str, payload: Value) {
    log_event(&DomainEvent::new(kind, collection, document_id, payload));
}

fn log_event(event: &DomainEvent) {
    info!(
        event_id = %event.id,
        kind = ?event.kind,
        collection = event.collection.name(),
        document_id = %event.document_id,
        payload = %event.payload,
        "domain event"
    );
}
