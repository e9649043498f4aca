use std::{
    cmp::{max, min},
    net::SocketAddr,
    sync::Arc,
};

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use billbook_core::{
    Customer, IndianGstProfile, InvoiceTotals, Party, Payment, Product, PurchaseInvoice,
    SalesInvoice, Suggestion,
};
use billbook_finance::{
    CustomerDue, DashboardMetrics, LineAmount, Ledger, PartyPayable, TaxBreakdown,
    compute_line_item_totals, compute_tax_totals,
};
use billbook_inventory::CatalogEntry;
use billbook_platform::{
    Books, BooksError, CustomerPaymentReceipt, CustomerPaymentRequest, ListQuery, Page,
    PaymentRequest, PurchaseBook, PurchaseDraft, SaleReceipt, SaleRequest, ServiceConfig, Stored,
    TaxRequest, TotalsRequest,
};
use billbook_store::InMemoryDocumentStore;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

const DEFAULT_SUGGESTION_LIMIT: usize = 10;
const MAX_SUGGESTION_LIMIT: usize = 50;

#[derive(Clone)]
struct AppState {
    books: Arc<Books<InMemoryDocumentStore>>,
    page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct PartySuggestQuery {
    book: Option<PurchaseBook>,
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct PartyDetailsQuery {
    book: Option<PurchaseBook>,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DuesQuery {
    page: Option<usize>,
    all: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct OutstandingQuery {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PaymentsQuery {
    party: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LedgerQuery {
    party: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutstandingResponse {
    customer_name: String,
    due_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextNumberResponse {
    invoice_number: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TotalsResponse {
    lines: Vec<LineAmount>,
    total_quantity: Decimal,
    totals: InvoiceTotals,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "billbook_gateway=info,billbook_platform=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let books = Books::new(
        InMemoryDocumentStore::new(),
        IndianGstProfile::new(config.home_state.clone()),
    );

    let state = AppState {
        books: Arc::new(books),
        page_size: config.page_size,
    };
    let router = router(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!(
        "gateway listening on {} (home state {}, page size {})",
        addr, config.home_state, config.page_size
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/products", get(list_products).post(add_product))
        .route("/products/search", get(search_products))
        .route("/products/code/{code}", get(product_by_code))
        .route("/products/{id}", delete(delete_product))
        .route("/invoices", get(list_sales_invoices).post(record_sale))
        .route("/customers/dues", get(customer_dues))
        .route("/customers/suggest", get(customer_suggestions))
        .route("/customers/outstanding", get(customer_outstanding))
        .route("/customers/payments", post(accept_customer_payment))
        .route("/purchases/{book}/next-number", get(next_invoice_number))
        .route("/purchases/{book}", get(list_purchases).post(record_purchase))
        .route("/purchases/{book}/{id}", delete(delete_purchase))
        .route("/parties/suggest", get(party_suggestions))
        .route("/parties/details", get(party_details))
        .route("/parties/payables", get(party_payables))
        .route("/payments", get(payments_for).post(record_payment))
        .route("/ledger", get(party_ledger))
        .route("/ledger/combined", get(combined_ledger))
        .route("/dashboard", get(dashboard))
        .route("/engine/totals", post(engine_totals))
        .route("/engine/tax", post(engine_tax))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn add_product(
    State(state): State<AppState>,
    Json(payload): Json<Product>,
) -> Result<(StatusCode, Json<Stored<Product>>), (StatusCode, String)> {
    let stored = state.books.add_product(payload).await.map_err(books_error)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Stored<Product>>>, (StatusCode, String)> {
    let products = state.books.list_products().await.map_err(books_error)?;
    Ok(Json(products))
}

async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Suggestion<CatalogEntry>>>, (StatusCode, String)> {
    let hits = state
        .books
        .search_products(query.q.as_deref().unwrap_or_default(), suggestion_limit(query.limit))
        .await
        .map_err(books_error)?;

    Ok(Json(
        hits.iter()
            .map(|hit| Suggestion {
                item: CatalogEntry::from(&hit.item),
                kind: hit.kind,
            })
            .collect(),
    ))
}

async fn product_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Product>, (StatusCode, String)> {
    let product = state.books.product_by_code(&code).await.map_err(books_error)?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.books.delete_product(&id).await.map_err(books_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_sales_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Stored<SalesInvoice>>>, (StatusCode, String)> {
    let page = state
        .books
        .list_sales_invoices(&query, state.page_size)
        .await
        .map_err(books_error)?;
    Ok(Json(page))
}

async fn record_sale(
    State(state): State<AppState>,
    Json(payload): Json<SaleRequest>,
) -> Result<(StatusCode, Json<SaleReceipt>), (StatusCode, String)> {
    let receipt = state.books.record_sale(payload).await.map_err(books_error)?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn customer_dues(
    State(state): State<AppState>,
    Query(query): Query<DuesQuery>,
) -> Result<Json<Page<CustomerDue>>, (StatusCode, String)> {
    let only_outstanding = !query.all.unwrap_or(false);
    let dues = state
        .books
        .customer_dues(only_outstanding)
        .await
        .map_err(books_error)?;

    Ok(Json(Page::paginate(
        dues,
        query.page.unwrap_or(1),
        state.page_size,
    )))
}

async fn customer_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Suggestion<Customer>>>, (StatusCode, String)> {
    let hits = state
        .books
        .customer_suggestions(query.q.as_deref().unwrap_or_default(), suggestion_limit(query.limit))
        .await
        .map_err(books_error)?;
    Ok(Json(hits))
}

async fn customer_outstanding(
    State(state): State<AppState>,
    Query(query): Query<OutstandingQuery>,
) -> Result<Json<OutstandingResponse>, (StatusCode, String)> {
    let due_amount = state
        .books
        .customer_outstanding(&query.name)
        .await
        .map_err(books_error)?;

    Ok(Json(OutstandingResponse {
        customer_name: query.name,
        due_amount,
    }))
}

async fn accept_customer_payment(
    State(state): State<AppState>,
    Json(payload): Json<CustomerPaymentRequest>,
) -> Result<Json<CustomerPaymentReceipt>, (StatusCode, String)> {
    let receipt = state
        .books
        .accept_customer_payment(payload)
        .await
        .map_err(books_error)?;
    Ok(Json(receipt))
}

async fn next_invoice_number(
    State(state): State<AppState>,
    Path(book): Path<PurchaseBook>,
) -> Result<Json<NextNumberResponse>, (StatusCode, String)> {
    let invoice_number = state
        .books
        .next_invoice_number(book)
        .await
        .map_err(books_error)?;
    Ok(Json(NextNumberResponse { invoice_number }))
}

async fn list_purchases(
    State(state): State<AppState>,
    Path(book): Path<PurchaseBook>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Stored<PurchaseInvoice>>>, (StatusCode, String)> {
    let page = state
        .books
        .list_purchases(book, &query, state.page_size)
        .await
        .map_err(books_error)?;
    Ok(Json(page))
}

async fn record_purchase(
    State(state): State<AppState>,
    Path(book): Path<PurchaseBook>,
    Json(payload): Json<PurchaseDraft>,
) -> Result<(StatusCode, Json<Stored<PurchaseInvoice>>), (StatusCode, String)> {
    let stored = state
        .books
        .record_purchase(book, payload)
        .await
        .map_err(books_error)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn delete_purchase(
    State(state): State<AppState>,
    Path((book, id)): Path<(PurchaseBook, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .books
        .delete_purchase(book, &id)
        .await
        .map_err(books_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn party_suggestions(
    State(state): State<AppState>,
    Query(query): Query<PartySuggestQuery>,
) -> Result<Json<Vec<Suggestion<Party>>>, (StatusCode, String)> {
    let hits = state
        .books
        .party_suggestions(
            query.book.unwrap_or(PurchaseBook::Gst),
            query.q.as_deref().unwrap_or_default(),
            suggestion_limit(query.limit),
        )
        .await
        .map_err(books_error)?;
    Ok(Json(hits))
}

async fn party_details(
    State(state): State<AppState>,
    Query(query): Query<PartyDetailsQuery>,
) -> Result<Json<Party>, (StatusCode, String)> {
    let party = state
        .books
        .resolve_party(query.book.unwrap_or(PurchaseBook::Gst), &query.name)
        .await
        .map_err(books_error)?;
    Ok(Json(party))
}

async fn party_payables(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PartyPayable>>, (StatusCode, String)> {
    let payables = state.books.party_payables().await.map_err(books_error)?;
    Ok(Json(Page::paginate(
        payables,
        query.page.unwrap_or(1),
        state.page_size,
    )))
}

async fn record_payment(
    State(state): State<AppState>,
    Json(payload): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<Stored<Payment>>), (StatusCode, String)> {
    let stored = state.books.record_payment(payload).await.map_err(books_error)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn payments_for(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<Vec<Stored<Payment>>>, (StatusCode, String)> {
    let payments = state
        .books
        .payments_for(&query.party)
        .await
        .map_err(books_error)?;
    Ok(Json(payments))
}

async fn party_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Ledger>, (StatusCode, String)> {
    let Some(party) = query.party.filter(|party| !party.trim().is_empty()) else {
        return Err((StatusCode::BAD_REQUEST, "party is required".to_string()));
    };

    let ledger = state
        .books
        .party_ledger(&party, query.from, query.to)
        .await
        .map_err(books_error)?;
    Ok(Json(ledger))
}

async fn combined_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Ledger>, (StatusCode, String)> {
    let ledger = state
        .books
        .combined_ledger(query.from, query.to)
        .await
        .map_err(books_error)?;
    Ok(Json(ledger))
}

async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardMetrics>, (StatusCode, String)> {
    let metrics = state
        .books
        .dashboard(Utc::now())
        .await
        .map_err(books_error)?;
    Ok(Json(metrics))
}

async fn engine_totals(Json(payload): Json<TotalsRequest>) -> Json<TotalsResponse> {
    let totals = compute_line_item_totals(&payload.items);
    Json(TotalsResponse {
        total_quantity: totals.total_quantity,
        totals: totals.with_payment(payload.paid_amount),
        lines: totals.lines,
    })
}

async fn engine_tax(Json(payload): Json<TaxRequest>) -> Json<TaxBreakdown> {
    Json(compute_tax_totals(
        payload.total_amount.value(),
        payload.rates(),
        payload.round_off.value(),
    ))
}

fn suggestion_limit(requested: Option<usize>) -> usize {
    min(
        max(requested.unwrap_or(DEFAULT_SUGGESTION_LIMIT), 1),
        MAX_SUGGESTION_LIMIT,
    )
}

fn books_error(err: BooksError) -> (StatusCode, String) {
    match err {
        BooksError::Validation(_) | BooksError::Allocation(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        BooksError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        BooksError::Store(_) | BooksError::Serialization(_) => {
            error!("books operation failed: {}", err);
            internal_error(err)
        }
    }
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[cfg(test)]
mod tests {
    use billbook_finance::LineItem;
    use billbook_platform::PurchaseDraftLine;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn state() -> AppState {
        AppState {
            books: Arc::new(Books::new(
                InMemoryDocumentStore::new(),
                IndianGstProfile::default(),
            )),
            page_size: 2,
        }
    }

    async fn sell(state: &AppState, customer: &str, price: Decimal) -> SaleReceipt {
        let request = SaleRequest {
            customer_name: customer.to_string(),
            contact_number: None,
            address: None,
            items: vec![LineItem::new("Rice", price, dec!(1), dec!(0))],
            paid_amount: dec!(0).into(),
        };
        let (status, Json(receipt)) = record_sale(State(state.clone()), Json(request))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        receipt
    }

    #[tokio::test]
    async fn dues_are_paged() {
        let state = state();
        for (customer, price) in [("A", dec!(10)), ("B", dec!(20)), ("C", dec!(30))] {
            sell(&state, customer, price).await;
        }

        let Json(page) = customer_dues(
            State(state.clone()),
            Query(DuesQuery {
                page: Some(2),
                all: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "C");
    }

    #[tokio::test]
    async fn overpaying_a_customer_is_a_bad_request() {
        let state = state();
        sell(&state, "Asha", dec!(100)).await;

        let err = accept_customer_payment(
            State(state.clone()),
            Json(CustomerPaymentRequest {
                customer_id: None,
                customer_name: "Asha".to_string(),
                amount: dec!(500).into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let Json(outstanding) = customer_outstanding(
            State(state),
            Query(OutstandingQuery {
                name: "Asha".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(outstanding.due_amount, dec!(100));
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let state = state();
        let err = product_by_code(State(state.clone()), Path("NOPE".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let err = delete_purchase(
            State(state),
            Path((PurchaseBook::Purchase, "missing".to_string())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn purchase_then_ledger() {
        let state = state();
        let draft = PurchaseDraft {
            invoice_date: "2024-01-05".to_string(),
            state: "Maharashtra".to_string(),
            party: Party {
                name: "Shree Traders".to_string(),
                ..Party::default()
            },
            products: vec![PurchaseDraftLine {
                name: "Cement".to_string(),
                size: "50kg".to_string(),
                quantity: dec!(5).into(),
                rate: dec!(100).into(),
                discount: dec!(0).into(),
            }],
            ..PurchaseDraft::default()
        };
        let (status, _) = record_purchase(
            State(state.clone()),
            Path(PurchaseBook::Purchase),
            Json(draft),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(next) = next_invoice_number(State(state.clone()), Path(PurchaseBook::Purchase))
            .await
            .unwrap();
        assert_eq!(next.invoice_number, 2);

        let Json(ledger) = party_ledger(
            State(state.clone()),
            Query(LedgerQuery {
                party: Some("Shree Traders".to_string()),
                from: None,
                to: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(ledger.final_balance, dec!(-525));

        let err = party_ledger(
            State(state),
            Query(LedgerQuery {
                party: None,
                from: None,
                to: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn engine_endpoints_coerce_form_input() {
        let request: TotalsRequest = serde_json::from_value(json!({
            "items": [{ "name": "Rice", "unitPrice": "100", "quantity": "2", "discountPercent": "10" }],
            "paidAmount": ""
        }))
        .unwrap();
        let Json(response) = engine_totals(Json(request)).await;
        assert_eq!(response.totals.final_amount, dec!(180));
        assert_eq!(response.totals.due_amount, dec!(180));

        let request: TaxRequest = serde_json::from_value(json!({
            "totalAmount": 1000,
            "cgstRate": "2.5",
            "sgstRate": "2.5",
            "igstRate": "",
            "roundOff": null
        }))
        .unwrap();
        let Json(tax) = engine_tax(Json(request)).await;
        assert_eq!(tax.grand_total, dec!(1050));
    }

    #[tokio::test]
    async fn engine_endpoints_survive_out_of_range_input() {
        let request: TotalsRequest = serde_json::from_value(json!({
            "items": [
                { "name": "Gold", "unitPrice": "1e20", "quantity": "1e20" },
                { "name": "Dust", "unitPrice": 1e30, "quantity": "1" },
                { "name": "Rice", "unitPrice": "100", "quantity": "2" }
            ],
            "paidAmount": "-79228162514264337593543950335"
        }))
        .unwrap();
        let Json(response) = engine_totals(Json(request)).await;
        assert_eq!(response.lines.len(), 3);
        assert_eq!(response.totals.final_amount, dec!(200));
        assert_eq!(response.total_quantity, dec!(3));

        let request: TaxRequest = serde_json::from_value(json!({
            "totalAmount": "79228162514264337593543950335",
            "cgstRate": "5",
            "roundOff": "79228162514264337593543950335"
        }))
        .unwrap();
        let Json(tax) = engine_tax(Json(request)).await;
        assert_eq!(tax.total_tax, Decimal::ZERO);
        assert_eq!(tax.round_off, Decimal::ZERO);
        assert_eq!(tax.grand_total, Decimal::MAX);
    }

    #[tokio::test]
    async fn invoice_lists_and_product_removal() {
        let state = state();
        for (customer, price) in [("Asha", dec!(10)), ("Ravi", dec!(20)), ("asha k", dec!(30))] {
            sell(&state, customer, price).await;
        }

        let Json(page) = list_sales_invoices(
            State(state.clone()),
            Query(ListQuery {
                q: "asha".to_string(),
                page: 1,
            }),
        )
        .await
        .unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.per_page, 2);

        let Json(purchases) = list_purchases(
            State(state.clone()),
            Path(PurchaseBook::Gst),
            Query(ListQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(purchases.total_items, 0);

        let (_, Json(product)) = add_product(
            State(state.clone()),
            Json(Product {
                product_name: "Rice".to_string(),
                ..Product::default()
            }),
        )
        .await
        .unwrap();
        let status = delete_product(State(state.clone()), Path(product.id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = delete_product(State(state), Path(product.id))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(suggestion_limit(None), DEFAULT_SUGGESTION_LIMIT);
        assert_eq!(suggestion_limit(Some(0)), 1);
        assert_eq!(suggestion_limit(Some(500)), MAX_SUGGESTION_LIMIT);
    }
}
