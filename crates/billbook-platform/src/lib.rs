pub mod books;
pub mod config;
pub mod contracts;

pub use books::{Books, BooksError, PurchaseBook};
pub use config::ServiceConfig;
pub use contracts::{
    CustomerPaymentReceipt, CustomerPaymentRequest, ListQuery, Page, PaymentRequest,
    PurchaseDraft, PurchaseDraftLine, SaleReceipt, SaleRequest, Stored, TaxRequest,
    TotalsRequest,
};
