pub mod directory;
pub mod events;
pub mod models;
pub mod money;
pub mod search;
pub mod standards;
pub mod storage;

pub use directory::{CustomerDirectory, PartyDirectory};
pub use events::{DomainEvent, DomainEventKind};
pub use models::{
    Customer, CustomerRef, GstRates, InvoiceLine, InvoiceTotals, Party, Payment, Product,
    PurchaseInvoice, PurchaseLine, SalesInvoice, TaxTotals,
};
pub use money::{Amount, accumulate, parse_amount, percent_of, round_money};
pub use search::{MatchKind, Suggestion, Typeahead};
pub use standards::{IndianGstProfile, SupplyKind, TaxProfile};
pub use storage::{Collection, Document, DocumentStore, FieldFilter, FilterOp};
