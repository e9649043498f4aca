//! Invoice totals, GST, running ledgers and outstanding balances.
//!
//! Everything here is synchronous and pure: callers load records, hand them
//! in, and persist or render what comes back. Monetary outputs are rounded to
//! cents as they are produced.

pub mod dashboard;
pub mod dues;
pub mod ledger;
pub mod tax;
pub mod totals;

pub use dashboard::{DashboardMetrics, PeriodCounts, PeriodTotals, ProductSales, dashboard_metrics};
pub use dues::{
    Allocation, AllocationError, CustomerDue, CustomerKey, DueInvoice, DueRecord, PartyPayable,
    aggregate_due_balances, aggregate_party_payables, allocate_payment,
};
pub use ledger::{
    Ledger, LedgerEntry, LedgerEvent, LedgerFilter, build_ledger, parse_ledger_date,
};
pub use tax::{TaxBreakdown, compute_tax_totals, gst_invoice_totals};
pub use totals::{LineAmount, LineItem, LineItemTotals, compute_line_item_totals};
