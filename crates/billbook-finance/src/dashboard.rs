use std::collections::{HashMap, HashSet};

use billbook_core::{SalesInvoice, accumulate, round_money};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::dues::CustomerKey;

const TOP_PRODUCTS: usize = 3;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PeriodTotals {
    pub day: Decimal,
    pub week: Decimal,
    pub month: Decimal,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PeriodCounts {
    pub day: u64,
    pub week: u64,
    pub month: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_name: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_sales: PeriodTotals,
    pub total_dues: PeriodTotals,
    pub discounts: PeriodTotals,
    pub invoice_counts: PeriodCounts,
    pub total_customers: usize,
    pub best_selling_products: Vec<ProductSales>,
}

struct Windows {
    day: DateTime<Utc>,
    week: DateTime<Utc>,
    month: DateTime<Utc>,
}

impl Windows {
    /// Day starts at midnight UTC, week on Sunday, month on the 1st.
    fn starting_from(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
        let month_start = today.with_day(1).unwrap_or(today);

        let at_midnight = |date: chrono::NaiveDate| date.and_time(NaiveTime::MIN).and_utc();
        Self {
            day: at_midnight(today),
            week: at_midnight(week_start),
            month: at_midnight(month_start),
        }
    }
}

fn add(totals: &mut PeriodTotals, flags: (bool, bool, bool), amount: Decimal) {
    let amount = round_money(amount);
    if flags.0 {
        accumulate(&mut totals.day, amount);
    }
    if flags.1 {
        accumulate(&mut totals.week, amount);
    }
    if flags.2 {
        accumulate(&mut totals.month, amount);
    }
}

pub fn dashboard_metrics(invoices: &[SalesInvoice], now: DateTime<Utc>) -> DashboardMetrics {
    let windows = Windows::starting_from(now);
    let mut metrics = DashboardMetrics::default();
    let mut customers: HashSet<CustomerKey> = HashSet::new();
    let mut product_slots: HashMap<&str, usize> = HashMap::new();
    let mut products: Vec<ProductSales> = Vec::new();

    for invoice in invoices {
        if let Some(stamp) = invoice.timestamp {
            let flags = (
                stamp >= windows.day,
                stamp >= windows.week,
                stamp >= windows.month,
            );
            add(&mut metrics.total_sales, flags, invoice.totals.final_amount);
            add(&mut metrics.total_dues, flags, invoice.totals.due_amount);
            add(&mut metrics.discounts, flags, invoice.totals.total_discount);
            metrics.invoice_counts.day += u64::from(flags.0);
            metrics.invoice_counts.week += u64::from(flags.1);
            metrics.invoice_counts.month += u64::from(flags.2);
        }

        match (&invoice.customer.customer_id, invoice.customer.name.as_str()) {
            (Some(id), _) => {
                customers.insert(CustomerKey::Id(*id));
            }
            (None, "") => {}
            (None, name) => {
                customers.insert(CustomerKey::Name(name.to_string()));
            }
        }

        for line in &invoice.products {
            if line.product_name.is_empty() {
                continue;
            }
            let slot = *product_slots
                .entry(line.product_name.as_str())
                .or_insert_with(|| {
                    products.push(ProductSales {
                        product_name: line.product_name.clone(),
                        quantity: Decimal::ZERO,
                    });
                    products.len() - 1
                });
            accumulate(&mut products[slot].quantity, line.quantity);
        }
    }

    products.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    products.truncate(TOP_PRODUCTS);

    metrics.total_customers = customers.len();
    metrics.best_selling_products = products;
    metrics
}
