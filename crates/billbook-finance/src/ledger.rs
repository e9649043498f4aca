use std::cmp::Ordering;

use billbook_core::{Payment, PurchaseInvoice, round_money};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const UNKNOWN_PARTY: &str = "Unknown";

/// A dated money movement with a party: a purchase invoice on the debit
/// side, a payment on the credit side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub party: String,
    pub date: String,
    pub description: String,
    pub amount: Decimal,
}

impl LedgerEvent {
    pub fn new(
        party: impl Into<String>,
        date: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            party: party.into(),
            date: date.into(),
            description: description.into(),
            amount,
        }
    }

    pub fn from_purchase(invoice: &PurchaseInvoice) -> Self {
        Self::new(
            party_or_unknown(&invoice.party_details.name),
            invoice.invoice_date.clone(),
            format!("Purchase Invoice #{}", invoice.invoice_number),
            invoice.totals.grand_total,
        )
    }

    pub fn from_payment(payment: &Payment) -> Self {
        Self::new(
            party_or_unknown(&payment.party_name),
            payment.date.clone(),
            format!(
                "Payment ({}) #{}",
                payment.mode,
                payment.voucher_number.as_deref().unwrap_or("-")
            ),
            payment.amount,
        )
    }
}

fn party_or_unknown(name: &str) -> String {
    if name.trim().is_empty() {
        UNKNOWN_PARTY.to_string()
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub party: String,
    pub date: String,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub entries: Vec<LedgerEntry>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub final_balance: Decimal,
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS`.
/// Everything is read as UTC.
pub fn parse_ledger_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.naive_utc());
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(stamp);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Merges debits and credits into date order and carries a running balance
/// of `credit - debit`. Entries on the same date keep input order, debits
/// before credits; undated entries go last.
pub fn build_ledger(debits: &[LedgerEvent], credits: &[LedgerEvent]) -> Ledger {
    let mut rows: Vec<(Option<NaiveDateTime>, LedgerEntry)> = debits
        .iter()
        .map(|event| (event, round_money(event.amount), Decimal::ZERO))
        .chain(
            credits
                .iter()
                .map(|event| (event, Decimal::ZERO, round_money(event.amount))),
        )
        .map(|(event, debit, credit)| {
            (
                parse_ledger_date(&event.date),
                LedgerEntry {
                    party: event.party.clone(),
                    date: event.date.clone(),
                    description: event.description.clone(),
                    debit,
                    credit,
                    balance: Decimal::ZERO,
                },
            )
        })
        .collect();

    rows.sort_by(|(left, _), (right, _)| match (left, right) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut ledger = Ledger::default();
    for (_, mut entry) in rows {
        // An amount that would overflow the running figures is booked as zero.
        let sums = entry
            .credit
            .checked_sub(entry.debit)
            .and_then(|movement| ledger.final_balance.checked_add(movement))
            .zip(ledger.total_debit.checked_add(entry.debit))
            .zip(ledger.total_credit.checked_add(entry.credit));
        match sums {
            Some(((balance, debit), credit)) => {
                ledger.final_balance = balance;
                ledger.total_debit = debit;
                ledger.total_credit = credit;
            }
            None => {
                entry.debit = Decimal::ZERO;
                entry.credit = Decimal::ZERO;
            }
        }
        entry.balance = ledger.final_balance;
        ledger.entries.push(entry);
    }

    ledger
}

/// Narrows events to one party and/or an inclusive range of calendar days.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerFilter {
    pub party: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl LedgerFilter {
    pub fn for_party(party: impl Into<String>) -> Self {
        Self {
            party: Some(party.into()),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn admits(&self, event: &LedgerEvent) -> bool {
        if self.party.as_ref().is_some_and(|party| &event.party != party) {
            return false;
        }

        if self.from.is_none() && self.to.is_none() {
            return true;
        }

        let Some(day) = parse_ledger_date(&event.date).map(|stamp| stamp.date()) else {
            return false;
        };
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }

    pub fn apply(&self, events: &[LedgerEvent]) -> Vec<LedgerEvent> {
        events
            .iter()
            .filter(|event| self.admits(event))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use billbook_core::{Party, TaxTotals};
    use rust_decimal_macros::dec;

    use super::*;

    fn event(party: &str, date: &str, amount: Decimal) -> LedgerEvent {
        LedgerEvent::new(party, date, format!("{party} {date}"), amount)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn running_balance_follows_dates() {
        let ledger = build_ledger(
            &[event("Shree Traders", "2024-01-05", dec!(500))],
            &[event("Shree Traders", "2024-01-10", dec!(200))],
        );

        let balances: Vec<_> = ledger.entries.iter().map(|entry| entry.balance).collect();
        assert_eq!(balances, vec![dec!(-500), dec!(-300)]);
        assert_eq!(ledger.total_debit, dec!(500));
        assert_eq!(ledger.total_credit, dec!(200));
        assert_eq!(ledger.final_balance, dec!(-300));
    }

    #[test]
    fn credits_before_debits_when_earlier() {
        let ledger = build_ledger(
            &[event("A", "2024-03-01", dec!(100))],
            &[event("A", "2024-02-01T09:30:00.000Z", dec!(40))],
        );

        assert_eq!(ledger.entries[0].credit, dec!(40));
        assert_eq!(ledger.entries[0].balance, dec!(40));
        assert_eq!(ledger.entries[1].balance, dec!(-60));
    }

    #[test]
    fn same_day_keeps_input_order() {
        let ledger = build_ledger(
            &[
                event("A", "2024-01-05", dec!(10)),
                event("B", "2024-01-05", dec!(20)),
            ],
            &[event("C", "2024-01-05", dec!(5))],
        );

        let parties: Vec<_> = ledger
            .entries
            .iter()
            .map(|entry| entry.party.as_str())
            .collect();
        assert_eq!(parties, vec!["A", "B", "C"]);
    }

    #[test]
    fn undated_entries_sink_to_the_end() {
        let ledger = build_ledger(
            &[event("A", "someday", dec!(10)), event("B", "2024-01-05", dec!(20))],
            &[],
        );

        assert_eq!(ledger.entries[0].party, "B");
        assert_eq!(ledger.entries[1].party, "A");
        assert_eq!(ledger.final_balance, dec!(-30));
    }

    #[test]
    fn amounts_that_overflow_the_balance_book_as_zero() {
        let ledger = build_ledger(
            &[
                event("A", "2024-01-01", Decimal::MAX),
                event("A", "2024-01-02", Decimal::MAX),
            ],
            &[event("A", "2024-01-03", Decimal::MIN)],
        );

        assert_eq!(ledger.entries.len(), 3);
        assert_eq!(ledger.entries[0].debit, Decimal::MAX);
        assert_eq!(ledger.entries[1].debit, Decimal::ZERO);
        assert_eq!(ledger.entries[2].credit, Decimal::ZERO);
        assert_eq!(ledger.total_debit, Decimal::MAX);
        assert_eq!(ledger.final_balance, -Decimal::MAX);
        assert_eq!(ledger.entries[2].balance, -Decimal::MAX);
    }

    #[test]
    fn empty_ledger() {
        let ledger = build_ledger(&[], &[]);
        assert!(ledger.entries.is_empty());
        assert_eq!(ledger.final_balance, Decimal::ZERO);
    }

    #[test]
    fn parses_supported_date_shapes() {
        let midnight = day(2024, 1, 5).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_ledger_date("2024-01-05"), Some(midnight));
        assert_eq!(parse_ledger_date("2024-01-05T00:00:00Z"), Some(midnight));
        assert_eq!(parse_ledger_date("2024-01-05T05:30:00+05:30"), Some(midnight));
        assert_eq!(parse_ledger_date("2024-01-05T00:00:00"), Some(midnight));
        assert_eq!(parse_ledger_date("05/01/2024"), None);
    }

    #[test]
    fn filter_by_party_and_inclusive_days() {
        let events = vec![
            event("A", "2024-01-01", dec!(1)),
            event("A", "2024-01-31T23:59:00Z", dec!(2)),
            event("A", "2024-02-01", dec!(3)),
            event("B", "2024-01-15", dec!(4)),
            event("A", "", dec!(5)),
        ];

        let filter = LedgerFilter::for_party("A")
            .between(Some(day(2024, 1, 1)), Some(day(2024, 1, 31)));
        let kept: Vec<_> = filter
            .apply(&events)
            .iter()
            .map(|event| event.amount)
            .collect();
        assert_eq!(kept, vec![dec!(1), dec!(2)]);

        let everything = LedgerFilter::default().apply(&events);
        assert_eq!(everything.len(), 5);
    }

    #[test]
    fn projects_stored_records() {
        let invoice = PurchaseInvoice {
            invoice_number: 12,
            invoice_date: "2024-01-05".to_string(),
            party_details: Party::default(),
            totals: TaxTotals {
                grand_total: dec!(1050),
                ..TaxTotals::default()
            },
            ..PurchaseInvoice::default()
        };
        let debit = LedgerEvent::from_purchase(&invoice);
        assert_eq!(debit.party, "Unknown");
        assert_eq!(debit.description, "Purchase Invoice #12");
        assert_eq!(debit.amount, dec!(1050));

        let payment = Payment {
            party_name: "Shree Traders".to_string(),
            amount: dec!(300),
            mode: "UPI".to_string(),
            voucher_number: Some("V-9".to_string()),
            date: "2024-01-10".to_string(),
        };
        let credit = LedgerEvent::from_payment(&payment);
        assert_eq!(credit.description, "Payment (UPI) #V-9");
    }
}
