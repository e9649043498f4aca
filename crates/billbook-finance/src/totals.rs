use billbook_core::{Amount, InvoiceLine, InvoiceTotals, percent_of, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product row as entered on an invoice form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, alias = "productName")]
    pub name: String,
    #[serde(default, alias = "price", alias = "rate")]
    pub unit_price: Amount,
    #[serde(default)]
    pub quantity: Amount,
    #[serde(default, alias = "discount")]
    pub discount_percent: Amount,
}

impl LineItem {
    pub fn new(
        name: impl Into<String>,
        unit_price: impl Into<Amount>,
        quantity: impl Into<Amount>,
        discount_percent: impl Into<Amount>,
    ) -> Self {
        Self {
            name: name.into(),
            unit_price: unit_price.into(),
            quantity: quantity.into(),
            discount_percent: discount_percent.into(),
        }
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price.non_negative()
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity.non_negative()
    }

    pub fn discount_percent(&self) -> Decimal {
        self.discount_percent.clamp_percent()
    }

    /// A row whose gross or discount is out of the `Decimal` range counts as
    /// an empty row.
    pub fn breakdown(&self) -> LineAmount {
        self.checked_breakdown().unwrap_or_default()
    }

    fn checked_breakdown(&self) -> Option<LineAmount> {
        let exact_gross = self.unit_price().checked_mul(self.quantity())?;
        let gross = round_money(exact_gross);
        let discount = round_money(percent_of(exact_gross, self.discount_percent())?);

        Some(LineAmount {
            gross,
            discount,
            amount: gross - discount,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineAmount {
    pub gross: Decimal,
    pub discount: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItemTotals {
    pub lines: Vec<LineAmount>,
    pub total_quantity: Decimal,
    pub total_amount: Decimal,
    pub total_discount: Decimal,
    pub final_amount: Decimal,
}

impl LineItemTotals {
    /// Completes the totals with what the customer paid. The due amount goes
    /// negative on overpayment. A payment too large to subtract reads as zero.
    pub fn with_payment(&self, paid: impl Into<Amount>) -> InvoiceTotals {
        let paid_amount = round_money(paid.into().value());
        let (paid_amount, due_amount) = match self.final_amount.checked_sub(paid_amount) {
            Some(due) => (paid_amount, due),
            None => (Decimal::ZERO, self.final_amount),
        };

        InvoiceTotals {
            total_amount: self.total_amount,
            total_discount: self.total_discount,
            final_amount: self.final_amount,
            paid_amount,
            due_amount,
        }
    }

    fn push(&mut self, quantity: Decimal, line: Option<LineAmount>) {
        let sums = line.and_then(|line| {
            Some((
                line,
                self.total_quantity.checked_add(quantity)?,
                self.total_amount.checked_add(line.gross)?,
                self.total_discount.checked_add(line.discount)?,
            ))
        });

        match sums {
            Some((line, quantity, amount, discount)) => {
                self.total_quantity = quantity;
                self.total_amount = amount;
                self.total_discount = discount;
                self.lines.push(line);
            }
            None => self.lines.push(LineAmount::default()),
        }
    }

    /// Pairs each input row with its computed amount for storage.
    pub fn invoice_lines(&self, items: &[LineItem]) -> Vec<InvoiceLine> {
        items
            .iter()
            .zip(&self.lines)
            .map(|(item, line)| InvoiceLine {
                product_name: item.name.clone(),
                price: item.unit_price(),
                quantity: item.quantity(),
                discount: item.discount_percent(),
                amount: line.amount,
            })
            .collect()
    }
}

/// Rows that would push a running total out of the `Decimal` range are
/// counted as empty rows, so `final_amount` is always
/// `total_amount - total_discount`.
pub fn compute_line_item_totals(items: &[LineItem]) -> LineItemTotals {
    let mut totals = items
        .iter()
        .fold(LineItemTotals::default(), |mut acc, item| {
            acc.push(item.quantity(), item.checked_breakdown());
            acc
        });

    totals.final_amount = totals.total_amount - totals.total_discount;
    totals
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn discounted_line() {
        let totals =
            compute_line_item_totals(&[LineItem::new("Rice", dec!(100), dec!(2), dec!(10))]);

        assert_eq!(totals.lines[0].amount, dec!(180.00));
        assert_eq!(totals.total_amount, dec!(200.00));
        assert_eq!(totals.total_discount, dec!(20.00));
        assert_eq!(totals.final_amount, dec!(180.00));
    }

    #[test]
    fn zero_lines_leave_only_the_payment() {
        let items = vec![LineItem::default(), LineItem::new("", dec!(0), dec!(0), dec!(0))];
        let totals = compute_line_item_totals(&items).with_payment(dec!(50));

        assert_eq!(totals.final_amount, Decimal::ZERO);
        assert_eq!(totals.due_amount, dec!(-50));
    }

    #[test]
    fn empty_input_is_all_zero() {
        let totals = compute_line_item_totals(&[]);
        assert!(totals.lines.is_empty());
        assert_eq!(totals.total_amount, Decimal::ZERO);
        assert_eq!(totals.with_payment(Amount::ZERO).due_amount, Decimal::ZERO);
    }

    #[test]
    fn form_rows_coerce_blank_fields() {
        let items: Vec<LineItem> = serde_json::from_value(json!([
            { "productName": "Dal", "price": "80", "quantity": "1.5", "discount": "" },
            { "productName": "Oil", "price": "", "quantity": "3", "discount": "5" },
            { "productName": "Ghee", "price": "abc", "quantity": 2 },
        ]))
        .unwrap();

        let totals = compute_line_item_totals(&items);
        assert_eq!(totals.total_amount, dec!(120.00));
        assert_eq!(totals.total_discount, Decimal::ZERO);
        assert_eq!(totals.total_quantity, dec!(6.5));
    }

    #[test]
    fn out_of_range_inputs_are_bounded() {
        let item = LineItem::new("Soap", dec!(-10), dec!(3), dec!(150));
        assert_eq!(item.breakdown(), LineAmount::default());

        let item = LineItem::new("Soap", dec!(10), dec!(3), dec!(150));
        assert_eq!(item.breakdown().amount, Decimal::ZERO);
    }

    #[test]
    fn overpayment_is_not_clamped() {
        let totals = compute_line_item_totals(&[LineItem::new("Tea", dec!(45.5), dec!(2), dec!(0))])
            .with_payment(dec!(100));
        assert_eq!(totals.due_amount, dec!(-9.00));
    }

    #[test]
    fn stored_lines_follow_inputs() {
        let items = vec![LineItem::new("Rice", dec!(100), dec!(2), dec!(10))];
        let lines = compute_line_item_totals(&items).invoice_lines(&items);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_name, "Rice");
        assert_eq!(lines[0].amount, dec!(180));
    }

    #[test]
    fn rows_past_the_decimal_range_count_as_empty() {
        let items: Vec<LineItem> = serde_json::from_value(json!([
            { "name": "Gold", "price": "79228162514264337593543950335", "quantity": "2" },
            { "name": "Rice", "price": "100", "quantity": "2", "discount": "10" },
        ]))
        .unwrap();

        let totals = compute_line_item_totals(&items);
        assert_eq!(totals.lines[0], LineAmount::default());
        assert_eq!(totals.lines[1].amount, dec!(180));
        assert_eq!(totals.total_quantity, dec!(2));
        assert_eq!(totals.final_amount, dec!(180));
    }

    #[test]
    fn scientific_inputs_that_overflow_are_dropped() {
        let item = LineItem::new("Bulk", Amount::parse("1e20"), Amount::parse("1e20"), dec!(0));
        assert_eq!(item.breakdown(), LineAmount::default());

        let item = LineItem::new("Bulk", Amount::parse("1e30"), dec!(3), dec!(0));
        assert_eq!(item.unit_price(), Decimal::ZERO);
        assert_eq!(item.breakdown(), LineAmount::default());
    }

    #[test]
    fn running_totals_stop_short_of_overflow() {
        let items = vec![
            LineItem::new("A", Decimal::MAX, dec!(1), dec!(0)),
            LineItem::new("B", Decimal::MAX, dec!(1), dec!(0)),
            LineItem::new("C", dec!(5), dec!(1), dec!(0)),
        ];

        let totals = compute_line_item_totals(&items);
        assert_eq!(totals.lines[0].gross, Decimal::MAX);
        assert_eq!(totals.lines[1], LineAmount::default());
        assert_eq!(totals.lines[2], LineAmount::default());
        assert_eq!(totals.total_amount, Decimal::MAX);
        assert_eq!(totals.total_quantity, dec!(1));
        assert_eq!(totals.final_amount, Decimal::MAX);

        let with_payment = totals.with_payment(Decimal::MIN);
        assert_eq!(with_payment.paid_amount, Decimal::ZERO);
        assert_eq!(with_payment.due_amount, Decimal::MAX);
    }

    fn arb_item() -> impl Strategy<Value = LineItem> {
        (0u64..1_000_000u64, 0u32..500u32, 0u32..=100u32).prop_map(|(cents, qty, pct)| {
            LineItem::new(
                "item",
                Decimal::new(cents as i64, 2),
                Decimal::from(qty),
                Decimal::from(pct),
            )
        })
    }

    proptest! {
        #[test]
        fn final_is_total_minus_discount(items in prop::collection::vec(arb_item(), 0..12)) {
            let totals = compute_line_item_totals(&items);
            prop_assert_eq!(totals.final_amount, totals.total_amount - totals.total_discount);
            prop_assert!(totals.total_discount <= totals.total_amount);
        }

        #[test]
        fn huge_magnitudes_never_panic(
            prices in prop::collection::vec((0u32..29u32, 0u32..29u32, 0u32..=100u32), 0..6)
        ) {
            let items: Vec<LineItem> = prices
                .iter()
                .map(|(price_exp, qty_exp, pct)| {
                    LineItem::new(
                        "bulk",
                        Amount::parse(&format!("7e{price_exp}")),
                        Amount::parse(&format!("9e{qty_exp}")),
                        Decimal::from(*pct),
                    )
                })
                .collect();

            let totals = compute_line_item_totals(&items);
            prop_assert_eq!(totals.lines.len(), items.len());
            prop_assert_eq!(totals.final_amount, totals.total_amount - totals.total_discount);
            let _ = totals.with_payment(Decimal::MAX);
        }
    }
}
