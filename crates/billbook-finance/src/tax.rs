use billbook_core::{GstRates, TaxTotals, percent_of, round_money};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::totals::{LineItem, compute_line_item_totals};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_tax: Decimal,
    pub round_off: Decimal,
    pub grand_total: Decimal,
}

/// Applies the three GST components to an amount that is already net of
/// discount. CGST/SGST and IGST are independent; nothing stops all three from
/// being set. `round_off` is added as entered.
///
/// Tax that cannot be represented as a `Decimal` is zero, and so is a
/// round-off that would push the grand total out of range. The breakdown
/// reports the round-off it applied.
pub fn compute_tax_totals(taxable: Decimal, rates: GstRates, round_off: Decimal) -> TaxBreakdown {
    let base = round_money(taxable);
    let (cgst, sgst, igst, total_tax) = tax_components(taxable, base, rates).unwrap_or_default();
    let (round_off, grand_total) = match (base + total_tax).checked_add(round_off) {
        Some(grand) => (round_off, grand),
        None => (Decimal::ZERO, base + total_tax),
    };

    TaxBreakdown {
        cgst,
        sgst,
        igst,
        total_tax,
        round_off,
        grand_total: round_money(grand_total),
    }
}

/// The rounded components and their sum, or `None` when any of them (or the
/// taxed total) leaves the `Decimal` range.
fn tax_components(
    taxable: Decimal,
    base: Decimal,
    rates: GstRates,
) -> Option<(Decimal, Decimal, Decimal, Decimal)> {
    let component = |rate: Decimal| percent_of(taxable, rate).map(round_money);

    let cgst = component(rates.cgst_rate)?;
    let sgst = component(rates.sgst_rate)?;
    let igst = component(rates.igst_rate)?;
    let total_tax = cgst.checked_add(sgst)?.checked_add(igst)?;
    base.checked_add(total_tax)?;

    Some((cgst, sgst, igst, total_tax))
}

/// Totals for a whole GST invoice: line amounts, discount, tax and round-off.
pub fn gst_invoice_totals(items: &[LineItem], rates: GstRates, round_off: Decimal) -> TaxTotals {
    let lines = compute_line_item_totals(items);
    let tax = compute_tax_totals(lines.final_amount, rates, round_off);

    TaxTotals {
        total_quantity: lines.total_quantity,
        total_amount: lines.total_amount,
        total_discount: lines.total_discount,
        taxable_amount: lines.final_amount,
        cgst: tax.cgst,
        sgst: tax.sgst,
        igst: tax.igst,
        total_tax: tax.total_tax,
        round_off: tax.round_off,
        grand_total: tax.grand_total,
    }
}
