use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::GstRates;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SupplyKind {
    IntraState,
    InterState,
}

/// Supplies default GST rates. The classification is a hint for pre-filling
/// a form; rates entered on an invoice are never checked against it.
pub trait TaxProfile {
    fn name(&self) -> &'static str;
    fn home_state(&self) -> &str;
    fn default_rates(&self, supply: SupplyKind) -> GstRates;

    fn supply_kind(&self, place_of_supply: &str) -> SupplyKind {
        let place = place_of_supply.trim();
        if place.is_empty() || place.eq_ignore_ascii_case(self.home_state().trim()) {
            SupplyKind::IntraState
        } else {
            SupplyKind::InterState
        }
    }

    fn rates_for(&self, place_of_supply: &str) -> GstRates {
        self.default_rates(self.supply_kind(place_of_supply))
    }
}

#[derive(Debug, Clone)]
pub struct IndianGstProfile {
    home_state: String,
}

impl IndianGstProfile {
    pub fn new(home_state: impl Into<String>) -> Self {
        Self {
            home_state: home_state.into(),
        }
    }
}

impl Default for IndianGstProfile {
    fn default() -> Self {
        Self::new("Maharashtra")
    }
}

impl TaxProfile for IndianGstProfile {
    fn name(&self) -> &'static str {
        "GST-5"
    }

    fn home_state(&self) -> &str {
        &self.home_state
    }

    fn default_rates(&self, supply: SupplyKind) -> GstRates {
        match supply {
            SupplyKind::IntraState => GstRates {
                cgst_rate: Decimal::new(25, 1),
                sgst_rate: Decimal::new(25, 1),
                igst_rate: Decimal::ZERO,
            },
            SupplyKind::InterState => GstRates {
                cgst_rate: Decimal::ZERO,
                sgst_rate: Decimal::ZERO,
                igst_rate: Decimal::new(5, 0),
            },
        }
    }
}
