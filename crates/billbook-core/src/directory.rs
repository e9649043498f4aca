use std::collections::HashSet;

use crate::models::{Customer, Party};
use crate::search::{Suggestion, Typeahead, best_match, normalize_query, rank};

/// Customer name lookup for the billing screen.
#[derive(Debug, Clone, Default)]
pub struct CustomerDirectory {
    customers: Vec<Customer>,
}

impl CustomerDirectory {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self { customers }
    }

    /// Exact, case-sensitive name lookup.
    pub fn find(&self, name: &str) -> Option<&Customer> {
        self.customers.iter().find(|customer| customer.name == name)
    }
}

impl Typeahead for CustomerDirectory {
    type Item = Customer;

    fn search(&self, query: &str, limit: usize) -> Vec<Suggestion<Customer>> {
        let query = normalize_query(query);
        let mut seen = HashSet::new();

        let hits = self
            .customers
            .iter()
            .filter(|customer| seen.insert(customer.name.to_lowercase()))
            .filter_map(|customer| {
                best_match([customer.name.as_str()], &query).map(|kind| Suggestion {
                    item: customer.clone(),
                    kind,
                })
            })
            .collect();

        rank(hits, limit)
    }
}

/// Supplier lookup for purchase and GST invoices.
#[derive(Debug, Clone, Default)]
pub struct PartyDirectory {
    parties: Vec<Party>,
}

impl PartyDirectory {
    /// Keeps the first record seen for each exact party name.
    pub fn new(parties: impl IntoIterator<Item = Party>) -> Self {
        let mut seen = HashSet::new();
        let parties = parties
            .into_iter()
            .filter(|party| !party.name.is_empty() && seen.insert(party.name.clone()))
            .collect();
        Self { parties }
    }

    pub fn resolve(&self, name: &str) -> Option<&Party> {
        self.parties.iter().find(|party| party.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.parties.iter().map(|party| party.name.clone()).collect()
    }
}

impl Typeahead for PartyDirectory {
    type Item = Party;

    fn search(&self, query: &str, limit: usize) -> Vec<Suggestion<Party>> {
        let query = normalize_query(query);
        let hits = self
            .parties
            .iter()
            .filter_map(|party| {
                best_match([party.name.as_str()], &query).map(|kind| Suggestion {
                    item: party.clone(),
                    kind,
                })
            })
            .collect();

        rank(hits, limit)
    }
}
