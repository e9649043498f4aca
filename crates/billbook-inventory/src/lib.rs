use billbook_core::Product;
use billbook_core::search::{Suggestion, Typeahead, best_match, normalize_query, rank};
use serde::{Deserialize, Serialize};

/// What a catalog search field reports back for each suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub product_name: String,
    pub product_unit: String,
    pub product_code: String,
}

impl From<&Product> for CatalogEntry {
    fn from(product: &Product) -> Self {
        Self {
            product_name: product.product_name.clone(),
            product_unit: product.product_unit.clone(),
            product_code: product.product_code.clone(),
        }
    }
}

/// Products in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Exact code lookup, as a barcode scan would do it. Blank codes never match.
    pub fn find_by_code(&self, code: &str) -> Option<&Product> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.products
            .iter()
            .find(|product| product.product_code == code)
    }
}

impl Typeahead for ProductCatalog {
    type Item = Product;

    fn search(&self, query: &str, limit: usize) -> Vec<Suggestion<Product>> {
        let query = normalize_query(query);
        let hits = self
            .products
            .iter()
            .filter_map(|product| {
                let fields = [
                    product.product_name.as_str(),
                    product.product_code.as_str(),
                    product.transliterated_name.as_str(),
                ];
                best_match(fields, &query).map(|kind| Suggestion {
                    item: product.clone(),
                    kind,
                })
            })
            .collect();

        rank(hits, limit)
    }
}

#[cfg(test)]
mod tests {
    use billbook_core::MatchKind;

    use super::*;

    fn product(name: &str, code: &str, transliterated: &str) -> Product {
        Product {
            product_name: name.to_string(),
            product_unit: "kg".to_string(),
            product_code: code.to_string(),
            transliterated_name: transliterated.to_string(),
        }
    }

    fn catalog() -> ProductCatalog {
        ProductCatalog::new(vec![
            product("Basmati Rice", "RC01", "बासमती तांदूळ"),
            product("Rice", "RC02", "तांदूळ"),
            product("Rice Flour", "RF01", ""),
            product("Toor Dal", "DL01", "तूर डाळ"),
        ])
    }

    #[test]
    fn exact_then_prefix_then_substring() {
        let names: Vec<_> = catalog()
            .search("rice", 10)
            .into_iter()
            .map(|hit| (hit.item.product_name, hit.kind))
            .collect();

        assert_eq!(
            names,
            vec![
                ("Rice".to_string(), MatchKind::Exact),
                ("Rice Flour".to_string(), MatchKind::Prefix),
                ("Basmati Rice".to_string(), MatchKind::Substring),
            ]
        );
    }

    #[test]
    fn matches_codes_and_transliterations() {
        let catalog = catalog();

        let hits = catalog.search("dl0", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.product_name, "Toor Dal");

        let hits = catalog.search("तांदूळ", 5);
        assert_eq!(hits[0].item.product_name, "Rice");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn limit_and_blank_queries() {
        assert_eq!(catalog().search("r", 2).len(), 2);
        assert!(catalog().search("   ", 10).is_empty());
    }

    #[test]
    fn code_lookup_is_exact() {
        let catalog = catalog();
        assert_eq!(
            catalog.find_by_code("RF01").map(|p| p.product_name.as_str()),
            Some("Rice Flour")
        );
        assert!(catalog.find_by_code("rf01").is_none());
        assert!(catalog.find_by_code("").is_none());
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = CatalogEntry::from(&product("Salt", "SL01", ""));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["productCode"], "SL01");
    }
}
