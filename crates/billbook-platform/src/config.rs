use anyhow::{Context, Result, ensure};

const DEFAULT_PAGE_SIZE: usize = 25;
const DEFAULT_HOME_STATE: &str = "Maharashtra";

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub http_addr: String,
    pub page_size: usize,
    pub home_state: String,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        default_http_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let http_addr = lookup("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string());

        let page_size = match lookup("BILLBOOK_PAGE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("BILLBOOK_PAGE_SIZE must be a whole number, got {raw:?}"))?,
            None => DEFAULT_PAGE_SIZE,
        };
        ensure!(page_size > 0, "BILLBOOK_PAGE_SIZE must be greater than zero");

        let home_state = lookup("BILLBOOK_STATE")
            .map(|state| state.trim().to_string())
            .filter(|state| !state.is_empty())
            .unwrap_or_else(|| DEFAULT_HOME_STATE.to_string());

        Ok(Self {
            http_addr,
            page_size,
            home_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = ServiceConfig::from_lookup("0.0.0.0:8080", lookup(&[])).unwrap();
        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.home_state, "Maharashtra");
    }

    #[test]
    fn overrides_are_read() {
        let config = ServiceConfig::from_lookup(
            "0.0.0.0:8080",
            lookup(&[
                ("HTTP_ADDR", "127.0.0.1:9000"),
                ("BILLBOOK_PAGE_SIZE", " 10 "),
                ("BILLBOOK_STATE", "Karnataka"),
            ]),
        )
        .unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:9000");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.home_state, "Karnataka");
    }

    #[test]
    fn bad_page_sizes_are_rejected() {
        let err = ServiceConfig::from_lookup("x", lookup(&[("BILLBOOK_PAGE_SIZE", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("BILLBOOK_PAGE_SIZE"));

        assert!(ServiceConfig::from_lookup("x", lookup(&[("BILLBOOK_PAGE_SIZE", "0")])).is_err());
    }
}
