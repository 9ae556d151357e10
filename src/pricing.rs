//! Unit-price resolution against the price-table snapshot.

use tracing::{debug, warn};

use crate::columns::{price_cell, PriceField};
use crate::text::{normalize_product_code, parse_price};

/// Order-id prefix marking a reseller order.
pub const DEFAULT_RESELLER_PREFIX: &str = "MAVC";

/// Read-only view over the price sheet, header row first.
#[derive(Debug, Clone, Copy)]
pub struct PriceTable<'a> {
    rows: &'a [Vec<String>],
    reseller_prefix: &'a str,
}

impl<'a> PriceTable<'a> {
    pub fn new(rows: &'a [Vec<String>], reseller_prefix: &'a str) -> Self {
        Self {
            rows,
            reseller_prefix,
        }
    }

    /// An empty table; every lookup falls through to the order's own price.
    pub fn empty() -> PriceTable<'static> {
        PriceTable {
            rows: &[],
            reseller_prefix: DEFAULT_RESELLER_PREFIX,
        }
    }

    fn is_reseller(&self, order_id: &str) -> bool {
        !self.reseller_prefix.is_empty()
            && order_id
                .trim()
                .to_uppercase()
                .starts_with(&self.reseller_prefix.to_uppercase())
    }

    /// Resolve the unit price for an order.
    ///
    /// The first table row whose normalized product code matches and whose
    /// selected column parses to a positive amount wins. Otherwise the order's
    /// own stored price is used. Returns 0 when neither yields a price.
    pub fn resolve(&self, order_id: &str, product_code: &str, fallback: Option<&str>) -> u64 {
        let wanted = normalize_product_code(product_code);
        let column = if self.is_reseller(order_id) {
            PriceField::ResellerPrice
        } else {
            PriceField::RetailPrice
        };

        if !wanted.is_empty() {
            for row in self.rows.iter().skip(1) {
                if normalize_product_code(price_cell(row, PriceField::ProductCode)) != wanted {
                    continue;
                }
                let raw = price_cell(row, column);
                match parse_price(raw) {
                    Ok(amount) if amount > 0 => {
                        debug!(order_id, product_code, amount, "price resolved from table");
                        return amount;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(order_id, product_code, raw, "unparsable table price: {}", e);
                        continue;
                    }
                }
            }
        }

        let fallback = fallback.map(str::trim).unwrap_or("");
        match parse_price(fallback) {
            Ok(amount) => amount,
            Err(e) => {
                warn!(order_id, raw = fallback, "unparsable order price: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Vec<String>> {
        [
            ["product", "reseller", "retail"],
            ["Netflix--12m", "900.000 đ", "1.200.000 đ"],
            ["Spotify\u{2014}6m", "0", "abc"],
            ["spotify-6m", "150,000", "200,000"],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
    }

    #[test]
    fn selects_retail_or_reseller_column() {
        let rows = table();
        let prices = PriceTable::new(&rows, DEFAULT_RESELLER_PREFIX);
        assert_eq!(prices.resolve("MAVL123", "Netflix\u{2013} 12m", None), 1_200_000);
        assert_eq!(prices.resolve("mavc123", "netflix--12m", None), 900_000);
    }

    #[test]
    fn skips_non_positive_matches_and_keeps_scanning() {
        let rows = table();
        let prices = PriceTable::new(&rows, DEFAULT_RESELLER_PREFIX);
        assert_eq!(prices.resolve("MAVC1", "Spotify-6m", None), 150_000);
        assert_eq!(prices.resolve("MAVL1", "Spotify-6m", None), 200_000);
    }

    #[test]
    fn falls_back_to_order_price_then_zero() {
        let rows = table();
        let prices = PriceTable::new(&rows, DEFAULT_RESELLER_PREFIX);
        assert_eq!(prices.resolve("MAVL1", "Unknown", Some("350.000 đ")), 350_000);
        assert_eq!(prices.resolve("MAVL1", "Unknown", Some("  ")), 0);
        assert_eq!(prices.resolve("MAVL1", "Unknown", None), 0);
        assert_eq!(PriceTable::empty().resolve("MAVL1", "Netflix", Some("10")), 10);
    }

    #[test]
    fn lookup_is_repeatable() {
        let rows = table();
        let prices = PriceTable::new(&rows, DEFAULT_RESELLER_PREFIX);
        let first = prices.resolve("MAVC9", "netflix--12m", Some("1"));
        let second = prices.resolve("MAVC9", "netflix--12m", Some("1"));
        assert_eq!(first, second);
    }

    #[test]
    fn header_row_is_never_matched() {
        let rows = table();
        let prices = PriceTable::new(&rows, DEFAULT_RESELLER_PREFIX);
        assert_eq!(prices.resolve("MAVL1", "product", None), 0);
    }
}
