//! Due-order scan.
//!
//! Classifies every order row by the days left until its expiry date:
//! - exactly `notify_days` left: announce it
//! - already past: delete it
//! - anything else: leave it for a later run
//!
//! Rows that cannot be classified are skipped and logged, never fatal.

use chrono::NaiveDate;
use tracing::debug;

use crate::columns::{order_cell, OrderField};
use crate::logging::{log_order_event, OrderEvent};

/// Format of the expiry-date column.
pub const EXPIRY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Rows above the first order row.
pub const HEADER_ROWS: usize = 1;

/// An order that reaches the notice threshold today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueOrder {
    /// 1-based sheet position at snapshot time
    pub position: usize,
    pub order_id: String,
    pub row: Vec<String>,
    pub days_remaining: i64,
}

/// An order whose expiry date has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredRow {
    /// 1-based sheet position at snapshot time
    pub position: usize,
    pub order_id: String,
    pub days_remaining: i64,
}

/// Result of one scan. `due` and `expired` never share a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub due: Vec<DueOrder>,
    pub expired: Vec<ExpiredRow>,
    pub skipped: usize,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.due.is_empty() && self.expired.is_empty()
    }

    /// Positions queued for deletion, in scan order.
    pub fn expired_positions(&self) -> Vec<usize> {
        self.expired.iter().map(|e| e.position).collect()
    }
}

pub fn parse_expiry(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), EXPIRY_DATE_FORMAT)
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Classify order rows (header excluded) against `today`.
pub fn scan_orders(rows: &[Vec<String>], today: NaiveDate, notify_days: i64) -> ScanOutcome {
    let min_width = OrderField::ExpiresOn
        .index()
        .max(OrderField::OrderId.index())
        + 1;
    let mut outcome = ScanOutcome::default();

    for (offset, row) in rows.iter().enumerate() {
        let position = offset + HEADER_ROWS + 1;

        if is_blank(row) {
            continue;
        }
        if row.len() < min_width {
            debug!(position, width = row.len(), "row too short, skipping");
            outcome.skipped += 1;
            continue;
        }

        let order_id = order_cell(row, OrderField::OrderId);
        let expiry_raw = order_cell(row, OrderField::ExpiresOn);
        if order_id.is_empty() || expiry_raw.is_empty() {
            debug!(position, "missing order id or expiry date, skipping");
            outcome.skipped += 1;
            continue;
        }

        let expiry = match parse_expiry(expiry_raw) {
            Ok(date) => date,
            Err(e) => {
                log_order_event(
                    OrderEvent::Skipped,
                    order_id,
                    Some(&format!("row {position}: bad expiry date '{expiry_raw}': {e}")),
                );
                outcome.skipped += 1;
                continue;
            }
        };

        let days_remaining = (expiry - today).num_days();
        if days_remaining == notify_days {
            debug!(position, order_id, days_remaining, "order due for renewal");
            outcome.due.push(DueOrder {
                position,
                order_id: order_id.to_string(),
                row: row.clone(),
                days_remaining,
            });
        } else if days_remaining < 0 {
            debug!(position, order_id, days_remaining, "order expired");
            outcome.expired.push(ExpiredRow {
                position,
                order_id: order_id.to_string(),
                days_remaining,
            });
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn order(id: &str, expiry: &str) -> Vec<String> {
        let mut row = vec![String::new(); OrderField::width()];
        row[OrderField::OrderId.index()] = id.to_string();
        row[OrderField::ProductCode.index()] = "Netflix".to_string();
        row[OrderField::ExpiresOn.index()] = expiry.to_string();
        row
    }

    fn in_days(days: i64) -> String {
        (today() + Duration::days(days))
            .format(EXPIRY_DATE_FORMAT)
            .to_string()
    }

    #[test]
    fn four_days_out_is_due() {
        let rows = vec![order("MAVL1", &in_days(4))];
        let outcome = scan_orders(&rows, today(), 4);
        assert_eq!(outcome.due.len(), 1);
        assert_eq!(outcome.due[0].days_remaining, 4);
        assert_eq!(outcome.due[0].position, 2);
        assert!(outcome.expired.is_empty());
    }

    #[test]
    fn yesterday_is_expired() {
        let rows = vec![order("MAVL1", &in_days(10)), order("MAVL2", &in_days(-1))];
        let outcome = scan_orders(&rows, today(), 4);
        assert!(outcome.due.is_empty());
        assert_eq!(outcome.expired_positions(), vec![3]);
        assert_eq!(outcome.expired[0].order_id, "MAVL2");
    }

    #[test]
    fn other_distances_are_left_alone() {
        let rows: Vec<_> = [0, 1, 3, 5, 10]
            .iter()
            .map(|d| order("MAVL", &in_days(*d)))
            .collect();
        let outcome = scan_orders(&rows, today(), 4);
        assert!(outcome.is_empty());
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn unclassifiable_rows_are_skipped() {
        let rows = vec![
            order("MAVL1", "31/02/2025"),
            order("MAVL2", "2025-03-14"),
            order("", &in_days(4)),
            order("MAVL3", ""),
            vec!["MAVL4".to_string(), "Netflix".to_string()],
        ];
        let outcome = scan_orders(&rows, today(), 4);
        assert!(outcome.is_empty());
        assert_eq!(outcome.skipped, 5);
    }

    #[test]
    fn blank_rows_are_ignored_but_keep_their_position() {
        let rows = vec![
            vec![" ".to_string(); 3],
            vec![],
            order("MAVL1", &in_days(-2)),
        ];
        let outcome = scan_orders(&rows, today(), 4);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.expired_positions(), vec![4]);
    }

    #[test]
    fn due_and_expired_are_disjoint() {
        let rows: Vec<_> = (-6..=6)
            .map(|d| order(&format!("MAV{d}"), &in_days(d)))
            .collect();
        let outcome = scan_orders(&rows, today(), 4);
        for due in &outcome.due {
            assert!(outcome.expired.iter().all(|e| e.position != due.position));
        }
        assert_eq!(outcome.due.len(), 1);
        assert_eq!(outcome.expired.len(), 6);
    }

    #[test]
    fn parses_day_first_dates() {
        assert_eq!(
            parse_expiry(" 05/01/2026 "),
            Ok(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())
        );
        assert!(parse_expiry("2026-01-05").is_err());
    }
}
