//! Removes expired orders from the order sheet.
//!
//! Deleting a row shifts every row below it up by one, so positions taken
//! from the snapshot are only valid if rows are removed bottom-up.

use tracing::{error, info, warn};

use crate::error_reporter::ErrorReporter;
use crate::logging::{log_order_event, OrderEvent};
use crate::pacing::PacingPolicy;
use crate::sheets::{OrderStore, SheetRef};
use crate::telegram::{Destination, Messenger, ParseMode};
use crate::text::escape_markdown;

use super::ExpiredRow;

/// Summary posted after a deletion pass.
pub fn deleted_message(count: u32) -> String {
    format!("Đã xóa {count} đơn hết hạn khỏi bảng đơn hàng.")
}

/// Order in which expired rows must be removed: highest position first.
///
/// Duplicate positions collapse so a row is never removed twice.
pub fn deletion_order(expired: &[ExpiredRow]) -> Vec<&ExpiredRow> {
    let mut ordered: Vec<&ExpiredRow> = expired.iter().collect();
    ordered.sort_by(|a, b| b.position.cmp(&a.position));
    ordered.dedup_by_key(|e| e.position);
    ordered
}

/// Counts from one deletion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u32,
    pub failed: u32,
}

pub struct RowDeleter<'a> {
    store: &'a dyn OrderStore,
    sheet: &'a SheetRef,
    messenger: &'a dyn Messenger,
    destination: &'a Destination,
    reporter: &'a ErrorReporter,
    pacing: PacingPolicy,
}

impl<'a> RowDeleter<'a> {
    pub fn new(
        store: &'a dyn OrderStore,
        sheet: &'a SheetRef,
        messenger: &'a dyn Messenger,
        destination: &'a Destination,
        reporter: &'a ErrorReporter,
        pacing: PacingPolicy,
    ) -> Self {
        Self {
            store,
            sheet,
            messenger,
            destination,
            reporter,
            pacing,
        }
    }

    /// Delete every expired row, bottom-up, then post how many went away.
    pub async fn run(&self, expired: &[ExpiredRow]) -> DeleteReport {
        let mut report = DeleteReport::default();
        if expired.is_empty() {
            return report;
        }

        let ordered = deletion_order(expired);
        info!(rows = ordered.len(), "Deleting expired orders");

        for (i, row) in ordered.iter().enumerate() {
            if i > 0 {
                self.pacing.between_deletes().await;
            }

            match self.store.delete_row(self.sheet, row.position).await {
                Ok(()) => {
                    report.deleted += 1;
                    log_order_event(
                        OrderEvent::Deleted,
                        &row.order_id,
                        Some(&format!("row {}", row.position)),
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed deleting row {} ({}): {}", row.position, row.order_id, e);
                    log_order_event(OrderEvent::DeleteFailed, &row.order_id, Some(&e.to_string()));
                    self.reporter
                        .report(
                            "Không xóa được đơn hết hạn",
                            Some(&e),
                            &[
                                ("order_id", row.order_id.clone()),
                                ("row", row.position.to_string()),
                            ],
                        )
                        .await;
                }
            }
        }

        let summary = escape_markdown(&deleted_message(report.deleted));
        if let Err(e) = self
            .messenger
            .send_text(self.destination, &summary, ParseMode::MarkdownV2)
            .await
        {
            warn!("Failed to send deletion summary: {}", e);
        }

        info!(deleted = report.deleted, failed = report.failed, "Expired-order cleanup finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired(position: usize) -> ExpiredRow {
        ExpiredRow {
            position,
            order_id: format!("MAV{position}"),
            days_remaining: -1,
        }
    }

    #[test]
    fn deletes_bottom_up() {
        let rows = vec![expired(3), expired(7), expired(5)];
        let order: Vec<usize> = deletion_order(&rows).iter().map(|e| e.position).collect();
        assert_eq!(order, vec![7, 5, 3]);
    }

    #[test]
    fn already_descending_input_is_kept() {
        let rows = vec![expired(7), expired(3)];
        let order: Vec<usize> = deletion_order(&rows).iter().map(|e| e.position).collect();
        assert_eq!(order, vec![7, 3]);
    }

    #[test]
    fn duplicate_positions_collapse() {
        let rows = vec![expired(4), expired(9), expired(4)];
        let order: Vec<usize> = deletion_order(&rows).iter().map(|e| e.position).collect();
        assert_eq!(order, vec![9, 4]);
    }
}
