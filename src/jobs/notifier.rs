//! Posts due-order reminders to the notification topic.

use tracing::{error, info, warn};

use crate::caption::CaptionBuilder;
use crate::error_reporter::ErrorReporter;
use crate::logging::{log_order_event, OrderEvent};
use crate::pacing::PacingPolicy;
use crate::telegram::{Destination, Messenger, ParseMode};
use crate::text::escape_markdown;

use super::DueOrder;

/// Sent when nothing reaches the notice threshold.
pub const NOTHING_DUE_MESSAGE: &str = "Không có đơn nào cần gia hạn.";

/// Announcement that precedes the per-order messages.
pub fn summary_message(count: usize) -> String {
    format!("Thông Báo: Tìm Thấy {count} đơn cần gia hạn.")
}

/// Counts from one notification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub sent: u32,
    pub failed: u32,
}

pub struct Notifier<'a> {
    messenger: &'a dyn Messenger,
    destination: &'a Destination,
    reporter: &'a ErrorReporter,
    pacing: PacingPolicy,
}

impl<'a> Notifier<'a> {
    pub fn new(
        messenger: &'a dyn Messenger,
        destination: &'a Destination,
        reporter: &'a ErrorReporter,
        pacing: PacingPolicy,
    ) -> Self {
        Self {
            messenger,
            destination,
            reporter,
            pacing,
        }
    }

    async fn send_notice(&self, text: &str) {
        if let Err(e) = self
            .messenger
            .send_text(self.destination, &escape_markdown(text), ParseMode::MarkdownV2)
            .await
        {
            warn!("Failed to send notice '{}': {}", text, e);
        }
    }

    /// Send the summary and one caption per due order, in scan order.
    ///
    /// A failed send is logged and reported, and the remaining orders are
    /// still attempted.
    pub async fn run(&self, due: &[DueOrder], captions: &CaptionBuilder<'_>) -> NotifyReport {
        let mut report = NotifyReport::default();

        if due.is_empty() {
            info!("No due orders today");
            self.send_notice(NOTHING_DUE_MESSAGE).await;
            return report;
        }

        self.send_notice(&summary_message(due.len())).await;

        let total = due.len();
        for (index, order) in due.iter().enumerate() {
            self.pacing.between_sends().await;

            let caption = captions.build(order, index + 1, total).await;
            let result = match caption.image {
                Some(image) => {
                    self.messenger
                        .send_photo(self.destination, image, &caption.text, ParseMode::MarkdownV2)
                        .await
                }
                None => {
                    self.messenger
                        .send_text(self.destination, &caption.text, ParseMode::MarkdownV2)
                        .await
                }
            };

            match result {
                Ok(()) => {
                    report.sent += 1;
                    log_order_event(OrderEvent::Notified, &order.order_id, None);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed sending order {}: {}", order.order_id, e);
                    log_order_event(OrderEvent::NotifyFailed, &order.order_id, Some(&e.to_string()));
                    self.reporter
                        .report(
                            "Không gửi được thông báo gia hạn",
                            Some(&e),
                            &[
                                ("order_id", order.order_id.clone()),
                                ("row", order.position.to_string()),
                            ],
                        )
                        .await;
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "Due-order notifications finished");
        report
    }
}
