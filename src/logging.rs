//! Tracing setup and structured per-order events.
//!
//! Every action the job takes on a single order goes through
//! [`log_order_event`], so the log reads as an audit trail of what was sent
//! and what was removed.

use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

use crate::errors::{WatchError, WatchResult};

/// Per-order event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    /// Renewal reminder delivered
    Notified,
    /// Renewal reminder could not be delivered
    NotifyFailed,
    /// Expired row removed from the sheet
    Deleted,
    /// Expired row could not be removed
    DeleteFailed,
    /// Row ignored by the scanner
    Skipped,
}

impl std::fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderEvent::Notified => "notified",
            OrderEvent::NotifyFailed => "notify_failed",
            OrderEvent::Deleted => "deleted",
            OrderEvent::DeleteFailed => "delete_failed",
            OrderEvent::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

impl OrderEvent {
    fn is_failure(self) -> bool {
        matches!(self, OrderEvent::NotifyFailed | OrderEvent::DeleteFailed)
    }
}

/// Log an order event.
///
/// # Arguments
///
/// * `event` - What happened
/// * `order_id` - The order id, or the row position when the id is unknown
/// * `details` - Optional additional details about the event
pub fn log_order_event(event: OrderEvent, order_id: &str, details: Option<&str>) {
    let span = info_span!(
        "order_event",
        event = %event,
        order_id = %order_id,
    );
    let _enter = span.enter();

    match (event.is_failure(), details) {
        (true, Some(d)) => warn!(reason = %d, "Order event occurred"),
        (true, None) => warn!("Order event occurred"),
        (false, Some(d)) => info!(details = %d, "Order event occurred"),
        (false, None) => info!("Order event occurred"),
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when it is set.
pub fn init_tracing(level: &str) -> WatchResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| WatchError::Config(format!("invalid log level '{level}': {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| WatchError::Config(format!("failed to install tracing subscriber: {e}")))
}
