//! The daily due-order job.
//!
//! One run takes a snapshot of the order sheet, classifies every order, then
//! runs two independent passes:
//!
//! - **Notify**: orders with exactly `notify_days` left are posted to the
//!   notification topic, each with its price and a payment QR image
//! - **Cleanup**: orders already past their expiry date are deleted from the
//!   sheet, highest row first
//!
//! # Usage
//!
//! ```rust,ignore
//! use renewal_watch::config::WatchConfig;
//! use renewal_watch::jobs::DueOrderJob;
//!
//! let config = WatchConfig::load()?;
//! let settings = config.job_settings()?;
//! let job = DueOrderJob::from_config(&config, settings)?;
//! let report = job.run_now().await?;
//! ```

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::caption::CaptionBuilder;
use crate::columns::validate_order_header;
use crate::config::{PaymentConfig, WatchConfig};
use crate::error_reporter::ErrorReporter;
use crate::errors::{WatchError, WatchResult};
use crate::pacing::PacingPolicy;
use crate::pricing::{PriceTable, DEFAULT_RESELLER_PREFIX};
use crate::qr::{QrImageSource, VietQrClient};
use crate::sheets::{OrderStore, SheetRef, SheetsClient};
use crate::telegram::{Destination, Messenger, TelegramClient};

mod notifier;
mod row_deleter;
mod scanner;

pub use notifier::{summary_message, Notifier, NotifyReport, NOTHING_DUE_MESSAGE};
pub use row_deleter::{deleted_message, deletion_order, DeleteReport, RowDeleter};
pub use scanner::{
    parse_expiry, scan_orders, DueOrder, ExpiredRow, ScanOutcome, EXPIRY_DATE_FORMAT, HEADER_ROWS,
};

/// Default number of days before expiry at which an order is announced.
pub const DEFAULT_NOTIFY_DAYS: i64 = 4;

/// Default offset from UTC for the run date (Vietnam, UTC+7).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Validated settings for one job instance.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Skip the whole run when false
    pub notify_enabled: bool,
    /// Only log failures when false
    pub errors_enabled: bool,
    pub notify_destination: Destination,
    pub error_destination: Destination,
    pub notify_days: i64,
    /// Offset used to decide the run date
    pub utc_offset: FixedOffset,
    pub pacing: PacingPolicy,
    pub order_sheet: SheetRef,
    pub price_sheet: SheetRef,
    pub reseller_prefix: String,
    pub payment: PaymentConfig,
}

impl JobSettings {
    /// Settings with every default filled in except the two destinations.
    pub fn new(notify_destination: Destination, error_destination: Destination) -> Self {
        Self {
            notify_enabled: true,
            errors_enabled: true,
            notify_destination,
            error_destination,
            notify_days: DEFAULT_NOTIFY_DAYS,
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .unwrap_or_else(|| Utc.fix()),
            pacing: PacingPolicy::default(),
            order_sheet: SheetRef::new("Orders", 0),
            price_sheet: SheetRef::new("Prices", 0),
            reseller_prefix: DEFAULT_RESELLER_PREFIX.to_string(),
            payment: PaymentConfig::default(),
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub run_id: Uuid,
    pub today: NaiveDate,
    pub due: usize,
    pub expired: usize,
    pub skipped: usize,
    pub notify: NotifyReport,
    pub cleanup: DeleteReport,
}

impl JobReport {
    fn disabled(run_id: Uuid, today: NaiveDate) -> Self {
        Self {
            run_id,
            today,
            due: 0,
            expired: 0,
            skipped: 0,
            notify: NotifyReport::default(),
            cleanup: DeleteReport::default(),
        }
    }
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Order store error: {0}")]
    Store(String),
}

impl From<WatchError> for JobError {
    fn from(err: WatchError) -> Self {
        match err {
            WatchError::Store(_) | WatchError::Http(_) | WatchError::Json(_) => {
                JobError::Store(err.to_string())
            }
            other => JobError::Setup(other.to_string()),
        }
    }
}

/// The due-order job bound to its collaborators.
pub struct DueOrderJob {
    store: Arc<dyn OrderStore>,
    messenger: Arc<dyn Messenger>,
    qr: Arc<dyn QrImageSource>,
    reporter: ErrorReporter,
    settings: JobSettings,
}

impl DueOrderJob {
    pub fn new(
        store: Arc<dyn OrderStore>,
        messenger: Arc<dyn Messenger>,
        qr: Arc<dyn QrImageSource>,
        settings: JobSettings,
    ) -> Self {
        let reporter = ErrorReporter::new(
            Arc::clone(&messenger),
            settings.error_destination.clone(),
            settings.errors_enabled,
        );
        Self {
            store,
            messenger,
            qr,
            reporter,
            settings,
        }
    }

    /// Wire the job to Google Sheets, Telegram and VietQR.
    pub fn from_config(config: &WatchConfig, settings: JobSettings) -> WatchResult<Self> {
        let store = Arc::new(SheetsClient::new(&config.sheets)?);
        let messenger = Arc::new(TelegramClient::new(&config.telegram)?);
        let qr = Arc::new(VietQrClient::new(&config.qr)?);
        Ok(Self::new(store, messenger, qr, settings))
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Today's date in the configured offset.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.utc_offset).date_naive()
    }

    /// Run the job for today.
    pub async fn run_now(&self) -> Result<JobReport, JobError> {
        self.run(self.today()).await
    }

    /// Run the job as if today were `today`.
    pub async fn run(&self, today: NaiveDate) -> Result<JobReport, JobError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("due_order_job", run_id = %run_id, today = %today);
        self.run_inner(run_id, today).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, today: NaiveDate) -> Result<JobReport, JobError> {
        info!("Running due-order job");

        if !self.settings.notify_enabled {
            info!("Due-order notifications are disabled; skipping run");
            return Ok(JobReport::disabled(run_id, today));
        }

        let rows = match self.store.read_rows(&self.settings.order_sheet).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to read order sheet: {}", e);
                self.reporter
                    .report(
                        "Job due-order không đọc được bảng đơn hàng",
                        Some(&e),
                        &[("sheet", self.settings.order_sheet.title.clone())],
                    )
                    .await;
                return Err(e.into());
            }
        };

        if let Some(header) = rows.first() {
            validate_order_header(header).map_err(|e| {
                error!("Order sheet layout mismatch: {}", e);
                JobError::Setup(e.to_string())
            })?;
        }

        let price_rows = match self.store.read_rows(&self.settings.price_sheet).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Price sheet unavailable, using order prices only: {}", e);
                Vec::new()
            }
        };

        let orders = rows.get(HEADER_ROWS..).unwrap_or(&[]);
        let outcome = scan_orders(orders, today, self.settings.notify_days);
        info!(
            rows = orders.len(),
            due = outcome.due.len(),
            expired = outcome.expired.len(),
            skipped = outcome.skipped,
            "Order sheet scanned"
        );

        let prices = PriceTable::new(&price_rows, &self.settings.reseller_prefix);
        let captions = CaptionBuilder::new(prices, &self.settings.payment, self.qr.as_ref());
        let notify = Notifier::new(
            self.messenger.as_ref(),
            &self.settings.notify_destination,
            &self.reporter,
            self.settings.pacing,
        )
        .run(&outcome.due, &captions)
        .await;

        let cleanup = RowDeleter::new(
            self.store.as_ref(),
            &self.settings.order_sheet,
            self.messenger.as_ref(),
            &self.settings.notify_destination,
            &self.reporter,
            self.settings.pacing,
        )
        .run(&outcome.expired)
        .await;

        info!(
            notified = notify.sent,
            notify_failed = notify.failed,
            deleted = cleanup.deleted,
            delete_failed = cleanup.failed,
            "Due-order job finished"
        );

        Ok(JobReport {
            run_id,
            today,
            due: outcome.due.len(),
            expired: outcome.expired.len(),
            skipped: outcome.skipped,
            notify,
            cleanup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_values() {
        let settings = JobSettings::new(Destination::new("-1", 12), Destination::new("-1", 6));
        assert_eq!(settings.notify_days, 4);
        assert_eq!(settings.utc_offset.local_minus_utc(), 7 * 3600);
        assert_eq!(settings.reseller_prefix, "MAVC");
        assert!(settings.notify_enabled);
    }

    #[test]
    fn store_failures_map_to_store_errors() {
        let err: JobError = WatchError::Store("HTTP 500".to_string()).into();
        assert!(matches!(err, JobError::Store(_)));

        let err: JobError = WatchError::Layout("narrow header".to_string()).into();
        assert!(matches!(err, JobError::Setup(_)));
    }
}
