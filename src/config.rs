//! Configuration for the renewal watch job.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file (or the file named by `RENEWAL_CONFIG`)
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `RENEWAL_TELEGRAM_BOT_TOKEN` - Bot token used for every message
//! - `RENEWAL_SPREADSHEET_ID` - Spreadsheet holding the order and price sheets
//! - `RENEWAL_SHEETS_ACCESS_TOKEN` - OAuth bearer token for the Sheets API
//! - `RENEWAL_ORDER_SHEET` / `RENEWAL_ORDER_SHEET_GID` - Order sheet title and numeric id
//! - `RENEWAL_PRICE_SHEET` - Price sheet title
//! - `RENEWAL_NOTIFY_CHAT_ID` / `RENEWAL_NOTIFY_THREAD_ID` - Where due orders are posted
//! - `RENEWAL_ERRORS_CHAT_ID` / `RENEWAL_ERRORS_THREAD_ID` - Where failures are reported
//! - `RENEWAL_NOTIFY_DAYS` - Days before expiry at which an order is announced
//! - `RENEWAL_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//!
//! The full list is in [`ENV_OVERRIDES`].

use chrono::FixedOffset;
use config::Config;
use serde::Deserialize;
use std::env;

use crate::errors::{WatchError, WatchResult};
use crate::jobs::JobSettings;
use crate::pacing::PacingPolicy;
use crate::pricing::DEFAULT_RESELLER_PREFIX;
use crate::sheets::SheetRef;
use crate::telegram::Destination;

/// Environment variable naming an alternate configuration file.
pub const CONFIG_FILE_ENV: &str = "RENEWAL_CONFIG";

/// Configuration key and the environment variable that overrides it.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("telegram.bot_token", "RENEWAL_TELEGRAM_BOT_TOKEN"),
    ("telegram.api_base", "RENEWAL_TELEGRAM_API_BASE"),
    ("sheets.api_base", "RENEWAL_SHEETS_API_BASE"),
    ("sheets.spreadsheet_id", "RENEWAL_SPREADSHEET_ID"),
    ("sheets.access_token", "RENEWAL_SHEETS_ACCESS_TOKEN"),
    ("sheets.order_sheet", "RENEWAL_ORDER_SHEET"),
    ("sheets.order_sheet_gid", "RENEWAL_ORDER_SHEET_GID"),
    ("sheets.price_sheet", "RENEWAL_PRICE_SHEET"),
    ("qr.image_url", "RENEWAL_QR_IMAGE_URL"),
    ("qr.account_name", "RENEWAL_QR_ACCOUNT_NAME"),
    ("qr.timeout_secs", "RENEWAL_QR_TIMEOUT_SECS"),
    ("payment.bank_name", "RENEWAL_PAYMENT_BANK_NAME"),
    ("payment.account_number", "RENEWAL_PAYMENT_ACCOUNT_NUMBER"),
    ("payment.account_name", "RENEWAL_PAYMENT_ACCOUNT_NAME"),
    ("notify.enabled", "RENEWAL_NOTIFY_ENABLED"),
    ("notify.chat_id", "RENEWAL_NOTIFY_CHAT_ID"),
    ("notify.thread_id", "RENEWAL_NOTIFY_THREAD_ID"),
    ("errors.enabled", "RENEWAL_ERRORS_ENABLED"),
    ("errors.chat_id", "RENEWAL_ERRORS_CHAT_ID"),
    ("errors.thread_id", "RENEWAL_ERRORS_THREAD_ID"),
    ("job.notify_days", "RENEWAL_NOTIFY_DAYS"),
    ("job.utc_offset_hours", "RENEWAL_UTC_OFFSET_HOURS"),
    ("job.send_interval_ms", "RENEWAL_SEND_INTERVAL_MS"),
    ("job.delete_interval_ms", "RENEWAL_DELETE_INTERVAL_MS"),
    ("job.reseller_prefix", "RENEWAL_RESELLER_PREFIX"),
    ("logging.level", "RENEWAL_LOG_LEVEL"),
];

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub telegram: TelegramConfig,
    pub sheets: SheetsConfig,
    pub qr: QrConfig,
    /// Bank account printed in the payment footer
    pub payment: PaymentConfig,
    /// Due-order announcements
    pub notify: DestinationConfig,
    /// Failure reports
    pub errors: DestinationConfig,
    pub job: JobConfig,
    pub logging: LoggingConfig,
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

/// Google Sheets configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub api_base: String,
    pub spreadsheet_id: String,
    /// Bearer token; obtaining and refreshing it happens outside this job
    pub access_token: String,
    /// Title of the order sheet
    pub order_sheet: String,
    /// Numeric id of the order sheet, needed for row deletion
    pub order_sheet_gid: i64,
    /// Title of the price sheet
    pub price_sheet: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id: String::new(),
            access_token: String::new(),
            order_sheet: "Orders".to_string(),
            order_sheet_gid: 0,
            price_sheet: "Prices".to_string(),
        }
    }
}

/// QR image service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Quick-link image URL; bank, account and template are part of the path
    pub image_url: String,
    pub account_name: String,
    pub timeout_secs: u64,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            image_url: "https://img.vietqr.io/image/VPB-mavpre-compact2.png".to_string(),
            account_name: "NGO LE NGOC HUNG".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Payment account shown to customers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            bank_name: "VPBank".to_string(),
            account_number: "mavpre".to_string(),
            account_name: "NGO LE NGOC HUNG".to_string(),
        }
    }
}

/// A Telegram chat/topic pair plus an on/off switch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    pub enabled: bool,
    pub chat_id: Option<String>,
    pub thread_id: Option<i64>,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chat_id: None,
            thread_id: None,
        }
    }
}

impl DestinationConfig {
    fn resolve(&self, section: &str) -> WatchResult<Destination> {
        let chat_id = self
            .chat_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| WatchError::Config(format!("{section}.chat_id is required")))?;
        let thread_id = self
            .thread_id
            .ok_or_else(|| WatchError::Config(format!("{section}.thread_id is required")))?;
        Ok(Destination::new(chat_id, thread_id))
    }
}

/// Scan and pacing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Orders are announced when exactly this many days remain
    pub notify_days: i64,
    /// Offset from UTC used to decide what "today" is
    pub utc_offset_hours: i32,
    pub send_interval_ms: u64,
    pub delete_interval_ms: u64,
    /// Order-id prefix that selects the reseller price
    pub reseller_prefix: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            notify_days: 4,
            utc_offset_hours: 7,
            send_interval_ms: 1500,
            delete_interval_ms: 1200,
            reseller_prefix: DEFAULT_RESELLER_PREFIX.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl WatchConfig {
    /// Load configuration from file and environment.
    pub fn load() -> WatchResult<Self> {
        let file = env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| "config".to_string());

        let mut builder = Config::builder()
            .add_source(config::File::with_name(&file).required(false));

        for (key, var) in ENV_OVERRIDES {
            builder = builder
                .set_override_option(*key, env::var(var).ok().filter(|v| !v.is_empty()))
                .map_err(|e| WatchError::Config(e.to_string()))?;
        }

        let settings = builder
            .build()
            .map_err(|e| WatchError::Config(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| WatchError::Config(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    ///
    /// Runs before any network call, so a broken setup never produces a
    /// partial run.
    pub fn validate(&self) -> WatchResult<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(WatchError::Config("telegram.bot_token is required".to_string()));
        }
        if self.sheets.spreadsheet_id.trim().is_empty() {
            return Err(WatchError::Config("sheets.spreadsheet_id is required".to_string()));
        }
        if self.sheets.access_token.trim().is_empty() {
            return Err(WatchError::Config("sheets.access_token is required".to_string()));
        }
        if self.sheets.order_sheet.trim().is_empty() || self.sheets.price_sheet.trim().is_empty() {
            return Err(WatchError::Config(
                "sheets.order_sheet and sheets.price_sheet cannot be empty".to_string(),
            ));
        }

        self.notify.resolve("notify")?;
        self.errors.resolve("errors")?;

        if self.job.notify_days <= 0 {
            return Err(WatchError::Config(
                "job.notify_days must be greater than 0".to_string(),
            ));
        }
        if !(-23..=23).contains(&self.job.utc_offset_hours) {
            return Err(WatchError::Config(format!(
                "job.utc_offset_hours must be between -23 and 23, got {}",
                self.job.utc_offset_hours
            )));
        }
        if self.qr.timeout_secs == 0 {
            return Err(WatchError::Config(
                "qr.timeout_secs must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(WatchError::Config(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }

    /// Validate and turn the configuration into the settings the job runs with.
    pub fn job_settings(&self) -> WatchResult<JobSettings> {
        self.validate()?;

        let utc_offset = FixedOffset::east_opt(self.job.utc_offset_hours * 3600).ok_or_else(
            || WatchError::Config("job.utc_offset_hours is out of range".to_string()),
        )?;

        Ok(JobSettings {
            notify_enabled: self.notify.enabled,
            errors_enabled: self.errors.enabled,
            notify_destination: self.notify.resolve("notify")?,
            error_destination: self.errors.resolve("errors")?,
            notify_days: self.job.notify_days,
            utc_offset,
            pacing: PacingPolicy::from_millis(self.job.send_interval_ms, self.job.delete_interval_ms),
            order_sheet: SheetRef::new(self.sheets.order_sheet.clone(), self.sheets.order_sheet_gid),
            price_sheet: SheetRef::new(self.sheets.price_sheet.clone(), 0),
            reseller_prefix: self.job.reseller_prefix.clone(),
            payment: self.payment.clone(),
        })
    }
}
