//! Payment QR images from the VietQR image endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::QrConfig;
use crate::errors::{WatchError, WatchResult};

/// Produces a bank-transfer QR image for an amount and a transfer note.
#[async_trait]
pub trait QrImageSource: Send + Sync {
    async fn fetch(&self, amount: u64, note: &str) -> WatchResult<Vec<u8>>;
}

/// Client for a VietQR quick-link image URL.
///
/// The image URL already names the bank, the account and the template; the
/// amount, transfer note and account holder go in the query string.
#[derive(Debug, Clone)]
pub struct VietQrClient {
    http: Client,
    image_url: String,
    account_name: String,
}

impl VietQrClient {
    pub fn new(config: &QrConfig) -> WatchResult<Self> {
        if config.image_url.trim().is_empty() {
            return Err(WatchError::Config("qr.image_url is required".to_string()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            image_url: config.image_url.clone(),
            account_name: config.account_name.clone(),
        })
    }
}

#[async_trait]
impl QrImageSource for VietQrClient {
    async fn fetch(&self, amount: u64, note: &str) -> WatchResult<Vec<u8>> {
        let amount = amount.to_string();
        let mut query = vec![("amount", amount.as_str()), ("addInfo", note)];
        if !self.account_name.is_empty() {
            query.push(("accountName", self.account_name.as_str()));
        }

        let resp = self.http.get(&self.image_url).query(&query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WatchError::Qr(format!("image request failed with HTTP {status}")));
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(WatchError::Qr("image response was empty".to_string()));
        }
        debug!(note, size = bytes.len(), "QR image fetched");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_image_url_is_rejected() {
        let config = QrConfig {
            image_url: String::new(),
            ..QrConfig::default()
        };
        assert!(matches!(VietQrClient::new(&config), Err(WatchError::Config(_))));
    }

    #[test]
    fn builds_from_defaults() {
        assert!(VietQrClient::new(&QrConfig::default()).is_ok());
    }
}
