//! Tabular store: the `OrderStore` contract and a Google Sheets REST client.
//!
//! Row positions are 1-based and include the header row, matching what a
//! person sees in the spreadsheet. Deleting a row renumbers every row below it.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::SheetsConfig;
use crate::errors::{WatchError, WatchResult};

/// One worksheet inside the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    /// Tab title, used for value reads.
    pub title: String,
    /// Numeric sheet id, used for structural edits.
    pub gid: i64,
}

impl SheetRef {
    pub fn new(title: impl Into<String>, gid: i64) -> Self {
        Self {
            title: title.into(),
            gid,
        }
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Every row of the sheet, header first, as display strings.
    async fn read_rows(&self, sheet: &SheetRef) -> WatchResult<Vec<Vec<String>>>;

    /// Remove the row at a 1-based position.
    async fn delete_row(&self, sheet: &SheetRef, position: usize) -> WatchResult<()>;
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Flatten a cell value into its display string.
///
/// A one-element list collapses to its element, so a value the API wraps in
/// a list reads the same as the bare value.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.len() == 1 => cell_to_string(&items[0]),
        Value::Array(items) => items
            .iter()
            .map(cell_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Google Sheets API v4 client authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    api_base: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(config: &SheetsConfig) -> WatchResult<Self> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(WatchError::Config("sheets.spreadsheet_id is required".to_string()));
        }
        if config.access_token.trim().is_empty() {
            return Err(WatchError::Config("sheets.access_token is required".to_string()));
        }
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| WatchError::Config(format!("invalid sheets.api_base: {e}")))?;

        Ok(Self {
            http: Client::new(),
            api_base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> WatchResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| WatchError::Config("sheets.api_base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    async fn check(resp: reqwest::Response, action: &str) -> WatchResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(WatchError::Store(format!(
            "{action} failed with HTTP {status}: {body}"
        )))
    }
}

#[async_trait]
impl OrderStore for SheetsClient {
    async fn read_rows(&self, sheet: &SheetRef) -> WatchResult<Vec<Vec<String>>> {
        let url = self.url(&[self.spreadsheet_id.as_str(), "values", sheet.title.as_str()])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ])
            .send()
            .await?;

        let resp = Self::check(resp, "read values").await?;
        let range: ValueRange = resp.json().await?;
        debug!(sheet = %sheet.title, rows = range.values.len(), "sheet snapshot read");

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn delete_row(&self, sheet: &SheetRef, position: usize) -> WatchResult<()> {
        if position == 0 {
            return Err(WatchError::Store("row positions start at 1".to_string()));
        }
        let batch = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.url(&[batch.as_str()])?;
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet.gid,
                        "dimension": "ROWS",
                        "startIndex": position - 1,
                        "endIndex": position,
                    }
                }
            }]
        });

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        Self::check(resp, "delete row").await?;
        debug!(sheet = %sheet.title, position, "row deleted");
        Ok(())
    }
}
