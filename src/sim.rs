//! In-memory stand-ins for the sheet, Telegram and the QR service.
//!
//! They behave like the real services where the job can tell the
//! difference: deleting a row renumbers the rows below it, and every call is
//! recorded so tests can assert on exactly what went out.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::errors::{WatchError, WatchResult};
use crate::qr::QrImageSource;
use crate::sheets::{OrderStore, SheetRef};
use crate::telegram::{Destination, Messenger, ParseMode};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> WatchResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| WatchError::Store(format!("failed to acquire {what} lock")))
}

#[derive(Debug, Default)]
struct SheetState {
    sheets: HashMap<String, Vec<Vec<String>>>,
    deletions: Vec<usize>,
    failing_positions: HashSet<usize>,
    unreadable: HashSet<String>,
}

/// A spreadsheet held in memory, keyed by sheet title.
#[derive(Debug, Default)]
pub struct InMemorySheet {
    state: Mutex<SheetState>,
}

impl InMemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: add a sheet with the given rows (header first).
    pub fn with_sheet(self, title: &str, rows: Vec<Vec<String>>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.sheets.insert(title.to_string(), rows);
        }
        self
    }

    /// Deleting the row currently at `position` will fail.
    pub fn fail_delete_at(self, position: usize) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failing_positions.insert(position);
        }
        self
    }

    /// Reading the named sheet will fail.
    pub fn fail_read_of(self, title: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.unreadable.insert(title.to_string());
        }
        self
    }

    /// Current rows of a sheet.
    pub fn rows(&self, title: &str) -> Vec<Vec<String>> {
        self.state
            .lock()
            .map(|s| s.sheets.get(title).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Positions passed to successful or failed `delete_row` calls, in call order.
    pub fn deletions(&self) -> Vec<usize> {
        self.state
            .lock()
            .map(|s| s.deletions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OrderStore for InMemorySheet {
    async fn read_rows(&self, sheet: &SheetRef) -> WatchResult<Vec<Vec<String>>> {
        let state = lock(&self.state, "sheet")?;
        if state.unreadable.contains(&sheet.title) {
            return Err(WatchError::Store(format!("sheet '{}' is unreachable", sheet.title)));
        }
        state
            .sheets
            .get(&sheet.title)
            .cloned()
            .ok_or_else(|| WatchError::Store(format!("sheet '{}' not found", sheet.title)))
    }

    async fn delete_row(&self, sheet: &SheetRef, position: usize) -> WatchResult<()> {
        let mut state = lock(&self.state, "sheet")?;
        state.deletions.push(position);

        if state.failing_positions.contains(&position) {
            return Err(WatchError::Store(format!("quota exceeded deleting row {position}")));
        }

        let rows = state
            .sheets
            .get_mut(&sheet.title)
            .ok_or_else(|| WatchError::Store(format!("sheet '{}' not found", sheet.title)))?;
        if position == 0 || position > rows.len() {
            return Err(WatchError::Store(format!("row {position} out of range")));
        }
        rows.remove(position - 1);
        Ok(())
    }
}

/// A message captured by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: Destination,
    pub text: String,
    pub mode: ParseMode,
    pub image: Option<Vec<u8>>,
}

/// Messenger that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
    fail_markers: Mutex<Vec<String>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any message whose text contains `marker` is rejected.
    pub fn fail_when_contains(self, marker: &str) -> Self {
        if let Ok(mut markers) = self.fail_markers.lock() {
            markers.push(marker.to_string());
        }
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages delivered to one destination.
    pub fn sent_to(&self, destination: &Destination) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| &m.destination == destination)
            .collect()
    }

    fn record(&self, message: SentMessage) -> WatchResult<()> {
        let markers = lock(&self.fail_markers, "messenger")?;
        if markers.iter().any(|m| message.text.contains(m.as_str())) {
            return Err(WatchError::Transport(
                "Bad Request: can't parse entities".to_string(),
            ));
        }
        drop(markers);
        lock(&self.sent, "messenger")?.push(message);
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, to: &Destination, text: &str, mode: ParseMode) -> WatchResult<()> {
        self.record(SentMessage {
            destination: to.clone(),
            text: text.to_string(),
            mode,
            image: None,
        })
    }

    async fn send_photo(
        &self,
        to: &Destination,
        image: Vec<u8>,
        caption: &str,
        mode: ParseMode,
    ) -> WatchResult<()> {
        self.record(SentMessage {
            destination: to.clone(),
            text: caption.to_string(),
            mode,
            image: Some(image),
        })
    }
}

/// QR source returning a fixed image, or always failing.
#[derive(Debug, Default)]
pub struct StaticQrSource {
    image: Option<Vec<u8>>,
    requests: Mutex<Vec<(u64, String)>>,
}

impl StaticQrSource {
    pub fn with_image(image: Vec<u8>) -> Self {
        Self {
            image: Some(image),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every fetch fails, as if the QR service timed out.
    pub fn failing() -> Self {
        Self::default()
    }

    /// `(amount, note)` of every fetch, in call order.
    pub fn requests(&self) -> Vec<(u64, String)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl QrImageSource for StaticQrSource {
    async fn fetch(&self, amount: u64, note: &str) -> WatchResult<Vec<u8>> {
        lock(&self.requests, "qr")?.push((amount, note.to_string()));
        self.image
            .clone()
            .ok_or_else(|| WatchError::Qr("operation timed out".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: &[&str]) -> Vec<Vec<String>> {
        ids.iter().map(|id| vec![id.to_string()]).collect()
    }

    #[tokio::test]
    async fn deleting_renumbers_rows_below() {
        let sheet = SheetRef::new("Orders", 0);
        let store = InMemorySheet::new().with_sheet("Orders", rows(&["header", "a", "b", "c"]));

        store.delete_row(&sheet, 2).await.unwrap();
        assert_eq!(store.rows("Orders"), rows(&["header", "b", "c"]));

        store.delete_row(&sheet, 2).await.unwrap();
        assert_eq!(store.rows("Orders"), rows(&["header", "c"]));
        assert_eq!(store.deletions(), vec![2, 2]);
    }

    #[tokio::test]
    async fn injected_failures_leave_rows_intact() {
        let sheet = SheetRef::new("Orders", 0);
        let store = InMemorySheet::new()
            .with_sheet("Orders", rows(&["header", "a"]))
            .fail_delete_at(2)
            .fail_read_of("Prices");

        assert!(store.delete_row(&sheet, 2).await.is_err());
        assert_eq!(store.rows("Orders").len(), 2);
        assert!(store.read_rows(&SheetRef::new("Prices", 0)).await.is_err());
        assert!(store.delete_row(&sheet, 9).await.is_err());
    }

    #[tokio::test]
    async fn messenger_records_and_rejects() {
        let to = Destination::new("-1", 12);
        let messenger = RecordingMessenger::new().fail_when_contains("BOOM");

        messenger.send_text(&to, "hello", ParseMode::Plain).await.unwrap();
        assert!(messenger
            .send_photo(&to, vec![1], "BOOM caption", ParseMode::MarkdownV2)
            .await
            .is_err());

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "hello");
        assert!(sent[0].image.is_none());
    }
}
