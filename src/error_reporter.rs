//! Failure reports posted to the error topic.

use std::error::Error;
use std::sync::Arc;

use tracing::{error, warn};

use crate::telegram::{Destination, Messenger, ParseMode};
use crate::text::escape_markdown;

/// Sends one MarkdownV2 message per reported failure.
///
/// Reporting never fails the caller: when the report itself cannot be
/// delivered the problem is logged and dropped.
#[derive(Clone)]
pub struct ErrorReporter {
    messenger: Arc<dyn Messenger>,
    destination: Destination,
    enabled: bool,
}

impl ErrorReporter {
    pub fn new(messenger: Arc<dyn Messenger>, destination: Destination, enabled: bool) -> Self {
        Self {
            messenger,
            destination,
            enabled,
        }
    }

    /// Render a report: title line, optional error chain, optional context.
    pub fn format_report(
        message: &str,
        failure: Option<&dyn Error>,
        context: &[(&str, String)],
    ) -> String {
        let mut lines = vec![format!("*BOT LỖI:* {}", escape_markdown(message))];

        if let Some(err) = failure {
            let mut chain = vec![err.to_string()];
            let mut source = err.source();
            while let Some(cause) = source {
                chain.push(cause.to_string());
                source = cause.source();
            }
            lines.push(String::new());
            lines.push("*Chi tiết:*".to_string());
            lines.push(escape_markdown(&chain.join("\ncaused by: ")));
        }

        if !context.is_empty() {
            lines.push(String::new());
            lines.push("*Ngữ cảnh:*".to_string());
            for (key, value) in context {
                lines.push(format!(
                    "\\- *{}:* {}",
                    escape_markdown(key),
                    escape_markdown(value)
                ));
            }
        }

        lines.join("\n")
    }

    pub async fn report(
        &self,
        message: &str,
        failure: Option<&(dyn Error + Send + Sync)>,
        context: &[(&str, String)],
    ) {
        if !self.enabled {
            return;
        }

        let failure = failure.map(|e| e as &dyn Error);
        let text = Self::format_report(message, failure, context);
        if let Err(e) = self
            .messenger
            .send_text(&self.destination, &text, ParseMode::MarkdownV2)
            .await
        {
            error!("Failed to deliver error report: {}", e);
            warn!(report = %message, "error report dropped");
        }
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("destination", &self.destination)
            .field("enabled", &self.enabled)
            .finish()
    }
}
