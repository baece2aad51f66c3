//! Append-only transcript of the endpoint's replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// The remote endpoint's reply text
    Assistant,
}

/// One appended piece of reply text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who said it
    pub role: TranscriptRole,

    /// The delta text, exactly as received
    pub text: String,

    /// When the delta arrived
    pub received_at: DateTime<Utc>,
}

/// Ordered, append-only record of reply text.
///
/// Entries are only ever appended, in the order the relay observed them
/// on the inbound stream. Readers take snapshots; the UI can also watch
/// the revision counter to learn when new entries land.
pub struct Transcript {
    entries: Mutex<Vec<TranscriptEntry>>,
    revision: watch::Sender<u64>,
}

impl Transcript {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entries: Mutex::new(Vec::new()),
            revision,
        }
    }

    /// Append one reply delta.
    pub async fn append(&self, text: impl Into<String>) {
        let mut entries = self.entries.lock().await;
        entries.push(TranscriptEntry {
            role: TranscriptRole::Assistant,
            text: text.into(),
            received_at: Utc::now(),
        });
        let _ = self.revision.send(entries.len() as u64);
    }

    /// Copy of all entries in arrival order.
    pub async fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.entries.lock().await.clone()
    }

    /// Entries appended so far.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Watch for new entries; the value is the current entry count.
    pub fn watch_revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// All entry text joined together, for display and tests.
    pub async fn joined_text(&self) -> String {
        self.entries
            .lock()
            .await
            .iter()
            .map(|entry| entry.text.as_str())
            .collect()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_preserve_order() {
        let transcript = Transcript::new();
        transcript.append("Hello").await;
        transcript.append(", ").await;
        transcript.append("world").await;

        let entries = transcript.snapshot().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].text, "Hello");
        assert_eq!(entries[2].text, "world");
        assert_eq!(transcript.joined_text().await, "Hello, world");
    }

    #[tokio::test]
    async fn test_revision_tracks_appends() {
        let transcript = Transcript::new();
        let mut revision = transcript.watch_revision();
        assert_eq!(*revision.borrow(), 0);

        transcript.append("a").await;
        revision.changed().await.unwrap();
        assert_eq!(*revision.borrow(), 1);

        transcript.append("b").await;
        revision.changed().await.unwrap();
        assert_eq!(*revision.borrow(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let transcript = Transcript::new();
        transcript.append("before").await;
        let snapshot = transcript.snapshot().await;
        transcript.append("after").await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(transcript.len().await, 2);
    }
}
