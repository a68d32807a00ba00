//! Mock notifier for testing

use crate::error::{NotifyError, Result};
use crate::Notifier;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Records every message instead of sending it
#[derive(Default)]
pub struct MockNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    call_count: AtomicUsize,
    should_fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails like a rejected API call
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    pub async fn was_message_sent(&self, substring: &str) -> bool {
        self.messages
            .lock()
            .await
            .iter()
            .any(|m| m.contains(substring))
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(NotifyError::telegram("Mock failure"));
        }

        self.messages.lock().await.push(message.to_string());
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceEvent;

    #[tokio::test]
    async fn test_mock_notifier_records_messages() {
        let notifier = MockNotifier::new();
        notifier.send("Hello, world!").await.unwrap();
        notifier
            .send_event(&ServiceEvent::Recovered {
                service: "nginx".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(notifier.call_count(), 2);
        assert_eq!(notifier.messages().await.len(), 2);
        assert!(notifier.was_message_sent("Hello").await);
        assert!(notifier.was_message_sent("recovered").await);
    }

    #[tokio::test]
    async fn test_mock_notifier_fails_when_configured() {
        let notifier = MockNotifier::failing();
        assert!(notifier.send("test").await.is_err());
        assert_eq!(notifier.call_count(), 1);
    }
}
