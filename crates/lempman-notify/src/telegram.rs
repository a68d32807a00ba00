//! Telegram notification backend

use crate::error::{NotifyError, Result};
use crate::Notifier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram API response
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Request body for sendMessage
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Sends messages through the Bot API `sendMessage` method
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            bot_token,
            chat_id,
            api_base: TELEGRAM_API.to_string(),
            client,
        }
    }

    /// Point at a different Bot API server
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    async fn send_telegram_message(&self, text: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(NotifyError::NotConfigured);
        }

        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        debug!("Sending Telegram message to chat {}", self.chat_id);

        let response = self.client.post(self.api_url()).json(&request).send().await?;

        let status = response.status();
        let body: TelegramResponse = response.json().await.map_err(|_| {
            NotifyError::telegram(format!("Unexpected response (HTTP {})", status))
        })?;

        if body.ok {
            info!("Telegram notification sent");
            Ok(())
        } else {
            let error_msg = body
                .description
                .unwrap_or_else(|| format!("HTTP {}", status));
            error!("Telegram API error: {}", error_msg);
            Err(NotifyError::telegram(error_msg))
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.send_telegram_message(message).await
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_notifier_not_configured() {
        assert!(!TelegramNotifier::new(String::new(), "123".to_string()).is_configured());
        assert!(!TelegramNotifier::new("token".to_string(), String::new()).is_configured());
        assert!(TelegramNotifier::new("token".to_string(), "123".to_string()).is_configured());
    }

    #[test]
    fn test_api_url() {
        let notifier = TelegramNotifier::new("my_bot_token".to_string(), "123".to_string());
        assert_eq!(
            notifier.api_url(),
            "https://api.telegram.org/botmy_bot_token/sendMessage"
        );
    }

    #[tokio::test]
    async fn test_send_not_configured() {
        let notifier = TelegramNotifier::new(String::new(), String::new());
        let result = notifier.send("test").await;
        assert!(matches!(result, Err(NotifyError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_send_ok_and_rejected() {
        let app = Router::new().route(
            "/:bot/sendMessage",
            post(|Path(bot): Path<String>, Json(body): Json<Value>| async move {
                if bot == "botgood" && body["chat_id"] == "42" {
                    Json(json!({ "ok": true, "result": {} }))
                } else {
                    Json(json!({ "ok": false, "description": "Unauthorized" }))
                }
            }),
        );
        let base = serve(app).await;

        let good = TelegramNotifier::new("good".to_string(), "42".to_string()).with_api_base(&base);
        good.send("hello").await.unwrap();

        let bad = TelegramNotifier::new("bad".to_string(), "42".to_string()).with_api_base(&base);
        match bad.send("hello").await {
            Err(NotifyError::TelegramError(msg)) => assert_eq!(msg, "Unauthorized"),
            other => panic!("expected telegram error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let notifier = TelegramNotifier::new("123:secret-token".to_string(), "42".to_string())
            .with_api_base("http://127.0.0.1:1");

        let err = notifier.send("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::HttpError(_)));
        assert!(!err.to_string().contains("secret-token"));
        assert!(!format!("{:?}", err).contains("secret-token"));
    }
}
