//! Search client

use lempman_core::settings::OpenSearchSettings;
use lempman_core::{Error, Result};
use std::time::Duration;
use tracing::{debug, warn};

use crate::query::{LogPage, LogQuery};

/// Client for the `_search` endpoint of one index
#[derive(Clone)]
pub struct LogClient {
    client: reqwest::Client,
    node: String,
    index: String,
    username: String,
    password: String,
}

impl LogClient {
    pub fn new(settings: &OpenSearchSettings, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| Error::config(format!("Failed to build log client: {}", e)))?;

        Ok(Self {
            client,
            node: settings.node.trim_end_matches('/').to_string(),
            index: settings.index.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    pub async fn search(&self, query: &LogQuery) -> Result<LogPage> {
        let url = format!("{}/{}/_search", self.node, self.index);
        let body = query.to_body();
        debug!("Log search {} page {}", url, query.page());

        let mut request = self.client.post(&url).json(&body);
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.send().await.map_err(|e| {
            warn!("Log search failed: {}", e);
            Error::upstream(format!("Log search failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("Log search returned {}: {}", status, text);
            return Err(Error::upstream(format!("Log search returned {}", status)));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("Invalid log search response: {}", e)))?;

        Ok(LogPage::from_response(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn settings(node: String) -> OpenSearchSettings {
        OpenSearchSettings {
            node,
            index: "logs".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_search_round() {
        let app = Router::new().route(
            "/:index/_search",
            post(
                |Path(index): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(index, "logs");
                    assert!(headers.contains_key("authorization"));
                    Json(json!({
                        "hits": {
                            "total": { "value": 1 },
                            "hits": [{
                                "_id": "1",
                                "_source": {
                                    "timestamp": "2024-01-01T00:00:00Z",
                                    "level": "error",
                                    "source": "nginx",
                                    "message": format!("size={}", body["size"])
                                }
                            }]
                        }
                    }))
                },
            ),
        );
        let node = serve(app).await;

        let client = LogClient::new(&settings(node), Duration::from_secs(5)).unwrap();
        let page = client
            .search(&LogQuery {
                per_page: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].level, "error");
        assert_eq!(page.data[0].message, "size=10");
    }

    #[tokio::test]
    async fn test_unreachable_node_is_upstream_error() {
        let client =
            LogClient::new(&settings("http://127.0.0.1:1".to_string()), Duration::from_secs(2))
                .unwrap();
        let result = client.search(&LogQuery::default()).await;
        assert!(matches!(result, Err(Error::Upstream(_))));
    }
}
