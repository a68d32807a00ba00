//! Log query parameters, request body and response mapping

use lempman_core::{DEFAULT_LOG_PAGE_SIZE, MAX_LOG_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Paging and filter parameters from the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub level: Option<String>,
    pub source: Option<String>,
    pub q: Option<String>,
}

impl LogQuery {
    /// 1-based page, never below 1
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_LOG_PAGE_SIZE)
            .clamp(1, MAX_LOG_PAGE_SIZE)
    }

    fn filter(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Search request body
    pub fn to_body(&self) -> Value {
        let mut must = Vec::new();

        if let Some(source) = Self::filter(&self.source) {
            must.push(json!({ "term": { "source": source } }));
        }
        if let Some(level) = Self::filter(&self.level) {
            must.push(json!({ "term": { "level": level } }));
        }
        if let Some(q) = Self::filter(&self.q) {
            must.push(json!({
                "multi_match": { "query": q, "fields": ["message", "source", "level"] }
            }));
        }

        let per_page = u64::from(self.per_page());
        json!({
            "query": { "bool": { "must": must } },
            "sort": [{ "timestamp": { "order": "desc" } }],
            "from": u64::from(self.page() - 1) * per_page,
            "size": per_page,
        })
    }
}

/// One log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// A page of results plus the total hit count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPage {
    pub data: Vec<LogEntry>,
    pub total: u64,
}

impl LogPage {
    /// Map a search response. Missing fields become empty strings.
    pub fn from_response(body: &Value) -> Self {
        let hits = &body["hits"];

        let total = match &hits["total"] {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            other => other["value"].as_u64().unwrap_or(0),
        };

        let field = |hit: &Value, name: &str| -> String {
            match &hit["_source"][name] {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            }
        };

        let data = hits["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .map(|hit| LogEntry {
                        id: hit["_id"].as_str().unwrap_or_default().to_string(),
                        timestamp: field(hit, "timestamp"),
                        level: field(hit, "level"),
                        source: field(hit, "source"),
                        message: field(hit, "message"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { data, total }
    }
}
