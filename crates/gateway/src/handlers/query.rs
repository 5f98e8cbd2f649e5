//! Chatbot query handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{AppState, API_PREFIX};
use ragchat_common::{
    errors::{AppError, Result},
    metrics::RequestMetrics,
    QueryOutcome,
};

/// Query request
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Raw user input. Any JSON value is accepted; see [`QueryRequest::text`].
    #[serde(default)]
    pub query: Option<Value>,
}

impl QueryRequest {
    /// Text handed to the pipeline.
    ///
    /// Missing, `null`, arrays and objects become an empty query. Numbers and
    /// booleans use their JSON text.
    pub fn text(&self) -> String {
        match &self.query {
            Some(Value::String(text)) => text.clone(),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
            _ => String::new(),
        }
    }
}

/// Answer one chat message.
///
/// Upstream failures are folded into the outcome, so this only fails on a
/// body that is not a JSON object.
pub async fn query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryOutcome>> {
    let metrics = RequestMetrics::start("POST", &format!("{}/query", API_PREFIX));

    let result = run_query(&state, payload).await;

    metrics.finish(match &result {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    });
    result.map(Json)
}

async fn run_query(
    state: &AppState,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<QueryOutcome> {
    let Json(request) = payload.map_err(|e| AppError::InvalidFormat {
        message: e.body_text(),
    })?;

    Ok(state.pipeline.run(&request.text()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_of(body: Value) -> String {
        serde_json::from_value::<QueryRequest>(body).unwrap().text()
    }

    #[test]
    fn test_string_query_passes_through() {
        assert_eq!(text_of(json!({ "query": "What is RAG?" })), "What is RAG?");
    }

    #[test]
    fn test_missing_or_null_query_is_empty() {
        assert_eq!(text_of(json!({})), "");
        assert_eq!(text_of(json!({ "query": null })), "");
    }

    #[test]
    fn test_scalar_query_uses_json_text() {
        assert_eq!(text_of(json!({ "query": 123 })), "123");
        assert_eq!(text_of(json!({ "query": 1.5 })), "1.5");
        assert_eq!(text_of(json!({ "query": true })), "true");
    }

    #[test]
    fn test_structured_query_is_empty() {
        assert_eq!(text_of(json!({ "query": ["a", "b"] })), "");
        assert_eq!(text_of(json!({ "query": { "text": "a" } })), "");
    }
}
