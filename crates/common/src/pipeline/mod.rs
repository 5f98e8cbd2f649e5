//! Query pipeline
//!
//! Runs one chatbot query through the backing services, strictly in order:
//!
//! 1. sanitize the query
//! 2. embeddings service (`{text}` → `{embeddings}`)
//! 3. search service (`{query}` → `{results}`)
//! 4. chain-of-thought context from the query and results
//! 5. answer service (`{context, question}` → `{answer}`)
//!
//! A failing step never aborts the run. Its value falls back to a default
//! (`[]`, `[]`, or [`FALLBACK_ANSWER`]) and the step is marked
//! [`StepStatus::Fallback`] in the outcome, so callers can tell a real answer
//! from the fallback without comparing strings.

use crate::config::UpstreamConfig;
use crate::context::{chain_of_thought, sanitize_text};
use crate::errors::Result;
use crate::metrics;
use crate::upstream::{Endpoint, HttpUpstream, JsonObject, Upstream};
use crate::FALLBACK_ANSWER;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// How a pipeline step finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// The service answered with the expected field
    Success,
    /// The default value was substituted
    Fallback { reason: String },
}

impl StepStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StepStatus::Success)
    }
}

/// Per-step statuses of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSteps {
    pub embeddings: StepStatus,
    pub search: StepStatus,
    pub answer: StepStatus,
}

impl PipelineSteps {
    /// Number of steps that used their default value
    pub fn fallback_count(&self) -> usize {
        [&self.embeddings, &self.search, &self.answer]
            .iter()
            .filter(|s| !s.is_success())
            .count()
    }
}

/// Composite result returned to the chat client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Generated answer, or [`FALLBACK_ANSWER`]
    pub response: String,

    /// Embedding of the query as returned by the service. Not used by any
    /// later step; passed through to the caller untouched.
    pub embeddings: Vec<Value>,

    /// Retrieved documents in service order
    pub search_results: Vec<String>,

    pub steps: PipelineSteps,
}

impl QueryOutcome {
    /// Whether `response` came from the answer service
    pub fn is_answered(&self) -> bool {
        self.steps.answer.is_success()
    }
}

/// Value produced by one step together with its status
struct Step<T> {
    value: T,
    status: StepStatus,
}

impl<T> Step<T> {
    fn success(value: T) -> Self {
        Self {
            value,
            status: StepStatus::Success,
        }
    }

    fn fallback(value: T, step: Endpoint, reason: String) -> Self {
        tracing::warn!(step = %step, reason = %reason, "Pipeline step fell back to default");
        metrics::record_fallback(step.as_str());
        Self {
            value,
            status: StepStatus::Fallback { reason },
        }
    }
}

/// Sequential embeddings → search → answer pipeline
#[derive(Clone)]
pub struct RagPipeline {
    upstream: Arc<dyn Upstream>,
}

impl RagPipeline {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Build a pipeline talking HTTP to the configured services
    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        let upstream = HttpUpstream::new(config.clone())?;
        Ok(Self::new(Arc::new(upstream)))
    }

    /// Run one query to completion. Never fails; see the module docs.
    pub async fn run(&self, raw_query: &str) -> QueryOutcome {
        let start = Instant::now();
        let query = sanitize_text(raw_query);

        let embeddings = self.generate_embeddings(&query).await;
        let search = self.search_documents(&query).await;
        let context = chain_of_thought(&query, &search.value);
        let answer = self.generate_answer(&context, &query).await;

        let steps = PipelineSteps {
            embeddings: embeddings.status,
            search: search.status,
            answer: answer.status,
        };

        let elapsed = start.elapsed();
        metrics::record_query(elapsed.as_secs_f64(), steps.fallback_count());
        tracing::info!(
            query_chars = query.chars().count(),
            documents = search.value.len(),
            fallbacks = steps.fallback_count(),
            latency_ms = elapsed.as_millis() as u64,
            "Query completed"
        );

        QueryOutcome {
            response: answer.value,
            embeddings: embeddings.value,
            search_results: search.value,
            steps,
        }
    }

    async fn generate_embeddings(&self, text: &str) -> Step<Vec<Value>> {
        let step = Endpoint::Embeddings;
        match self.upstream.post_json(step, &json!({ "text": text })).await {
            Ok(body) => match take_field(body, "embeddings") {
                Some(Value::Array(values)) => Step::success(values),
                Some(_) => Step::fallback(Vec::new(), step, not_a("embeddings", "an array")),
                None => Step::fallback(Vec::new(), step, missing("embeddings")),
            },
            Err(e) => Step::fallback(Vec::new(), step, e.to_string()),
        }
    }

    async fn search_documents(&self, query: &str) -> Step<Vec<String>> {
        let step = Endpoint::Search;
        match self.upstream.post_json(step, &json!({ "query": query })).await {
            Ok(body) => match take_field(body, "results") {
                Some(Value::Array(values)) => {
                    Step::success(values.into_iter().map(document_text).collect())
                }
                Some(_) => Step::fallback(Vec::new(), step, not_a("results", "an array")),
                None => Step::fallback(Vec::new(), step, missing("results")),
            },
            Err(e) => Step::fallback(Vec::new(), step, e.to_string()),
        }
    }

    async fn generate_answer(&self, context: &str, question: &str) -> Step<String> {
        let step = Endpoint::Answer;
        let body = json!({ "context": context, "question": question });
        let fallback = || FALLBACK_ANSWER.to_string();

        match self.upstream.post_json(step, &body).await {
            Ok(body) => match take_field(body, "answer") {
                Some(Value::String(answer)) => Step::success(answer),
                Some(_) => Step::fallback(fallback(), step, not_a("answer", "a string")),
                None => Step::fallback(fallback(), step, missing("answer")),
            },
            Err(e) => Step::fallback(fallback(), step, e.to_string()),
        }
    }
}

/// Remove `field` from a response object; `null` counts as missing.
fn take_field(mut body: JsonObject, field: &str) -> Option<Value> {
    match body.remove(field) {
        Some(Value::Null) | None => None,
        value => value,
    }
}

/// Search results are meant to be strings; anything else is kept as JSON text.
fn document_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn missing(field: &str) -> String {
    format!("response has no `{}` field", field)
}

fn not_a(field: &str, expected: &str) -> String {
    format!("`{}` is not {}", field, expected)
}
