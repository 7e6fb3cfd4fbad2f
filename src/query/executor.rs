//! Query Executor Module
//!
//! One remote SQL call per `execute`, with the response classified into the
//! [`QueryError`] taxonomy. The query text is sent verbatim.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::Token;
use crate::error::QueryError;

/// Result rows as returned by the upstream: one JSON object per row.
pub type Rows = Vec<Value>;

/// Longest upstream error body quoted in a `RemoteFailure`.
const MAX_ERROR_BODY: usize = 512;

// == Query Executor ==
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs `query` once with `token`.
    ///
    /// Returns `Unauthorized` for a rejected token, `Timeout` when the time
    /// budget is exceeded, and `RemoteFailure` for anything else.
    async fn execute(&self, query: &str, token: &Token) -> Result<Rows, QueryError>;
}

#[derive(Serialize)]
struct SqlRequest<'a> {
    comsql: &'a str,
    parsql: [Value; 0],
    pespar: &'static str,
}

// == HTTP Query Executor ==
#[derive(Debug, Clone)]
pub struct HttpQueryExecutor {
    http: reqwest::Client,
    url: String,
    /// Rows beyond this count are dropped
    max_rows: usize,
}

impl HttpQueryExecutor {
    /// Builds an executor whose calls are bounded by `timeout`.
    ///
    /// # Arguments
    /// * `url` - The SQL execution endpoint
    /// * `timeout` - Per-call time budget, in the order of minutes for heavy reports
    /// * `max_rows` - Upper bound on rows accepted from a single call
    pub fn new(url: impl Into<String>, timeout: Duration, max_rows: usize) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            max_rows,
        })
    }
}

#[async_trait]
impl QueryExecutor for HttpQueryExecutor {
    async fn execute(&self, query: &str, token: &Token) -> Result<Rows, QueryError> {
        let started = Instant::now();
        debug!("Executing SQL ({} bytes)", query.len());

        let body = SqlRequest {
            comsql: query,
            parsql: [],
            pespar: "S",
        };
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(token.value())
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(QueryError::Unauthorized);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("SQL endpoint returned {}", status);
            return Err(QueryError::RemoteFailure(format!(
                "upstream returned {}: {}",
                status,
                truncate(&detail, MAX_ERROR_BODY)
            )));
        }

        let payload = response.bytes().await.map_err(classify_transport_error)?;
        let rows = decode_rows(&payload, self.max_rows)?;

        info!(
            "SQL executed in {}ms - {} rows",
            started.elapsed().as_millis(),
            rows.len()
        );
        Ok(rows)
    }
}

// == Response Classification ==
fn classify_transport_error(error: reqwest::Error) -> QueryError {
    if error.is_timeout() {
        QueryError::Timeout(error.to_string())
    } else if error.is_decode() {
        QueryError::RemoteFailure(format!("malformed payload: {}", error))
    } else {
        QueryError::RemoteFailure(error.to_string())
    }
}

// == Row Decoding ==
#[derive(Debug, PartialEq)]
enum Decoded {
    Rows(Rows),
    /// Total number of rows in a result larger than the cap
    OverLimit(usize),
}

/// Decodes a row array, materializing at most `max_rows` rows.
#[derive(Clone, Copy)]
struct CappedRows {
    max_rows: usize,
}

impl<'de> DeserializeSeed<'de> for CappedRows {
    type Value = Decoded;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Decoded, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for CappedRows {
    type Value = Decoded;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of rows")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Decoded, E> {
        Ok(Decoded::Rows(Vec::new()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Decoded, A::Error> {
        let mut rows = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(self.max_rows));
        while rows.len() < self.max_rows {
            match seq.next_element::<Value>()? {
                Some(row) => rows.push(row),
                None => return Ok(Decoded::Rows(rows)),
            }
        }

        // Count the rest without keeping it
        let mut total = rows.len();
        while seq.next_element::<IgnoredAny>()?.is_some() {
            total += 1;
        }
        if total == rows.len() {
            Ok(Decoded::Rows(rows))
        } else {
            Ok(Decoded::OverLimit(total))
        }
    }
}

/// Parses an upstream payload into rows.
///
/// `null` is an empty result. A result larger than `max_rows` is a failure
/// rather than a silently partial answer.
fn decode_rows(payload: &[u8], max_rows: usize) -> Result<Rows, QueryError> {
    let mut deserializer = serde_json::Deserializer::from_slice(payload);
    let decoded = CappedRows { max_rows }
        .deserialize(&mut deserializer)
        .and_then(|decoded| deserializer.end().map(|_| decoded))
        .map_err(|e| QueryError::RemoteFailure(format!("malformed payload: {}", e)))?;

    match decoded {
        Decoded::Rows(rows) => Ok(rows),
        Decoded::OverLimit(total) => {
            warn!("SQL returned {} rows, over the limit of {}", total, max_rows);
            Err(QueryError::RemoteFailure(format!(
                "result has {} rows, over the limit of {}",
                total, max_rows
            )))
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
