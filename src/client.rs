use std::env;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, REFERER, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://www.unitedrugby.com/graphql";

const SEASON_STATS_OPERATION: &str = "GetPlayerSeasonStats1";
const SEASON_STATS_QUERY_HASH: &str =
    "0a0022eeecff7bbdae5667322bd51a42cac3c9260bd116acd4e3e338b314ce28";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Distinguishes rate limiting from everything else so batch callers can make
/// backoff decisions; the fetch layer itself never retries.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited: {message}")]
    RateLimited {
        retry_after: Option<u64>,
        message: String,
    },
    #[error("http {status}: {snippet}")]
    Status { status: StatusCode, snippet: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Source of raw per-player season stats. The batch coordinator only sees
/// this seam, so tests can script responses without a network.
pub trait StatsSource {
    fn player_season_stats(&self, player_id: u64, season_id: u32) -> Result<Value, FetchError>;
}

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client, FetchError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(FetchError::Http)
    })
}

/// Blocking client for the United Rugby Championship GraphQL API
/// (persisted queries over GET).
#[derive(Debug, Clone)]
pub struct UrcClient {
    endpoint: String,
}

impl UrcClient {
    pub fn new() -> Self {
        let endpoint = env::var("URC_GRAPHQL_ENDPOINT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self { endpoint }
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub(crate) fn get_operation(
        &self,
        operation: &str,
        variables: Value,
        query_hash: &str,
    ) -> Result<Value, FetchError> {
        let client = http_client()?;
        let extensions = json!({
            "persistedQuery": { "version": 1, "sha256Hash": query_hash }
        });

        debug!(endpoint = %self.endpoint, operation, "GET graphql");
        let resp = client
            .get(&self.endpoint)
            .query(&[
                ("operationName", operation),
                ("variables", variables.to_string().as_str()),
                ("extensions", extensions.to_string().as_str()),
            ])
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(REFERER, "https://www.unitedrugby.com/")
            .send()?;

        check_response(resp)
    }
}

impl Default for UrcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSource for UrcClient {
    fn player_season_stats(&self, player_id: u64, season_id: u32) -> Result<Value, FetchError> {
        self.get_operation(
            SEASON_STATS_OPERATION,
            json!({ "player_id": [player_id], "season_id": [season_id] }),
            SEASON_STATS_QUERY_HASH,
        )
    }
}

fn check_response(resp: Response) -> Result<Value, FetchError> {
    let status = resp.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = header_u64(&resp, RETRY_AFTER.as_str());
        warn!(?retry_after, "HTTP 429 Too Many Requests");
        return Err(FetchError::RateLimited {
            retry_after,
            message: "HTTP 429 Too Many Requests".to_string(),
        });
    }
    if status == StatusCode::SERVICE_UNAVAILABLE {
        warn!("HTTP 503 Service Unavailable (possible rate limit)");
        return Err(FetchError::RateLimited {
            retry_after: None,
            message: "HTTP 503 Service Unavailable".to_string(),
        });
    }

    // Some deployments expose quota headers; warn when close to the edge.
    for header in ["X-RateLimit-Remaining", "RateLimit-Remaining"] {
        if let Some(remaining) = header_u64(&resp, header) {
            debug!(header, remaining, "rate limit header");
            if remaining < 5 {
                warn!(remaining, "rate limit approaching");
            }
        }
    }

    let body = resp.text()?;
    let data: Value =
        serde_json::from_str(&body).unwrap_or_else(|_| json!({ "text": body }));

    // An embedded errors array can still signal throttling on a 200.
    if let Some(message) = rate_limit_message(&data) {
        warn!(message, "rate limit reported in response payload");
        return Err(FetchError::RateLimited {
            retry_after: None,
            message: message.to_string(),
        });
    }

    if !status.is_success() {
        let snippet = snippet_of(&data);
        return Err(FetchError::Status { status, snippet });
    }

    Ok(data)
}

fn header_u64(resp: &Response, name: &str) -> Option<u64> {
    resp.headers()
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn rate_limit_message(data: &Value) -> Option<&str> {
    const KEYWORDS: [&str; 5] = ["rate", "limit", "quota", "throttle", "too many"];
    let errors = data.get("errors")?.as_array()?;
    for error in errors {
        if let Some(message) = error.get("message").and_then(Value::as_str) {
            let lower = message.to_lowercase();
            if KEYWORDS.iter().any(|kw| lower.contains(kw)) {
                return Some(message);
            }
        }
    }
    None
}

fn snippet_of(data: &Value) -> String {
    let text = match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.trim()
        .replace('\n', " ")
        .replace('\r', " ")
        .chars()
        .take(220)
        .collect()
}
