use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use quant_dash_core::error::FetchError;
use quant_dash_core::traits::{SourceFetcher, SourceKind};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;

pub struct ServiceClient {
    http_client: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>>,
}

impl ServiceClient {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        // The data service is a single small FastAPI process; 10/s is plenty
        // for every view refreshing at once.
        let quota = Quota::per_second(NonZeroU32::new(10).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            http_client: Client::new(),
            base_url,
            rate_limiter,
        }
    }

    /// Issues one idempotent GET and decodes the body as JSON.
    ///
    /// The service reports application-level failures as a 200 with an
    /// `{"error": ...}` body; those are treated as malformed responses, the
    /// same as a body that fails to decode.
    ///
    /// # Errors
    /// [`FetchError::Transport`] when the request cannot reach the service,
    /// [`FetchError::Status`] on a non-2xx response, [`FetchError::Malformed`]
    /// when the body is not usable JSON.
    pub async fn get(&self, endpoint: &str) -> Result<Value, FetchError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let json: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        if let Some(message) = service_error(&json) {
            return Err(FetchError::Malformed(message));
        }
        Ok(json)
    }
}

/// Maps a source to its service route. The forecast source serves the
/// index-wide table when no symbol is given and the per-symbol series
/// otherwise.
#[must_use]
pub fn endpoint_for(kind: SourceKind, symbol: Option<&str>) -> String {
    match kind {
        SourceKind::IndexHistory => "/api/ftse100".to_string(),
        SourceKind::Forecast => symbol.map_or_else(
            || "/api/predictions".to_string(),
            |s| format!("/api/company-predictions?company={s}"),
        ),
        SourceKind::ModelScorecards => "/api/model-accuracies".to_string(),
        SourceKind::CircuitMetrics => "/api/quantum-metrics".to_string(),
        SourceKind::LastUpdate => "/api/predictions-last-update".to_string(),
    }
}

fn service_error(json: &Value) -> Option<String> {
    json.as_object()?
        .get("error")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

#[async_trait::async_trait]
impl SourceFetcher for ServiceClient {
    async fn fetch(&self, kind: SourceKind, symbol: Option<&str>) -> Result<Value, FetchError> {
        let endpoint = endpoint_for(kind, symbol);
        tracing::debug!(source = kind.name(), %endpoint, "fetching");
        self.get(&endpoint).await
    }
}
