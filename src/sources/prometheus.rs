use super::traits::{MetricSource, unavailable};
use crate::config::PrometheusSourceConfig;
use crate::engine::MetricSnapshot;
use crate::engine::metrics::HEALTHY_RESPONSE_P95_MS;
use crate::error::TransportError;
use crate::util::http_client::build_http_client_with_timeout;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

const SOURCE_NAME: &str = "prometheus";

/// Remote-query source: one instant query per metric against
/// `<url>/api/v1/query`. Never fails loudly; any problem is `Unavailable`.
pub struct PrometheusSource {
    base_url: String,
    config: PrometheusSourceConfig,
    client: reqwest::Client,
}

impl PrometheusSource {
    pub fn new(config: &PrometheusSourceConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            config: config.clone(),
            client: build_http_client_with_timeout(config.timeout_secs),
        }
    }

    /// `Ok(None)` when Prometheus answered but the vector was empty.
    async fn query(&self, query: &str) -> Result<Option<f64>, TransportError> {
        let resp = self
            .client
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| unavailable(SOURCE_NAME, format!("request failed: {e}")))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(unavailable(SOURCE_NAME, format!("HTTP {status}")));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| unavailable(SOURCE_NAME, format!("invalid response body: {e}")))?;
        parse_instant_value(&body)
    }

    async fn required(&self, label: &str, query: &str) -> Result<f64, TransportError> {
        self.query(query)
            .await?
            .ok_or_else(|| unavailable(SOURCE_NAME, format!("empty result for {label}")))
    }

    async fn optional(&self, query: Option<&str>, healthy: f64) -> Result<f64, TransportError> {
        match query {
            Some(query) => Ok(self.query(query).await?.unwrap_or(healthy)),
            None => Ok(healthy),
        }
    }

    async fn collect(&self) -> Result<MetricSnapshot, TransportError> {
        let cpu = self.required("cpu_query", &self.config.cpu_query).await?;
        let mem = self.required("mem_query", &self.config.mem_query).await?;
        let error_rate = self
            .optional(self.config.error_query.as_deref(), 0.0)
            .await?;
        let response_p95_ms = self
            .optional(self.config.latency_query.as_deref(), HEALTHY_RESPONSE_P95_MS)
            .await?;
        let restarts = self
            .optional(self.config.restart_query.as_deref(), 0.0)
            .await?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let restart_count = restarts.round().clamp(0.0, f64::from(u32::MAX)) as u32;
        let snapshot = MetricSnapshot {
            cpu_usage: cpu.clamp(0.0, 100.0),
            mem_usage: mem.clamp(0.0, 100.0),
            error_rate: error_rate.max(0.0),
            response_p95_ms: response_p95_ms.max(0.0),
            restart_count,
        };
        snapshot
            .validate()
            .map_err(|e| unavailable(SOURCE_NAME, e.to_string()))?;
        Ok(snapshot)
    }
}

impl MetricSource for PrometheusSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn sample(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<MetricSnapshot, TransportError>> + Send + '_>> {
        Box::pin(self.collect())
    }
}

/// Extract the first sample of an instant-vector response.
pub fn parse_instant_value(body: &Value) -> Result<Option<f64>, TransportError> {
    if body.get("status").and_then(Value::as_str) != Some("success") {
        return Err(unavailable(SOURCE_NAME, "query status was not success"));
    }
    let Some(first) = body
        .pointer("/data/result")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
    else {
        return Ok(None);
    };
    let raw = first
        .pointer("/value/1")
        .and_then(Value::as_str)
        .ok_or_else(|| unavailable(SOURCE_NAME, "sample has no value"))?;
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| unavailable(SOURCE_NAME, format!("non-numeric sample '{raw}': {e}")))
}
