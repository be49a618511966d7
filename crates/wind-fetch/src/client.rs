//! Chunked, rate-limited forecast client for the Open-Meteo API.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wind_common::{SamplePoint, WindSeries};

use crate::error::FetchError;
use crate::governor::RateGovernor;
use crate::transport::{HttpTransport, TransportResponse};

/// Body phrase the upstream uses when the daily quota is exhausted.
const DAILY_LIMIT_PHRASE: &str = "daily api request limit exceeded";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    /// Upstream ceiling on coordinates per request.
    pub max_points_per_request: usize,
    /// Total attempts per request, including the first.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Minimum spacing between attempt starts, process-wide.
    pub min_fetch_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub forecast_days: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            max_points_per_request: 85,
            max_retries: 4,
            retry_base_delay_ms: 1_200,
            retry_max_delay_ms: 8_000,
            min_fetch_interval_ms: 3_500,
            request_timeout_ms: 20_000,
            forecast_days: 2,
        }
    }
}

impl FetchConfig {
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .retry_base_delay_ms
            .saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(exp.min(self.retry_max_delay_ms))
    }
}

/// One upstream dataset. The API returns an object for a single
/// coordinate and an array of objects for a coordinate list, so the
/// payload is decoded through an untagged enum.
#[derive(Debug, Deserialize)]
struct ForecastDataset {
    hourly: HourlySeries,
}

#[derive(Debug, Deserialize)]
struct HourlySeries {
    time: Vec<String>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ForecastPayload {
    Many(Vec<ForecastDataset>),
    One(ForecastDataset),
}

impl ForecastPayload {
    fn into_datasets(self) -> Vec<ForecastDataset> {
        match self {
            ForecastPayload::Many(datasets) => datasets,
            ForecastPayload::One(dataset) => vec![dataset],
        }
    }
}

/// Fetches hourly wind series for a list of sample points, splitting
/// the list into upstream-sized chunks and stitching the results back
/// in point order.
pub struct OpenMeteoClient {
    config: FetchConfig,
    transport: Arc<dyn HttpTransport>,
    governor: Arc<RateGovernor>,
}

impl OpenMeteoClient {
    pub fn new(
        config: FetchConfig,
        transport: Arc<dyn HttpTransport>,
        governor: Arc<RateGovernor>,
    ) -> Self {
        Self {
            config,
            transport,
            governor,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch the full series for `points`, preserving point order.
    ///
    /// Chunks are fetched sequentially; the shared governor spaces
    /// every attempt. Timestamps are taken from the first dataset,
    /// since all chunks share the same forecast window.
    pub async fn fetch_series(
        &self,
        points: &[SamplePoint],
        cancel: &CancellationToken,
    ) -> Result<WindSeries, FetchError> {
        if points.is_empty() {
            return Ok(WindSeries::default());
        }

        let mut series = WindSeries {
            times: Vec::new(),
            speeds_by_point: Vec::with_capacity(points.len()),
            directions_by_point: Vec::with_capacity(points.len()),
        };

        let chunk_count = points.len().div_ceil(self.config.max_points_per_request);
        for (index, chunk) in points
            .chunks(self.config.max_points_per_request)
            .enumerate()
        {
            debug!(
                chunk = index + 1,
                of = chunk_count,
                points = chunk.len(),
                "fetching forecast chunk"
            );
            let url = self.chunk_url(chunk);
            let datasets = self.fetch_chunk(&url, cancel).await?;
            if datasets.is_empty() {
                return Err(FetchError::Decode("response carried no datasets".to_string()));
            }
            if series.times.is_empty() {
                series.times = datasets[0].hourly.time.clone();
            }
            // A short array reuses its final dataset so point
            // correlation stays positional.
            for index in 0..chunk.len() {
                let dataset = datasets.get(index).unwrap_or(&datasets[datasets.len() - 1]);
                series
                    .speeds_by_point
                    .push(dataset.hourly.wind_speed_10m.clone());
                series
                    .directions_by_point
                    .push(dataset.hourly.wind_direction_10m.clone());
            }
        }

        Ok(series)
    }

    fn chunk_url(&self, chunk: &[SamplePoint]) -> String {
        let latitudes: Vec<String> = chunk.iter().map(|p| format!("{:.4}", p.lat)).collect();
        let longitudes: Vec<String> = chunk.iter().map(|p| format!("{:.4}", p.lon)).collect();
        format!(
            "{}?latitude={}&longitude={}&hourly=wind_speed_10m,wind_direction_10m&wind_speed_unit=kmh&timezone=UTC&forecast_days={}",
            self.config.base_url,
            latitudes.join(","),
            longitudes.join(","),
            self.config.forecast_days
        )
    }

    async fn fetch_chunk(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ForecastDataset>, FetchError> {
        let response = self.fetch_with_retry(url, cancel).await?;
        let payload: ForecastPayload = serde_json::from_str(&response.body)
            .map_err(|err| FetchError::Decode(err.to_string()))?;
        Ok(payload.into_datasets())
    }

    /// Issue a GET with retry on 429/5xx/network failure, exponential
    /// backoff, and cooperative cancellation. A daily-quota body ends
    /// the retry loop immediately regardless of remaining attempts.
    async fn fetch_with_retry(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, FetchError> {
        let mut last_error = FetchError::Network("no attempts made".to_string());

        for attempt in 0..self.config.max_retries {
            if cancel.is_cancelled() {
                return Err(FetchError::Aborted);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Aborted),
                _ = self.governor.wait_and_mark() => {}
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Aborted),
                outcome = self.transport.get(url) => outcome,
            };

            last_error = match outcome {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    if response.body.to_lowercase().contains(DAILY_LIMIT_PHRASE) {
                        return Err(FetchError::DailyLimit);
                    }
                    match response.status {
                        429 => FetchError::RateLimited,
                        status if status >= 500 => FetchError::Upstream {
                            status,
                            message: truncate_body(&response.body),
                        },
                        status => {
                            return Err(FetchError::Upstream {
                                status,
                                message: truncate_body(&response.body),
                            })
                        }
                    }
                }
                Err(FetchError::Aborted) => return Err(FetchError::Aborted),
                Err(err) => err,
            };

            if attempt + 1 < self.config.max_retries {
                let delay = self.config.backoff_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "forecast request failed, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Aborted),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(last_error)
    }
}

fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.len() <= LIMIT {
        body.to_string()
    } else {
        let mut end = LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, FetchError>>>,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<TransportResponse, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<TransportResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(FetchError::Network("script exhausted".to_string()))
                })
        }
    }

    fn ok_body(point_count: usize) -> String {
        let dataset = r#"{"hourly":{"time":["2026-08-31T00:00","2026-08-31T01:00"],"wind_speed_10m":[10.0,12.5],"wind_direction_10m":[180.0,null]}}"#;
        if point_count == 1 {
            dataset.to_string()
        } else {
            let datasets: Vec<&str> = (0..point_count).map(|_| dataset).collect();
            format!("[{}]", datasets.join(","))
        }
    }

    fn ok(point_count: usize) -> Result<TransportResponse, FetchError> {
        Ok(TransportResponse {
            status: 200,
            body: ok_body(point_count),
        })
    }

    fn status(code: u16, body: &str) -> Result<TransportResponse, FetchError> {
        Ok(TransportResponse {
            status: code,
            body: body.to_string(),
        })
    }

    fn test_config() -> FetchConfig {
        FetchConfig {
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 4,
            min_fetch_interval_ms: 0,
            ..FetchConfig::default()
        }
    }

    fn client(config: FetchConfig, transport: Arc<ScriptedTransport>) -> OpenMeteoClient {
        OpenMeteoClient::new(
            config,
            transport,
            Arc::new(RateGovernor::new(Duration::from_millis(0))),
        )
    }

    fn points(count: usize) -> Vec<SamplePoint> {
        (0..count)
            .map(|i| SamplePoint {
                lat: 45.0 + i as f64 * 0.01,
                lon: -3.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn single_object_payload_decodes() {
        let transport = ScriptedTransport::new(vec![ok(1)]);
        let client = client(test_config(), transport.clone());
        let series = client
            .fetch_series(&points(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(series.times.len(), 2);
        assert_eq!(series.speed_at(0, 0), Some(10.0));
        assert_eq!(series.direction_at(0, 1), None);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn retries_on_429_up_to_attempt_ceiling() {
        let transport = ScriptedTransport::new(vec![
            status(429, "slow down"),
            status(429, "slow down"),
            status(429, "slow down"),
            status(429, "slow down"),
        ]);
        let client = client(test_config(), transport.clone());
        let err = client
            .fetch_series(&points(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test]
    async fn recovers_after_transient_server_error() {
        let transport = ScriptedTransport::new(vec![status(502, "bad gateway"), ok(1)]);
        let client = client(test_config(), transport.clone());
        let series = client
            .fetch_series(&points(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(series.speeds_by_point.len(), 1);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn daily_limit_body_is_terminal() {
        let transport = ScriptedTransport::new(vec![status(
            429,
            r#"{"reason":"Daily API request limit exceeded"}"#,
        )]);
        let client = client(test_config(), transport.clone());
        let err = client
            .fetch_series(&points(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_daily_limit());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![status(400, "bad latitude")]);
        let client = client(test_config(), transport.clone());
        let err = client
            .fetch_series(&points(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Upstream { status: 400, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn cancellation_short_circuits_without_a_request() {
        let transport = ScriptedTransport::new(vec![ok(1)]);
        let client = client(test_config(), transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client.fetch_series(&points(1), &cancel).await.unwrap_err();
        assert!(err.is_aborted());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_aborts_without_a_retry() {
        let transport = ScriptedTransport::new(vec![status(500, "boom")]);
        let config = FetchConfig {
            min_fetch_interval_ms: 0,
            ..FetchConfig::default()
        };
        let client = client(config, transport.clone());
        let cancel = CancellationToken::new();

        // With paused time the short sleep fires before the 1.2s
        // backoff, so the cancel lands inside the retry wait.
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        };
        let points = points(1);
        let (result, ()) = tokio::join!(client.fetch_series(&points, &cancel), canceller);

        assert!(result.unwrap_err().is_aborted());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn large_grids_are_chunked_and_stitched_in_order() {
        let transport = ScriptedTransport::new(vec![ok(85), ok(15)]);
        let client = client(test_config(), transport.clone());
        let series = client
            .fetch_series(&points(100), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(series.speeds_by_point.len(), 100);
        assert_eq!(series.directions_by_point.len(), 100);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn url_carries_joined_coordinates_and_units() {
        let transport = ScriptedTransport::new(vec![ok(2)]);
        let client = client(test_config(), transport.clone());
        client
            .fetch_series(&points(2), &CancellationToken::new())
            .await
            .unwrap();

        let urls = transport.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("latitude=45.0000,45.0100"));
        assert!(urls[0].contains("longitude=-3.0000,-3.0000"));
        assert!(urls[0].contains("hourly=wind_speed_10m,wind_direction_10m"));
        assert!(urls[0].contains("wind_speed_unit=kmh"));
        assert!(urls[0].contains("timezone=UTC"));
        assert!(urls[0].contains("forecast_days=2"));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = FetchConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_millis(1_200));
        assert_eq!(config.backoff_delay(1), Duration::from_millis(2_400));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(4_800));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(8_000));
    }

    #[tokio::test]
    async fn short_dataset_array_reuses_its_final_dataset() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse {
            status: 200,
            body: format!("[{}]", ok_body(1)),
        })]);
        let client = client(test_config(), transport);
        let series = client
            .fetch_series(&points(3), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(series.speeds_by_point.len(), 3);
        assert_eq!(series.speed_at(2, 0), Some(10.0));
    }

    #[tokio::test]
    async fn empty_dataset_array_is_a_decode_error() {
        let transport = ScriptedTransport::new(vec![status(200, "[]")]);
        let client = client(test_config(), transport);
        let err = client
            .fetch_series(&points(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }
}
