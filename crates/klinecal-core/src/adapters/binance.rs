use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::FetchConfig;
use crate::data_source::{KlinePageRequest, KlineSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};

const KLINES_PATH: &str = "/api/v3/klines";
const DAILY_INTERVAL: &str = "1d";

/// Spot kline adapter for the Binance REST API.
#[derive(Clone)]
pub struct BinanceKlineSource {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl Default for BinanceKlineSource {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl BinanceKlineSource {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()), config)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, config: &FetchConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.clone(),
            timeout_ms: config.timeout_ms,
        }
    }

    fn build_request(&self, req: &KlinePageRequest) -> HttpRequest {
        HttpRequest::get(format!("{}{KLINES_PATH}", self.base_url))
            .with_query("symbol", req.symbol.as_str())
            .with_query("interval", DAILY_INTERVAL)
            .with_query("startTime", req.start_ms)
            .with_query("endTime", req.end_ms)
            .with_query("limit", req.limit)
            .with_timeout_ms(self.timeout_ms)
    }
}

impl KlineSource for BinanceKlineSource {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn daily_klines<'a>(
        &'a self,
        req: KlinePageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let request = self.build_request(&req);
            debug!(
                url = %request.full_url(),
                start_ms = req.start_ms,
                end_ms = req.end_ms,
                limit = req.limit,
                "requesting kline page"
            );

            let response = self.http_client.execute(request).await.map_err(|error| {
                SourceError::transport(format!("binance transport error: {}", error.message()))
            })?;

            if !response.is_success() {
                return Err(SourceError::upstream_status(upstream_message(&response)));
            }

            parse_rows(&response.body)
        })
    }
}

/// Non-2xx error body, e.g. `{"code": -1121, "msg": "Invalid symbol."}`.
#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    msg: Option<String>,
}

fn upstream_message(response: &HttpResponse) -> String {
    serde_json::from_str::<BinanceErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.msg)
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or_else(|| response.status_line())
}

fn parse_rows(body: &str) -> Result<Vec<Value>, SourceError> {
    let value: Value = serde_json::from_str(body).map_err(|error| {
        SourceError::malformed_response(format!("kline response is not valid JSON: {error}"))
    })?;

    match value {
        Value::Array(rows) => Ok(rows),
        other => Err(SourceError::malformed_response(format!(
            "kline response must be a JSON list, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::HttpError;
    use crate::Symbol;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn replying(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn page() -> KlinePageRequest {
        let symbol = Symbol::parse("BTCUSDT").expect("valid symbol");
        KlinePageRequest::new(symbol, 1_704_067_200_000, 1_706_745_599_999, 1000).expect("valid")
    }

    fn source(client: Arc<RecordingHttpClient>) -> BinanceKlineSource {
        let config = FetchConfig::default().with_base_url("https://api.example.test/");
        BinanceKlineSource::with_http_client(client, &config)
    }

    #[tokio::test]
    async fn sends_daily_interval_and_window() {
        let client = RecordingHttpClient::replying(Ok(HttpResponse::ok_json("[]")));
        let rows = source(Arc::clone(&client))
            .daily_klines(page())
            .await
            .expect("empty list is fine");
        assert!(rows.is_empty());

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url, "https://api.example.test/api/v3/klines");
        assert_eq!(request.query_value("interval"), Some("1d"));
        assert_eq!(request.query_value("startTime"), Some("1704067200000"));
        assert_eq!(request.query_value("endTime"), Some("1706745599999"));
        assert_eq!(request.query_value("limit"), Some("1000"));
    }

    #[tokio::test]
    async fn non_success_carries_provider_message() {
        let client = RecordingHttpClient::replying(Ok(HttpResponse::with_status(
            400,
            r#"{"code":-1121,"msg":"Invalid symbol."}"#,
        )));
        let error = source(client).daily_klines(page()).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::UpstreamStatus);
        assert_eq!(error.message(), "Invalid symbol.");
    }

    #[tokio::test]
    async fn non_success_without_message_uses_status_line() {
        let mut response = HttpResponse::with_status(503, "<html>down</html>");
        response.reason = Some(String::from("Service Unavailable"));
        let client = RecordingHttpClient::replying(Ok(response));
        let error = source(client).daily_klines(page()).await.expect_err("must fail");
        assert_eq!(error.message(), "503 Service Unavailable");
    }

    #[tokio::test]
    async fn object_body_is_malformed() {
        let client = RecordingHttpClient::replying(Ok(HttpResponse::ok_json(r#"{"rows":[]}"#)));
        let error = source(client).daily_klines(page()).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::MalformedResponse);
        assert!(error.message().contains("an object"));
    }

    #[tokio::test]
    async fn transport_failure_is_retryable() {
        let client = RecordingHttpClient::replying(Err(HttpError::new("connection reset")));
        let error = source(client).daily_klines(page()).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Transport);
        assert!(error.retryable());
        assert!(error.message().contains("connection reset"));
    }
}
