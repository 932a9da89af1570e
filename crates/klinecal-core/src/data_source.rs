//! Kline source contract and its error type.
//!
//! A [`KlineSource`] returns one page of raw daily kline rows exactly as the
//! provider sent them. Row parsing and validation happen in
//! [`crate::fetcher`], so a source only has to deal with transport and the
//! top-level response shape.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::{Symbol, ValidationError};

/// Largest page the provider serves per request.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Source-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Rejected before any network call.
    InvalidRequest,
    /// Network failure, timeout, or unreadable body.
    Transport,
    /// Provider answered with a non-2xx status.
    UpstreamStatus,
    /// Provider answered 2xx with a body that is not a list of rows.
    MalformedResponse,
}

/// Structured error surfaced to fetch callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn upstream_status(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::UpstreamStatus,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedResponse,
            message: message.into(),
            retryable: true,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether offering the user a manual retry makes sense.
    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::UpstreamStatus => "source.upstream_status",
            SourceErrorKind::MalformedResponse => "source.malformed_response",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

/// One page of daily klines for `[start_ms, end_ms]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlinePageRequest {
    pub symbol: Symbol,
    pub start_ms: i64,
    pub end_ms: i64,
    pub limit: usize,
}

impl KlinePageRequest {
    pub fn new(
        symbol: Symbol,
        start_ms: i64,
        end_ms: i64,
        limit: usize,
    ) -> Result<Self, SourceError> {
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(SourceError::invalid_request(format!(
                "kline page limit must be within 1..={MAX_PAGE_LIMIT}, got {limit}"
            )));
        }
        if start_ms >= end_ms {
            return Err(SourceError::invalid_request(format!(
                "kline page start {start_ms} must precede end {end_ms}"
            )));
        }
        Ok(Self {
            symbol,
            start_ms,
            end_ms,
            limit,
        })
    }
}

/// Provider adapter contract.
///
/// Implementations must be `Send + Sync`; one source is shared by every
/// fetch issued through a [`crate::KlineFetcher`].
pub trait KlineSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Fetches one page of raw rows in the provider's positional format,
    /// ascending by open time.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the transport fails, the provider answers
    /// with a non-2xx status, or the body is not a JSON list.
    fn daily_klines<'a>(
        &'a self,
        req: KlinePageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, SourceError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> Symbol {
        Symbol::parse("BTCUSDT").expect("valid symbol")
    }

    #[test]
    fn page_limit_is_bounded() {
        let err = KlinePageRequest::new(btc(), 0, 10, 1001).expect_err("too large");
        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
        assert!(!err.retryable());
        assert!(KlinePageRequest::new(btc(), 0, 10, 0).is_err());
        assert!(KlinePageRequest::new(btc(), 0, 10, 1000).is_ok());
    }

    #[test]
    fn page_window_must_be_forward() {
        assert!(KlinePageRequest::new(btc(), 10, 10, 5).is_err());
    }

    #[test]
    fn validation_errors_become_invalid_requests() {
        let error = SourceError::from(ValidationError::EmptySymbol);
        assert_eq!(error.code(), "source.invalid_request");
        assert_eq!(error.to_string(), "symbol cannot be empty (source.invalid_request)");
    }
}
