use std::fmt;
use std::time::Duration;

use crate::client::MetadataGraph;
use crate::error::EmitterError;

/// One structured-property write, derived from a retention fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyUpsertRequest {
    pub urn: String,
    pub property_urn: String,
    pub value: i64,
}

/// Why an upsert failed, coarse enough to drive retry and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureKind {
    /// 401/403. Likely systemic; surfaced prominently but never retried.
    Unauthorized,
    /// 404. The property definition was never bootstrapped; never retried.
    PropertyNotFound,
    /// Timeouts, connection resets, 429 and 5xx. Worth a bounded retry.
    Transient,
    /// The request itself was malformed (e.g. a rejected URN component).
    Invalid,
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::PropertyNotFound => "property-not-found",
            FailureKind::Transient => "transient",
            FailureKind::Invalid => "invalid",
            FailureKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

impl FailureKind {
    fn retryable(self) -> bool {
        matches!(self, FailureKind::Transient)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertFailure {
    pub kind: FailureKind,
    pub detail: String,
}

/// The recorded result of one attempted (or rejected) upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub urn: String,
    pub result: Result<(), UpsertFailure>,
}

impl SyncOutcome {
    pub fn success(urn: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            result: Ok(()),
        }
    }

    pub fn failure(urn: impl Into<String>, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            result: Err(UpsertFailure {
                kind,
                detail: detail.into(),
            }),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Bounded retry with exponential backoff, applied to transient failures only.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> Duration {
        // attempt is 1-based; the first retry waits base_delay.
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

pub fn classify(err: &EmitterError) -> FailureKind {
    match err {
        EmitterError::Http(http) => {
            if http.is_timeout() || http.is_connect() {
                return FailureKind::Transient;
            }
            // Statusless errors that are neither timeout nor connect (request
            // builder failures, body decode errors) will not self-resolve.
            match http.status().map(|status| status.as_u16()) {
                Some(code) => classify_status(code),
                None => FailureKind::Unknown,
            }
        }
        EmitterError::Api { status, .. } => classify_status(*status),
        EmitterError::InvalidComponent(_) => FailureKind::Invalid,
        _ => FailureKind::Unknown,
    }
}

fn classify_status(status: u16) -> FailureKind {
    match status {
        401 | 403 => FailureKind::Unauthorized,
        404 => FailureKind::PropertyNotFound,
        429 => FailureKind::Transient,
        500..=599 => FailureKind::Transient,
        _ => FailureKind::Unknown,
    }
}

/// Performs one upsert, retrying transient failures up to the policy bound.
///
/// Never returns an error: whatever happens is folded into the request's own
/// [`SyncOutcome`], so one bad entity cannot abort a batch.
pub async fn upsert_with_retry(
    graph: &dyn MetadataGraph,
    request: &PropertyUpsertRequest,
    policy: &RetryPolicy,
) -> SyncOutcome {
    let attempts = policy.max_attempts.max(1);

    let mut last_failure = None;
    for attempt in 1..=attempts {
        match graph
            .upsert_structured_property(&request.urn, &request.property_urn, request.value)
            .await
        {
            Ok(()) => return SyncOutcome::success(request.urn.clone()),
            Err(err) => {
                let kind = classify(&err);
                if kind.retryable() && attempt < attempts {
                    let delay = policy.delay_before(attempt);
                    log::warn!(
                        "transient failure on {} (attempt {attempt}/{attempts}), retrying in {:?}: {err}",
                        request.urn,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    log::warn!("upsert failed on {} ({kind}): {err}", request.urn);
                }
                last_failure = Some((kind, err.to_string()));
                if !kind.retryable() {
                    break;
                }
            }
        }
    }

    let (kind, detail) = last_failure.expect("at least one attempt was made");
    SyncOutcome::failure(request.urn.clone(), kind, detail)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::Result;

    struct FlakyGraph {
        calls: AtomicU32,
        failures_before_success: u32,
        failure: fn() -> EmitterError,
    }

    impl FlakyGraph {
        fn new(failures_before_success: u32, failure: fn() -> EmitterError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_before_success,
                failure,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetadataGraph for FlakyGraph {
        async fn check_connectivity(&self) -> Result<()> {
            Ok(())
        }

        async fn upsert_structured_property(&self, _: &str, _: &str, _: i64) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err((self.failure)())
            } else {
                Ok(())
            }
        }
    }

    fn request() -> PropertyUpsertRequest {
        PropertyUpsertRequest {
            urn: "urn:li:dataset:(urn:li:dataPlatform:snowflake,a.public.t,PROD)".to_string(),
            property_urn: crate::urn::structured_property_urn(crate::urn::RETENTION_PROPERTY_ID),
            value: 30,
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    fn server_error() -> EmitterError {
        EmitterError::Api {
            status: 503,
            body: "service unavailable".to_string(),
        }
    }

    fn forbidden() -> EmitterError {
        EmitterError::Api {
            status: 403,
            body: "forbidden".to_string(),
        }
    }

    #[test]
    fn classification_matches_status_taxonomy() {
        assert_eq!(classify(&forbidden()), FailureKind::Unauthorized);
        assert_eq!(
            classify(&EmitterError::Api {
                status: 404,
                body: String::new()
            }),
            FailureKind::PropertyNotFound
        );
        assert_eq!(classify(&server_error()), FailureKind::Transient);
        assert_eq!(
            classify(&EmitterError::Api {
                status: 429,
                body: String::new()
            }),
            FailureKind::Transient
        );
        assert_eq!(
            classify(&EmitterError::Api {
                status: 400,
                body: String::new()
            }),
            FailureKind::Unknown
        );
        assert_eq!(
            classify(&EmitterError::InvalidComponent("x".to_string())),
            FailureKind::Invalid
        );
    }

    #[test]
    fn statusless_request_errors_are_not_retried() {
        // An invalid URL yields a reqwest error with no status that is
        // neither a timeout nor a connect failure.
        let err = reqwest::Client::new().get("http://").build().unwrap_err();
        assert!(!err.is_timeout() && !err.is_connect());
        assert!(err.status().is_none());

        let kind = classify(&EmitterError::Http(err));
        assert_eq!(kind, FailureKind::Unknown);
        assert!(!kind.retryable());
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let graph = FlakyGraph::new(2, server_error);
        let outcome = upsert_with_retry(&graph, &request(), &fast_policy()).await;

        assert!(outcome.succeeded());
        assert_eq!(graph.calls(), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let graph = FlakyGraph::new(u32::MAX, server_error);
        let outcome = upsert_with_retry(&graph, &request(), &fast_policy()).await;

        assert!(!outcome.succeeded());
        assert_eq!(graph.calls(), 3);
        assert_eq!(
            outcome.result.unwrap_err().kind,
            FailureKind::Transient
        );
    }

    #[tokio::test]
    async fn authorization_failures_are_never_retried() {
        let graph = FlakyGraph::new(u32::MAX, forbidden);
        let outcome = upsert_with_retry(&graph, &request(), &fast_policy()).await;

        assert!(!outcome.succeeded());
        assert_eq!(graph.calls(), 1);
        assert_eq!(
            outcome.result.unwrap_err().kind,
            FailureKind::Unauthorized
        );
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_before(1), Duration::from_millis(100));
        assert_eq!(policy.delay_before(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before(3), Duration::from_millis(400));
    }
}
