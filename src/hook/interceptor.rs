//! Wrapping of operations with timing, audit and alerting.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::audit::{AuditRecord, CallContext, Outcome, Parameters};

use super::extract::{CallerExtractor, KeyExtractor};
use super::pipeline::Pipeline;

/// Declared sensitivity of a monitored endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl SecurityLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Per-endpoint interception options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    pub security_level: SecurityLevel,
    /// Record the call's parameters (redacted). When off, the record carries
    /// an empty mapping.
    pub log_params: bool,
    /// Record the successful result (redacted) in [`AuditRecord::response`].
    pub log_response: bool,
    /// Status recorded for a normal return.
    pub success_status: u16,
    /// Status recorded for a failure.
    pub error_status: u16,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            security_level: SecurityLevel::Medium,
            log_params: true,
            log_response: false,
            success_status: 200,
            error_status: 500,
        }
    }
}

impl MonitorOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    #[must_use]
    pub fn log_params(mut self, enabled: bool) -> Self {
        self.log_params = enabled;
        self
    }

    #[must_use]
    pub fn log_response(mut self, enabled: bool) -> Self {
        self.log_response = enabled;
        self
    }

    #[must_use]
    pub fn success_status(mut self, status: u16) -> Self {
        self.success_status = status;
        self
    }

    #[must_use]
    pub fn error_status(mut self, status: u16) -> Self {
        self.error_status = status;
        self
    }
}

/// Produces [`Monitored`] endpoints that share one pipeline.
#[derive(Clone)]
pub struct Interceptor {
    pipeline: Arc<Pipeline>,
    extractor: Arc<dyn CallerExtractor>,
}

impl Interceptor {
    /// Create an interceptor that reads caller metadata with [`KeyExtractor`].
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self::with_extractor(pipeline, KeyExtractor::new())
    }

    /// Create an interceptor with a custom caller extractor.
    pub fn with_extractor(
        pipeline: Arc<Pipeline>,
        extractor: impl CallerExtractor + 'static,
    ) -> Self {
        Self {
            pipeline,
            extractor: Arc::new(extractor),
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Wrap an endpoint. The returned handle audits every call made through it.
    pub fn wrap(&self, endpoint: impl Into<String>, options: MonitorOptions) -> Monitored {
        Monitored {
            endpoint: endpoint.into(),
            options,
            pipeline: self.pipeline.clone(),
            extractor: self.extractor.clone(),
        }
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// A wrapped endpoint.
///
/// Each call gets a fresh request id and context. The record and its alerts
/// reach the sink before the operation's result is handed back, on success,
/// on failure, and when the operation panics. Dropping the call future before
/// the operation finishes emits nothing.
#[derive(Clone)]
pub struct Monitored {
    endpoint: String,
    options: MonitorOptions,
    pipeline: Arc<Pipeline>,
    extractor: Arc<dyn CallerExtractor>,
}

impl Monitored {
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    /// Run `operation` with `parameters`, recording `success_status` on
    /// `Ok` and `error_status` on `Err`.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, unchanged.
    pub async fn call<T, E, F, Fut>(&self, parameters: Parameters, operation: F) -> Result<T, E>
    where
        F: FnOnce(Parameters) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: fmt::Display,
    {
        let success = self.options.success_status;
        let error = self.options.error_status;
        self.call_with_status(parameters, operation, move |result: &Result<T, E>| {
            if result.is_ok() {
                success
            } else {
                error
            }
        })
        .await
    }

    /// Like [`Monitored::call`], but `classify` picks the recorded status
    /// from the operation's result, e.g. 401 for a rejected login.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, unchanged.
    pub async fn call_with_status<T, E, F, Fut, C>(
        &self,
        parameters: Parameters,
        operation: F,
        classify: C,
    ) -> Result<T, E>
    where
        F: FnOnce(Parameters) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: fmt::Display,
        C: FnOnce(&Result<T, E>) -> u16,
    {
        let context = self.context_for(&parameters);
        let span = tracing::info_span!(
            "api_call",
            request_id = %context.request_id,
            endpoint = %context.endpoint,
            method = %context.method,
            security_level = self.options.security_level.as_str(),
        );
        self.run(context, parameters, operation, classify)
            .instrument(span)
            .await
    }

    fn context_for(&self, parameters: &Parameters) -> CallContext {
        let caller = self.extractor.extract(parameters);
        let context = CallContext::new(self.endpoint.as_str())
            .user_id(caller.user_id_or_default())
            .source_ip(caller.source_ip_or_default())
            .method(caller.method_or_default());

        if self.options.log_params {
            context.parameters(parameters.clone())
        } else {
            context
        }
    }

    async fn run<T, E, F, Fut, C>(
        &self,
        context: CallContext,
        parameters: Parameters,
        operation: F,
        classify: C,
    ) -> Result<T, E>
    where
        F: FnOnce(Parameters) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: fmt::Display,
        C: FnOnce(&Result<T, E>) -> u16,
    {
        tracing::trace!("call started");
        let start = Instant::now();
        // Classifier panics are audited the same as operation panics.
        let caught = AssertUnwindSafe(async move {
            let result = operation(parameters).await;
            let status = classify(&result);
            (result, status)
        })
        .catch_unwind()
        .await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let record = match &caught {
            Ok((result, status)) => self.record_result(&context, elapsed_ms, result, *status),
            Err(payload) => {
                let message = format!("panicked: {}", panic_message(&**payload));
                tracing::error!("API Error: {} - {message}", self.endpoint);
                self.pipeline.builder().build(
                    &context,
                    self.options.error_status,
                    elapsed_ms,
                    Outcome::Error,
                    Some(message),
                )
            }
        };
        tracing::trace!(status = record.response_code, result = record.outcome.as_str(), "record built");

        let alerts = self.pipeline.emit_record(&record).await;
        tracing::trace!(alerts = alerts.len(), "call done");

        match caught {
            Ok((result, _)) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    fn record_result<T: Serialize, E: fmt::Display>(
        &self,
        context: &CallContext,
        elapsed_ms: f64,
        result: &Result<T, E>,
        status: u16,
    ) -> AuditRecord {
        let builder = self.pipeline.builder();
        match result {
            Ok(value) => {
                let response = if self.options.log_response {
                    self.capture_response(value)
                } else {
                    None
                };
                builder
                    .build(context, status, elapsed_ms, Outcome::Success, None)
                    .with_response(response)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("API Error: {} - {message}", self.endpoint);
                builder.build(context, status, elapsed_ms, Outcome::Error, Some(message))
            }
        }
    }

    fn capture_response<T: Serialize>(&self, value: &T) -> Option<serde_json::Value> {
        match serde_json::to_value(value) {
            Ok(json) => Some(self.pipeline.builder().redactor().sanitize_value(&json)),
            Err(e) => {
                tracing::warn!(error = %e, "Response is not serializable, not recorded");
                None
            }
        }
    }
}

impl fmt::Debug for Monitored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitored")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
