//! Per-record anomaly rules.

use super::types::{Alert, AuditRecord, Outcome, Severity};

/// Alert raised when a call exceeds the slow-call threshold.
pub const SLOW_RESPONSE_TIME: &str = "Slow Response Time";
/// Alert raised when a call fails.
pub const API_ERROR: &str = "API Error";
/// Alert raised for a 401 response.
pub const UNAUTHORIZED_ACCESS: &str = "Unauthorized Access";

/// Evaluates one record at a time against a fixed rule set.
///
/// Rules are independent; a single record can raise all three alerts. No
/// state is kept between records.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    slow_call_threshold_ms: f64,
}

impl RuleEngine {
    #[must_use]
    pub fn new(slow_call_threshold_ms: f64) -> Self {
        Self {
            slow_call_threshold_ms,
        }
    }

    #[must_use]
    pub fn slow_call_threshold_ms(&self) -> f64 {
        self.slow_call_threshold_ms
    }

    /// Return the alerts raised by `record`, in rule order.
    #[must_use]
    pub fn evaluate(&self, record: &AuditRecord) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if record.response_time_ms > self.slow_call_threshold_ms {
            alerts.push(Alert::new(
                SLOW_RESPONSE_TIME,
                format!(
                    "API {} took {}ms",
                    record.endpoint, record.response_time_ms
                ),
                Severity::Warning,
            ));
        }

        if record.outcome == Outcome::Error {
            alerts.push(Alert::new(
                API_ERROR,
                format!(
                    "API {} failed: {}",
                    record.endpoint,
                    record.error_message.as_deref().unwrap_or("unknown error")
                ),
                Severity::Error,
            ));
        }

        if record.response_code == 401 {
            alerts.push(Alert::new(
                UNAUTHORIZED_ACCESS,
                format!("Unauthorized access attempt from {}", record.source_ip),
                Severity::Critical,
            ));
        }

        alerts
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(5000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::builder::{CallContext, RecordBuilder};
    use crate::audit::redactor::Redactor;
    use crate::config::SecurityContextConfig;

    fn record(status: u16, elapsed_ms: f64, outcome: Outcome, error: Option<&str>) -> AuditRecord {
        let builder = RecordBuilder::new(
            Redactor::new(Vec::<String>::new()),
            SecurityContextConfig::default(),
        );
        let ctx = CallContext::new("/api/v1/auth/login").source_ip("10.0.0.7");
        builder.build(&ctx, status, elapsed_ms, outcome, error.map(String::from))
    }

    #[test]
    fn test_clean_record_raises_nothing() {
        let alerts = RuleEngine::default().evaluate(&record(200, 12.0, Outcome::Success, None));
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_slow_call_boundary() {
        let engine = RuleEngine::new(5000.0);

        let alerts = engine.evaluate(&record(200, 5001.0, Outcome::Success, None));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_name, SLOW_RESPONSE_TIME);
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(alerts[0].message, "API /api/v1/auth/login took 5001ms");

        assert!(engine
            .evaluate(&record(200, 4000.0, Outcome::Success, None))
            .is_empty());
        assert!(engine
            .evaluate(&record(200, 5000.0, Outcome::Success, None))
            .is_empty());
    }

    #[test]
    fn test_custom_threshold() {
        let engine = RuleEngine::new(100.0);
        assert!((engine.slow_call_threshold_ms() - 100.0).abs() < f64::EPSILON);
        assert_eq!(
            engine
                .evaluate(&record(200, 100.5, Outcome::Success, None))
                .len(),
            1
        );
    }

    #[test]
    fn test_error_alert_includes_message() {
        let alerts = RuleEngine::default().evaluate(&record(
            500,
            3.0,
            Outcome::Error,
            Some("Invalid credentials"),
        ));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_name, API_ERROR);
        assert_eq!(alerts[0].severity, Severity::Error);
        assert!(alerts[0].message.contains("Invalid credentials"));
    }

    #[test]
    fn test_unauthorized_regardless_of_outcome() {
        for outcome in [Outcome::Success, Outcome::Error] {
            let alerts = RuleEngine::default().evaluate(&record(401, 1.0, outcome, None));
            let unauthorized: Vec<_> = alerts
                .iter()
                .filter(|a| a.alert_name == UNAUTHORIZED_ACCESS)
                .collect();
            assert_eq!(unauthorized.len(), 1);
            assert_eq!(unauthorized[0].severity, Severity::Critical);
            assert!(unauthorized[0].message.contains("10.0.0.7"));
        }
    }

    #[test]
    fn test_all_rules_fire_in_order() {
        let alerts = RuleEngine::default().evaluate(&record(
            401,
            9000.0,
            Outcome::Error,
            Some("denied"),
        ));
        let names: Vec<_> = alerts.iter().map(|a| a.alert_name.as_str()).collect();
        assert_eq!(names, vec![SLOW_RESPONSE_TIME, API_ERROR, UNAUTHORIZED_ACCESS]);
    }
}
