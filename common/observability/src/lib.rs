use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for the session lifecycle of one running client.
#[derive(Clone)]
pub struct SessionMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    identity_checks: IntCounterVec,
    guard_decisions: IntCounterVec,
    session_clears: IntCounterVec,
    backend_request_seconds: HistogramVec,
}

impl SessionMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new("gym_login_attempts_total", "Sign-in attempts grouped by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let identity_checks = IntCounterVec::new(
            Opts::new(
                "gym_identity_checks_total",
                "Who-am-I verifications grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(identity_checks.clone()))?;

        let guard_decisions = IntCounterVec::new(
            Opts::new("gym_guard_decisions_total", "Route guard decisions"),
            &["decision"],
        )?;
        registry.register(Box::new(guard_decisions.clone()))?;

        let session_clears = IntCounterVec::new(
            Opts::new("gym_session_clears_total", "Session clears grouped by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(session_clears.clone()))?;

        let backend_request_seconds = HistogramVec::new(
            HistogramOpts::new(
                "gym_backend_request_seconds",
                "Latency of backend calls issued by the client",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["endpoint"],
        )?;
        registry.register(Box::new(backend_request_seconds.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            identity_checks,
            guard_decisions,
            session_clears,
            backend_request_seconds,
        })
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn identity_check(&self, outcome: &str) {
        self.identity_checks.with_label_values(&[outcome]).inc();
    }

    pub fn guard_decision(&self, decision: &str) {
        self.guard_decisions.with_label_values(&[decision]).inc();
    }

    pub fn session_cleared(&self, reason: &str) {
        self.session_clears.with_label_values(&[reason]).inc();
    }

    pub fn observe_backend(&self, endpoint: &str, seconds: f64) {
        self.backend_request_seconds
            .with_label_values(&[endpoint])
            .observe(seconds);
    }

    pub fn login_attempts(&self, outcome: &str) -> u64 {
        self.login_attempts.with_label_values(&[outcome]).get()
    }

    pub fn identity_checks(&self, outcome: &str) -> u64 {
        self.identity_checks.with_label_values(&[outcome]).get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_rendered_output() {
        let metrics = SessionMetrics::new().expect("metrics");
        metrics.login_attempt("success");
        metrics.login_attempt("success");
        metrics.session_cleared("sign_out");
        metrics.observe_backend("auth_me", 0.02);

        assert_eq!(metrics.login_attempts("success"), 2);
        let text = metrics.render().expect("render");
        assert!(text.contains("gym_login_attempts_total{outcome=\"success\"} 2"));
        assert!(text.contains("gym_session_clears_total{reason=\"sign_out\"} 1"));
        assert!(text.contains("gym_backend_request_seconds_count{endpoint=\"auth_me\"} 1"));
    }

    #[test]
    fn separate_instances_do_not_share_state() {
        let first = SessionMetrics::new().expect("metrics");
        let second = SessionMetrics::new().expect("metrics");
        first.identity_check("invalid");
        assert_eq!(first.identity_checks("invalid"), 1);
        assert_eq!(second.identity_checks("invalid"), 0);
    }
}
