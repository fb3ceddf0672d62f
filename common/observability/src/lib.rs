use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub const OUTCOME_ALLOWED: &str = "allowed";
pub const OUTCOME_DENIED: &str = "denied";

#[derive(Clone)]
pub struct AccessMetrics {
    pub registry: Registry,
    /// Guard evaluations, labelled by guard kind (permission, province, branch, grant) and outcome.
    pub guard_checks_total: IntCounterVec,
    /// Successful profile mutations, labelled by audit action.
    pub profile_mutations_total: IntCounterVec,
    /// Stored records refused at the boundary.
    pub profile_rejections_total: IntCounter,
    pub audit_emit_failures: IntCounter,
}

impl AccessMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let guard_checks_total = IntCounterVec::new(
            Opts::new("access_guard_checks_total", "Access guard evaluations"),
            &["kind", "outcome"],
        ).unwrap();
        let profile_mutations_total = IntCounterVec::new(
            Opts::new("access_profile_mutations_total", "Access profile mutations applied"),
            &["action"],
        ).unwrap();
        let profile_rejections_total = IntCounter::new(
            "access_profile_rejections_total",
            "Stored access profiles rejected as invalid",
        ).unwrap();
        let audit_emit_failures = IntCounter::new(
            "audit_event_emit_failures_total",
            "Audit event emission failures",
        ).unwrap();
        let _ = registry.register(Box::new(guard_checks_total.clone()));
        let _ = registry.register(Box::new(profile_mutations_total.clone()));
        let _ = registry.register(Box::new(profile_rejections_total.clone()));
        let _ = registry.register(Box::new(audit_emit_failures.clone()));
        AccessMetrics { registry, guard_checks_total, profile_mutations_total, profile_rejections_total, audit_emit_failures }
    }

    pub fn record_guard(&self, kind: &str, allowed: bool) {
        let outcome = if allowed { OUTCOME_ALLOWED } else { OUTCOME_DENIED };
        self.guard_checks_total.with_label_values(&[kind, outcome]).inc();
    }

    pub fn record_mutation(&self, action: &str, audited: bool) {
        self.profile_mutations_total.with_label_values(&[action]).inc();
        if !audited {
            self.audit_emit_failures.inc();
        }
    }

    /// Text exposition of this registry followed by the process-wide default registry.
    pub fn render(&self) -> String {
        let mut families = self.registry.gather();
        families.extend(prometheus::gather());
        let mut buf = Vec::new();
        if TextEncoder::new().encode(&families, &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for AccessMetrics {
    fn default() -> Self { Self::new() }
}
