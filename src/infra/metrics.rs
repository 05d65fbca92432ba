//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//!
//! NOTE: All atomics use Relaxed ordering intentionally, these are
//! statistical counters only. Do NOT use them for coordination or logic
//! decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Lock-free metrics collector for the registration lifecycle.
pub struct Metrics {
    /// Sessions created by the kiosk (monotonic)
    sessions_created: AtomicU64,
    /// Session cycles that failed during create/QR generation (monotonic)
    cycle_failures: AtomicU64,
    /// Status polls issued while a QR was on screen (monotonic)
    polls_total: AtomicU64,
    /// Polls that failed and were swallowed as transient (monotonic)
    poll_errors: AtomicU64,
    /// Sessions observed completed by the kiosk (monotonic)
    sessions_completed: AtomicU64,
    /// Sessions abandoned unclaimed past their expiry grace (monotonic)
    sessions_expired: AtomicU64,
    /// Registrations accepted by the backend (monotonic)
    registrations_submitted: AtomicU64,
    /// Registrations rejected by local validation (monotonic)
    registrations_rejected: AtomicU64,
    /// Start time for uptime reporting
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_created: AtomicU64::new(0),
            cycle_failures: AtomicU64::new(0),
            polls_total: AtomicU64::new(0),
            poll_errors: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            sessions_expired: AtomicU64::new(0),
            registrations_submitted: AtomicU64::new(0),
            registrations_rejected: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cycle_failure(&self) {
        self.cycle_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_poll(&self) {
        self.polls_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_poll_error(&self) {
        self.poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_session_expired(&self) {
        self.sessions_expired.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_registration_submitted(&self) {
        self.registrations_submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_registration_rejected(&self) {
        self.registrations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for reporting.
    pub fn report(&self) -> MetricsSummary {
        MetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs(),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            cycle_failures: self.cycle_failures.load(Ordering::Relaxed),
            polls_total: self.polls_total.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
            registrations_submitted: self.registrations_submitted.load(Ordering::Relaxed),
            registrations_rejected: self.registrations_rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Consistent snapshot of all counters.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub sessions_created: u64,
    pub cycle_failures: u64,
    pub polls_total: u64,
    pub poll_errors: u64,
    pub sessions_completed: u64,
    pub sessions_expired: u64,
    pub registrations_submitted: u64,
    pub registrations_rejected: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = self.uptime_secs,
            sessions_created = self.sessions_created,
            cycle_failures = self.cycle_failures,
            polls_total = self.polls_total,
            poll_errors = self.poll_errors,
            sessions_completed = self.sessions_completed,
            sessions_expired = self.sessions_expired,
            registrations_submitted = self.registrations_submitted,
            registrations_rejected = self.registrations_rejected,
            "metrics_report"
        );
    }
}
