//! Metrics for key caching, verification, and session lifecycle.
//!
//! Metrics are recorded through the `metrics` facade; nothing is exported
//! unless the application installs a recorder.
//!
//! # Metrics
//!
//! - `warden_key_cache_hits_total` - Signing key lookups served from cache
//! - `warden_key_cache_misses_total` - Lookups that had to wait for a fetch
//! - `warden_key_fetches_total` - Outbound key-distribution requests, by outcome
//! - `warden_verifications_total` - Token verifications, by outcome
//! - `warden_session_resets_total` - Local session resets, by reason

use metrics::counter;

/// Metric name for key cache hits.
pub const KEY_CACHE_HITS_TOTAL: &str = "warden_key_cache_hits_total";

/// Metric name for key cache misses.
pub const KEY_CACHE_MISSES_TOTAL: &str = "warden_key_cache_misses_total";

/// Metric name for outbound key fetches.
pub const KEY_FETCHES_TOTAL: &str = "warden_key_fetches_total";

/// Metric name for token verifications.
pub const VERIFICATIONS_TOTAL: &str = "warden_verifications_total";

/// Metric name for session resets.
pub const SESSION_RESETS_TOTAL: &str = "warden_session_resets_total";

/// Why a session was reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// Explicit reset call
    Requested,
    /// Reset before a login
    Login,
    Logout,
    /// Local token status was expired
    Expired,
    /// No identity could be resolved
    NoIdentity,
}

impl ResetReason {
    /// Get the reason as a string for metrics labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Expired => "expired",
            Self::NoIdentity => "no_identity",
        }
    }
}

pub(crate) fn record_key_cache_hit() {
    counter!(KEY_CACHE_HITS_TOTAL).increment(1);
}

pub(crate) fn record_key_cache_miss() {
    counter!(KEY_CACHE_MISSES_TOTAL).increment(1);
}

pub(crate) fn record_key_fetch(outcome: &'static str) {
    counter!(KEY_FETCHES_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_verification(outcome: &'static str) {
    counter!(VERIFICATIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_reset(reason: ResetReason) {
    counter!(SESSION_RESETS_TOTAL, "reason" => reason.as_str()).increment(1);
}

/// Describe all metrics for registration with a recorder.
///
/// ```ignore
/// warden_auth_core::metrics::describe_metrics();
/// ```
pub fn describe_metrics() {
    use metrics::{describe_counter, Unit};

    describe_counter!(
        KEY_CACHE_HITS_TOTAL,
        Unit::Count,
        "Signing key lookups answered from the cache"
    );
    describe_counter!(
        KEY_CACHE_MISSES_TOTAL,
        Unit::Count,
        "Signing key lookups that waited on a fetch"
    );
    describe_counter!(
        KEY_FETCHES_TOTAL,
        Unit::Count,
        "Requests made to the key-distribution endpoint"
    );
    describe_counter!(
        VERIFICATIONS_TOTAL,
        Unit::Count,
        "Token verifications by outcome"
    );
    describe_counter!(
        SESSION_RESETS_TOTAL,
        Unit::Count,
        "Local session resets by reason"
    );
}
