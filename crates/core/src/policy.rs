//! Expiration policy
//!
//! Pure functions deciding whether a cached expiration is expired or inside
//! the near-expiration window. `now` is always passed in.

use authsession_domain::constants::MINUTE_MS;
use authsession_domain::GuardConfig;

/// Convert fractional minutes to milliseconds. Non-finite input yields 0.
#[allow(clippy::cast_possible_truncation)]
pub fn minutes_to_ms(minutes: f64) -> i64 {
    if !minutes.is_finite() {
        return 0;
    }
    (minutes * MINUTE_MS as f64).round() as i64
}

/// True iff `now_ms >= expiration_ms - threshold_minutes`.
///
/// A missing expiration is never expired.
pub fn is_expired(expiration_ms: Option<i64>, threshold_minutes: f64, now_ms: i64) -> bool {
    expiration_ms.is_some_and(|expiration| {
        now_ms >= expiration.saturating_sub(minutes_to_ms(threshold_minutes))
    })
}

/// Near-expiration threshold when it forms a valid window.
///
/// The window exists only when `near_minutes` is finite and strictly
/// greater than `expired_minutes`.
pub fn near_window_minutes(expired_minutes: f64, near_minutes: Option<f64>) -> Option<f64> {
    near_minutes.filter(|near| near.is_finite() && *near > expired_minutes)
}

/// True iff `now_ms` lies in `[exp - near, exp - expired)`.
pub fn is_near_expiration(
    expiration_ms: Option<i64>,
    expired_minutes: f64,
    near_minutes: Option<f64>,
    now_ms: i64,
) -> bool {
    let (Some(expiration), Some(near)) =
        (expiration_ms, near_window_minutes(expired_minutes, near_minutes))
    else {
        return false;
    };

    let window_start = expiration.saturating_sub(minutes_to_ms(near));
    let expired_at = expiration.saturating_sub(minutes_to_ms(expired_minutes));
    now_ms >= window_start && now_ms < expired_at
}

/// Result of evaluating one expiration against a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationStatus {
    /// No expiration is cached.
    Unknown,
    /// Outside the near-expiration window.
    Valid,
    /// Inside the window that ends at the expired threshold.
    NearExpiration,
    /// At or past the expired threshold.
    Expired,
}

/// Pair of thresholds used by the expiration guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpirationPolicy {
    expired_minutes: f64,
    near_minutes: Option<f64>,
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self { expired_minutes: 0.0, near_minutes: None }
    }
}

impl ExpirationPolicy {
    /// Policy with explicit thresholds; without `near_minutes` there is no near-expiration window.
    pub const fn new(expired_minutes: f64, near_minutes: Option<f64>) -> Self {
        Self { expired_minutes, near_minutes }
    }

    /// Policy from the configured guard thresholds
    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(
            config.minutes_to_consider_token_as_expired,
            config.minutes_to_consider_token_as_near_expiration,
        )
    }

    /// Minutes before raw expiration at which a token counts as expired
    pub const fn expired_minutes(&self) -> f64 {
        self.expired_minutes
    }

    /// Near threshold, only when it forms a valid window.
    pub fn near_minutes(&self) -> Option<f64> {
        near_window_minutes(self.expired_minutes, self.near_minutes)
    }

    /// Classify `expiration_ms` at `now_ms`. Expired wins over near.
    pub fn evaluate(&self, expiration_ms: Option<i64>, now_ms: i64) -> ExpirationStatus {
        if expiration_ms.is_none() {
            return ExpirationStatus::Unknown;
        }
        if is_expired(expiration_ms, self.expired_minutes, now_ms) {
            return ExpirationStatus::Expired;
        }
        if is_near_expiration(expiration_ms, self.expired_minutes, self.near_minutes, now_ms) {
            return ExpirationStatus::NearExpiration;
        }
        ExpirationStatus::Valid
    }
}
