//! Timestamp freshness validation.
//!
//! A pure window check over the claimed send time: too old is `Expired`,
//! too far in the future is `FromFuture`. No shared state, always safe to
//! retry with a fresh `now`.

use crate::error::ProtocolError;

/// Default maximum message age: 5 minutes
pub const DEFAULT_MAX_AGE_MS: i64 = 5 * 60 * 1000;

/// Default maximum tolerated clock skew into the future: 2 minutes
pub const DEFAULT_MAX_SKEW_MS: i64 = 2 * 60 * 1000;

/// Freshness window configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Maximum accepted age in milliseconds
    pub max_age_ms: i64,
    /// Maximum accepted future skew in milliseconds
    pub max_skew_ms: i64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self { max_age_ms: DEFAULT_MAX_AGE_MS, max_skew_ms: DEFAULT_MAX_SKEW_MS }
    }
}

impl FreshnessPolicy {
    /// Check a message timestamp against this window
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Expired` if `now - timestamp > max_age`, or
    /// `ProtocolError::FromFuture` if `timestamp - now > max_skew`.
    pub fn check(&self, timestamp_ms: i64, now_ms: i64) -> Result<(), ProtocolError> {
        let age_ms = now_ms.saturating_sub(timestamp_ms);

        if age_ms > self.max_age_ms {
            return Err(ProtocolError::Expired { age_ms, max_age_ms: self.max_age_ms });
        }

        let skew_ms = timestamp_ms.saturating_sub(now_ms);
        if skew_ms > self.max_skew_ms {
            return Err(ProtocolError::FromFuture { skew_ms, max_skew_ms: self.max_skew_ms });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 10_000_000;

    #[test]
    fn current_timestamp_accepted() {
        assert_eq!(FreshnessPolicy::default().check(NOW, NOW), Ok(()));
    }

    #[test]
    fn timestamp_at_max_age_accepted() {
        let policy = FreshnessPolicy::default();
        assert_eq!(policy.check(NOW - policy.max_age_ms, NOW), Ok(()));
    }

    #[test]
    fn six_minutes_old_is_expired() {
        let result = FreshnessPolicy::default().check(NOW - 6 * 60 * 1000, NOW);

        assert!(matches!(result, Err(ProtocolError::Expired { .. })));
    }

    #[test]
    fn three_minutes_in_future_is_rejected() {
        let result = FreshnessPolicy::default().check(NOW + 3 * 60 * 1000, NOW);

        assert!(matches!(result, Err(ProtocolError::FromFuture { .. })));
    }

    #[test]
    fn timestamp_at_max_skew_accepted() {
        let policy = FreshnessPolicy::default();
        assert_eq!(policy.check(NOW + policy.max_skew_ms, NOW), Ok(()));
    }

    #[test]
    fn error_carries_measured_age() {
        let result = FreshnessPolicy::default().check(NOW - 6 * 60 * 1000, NOW);

        assert_eq!(
            result,
            Err(ProtocolError::Expired { age_ms: 6 * 60 * 1000, max_age_ms: DEFAULT_MAX_AGE_MS })
        );
    }
}
