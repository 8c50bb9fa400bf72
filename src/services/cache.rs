use chrono::{DateTime, Duration, Utc};

/// A fetched value together with when it was fetched and how long it stays valid.
///
/// Freshness is always evaluated against a caller-supplied `now`.
#[derive(Debug, Clone, PartialEq)]
pub struct TtlCache<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<T> TtlCache<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self { value, fetched_at, ttl }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.fetched_at + self.ttl
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fresh_until_ttl_elapses() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let c = TtlCache::new(vec![1, 2, 3], t0, Duration::hours(2));
        assert!(c.is_fresh(t0));
        assert!(c.is_fresh(t0 + Duration::minutes(119)));
        assert!(!c.is_fresh(t0 + Duration::hours(2)));
        assert_eq!(c.expires_at(), t0 + Duration::hours(2));
    }
}
