use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Time source shared by the progress store, the log cache and sessions.
///
/// `Manual` holds its instant behind an `Arc`, so every clone observes
/// `advance` calls made through any other clone. Tests use it to step a
/// cache past its validity window without sleeping.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
    Manual(Arc<AtomicI64>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns a shared clock starting at `at` that only moves via `advance`.
    #[must_use]
    pub fn manual(at: DateTime<Utc>) -> Self {
        Self::Manual(Arc::new(AtomicI64::new(at.timestamp_millis())))
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
            Clock::Manual(millis) => {
                DateTime::from_timestamp_millis(millis.load(Ordering::SeqCst))
                    .unwrap_or_else(Utc::now)
            }
        }
    }

    /// Moves a fixed or manual clock forward. No effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        match self {
            Clock::Default => {}
            Clock::Fixed(t) => *t += delta,
            Clock::Manual(millis) => {
                millis.fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
            }
        }
    }
}

/// Formats a timestamp the way the stores persist it: RFC 3339, millisecond
/// precision, `Z` suffix (`2023-11-14T22:13:20.000Z`).
#[must_use]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp into UTC.
#[must_use]
pub fn parse_iso_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let mut clock = Clock::manual(fixed_now());
        let observer = clock.clone();

        clock.advance(Duration::seconds(61));

        assert_eq!(observer.now(), fixed_now() + Duration::seconds(61));
    }

    #[test]
    fn fixed_clock_advances_only_its_own_copy() {
        let mut clock = fixed_clock();
        let copy = clock.clone();
        clock.advance(Duration::minutes(5));

        assert_eq!(clock.now(), fixed_now() + Duration::minutes(5));
        assert_eq!(copy.now(), fixed_now());
    }

    #[test]
    fn iso_timestamp_matches_browser_format() {
        assert_eq!(iso_timestamp(fixed_now()), "2023-11-14T22:13:20.000Z");
        assert_eq!(
            parse_iso_timestamp("2023-11-14T22:13:20.000Z"),
            Some(fixed_now())
        );
        assert_eq!(parse_iso_timestamp("yesterday"), None);
    }
}
