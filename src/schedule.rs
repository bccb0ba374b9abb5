//! Past/upcoming classification of shows.
//!
//! Classification is never stored. Callers take one reading from a [`Clock`]
//! per page or query and pass that same `now` to every show they classify.

use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timing {
    Past,
    Upcoming,
}

/// Upcoming only when the show starts strictly after `now`.
pub fn classify(start_time: DateTime<Utc>, now: DateTime<Utc>) -> Timing {
    if start_time > now {
        Timing::Upcoming
    } else {
        Timing::Past
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap()
    }

    #[test]
    fn start_equal_to_now_is_past() {
        assert_eq!(classify(anchor(), anchor()), Timing::Past);
    }

    #[test]
    fn one_second_later_is_upcoming() {
        assert_eq!(
            classify(anchor() + Duration::seconds(1), anchor()),
            Timing::Upcoming
        );
        assert_eq!(classify(anchor() - Duration::seconds(1), anchor()), Timing::Past);
    }

    #[test]
    fn fixed_clock_does_not_advance() {
        let clock = FixedClock::new(anchor());
        assert_eq!(clock.now(), clock.now());
    }

    proptest! {
        #[test]
        fn upcoming_iff_strictly_after_now(offset in -1_000_000i64..1_000_000i64) {
            let now = anchor();
            let start = now + Duration::seconds(offset);
            let expected = if offset > 0 { Timing::Upcoming } else { Timing::Past };
            prop_assert_eq!(classify(start, now), expected);
        }
    }
}
