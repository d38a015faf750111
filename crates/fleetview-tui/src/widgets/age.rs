//! Compact "how long ago" strings for the status bar.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Age of `then` at `now`, coarsened so the status bar does not tick
/// every second once data is older than a minute: `42s`, `5m`, `2h 3m`.
pub fn fmt_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = u64::try_from(now.signed_duration_since(then).num_seconds()).unwrap_or(0);
    let coarse = if secs < 60 { secs } else { secs - secs % 60 };
    humantime::format_duration(Duration::from_secs(coarse)).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn ages_are_coarsened() {
        let now = Utc::now();
        assert_eq!(fmt_age(now - TimeDelta::seconds(42), now), "42s");
        assert_eq!(fmt_age(now - TimeDelta::seconds(5 * 60 + 17), now), "5m");
        assert_eq!(fmt_age(now - TimeDelta::seconds(2 * 3_600 + 3 * 60 + 9), now), "2h 3m");
    }

    #[test]
    fn future_timestamps_read_as_now() {
        let now = Utc::now();
        assert_eq!(fmt_age(now + TimeDelta::seconds(30), now), "0s");
    }
}
