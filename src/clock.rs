//! Injected time source and human-relative time strings.

use chrono::{DateTime, Datelike, Duration, Utc};

/// Source of "now" for relative timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant. Used to make renders reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Describe `then` relative to `now` at minute resolution.
///
/// - under an hour: "5 minutes ago" / "In 5 minutes"
/// - under a day: "3 hours ago" / "In 3 hours"
/// - under a week: "Yesterday", "Tomorrow", "4 days ago", "In 4 days"
/// - otherwise the date: "Mar 3" in the current year, "Mar 3, 2024" before.
pub fn relative_time_span(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let past = then <= now;
    let delta = if past { now - then } else { then - now };

    if delta < Duration::hours(1) {
        let minutes = delta.num_minutes();
        return phrase(minutes, "minute", past);
    }

    if delta < Duration::days(1) {
        let hours = delta.num_hours();
        return phrase(hours, "hour", past);
    }

    if delta < Duration::weeks(1) {
        // Calendar days, not 24h blocks: 23:00 yesterday is still "Yesterday".
        let days = (now.date_naive() - then.date_naive()).num_days().abs();
        return match (days, past) {
            (1, true) => "Yesterday".to_string(),
            (1, false) => "Tomorrow".to_string(),
            (n, past) => phrase(n, "day", past),
        };
    }

    if then.year() == now.year() {
        then.format("%b %-d").to_string()
    } else {
        then.format("%b %-d, %Y").to_string()
    }
}

fn phrase(count: i64, unit: &str, past: bool) -> String {
    let plural = if count == 1 { "" } else { "s" };
    if past {
        format!("{count} {unit}{plural} ago")
    } else {
        format!("In {count} {unit}{plural}")
    }
}
