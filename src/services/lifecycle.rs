use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    NotStarted,
    Ongoing,
    WinnerSelection,
    Completed,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::Ongoing => "Ongoing",
            Status::WinnerSelection => "Winner Selection",
            Status::Completed => "Completed",
        }
    }

    /// Accent colour used for the status badge and join button.
    pub fn accent_rgb(self) -> [u8; 3] {
        match self {
            Status::NotStarted => [31, 41, 55],
            Status::Ongoing => [88, 28, 135],
            Status::WinnerSelection => [147, 51, 234],
            Status::Completed => [162, 28, 175],
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies `now` against the three contest boundaries.
///
/// Rules are checked in order and the first match wins, so the function is total
/// even when the boundaries are out of order:
/// - `now < start` is `NotStarted` until `start`
/// - `now < end` is `Ongoing` until `end`
/// - `now < voting_end` is `WinnerSelection` until `voting_end`
/// - otherwise `Completed` with no deadline
pub fn classify(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    voting_end: DateTime<Utc>,
) -> (Status, Option<DateTime<Utc>>) {
    if now < start {
        (Status::NotStarted, Some(start))
    } else if now < end {
        (Status::Ongoing, Some(end))
    } else if now < voting_end {
        (Status::WinnerSelection, Some(voting_end))
    } else {
        (Status::Completed, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn bounds() -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
        let start = t0();
        (
            start,
            start + Duration::milliseconds(86_400_000),
            start + Duration::milliseconds(172_800_000),
        )
    }

    #[test]
    fn ongoing_one_second_after_start() {
        let (start, end, voting_end) = bounds();
        let now = start + Duration::milliseconds(1000);
        assert_eq!(
            classify(now, start, end, voting_end),
            (Status::Ongoing, Some(start + Duration::milliseconds(86_400_000)))
        );
    }

    #[test]
    fn boundaries_belong_to_the_later_phase() {
        let (start, end, voting_end) = bounds();
        assert_eq!(classify(start, start, end, voting_end).0, Status::Ongoing);
        assert_eq!(
            classify(end, start, end, voting_end).0,
            Status::WinnerSelection
        );
        assert_eq!(
            classify(voting_end, start, end, voting_end),
            (Status::Completed, None)
        );
    }

    #[test]
    fn deadline_is_upper_bound_of_phase() {
        let (start, end, voting_end) = bounds();
        let step = Duration::hours(6);
        let mut now = start - Duration::days(1);
        while now < voting_end + Duration::days(1) {
            let (status, deadline) = classify(now, start, end, voting_end);
            let expected = match status {
                Status::NotStarted => Some(start),
                Status::Ongoing => Some(end),
                Status::WinnerSelection => Some(voting_end),
                Status::Completed => None,
            };
            assert_eq!(deadline, expected, "at {now}");
            if let Some(deadline) = deadline {
                assert!(now < deadline);
            }
            now += step;
        }
    }

    #[test]
    fn degenerate_ordering_follows_the_same_rules() {
        let (start, end, _) = bounds();
        // voting ends before the contest does
        let now = end + Duration::hours(1);
        assert_eq!(classify(now, start, end, start), (Status::Completed, None));
        // end before start: inside [end, start) is still "not started"
        let now = end - Duration::hours(1);
        assert_eq!(
            classify(now, end, start, end).0,
            Status::NotStarted
        );
    }

    #[test]
    fn labels() {
        assert_eq!(Status::WinnerSelection.to_string(), "Winner Selection");
        assert_eq!(Status::NotStarted.label(), "Not Started");
    }
}
