use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::{ContestRecord, ContestView, TimestampUnit};
use crate::services::lifecycle;

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

/// Turns raw contest rows into classified views.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    pub unit: TimestampUnit,
}

impl Normalizer {
    pub fn new(unit: TimestampUnit) -> Self {
        Self { unit }
    }

    /// Samples the clock once and classifies against that instant.
    pub fn normalize(&self, raw: &ContestRecord, clock: &dyn Clock) -> ContestView {
        self.normalize_at(raw, clock.now())
    }

    pub fn normalize_at(&self, raw: &ContestRecord, now: DateTime<Utc>) -> ContestView {
        let start_date = self.unit.to_datetime(raw.start_date);
        let end_date = self.unit.to_datetime(raw.end_date);
        let voting_end_date = self.unit.to_datetime(raw.voting_end_date);
        let (status, deadline) = lifecycle::classify(now, start_date, end_date, voting_end_date);

        ContestView {
            competition_id: raw.competition_id,
            name: raw.name.clone(),
            category: raw.category.clone(),
            description: raw.description.clone(),
            reward: reward_value(&raw.reward),
            start_date,
            end_date,
            voting_end_date,
            status,
            deadline,
        }
    }
}

/// Very large rewards lose precision.
fn reward_value(digits: &str) -> f64 {
    digits.parse::<f64>().unwrap_or_else(|err| {
        warn!("Unparseable reward {digits:?}: {err}");
        0.0
    })
}
