use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{self, Deserialize, Deserializer, Serialize};

use crate::error::FetchError;
use crate::services::lifecycle::Status;
use crate::services::photo::PhotoHandle;

/// Opaque caller identity. Used as a lookup key only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(text: impl Into<String>) -> Self {
        Principal(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contest id as taken from the route. A non-numeric segment is carried through
/// untouched; the stores answer it with an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContestKey {
    Id(u64),
    Malformed(String),
}

impl ContestKey {
    pub fn from_route_segment(segment: &str) -> Self {
        let trimmed = segment.trim().trim_matches('/');
        match trimmed.parse::<u64>() {
            Ok(id) => ContestKey::Id(id),
            Err(_) => ContestKey::Malformed(trimmed.to_string()),
        }
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            ContestKey::Id(id) => Some(*id),
            ContestKey::Malformed(_) => None,
        }
    }
}

impl fmt::Display for ContestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContestKey::Id(id) => write!(f, "{id}"),
            ContestKey::Malformed(raw) => write!(f, "{raw:?} (not a number)"),
        }
    }
}

/// Unit of the integer instants on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
    #[default]
    Nanoseconds,
    Milliseconds,
    Seconds,
}

impl TimestampUnit {
    /// Out-of-range values saturate to the representable bounds.
    pub fn to_datetime(self, raw: i64) -> DateTime<Utc> {
        let converted = match self {
            TimestampUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
            TimestampUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
            TimestampUnit::Seconds => DateTime::from_timestamp(raw, 0),
        };
        converted.unwrap_or(if raw < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContestRecord {
    #[serde(deserialize_with = "from_wire_nat")]
    pub competition_id: u64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Decimal digits exactly as sent; may exceed any native integer.
    #[serde(deserialize_with = "from_wire_digits")]
    pub reward: String,
    #[serde(rename = "startDate", deserialize_with = "from_wire_int")]
    pub start_date: i64,
    #[serde(rename = "endDate", deserialize_with = "from_wire_int")]
    pub end_date: i64,
    #[serde(rename = "votingEndDate", deserialize_with = "from_wire_int")]
    pub voting_end_date: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContestantRecord {
    #[serde(deserialize_with = "from_wire_nat")]
    pub contestant_id: u64,
    pub principal: Principal,
    #[serde(deserialize_with = "from_wire_nat")]
    pub competition_id: u64,
    #[serde(default)]
    pub photo: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub principal: Principal,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Contest record plus the lifecycle classification at one sampled instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ContestView {
    pub competition_id: u64,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub reward: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub voting_end_date: DateTime<Utc>,
    pub status: Status,
    /// Next boundary for `status`; `None` once completed.
    pub deadline: Option<DateTime<Utc>>,
}

impl ContestView {
    pub fn description_or_default(&self) -> &str {
        match self.description.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => "No description available.",
        }
    }
}

/// Display-ready contestant. Owns its photo handle; dropping the view releases it.
#[derive(Debug)]
pub struct ContestantView {
    pub contestant_id: u64,
    pub principal: Principal,
    pub display_name: String,
    pub photo: Option<PhotoHandle>,
}

/// Strict wire parse of one store row.
pub fn parse_row<T>(kind: &str, row: serde_json::Value) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(row.clone()).map_err(|err| {
        FetchError::Malformed(format!("failed to parse {kind}: {err} | data: {row}"))
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireInt {
    Nat(u64),
    Int(i64),
    Text(String),
}

fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn from_wire_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match WireInt::deserialize(deserializer)? {
        WireInt::Nat(n) => i64::try_from(n).map_err(serde::de::Error::custom),
        WireInt::Int(n) => Ok(n),
        WireInt::Text(s) => {
            if !is_decimal(&s) {
                return Err(serde::de::Error::custom(format!(
                    "expected an integer, got {s:?}"
                )));
            }
            s.parse::<i64>().map_err(serde::de::Error::custom)
        }
    }
}

fn from_wire_nat<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = from_wire_int(deserializer)?;
    u64::try_from(value).map_err(|_| {
        serde::de::Error::custom(format!("expected a natural number, got {value}"))
    })
}

fn from_wire_digits<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match WireInt::deserialize(deserializer)? {
        WireInt::Nat(n) => Ok(n.to_string()),
        WireInt::Int(n) => Err(serde::de::Error::custom(format!(
            "expected a natural number, got {n}"
        ))),
        WireInt::Text(s) => {
            if s.starts_with('-') || !is_decimal(&s) {
                return Err(serde::de::Error::custom(format!(
                    "expected a natural number, got {s:?}"
                )));
            }
            Ok(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contest_json() -> serde_json::Value {
        json!({
            "competition_id": 7,
            "name": "Golden Hour",
            "category": "Landscape",
            "description": null,
            "reward": "340282366920938463463374607431768211455",
            "startDate": "1700000000000000000",
            "endDate": 1700086400000000000u64,
            "votingEndDate": 1700172800000000000u64
        })
    }

    #[test]
    fn parses_contest_with_mixed_integer_encodings() {
        let record: ContestRecord = parse_row("contest", contest_json()).unwrap();
        assert_eq!(record.competition_id, 7);
        assert_eq!(record.start_date, 1_700_000_000_000_000_000);
        assert_eq!(record.end_date, 1_700_086_400_000_000_000);
        assert_eq!(record.reward, "340282366920938463463374607431768211455");
        assert_eq!(record.description, None);
    }

    #[test]
    fn rejects_float_instant() {
        let mut row = contest_json();
        row["endDate"] = json!(1.5);
        let err = parse_row::<ContestRecord>("contest", row).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn rejects_non_numeric_reward() {
        let mut row = contest_json();
        row["reward"] = json!("lots");
        assert!(parse_row::<ContestRecord>("contest", row).is_err());
    }

    #[test]
    fn contestant_photo_is_optional() {
        let with_photo: ContestantRecord = parse_row(
            "contestant",
            json!({"contestant_id": "3", "principal": "aaaa-bbbb", "competition_id": 7, "photo": [137, 80, 78, 71]}),
        )
        .unwrap();
        assert_eq!(with_photo.photo.as_deref(), Some(&[137u8, 80, 78, 71][..]));

        let without: ContestantRecord = parse_row(
            "contestant",
            json!({"contestant_id": 4, "principal": "cccc", "competition_id": 7}),
        )
        .unwrap();
        assert_eq!(without.photo, None);
    }

    #[test]
    fn contestant_photo_bytes_must_be_bytes() {
        let result = parse_row::<ContestantRecord>(
            "contestant",
            json!({"contestant_id": 4, "principal": "cccc", "competition_id": 7, "photo": [300]}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn route_segment_parsing() {
        assert_eq!(ContestKey::from_route_segment("42"), ContestKey::Id(42));
        assert_eq!(ContestKey::from_route_segment(" /42/ "), ContestKey::Id(42));
        assert_eq!(
            ContestKey::from_route_segment("abc"),
            ContestKey::Malformed("abc".to_string())
        );
        assert_eq!(ContestKey::from_route_segment("-1").id(), None);
    }

    #[test]
    fn timestamp_units() {
        let expected = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            TimestampUnit::Nanoseconds.to_datetime(1_700_000_000_000_000_000),
            expected
        );
        assert_eq!(
            TimestampUnit::Milliseconds.to_datetime(1_700_000_000_000),
            expected
        );
        assert_eq!(TimestampUnit::Seconds.to_datetime(1_700_000_000), expected);
        assert_eq!(
            TimestampUnit::Seconds.to_datetime(i64::MAX),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
