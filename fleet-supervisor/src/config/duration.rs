//! Timeouts as written in `supervisor.yaml` and on the command line: a
//! whole number followed by `ms`, `s` or `m`. A bare number is seconds.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

use crate::errors::DurationError;

/// Milliseconds per unit, smallest first.
const UNITS: [(&str, u64); 3] = [("ms", 1), ("s", 1_000), ("m", 60_000)];

pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let trimmed = input.trim();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (value, unit) = trimmed.split_at(digits);
    if value.is_empty() {
        return Err(DurationError::MissingValue(input.to_string()));
    }

    let unit = if unit.is_empty() { "s" } else { unit };
    let Some(&(_, per_unit)) = UNITS.iter().find(|(name, _)| *name == unit) else {
        return Err(DurationError::UnknownUnit {
            input: input.to_string(),
            unit: unit.to_string(),
        });
    };

    value
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(per_unit))
        .map(Duration::from_millis)
        .ok_or_else(|| DurationError::TooLarge(input.to_string()))
}

/// Largest unit that represents `duration` exactly.
pub fn format_duration(duration: &Duration) -> String {
    let millis = duration.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }
    let (unit, per_unit) = UNITS
        .iter()
        .rev()
        .copied()
        .find(|(_, per_unit)| millis % u128::from(*per_unit) == 0)
        .unwrap_or(UNITS[0]);
    format!("{}{}", millis / u128::from(per_unit), unit)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(duration))
}
