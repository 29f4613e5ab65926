//! Status codes reported on the wire.
//!
//! The numeric values are part of the wire contract and must never be
//! renumbered:
//!
//! | Status        | Value |
//! |---------------|-------|
//! | `UP`          | 100   |
//! | `MAINTENANCE` | 15    |
//! | `DEGRADATION` | 25    |
//! | `JEOPARDY`    | 75    |
//! | `DOWN`        | 0     |

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Health state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    /// Nominal.
    Up = 100,
    /// Planned outage.
    Maintenance = 15,
    /// Partial failure.
    Degradation = 25,
    /// Severe or critical.
    Jeopardy = 75,
    /// Unavailable.
    Down = 0,
}

impl StatusCode {
    pub const ALL: [StatusCode; 5] = [
        StatusCode::Up,
        StatusCode::Maintenance,
        StatusCode::Degradation,
        StatusCode::Jeopardy,
        StatusCode::Down,
    ];

    /// Wire value of this status.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Map a wire value back to a status. Anything outside the five
    /// defined values is rejected.
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.value() == value)
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Up => "UP",
            StatusCode::Maintenance => "MAINTENANCE",
            StatusCode::Degradation => "DEGRADATION",
            StatusCode::Jeopardy => "JEOPARDY",
            StatusCode::Down => "DOWN",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for StatusCode {
    type Err = UnknownStatus;

    /// Accepts either a symbolic name (case-insensitive) or a wire value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<u8>() {
            return Self::from_value(value).ok_or_else(|| UnknownStatus(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|status| status.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatusVisitor;

        impl Visitor<'_> for StatusVisitor {
            type Value = StatusCode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a status name or one of the values 0, 15, 25, 75, 100")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<StatusCode, E> {
                u8::try_from(v)
                    .ok()
                    .and_then(StatusCode::from_value)
                    .ok_or_else(|| E::custom(format!("invalid status value {v}")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<StatusCode, E> {
                u8::try_from(v)
                    .ok()
                    .and_then(StatusCode::from_value)
                    .ok_or_else(|| E::custom(format!("invalid status value {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<StatusCode, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}
