use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Table cell format: date and time to microsecond resolution.
const TABLE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day], [hour]:[minute]:[second].[subsecond digits:6]"
);

/// UTC timestamp of a price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::InvalidTimestamp {
                value: input.to_owned(),
            }
        })?;

        Ok(Self(parsed.to_offset(UtcOffset::UTC)))
    }

    /// Build from microseconds since the Unix epoch.
    pub fn from_unix_micros(micros: i64) -> Result<Self, ValidationError> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
            .map(Self)
            .map_err(|_| ValidationError::InvalidTimestamp {
                value: format!("{micros}us"),
            })
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// RFC3339 rendering, e.g. `2024-01-02T09:30:00Z`.
    pub fn format_rfc3339(self) -> String {
        // Every UTC OffsetDateTime within the i64 microsecond range is RFC3339 formattable.
        self.0.format(&Rfc3339).unwrap_or_default()
    }

    /// Table rendering, e.g. `2024-01-02, 09:30:00.000000`.
    pub fn format_table(self) -> String {
        self.0.format(TABLE_FORMAT).unwrap_or_default()
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
