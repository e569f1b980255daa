use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Symbol, UtcDateTime};
use crate::ValidationError;

/// Identifier of a row in `markets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub i64);

impl Display for MarketId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a row in `companies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub i64);

/// A named exchange grouping companies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub name: String,
    pub alias: Option<String>,
}

impl Market {
    /// Selector label, `"{name} - {alias}"`, or just the name without an alias.
    pub fn label(&self) -> String {
        match self.alias.as_deref().map(str::trim) {
            Some(alias) if !alias.is_empty() => format!("{} - {alias}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// A listed company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub symbol: Symbol,
    pub market_id: MarketId,
}

impl Company {
    /// Selector label, `"{name} - {symbol}"`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.name, self.symbol)
    }
}

/// One timestamped record of a company's traded value and volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub company_id: CompanyId,
    pub timestamp: UtcDateTime,
    pub value: f64,
    pub volume: Option<i64>,
}

/// Numeric observation field a chart is drawn from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartField {
    #[default]
    Value,
    Volume,
}

impl ChartField {
    pub const ALL: [Self; 2] = [Self::Value, Self::Volume];

    /// Column name in `stocks`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Volume => "volume",
        }
    }

    /// Capitalized name used in series names and axis titles.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Value => "Value",
            Self::Volume => "Volume",
        }
    }

    /// The field's reading of `observation`, if present.
    pub fn extract(self, observation: &PriceObservation) -> Option<f64> {
        match self {
            Self::Value => Some(observation.value),
            Self::Volume => observation.volume.map(|volume| volume as f64),
        }
    }
}

impl Display for ChartField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartField {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "value" => Ok(Self::Value),
            "volume" => Ok(Self::Volume),
            _ => Err(ValidationError::InvalidField {
                value: value.to_owned(),
            }),
        }
    }
}
