//! # Domain Models
//!
//! Typed views of the three bourse tables.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Market`] | Exchange grouping companies |
//! | [`Company`] | Listed company, many-to-one with a market |
//! | [`PriceObservation`] | Timestamped value/volume of a company |
//! | [`Symbol`] | Company ticker |
//! | [`ChartField`] | Observation field a chart is drawn from |
//! | [`UtcDateTime`] | UTC timestamp |

mod models;
mod symbol;
mod timestamp;

pub use models::{ChartField, Company, CompanyId, Market, MarketId, PriceObservation};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
