//! Core contracts for the bourse dashboard.
//!
//! This crate contains:
//! - Domain models and identifier decoding
//! - The `MarketStore` read contract over the warehouse
//! - Table and chart renderers, including Bollinger bands
//! - The reactive dashboard controller and its session state
//! - Response envelope for machine-readable outputs

pub mod bands;
pub mod chart;
pub mod controller;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod selection;
pub mod store;
pub mod table;

pub use bands::{BandPoint, BollingerBands};
pub use bourse_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
pub use chart::{AnalyticsRenderer, ChartPair, ChartSpec, Trace, TraceMode};
pub use controller::{
    DashboardController, DashboardEvent, DashboardSession, DashboardView, GraphControls,
    SelectOption, PAGE_TITLE,
};
pub use domain::{
    ChartField, Company, CompanyId, Market, MarketId, PriceObservation, Symbol, UtcDateTime,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};
pub use error::{ControllerError, DataAccessError, ValidationError};
pub use selection::SelectionState;
pub use store::{FetchFailure, MarketStore, Rendered, StockTable};
pub use table::{render_table, render_table_with_failures, TableView, NO_DATA_MESSAGE};
