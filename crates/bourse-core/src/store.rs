//! Read contract over the market data store.

use std::sync::Arc;

use bourse_warehouse::{CompanyRecord, MarketRecord, QueryResult, StockRecord, Warehouse};
use serde::Serialize;

use crate::domain::{Company, CompanyId, Market, MarketId, PriceObservation, Symbol, UtcDateTime};
use crate::error::DataAccessError;

/// Joined price history rows for the table view: every `stocks` column plus
/// `company_name` and `market_name`.
pub type StockTable = QueryResult;

/// Read-only access to markets, companies and price observations.
///
/// Implementations run one parameterized query per call and hold no
/// connection between calls.
pub trait MarketStore {
    /// All markets, ordered by id.
    fn markets(&self) -> Result<Vec<Market>, DataAccessError>;

    /// Companies whose `market_id` equals `market_id`.
    fn companies(&self, market_id: MarketId) -> Result<Vec<Company>, DataAccessError>;

    /// Price history of `symbol` joined with company and market names.
    fn stock_table(&self, symbol: &Symbol) -> Result<StockTable, DataAccessError>;

    /// Price history of `symbol` ordered by timestamp.
    fn price_history(&self, symbol: &Symbol) -> Result<Vec<PriceObservation>, DataAccessError>;
}

/// A symbol whose read failed while a view was rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub symbol: Symbol,
    pub code: &'static str,
    pub message: String,
}

impl FetchFailure {
    pub fn new(symbol: &Symbol, error: &DataAccessError) -> Self {
        Self {
            symbol: symbol.clone(),
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// A rendered view plus the symbols that contributed nothing because their
/// read failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered<T> {
    pub output: T,
    pub failures: Vec<FetchFailure>,
}

impl<T: MarketStore + ?Sized> MarketStore for Arc<T> {
    fn markets(&self) -> Result<Vec<Market>, DataAccessError> {
        (**self).markets()
    }

    fn companies(&self, market_id: MarketId) -> Result<Vec<Company>, DataAccessError> {
        (**self).companies(market_id)
    }

    fn stock_table(&self, symbol: &Symbol) -> Result<StockTable, DataAccessError> {
        (**self).stock_table(symbol)
    }

    fn price_history(&self, symbol: &Symbol) -> Result<Vec<PriceObservation>, DataAccessError> {
        (**self).price_history(symbol)
    }
}

impl MarketStore for Warehouse {
    fn markets(&self) -> Result<Vec<Market>, DataAccessError> {
        let records = Warehouse::markets(self)?;
        Ok(records.into_iter().map(market_from_record).collect())
    }

    fn companies(&self, market_id: MarketId) -> Result<Vec<Company>, DataAccessError> {
        let records = Warehouse::companies(self, market_id.0)?;
        let mut companies = Vec::with_capacity(records.len());
        for record in records {
            match company_from_record(record) {
                Ok(company) => companies.push(company),
                Err(error) => {
                    tracing::warn!(market_id = market_id.0, %error, "skipping company with undecodable symbol");
                }
            }
        }
        Ok(companies)
    }

    fn stock_table(&self, symbol: &Symbol) -> Result<StockTable, DataAccessError> {
        Ok(Warehouse::stock_table(self, symbol.as_str())?)
    }

    fn price_history(&self, symbol: &Symbol) -> Result<Vec<PriceObservation>, DataAccessError> {
        Warehouse::price_history(self, symbol.as_str())?
            .into_iter()
            .map(observation_from_record)
            .collect()
    }
}

fn market_from_record(record: MarketRecord) -> Market {
    Market {
        id: MarketId(record.id),
        name: record.name,
        alias: record.alias,
    }
}

fn company_from_record(record: CompanyRecord) -> Result<Company, DataAccessError> {
    Ok(Company {
        id: CompanyId(record.id),
        name: record.name,
        symbol: Symbol::parse(&record.symbol)?,
        market_id: MarketId(record.market_id),
    })
}

fn observation_from_record(record: StockRecord) -> Result<PriceObservation, DataAccessError> {
    Ok(PriceObservation {
        company_id: CompanyId(record.company_id),
        timestamp: UtcDateTime::from_unix_micros(record.date_micros)?,
        value: record.value,
        volume: record.volume,
    })
}
