//! # Bourse Warehouse
//!
//! DuckDB-backed data access for the bourse dashboard.
//!
//! ## Overview
//!
//! The warehouse is a read-only consumer of three tables filled by an external
//! ingestion process:
//!
//! | Table | Description |
//! |-------|-------------|
//! | `markets` | Exchanges/venues (`id`, `name`, `alias`) |
//! | `companies` | Listed companies (`id`, `name`, `symbol`, `mid`) |
//! | `stocks` | Price observations (`date`, `cid`, `value`, `volume`) |
//!
//! Every read acquires a scoped connection, runs one parameterized statement,
//! and releases the connection when it goes out of scope.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bourse_warehouse::{Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), bourse_warehouse::WarehouseError> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!     for market in warehouse.markets()? {
//!         println!("{} - {}", market.name, market.alias.unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Security
//!
//! Symbols and market ids are always bound as statement parameters:
//!
//! ```rust,no_run
//! # use bourse_warehouse::Warehouse;
//! # let warehouse = Warehouse::open_default()?;
//! // Matches no company instead of every company.
//! let rows = warehouse.price_history("AAA' OR '1'='1")?;
//! assert!(rows.is_empty());
//! # Ok::<(), bourse_warehouse::WarehouseError>(())
//! ```

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::types::{TimeUnit, Value as DuckValue};
use ::duckdb::Connection;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub use duckdb::{AccessMode, DuckDbConnectionManager, ScopedConnection, IN_MEMORY_PATH};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A row could not be decoded into a record.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for bourse data.
    pub bourse_home: PathBuf,
    /// Path to the `DuckDB` database file, or [`IN_MEMORY_PATH`].
    pub db_path: PathBuf,
    /// Open the database read-only and skip schema bootstrap. On by default;
    /// the tables belong to the ingestion process.
    pub read_only: bool,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let bourse_home = resolve_bourse_home();
        let db_path = resolve_db_path(bourse_home.as_path());
        Self {
            bourse_home,
            db_path,
            read_only: true,
        }
    }
}

impl WarehouseConfig {
    /// Configuration for a private in-memory store. Always writable and
    /// bootstrapped, since there is nothing to read otherwise.
    pub fn in_memory() -> Self {
        Self {
            bourse_home: resolve_bourse_home(),
            db_path: PathBuf::from(IN_MEMORY_PATH),
            read_only: false,
        }
    }
}

/// A row of the `markets` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketRecord {
    pub id: i64,
    pub name: String,
    pub alias: Option<String>,
}

/// A row of the `companies` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyRecord {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    /// `companies.mid`.
    pub market_id: i64,
}

/// A row of the `stocks` table with its timestamp in microseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRecord {
    /// `stocks.cid`.
    pub company_id: i64,
    pub date_micros: i64,
    pub value: f64,
    pub volume: Option<i64>,
}

/// Column metadata for query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlColumn {
    /// Column name.
    pub name: String,
    /// Column data type.
    #[serde(rename = "type")]
    pub r#type: String,
}

/// Result of a tabular query with dynamically typed cells.
///
/// Timestamp cells are RFC3339 strings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    /// Column definitions.
    pub columns: Vec<SqlColumn>,
    /// Row data as JSON values.
    pub rows: Vec<Vec<Value>>,
    /// Number of rows returned.
    pub row_count: usize,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The read interface over the bourse store.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    ///
    /// Only a writable store gets its parent directory created and missing
    /// tables bootstrapped; a read-only open never writes.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let in_memory = config.db_path.as_os_str() == IN_MEMORY_PATH;
        if !in_memory && !config.read_only {
            if let Some(parent) = config.db_path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let mode = if config.read_only {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        let manager = DuckDbConnectionManager::open(config.db_path.clone(), mode)?;
        let warehouse = Self { config, manager };
        if warehouse.manager.mode() == AccessMode::ReadWrite {
            warehouse.initialize()?;
        }
        Ok(warehouse)
    }

    /// Create the bourse tables if they are missing.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Acquire a scoped connection for statements outside the read API,
    /// such as loading fixtures.
    pub fn connection(&self) -> Result<ScopedConnection, WarehouseError> {
        Ok(self.manager.acquire()?)
    }

    /// List all markets ordered by id.
    pub fn markets(&self) -> Result<Vec<MarketRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare("SELECT id, name, alias FROM markets ORDER BY id")?;
        let rows = statement.query_map([], |row| {
            Ok(MarketRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                alias: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// List the companies listed on `market_id`, ordered by id.
    pub fn companies(&self, market_id: i64) -> Result<Vec<CompanyRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection
            .prepare("SELECT id, name, symbol, mid FROM companies WHERE mid = ? ORDER BY id")?;
        let rows = statement.query_map([market_id], |row| {
            Ok(CompanyRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                symbol: row.get(2)?,
                market_id: row.get(3)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Full price history of `symbol` joined with its company and market names.
    pub fn stock_table(&self, symbol: &str) -> Result<QueryResult, WarehouseError> {
        let connection = self.manager.acquire()?;
        execute_select(
            &connection,
            "SELECT stocks.*, companies.name AS company_name, markets.name AS market_name \
             FROM stocks \
             INNER JOIN companies ON stocks.cid = companies.id \
             INNER JOIN markets ON companies.mid = markets.id \
             WHERE companies.symbol = ? \
             ORDER BY stocks.date",
            symbol,
        )
    }

    /// Full price history of `symbol`, ordered by date.
    pub fn price_history(&self, symbol: &str) -> Result<Vec<StockRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT cid, date, value, volume FROM stocks \
             WHERE cid IN (SELECT id FROM companies WHERE symbol = ?) \
             ORDER BY date",
        )?;
        let rows = statement.query_map([symbol], |row| {
            let company_id: i64 = row.get(0)?;
            let date: DuckValue = row.get(1)?;
            let value: f64 = row.get(2)?;
            let volume: Option<i64> = row.get(3)?;
            Ok((company_id, date, value, volume))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (company_id, date, value, volume) = row?;
            records.push(StockRecord {
                company_id,
                date_micros: timestamp_micros(&date)?,
                value,
                volume,
            });
        }
        Ok(records)
    }
}

/// Execute a single-parameter SELECT and collect columns and rows.
fn execute_select(
    connection: &Connection,
    sql: &str,
    param: &str,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let mut rows_cursor = statement.query([param])?;

    let mut columns = Vec::new();
    if let Some(statement) = rows_cursor.as_ref() {
        for index in 0..statement.column_count() {
            columns.push(SqlColumn {
                name: statement.column_name(index)?.to_string(),
                r#type: statement.column_type(index).to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    while let Some(row) = rows_cursor.next()? {
        rows.push(read_row(row, columns.len())?);
    }

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
    })
}

/// Read a single row from the result set.
fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

/// Convert a DuckDB value to a JSON value.
fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        DuckValue::HugeInt(value) => i64::try_from(value)
            .map(|value| Value::Number(Number::from(value)))
            .unwrap_or_else(|_| Value::String(value.to_string())),
        DuckValue::Decimal(value) => decimal_to_json(&value.to_string()),
        DuckValue::Timestamp(unit, raw) => micros_to_rfc3339(unit_to_micros(unit, raw))
            .map(Value::String)
            .unwrap_or(Value::Null),
        DuckValue::Date32(days) => days_to_date(days)
            .map(Value::String)
            .unwrap_or(Value::Null),
        DuckValue::Time64(unit, raw) => Value::String(format_time_of_day(unit_to_micros(unit, raw))),
        DuckValue::Enum(value) => Value::String(value),
        DuckValue::List(values) => {
            Value::Array(values.into_iter().map(to_json_value).collect())
        }
        other => {
            tracing::debug!(value = ?other, "cell type has no JSON form; rendering null");
            Value::Null
        }
    }
}

/// Decimal text as a JSON number, or the text itself when it has no `f64` form.
fn decimal_to_json(text: &str) -> Value {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => number_from_f64(value),
        _ => Value::String(text.to_owned()),
    }
}

/// `YYYY-MM-DD` for a day count since the Unix epoch.
fn days_to_date(days: i32) -> Option<String> {
    let date = Date::from_julian_day(UNIX_EPOCH_JULIAN_DAY.checked_add(days)?).ok()?;
    date.format(DATE_FORMAT).ok()
}

/// `HH:MM:SS.ffffff` for microseconds since midnight.
fn format_time_of_day(micros: i64) -> String {
    let micros = micros.rem_euclid(86_400_000_000);
    let seconds = micros / 1_000_000;
    format!(
        "{:02}:{:02}:{:02}.{:06}",
        seconds / 3_600,
        seconds / 60 % 60,
        seconds % 60,
        micros % 1_000_000
    )
}

/// Convert an f64 to a JSON number, returning Null for NaN/Inf.
fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn unit_to_micros(unit: TimeUnit, raw: i64) -> i64 {
    match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    }
}

/// Extract microseconds since the epoch from a timestamp cell.
fn timestamp_micros(value: &DuckValue) -> Result<i64, WarehouseError> {
    match value {
        DuckValue::Timestamp(unit, raw) => Ok(unit_to_micros(*unit, *raw)),
        other => Err(WarehouseError::InvalidRecord(format!(
            "expected TIMESTAMP for stocks.date, got {other:?}"
        ))),
    }
}

fn micros_to_rfc3339(micros: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

/// Resolve the bourse home directory from environment or default.
fn resolve_bourse_home() -> PathBuf {
    if let Some(path) = env::var_os("BOURSE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".bourse");
    }

    PathBuf::from(".bourse")
}

fn resolve_db_path(bourse_home: &Path) -> PathBuf {
    match env::var_os("BOURSE_DB_PATH") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => bourse_home.join("bourse.duckdb"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded_warehouse() -> Warehouse {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse open");
        let connection = warehouse.connection().expect("connection");
        connection
            .execute_batch(
                r"
INSERT INTO markets VALUES (1, 'Euronext Paris', 'PAR'), (2, 'Amsterdam', 'AMS');
INSERT INTO companies VALUES
    (10, 'Airbus', 'AIR', 1),
    (11, 'Total', 'TTE', 1),
    (20, 'Philips', 'PHIA', 2);
INSERT INTO stocks VALUES
    (TIMESTAMP '2024-01-03 09:00:00', 10, 141.5, 1200),
    (TIMESTAMP '2024-01-02 09:00:00', 10, 140.0, 1000),
    (TIMESTAMP '2024-01-02 09:00:00.123456', 11, 60.25, NULL);
",
            )
            .expect("seed");
        warehouse
    }

    #[test]
    fn initializes_tables() {
        let temp = tempdir().expect("tempdir");
        let bourse_home = temp.path().join("bourse-home");
        let db_path = bourse_home.join("bourse.duckdb");

        let warehouse = Warehouse::open(WarehouseConfig {
            bourse_home,
            db_path,
            read_only: false,
        })
        .expect("warehouse open");

        assert!(warehouse.db_path().exists());
        assert!(warehouse.markets().expect("markets").is_empty());
    }

    #[test]
    fn lists_markets_in_id_order() {
        let warehouse = seeded_warehouse();
        let markets = warehouse.markets().expect("markets");
        assert_eq!(
            markets,
            vec![
                MarketRecord {
                    id: 1,
                    name: String::from("Euronext Paris"),
                    alias: Some(String::from("PAR")),
                },
                MarketRecord {
                    id: 2,
                    name: String::from("Amsterdam"),
                    alias: Some(String::from("AMS")),
                },
            ]
        );
    }

    #[test]
    fn companies_are_scoped_to_market() {
        let warehouse = seeded_warehouse();
        let companies = warehouse.companies(1).expect("companies");
        assert_eq!(companies.len(), 2);
        assert!(companies.iter().all(|company| company.market_id == 1));
        assert!(warehouse.companies(99).expect("companies").is_empty());
    }

    #[test]
    fn price_history_is_ordered_by_date() {
        let warehouse = seeded_warehouse();
        let history = warehouse.price_history("AIR").expect("history");
        assert_eq!(history.len(), 2);
        assert!(history[0].date_micros < history[1].date_micros);
        assert_eq!(history[0].value, 140.0);
        assert_eq!(history[0].volume, Some(1000));
    }

    #[test]
    fn price_history_keeps_null_volume() {
        let warehouse = seeded_warehouse();
        let history = warehouse.price_history("TTE").expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].volume, None);
        assert_eq!(history[0].date_micros % 1_000_000, 123_456);
    }

    #[test]
    fn stock_table_joins_company_and_market_names() {
        let warehouse = seeded_warehouse();
        let table = warehouse.stock_table("AIR").expect("table");

        let names = table
            .columns
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["date", "cid", "value", "volume", "company_name", "market_name"]
        );
        assert_eq!(table.row_count, 2);
        assert_eq!(table.rows[0][0], Value::String(String::from("2024-01-02T09:00:00Z")));
        assert_eq!(table.rows[0][4], Value::String(String::from("Airbus")));
        assert_eq!(table.rows[0][5], Value::String(String::from("Euronext Paris")));
    }

    #[test]
    fn symbol_is_bound_not_interpolated() {
        let warehouse = seeded_warehouse();
        let injected = "AIR' OR '1'='1";
        assert!(warehouse.price_history(injected).expect("history").is_empty());
        assert!(warehouse.stock_table(injected).expect("table").is_empty());
    }

    #[test]
    fn unknown_symbol_yields_empty_results() {
        let warehouse = seeded_warehouse();
        assert!(warehouse.price_history("NOPE").expect("history").is_empty());
        let table = warehouse.stock_table("NOPE").expect("table");
        assert_eq!(table.row_count, 0);
    }

    #[test]
    fn default_config_is_read_only() {
        assert!(WarehouseConfig::default().read_only);
        assert!(!WarehouseConfig::in_memory().read_only);
    }

    #[test]
    fn default_open_leaves_ingested_store_untouched() {
        let temp = tempdir().expect("tempdir");
        let db_path = temp.path().join("ingested.duckdb");
        {
            let connection = Connection::open(&db_path).expect("ingestion connection");
            connection
                .execute_batch(
                    r"
CREATE TABLE markets (id INTEGER, name TEXT, alias TEXT);
CREATE TABLE companies (id INTEGER, name TEXT, symbol TEXT, mid INTEGER);
CREATE TABLE stocks (date TIMESTAMP, cid INTEGER, value DOUBLE, volume BIGINT);
INSERT INTO markets VALUES (1, 'Euronext Paris', 'PAR');
",
                )
                .expect("ingest");
        }

        let warehouse = Warehouse::open(WarehouseConfig {
            db_path,
            ..WarehouseConfig::default()
        })
        .expect("open");

        assert_eq!(warehouse.markets().expect("markets").len(), 1);
        let bootstrap_tables: i64 = warehouse
            .connection()
            .expect("connection")
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'schema_migrations'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(bootstrap_tables, 0);
        assert!(warehouse
            .connection()
            .expect("connection")
            .execute_batch("INSERT INTO markets VALUES (2, 'Amsterdam', NULL);")
            .is_err());
    }

    #[test]
    fn stock_table_renders_decimal_date_and_time_cells() {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse open");
        warehouse
            .connection()
            .expect("connection")
            .execute_batch(
                r"
DROP TABLE stocks;
CREATE TABLE stocks (date TIMESTAMP, cid INTEGER, value DECIMAL(10,2), volume BIGINT, trade_day DATE, opened_at TIME);
INSERT INTO markets VALUES (1, 'Euronext Paris', 'PAR');
INSERT INTO companies VALUES (10, 'Airbus', 'AIR', 1);
INSERT INTO stocks VALUES
    (TIMESTAMP '2024-01-02 09:00:00', 10, 140.25, 1000, DATE '2024-01-02', TIME '09:00:00.5');
",
            )
            .expect("seed");

        let table = warehouse.stock_table("AIR").expect("table");

        assert_eq!(table.row_count, 1);
        let row = &table.rows[0];
        assert_eq!(row[2], serde_json::json!(140.25));
        assert_eq!(row[4], Value::String(String::from("2024-01-02")));
        assert_eq!(row[5], Value::String(String::from("09:00:00.500000")));
    }

    #[test]
    fn formats_decimal_date_and_time_text() {
        assert_eq!(decimal_to_json("12.50"), serde_json::json!(12.5));
        assert_eq!(days_to_date(0).as_deref(), Some("1970-01-01"));
        assert_eq!(format_time_of_day(3_723_000_001), "01:02:03.000001");
    }

    #[test]
    fn converts_timestamp_units_to_micros() {
        assert_eq!(unit_to_micros(TimeUnit::Second, 2), 2_000_000);
        assert_eq!(unit_to_micros(TimeUnit::Millisecond, 2), 2_000);
        assert_eq!(unit_to_micros(TimeUnit::Microsecond, 2), 2);
        assert_eq!(unit_to_micros(TimeUnit::Nanosecond, 2_000), 2);
    }
}
