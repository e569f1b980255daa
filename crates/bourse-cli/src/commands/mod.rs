mod companies;
mod graph;
mod markets;
pub mod serve;
mod table;

use std::time::Instant;

use bourse_core::{Envelope, EnvelopeError, EnvelopeMeta, FetchFailure, Symbol};
use bourse_warehouse::{Warehouse, WarehouseConfig};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub failures: Vec<FetchFailure>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_failures(mut self, failures: Vec<FetchFailure>) -> Self {
        self.failures.extend(failures);
        self
    }
}

/// Open the store selected by the global flags, read-only unless
/// `--init-schema` is given.
pub fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    Ok(Warehouse::open(warehouse_config(cli))?)
}

fn warehouse_config(cli: &Cli) -> WarehouseConfig {
    let mut config = WarehouseConfig::default();
    if let Some(db_path) = &cli.db_path {
        config.db_path = db_path.clone();
    }
    config.read_only = !cli.init_schema;

    tracing::debug!(db_path = %config.db_path.display(), read_only = config.read_only, "opening warehouse");
    config
}

/// Run a one-shot command and wrap its result in an envelope.
pub fn run(cli: &Cli, warehouse: &Warehouse) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();

    let CommandResult {
        data,
        warnings,
        failures,
    } = match &cli.command {
        Command::Markets => markets::run(warehouse)?,
        Command::Companies(args) => companies::run(args, warehouse)?,
        Command::Table(args) => table::run(args, warehouse)?,
        Command::Graph(args) => graph::run(args, warehouse)?,
        Command::Serve(_) => {
            return Err(CliError::Command(String::from(
                "serve does not produce an envelope",
            )))
        }
    };

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::generate(latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    let errors = failures
        .iter()
        .map(envelope_error)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Envelope::with_errors(meta, data, errors)?)
}

fn envelope_error(failure: &FetchFailure) -> Result<EnvelopeError, CliError> {
    Ok(EnvelopeError::new(
        failure.code,
        format!("{}: {}", failure.symbol, failure.message),
    )?)
}

fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    raw.iter()
        .map(|symbol| Symbol::parse(symbol).map_err(CliError::from))
        .collect()
}


#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::test_support::seeded_warehouse;
    use super::*;

    #[test]
    fn wraps_command_data_in_envelope() {
        let cli = Cli::try_parse_from(["bourse", "markets"]).expect("parse");
        let envelope = run(&cli, &seeded_warehouse()).expect("run");

        assert_eq!(envelope.meta.schema_version, bourse_core::SCHEMA_VERSION);
        assert_eq!(envelope.data["markets"][0]["label"], "Euronext Paris - PAR");
    }

    #[test]
    fn store_is_opened_read_only_by_default() {
        let cli = Cli::try_parse_from(["bourse", "markets"]).expect("parse");
        assert!(warehouse_config(&cli).read_only);

        let cli = Cli::try_parse_from(["bourse", "--init-schema", "markets"]).expect("parse");
        assert!(!warehouse_config(&cli).read_only);
    }

    #[test]
    fn store_failures_become_envelope_errors() {
        let warehouse = seeded_warehouse();
        warehouse
            .connection()
            .expect("connection")
            .execute_batch("DROP TABLE stocks;")
            .expect("drop");
        let cli = Cli::try_parse_from(["bourse", "table", "AIR", "BNP"]).expect("parse");

        let envelope = run(&cli, &warehouse).expect("run");

        assert_eq!(envelope.data["kind"], "no_data");
        assert!(envelope.meta.warnings.is_empty());
        assert_eq!(envelope.errors.len(), 2);
        assert_eq!(envelope.errors[0].code, "query_failed");
        assert!(envelope.errors[0].message.starts_with("AIR: query failed"));
    }

    #[test]
    fn invalid_symbol_is_a_validation_error() {
        let cli = Cli::try_parse_from(["bourse", "table", " "]).expect("parse");
        let error = run(&cli, &seeded_warehouse()).expect_err("must fail");
        assert_eq!(error.exit_code(), 2);
    }
}
