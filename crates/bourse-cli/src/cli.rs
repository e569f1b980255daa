//! CLI argument definitions for `bourse`.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `markets` | List markets |
//! | `companies` | List the companies of one market |
//! | `table` | Price history table for symbols |
//! | `graph` | Price and Bollinger band charts for symbols |
//! | `serve` | Run the dashboard HTTP API |
//!
//! # Examples
//!
//! ```bash
//! bourse markets --format table
//! bourse companies 1
//! bourse table AIR 1rPAB --pretty
//! bourse graph AIR --field volume
//! bourse serve --bind 0.0.0.0:8050
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use bourse_core::ChartField;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Boursorama dashboard: browse markets, companies and their price history.
#[derive(Debug, Parser)]
#[command(name = "bourse", author, version, about)]
pub struct Cli {
    /// DuckDB file to read; `:memory:` opens an empty in-memory store.
    ///
    /// Defaults to `$BOURSE_DB_PATH`, else `<bourse home>/bourse.duckdb`.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Open the store read-write and create any missing dashboard tables.
    ///
    /// Without it the store is opened read-only and never written to.
    #[arg(long, global = true, default_value_t = false)]
    pub init_schema: bool,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log filter directive; `RUST_LOG` takes precedence when set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable layout for terminals.
    Table,
    /// Single JSON envelope.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every market with its selector label.
    Markets,

    /// List the companies listed on one market.
    Companies(CompaniesArgs),

    /// Render the price history table of one or more companies.
    Table(SymbolsArgs),

    /// Render the price and Bollinger band charts of one or more companies.
    Graph(GraphArgs),

    /// Serve the dashboard HTTP API.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct CompaniesArgs {
    /// Market id, as listed by `bourse markets`.
    pub market_id: i64,
}

#[derive(Debug, Args)]
pub struct SymbolsArgs {
    /// One or more company symbols, in display order.
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct GraphArgs {
    #[command(flatten)]
    pub symbols: SymbolsArgs,

    /// Observation field to chart.
    #[arg(long, value_enum, default_value_t = FieldArg::Value)]
    pub field: FieldArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    Value,
    Volume,
}

impl From<FieldArg> for ChartField {
    fn from(field: FieldArg) -> Self {
        match field {
            FieldArg::Value => Self::Value,
            FieldArg::Volume => Self::Volume,
        }
    }
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address.
    #[arg(long, default_value_t = bourse_web::DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Seconds a session may sit idle before it is dropped.
    #[arg(long, default_value_t = bourse_web::DEFAULT_SESSION_TTL.as_secs())]
    pub session_ttl_secs: u64,

    /// Most sessions held at once; the least recently used is dropped first.
    #[arg(long, default_value_t = bourse_web::DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bourse",
            "graph",
            "AIR",
            "BNP",
            "--field",
            "volume",
            "--format",
            "table",
        ])
        .expect("parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert!(!cli.init_schema);
        let Command::Graph(args) = cli.command else {
            panic!("expected graph command");
        };
        assert_eq!(args.symbols.symbols, vec!["AIR", "BNP"]);
        assert_eq!(ChartField::from(args.field), ChartField::Volume);
    }

    #[test]
    fn table_requires_a_symbol() {
        assert!(Cli::try_parse_from(["bourse", "table"]).is_err());
    }

    #[test]
    fn serve_defaults_to_dashboard_port() {
        let cli = Cli::try_parse_from(["bourse", "serve"]).expect("parse");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.bind.port(), 8050);
        assert_eq!(args.session_ttl_secs, 1_800);
        assert_eq!(args.max_sessions, 1_024);
        assert_eq!(cli.log_filter, "warn");
    }

    #[test]
    fn schema_bootstrap_is_opt_in() {
        let cli = Cli::try_parse_from(["bourse", "markets", "--init-schema"]).expect("parse");
        assert!(cli.init_schema);
    }
}
