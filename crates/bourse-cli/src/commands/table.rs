use bourse_core::render_table_with_failures;
use bourse_warehouse::Warehouse;

use crate::cli::SymbolsArgs;
use crate::error::CliError;

use super::{parse_symbols, CommandResult};

pub fn run(args: &SymbolsArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let rendered = render_table_with_failures(warehouse, &symbols);

    let no_data = rendered.output.is_no_data();
    let failed = rendered.failures.len();
    let result =
        CommandResult::ok(serde_json::to_value(&rendered.output)?).with_failures(rendered.failures);
    if no_data && failed < symbols.len() {
        return Ok(result.with_warning("no observations found for the requested symbols"));
    }
    Ok(result)
}
