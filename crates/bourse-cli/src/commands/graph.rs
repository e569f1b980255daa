use bourse_core::{AnalyticsRenderer, ChartField};
use bourse_warehouse::Warehouse;

use crate::cli::GraphArgs;
use crate::error::CliError;

use super::{parse_symbols, CommandResult};

pub fn run(args: &GraphArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols.symbols)?;
    let field = ChartField::from(args.field);
    let rendered = AnalyticsRenderer::default().render_with_failures(warehouse, &symbols, field);
    let charts = rendered.output;

    let charted = charts.price.trace_names().len();
    let without_data = symbols
        .len()
        .saturating_sub(charted + rendered.failures.len());
    let mut result =
        CommandResult::ok(serde_json::to_value(&charts)?).with_failures(rendered.failures);
    if without_data > 0 {
        result = result.with_warning(format!(
            "{without_data} of {} symbols have no observations",
            symbols.len()
        ));
    }
    if charts.bands.data.is_empty() && charted > 0 {
        result = result.with_warning("not enough consecutive observations for Bollinger bands");
    }
    Ok(result)
}
