use bourse_core::{Market, MarketStore};
use bourse_warehouse::Warehouse;
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct MarketRow {
    #[serde(flatten)]
    market: Market,
    label: String,
}

#[derive(Debug, Serialize)]
struct MarketsResponseData {
    markets: Vec<MarketRow>,
}

pub fn run(warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let markets = MarketStore::markets(warehouse)?
        .into_iter()
        .map(|market| MarketRow {
            label: market.label(),
            market,
        })
        .collect::<Vec<_>>();

    let empty = markets.is_empty();
    let result = CommandResult::ok(serde_json::to_value(MarketsResponseData { markets })?);
    if empty {
        return Ok(result.with_warning("store has no markets"));
    }
    Ok(result)
}
