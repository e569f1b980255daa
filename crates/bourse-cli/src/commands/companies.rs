use bourse_core::{Company, MarketId, MarketStore};
use bourse_warehouse::Warehouse;
use serde::Serialize;

use crate::cli::CompaniesArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct CompanyRow {
    #[serde(flatten)]
    company: Company,
    label: String,
}

#[derive(Debug, Serialize)]
struct CompaniesResponseData {
    market_id: MarketId,
    companies: Vec<CompanyRow>,
}

pub fn run(args: &CompaniesArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let market_id = MarketId(args.market_id);
    let companies = MarketStore::companies(warehouse, market_id)?
        .into_iter()
        .map(|company| CompanyRow {
            label: company.label(),
            company,
        })
        .collect::<Vec<_>>();

    let empty = companies.is_empty();
    let result = CommandResult::ok(serde_json::to_value(CompaniesResponseData {
        market_id,
        companies,
    })?);
    if empty {
        return Ok(result.with_warning(format!("market {market_id} has no companies")));
    }
    Ok(result)
}
