use serde::Serialize;

use crate::domain::{MarketId, Symbol};

/// The user's current market and company choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    market: Option<MarketId>,
    companies: Vec<Symbol>,
}

impl SelectionState {
    pub fn market(&self) -> Option<MarketId> {
        self.market
    }

    pub fn companies(&self) -> &[Symbol] {
        &self.companies
    }

    pub fn has_companies(&self) -> bool {
        !self.companies.is_empty()
    }

    /// Choosing a market (even the same one again) drops the company choice.
    pub fn select_market(&mut self, market: MarketId) {
        self.market = Some(market);
        self.companies.clear();
    }

    pub fn clear_market(&mut self) {
        self.market = None;
        self.companies.clear();
    }

    /// Replace the company set, keeping first-seen order and dropping repeats.
    pub fn select_companies(&mut self, symbols: impl IntoIterator<Item = Symbol>) {
        self.companies.clear();
        for symbol in symbols {
            if !self.companies.contains(&symbol) {
                self.companies.push(symbol);
            }
        }
    }
}
