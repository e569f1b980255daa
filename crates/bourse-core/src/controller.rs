//! Reactive dashboard controller.
//!
//! Every user interaction is a [`DashboardEvent`]. The controller applies it to
//! a [`DashboardSession`] and returns the resulting [`DashboardView`]. Controls
//! appear in a fixed chain:
//!
//! ```text
//! market selector
//!   └─ company selector            (a market is chosen)
//!        └─ "Display Table"        (at least one company is chosen)
//!             └─ table
//!                  └─ field picker + "Display Graphic"
//!                       └─ price chart + band chart
//! ```
//!
//! An event aimed at a control that is not shown is rejected with
//! [`ControllerError::ControlUnavailable`] and leaves the session untouched.
//! Changing an upstream choice retracts everything below it.

use serde::{Deserialize, Serialize};

use crate::chart::{AnalyticsRenderer, ChartPair};
use crate::domain::{ChartField, Company, Market, MarketId, Symbol};
use crate::error::ControllerError;
use crate::selection::SelectionState;
use crate::store::MarketStore;
use crate::table::{render_table, TableView};

pub const PAGE_TITLE: &str = "Boursorama - Dashboard";

const COMPANY_SELECTOR: &str = "company_selector";
const DISPLAY_TABLE: &str = "display_table";
const FIELD_PICKER: &str = "field_picker";
const DISPLAY_GRAPH: &str = "display_graph";

/// A user interaction with the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// Initial page load.
    Load,
    /// The market selector changed; `None` when it was cleared.
    MarketSelected {
        #[serde(default)]
        market: Option<MarketId>,
    },
    CompaniesSelected {
        #[serde(default)]
        symbols: Vec<Symbol>,
    },
    DisplayTableClicked,
    FieldSelected {
        field: ChartField,
    },
    DisplayGraphClicked,
}

impl DashboardEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::MarketSelected { .. } => "market_selected",
            Self::CompaniesSelected { .. } => "companies_selected",
            Self::DisplayTableClicked => "display_table_clicked",
            Self::FieldSelected { .. } => "field_selected",
            Self::DisplayGraphClicked => "display_graph_clicked",
        }
    }
}

/// One choice of a selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption<V> {
    pub label: String,
    pub value: V,
}

impl From<Market> for SelectOption<MarketId> {
    fn from(market: Market) -> Self {
        Self {
            label: market.label(),
            value: market.id,
        }
    }
}

impl From<Company> for SelectOption<Symbol> {
    fn from(company: Company) -> Self {
        Self {
            label: company.label(),
            value: company.symbol,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSelector {
    pub options: Vec<SelectOption<MarketId>>,
    pub selected: Option<MarketId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanySelector {
    pub options: Vec<SelectOption<Symbol>>,
    pub selected: Vec<Symbol>,
}

/// Field picker and "Display Graphic" action, shown once a table is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphControls {
    pub field: ChartField,
    pub options: Vec<SelectOption<ChartField>>,
}

impl GraphControls {
    fn new(field: ChartField) -> Self {
        Self {
            field,
            options: ChartField::ALL
                .into_iter()
                .map(|option| SelectOption {
                    label: option.label().to_owned(),
                    value: option,
                })
                .collect(),
        }
    }
}

/// Snapshot of everything the page shows. Absent controls are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: &'static str,
    pub market_selector: MarketSelector,
    pub company_selector: Option<CompanySelector>,
    pub display_table: bool,
    pub table: Option<TableView>,
    pub graph_controls: Option<GraphControls>,
    pub charts: Option<ChartPair>,
}

/// Per-user dashboard state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSession {
    selection: SelectionState,
    market_options: Vec<SelectOption<MarketId>>,
    company_options: Option<Vec<SelectOption<Symbol>>>,
    table: Option<TableView>,
    field: Option<ChartField>,
    charts: Option<ChartPair>,
}

impl DashboardSession {
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    fn company_selector_visible(&self) -> bool {
        self.company_options.is_some()
    }

    fn display_table_visible(&self) -> bool {
        self.company_selector_visible() && self.selection.has_companies()
    }

    fn graph_controls_visible(&self) -> bool {
        self.field.is_some()
    }

    /// Keep only the symbols the company selector currently offers.
    fn offered(&self, symbols: Vec<Symbol>) -> Vec<Symbol> {
        let options = self.company_options.as_deref().unwrap_or_default();
        symbols
            .into_iter()
            .filter(|symbol| {
                let offered = options.iter().any(|option| &option.value == symbol);
                if !offered {
                    tracing::debug!(%symbol, "ignoring symbol not listed on the selected market");
                }
                offered
            })
            .collect()
    }

    /// Drop the table and everything derived from it.
    fn retract_table(&mut self) {
        self.table = None;
        self.field = None;
        self.charts = None;
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            title: PAGE_TITLE,
            market_selector: MarketSelector {
                options: self.market_options.clone(),
                selected: self.selection.market(),
            },
            company_selector: self.company_options.as_ref().map(|options| CompanySelector {
                options: options.clone(),
                selected: self.selection.companies().to_vec(),
            }),
            display_table: self.display_table_visible(),
            table: self.table.clone(),
            graph_controls: self.field.map(GraphControls::new),
            charts: self.charts.clone(),
        }
    }
}

/// Binds dashboard events to store queries and renderers.
#[derive(Debug, Clone)]
pub struct DashboardController<S> {
    store: S,
    analytics: AnalyticsRenderer,
}

impl<S: MarketStore> DashboardController<S> {
    pub fn new(store: S) -> Self {
        Self::with_analytics(store, AnalyticsRenderer::default())
    }

    pub fn with_analytics(store: S, analytics: AnalyticsRenderer) -> Self {
        Self { store, analytics }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply one event to `session`.
    ///
    /// Prerequisites are checked before any state changes, so a rejected
    /// event leaves `session` as it was.
    pub fn handle(
        &self,
        session: &mut DashboardSession,
        event: DashboardEvent,
    ) -> Result<DashboardView, ControllerError> {
        tracing::info!(event = event.name(), "dashboard event");
        self.check_prerequisite(session, &event)?;

        match event {
            DashboardEvent::Load => {
                session.market_options = self.market_options();
            }
            DashboardEvent::MarketSelected { market } => {
                session.market_options = self.market_options();
                session.retract_table();
                match market {
                    Some(market) => {
                        session.selection.select_market(market);
                        session.company_options = Some(self.company_options(market));
                    }
                    None => {
                        session.selection.clear_market();
                        session.company_options = None;
                    }
                }
            }
            DashboardEvent::CompaniesSelected { symbols } => {
                let symbols = session.offered(symbols);
                session.selection.select_companies(symbols);
                session.retract_table();
            }
            DashboardEvent::DisplayTableClicked => {
                let table = render_table(&self.store, session.selection.companies());
                tracing::debug!(rows = table.row_count(), "table rendered");
                session.table = Some(table);
                session.field = Some(ChartField::default());
                session.charts = None;
            }
            DashboardEvent::FieldSelected { field } => {
                session.field = Some(field);
            }
            DashboardEvent::DisplayGraphClicked => {
                let field = session.field.unwrap_or_default();
                session.charts = Some(self.analytics.render(
                    &self.store,
                    session.selection.companies(),
                    field,
                ));
            }
        }

        Ok(session.view())
    }

    fn check_prerequisite(
        &self,
        session: &DashboardSession,
        event: &DashboardEvent,
    ) -> Result<(), ControllerError> {
        let (control, visible) = match event {
            DashboardEvent::Load | DashboardEvent::MarketSelected { .. } => return Ok(()),
            DashboardEvent::CompaniesSelected { .. } => {
                (COMPANY_SELECTOR, session.company_selector_visible())
            }
            DashboardEvent::DisplayTableClicked => {
                (DISPLAY_TABLE, session.display_table_visible())
            }
            DashboardEvent::FieldSelected { .. } => {
                (FIELD_PICKER, session.graph_controls_visible())
            }
            DashboardEvent::DisplayGraphClicked => {
                (DISPLAY_GRAPH, session.graph_controls_visible())
            }
        };

        if visible {
            Ok(())
        } else {
            tracing::debug!(event = event.name(), control, "rejecting event for hidden control");
            Err(ControllerError::ControlUnavailable { control })
        }
    }

    fn market_options(&self) -> Vec<SelectOption<MarketId>> {
        match self.store.markets() {
            Ok(markets) => markets.into_iter().map(SelectOption::from).collect(),
            Err(error) => {
                tracing::warn!(%error, "market fetch failed; showing no options");
                Vec::new()
            }
        }
    }

    fn company_options(&self, market: MarketId) -> Vec<SelectOption<Symbol>> {
        match self.store.companies(market) {
            Ok(companies) => companies.into_iter().map(SelectOption::from).collect(),
            Err(error) => {
                tracing::warn!(%market, %error, "company fetch failed; showing no options");
                Vec::new()
            }
        }
    }
}
