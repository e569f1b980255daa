//! Price history grid for the selected companies.

use serde::Serialize;
use serde_json::Value;

use crate::domain::{Symbol, UtcDateTime};
use crate::store::{FetchFailure, MarketStore, Rendered, StockTable};

/// Placeholder shown when no observation row could be assembled.
pub const NO_DATA_MESSAGE: &str = "No data available.";

/// Column whose cells are reformatted for display.
const DATE_COLUMN: &str = "date";

/// Rendered table: a header row plus one row per observation, or a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableView {
    Grid {
        header: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    NoData {
        message: String,
    },
}

impl TableView {
    fn no_data() -> Self {
        Self::NoData {
            message: String::from(NO_DATA_MESSAGE),
        }
    }

    pub fn header(&self) -> &[String] {
        match self {
            Self::Grid { header, .. } => header,
            Self::NoData { .. } => &[],
        }
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        match self {
            Self::Grid { rows, .. } => rows,
            Self::NoData { .. } => &[],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }
}

/// Fetch and concatenate the price history of every symbol, in order.
///
/// Symbols whose fetch fails or returns nothing contribute no rows. Columns are
/// unioned by name in first-seen order and missing cells are `null`.
pub fn render_table<S>(store: &S, symbols: &[Symbol]) -> TableView
where
    S: MarketStore + ?Sized,
{
    render_table_with_failures(store, symbols).output
}

/// [`render_table`], also reporting which symbols failed to load.
pub fn render_table_with_failures<S>(store: &S, symbols: &[Symbol]) -> Rendered<TableView>
where
    S: MarketStore + ?Sized,
{
    let mut builder = GridBuilder::default();
    let mut failures = Vec::new();
    for symbol in symbols {
        match store.stock_table(symbol) {
            Ok(table) if table.is_empty() => {
                tracing::debug!(%symbol, "no observations for symbol");
            }
            Ok(table) => builder.append(table),
            Err(error) => {
                tracing::warn!(%symbol, %error, "stock table fetch failed; rendering without it");
                failures.push(FetchFailure::new(symbol, &error));
            }
        }
    }
    Rendered {
        output: builder.finish(),
        failures,
    }
}

#[derive(Default)]
struct GridBuilder {
    header: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl GridBuilder {
    fn append(&mut self, table: StockTable) {
        let positions = table
            .columns
            .iter()
            .map(|column| self.column_position(column.name.as_str()))
            .collect::<Vec<_>>();

        for row in table.rows {
            let mut cells = vec![Value::Null; self.header.len()];
            for (position, cell) in positions.iter().zip(row) {
                cells[*position] = cell;
            }
            self.rows.push(cells);
        }
    }

    fn column_position(&mut self, name: &str) -> usize {
        if let Some(position) = self.header.iter().position(|column| column == name) {
            return position;
        }
        self.header.push(name.to_owned());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.header.len() - 1
    }

    fn finish(mut self) -> TableView {
        if self.rows.is_empty() {
            return TableView::no_data();
        }

        if let Some(date) = self.header.iter().position(|column| column == DATE_COLUMN) {
            for row in &mut self.rows {
                format_date_cell(&mut row[date]);
            }
        }

        TableView::Grid {
            header: self.header,
            rows: self.rows,
        }
    }
}

fn format_date_cell(cell: &mut Value) {
    let Value::String(raw) = cell else {
        return;
    };
    if let Ok(timestamp) = UtcDateTime::parse(raw) {
        *cell = Value::String(timestamp.format_table());
    }
}
