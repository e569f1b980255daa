//! Price and Bollinger band chart payloads.
//!
//! Charts serialize to Plotly-compatible figure JSON (`data` + `layout`) so the
//! browser side can hand them to the plotting library unchanged.

use serde::Serialize;

use crate::bands::BollingerBands;
use crate::domain::{ChartField, PriceObservation, Symbol, UtcDateTime};
use crate::store::{FetchFailure, MarketStore, Rendered};

pub const PRICE_CHART_TITLE: &str = "Graphs for Selected Actions";
pub const BAND_CHART_TITLE: &str = "Bollinger Bands for Selected Actions";
const X_AXIS_TITLE: &str = "Date";

/// How a trace is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceMode {
    #[serde(rename = "lines")]
    Lines,
    #[serde(rename = "lines+markers")]
    LinesMarkers,
}

/// One named line series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub r#type: &'static str,
    pub mode: TraceMode,
    pub name: String,
    pub x: Vec<UtcDateTime>,
    pub y: Vec<Option<f64>>,
}

impl Trace {
    fn scatter(mode: TraceMode, name: String) -> Self {
        Self {
            r#type: "scatter",
            mode,
            name,
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
    /// Horizontal anchor; `0.5` centers the title.
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitle {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: AxisTitle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub xaxis: Axis,
    pub yaxis: Axis,
}

/// A complete chart: its traces and layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl ChartSpec {
    fn new(title: &str, field: ChartField) -> Self {
        Self {
            data: Vec::new(),
            layout: Layout {
                title: Title {
                    text: title.to_owned(),
                    x: 0.5,
                },
                xaxis: Axis {
                    title: AxisTitle {
                        text: X_AXIS_TITLE.to_owned(),
                    },
                },
                yaxis: Axis {
                    title: AxisTitle {
                        text: field.label().to_owned(),
                    },
                },
            },
        }
    }

    pub fn trace_names(&self) -> Vec<&str> {
        self.data.iter().map(|trace| trace.name.as_str()).collect()
    }
}

/// The two charts rendered by "Display Graphic".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPair {
    pub field: ChartField,
    pub price: ChartSpec,
    pub bands: ChartSpec,
}

/// Builds both charts for a selection of symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsRenderer {
    bands: BollingerBands,
}

impl AnalyticsRenderer {
    pub fn new(bands: BollingerBands) -> Self {
        Self { bands }
    }

    /// One fetch per symbol; symbols without observations (or whose fetch
    /// fails) add no traces to either chart.
    pub fn render<S>(&self, store: &S, symbols: &[Symbol], field: ChartField) -> ChartPair
    where
        S: MarketStore + ?Sized,
    {
        self.render_with_failures(store, symbols, field).output
    }

    /// [`Self::render`], also reporting which symbols failed to load.
    pub fn render_with_failures<S>(
        &self,
        store: &S,
        symbols: &[Symbol],
        field: ChartField,
    ) -> Rendered<ChartPair>
    where
        S: MarketStore + ?Sized,
    {
        let mut price = ChartSpec::new(PRICE_CHART_TITLE, field);
        let mut bands = ChartSpec::new(BAND_CHART_TITLE, field);
        let mut failures = Vec::new();

        for symbol in symbols {
            let history = match store.price_history(symbol) {
                Ok(history) => history,
                Err(error) => {
                    tracing::warn!(%symbol, %error, "price history fetch failed; charting without it");
                    failures.push(FetchFailure::new(symbol, &error));
                    continue;
                }
            };
            if history.is_empty() {
                tracing::debug!(%symbol, "no observations for symbol");
                continue;
            }

            price.data.push(price_trace(symbol, field, &history));
            bands.data.extend(self.band_traces(symbol, field, &history));
        }

        tracing::debug!(
            %field,
            price_traces = price.data.len(),
            band_traces = bands.data.len(),
            "rendered charts"
        );
        Rendered {
            output: ChartPair {
                field,
                price,
                bands,
            },
            failures,
        }
    }

    /// Upper and lower band traces, or nothing when no band point is defined.
    fn band_traces(
        &self,
        symbol: &Symbol,
        field: ChartField,
        history: &[PriceObservation],
    ) -> Vec<Trace> {
        let readings = history
            .iter()
            .map(|observation| field.extract(observation))
            .collect::<Vec<_>>();

        let mut upper = Trace::scatter(
            TraceMode::Lines,
            format!("{symbol} - Upper Bollinger Band"),
        );
        let mut lower = Trace::scatter(
            TraceMode::Lines,
            format!("{symbol} - Lower Bollinger Band"),
        );

        for (observation, point) in history.iter().zip(self.bands.compute(&readings)) {
            let Some(point) = point else {
                continue;
            };
            upper.x.push(observation.timestamp);
            upper.y.push(Some(point.upper));
            lower.x.push(observation.timestamp);
            lower.y.push(Some(point.lower));
        }

        if upper.is_empty() {
            return Vec::new();
        }
        vec![upper, lower]
    }
}

fn price_trace(symbol: &Symbol, field: ChartField, history: &[PriceObservation]) -> Trace {
    let mut trace = Trace::scatter(
        TraceMode::LinesMarkers,
        format!("{symbol} - {}", field.label()),
    );
    for observation in history {
        trace.x.push(observation.timestamp);
        trace.y.push(field.extract(observation));
    }
    trace
}
