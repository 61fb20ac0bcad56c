//! # Report
//!
//! $$
//! \{(s_i, w_i)\} \mapsto \text{table},\ \text{JSON},\ \text{bar chart}
//! $$
//!
//! Presentation of a run: price preview, rounded weights and a descending
//! weight series for charting. Nothing here feeds back into the pipeline.

use std::fs;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use plotly::common::Title;
use plotly::Bar;
use plotly::Layout;
use plotly::Plot;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data::PriceTable;
use crate::data::Ticker;
use crate::optimize::Objective;
use crate::optimize::PortfolioPerformance;
use crate::optimize::WeightMapping;
use crate::pipeline::PipelineOutput;

const BAR_WIDTH: usize = 40;

/// Display-ready view of a finished run.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
  pub objective: Objective,
  pub risk_free_rate: f64,
  /// Cleaned weights rounded for display.
  pub weights: WeightMapping,
  pub performance: PortfolioPerformance,
  #[serde(skip)]
  pub price_tail: PriceTable,
}

impl Report {
  pub fn new(output: &PipelineOutput, config: &PipelineConfig) -> Self {
    Self {
      objective: config.optimizer.objective,
      risk_free_rate: config.optimizer.risk_free_rate,
      weights: output
        .allocation
        .weights
        .rounded(config.presenter.rounding),
      performance: output.allocation.performance,
      price_tail: output.prices.tail(config.presenter.tail_rows),
    }
  }

  /// Weights largest first, ready for a bar chart.
  pub fn chart_series(&self) -> Vec<(Ticker, f64)> {
    self.weights.sorted_descending()
  }

  pub fn to_json(&self) -> Result<String> {
    serde_json::to_string_pretty(self).context("failed serializing report")
  }

  /// Human-readable report: price preview followed by the allocation.
  pub fn render_text(&self) -> String {
    let mut out = String::from("Latest prices\n");
    out.push_str(&price_tail_table(&self.price_tail).to_string());
    out.push('\n');
    out.push_str(&self.render_allocation());
    out
  }

  /// Weights, portfolio statistics and bars.
  pub fn render_allocation(&self) -> String {
    let mut out = String::from("Optimal weights\n");
    out.push_str(&weights_json(&self.weights));
    out.push_str("\n\n");
    out.push_str(&performance_table(&self.performance).to_string());
    out.push_str("\nPortfolio allocation\n");
    out.push_str(&text_bar_chart(&self.chart_series()));
    out
  }
}

/// Tabulate a price table, one row per date.
pub fn price_tail_table(prices: &PriceTable) -> Table {
  let mut table = Table::new();

  let mut titles = vec![Cell::new("Date")];
  titles.extend(prices.tickers().iter().map(|t| Cell::new(t.as_str())));
  table.set_titles(Row::new(titles));

  for (date, row) in prices.dates().iter().zip(prices.prices().rows()) {
    let mut cells = vec![Cell::new(&date.to_string())];
    cells.extend(row.iter().map(|p| {
      if p.is_nan() {
        Cell::new("-")
      } else {
        Cell::new(&format!("{p:.2}"))
      }
    }));
    table.add_row(Row::new(cells));
  }

  table
}

/// Expected return, volatility and Sharpe ratio as a two-column table.
pub fn performance_table(perf: &PortfolioPerformance) -> Table {
  let mut table = Table::new();
  table.add_row(Row::new(vec![
    Cell::new("Expected annual return"),
    Cell::new(&format!("{:.2}%", perf.expected_return * 100.0)),
  ]));
  table.add_row(Row::new(vec![
    Cell::new("Annual volatility"),
    Cell::new(&format!("{:.2}%", perf.volatility * 100.0)),
  ]));
  table.add_row(Row::new(vec![
    Cell::new("Sharpe ratio"),
    Cell::new(&format!("{:.2}", perf.sharpe)),
  ]));
  table
}

/// Pretty JSON object of ticker -> weight.
pub fn weights_json(weights: &WeightMapping) -> String {
  // A map of strings to finite floats always serializes.
  serde_json::to_string_pretty(weights).unwrap_or_default()
}

/// Horizontal bar per ticker, scaled so that a weight of 1 spans the full width.
pub fn text_bar_chart(series: &[(Ticker, f64)]) -> String {
  let label_width = series.iter().map(|(t, _)| t.as_str().len()).max().unwrap_or(0);
  series
    .iter()
    .map(|(ticker, weight)| {
      let filled = (weight.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
      format!(
        "{:<label_width$} |{:<BAR_WIDTH$}| {:.2}%\n",
        ticker.as_str(),
        "#".repeat(filled),
        weight * 100.0
      )
    })
    .collect()
}

/// Write the weight series as an interactive plotly bar chart.
pub fn write_bar_chart_html<P: AsRef<Path>>(
  output_html: P,
  title: &str,
  series: &[(Ticker, f64)],
) -> Result<()> {
  let x: Vec<String> = series.iter().map(|(t, _)| t.to_string()).collect();
  let y: Vec<f64> = series.iter().map(|(_, w)| *w).collect();

  let mut plot = Plot::new();
  plot.add_trace(Bar::new(x, y).name("weight"));
  plot.set_layout(Layout::new().title(Title::from(title)));

  let output_html = output_html.as_ref();
  if let Some(parent) = output_html.parent() {
    fs::create_dir_all(parent)
      .with_context(|| format!("failed creating chart output directory {:?}", parent))?;
  }
  plot.write_html(output_html);
  Ok(())
}
