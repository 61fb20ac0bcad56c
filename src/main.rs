use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use frontier_rs::data::parse_tickers;
use frontier_rs::data::DateRange;
use frontier_rs::fetch::MemoryPriceSource;
use frontier_rs::fetch::PriceSource;
use frontier_rs::optimize::Objective;
use frontier_rs::optimize::SolverKind;
use frontier_rs::report::price_tail_table;
use frontier_rs::report::write_bar_chart_html;
use frontier_rs::report::Report;
use frontier_rs::Pipeline;
use frontier_rs::PipelineConfig;
use frontier_rs::PipelineOutput;
use tracing_subscriber::EnvFilter;

/// Long-only max-Sharpe portfolio allocation from historical prices.
#[derive(Debug, Parser)]
#[command(name = "frontier", version, about)]
struct Cli {
  /// Comma-separated ticker symbols.
  #[arg(long, default_value = "AAPL,MSFT,GOOG,TSLA")]
  tickers: String,

  /// First date of the sample (inclusive, YYYY-MM-DD).
  #[arg(long, default_value = "2022-01-01")]
  start: String,

  /// Last date of the sample (exclusive, YYYY-MM-DD).
  #[arg(long, default_value = "2024-12-31")]
  end: String,

  /// JSON configuration file; flags below override its values.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Annualized risk-free rate.
  #[arg(long)]
  risk_free: Option<f64>,

  /// Optimization objective: max-sharpe or min-volatility.
  #[arg(long)]
  objective: Option<Objective>,

  /// Numerical method: active-set or nelder-mead.
  #[arg(long)]
  solver: Option<SolverKind>,

  /// Read prices from a JSON file ({"TICKER": [["YYYY-MM-DD", price], ...]})
  /// instead of downloading them.
  #[arg(long)]
  prices: Option<PathBuf>,

  /// Print the report as JSON instead of tables.
  #[arg(long)]
  json: bool,

  /// Also write an HTML bar chart of the weights.
  #[arg(long)]
  chart: Option<PathBuf>,

  /// Log level used when RUST_LOG is not set.
  #[arg(long, default_value = "info")]
  log_level: String,
}

impl Cli {
  fn pipeline_config(&self) -> Result<PipelineConfig> {
    let mut config = match &self.config {
      Some(path) => PipelineConfig::from_json_file(path)?,
      None => PipelineConfig::default(),
    };
    if let Some(rf) = self.risk_free {
      config.optimizer.risk_free_rate = rf;
    }
    if let Some(objective) = self.objective {
      config.optimizer.objective = objective;
    }
    if let Some(solver) = self.solver {
      config.optimizer.solver = solver;
    }
    config.validate()?;
    Ok(config)
  }
}

fn init_logging(level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

fn run<S: PriceSource>(cli: &Cli, source: S, config: PipelineConfig) -> Result<()> {
  let tickers = parse_tickers(&cli.tickers)?;
  let range = DateRange::parse(&cli.start, &cli.end)?;
  let pipeline = Pipeline::new(source, config);

  let prices = pipeline
    .fetch(&tickers, &range)
    .with_context(|| format!("failed fetching prices for {range}"))?;
  if !cli.json {
    println!("Latest prices");
    println!(
      "{}",
      price_tail_table(&prices.tail(pipeline.config().presenter.tail_rows))
    );
  }

  let estimates = pipeline.estimate(&prices)?;
  let allocation = pipeline.optimize(&estimates)?;
  let output = PipelineOutput {
    prices,
    estimates,
    allocation,
  };
  let report = Report::new(&output, pipeline.config());

  if cli.json {
    println!("{}", report.to_json()?);
  } else {
    // The price preview was already printed before optimizing.
    print!("{}", report.render_allocation());
  }

  if let Some(path) = &cli.chart {
    write_bar_chart_html(path, "Portfolio Allocation", &report.chart_series())?;
    tracing::info!(path = %path.display(), "wrote allocation chart");
  }

  Ok(())
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(&cli.log_level);
  let config = cli.pipeline_config()?;

  if let Some(path) = &cli.prices {
    let source = MemoryPriceSource::from_json_file(path)
      .with_context(|| format!("failed loading prices from {}", path.display()))?;
    return run(&cli, source, config);
  }

  #[cfg(feature = "yahoo")]
  {
    let source = frontier_rs::fetch::YahooPriceSource::new()?;
    run(&cli, source, config)
  }

  #[cfg(not(feature = "yahoo"))]
  {
    anyhow::bail!("no price source: pass --prices <file.json> or build with --features yahoo")
  }
}
