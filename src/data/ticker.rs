//! # Tickers
//!
//! $$
//! \texttt{"aapl, msft"} \mapsto [\texttt{AAPL}, \texttt{MSFT}]
//! $$
//!
//! Validated ticker symbols and the comma-separated input parser.

use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::PipelineError;
use crate::error::Result;

/// Symbol identifying a tradable asset.
///
/// Always trimmed, upper-cased and free of whitespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Ticker(String);

impl Ticker {
  /// Validate and normalize a raw symbol.
  pub fn new(raw: &str) -> Result<Self> {
    let symbol = raw.trim();
    if symbol.is_empty() {
      return Err(PipelineError::InvalidInput(
        "ticker must not be empty".to_string(),
      ));
    }
    if symbol.chars().any(char::is_whitespace) {
      return Err(PipelineError::InvalidInput(format!(
        "ticker {symbol:?} contains whitespace"
      )));
    }
    Ok(Self(symbol.to_uppercase()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Display for Ticker {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for Ticker {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl From<Ticker> for String {
  fn from(ticker: Ticker) -> Self {
    ticker.0
  }
}

impl TryFrom<String> for Ticker {
  type Error = PipelineError;

  fn try_from(raw: String) -> Result<Self> {
    Self::new(&raw)
  }
}

impl FromStr for Ticker {
  type Err = PipelineError;

  fn from_str(s: &str) -> Result<Self> {
    Self::new(s)
  }
}

/// Parse a comma-separated ticker list.
///
/// Empty input and empty segments (`"AAPL,,MSFT"`, trailing commas) are
/// rejected so that a malformed list never reaches the price source.
/// Duplicates are kept as given.
pub fn parse_tickers(input: &str) -> Result<Vec<Ticker>> {
  if input.trim().is_empty() {
    return Err(PipelineError::InvalidInput(
      "ticker list must not be empty".to_string(),
    ));
  }

  input
    .split(',')
    .enumerate()
    .map(|(i, part)| {
      Ticker::new(part).map_err(|e| match e {
        PipelineError::InvalidInput(msg) => {
          PipelineError::InvalidInput(format!("ticker #{}: {msg}", i + 1))
        }
        other => other,
      })
    })
    .collect()
}
