//! # Market Data
//!
//! $$
//! P \in \mathbb{R}_{>0}^{T \times N}, \qquad r_t = \frac{P_t}{P_{t-1}} - 1
//! $$
//!
//! Tickers, date ranges, price tables and the return series derived from them.

pub mod price_table;
pub mod range;
pub mod returns;
pub mod ticker;

pub use price_table::PriceTable;
pub use range::DateRange;
pub use returns::ReturnSeries;
pub use ticker::parse_tickers;
pub use ticker::Ticker;
