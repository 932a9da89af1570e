//! Provider adapters implementing [`crate::KlineSource`].

mod binance;

pub use binance::BinanceKlineSource;
