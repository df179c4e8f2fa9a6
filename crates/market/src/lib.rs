pub mod binance;
pub mod file;

pub use binance::BinanceKlines;
pub use file::JsonFileSource;
