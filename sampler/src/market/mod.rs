pub mod binance;
pub mod sampler;
pub mod types;
