pub mod client;
pub mod errors;
pub mod types;

pub use client::{P2pClient, parse_search_body};
pub use errors::P2pError;
pub use types::*;
