pub mod api;
pub mod config;
pub mod dirs;
#[cfg(test)]
mod test;
pub mod types;

#[cfg(test)]
#[allow(unused_imports)]
// Enable logging for ALL doc & local tests
use test::logging;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("yema-client/", env!("CARGO_PKG_VERSION"));

pub use reqwest::Error;
