pub mod bolt;
pub mod client;
pub mod executor;
#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use executor::{ExecutionResult, GraphExecutor};
