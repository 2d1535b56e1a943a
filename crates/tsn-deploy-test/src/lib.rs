//! Test infrastructure for TSN deployment table synthesis
//!
//! Provides:
//! - Capability presets and topology/routing builders
//! - Canned line and FRER diamond scenarios
//! - Table verification helpers
//! - Tracing setup for tests

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber honouring `RUST_LOG` (default `debug` for the
/// deploy crate). Safe to call from every test.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tsn_deploy=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
