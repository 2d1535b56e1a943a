//! TSN deployment table synthesis.
//!
//! Turns a routed network plan (topology, per-stream redundant paths, gate
//! schedules and traffic design) into the per-device, per-port tables a TSN
//! switch needs: VLAN registrations, static forwarding, port defaults,
//! stream priority classification, 802.1Qbv gate control lists and 802.1CB
//! FRER tables.
//!
//! ```no_run
//! use tsn_deploy::{DeployConfig, DeployPathData, Snapshot};
//!
//! # fn main() -> tsn_deploy::DeployResult<()> {
//! let snapshot = Snapshot::from_json_file("plan.json")?;
//! let mut deploy = DeployPathData::new(&snapshot, DeployConfig::default())?;
//! deploy.generate_data()?;
//! println!("{}", deploy.tables().to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deploy;
pub mod error;
pub mod tables;
pub mod topology;
pub mod walker;

#[cfg(test)]
mod test_support;

pub use config::DeployConfig;
pub use deploy::DeployPathData;
pub use error::{DeployError, DeployResult, ErrorKind};
pub use tables::{DeployTables, DeviceTables, TableFamily};
pub use topology::{Snapshot, TopologyIndex};
