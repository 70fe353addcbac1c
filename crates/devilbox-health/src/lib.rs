//! devilbox-health: reachability probes and health scoring for Devilbox.
//!
//! One health pass probes every address form of every available service
//! exactly once and folds the results into a [`HealthReport`].
//!
//! # Architecture
//!
//! ```text
//! DevilboxConfig
//!   └── build_targets()          service table → Vec<ServiceTarget>
//!         └── HealthAggregator   probes all forms concurrently
//!               ├── Prober::probe() → ProbeResult (NetworkProber in production)
//!               └── HealthReport  declared order, ceil-rounded score
//! ```
//!
//! # Failure model
//!
//! A failed probe is data, not an error. Timeouts, refusals, DNS failures,
//! and empty hosts are reported as `unreachable`; handshake or credential
//! failures as `rejected`. Nothing in this crate returns `Result` to the
//! caller of a health pass.
//!
//! [`HealthReport`]: devilbox_core::HealthReport

pub mod aggregator;
pub mod liveness;
pub mod probe;
pub mod render;
pub mod targets;

pub use aggregator::{HealthAggregator, check_health};
pub use liveness::{AuxServiceStatus, AuxStatusMap, check_aux_services, is_port_open};
pub use probe::{NetworkProber, Prober, probe};
pub use render::{render_aux, render_text};
pub use targets::{build_targets, resolve_host};
