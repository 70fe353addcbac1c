//! devilbox-core: shared types and configuration for the Devilbox tools.
//!
//! Holds the pieces every other crate reads:
//!
//! - [`config`]: the `.env` key/value map and the explicit [`DevilboxConfig`]
//!   handed to the health aggregator, dashboard, and tool server.
//! - [`services`]: the declarative service table (ports, probe kinds,
//!   address forms, credential sources) iterated generically.
//! - [`types`]: probe targets, probe results, and the health report.

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::{DevilboxConfig, EnvMap};
pub use error::{ConfigError, ConfigResult};
pub use services::{
    AUX_SERVICES, AuxServiceInfo, AuxServiceSpec, CredentialSource, SERVICES, ServiceSpec,
};
pub use types::*;
