//! Port liveness for the auxiliary tools (search, mail catcher, broker, S3).
//!
//! These have no protocol probe; a completed TCP connect on the loopback
//! host is all "running" means.

use std::time::Duration;

use futures::future::join_all;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tokio::net::TcpStream;
use tracing::debug;

use devilbox_core::{AUX_SERVICES, AuxServiceInfo, DevilboxConfig};

/// Whether a TCP connect to `host:port` completes within `timeout`.
pub async fn is_port_open(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(%host, port, error = %e, "port closed");
            false
        }
        Err(_) => {
            debug!(%host, port, "port check timed out");
            false
        }
    }
}

/// An auxiliary service's connection details plus whether it answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuxServiceStatus {
    #[serde(flatten)]
    pub info: AuxServiceInfo,
    pub running: bool,
}

impl AuxServiceStatus {
    pub fn key(&self) -> &str {
        &self.info.key
    }
}

/// Statuses keyed by service key. Serializes as a JSON object in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxStatusMap(pub Vec<AuxServiceStatus>);

impl AuxStatusMap {
    pub fn get(&self, key: &str) -> Option<&AuxServiceStatus> {
        self.0.iter().find(|s| s.key() == key)
    }
}

impl Serialize for AuxStatusMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for status in &self.0 {
            map.serialize_entry(status.key(), status)?;
        }
        map.end()
    }
}

/// Check every auxiliary service concurrently, in table order.
pub async fn check_aux_services(config: &DevilboxConfig) -> Vec<AuxServiceStatus> {
    let checks = AUX_SERVICES.iter().map(|spec| async move {
        let running = is_port_open(&config.loopback_host, spec.port, config.probe_timeout).await;
        AuxServiceStatus {
            info: spec.info(&config.env),
            running,
        }
    });
    join_all(checks).await
}
