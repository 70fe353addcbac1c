//! Turn the service table into probe targets.
//!
//! Availability and the resolved address form both depend on DNS, so each
//! declared hostname is looked up once per pass (bounded by the probe
//! timeout) and the answer is shared between the two decisions.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use devilbox_core::{AddressForm, DevilboxConfig, SERVICES, ServiceSpec, ServiceTarget, TargetAddress};

/// Resolve `host` to one address, preferring IPv4. `None` on failure,
/// timeout, or an empty host.
pub async fn resolve_host(host: &str, timeout: Duration) -> Option<IpAddr> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(ip);
    }

    match tokio::time::timeout(timeout, tokio::net::lookup_host((host, 0))).await {
        Ok(Ok(addrs)) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            addrs
                .iter()
                .find(|a| a.is_ipv4())
                .or_else(|| addrs.first())
                .map(SocketAddr::ip)
        }
        Ok(Err(e)) => {
            debug!(%host, error = %e, "hostname did not resolve");
            None
        }
        Err(_) => {
            debug!(%host, "hostname lookup timed out");
            None
        }
    }
}

/// Whether an optional service should be probed. An explicit flag wins;
/// otherwise the service counts as present when its hostname resolves.
pub fn is_available(spec: &ServiceSpec, config: &DevilboxConfig, resolved: Option<IpAddr>) -> bool {
    spec.availability_flag(&config.env).unwrap_or(resolved.is_some())
}

/// Build the target for one service from an already-resolved address.
pub fn target_for(spec: &ServiceSpec, config: &DevilboxConfig, resolved: Option<IpAddr>) -> ServiceTarget {
    let declared = spec.host(&config.env);
    let credentials = spec.credentials(&config.env);

    let addresses = spec
        .forms
        .iter()
        .map(|&form| {
            let host = match form {
                AddressForm::Declared => declared.clone(),
                AddressForm::Resolved => resolved.map(|ip| ip.to_string()).unwrap_or_default(),
                AddressForm::Loopback => config.loopback_host.clone(),
            };
            TargetAddress {
                form,
                host,
                credentials: credentials.clone(),
            }
        })
        .collect();

    ServiceTarget {
        service_name: spec.display_name.to_string(),
        port: spec.port,
        kind: spec.kind,
        addresses,
    }
}

/// Targets for every available service, in table order.
pub async fn build_targets(config: &DevilboxConfig) -> Vec<ServiceTarget> {
    let lookups = SERVICES.iter().map(|spec| async move {
        let host = spec.host(&config.env);
        (spec, resolve_host(&host, config.probe_timeout).await)
    });

    join_all(lookups)
        .await
        .into_iter()
        .filter_map(|(spec, resolved)| {
            if is_available(spec, config, resolved) {
                Some(target_for(spec, config, resolved))
            } else {
                debug!(service = spec.key, "service not available, skipping");
                None
            }
        })
        .collect()
}
