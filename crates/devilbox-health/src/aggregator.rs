//! Health aggregation: one probe per address form, folded into a report.
//!
//! All probes of a pass run concurrently. `join_all` yields results in
//! input order, so the report keeps declared service and address-form order
//! no matter which probe finishes first.

use futures::future::join_all;
use tracing::{debug, info, warn};

use devilbox_core::{DevilboxConfig, HealthReport, ServiceHealth, ServiceTarget};

use crate::probe::{NetworkProber, Prober};
use crate::targets::build_targets;

/// Runs a full probe pass over a set of targets.
#[derive(Debug, Clone, Default)]
pub struct HealthAggregator<P = NetworkProber> {
    prober: P,
}

impl<P: Prober> HealthAggregator<P> {
    pub fn new(prober: P) -> Self {
        Self { prober }
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Probe every address form of every target exactly once.
    pub async fn aggregate(&self, targets: &[ServiceTarget]) -> HealthReport {
        let probes = targets.iter().flat_map(|target| {
            target.addresses.iter().map(move |addr| {
                self.prober.probe(
                    target.kind,
                    &addr.host,
                    target.port,
                    addr.credentials.as_ref(),
                )
            })
        });
        let mut results = join_all(probes).await.into_iter();

        let services: Vec<ServiceHealth> = targets
            .iter()
            .map(|target| ServiceHealth {
                name: target.service_name.clone(),
                results: results.by_ref().take(target.addresses.len()).collect(),
            })
            .collect();

        for service in &services {
            for result in service.results.iter().filter(|r| !r.succeeded) {
                debug!(
                    service = %service.name,
                    host = %result.host,
                    detail = result.error_detail.as_deref().unwrap_or_default(),
                    "probe failed"
                );
            }
        }

        let report = HealthReport::from_services(services);
        if report.is_healthy() {
            info!(checks = report.total_checks, score = report.score_percent, "health pass complete");
        } else {
            warn!(
                checks = report.total_checks,
                failures = report.total_failures,
                score = report.score_percent,
                "health pass found failures"
            );
        }
        report
    }
}

/// Build targets from configuration and run one pass with real probes.
pub async fn check_health(config: &DevilboxConfig) -> HealthReport {
    let targets = build_targets(config).await;
    HealthAggregator::new(NetworkProber::new(config.probe_timeout))
        .aggregate(&targets)
        .await
}
