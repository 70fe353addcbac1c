//! Domain types for reachability probes and health reports.
//!
//! A health pass turns the service table into a list of [`ServiceTarget`]s,
//! probes every address form exactly once, and folds the resulting
//! [`ProbeResult`]s into a [`HealthReport`]. None of these types are
//! persisted; a report lives for one page render or one tool call.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Targets ────────────────────────────────────────────────────────

/// How a service is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Bare TCP connect.
    Tcp,
    /// TCP connect followed by an HTTP/1.1 `GET /`.
    Http,
    /// Authenticated MySQL login.
    Mysql,
    /// Authenticated PostgreSQL login.
    Postgres,
    /// RESP `PING`, preceded by `AUTH` when a password is configured.
    Redis,
    /// Memcached text-protocol `version`.
    Memcached,
}

impl ProbeKind {
    /// Whether this probe kind can tell "rejected credentials" apart from
    /// "could not reach host".
    pub fn authenticates(self) -> bool {
        matches!(self, Self::Mysql | Self::Postgres | Self::Redis)
    }
}

/// One of the ways a service may be reached from the PHP container.
///
/// Declared order is significant for display: declared hostname first,
/// then the resolved container address, then loopback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressForm {
    /// The hostname from configuration (`MYSQL_HOST_NAME`, ...).
    Declared,
    /// The address the declared hostname resolves to.
    Resolved,
    /// `127.0.0.1`, for services whose ports are forwarded into the container.
    Loopback,
}

impl AddressForm {
    pub fn label(self) -> &'static str {
        match self {
            Self::Declared => "declared",
            Self::Resolved => "resolved",
            Self::Loopback => "loopback",
        }
    }
}

impl fmt::Display for AddressForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Login credentials for probes that authenticate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"***")
            .finish()
    }
}

/// A single address form of a service, ready to probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAddress {
    pub form: AddressForm,
    /// Host to connect to. Empty when the form could not be determined
    /// (for example, the declared hostname did not resolve).
    pub host: String,
    #[serde(skip_serializing)]
    pub credentials: Option<Credentials>,
}

impl TargetAddress {
    pub fn label(&self) -> &'static str {
        self.form.label()
    }
}

/// A service and the ordered address forms it should be probed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTarget {
    /// Display name ("MySQL", "Httpd", ...).
    pub service_name: String,
    pub port: u16,
    pub kind: ProbeKind,
    pub addresses: Vec<TargetAddress>,
}

// ── Results ────────────────────────────────────────────────────────

/// Why a probe failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, timed out, DNS failure, or empty host.
    Unreachable,
    /// Host answered but refused the handshake or the credentials.
    Rejected,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::Rejected => "rejected",
        }
    }
}

/// Outcome of exactly one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub host: String,
    pub succeeded: bool,
    /// Human-readable cause, always present and non-empty on failure.
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ProbeResult {
    pub fn success(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            succeeded: true,
            error_detail: None,
            failure: None,
        }
    }

    pub fn unreachable(host: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::failed(host, FailureKind::Unreachable, detail)
    }

    pub fn rejected(host: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::failed(host, FailureKind::Rejected, detail)
    }

    fn failed(host: impl Into<String>, kind: FailureKind, detail: impl fmt::Display) -> Self {
        let mut detail = detail.to_string();
        if detail.trim().is_empty() {
            detail = "no further detail".to_string();
        }
        Self {
            host: host.into(),
            succeeded: false,
            error_detail: Some(format!("{}: {detail}", kind.as_str())),
            failure: Some(kind),
        }
    }
}

/// Probe results for one service, in declared address-form order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub name: String,
    pub results: Vec<ProbeResult>,
}

impl ServiceHealth {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.succeeded).count()
    }
}

/// Aggregate of one full probe pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub services: Vec<ServiceHealth>,
    pub total_checks: u32,
    pub total_failures: u32,
    /// Always in `0..=100`.
    pub score_percent: u8,
}

impl HealthReport {
    /// Build a report, deriving the totals and score from the results.
    pub fn from_services(services: Vec<ServiceHealth>) -> Self {
        let total_checks = services.iter().map(|s| s.results.len() as u32).sum();
        let total_failures = services.iter().map(|s| s.failures() as u32).sum();
        Self {
            services,
            total_checks,
            total_failures,
            score_percent: health_score(total_checks, total_failures),
        }
    }

    /// Look up a service by display name.
    pub fn service(&self, name: &str) -> Option<&ServiceHealth> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn is_healthy(&self) -> bool {
        self.total_failures == 0
    }
}

/// `100 - ceil(100 * failures / checks)`, clamped to `0..=100`.
///
/// Failures round up, so a partial failure never displays as full health.
/// Zero checks scores 100.
pub fn health_score(checks: u32, failures: u32) -> u8 {
    if checks == 0 {
        return 100;
    }
    let failures = u64::from(failures.min(checks));
    let checks = u64::from(checks);
    let penalty = (100 * failures).div_ceil(checks);
    (100 - penalty) as u8
}
