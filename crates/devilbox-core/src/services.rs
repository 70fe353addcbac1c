//! Declarative service tables.
//!
//! Every probed service is one [`ServiceSpec`] row; the aggregator iterates
//! [`SERVICES`] generically instead of special-casing each service. Adding a
//! service means adding a row.

use serde::Serialize;

use crate::config::EnvMap;
use crate::types::{AddressForm, Credentials, ProbeKind};

const TWO_FORMS: &[AddressForm] = &[AddressForm::Declared, AddressForm::Resolved];
const THREE_FORMS: &[AddressForm] = &[
    AddressForm::Declared,
    AddressForm::Resolved,
    AddressForm::Loopback,
];

/// Where a service's probe credentials come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The probe does not authenticate.
    None,
    /// Fixed user, password read from `pass_key`.
    FixedUser {
        user: &'static str,
        pass_key: &'static str,
    },
    /// User and password both read from configuration.
    FromEnv {
        user_key: &'static str,
        default_user: &'static str,
        pass_key: &'static str,
    },
    /// Password only; nothing is sent when the password is empty.
    PasswordOnly { pass_key: &'static str },
}

/// One probed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Short key, also the compose service name ("mysql").
    pub key: &'static str,
    /// Name shown in reports ("MySQL").
    pub display_name: &'static str,
    /// Configuration key holding the declared hostname.
    pub host_key: &'static str,
    pub default_host: &'static str,
    pub port: u16,
    pub kind: ProbeKind,
    pub forms: &'static [AddressForm],
    /// Required services are probed regardless of availability.
    pub required: bool,
    pub credentials: CredentialSource,
}

/// Services probed by a health pass, in display order.
pub const SERVICES: &[ServiceSpec] = &[
    ServiceSpec {
        key: "httpd",
        display_name: "Httpd",
        host_key: "HTTPD_HOST_NAME",
        default_host: "httpd",
        port: 80,
        kind: ProbeKind::Http,
        forms: TWO_FORMS,
        required: true,
        credentials: CredentialSource::None,
    },
    ServiceSpec {
        key: "mysql",
        display_name: "MySQL",
        host_key: "MYSQL_HOST_NAME",
        default_host: "mysql",
        port: 3306,
        kind: ProbeKind::Mysql,
        forms: THREE_FORMS,
        required: false,
        credentials: CredentialSource::FixedUser {
            user: "root",
            pass_key: "MYSQL_ROOT_PASSWORD",
        },
    },
    ServiceSpec {
        key: "pgsql",
        display_name: "PgSQL",
        host_key: "PGSQL_HOST_NAME",
        default_host: "pgsql",
        port: 5432,
        kind: ProbeKind::Postgres,
        forms: THREE_FORMS,
        required: false,
        credentials: CredentialSource::FromEnv {
            user_key: "PGSQL_ROOT_USER",
            default_user: "postgres",
            pass_key: "PGSQL_ROOT_PASSWORD",
        },
    },
    ServiceSpec {
        key: "redis",
        display_name: "Redis",
        host_key: "REDIS_HOST_NAME",
        default_host: "redis",
        port: 6379,
        kind: ProbeKind::Redis,
        forms: THREE_FORMS,
        required: false,
        credentials: CredentialSource::PasswordOnly {
            pass_key: "REDIS_PASSWORD",
        },
    },
    ServiceSpec {
        key: "memcd",
        display_name: "Memcached",
        host_key: "MEMCD_HOST_NAME",
        default_host: "memcd",
        port: 11211,
        kind: ProbeKind::Memcached,
        forms: THREE_FORMS,
        required: false,
        credentials: CredentialSource::None,
    },
    ServiceSpec {
        key: "mongo",
        display_name: "MongoDB",
        host_key: "MONGO_HOST_NAME",
        default_host: "mongo",
        port: 27017,
        kind: ProbeKind::Tcp,
        forms: THREE_FORMS,
        required: false,
        credentials: CredentialSource::None,
    },
    ServiceSpec {
        key: "bind",
        display_name: "Bind",
        host_key: "DNS_HOST_NAME",
        default_host: "bind",
        port: 53,
        kind: ProbeKind::Tcp,
        forms: TWO_FORMS,
        required: true,
        credentials: CredentialSource::None,
    },
];

impl ServiceSpec {
    /// Look up a row by key.
    pub fn find(key: &str) -> Option<&'static ServiceSpec> {
        SERVICES.iter().find(|s| s.key == key)
    }

    /// Configuration flag that forces availability on or off.
    pub fn enabled_key(&self) -> String {
        format!("{}_ENABLED", self.key.to_ascii_uppercase())
    }

    /// Declared hostname for this service.
    pub fn host(&self, env: &EnvMap) -> String {
        env.get_or(self.host_key, self.default_host)
    }

    /// Explicit availability from configuration, if any.
    pub fn availability_flag(&self, env: &EnvMap) -> Option<bool> {
        if self.required {
            return Some(true);
        }
        env.flag(&self.enabled_key())
    }

    /// Probe credentials for this service.
    pub fn credentials(&self, env: &EnvMap) -> Option<Credentials> {
        match self.credentials {
            CredentialSource::None => None,
            CredentialSource::FixedUser { user, pass_key } => {
                Some(Credentials::new(user, env.get(pass_key).unwrap_or_default()))
            }
            CredentialSource::FromEnv {
                user_key,
                default_user,
                pass_key,
            } => Some(Credentials::new(
                env.get_or(user_key, default_user),
                env.get(pass_key).unwrap_or_default(),
            )),
            CredentialSource::PasswordOnly { pass_key } => match env.get(pass_key) {
                Some(pass) if !pass.is_empty() => Some(Credentials::new("", pass)),
                _ => None,
            },
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = vec![self.host_key.to_string(), self.enabled_key()];
        match self.credentials {
            CredentialSource::None => {}
            CredentialSource::FixedUser { pass_key, .. }
            | CredentialSource::PasswordOnly { pass_key } => keys.push(pass_key.to_string()),
            CredentialSource::FromEnv {
                user_key, pass_key, ..
            } => {
                keys.push(user_key.to_string());
                keys.push(pass_key.to_string());
            }
        }
        keys
    }
}

// ── Auxiliary services ─────────────────────────────────────────────

/// Credentials for an auxiliary web UI, with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxLogin {
    pub user_key: &'static str,
    pub default_user: &'static str,
    pub pass_key: &'static str,
    pub default_pass: &'static str,
}

/// An optional extra tool whose only check is "is its port open".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxServiceSpec {
    pub key: &'static str,
    pub name: &'static str,
    /// Web UI port probed on loopback.
    pub port: u16,
    /// Secondary protocol port (SMTP, AMQP, S3 API), shown but not probed.
    pub extra_port: Option<(&'static str, u16)>,
    pub login: Option<AuxLogin>,
    /// `(key, default)` of a single API key.
    pub api_key: Option<(&'static str, &'static str)>,
}

pub const AUX_SERVICES: &[AuxServiceSpec] = &[
    AuxServiceSpec {
        key: "meilisearch",
        name: "Meilisearch",
        port: 7700,
        extra_port: None,
        login: None,
        api_key: Some(("MEILI_MASTER_KEY", "masterKey")),
    },
    AuxServiceSpec {
        key: "mailpit",
        name: "Mailpit",
        port: 8025,
        extra_port: Some(("smtp", 1025)),
        login: None,
        api_key: None,
    },
    AuxServiceSpec {
        key: "rabbit",
        name: "RabbitMQ",
        port: 15672,
        extra_port: Some(("amqp", 5672)),
        login: Some(AuxLogin {
            user_key: "RABBIT_DEFAULT_USER",
            default_user: "guest",
            pass_key: "RABBIT_DEFAULT_PASS",
            default_pass: "guest",
        }),
        api_key: None,
    },
    AuxServiceSpec {
        key: "minio",
        name: "MinIO",
        port: 9001,
        extra_port: Some(("api", 9000)),
        login: Some(AuxLogin {
            user_key: "MINIO_ROOT_USER",
            default_user: "minioadmin",
            pass_key: "MINIO_ROOT_PASSWORD",
            default_pass: "minioadmin",
        }),
        api_key: None,
    },
];

/// Connection details of an auxiliary service, resolved against configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuxServiceInfo {
    pub key: String,
    pub name: String,
    pub port: u16,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_port: Option<(String, u16)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl AuxServiceSpec {
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn info(&self, env: &EnvMap) -> AuxServiceInfo {
        AuxServiceInfo {
            key: self.key.to_string(),
            name: self.name.to_string(),
            port: self.port,
            url: self.url(),
            extra_port: self.extra_port.map(|(label, port)| (label.to_string(), port)),
            username: self.login.map(|l| env.get_or(l.user_key, l.default_user)),
            password: self.login.map(|l| env.get_or(l.pass_key, l.default_pass)),
            api_key: self.api_key.map(|(key, default)| env.get_or(key, default)),
        }
    }
}

/// Every configuration key the service tables read, for environment overlay.
pub fn referenced_keys() -> Vec<String> {
    let mut keys: Vec<String> = SERVICES.iter().flat_map(ServiceSpec::keys).collect();
    for aux in AUX_SERVICES {
        if let Some(login) = aux.login {
            keys.push(login.user_key.to_string());
            keys.push(login.pass_key.to_string());
        }
        if let Some((key, _)) = aux.api_key {
            keys.push(key.to_string());
        }
    }
    keys
}
