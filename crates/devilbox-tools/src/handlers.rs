//! Tool call handlers.
//!
//! Each handler returns the text shown to the client. Failures are
//! [`ToolError`]s; the server turns them into `isError` results.

use std::fmt::Write as _;

use serde_json::Value;
use tracing::{debug, warn};

use devilbox_core::config::set_env_value;
use devilbox_core::{DevilboxConfig, EnvMap};
use devilbox_health::{
    HealthAggregator, NetworkProber, Prober, build_targets, check_aux_services, render_aux,
    render_text,
};

use crate::error::{ToolError, ToolResult};
use crate::runner::{CommandLine, CommandRunner, SystemRunner};
use crate::tools;

/// Container that hosts the PHP toolchain and database clients.
const PHP_CONTAINER: &str = "devilbox-php-1";

/// Everything a tool call needs: configuration, a command runner, and the
/// health aggregator used for the native connectivity report.
pub struct ToolContext<R = SystemRunner, P = NetworkProber> {
    config: DevilboxConfig,
    runner: R,
    aggregator: HealthAggregator<P>,
}

impl ToolContext {
    /// Production context: real processes and real network probes.
    pub fn system(config: DevilboxConfig) -> Self {
        let prober = NetworkProber::new(config.probe_timeout);
        Self::new(config, SystemRunner, prober)
    }
}

impl<R: CommandRunner, P: Prober> ToolContext<R, P> {
    pub fn new(config: DevilboxConfig, runner: R, prober: P) -> Self {
        Self {
            config,
            runner,
            aggregator: HealthAggregator::new(prober),
        }
    }

    pub fn config(&self) -> &DevilboxConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Dispatch one tool call.
    pub async fn call(&self, name: &str, args: &Value) -> ToolResult<String> {
        debug!(tool = name, "tool call");
        match name {
            tools::STATUS => self.compose_text(["ps"], &[]).await,
            tools::START => self.compose_text(["up", "-d"], &service_list(args)?).await,
            tools::STOP => self.compose_text(["stop"], &service_list(args)?).await,
            tools::RESTART => self.compose_text(["restart"], &service_list(args)?).await,
            tools::LOGS => self.logs(args).await,
            tools::EXEC => self.exec(args).await,
            tools::VHOSTS => self.vhosts(),
            tools::CONFIG => self.env_config(args),
            tools::DATABASES => self.databases(args).await,
            tools::HEALTH => Ok(self.health().await),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    // ── Orchestration ──────────────────────────────────────────────

    fn compose<const N: usize>(&self, verb: [&str; N], services: &[String]) -> CommandLine {
        CommandLine::new("docker-compose")
            .args(verb)
            .args(services.iter().cloned())
            .current_dir(self.config.root.clone())
    }

    async fn compose_text<const N: usize>(
        &self,
        verb: [&str; N],
        services: &[String],
    ) -> ToolResult<String> {
        let output = self.runner.run(&self.compose(verb, services)).await?;
        Ok(output.text().to_string())
    }

    async fn logs(&self, args: &Value) -> ToolResult<String> {
        let service = service_name(required_str(args, "service")?)?;
        let lines = match args.get("lines") {
            None | Some(Value::Null) => tools::DEFAULT_LOG_LINES,
            Some(v) => line_count(v).ok_or_else(|| ToolError::InvalidArgument {
                name: "lines",
                reason: format!("expected a non-negative integer, got {v}"),
            })?,
        };
        let tail = format!("--tail={lines}");
        self.compose_text(["logs", tail.as_str()], &[service]).await
    }

    async fn exec(&self, args: &Value) -> ToolResult<String> {
        let service = service_name(required_str(args, "service")?)?;
        let command = required_str(args, "command")?;
        let cmd = CommandLine::new("docker")
            .arg("exec")
            .arg(format!("devilbox-{service}-1"))
            .args(["sh", "-c", command]);
        let output = self.runner.run(&cmd).await?;
        Ok(output.text().to_string())
    }

    // ── Projects and configuration ─────────────────────────────────

    fn vhosts(&self) -> ToolResult<String> {
        let www = self.config.www_path();
        let mut projects: Vec<(String, bool)> = std::fs::read_dir(&www)?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .map(|entry| {
                let configured = entry.path().join(".devilbox").is_dir();
                (entry.file_name().to_string_lossy().into_owned(), configured)
            })
            .collect();
        projects.sort();

        let mut out = format!("Found {} projects:\n\n", projects.len());
        for (name, configured) in &projects {
            if *configured {
                let _ = writeln!(out, "✅ {name} (configured)");
            } else {
                let _ = writeln!(out, "⚠️  {name} (no vhost config)");
            }
        }
        Ok(out)
    }

    fn env_config(&self, args: &Value) -> ToolResult<String> {
        let path = self.config.env_path();
        match required_str(args, "action")? {
            "get" => {
                let env = EnvMap::from_file(&path)?;
                match optional_str(args, "key") {
                    Some(key) => Ok(match env.get(key) {
                        Some(value) => format!("{key}={value}"),
                        None => format!("Key \"{key}\" not found"),
                    }),
                    None => Ok(env
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join("\n")),
                }
            }
            "set" => {
                let (Some(key), Some(value)) = (optional_str(args, "key"), optional_str(args, "value"))
                else {
                    return Err(ToolError::InvalidArgument {
                        name: "key",
                        reason: "both key and value are required for action=set".into(),
                    });
                };
                set_env_value(&path, key, value)?;
                Ok(format!("Updated {key}={value}"))
            }
            other => Err(ToolError::InvalidArgument {
                name: "action",
                reason: format!("expected get or set, got {other:?}"),
            }),
        }
    }

    async fn databases(&self, args: &Value) -> ToolResult<String> {
        let cmd = CommandLine::new("docker").args(["exec", PHP_CONTAINER]);
        let cmd = match optional_str(args, "type").unwrap_or("mysql") {
            "mysql" => cmd.args([
                "mysql",
                "-h",
                "127.0.0.1",
                "-u",
                "root",
                "-proot",
                "--skip-ssl",
                "-e",
                "SHOW DATABASES;",
            ]),
            "pgsql" => cmd.args(["psql", "-h", "127.0.0.1", "-U", "postgres", "-l"]),
            other => {
                return Err(ToolError::InvalidArgument {
                    name: "type",
                    reason: format!("expected mysql or pgsql, got {other:?}"),
                });
            }
        };
        Ok(self.runner.run(&cmd).await?.text().to_string())
    }

    // ── Health ─────────────────────────────────────────────────────

    /// Container status, host resources, and the native probe report. A
    /// failing section is reported inline and the rest still run.
    async fn health(&self) -> String {
        let mut out = String::new();

        out.push_str("=== Service Status ===\n");
        out.push_str(&self.section(self.compose(["ps"], &[])).await);

        out.push_str("\n=== Disk Space ===\n");
        out.push_str(&self.section(CommandLine::new("df").arg("-h")).await);

        out.push_str("\n=== Docker Info ===\n");
        let info = CommandLine::new("docker").args([
            "info",
            "--format",
            "{{.OperatingSystem}} | {{.ServerVersion}}",
        ]);
        out.push_str(&self.section(info).await);

        let ping = CommandLine::new("docker").args(["exec", PHP_CONTAINER, "ping", "-c", "1", "mysql"]);
        match self.runner.run(&ping).await {
            Ok(_) => out.push_str("\n✅ PHP → MySQL connectivity: OK\n"),
            Err(e) => {
                debug!(error = %e, "php to mysql ping failed");
                out.push_str("\n❌ PHP → MySQL connectivity: FAILED\n");
            }
        }

        let targets = build_targets(&self.config).await;
        let report = self.aggregator.aggregate(&targets).await;
        out.push_str("\n=== Service Connectivity ===\n");
        out.push_str(&render_text(&report));

        out.push_str("\n=== Auxiliary Services ===\n");
        out.push_str(&render_aux(&check_aux_services(&self.config).await));

        out
    }

    async fn section(&self, cmd: CommandLine) -> String {
        let mut text = match self.runner.run(&cmd).await {
            Ok(output) => output.text().to_string(),
            Err(e) => {
                warn!(command = %cmd, error = %e, "health section failed");
                format!("Error: {e}")
            }
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text
    }
}

// ── Argument helpers ───────────────────────────────────────────────

fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

fn required_str<'a>(args: &'a Value, name: &'static str) -> ToolResult<&'a str> {
    optional_str(args, name).ok_or(ToolError::MissingArgument(name))
}

/// Compose service and container names: `[A-Za-z0-9_.-]+`, never starting
/// with `-` so a name cannot be read as an option.
fn service_name(raw: &str) -> ToolResult<String> {
    let valid = !raw.is_empty()
        && !raw.starts_with('-')
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(raw.to_string())
    } else {
        Err(ToolError::InvalidArgument {
            name: "service",
            reason: format!("{raw:?} is not a valid service name"),
        })
    }
}

/// Whole numbers only; JSON clients may send `50.0` for 50.
fn line_count(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| f.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(f))
            .map(|f| f as u64)
    })
}

fn service_list(args: &Value) -> ToolResult<Vec<String>> {
    match args.get("services") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| ToolError::InvalidArgument {
                        name: "services",
                        reason: format!("expected strings, got {item}"),
                    })
                    .and_then(service_name)
            })
            .collect(),
        Some(other) => Err(ToolError::InvalidArgument {
            name: "services",
            reason: format!("expected an array, got {other}"),
        }),
    }
}
