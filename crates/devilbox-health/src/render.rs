//! Plain-text rendering shared by the dashboard and the CLI.

use std::fmt::Write;

use devilbox_core::HealthReport;

use crate::liveness::AuxServiceStatus;

/// One line per probe, then the score:
///
/// ```text
/// MySQL connect mysql: OK
/// MySQL connect 172.16.238.12: FAILED (unreachable: connection refused)
/// Health: 50%
/// ```
pub fn render_text(report: &HealthReport) -> String {
    let mut out = String::new();
    for service in &report.services {
        for result in &service.results {
            if result.succeeded {
                let _ = writeln!(out, "{} connect {}: OK", service.name, result.host);
            } else {
                let detail = result.error_detail.as_deref().unwrap_or("no further detail");
                let _ = writeln!(
                    out,
                    "{} connect {}: FAILED ({detail})",
                    service.name, result.host
                );
            }
        }
    }
    let _ = writeln!(out, "Health: {}%", report.score_percent);
    out
}

/// One line per auxiliary service: name, state, and URL.
pub fn render_aux(statuses: &[AuxServiceStatus]) -> String {
    let mut out = String::new();
    for status in statuses {
        let state = if status.running { "running" } else { "stopped" };
        let _ = write!(out, "{:<12} {:<8} {}", status.info.name, state, status.info.url);
        if let Some((label, port)) = &status.info.extra_port {
            let _ = write!(out, " ({label} :{port})");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use devilbox_core::{AuxServiceInfo, ProbeResult, ServiceHealth};

    #[test]
    fn text_lists_every_probe_then_score() {
        let report = HealthReport::from_services(vec![
            ServiceHealth {
                name: "Httpd".into(),
                results: vec![ProbeResult::success("httpd"), ProbeResult::success("10.0.0.2")],
            },
            ServiceHealth {
                name: "MySQL".into(),
                results: vec![ProbeResult::unreachable("mysql", "connection refused")],
            },
        ]);
        let text = render_text(&report);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "Httpd connect httpd: OK",
                "Httpd connect 10.0.0.2: OK",
                "MySQL connect mysql: FAILED (unreachable: connection refused)",
                "Health: 66%",
            ]
        );
    }

    #[test]
    fn empty_report_is_full_health() {
        let text = render_text(&HealthReport::from_services(Vec::new()));
        assert_eq!(text, "Health: 100%\n");
    }

    #[test]
    fn aux_lines_show_state_and_extra_port() {
        let statuses = [AuxServiceStatus {
            info: AuxServiceInfo {
                key: "mailpit".into(),
                name: "Mailpit".into(),
                port: 8025,
                url: "http://localhost:8025".into(),
                extra_port: Some(("smtp".into(), 1025)),
                username: None,
                password: None,
                api_key: None,
            },
            running: false,
        }];
        let text = render_aux(&statuses);
        assert!(text.starts_with("Mailpit"));
        assert!(text.contains("stopped"));
        assert!(text.trim_end().ends_with("http://localhost:8025 (smtp :1025)"));
    }
}
