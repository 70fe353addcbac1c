use std::process::ExitCode;

use devilbox_core::DevilboxConfig;
use devilbox_health::{AuxStatusMap, check_aux_services, check_health, render_aux, render_text};

/// One health pass. Exits non-zero unless every check passed.
pub async fn health(config: &DevilboxConfig, format: &str) -> anyhow::Result<ExitCode> {
    let report = check_health(config).await;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", render_text(&report)),
    }

    Ok(if report.score_percent < 100 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

pub async fn services(config: &DevilboxConfig, format: &str) -> anyhow::Result<()> {
    let statuses = check_aux_services(config).await;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&AuxStatusMap(statuses))?),
        _ => print!("{}", render_aux(&statuses)),
    }

    Ok(())
}
