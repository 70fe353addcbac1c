//! Dashboard handlers.

use axum::Json;
use axum::extract::State;

use devilbox_core::HealthReport;
use devilbox_health::{AuxStatusMap, check_aux_services, check_health, render_text};

use crate::DashboardState;

pub async fn overview(State(state): State<DashboardState>) -> String {
    render_text(&check_health(&state.config).await)
}

pub async fn health(State(state): State<DashboardState>) -> Json<HealthReport> {
    Json(check_health(&state.config).await)
}

pub async fn services(State(state): State<DashboardState>) -> Json<AuxStatusMap> {
    Json(AuxStatusMap(check_aux_services(&state.config).await))
}
