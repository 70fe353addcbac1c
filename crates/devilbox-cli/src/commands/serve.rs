use std::net::{IpAddr, SocketAddr};

use anyhow::Context;

use devilbox_core::DevilboxConfig;
use devilbox_dashboard::DashboardState;

pub async fn serve(config: DevilboxConfig, bind: IpAddr, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::new(bind, port);
    devilbox_dashboard::serve(DashboardState::new(config), addr)
        .await
        .with_context(|| format!("dashboard server on {addr} failed"))
}
