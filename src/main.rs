use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::info;

use salonpay::infra::{
    app::create_app,
    pending_sweeper::{SweepSettings, run_pending_sweep_loop},
    setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let app_state = init_app_state().await?;

    // Read config before moving app_state
    let bind_addr = app_state.config.bind_addr;
    let sweep = SweepSettings {
        interval: Duration::from_secs(app_state.config.pending_sweep_interval_secs),
        min_age: chrono::Duration::seconds(app_state.config.pending_sweep_min_age_secs),
        max_age: chrono::Duration::hours(app_state.config.pending_sweep_max_age_hours),
    };

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(run_pending_sweep_loop(
        app_state.reconciliation_use_cases.clone(),
        sweep,
        shutdown.clone(),
    ));

    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    let signal = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        signal.cancel();
    })
    .await?;

    shutdown.cancel();
    sweeper.await?;

    Ok(())
}
