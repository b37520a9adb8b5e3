#[macro_use]
extern crate tracing;

use bastion_exporter_config::{
    Args,
    Config,
};
use clap::Parser;
use color_eyre::Result;
use tokio::net::TcpListener;
use wallix_bastion_exporter::{
    create_router,
    init_errors,
    init_logging,
    server,
    AppState,
    Exporter,
    MetricCatalog,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    init_logging()?;

    let config = Config::load(Args::parse())?;
    debug!(?config, "configuration loaded");

    let state = AppState {
        exporter: Exporter::new(&config)?,
        catalog: MetricCatalog::new(config.sessions_closed_window),
    };
    let router = create_router(&config.telemetry_path, state);

    let listener = TcpListener::bind(config.listen_address).await?;
    info!(
        address = %config.listen_address,
        telemetry_path = %config.telemetry_path,
        scrape_uri = %config.scrape_uri,
        "listening"
    );
    server::serve(listener, router, server::shutdown_signal()).await
}
