use clap::Parser;
use clicker_client::{
    client,
    config::{
        AppConfig,
        Args,
    },
    logging,
};
use color_eyre::eyre::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::from(Args::parse());
    let _log_guard = logging::init_tracing(&config.log_dir)?;
    tracing::info!(
        api_url = %config.api_url,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "starting clicker client"
    );
    client::run_app(config).await
}
