mod cli;
mod command;
mod storage;

use clap::Parser;
use fabric_ca_client::FabricCaClient;
use fabric_sdk::crypto::CryptoSuiteFactory;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::storage::EnrollmentStore;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();
    info!("Starting CA client CLI");

    let config = cli.client_config()?;
    let crypto_suite = CryptoSuiteFactory::new().default_suite()?;
    let client = FabricCaClient::new(config, crypto_suite);
    let store = EnrollmentStore::new(&cli.enrollment_dir, &cli.msp_id)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            ctrl_c.cancel();
        }
    });

    cli.command.execute(&client, &store, &cancel).await
}
