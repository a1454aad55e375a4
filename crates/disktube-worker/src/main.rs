//! Transfer worker binary.

use tracing::{error, info};

use disktube_disk::{DiskClient, DiskConfig};
use disktube_ledger::Ledger;
use disktube_worker::processor::TransferRun;
use disktube_worker::{logging, WorkerConfig};
use disktube_youtube::{
    Authenticator, ClientSecrets, CredentialStore, InstalledFlow, YoutubeClient, YoutubeConfig,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match WorkerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Console output plus the plain-text log file mirror
    if let Err(e) = logging::init(&config.log_file) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Yandex Disk to YouTube transfer");

    // Disk client
    let disk = match DiskClient::new(DiskConfig::new(
        config.public_key.clone(),
        config.yandex_oauth_token.clone(),
    )) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create disk client: {}", e);
            std::process::exit(1);
        }
    };

    // Upload client; a missing client secrets file is unrecoverable
    let secrets = match ClientSecrets::load(&config.client_secrets_file).await {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let authenticator = Authenticator::new(
        reqwest::Client::new(),
        secrets.installed,
        CredentialStore::new(&config.token_file),
        Box::new(InstalledFlow),
    );
    let youtube = match YoutubeClient::new(YoutubeConfig::default(), authenticator) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create upload client: {}", e);
            std::process::exit(1);
        }
    };

    let ledger = Ledger::new(&config.ledger_path);

    // Run the transfer
    let run = TransferRun::new(config, disk, Box::new(youtube), ledger);
    match run.run().await {
        Ok(stats) => {
            info!("Transfer complete: {}", stats);
        }
        Err(e) => {
            error!("Transfer run aborted: {}", e);
            std::process::exit(1);
        }
    }
}
