mod api;
mod error;
mod state;

use casper_signer_core::{
    error::CoreError,
    settings::{generate_approval_token, SignerSettings},
};
use log::{error, info};

use api::create_router;
use state::ApiState;

type AppError = CoreError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::init();
    // Print an unconditional startup line so users see the binary started
    // even when RUST_LOG is not set.
    println!(
        "casper_signer starting (pid {}), RUST_LOG={:?}",
        std::process::id(),
        std::env::var("RUST_LOG").ok()
    );

    let config_path = SignerSettings::config_path();
    let settings = SignerSettings::from_file(&config_path)?;
    settings.validate()?;
    info!(
        "Loaded {} account(s) from {}, keeping at most {} settled deploys",
        settings.accounts.len(),
        config_path,
        settings.max_settled_requests
    );

    let approval_token = match &settings.approval_token {
        Some(token) => token.trim().to_string(),
        None => {
            let token = generate_approval_token();
            println!("approval token for this run: {}", token);
            token
        }
    };
    let state = ApiState::from_settings(&settings, &approval_token)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    info!("Signer API listening on {}", settings.bind_address);
    if let Err(e) = axum::serve(listener, router).await {
        error!("Signer API failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
