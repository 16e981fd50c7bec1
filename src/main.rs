use anyhow::{Context, Result};
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    voicebook::init_logger();
    info!("Starting voicebook {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = voicebook::run().await {
        error!("Server stopped: {:#}", e);
        return Err(e).context("voicebook failed");
    }

    Ok(())
}
