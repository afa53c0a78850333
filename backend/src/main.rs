//! RSVP service entry point.
//!
//! Sequencing: tracing first, then configuration (fatal when incomplete),
//! then the server runner, which reconciles the schema before serving.

use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use rsvp_backend::server::{run, AppConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    run(config).await
}
