//
// main.rs
// XNAT-RTStruct-rs
//
// Tokio entry point: loads .env, installs the tracing subscriber and hands off to the CLI layer.
//

use tracing_subscriber::EnvFilter;
use xnat_rtstruct::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xnat_rtstruct=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run().await
}
