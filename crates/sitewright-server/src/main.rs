//! Sitewright Server Binary
//!
//! Standalone entry point - delegates to lib.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = sitewright_core::load_config()?;
    sitewright_server::run_server(config).await
}
