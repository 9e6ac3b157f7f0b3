//! Sitewright - brief in, published site out
//!
//! Loads configuration and runs the HTTP server until interrupted.

use sitewright_core::config::{load_config, load_from_file, sample_config, AppConfig};
use std::path::PathBuf;

const USAGE: &str = "Usage: sitewright [--config <path>] [--port <port>] [--print-config]";

/// Command-line arguments
#[derive(Debug, Default, PartialEq)]
struct Args {
    /// Config file to load instead of the default lookup
    config: Option<PathBuf>,
    /// Overrides the configured listen port
    port: Option<u16>,
    /// Print a sample config and exit
    print_config: bool,
    help: bool,
}

impl Args {
    /// Parse command-line arguments
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut args = args.into_iter();
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--port" | "-p" => {
                    let port = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--port needs a value"))?;
                    parsed.port = Some(
                        port.parse()
                            .map_err(|_| anyhow::anyhow!("invalid port: {}", port))?,
                    );
                }
                "--print-config" => parsed.print_config = true,
                "--help" | "-h" => parsed.help = true,
                other => anyhow::bail!("unknown argument: {}\n{}", other, USAGE),
            }
        }

        Ok(parsed)
    }
}

fn resolve_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let config = load_from_file(path, &|key: &str| std::env::var(key).ok())?;
            config.validate()?;
            config
        }
        None => load_config()?,
    };
    if let Some(port) = args.port {
        config.service.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;

    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }
    if args.print_config {
        print!("{}", sample_config());
        return Ok(());
    }

    let config = resolve_config(&args)?;
    sitewright_server::run_server(config).await
}
