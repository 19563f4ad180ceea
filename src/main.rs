//! Wiz gateway daemon.
//!
//! Run with: wiz-gateway --config /etc/house/wiz.json

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;

use clap::Parser;
use log::{error, info, warn};
use wiz_gateway::push::{LISTEN_PORT, RESPOND_PORT};
use wiz_gateway::{CommandIssuer, Gateway, GatewayConfig, SystemInterfaces, Transport};

#[derive(Parser)]
#[command(name = "wiz-gateway")]
#[command(about = "Discover and control Wiz smart devices on the local network", long_about = None)]
struct Cli {
    /// Device configuration file
    #[arg(short, long, default_value = "/etc/house/wiz.json")]
    config: PathBuf,

    /// UDP port the gateway listens on for device reports
    #[arg(long, default_value_t = LISTEN_PORT)]
    listen_port: u16,

    /// UDP port devices accept commands on
    #[arg(long, default_value_t = RESPOND_PORT)]
    device_port: u16,

    /// Do not write auto-discovered devices back to the configuration file
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
                format!("{app_name}=info").into()
            }),
        )
        .init();

    let cli = Cli::parse();

    let transport = match Transport::bind(cli.listen_port).await {
        Ok(transport) => transport,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut gateway =
        Gateway::with_issuer(SystemInterfaces, CommandIssuer::new(cli.device_port));
    match GatewayConfig::load(&cli.config) {
        Ok(config) => {
            if let Err(e) = gateway.reload(&config, "ON STARTUP", SystemTime::now()) {
                warn!("{e}");
            }
        }
        Err(e) => warn!("{e}"),
    }
    info!("managing {} devices", gateway.count());

    let save_path = (!cli.no_save).then_some(cli.config);
    transport
        .run(&mut gateway, |gateway| {
            if !gateway.changed() {
                return;
            }
            let Some(path) = &save_path else { return };
            match gateway.live_config().save(path) {
                Ok(()) => info!("saved device list to {}", path.display()),
                Err(e) => error!("{e}"),
            }
        })
        .await;

    ExitCode::SUCCESS
}
