use crate::HttpServiceLauncher;
use crate::error::{Result as ServerErrorResult, ServerError};

use ls_config::{Config, GatewayConfig};
use ls_core::{
    CapabilityAllowList, ControlSurfaceGateway, LocalServerManager, PairingCodeGenerator,
    ServiceState, ServiceStatus, StartOptions, SurfaceId,
};

use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use error_location::ErrorLocation;
use log::{error, info};

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to bind (0 = OS-assigned), overrides [server] port
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind, overrides [server] host
    #[arg(long)]
    pub host: Option<String>,

    /// Name advertised to paired devices
    #[arg(long)]
    pub name: Option<String>,

    /// Write the pairing image (SVG) for the server address to this file
    #[arg(long)]
    pub pairing_out: Option<PathBuf>,
}

impl ServeArgs {
    pub fn start_options(&self) -> StartOptions {
        StartOptions {
            port: self.port,
            host: self.host.clone(),
            advertised_name: self.name.clone(),
        }
    }
}

/// Build the gateway over a real HTTP launcher.
pub fn build_gateway(config: &Config) -> ServerErrorResult<ControlSurfaceGateway> {
    let launcher = HttpServiceLauncher::new()?;
    let manager = LocalServerManager::new(
        Arc::new(launcher),
        config.server.clone(),
        config.lifecycle.clone(),
    );
    let allow_list = CapabilityAllowList::from_config(&config.gateway)?;

    Ok(ControlSurfaceGateway::new(
        manager,
        PairingCodeGenerator::new(config.pairing.clone()),
        allow_list,
    ))
}

/// Start, publish the pairing image, wait for Ctrl+C, stop.
pub async fn run(config: &Config, args: ServeArgs) -> ServerErrorResult<()> {
    let gateway = build_gateway(config)?;
    let surface = SurfaceId::new(GatewayConfig::default_surface());

    let _subscription = gateway.subscribe(&surface, log_status)?;

    let status = gateway.start(&surface, Some(args.start_options())).await?;
    info!(
        "Local server running at {}",
        status.address().unwrap_or("<unknown>")
    );

    let image = gateway.pairing_image_for_current_address(&surface, None)?;
    match args.pairing_out {
        Some(ref path) => {
            std::fs::write(path, image.svg()).map_err(|e| ServerError::io(path, e))?;
            info!("Pairing image written to {}", path.display());
        }
        None => info!(
            "Pairing image ready ({} modules, {}px)",
            image.modules(),
            image.width()
        ),
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| ServerError::Signal {
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Received SIGINT (Ctrl+C), stopping local server");
    gateway.stop(&surface).await?;

    Ok(())
}

fn log_status(status: &ServiceStatus) {
    match status.state() {
        ServiceState::Error => error!(
            "Status: error ({})",
            status.error_message().unwrap_or("unknown")
        ),
        ServiceState::Running => info!(
            "Status: running at {}",
            status.address().unwrap_or("<unknown>")
        ),
        state if state.is_transitioning() => info!("Status: {state}..."),
        state => info!("Status: {state}"),
    }
}
