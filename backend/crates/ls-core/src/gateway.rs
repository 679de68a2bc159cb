use crate::{
    GatewayError, GatewayResult, LocalServerManager, PairingCodeGenerator, PairingImage,
    RenderOptions, ServiceStatus, StartOptions, Subscription,
};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::Location;

use error_location::ErrorLocation;
use log::{debug, info, warn};
use ls_config::GatewayConfig;

/// Operations a UI surface can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Start,
    Stop,
    GetStatus,
    Subscribe,
    MakePairingImage,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Start,
        Self::Stop,
        Self::GetStatus,
        Self::Subscribe,
        Self::MakePairingImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::GetStatus => "getStatus",
            Self::Subscribe => "subscribe",
            Self::MakePairingImage => "makePairingImage",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SurfaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `(surface, operation)` pairs a gateway permits. Anything absent is denied.
#[derive(Debug, Clone, Default)]
pub struct CapabilityAllowList {
    grants: BTreeMap<SurfaceId, BTreeSet<Operation>>,
}

impl CapabilityAllowList {
    /// Build from `[gateway.allow]`. Unknown operation names are rejected.
    #[track_caller]
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let location = Location::caller();
        let mut allow_list = Self::default();

        for (surface, names) in &config.allow {
            for name in names {
                let operation =
                    Operation::from_name(name).ok_or_else(|| GatewayError::InvalidAllowList {
                        surface: surface.clone(),
                        operation: name.clone(),
                        location: ErrorLocation::from(location),
                    })?;
                allow_list.grant(SurfaceId::new(surface.as_str()), operation);
            }
        }

        Ok(allow_list)
    }

    pub fn grant(&mut self, surface: SurfaceId, operation: Operation) -> &mut Self {
        self.grants.entry(surface).or_default().insert(operation);
        self
    }

    pub fn permits(&self, surface: &SurfaceId, operation: Operation) -> bool {
        self.grants
            .get(surface)
            .is_some_and(|operations| operations.contains(&operation))
    }
}

/// The only path from UI surfaces to the local server subsystem.
///
/// Every call is checked against the allow-list before anything else runs.
#[derive(Clone)]
pub struct ControlSurfaceGateway {
    manager: LocalServerManager,
    pairing: PairingCodeGenerator,
    allow_list: CapabilityAllowList,
}

impl ControlSurfaceGateway {
    pub fn new(
        manager: LocalServerManager,
        pairing: PairingCodeGenerator,
        allow_list: CapabilityAllowList,
    ) -> Self {
        Self {
            manager,
            pairing,
            allow_list,
        }
    }

    #[track_caller]
    fn authorize(&self, surface: &SurfaceId, operation: Operation) -> GatewayResult<()> {
        if self.allow_list.permits(surface, operation) {
            return Ok(());
        }

        warn!("Denied '{operation}' for surface '{surface}'");
        Err(GatewayError::Unauthorized {
            surface: surface.to_string(),
            operation,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    pub async fn start(
        &self,
        surface: &SurfaceId,
        options: Option<StartOptions>,
    ) -> GatewayResult<ServiceStatus> {
        self.authorize(surface, Operation::Start)?;

        let options = options.unwrap_or_default();
        options.validate(self.manager.server_config())?;

        info!("Surface '{surface}' requested start");
        Ok(self.manager.start(options).await?)
    }

    pub async fn stop(&self, surface: &SurfaceId) -> GatewayResult<()> {
        self.authorize(surface, Operation::Stop)?;

        info!("Surface '{surface}' requested stop");
        Ok(self.manager.stop().await?)
    }

    pub fn get_status(&self, surface: &SurfaceId) -> GatewayResult<ServiceStatus> {
        self.authorize(surface, Operation::GetStatus)?;
        Ok(self.manager.get_status())
    }

    /// The callback receives the current status before this returns.
    pub fn subscribe<F>(&self, surface: &SurfaceId, callback: F) -> GatewayResult<Subscription>
    where
        F: Fn(&ServiceStatus) + Send + Sync + 'static,
    {
        self.authorize(surface, Operation::Subscribe)?;

        let subscription = self.manager.subscribe(callback);
        debug!(
            "Surface '{surface}' subscribed as {} ({} live)",
            subscription.id(),
            self.manager.status_channel().subscriber_count()
        );
        Ok(subscription)
    }

    /// Idempotent; covered by the `subscribe` grant.
    pub fn unsubscribe(
        &self,
        surface: &SurfaceId,
        subscription: &Subscription,
    ) -> GatewayResult<()> {
        self.authorize(surface, Operation::Subscribe)?;

        subscription.unsubscribe();
        debug!(
            "Surface '{surface}' released {} ({} live)",
            subscription.id(),
            self.manager.status_channel().subscriber_count()
        );
        Ok(())
    }

    pub fn make_pairing_image(
        &self,
        surface: &SurfaceId,
        text: Option<&str>,
        options: Option<RenderOptions>,
    ) -> GatewayResult<PairingImage> {
        self.authorize(surface, Operation::MakePairingImage)?;

        let options = options.unwrap_or_default();
        Ok(self.pairing.generate(text, &options)?)
    }

    /// Pairing image for the running service's address.
    pub fn pairing_image_for_current_address(
        &self,
        surface: &SurfaceId,
        options: Option<RenderOptions>,
    ) -> GatewayResult<PairingImage> {
        self.authorize(surface, Operation::MakePairingImage)?;

        let status = self.manager.get_status();
        let Some(address) = status.address() else {
            return Err(GatewayError::ServiceNotRunning {
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let options = options.unwrap_or_default();
        Ok(self.pairing.generate(Some(address), &options)?)
    }
}
