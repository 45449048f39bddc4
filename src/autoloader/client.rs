//! Autoloader Device Client
//!
//! Combines the paced transport and the status page parser into the three
//! operations the eject workflow needs: probe credentials, refresh the
//! inventory and move one tape into the mailslot.

use crate::autoloader::parser::parse_inventory;
use crate::domain::ports::{DeviceEndpoints, DeviceRequest, DeviceTransportRef, Inventory, Location};
use crate::error::{Error, ErrorAction, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

// =============================================================================
// Eject Policy
// =============================================================================

/// Wait after the autoloader rejected or ignored a move
pub const DEFAULT_BUSY_BACKOFF: Duration = Duration::from_secs(15);

/// Retry behaviour of a single eject
#[derive(Debug, Clone)]
pub struct EjectPolicy {
    /// Sleep between two move attempts; longer than the request interval
    pub busy_backoff: Duration,
    /// Give up after this many move attempts (`None` retries forever)
    pub max_attempts: Option<u32>,
}

impl Default for EjectPolicy {
    fn default() -> Self {
        Self {
            busy_backoff: DEFAULT_BUSY_BACKOFF,
            max_attempts: None,
        }
    }
}

// =============================================================================
// Device Client
// =============================================================================

/// Client for one autoloader
pub struct DeviceClient {
    transport: DeviceTransportRef,
    endpoints: DeviceEndpoints,
    policy: EjectPolicy,
    /// Last reported tape positions
    inventory: Inventory,
}

impl DeviceClient {
    /// Create a new client; the inventory stays empty until the first refresh
    pub fn new(transport: DeviceTransportRef, endpoints: DeviceEndpoints, policy: EjectPolicy) -> Self {
        Self {
            transport,
            endpoints,
            policy,
            inventory: Inventory::new(),
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Probe the credentials with a request that changes nothing
    ///
    /// Not paced: this is the first request of a run.
    pub async fn verify_credentials(&self) -> Result<()> {
        let request = DeviceRequest::get(self.endpoints.credentials_page.as_str()).unpaced();

        match self.transport.send(&request).await {
            Ok(_) => {
                debug!("Credentials accepted");
                Ok(())
            }
            Err(Error::Unauthorized { url }) => Err(Error::CredentialsRejected { url }),
            Err(e) => Err(e),
        }
    }

    /// Fetch the status page and replace the inventory with it
    pub async fn refresh_inventory(&mut self) -> Result<()> {
        let request = DeviceRequest::get(self.endpoints.status_page.as_str());
        let html = self.transport.send(&request).await?;
        self.replace_inventory(&html)
    }

    fn replace_inventory(&mut self, html: &str) -> Result<()> {
        self.inventory = parse_inventory(html)?;
        debug!("Inventory: {:?}", self.inventory);
        Ok(())
    }

    /// Move `tape` into the mailslot, retrying until the autoloader reports
    /// it there
    pub async fn eject(&mut self, tape: &str) -> Result<()> {
        let source = self
            .inventory
            .location_of(tape)
            .ok_or_else(|| Error::TapeNotInInventory {
                tape: tape.to_string(),
            })?;
        if source == Location::Mailslot {
            info!("{} already in mailslot", tape);
            return Ok(());
        }

        // Built once: a rejected move leaves the tape where it was
        let request = DeviceRequest::move_to_mailslot(
            self.endpoints.move_endpoint.as_str(),
            source.device_code(),
        );
        let backoff = self.policy.busy_backoff;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            debug!("Moving {} from {} (attempt {})", tape, source, attempts);

            match self.transport.send(&request).await {
                Err(e) if e.action() == ErrorAction::RetryAfterBackoff => {
                    warn!(
                        "Autoloader rejected moving {} from {} (busy, drive locked or rate limited). Retrying in {:?}.",
                        tape, source, backoff
                    );
                }
                Err(e) => return Err(e),
                Ok(html) => {
                    // The move response is a fresh status page
                    self.replace_inventory(&html)?;
                    match self.inventory.location_of(tape) {
                        None | Some(Location::Mailslot) => {
                            info!("Ejected {} from {}", tape, source);
                            return Ok(());
                        }
                        Some(Location::Drive) => warn!(
                            "{} is still in the drive, drive is probably locked. Retrying in {:?}.",
                            tape, backoff
                        ),
                        Some(location) => warn!(
                            "{} did not move, still in {}. Retrying in {:?}.",
                            tape, location, backoff
                        ),
                    }
                }
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return Err(Error::EjectAttemptsExhausted {
                        tape: tape.to_string(),
                        attempts,
                    });
                }
            }
            tokio::time::sleep(backoff).await;
        }
    }
}
