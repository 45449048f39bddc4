//! Eject Orchestrator
//!
//! Drives a batch of tapes into the mailslot one at a time. The autoloader
//! has a single mailslot, so after every eject the orchestrator polls the
//! inventory until the operator has taken the tape out before moving the
//! next one.

use crate::autoloader::client::DeviceClient;
use crate::domain::ports::{Inventory, Location};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

// =============================================================================
// Eject Summary
// =============================================================================

/// Outcome of one orchestrated run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EjectSummary {
    /// Tapes moved into the mailslot, in eject order
    pub ejected: Vec<String>,
    /// Requested tapes the autoloader does not hold
    pub not_in_autoloader: Vec<String>,
    /// Requested tapes that were already in the mailslot
    pub already_in_mailslot: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs the multi-tape eject workflow against one autoloader
pub struct EjectOrchestrator {
    client: DeviceClient,
}

impl EjectOrchestrator {
    pub fn new(client: DeviceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DeviceClient {
        &self.client
    }

    /// Eject every requested tape the autoloader holds
    ///
    /// Tapes are ejected in label order. Any fatal error aborts the run;
    /// tapes ejected so far stay ejected and the rest can be retried by
    /// running again.
    pub async fn run(&mut self, requested: BTreeSet<String>) -> Result<EjectSummary> {
        let started_at = Utc::now();

        self.client.verify_credentials().await?;
        self.client.refresh_inventory().await?;

        let mut summary = EjectSummary {
            ejected: Vec::new(),
            not_in_autoloader: Vec::new(),
            already_in_mailslot: Vec::new(),
            started_at,
            finished_at: started_at,
        };

        let mut pending = BTreeSet::new();
        for tape in requested {
            match self.client.inventory().location_of(&tape) {
                None => {
                    info!("{} not in autoloader, skipping.", tape);
                    summary.not_in_autoloader.push(tape);
                }
                Some(Location::Mailslot) => {
                    info!("{} already in mailslot, skipping.", tape);
                    summary.already_in_mailslot.push(tape);
                }
                Some(_) => {
                    pending.insert(tape);
                }
            }
        }

        if pending.is_empty() {
            info!("No tapes to eject. Nothing to do.");
            summary.finished_at = Utc::now();
            return Ok(summary);
        }

        while !pending.is_empty() {
            if let Some((location, tape)) = blocking_tape(self.client.inventory()) {
                match location {
                    Location::Mailslot => info!(
                        "Waiting for {} to be removed from the mailslot.",
                        tape
                    ),
                    _ => info!("Waiting for {} to leave the {}.", tape, location),
                }
                self.client.refresh_inventory().await?;
                continue;
            }

            let Some(tape) = pending.pop_first() else {
                break;
            };
            info!("Ejecting {} ({} remaining after this one).", tape, pending.len());
            self.client.eject(&tape).await?;
            summary.ejected.push(tape);
        }

        info!("Ejected {} tape(s).", summary.ejected.len());
        summary.finished_at = Utc::now();
        Ok(summary)
    }
}

/// Tape occupying the mailslot or the picker; the mailslot is reported first
/// since clearing it needs the operator
fn blocking_tape(inventory: &Inventory) -> Option<(Location, &str)> {
    inventory
        .iter()
        .filter(|(_, location)| location.blocks_eject())
        .max_by_key(|(_, location)| *location == Location::Mailslot)
        .map(|(tape, location)| (location, tape))
}
