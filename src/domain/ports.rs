//! Domain Ports - Core types and trait definitions for the eject tool
//!
//! These types describe the autoloader as the rest of the crate sees it:
//! where tapes are, what a request to the web interface looks like, and
//! the transport boundary the device client talks through.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Locations
// =============================================================================

/// Number of storage slots in the autoloader magazines
pub const STORAGE_SLOTS: u8 = 16;

/// Move endpoint code for the tape drive
pub const DRIVE_CODE: u8 = 17;
/// Move endpoint code for the mailslot (the only eject target)
pub const MAILSLOT_CODE: u8 = 18;
/// Move endpoint code for the picker arm
pub const PICKER_CODE: u8 = 19;

/// Label the web interface uses for a location without a tape
pub const EMPTY_LABEL: &str = "Empty";

/// A place inside the autoloader that can hold exactly one tape
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    /// Numbered storage slot, 1..=16
    Slot(u8),
    Drive,
    Picker,
    Mailslot,
}

impl Location {
    /// Storage slot by number, `None` outside 1..=16
    pub fn slot(number: u8) -> Option<Self> {
        (1..=STORAGE_SLOTS)
            .contains(&number)
            .then_some(Location::Slot(number))
    }

    /// Element code the move endpoint expects for this location
    pub fn device_code(&self) -> u8 {
        match self {
            Location::Slot(n) => *n,
            Location::Drive => DRIVE_CODE,
            Location::Mailslot => MAILSLOT_CODE,
            Location::Picker => PICKER_CODE,
        }
    }

    /// Whether a tape here keeps the robot from moving another one
    pub fn blocks_eject(&self) -> bool {
        matches!(self, Location::Mailslot | Location::Picker)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Slot(n) => write!(f, "{}", n),
            Location::Drive => write!(f, "drive"),
            Location::Picker => write!(f, "picker"),
            Location::Mailslot => write!(f, "mailslot"),
        }
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Tape positions as last reported by the autoloader
///
/// Maps tape label to location. Empty locations are never stored, and a
/// location holds at most one tape: inserting a tape into an occupied
/// location evicts the previous occupant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    tapes: BTreeMap<String, Location>,
}

impl Inventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `tape` at `location`, last write wins
    pub fn insert(&mut self, tape: impl Into<String>, location: Location) {
        self.tapes.retain(|_, occupied| *occupied != location);
        self.tapes.insert(tape.into(), location);
    }

    /// Where `tape` currently is
    pub fn location_of(&self, tape: &str) -> Option<Location> {
        self.tapes.get(tape).copied()
    }

    /// Which tape occupies `location`
    pub fn occupant(&self, location: Location) -> Option<&str> {
        self.tapes
            .iter()
            .find(|(_, occupied)| **occupied == location)
            .map(|(tape, _)| tape.as_str())
    }

    pub fn contains(&self, tape: &str) -> bool {
        self.tapes.contains_key(tape)
    }

    pub fn len(&self) -> usize {
        self.tapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tapes.is_empty()
    }

    /// Iterate tapes in label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Location)> {
        self.tapes.iter().map(|(tape, location)| (tape.as_str(), *location))
    }
}

impl<S: Into<String>> FromIterator<(S, Location)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (S, Location)>>(iter: I) -> Self {
        let mut inventory = Inventory::new();
        for (tape, location) in iter {
            inventory.insert(tape, location);
        }
        inventory
    }
}

// =============================================================================
// Device Requests
// =============================================================================

/// Paths of the pages the tool uses on the autoloader web interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoints {
    /// Page listing every slot with its tape (the inventory)
    pub status_page: String,
    /// Form target that moves a tape between two elements
    pub move_endpoint: String,
    /// Side-effect free page used to probe credentials
    pub credentials_page: String,
}

impl Default for DeviceEndpoints {
    fn default() -> Self {
        Self {
            status_page: "commands.html".to_string(),
            move_endpoint: "move.cgi".to_string(),
            credentials_page: "index.html".to_string(),
        }
    }
}

/// HTTP method of a device request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

/// A single request to the autoloader web interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub method: RequestMethod,
    /// Path relative to the device root, without leading slash
    pub path: String,
    /// Form-encoded body fields (POST only)
    pub form: Vec<(String, String)>,
    /// Whether the transport enforces the request interval before sending
    pub paced: bool,
}

impl DeviceRequest {
    /// Paced GET of a page
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: RequestMethod::Get,
            path: path.into(),
            form: Vec::new(),
            paced: true,
        }
    }

    /// Move the tape at element `source_code` into the mailslot
    pub fn move_to_mailslot(path: impl Into<String>, source_code: u8) -> Self {
        Self {
            method: RequestMethod::Post,
            path: path.into(),
            form: vec![
                ("from".to_string(), source_code.to_string()),
                ("to".to_string(), MAILSLOT_CODE.to_string()),
                ("submit".to_string(), "submit".to_string()),
            ],
            paced: true,
        }
    }

    /// Skip the request interval for this request
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Look up a form field
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// Device Transport Port
// =============================================================================

/// Port for sending requests to the autoloader
///
/// Implementations classify failures into the transport error kinds
/// (`NotFound`, `Unauthorized`, `HttpStatus`, `Network`) and leave their
/// interpretation to the caller.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Send a request and return the (size-capped) response body
    async fn send(&self, request: &DeviceRequest) -> Result<String>;
}

pub type DeviceTransportRef = Arc<dyn DeviceTransport>;
