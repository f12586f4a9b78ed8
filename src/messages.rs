// Status types exposed to the control panel

use serde::{Deserialize, Serialize};

/// Whether the serial channel is currently open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Per-servo view for the UI: wire address and whether the servo has
/// been started and not yet stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServoStatus {
    pub address: u8,
    pub active: bool,
}

/// Snapshot of the controller for display and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerReport {
    pub connection: ConnectionState,
    pub servos: Vec<ServoStatus>,
    /// Most recent frame written to the device.
    pub last_frame: Option<Vec<u8>>,
}
