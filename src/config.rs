// Link timing, supported line rates, robot addressing limits
use std::time::Duration;

// Baud rates the controller firmware accepts, ascending
pub const AVAILABLE_BAUD_RATES: [u32; 2] = [9_600, 115_200];

// Bounded IO timeout for the serial link. serialport applies a single
// timeout to reads and writes, so this also bounds terminal-mode
// response reads instead of letting them block forever.
pub const SERIAL_TIMEOUT: Duration = Duration::from_millis(250);

// Target robot geometry
// Servo addresses on the wire are leg_id * 10 + joint_index, joints 1-based
pub const LEG_COUNT: u8 = 6;
pub const JOINTS_PER_LEG: u8 = 3;
