// Serial control core for a hexapod servo controller
//
// Frame-mode command assembly, the serial transport with its
// character-echo terminal mode, and the programme executor live here.
// A control panel consumes this crate through `ServoController`,
// `Transport`, and `Programme`.

pub mod config;
pub mod messages;
pub mod programme;
pub mod servo;
pub mod transport;
