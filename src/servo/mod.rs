// Servo command layer for the hexapod controller
//
// Provides:
// - Fixed-point angle quantization and validation
// - Frame assembly for the wire command classes
// - High-level per-servo / per-leg driver API

pub mod angle;
mod driver;
pub mod protocol;

pub use angle::{quantize, AngleError, QuantizedAngle};
pub use driver::{CommandOutcome, DriverError, ServoController};
pub use protocol::{
    one_leg_frame, one_servo_frame, AddressError, FrameLengths, FrameType, ServoAddress,
    ServoOpCode, STOP_SENTINEL,
};
