// Hexapod controller serial protocol
//
// Frames are length-prefixed: [length, frame_type, payload...]. The
// leading byte always equals the configured wire length for the frame
// class, so the receiver can split the byte stream without delimiters.

use thiserror::Error;

use crate::config::{JOINTS_PER_LEG, LEG_COUNT};
use crate::servo::angle::QuantizedAngle;

/// Wire command classes. The discriminant is the frame-type byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    AllServo = 0,
    OneLeg = 1,
    OneServo = 2,
    ReadAdc = 3,
    Other = 4,
}

/// Action selector carried in every servo frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoOpCode {
    Start = 1,
    Stop = 2,
    Set = 3,
}

/// Placeholder angle carried by STOP frames. The fixed frame shape
/// requires angle bytes even when the firmware ignores them.
pub const STOP_SENTINEL: QuantizedAngle = QuantizedAngle {
    integer: 10,
    fraction: 10,
};

/// Per-class wire lengths.
///
/// Two firmware revisions disagree on the ONE_LEG length (8 vs 14), so
/// the table is explicit and the consumer selects a revision instead of
/// the builder guessing. `Default` is [`FrameLengths::REV_B`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLengths {
    pub all_servo: u8,
    pub one_leg: u8,
    pub one_servo: u8,
    pub read_adc: u8,
}

impl FrameLengths {
    /// Current controller firmware: ONE_LEG frames are 14 bytes.
    // TODO: READ_ADC length once the firmware defines its reply format
    pub const REV_B: Self = Self {
        all_servo: 37,
        one_leg: 14,
        one_servo: 6,
        read_adc: 0,
    };

    /// Early firmware revision that framed ONE_LEG commands in 8 bytes.
    pub const REV_A: Self = Self {
        all_servo: 37,
        one_leg: 8,
        one_servo: 6,
        read_adc: 0,
    };

    pub const fn of(&self, frame_type: FrameType) -> u8 {
        match frame_type {
            FrameType::AllServo => self.all_servo,
            FrameType::OneLeg => self.one_leg,
            FrameType::OneServo => self.one_servo,
            FrameType::ReadAdc => self.read_adc,
            FrameType::Other => 0,
        }
    }
}

impl Default for FrameLengths {
    fn default() -> Self {
        Self::REV_B
    }
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("leg id {0} outside 1..={LEG_COUNT}")]
    InvalidLeg(u8),

    #[error("joint index {0} outside 1..={JOINTS_PER_LEG}")]
    InvalidJoint(u8),
}

/// Single-byte servo address: `leg_id * 10 + joint_index`.
///
/// Collapses the (leg, joint) hierarchy into one byte the firmware can
/// route without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServoAddress(u8);

impl ServoAddress {
    pub fn new(leg: u8, joint: u8) -> Result<Self, AddressError> {
        if leg < 1 || leg > LEG_COUNT {
            return Err(AddressError::InvalidLeg(leg));
        }
        if joint < 1 || joint > JOINTS_PER_LEG {
            return Err(AddressError::InvalidJoint(joint));
        }
        Ok(Self(leg * 10 + joint))
    }

    pub const fn as_byte(self) -> u8 {
        self.0
    }

    pub const fn leg(self) -> u8 {
        self.0 / 10
    }

    pub const fn joint(self) -> u8 {
        self.0 % 10
    }
}

/// Build a ONE_SERVO frame: always 6 bytes,
/// `[6, 2, address, op, integer, fraction]`.
pub fn one_servo_frame(
    address: ServoAddress,
    op: ServoOpCode,
    angle: QuantizedAngle,
    lengths: &FrameLengths,
) -> Vec<u8> {
    vec![
        lengths.of(FrameType::OneServo),
        FrameType::OneServo as u8,
        address.as_byte(),
        op as u8,
        angle.integer,
        angle.fraction,
    ]
}

/// Build a ONE_LEG frame addressing the three joints of `leg` in joint
/// order 1..3, one `[address, op, integer, fraction]` quadruple each.
pub fn one_leg_frame(
    leg: u8,
    ops: [ServoOpCode; 3],
    angles: [QuantizedAngle; 3],
    lengths: &FrameLengths,
) -> Result<Vec<u8>, AddressError> {
    let mut frame = Vec::with_capacity(2 + 4 * angles.len());
    frame.push(lengths.of(FrameType::OneLeg));
    frame.push(FrameType::OneLeg as u8);

    for (i, (op, angle)) in ops.into_iter().zip(angles).enumerate() {
        let address = ServoAddress::new(leg, i as u8 + 1)?;
        frame.extend_from_slice(&[address.as_byte(), op as u8, angle.integer, angle.fraction]);
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle(integer: u8, fraction: u8) -> QuantizedAngle {
        QuantizedAngle { integer, fraction }
    }

    #[test]
    fn one_servo_frame_is_six_bytes_with_length_prefix() {
        let address = ServoAddress::new(3, 2).unwrap();
        let frame = one_servo_frame(
            address,
            ServoOpCode::Start,
            angle(90, 50),
            &FrameLengths::default(),
        );
        assert_eq!(frame, vec![6, FrameType::OneServo as u8, 32, 1, 90, 50]);
    }

    #[test]
    fn stop_frame_carries_the_sentinel_angle() {
        let address = ServoAddress::new(1, 1).unwrap();
        let frame = one_servo_frame(
            address,
            ServoOpCode::Stop,
            STOP_SENTINEL,
            &FrameLengths::default(),
        );
        assert_eq!(&frame[4..], &[10, 10]);
    }

    #[test]
    fn leg_frame_addresses_joints_in_order() {
        let frame = one_leg_frame(
            2,
            [ServoOpCode::Set; 3],
            [angle(10, 0), angle(20, 25), angle(30, 99)],
            &FrameLengths::default(),
        )
        .unwrap();

        assert_eq!(frame[0], 14);
        assert_eq!(frame[1], FrameType::OneLeg as u8);
        assert_eq!([frame[2], frame[6], frame[10]], [21, 22, 23]);
        assert_eq!(&frame[2..6], &[21, 3, 10, 0]);
        assert_eq!(&frame[6..10], &[22, 3, 20, 25]);
        assert_eq!(&frame[10..14], &[23, 3, 30, 99]);
    }

    #[test]
    fn leg_frame_length_byte_follows_the_selected_revision() {
        let ops = [ServoOpCode::Stop; 3];
        let angles = [STOP_SENTINEL; 3];

        let rev_b = one_leg_frame(1, ops, angles, &FrameLengths::REV_B).unwrap();
        assert_eq!(rev_b[0], 14);

        let rev_a = one_leg_frame(1, ops, angles, &FrameLengths::REV_A).unwrap();
        assert_eq!(rev_a[0], 8);
    }

    #[test]
    fn address_is_leg_times_ten_plus_joint() {
        let address = ServoAddress::new(6, 3).unwrap();
        assert_eq!(address.as_byte(), 63);
        assert_eq!(address.leg(), 6);
        assert_eq!(address.joint(), 3);
    }

    #[test]
    fn address_rejects_out_of_range_leg_or_joint() {
        assert!(matches!(
            ServoAddress::new(0, 1),
            Err(AddressError::InvalidLeg(0))
        ));
        assert!(matches!(
            ServoAddress::new(7, 1),
            Err(AddressError::InvalidLeg(7))
        ));
        assert!(matches!(
            ServoAddress::new(1, 0),
            Err(AddressError::InvalidJoint(0))
        ));
        assert!(matches!(
            ServoAddress::new(1, 4),
            Err(AddressError::InvalidJoint(4))
        ));
    }
}
