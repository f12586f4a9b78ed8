// High-level servo controller
//
// Combines the angle codec, frame builders, and transport into the API
// the control panel drives: start/stop/set per servo or per leg, with
// active-flag tracking and last-frame capture for display.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::{JOINTS_PER_LEG, LEG_COUNT};
use crate::messages::{ControllerReport, ServoStatus};
use crate::servo::angle::{self, AngleError, QuantizedAngle};
use crate::servo::protocol::{
    self, AddressError, FrameLengths, ServoAddress, ServoOpCode, STOP_SENTINEL,
};
use crate::transport::{Transport, TransportError, WriteOutcome};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Angle(#[from] AngleError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// What happened to a servo command. `ServoInactive` means a SET was
/// requested for a servo that has not been started; nothing was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Sent,
    NotConnected,
    ServoInactive,
}

/// Owns the transport and the per-servo state of the whole robot.
pub struct ServoController {
    transport: Transport,
    lengths: FrameLengths,
    active: BTreeMap<u8, bool>,
    last_frame: Option<Vec<u8>>,
}

impl ServoController {
    pub fn new(transport: Transport) -> Self {
        Self::with_frame_lengths(transport, FrameLengths::default())
    }

    /// Create with an explicit frame-length revision (see
    /// [`FrameLengths::REV_A`] / [`FrameLengths::REV_B`]).
    pub fn with_frame_lengths(transport: Transport, lengths: FrameLengths) -> Self {
        let mut active = BTreeMap::new();
        for leg in 1..=LEG_COUNT {
            for joint in 1..=JOINTS_PER_LEG {
                active.insert(leg * 10 + joint, false);
            }
        }
        Self {
            transport,
            lengths,
            active,
            last_frame: None,
        }
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn into_transport(self) -> Transport {
        self.transport
    }

    /// Enable one servo and command its initial angle.
    pub fn start_servo(
        &mut self,
        leg: u8,
        joint: u8,
        angle_text: &str,
    ) -> Result<CommandOutcome, DriverError> {
        let address = ServoAddress::new(leg, joint)?;
        let angle = angle::quantize(angle_text)?;
        let frame = protocol::one_servo_frame(address, ServoOpCode::Start, angle, &self.lengths);

        match self.write(frame)? {
            WriteOutcome::Sent => {
                info!("servo {} started at {:.2} degrees", address.as_byte(), angle.degrees());
                self.active.insert(address.as_byte(), true);
                Ok(CommandOutcome::Sent)
            }
            WriteOutcome::NotConnected => Ok(CommandOutcome::NotConnected),
        }
    }

    /// Disable one servo. The frame carries the sentinel angle pair;
    /// the firmware ignores the angle fields on STOP.
    pub fn stop_servo(&mut self, leg: u8, joint: u8) -> Result<CommandOutcome, DriverError> {
        let address = ServoAddress::new(leg, joint)?;
        let frame =
            protocol::one_servo_frame(address, ServoOpCode::Stop, STOP_SENTINEL, &self.lengths);

        match self.write(frame)? {
            WriteOutcome::Sent => {
                info!("servo {} stopped", address.as_byte());
                self.active.insert(address.as_byte(), false);
                Ok(CommandOutcome::Sent)
            }
            WriteOutcome::NotConnected => Ok(CommandOutcome::NotConnected),
        }
    }

    /// Command a new angle for an already-started servo. Skipped, with
    /// nothing written, while the servo is inactive.
    pub fn set_angle(
        &mut self,
        leg: u8,
        joint: u8,
        angle_text: &str,
    ) -> Result<CommandOutcome, DriverError> {
        let address = ServoAddress::new(leg, joint)?;
        if !self.is_active(address) {
            debug!("servo {} inactive, SET skipped", address.as_byte());
            return Ok(CommandOutcome::ServoInactive);
        }

        let angle = angle::quantize(angle_text)?;
        let frame = protocol::one_servo_frame(address, ServoOpCode::Set, angle, &self.lengths);

        match self.write(frame)? {
            WriteOutcome::Sent => Ok(CommandOutcome::Sent),
            WriteOutcome::NotConnected => Ok(CommandOutcome::NotConnected),
        }
    }

    /// Enable all three joints of a leg with one frame.
    pub fn start_leg(
        &mut self,
        leg: u8,
        angle_texts: [&str; 3],
    ) -> Result<CommandOutcome, DriverError> {
        let angles = Self::quantize_all(angle_texts)?;
        let frame =
            protocol::one_leg_frame(leg, [ServoOpCode::Start; 3], angles, &self.lengths)?;

        match self.write(frame)? {
            WriteOutcome::Sent => {
                info!("leg {} started", leg);
                self.mark_leg(leg, true);
                Ok(CommandOutcome::Sent)
            }
            WriteOutcome::NotConnected => Ok(CommandOutcome::NotConnected),
        }
    }

    /// Command new angles for a fully started leg. Skipped unless all
    /// three joints are active.
    pub fn set_leg(
        &mut self,
        leg: u8,
        angle_texts: [&str; 3],
    ) -> Result<CommandOutcome, DriverError> {
        for joint in 1..=JOINTS_PER_LEG {
            if !self.is_active(ServoAddress::new(leg, joint)?) {
                debug!("leg {} has inactive joints, SET skipped", leg);
                return Ok(CommandOutcome::ServoInactive);
            }
        }

        let angles = Self::quantize_all(angle_texts)?;
        let frame = protocol::one_leg_frame(leg, [ServoOpCode::Set; 3], angles, &self.lengths)?;

        match self.write(frame)? {
            WriteOutcome::Sent => Ok(CommandOutcome::Sent),
            WriteOutcome::NotConnected => Ok(CommandOutcome::NotConnected),
        }
    }

    /// Disable all three joints of a leg with one frame.
    pub fn stop_leg(&mut self, leg: u8) -> Result<CommandOutcome, DriverError> {
        let frame = protocol::one_leg_frame(
            leg,
            [ServoOpCode::Stop; 3],
            [STOP_SENTINEL; 3],
            &self.lengths,
        )?;

        match self.write(frame)? {
            WriteOutcome::Sent => {
                info!("leg {} stopped", leg);
                self.mark_leg(leg, false);
                Ok(CommandOutcome::Sent)
            }
            WriteOutcome::NotConnected => Ok(CommandOutcome::NotConnected),
        }
    }

    pub fn is_active(&self, address: ServoAddress) -> bool {
        self.active.get(&address.as_byte()).copied().unwrap_or(false)
    }

    pub fn last_frame(&self) -> Option<&[u8]> {
        self.last_frame.as_deref()
    }

    /// Snapshot for the UI: connection state, per-servo active flags,
    /// and the last frame written.
    pub fn report(&self) -> ControllerReport {
        ControllerReport {
            connection: self.transport.connection_state(),
            servos: self
                .active
                .iter()
                .map(|(&address, &active)| ServoStatus { address, active })
                .collect(),
            last_frame: self.last_frame.clone(),
        }
    }

    fn write(&mut self, frame: Vec<u8>) -> Result<WriteOutcome, TransportError> {
        let outcome = self.transport.write_frame(&frame)?;
        if outcome == WriteOutcome::Sent {
            self.last_frame = Some(frame);
        }
        Ok(outcome)
    }

    fn quantize_all(texts: [&str; 3]) -> Result<[QuantizedAngle; 3], AngleError> {
        Ok([
            angle::quantize(texts[0])?,
            angle::quantize(texts[1])?,
            angle::quantize(texts[2])?,
        ])
    }

    fn mark_leg(&mut self, leg: u8, active: bool) {
        for joint in 1..=JOINTS_PER_LEG {
            self.active.insert(leg * 10 + joint, active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ConnectionState;
    use crate::transport::test_link::{Script, ScriptedLink};
    use std::sync::{Arc, Mutex};

    fn controller() -> (ServoController, Arc<Mutex<Script>>) {
        let (link, script) = ScriptedLink::new(&[]);
        (ServoController::new(Transport::over(Box::new(link))), script)
    }

    #[test]
    fn start_marks_the_servo_active_and_records_the_frame() {
        let (mut ctl, script) = controller();

        let outcome = ctl.start_servo(1, 1, "90.5").unwrap();

        assert_eq!(outcome, CommandOutcome::Sent);
        assert!(ctl.is_active(ServoAddress::new(1, 1).unwrap()));
        assert_eq!(ctl.last_frame(), Some(&[6, 2, 11, 1, 90, 50][..]));
        assert_eq!(script.lock().unwrap().written_bytes(), vec![6, 2, 11, 1, 90, 50]);
    }

    #[test]
    fn stop_always_carries_the_sentinel_angle() {
        let (mut ctl, script) = controller();

        ctl.start_servo(2, 3, "123.45").unwrap();
        ctl.stop_servo(2, 3).unwrap();

        assert!(!ctl.is_active(ServoAddress::new(2, 3).unwrap()));
        let written = script.lock().unwrap().written_bytes();
        // Second frame: STOP with (10, 10) regardless of the last angle
        assert_eq!(&written[6..], &[6, 2, 23, 2, 10, 10]);
    }

    #[test]
    fn set_is_skipped_while_the_servo_is_inactive() {
        let (mut ctl, script) = controller();

        let outcome = ctl.set_angle(1, 2, "45.0").unwrap();

        assert_eq!(outcome, CommandOutcome::ServoInactive);
        assert!(script.lock().unwrap().written_bytes().is_empty());
    }

    #[test]
    fn set_sends_once_the_servo_is_started() {
        let (mut ctl, script) = controller();

        ctl.start_servo(1, 2, "10").unwrap();
        let outcome = ctl.set_angle(1, 2, "45.25").unwrap();

        assert_eq!(outcome, CommandOutcome::Sent);
        let written = script.lock().unwrap().written_bytes();
        assert_eq!(&written[6..], &[6, 2, 12, 3, 45, 25]);
    }

    #[test]
    fn start_leg_activates_all_three_joints() {
        let (mut ctl, script) = controller();

        let outcome = ctl.start_leg(4, ["10", "20.5", "30.75"]).unwrap();

        assert_eq!(outcome, CommandOutcome::Sent);
        for joint in 1..=3 {
            assert!(ctl.is_active(ServoAddress::new(4, joint).unwrap()));
        }
        let written = script.lock().unwrap().written_bytes();
        assert_eq!(
            written,
            vec![14, 1, 41, 1, 10, 0, 42, 1, 20, 50, 43, 1, 30, 75]
        );
    }

    #[test]
    fn set_leg_requires_every_joint_active() {
        let (mut ctl, script) = controller();

        ctl.start_servo(3, 1, "10").unwrap();
        ctl.start_servo(3, 2, "10").unwrap();
        // joint 3 never started
        let outcome = ctl.set_leg(3, ["1", "2", "3"]).unwrap();

        assert_eq!(outcome, CommandOutcome::ServoInactive);
        // Only the two start frames went out
        assert_eq!(script.lock().unwrap().written_bytes().len(), 12);
    }

    #[test]
    fn stop_leg_carries_sentinels_and_deactivates() {
        let (mut ctl, script) = controller();

        ctl.start_leg(2, ["10", "20", "30"]).unwrap();
        ctl.stop_leg(2).unwrap();

        for joint in 1..=3 {
            assert!(!ctl.is_active(ServoAddress::new(2, joint).unwrap()));
        }
        let written = script.lock().unwrap().written_bytes();
        assert_eq!(
            &written[14..],
            &[14, 1, 21, 2, 10, 10, 22, 2, 10, 10, 23, 2, 10, 10]
        );
    }

    #[test]
    fn commands_while_disconnected_are_dropped_and_leave_no_state() {
        let mut ctl = ServoController::new(Transport::new());

        let outcome = ctl.start_servo(1, 1, "90").unwrap();

        assert_eq!(outcome, CommandOutcome::NotConnected);
        assert!(!ctl.is_active(ServoAddress::new(1, 1).unwrap()));
        assert_eq!(ctl.last_frame(), None);
    }

    #[test]
    fn invalid_angles_never_produce_a_frame() {
        let (mut ctl, script) = controller();

        assert!(ctl.start_servo(1, 1, "300.5").is_err());
        assert!(ctl.start_servo(1, 1, "twelve").is_err());
        assert!(script.lock().unwrap().written_bytes().is_empty());
    }

    #[test]
    fn report_reflects_connection_and_active_flags() {
        let (mut ctl, _script) = controller();
        ctl.start_servo(5, 2, "1.5").unwrap();

        let report = ctl.report();

        assert_eq!(report.connection, ConnectionState::Open);
        assert_eq!(report.servos.len(), 18);
        assert!(
            report
                .servos
                .iter()
                .all(|s| s.active == (s.address == 52))
        );
        assert_eq!(report.last_frame, Some(vec![6, 2, 52, 1, 1, 50]));
    }

    #[test]
    fn frame_length_revision_is_selectable() {
        let (link, script) = ScriptedLink::new(&[]);
        let mut ctl = ServoController::with_frame_lengths(
            Transport::over(Box::new(link)),
            FrameLengths::REV_A,
        );

        ctl.stop_leg(1).unwrap();

        assert_eq!(script.lock().unwrap().written_bytes()[0], 8);
    }
}
