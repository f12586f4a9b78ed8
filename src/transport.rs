// Serial transport for the hexapod controller
//
// Owns the connection lifecycle and the two exchange styles the
// firmware speaks: raw length-prefixed frames, and the terminal mode
// where commands go out one character at a time with an echo line read
// back between characters.

use std::io::{self, Read, Write};

use tracing::{debug, info, trace, warn};

use crate::config::SERIAL_TIMEOUT;
use crate::messages::ConnectionState;

/// Byte channel the transport runs over. `Box<dyn SerialPort>`
/// qualifies, as does any in-memory double used in tests.
pub trait SerialLink: Read + Write + Send {}

impl<T: Read + Write + Send> SerialLink for T {}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("timed out waiting for a response line")]
    Timeout,

    #[error("no connection open")]
    NotConnected,

    #[error("a connection is already open")]
    AlreadyConnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// What happened to a write request. Writing while disconnected is not
/// an error (a stray command must never crash the caller) but it is
/// observable rather than silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Sent,
    NotConnected,
}

/// Terminal-mode send progresses through an explicit state machine.
/// The firmware echoes after every character and expects the next one
/// only once the echo has been drained, so the ordering is load-bearing:
/// writing the whole command in one burst breaks the exchange.
enum EchoStep {
    SendChar(usize),
    AwaitEcho(usize),
    Done,
}

/// Serial connection owner. At most one channel is open at a time;
/// the connection is a value held here, not process-global state, so a
/// test double can stand in for the port.
pub struct Transport {
    link: Option<Box<dyn SerialLink>>,
}

impl Transport {
    pub fn new() -> Self {
        Self { link: None }
    }

    /// Run the transport over an already-open link.
    pub fn over(link: Box<dyn SerialLink>) -> Self {
        Self { link: Some(link) }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn connection_state(&self) -> ConnectionState {
        if self.link.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    /// Open the serial channel. The bounded timeout keeps both a
    /// stalled write and a silent device from blocking indefinitely.
    pub fn connect(&mut self, port: &str, baud_rate: u32) -> Result<()> {
        if self.link.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let port_handle = serialport::new(port, baud_rate)
            .timeout(SERIAL_TIMEOUT)
            .open()?;

        info!("serial link open on {} at {} baud", port, baud_rate);
        self.link = Some(Box::new(port_handle));
        Ok(())
    }

    /// Close the channel. Calling this without an open connection is a
    /// caller bug and reported as such.
    pub fn disconnect(&mut self) -> Result<()> {
        match self.link.take() {
            Some(_) => {
                info!("serial link closed");
                Ok(())
            }
            None => Err(TransportError::NotConnected),
        }
    }

    /// Write a raw frame verbatim. Returns
    /// [`WriteOutcome::NotConnected`] without touching the device when
    /// no connection is open.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<WriteOutcome> {
        let Some(link) = self.link.as_mut() else {
            warn!("dropping {}-byte frame: no connection open", frame.len());
            return Ok(WriteOutcome::NotConnected);
        };

        link.write_all(frame)?;
        link.flush()?;
        debug!("wrote frame {:02X?}", frame);
        Ok(WriteOutcome::Sent)
    }

    /// Send a terminal-mode command one character at a time, reading
    /// back and discarding one echo line after every character except
    /// the last.
    pub fn send_terminal_command(&mut self, command: &str) -> Result<WriteOutcome> {
        let Some(link) = self.link.as_mut() else {
            warn!("dropping terminal command {:?}: no connection open", command);
            return Ok(WriteOutcome::NotConnected);
        };

        let bytes = command.as_bytes();
        let mut step = if bytes.is_empty() {
            EchoStep::Done
        } else {
            EchoStep::SendChar(0)
        };

        loop {
            step = match step {
                EchoStep::SendChar(i) => {
                    link.write_all(&bytes[i..=i])?;
                    link.flush()?;
                    if i + 1 < bytes.len() {
                        EchoStep::AwaitEcho(i)
                    } else {
                        EchoStep::Done
                    }
                }
                EchoStep::AwaitEcho(i) => {
                    let echo = read_line_from(link.as_mut())?;
                    trace!("echo after byte {}: {:02X?}", i, echo);
                    EchoStep::SendChar(i + 1)
                }
                EchoStep::Done => break,
            };
        }

        debug!("sent terminal command {:?}", command);
        Ok(WriteOutcome::Sent)
    }

    /// Read one newline-terminated line from the device, newline
    /// included. `None` when no connection is open.
    pub fn read_terminal_line(&mut self) -> Result<Option<Vec<u8>>> {
        match self.link.as_mut() {
            Some(link) => read_line_from(link.as_mut()).map(Some),
            None => Ok(None),
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

fn read_line_from(link: &mut dyn SerialLink) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match link.read(&mut byte) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    return Ok(line);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(TransportError::Timeout),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
