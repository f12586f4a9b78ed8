// Fixed-point angle codec
//
// The controller carries joint angles as two bytes: whole degrees and
// hundredths of a degree. Operator input arrives as free text, so the
// codec owns both parsing and range validation.

use thiserror::Error;

/// Wire representation of a joint angle: whole degrees (0-255) plus
/// hundredths of a degree (0-99).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizedAngle {
    pub integer: u8,
    pub fraction: u8,
}

impl QuantizedAngle {
    /// Reconstruct the angle in degrees.
    pub fn degrees(&self) -> f64 {
        f64::from(self.integer) + f64::from(self.fraction) / 100.0
    }
}

#[derive(Debug, Error)]
pub enum AngleError {
    #[error("{text:?} is not a decimal angle")]
    NotANumber { text: String },

    #[error("angle {value} is negative; the wire format is unsigned")]
    Negative { value: f64 },

    #[error("angle {value} does not fit the wire format (0.00 to 255.99 degrees)")]
    OutOfRange { value: f64 },
}

/// Quantize operator-entered angle text into the wire pair.
///
/// Line-ending characters are stripped before parsing, since entry
/// widgets and serial consoles tend to leave them attached. An angle
/// whose whole part exceeds 255 or whose hundredths exceed 99 is
/// rejected rather than clamped - an out-of-range angle must never
/// reach frame assembly.
pub fn quantize(text: &str) -> Result<QuantizedAngle, AngleError> {
    let cleaned: String = text.chars().filter(|c| *c != '\r' && *c != '\n').collect();

    let value: f64 = cleaned
        .trim()
        .parse()
        .map_err(|_| AngleError::NotANumber {
            text: text.to_string(),
        })?;
    if !value.is_finite() {
        return Err(AngleError::NotANumber {
            text: text.to_string(),
        });
    }
    if value < 0.0 {
        return Err(AngleError::Negative { value });
    }

    let integer = value.trunc();
    let fraction = ((value - integer) * 100.0).round();

    if integer > 255.0 || fraction > 99.0 {
        return Err(AngleError::OutOfRange { value });
    }

    Ok(QuantizedAngle {
        integer: integer as u8,
        fraction: fraction as u8,
    })
}
