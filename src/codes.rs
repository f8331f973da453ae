//! Request codes.
//!
//! A [`RequestCode`] is the short ASCII string that asks the server for one
//! response. Codes are immutable; route, camera and trace variants are new
//! codes derived from a base code.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::TracePoint;

/// Length of a bare request code such as `P0004`.
pub const CODE_PREFIX_LEN: usize = 5;

/// A request code failed validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidRequestCode {
    /// The code is empty.
    #[error("request code is empty")]
    Empty,
    /// The code contains a byte that cannot appear on the wire.
    #[error("request code contains invalid byte {byte:#04x}")]
    InvalidByte {
        /// Offending byte.
        byte: u8,
    },
    /// A camera directive is not one of the known commands.
    #[error("unknown camera directive {value:?}")]
    UnknownCameraCommand {
        /// Directive as given.
        value: String,
    },
}

/// An opaque request code such as `E1234`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestCode(String);

impl RequestCode {
    /// Validate and wrap a code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestCode`] if `code` is empty or contains a
    /// non-printable or non-ASCII byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use halflink::codes::RequestCode;
    ///
    /// let code = RequestCode::new("E1234").expect("valid code");
    /// assert_eq!(code.to_wire().as_ref(), b"E1234\r");
    /// assert!(RequestCode::new("E12\r").is_err());
    /// ```
    pub fn new(code: impl Into<String>) -> Result<Self, InvalidRequestCode> {
        let code = code.into();
        if code.is_empty() {
            return Err(InvalidRequestCode::Empty);
        }
        if let Some(&byte) = code.as_bytes().iter().find(|byte| !byte.is_ascii_graphic()) {
            return Err(InvalidRequestCode::InvalidByte { byte });
        }
        Ok(Self(code))
    }

    /// The code as text.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }

    /// Bytes written to the transport: the code followed by `\r`.
    #[must_use]
    pub fn to_wire(&self) -> Bytes {
        let mut wire = Vec::with_capacity(self.0.len() + 1);
        wire.extend_from_slice(self.0.as_bytes());
        wire.push(b'\r');
        Bytes::from(wire)
    }

    /// Leading [`CODE_PREFIX_LEN`] characters, without any suffix.
    #[must_use]
    pub fn prefix(&self) -> &str { self.0.get(..CODE_PREFIX_LEN).unwrap_or(&self.0) }

    /// Derive a new code by appending `suffix`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestCode`] if `suffix` contains invalid bytes.
    pub fn with_suffix(&self, suffix: &str) -> Result<Self, InvalidRequestCode> {
        Self::new(format!("{}{suffix}", self.0))
    }
}

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for RequestCode {
    type Error = InvalidRequestCode;

    fn try_from(code: String) -> Result<Self, Self::Error> { Self::new(code) }
}

impl From<RequestCode> for String {
    fn from(code: RequestCode) -> Self { code.0 }
}

/// Camera directives appended to image requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraCommand {
    /// Fixed camera.
    Steady,
    /// Pan/tilt/zoom camera.
    Moving,
    /// Turn left.
    Left,
    /// Turn right.
    Right,
    /// Tilt up.
    Up,
    /// Tilt down.
    Down,
    /// Remember the current direction.
    Memorise,
    /// Return to the remembered direction.
    Recall,
}

impl CameraCommand {
    /// Wire form of the directive.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steady => "CAM=FIX",
            Self::Moving => "CAM=PTZ",
            Self::Left => "DIR=L",
            Self::Right => "DIR=R",
            Self::Up => "DIR=U",
            Self::Down => "DIR=D",
            Self::Memorise => "M",
            Self::Recall => "C",
        }
    }
}

impl std::str::FromStr for CameraCommand {
    type Err = InvalidRequestCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s.to_ascii_uppercase().as_str() {
            "CAM=FIX" | "FIX" => Self::Steady,
            "CAM=PTZ" | "PTZ" => Self::Moving,
            "DIR=L" | "L" => Self::Left,
            "DIR=R" | "R" => Self::Right,
            "DIR=U" | "U" => Self::Up,
            "DIR=D" | "D" => Self::Down,
            "M" => Self::Memorise,
            "C" => Self::Recall,
            _ => {
                return Err(InvalidRequestCode::UnknownCameraCommand { value: s.to_owned() });
            }
        };
        Ok(command)
    }
}

/// The set of codes issued for one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCodes {
    /// Plain echo request.
    pub echo: RequestCode,
    /// Error-free image request.
    pub image: RequestCode,
    /// Image request with injected corruption.
    pub image_corrupt: RequestCode,
    /// GPS tracking request.
    pub gps: RequestCode,
    /// Positive code: request a fresh checked echo packet.
    pub ack: RequestCode,
    /// Negative code: request retransmission of the last checked packet.
    pub nack: RequestCode,
}

impl RequestCodes {
    /// Image code for the clear or corrupted variant, with camera directives.
    #[must_use]
    pub fn image_code(&self, corrupt: bool, camera: &[CameraCommand]) -> RequestCode {
        let base = if corrupt {
            &self.image_corrupt
        } else {
            &self.image
        };
        let suffix: String = camera.iter().map(|command| command.as_str()).collect();
        RequestCode(format!("{}{suffix}", base.0))
    }

    /// GPS code asking for a stored route, e.g. `R=1000099`.
    ///
    /// The route replaces any suffix already present on the GPS code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestCode`] if `route` contains invalid bytes.
    pub fn gps_route(&self, route: &str) -> Result<RequestCode, InvalidRequestCode> {
        RequestCode::new(format!("{}{route}", self.gps.prefix()))
    }

    /// GPS code asking for a map image marking `points`.
    #[must_use]
    pub fn gps_trace(&self, points: &[TracePoint]) -> RequestCode {
        let suffix: String = points.iter().map(|point| format!("T={point}")).collect();
        RequestCode(format!("{}{suffix}", self.gps.prefix()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn codes() -> RequestCodes {
        let code = |text: &str| RequestCode::new(text).expect("valid test code");
        RequestCodes {
            echo: code("E0001"),
            image: code("M0002"),
            image_corrupt: code("G0003"),
            gps: code("P0004"),
            ack: code("Q0005"),
            nack: code("R0006"),
        }
    }

    #[rstest]
    #[case("", InvalidRequestCode::Empty)]
    #[case("E 12", InvalidRequestCode::InvalidByte { byte: b' ' })]
    #[case("E12\r", InvalidRequestCode::InvalidByte { byte: b'\r' })]
    fn rejects_invalid_codes(#[case] text: &str, #[case] expected: InvalidRequestCode) {
        assert_eq!(RequestCode::new(text), Err(expected));
    }

    #[rstest]
    fn image_code_appends_camera_directives(codes: RequestCodes) {
        let code = codes.image_code(true, &[CameraCommand::Moving, CameraCommand::Left]);
        assert_eq!(code.as_str(), "G0003CAM=PTZDIR=L");
        assert_eq!(codes.image_corrupt.as_str(), "G0003");
    }

    #[rstest]
    fn route_is_derived_not_mutated(codes: RequestCodes) {
        let route = codes.gps_route("R=1000099").expect("valid route");
        assert_eq!(route.to_wire().as_ref(), b"P0004R=1000099\r");
        assert_eq!(codes.gps.as_str(), "P0004");
    }

    #[rstest]
    fn route_replaces_existing_suffix(mut codes: RequestCodes) {
        codes.gps = codes.gps_route("R=1000099").expect("valid route");
        let route = codes.gps_route("R=2000050").expect("valid route");
        assert_eq!(route.as_str(), "P0004R=2000050");
    }

    #[rstest]
    fn trace_code_lists_points(codes: RequestCodes) {
        let point = TracePoint::from_packed("4037.6331", "02257.5633").expect("valid point");
        let code = codes.gps_trace(&[point, point]);
        assert_eq!(code.as_str(), "P0004T=225734403738T=225734403738");
    }

    #[test]
    fn camera_command_parses_short_forms() {
        assert_eq!("ptz".parse::<CameraCommand>(), Ok(CameraCommand::Moving));
        assert_eq!("DIR=U".parse::<CameraCommand>(), Ok(CameraCommand::Up));
        assert_eq!(
            "sideways".parse::<CameraCommand>(),
            Err(InvalidRequestCode::UnknownCameraCommand {
                value: "sideways".to_owned()
            })
        );
    }
}
