//! Packed NMEA coordinates to delimited degrees/minutes/seconds.
//!
//! NMEA packs latitude as `ddmm.mmmm` and longitude as `dddmm.mmmm`. The
//! trace request wants whole seconds, so the fractional minutes are scaled
//! by 60 and rounded.

use std::fmt;

use thiserror::Error;

const LATITUDE_DEGREE_DIGITS: usize = 2;
const LONGITUDE_DEGREE_DIGITS: usize = 3;

/// A packed coordinate could not be converted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
    /// Fewer characters than the degree and minute fields need.
    #[error("coordinate {value:?} is too short")]
    TooShort {
        /// Offending field.
        value: String,
    },
    /// A degree, minute or fraction field is not numeric.
    #[error("coordinate {value:?} is not numeric")]
    NotNumeric {
        /// Offending field.
        value: String,
    },
    /// The minute field is 60 or more.
    #[error("coordinate {value:?} has minutes out of range")]
    OutOfRange {
        /// Offending field.
        value: String,
    },
}

/// One axis in whole degrees, minutes and seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisDms {
    /// Whole degrees.
    pub degrees: u16,
    /// Whole minutes, `0..60`.
    pub minutes: u8,
    /// Rounded seconds, `0..60`.
    pub seconds: u8,
}

impl AxisDms {
    /// Convert a packed `ddmm.mmmm` latitude.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if the field is short, not numeric or
    /// carries minutes of 60 or more.
    ///
    /// # Examples
    ///
    /// ```
    /// use halflink::decode::AxisDms;
    ///
    /// let latitude = AxisDms::parse_latitude("3723.1234").expect("valid latitude");
    /// assert_eq!(latitude.to_string(), "372307");
    /// ```
    pub fn parse_latitude(packed: &str) -> Result<Self, CoordinateError> {
        Self::parse(packed, LATITUDE_DEGREE_DIGITS)
    }

    /// Convert a packed `dddmm.mmmm` longitude.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if the field is short, not numeric or
    /// carries minutes of 60 or more.
    pub fn parse_longitude(packed: &str) -> Result<Self, CoordinateError> {
        Self::parse(packed, LONGITUDE_DEGREE_DIGITS)
    }

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "fraction is in [0, 1) so the scaled value is in [0, 60]"
    )]
    fn parse(packed: &str, degree_digits: usize) -> Result<Self, CoordinateError> {
        let too_short = || CoordinateError::TooShort {
            value: packed.to_owned(),
        };
        let not_numeric = || CoordinateError::NotNumeric {
            value: packed.to_owned(),
        };

        let degrees = packed.get(..degree_digits).ok_or_else(too_short)?;
        let minutes = packed
            .get(degree_digits..degree_digits + 2)
            .ok_or_else(too_short)?;
        let fraction = packed.get(degree_digits + 2..).unwrap_or_default();

        if !(degrees.bytes().chain(minutes.bytes())).all(|byte| byte.is_ascii_digit()) {
            return Err(not_numeric());
        }
        if !(fraction.is_empty() || fraction.starts_with('.'))
            || !fraction.bytes().all(|byte| byte.is_ascii_digit() || byte == b'.')
        {
            return Err(not_numeric());
        }

        let mut degrees: u16 = degrees.parse().map_err(|_| not_numeric())?;
        let mut minutes: u8 = minutes.parse().map_err(|_| not_numeric())?;
        if minutes >= 60 {
            return Err(CoordinateError::OutOfRange {
                value: packed.to_owned(),
            });
        }
        let fraction: f64 = format!("0{fraction}").parse().map_err(|_| not_numeric())?;
        let mut seconds = (fraction * 60.0).round() as u8;

        // Only a rounded-up fraction can reach 60 here.
        if seconds >= 60 {
            seconds -= 60;
            minutes += 1;
            if minutes == 60 {
                minutes = 0;
                degrees += 1;
            }
        }

        Ok(Self {
            degrees,
            minutes,
            seconds,
        })
    }
}

impl fmt::Display for AxisDms {
    /// Degrees with at least two digits, then two-digit minutes and seconds.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}{:02}", self.degrees, self.minutes, self.seconds)
    }
}

/// A position marked on a GPS trace image.
///
/// Displays as the longitude segment followed by the latitude segment, the
/// form the trace request expects after `T=`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TracePoint {
    /// East-west axis.
    pub longitude: AxisDms,
    /// North-south axis.
    pub latitude: AxisDms,
}

impl TracePoint {
    /// Convert packed NMEA latitude and longitude fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either field is invalid.
    pub fn from_packed(latitude: &str, longitude: &str) -> Result<Self, CoordinateError> {
        Ok(Self {
            longitude: AxisDms::parse_longitude(longitude)?,
            latitude: AxisDms::parse_latitude(latitude)?,
        })
    }
}

impl fmt::Display for TracePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.longitude, self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("3723.1234", "372307")]
    #[case("4037.6331", "403738")]
    #[case("0500.0000", "050000")]
    #[case("4037", "403700")]
    fn latitude_conversion(#[case] packed: &str, #[case] expected: &str) {
        let axis = AxisDms::parse_latitude(packed).expect("valid latitude");
        assert_eq!(axis.to_string(), expected);
    }

    #[rstest]
    #[case("02257.5633", "225734")]
    #[case("12257.5633", "1225734")]
    #[case("00530.0500", "053003")]
    fn longitude_drops_leading_zero(#[case] packed: &str, #[case] expected: &str) {
        let axis = AxisDms::parse_longitude(packed).expect("valid longitude");
        assert_eq!(axis.to_string(), expected);
    }

    #[test]
    fn rounding_to_sixty_carries_into_minutes() {
        let axis = AxisDms::parse_latitude("4059.9999").expect("valid latitude");
        assert_eq!(
            axis,
            AxisDms {
                degrees: 41,
                minutes: 0,
                seconds: 0
            }
        );
    }

    #[test]
    fn minutes_below_sixty_are_kept_without_carry() {
        let axis = AxisDms::parse_latitude("4059.4999").expect("valid latitude");
        assert_eq!(
            axis,
            AxisDms {
                degrees: 40,
                minutes: 59,
                seconds: 30
            }
        );
    }

    #[test]
    fn out_of_range_longitude_minutes_are_rejected() {
        assert_eq!(
            AxisDms::parse_longitude("02299.0000"),
            Err(CoordinateError::OutOfRange {
                value: "02299.0000".into()
            })
        );
    }

    #[test]
    fn trace_point_is_longitude_then_latitude() {
        let point = TracePoint::from_packed("4037.6331", "02257.5633").expect("valid point");
        assert_eq!(point.to_string(), "225734403738");
    }

    #[rstest]
    #[case("40", CoordinateError::TooShort { value: "40".into() })]
    #[case("4x37.1", CoordinateError::NotNumeric { value: "4x37.1".into() })]
    #[case("4037.1e5", CoordinateError::NotNumeric { value: "4037.1e5".into() })]
    #[case("4075.0000", CoordinateError::OutOfRange { value: "4075.0000".into() })]
    #[case("4060", CoordinateError::OutOfRange { value: "4060".into() })]
    fn rejects_invalid_latitude(#[case] packed: &str, #[case] expected: CoordinateError) {
        assert_eq!(AxisDms::parse_latitude(packed), Err(expected));
    }
}
