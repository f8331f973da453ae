//! NMEA sentence classification.
//!
//! Sentences are split on `,` and `*`, with trailing empty fields ignored.
//! A sentence is only recognised when its field count matches the type
//! exactly; anything else is kept verbatim as
//! [`ParsedSentence::Unrecognized`].

use super::coordinates::{CoordinateError, TracePoint};

const FIX_FIELDS: usize = 16;
const SATELLITES_FIELDS: usize = 19;
const VELOCITY_FIELDS: usize = 14;

/// `$GPGGA` fix data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fix {
    /// UTC time as `hhmmss`, fractional seconds removed.
    pub utc_time: String,
    /// Packed latitude `ddmm.mmmm`.
    pub latitude: String,
    /// `N` or `S`.
    pub north_south: String,
    /// Packed longitude `dddmm.mmmm`.
    pub longitude: String,
    /// `E` or `W`.
    pub east_west: String,
    /// Position fix indicator.
    pub fix_quality: String,
    /// Satellites used.
    pub satellites_used: String,
    /// Horizontal dilution of precision.
    pub hdop: String,
    /// Altitude above mean sea level.
    pub altitude: String,
    /// Altitude units.
    pub altitude_units: String,
    /// Geoid separation.
    pub geoid_separation: String,
    /// Geoid separation units.
    pub separation_units: String,
    /// Age of differential correction.
    pub correction_age: String,
    /// Differential reference station.
    pub station_id: String,
    /// Sentence checksum.
    pub checksum: String,
}

impl Fix {
    /// Seconds since midnight, if the time field is `hhmmss`.
    #[must_use]
    pub fn utc_seconds(&self) -> Option<u32> {
        let field = |range: std::ops::Range<usize>| -> Option<u32> {
            self.utc_time
                .get(range)
                .filter(|digits| digits.bytes().all(|byte| byte.is_ascii_digit()))
                .and_then(|digits| digits.parse().ok())
        };
        Some(field(0..2)? * 3600 + field(2..4)? * 60 + field(4..6)?)
    }

    /// Position of this fix as a trace point.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either coordinate is invalid.
    pub fn trace_point(&self) -> Result<TracePoint, CoordinateError> {
        TracePoint::from_packed(&self.latitude, &self.longitude)
    }
}

/// `$GPGSA` dilution of precision and active satellites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Satellites {
    /// Selection mode.
    pub mode: String,
    /// Fix type.
    pub fix_type: String,
    /// Twelve channel slots; unused slots are empty.
    pub channels: Vec<String>,
    /// Position dilution of precision.
    pub pdop: String,
    /// Horizontal dilution of precision.
    pub hdop: String,
    /// Vertical dilution of precision.
    pub vdop: String,
    /// Sentence checksum.
    pub checksum: String,
}

/// `$GPRMC` recommended minimum data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Velocity {
    /// UTC time as `hhmmss`, fractional seconds removed.
    pub utc_time: String,
    /// `A` valid or `V` void.
    pub status: String,
    /// Packed latitude.
    pub latitude: String,
    /// `N` or `S`.
    pub north_south: String,
    /// Packed longitude.
    pub longitude: String,
    /// `E` or `W`.
    pub east_west: String,
    /// Speed over ground in knots.
    pub speed_knots: String,
    /// Course over ground in degrees.
    pub course: String,
    /// Date as `ddmmyy`.
    pub date: String,
    /// Magnetic variation.
    pub magnetic_variation: String,
    /// Positioning mode.
    pub mode: String,
    /// Sentence checksum.
    pub checksum: String,
}

/// A classified sentence line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedSentence {
    /// `$GPGGA`.
    Fix(Fix),
    /// `$GPGSA`.
    Satellites(Satellites),
    /// `$GPRMC`.
    Velocity(Velocity),
    /// Unknown prefix or wrong field count; the raw line without its
    /// line ending.
    Unrecognized(String),
}

fn split_fields(line: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split([',', '*']).collect();
    while fields.last().is_some_and(|field| field.is_empty()) {
        fields.pop();
    }
    fields
}

fn whole_seconds(time: &str) -> String { time.split('.').next().unwrap_or_default().to_owned() }

/// Classify one sentence line.
///
/// # Examples
///
/// ```
/// use halflink::decode::{ParsedSentence, parse_sentence};
///
/// let line = "$GPGGA,045208.000,4037.6331,N,02257.5633,E,1,07,1.5,57.8,M,36.1,M,,0000*6D\r\n";
/// let ParsedSentence::Fix(fix) = parse_sentence(line) else {
///     panic!("expected a fix");
/// };
/// assert_eq!(fix.utc_time, "045208");
///
/// assert!(matches!(
///     parse_sentence("$GPGGA,1,2,3"),
///     ParsedSentence::Unrecognized(_)
/// ));
/// ```
#[must_use]
pub fn parse_sentence(line: &str) -> ParsedSentence {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields = split_fields(line);
    let owned = |field: &&str| (*field).to_owned();

    match fields.as_slice() {
        [
            "$GPGGA",
            time,
            latitude,
            north_south,
            longitude,
            east_west,
            fix_quality,
            satellites_used,
            hdop,
            altitude,
            altitude_units,
            geoid_separation,
            separation_units,
            correction_age,
            station_id,
            checksum,
        ] => ParsedSentence::Fix(Fix {
            utc_time: whole_seconds(time),
            latitude: owned(latitude),
            north_south: owned(north_south),
            longitude: owned(longitude),
            east_west: owned(east_west),
            fix_quality: owned(fix_quality),
            satellites_used: owned(satellites_used),
            hdop: owned(hdop),
            altitude: owned(altitude),
            altitude_units: owned(altitude_units),
            geoid_separation: owned(geoid_separation),
            separation_units: owned(separation_units),
            correction_age: owned(correction_age),
            station_id: owned(station_id),
            checksum: owned(checksum),
        }),
        ["$GPGSA", mode, fix_type, channels @ .., pdop, hdop, vdop, checksum]
            if fields.len() == SATELLITES_FIELDS =>
        {
            ParsedSentence::Satellites(Satellites {
                mode: owned(mode),
                fix_type: owned(fix_type),
                channels: channels.iter().map(owned).collect(),
                pdop: owned(pdop),
                hdop: owned(hdop),
                vdop: owned(vdop),
                checksum: owned(checksum),
            })
        }
        [
            "$GPRMC",
            time,
            status,
            latitude,
            north_south,
            longitude,
            east_west,
            speed_knots,
            course,
            date,
            magnetic_variation,
            _variation_direction,
            mode,
            checksum,
        ] => ParsedSentence::Velocity(Velocity {
            utc_time: whole_seconds(time),
            status: owned(status),
            latitude: owned(latitude),
            north_south: owned(north_south),
            longitude: owned(longitude),
            east_west: owned(east_west),
            speed_knots: owned(speed_knots),
            course: owned(course),
            date: owned(date),
            magnetic_variation: owned(magnetic_variation),
            mode: owned(mode),
            checksum: owned(checksum),
        }),
        _ => {
            tracing::debug!(
                fields = fields.len(),
                expected_fix = FIX_FIELDS,
                expected_velocity = VELOCITY_FIELDS,
                "unrecognized sentence"
            );
            ParsedSentence::Unrecognized(line.to_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const GGA: &str = "$GPGGA,045208.000,4037.6331,N,02257.5633,E,1,07,1.5,57.8,M,36.1,M,,0000*6D\r\n";
    const GSA: &str = "$GPGSA,A,3,29,26,05,10,02,15,,,,,,,2.4,1.5,1.9*33\r\n";
    const RMC: &str = "$GPRMC,045209.000,A,4037.6331,N,02257.5634,E,0.31,288.58,240911,,,A*65\r\n";

    #[test]
    fn parses_fix() {
        let ParsedSentence::Fix(fix) = parse_sentence(GGA) else {
            panic!("expected fix");
        };
        assert_eq!(fix.utc_time, "045208");
        assert_eq!(fix.latitude, "4037.6331");
        assert_eq!(fix.correction_age, "");
        assert_eq!(fix.checksum, "6D");
        assert_eq!(fix.utc_seconds(), Some(4 * 3600 + 52 * 60 + 8));
    }

    #[test]
    fn parses_satellites_with_empty_channels() {
        let ParsedSentence::Satellites(satellites) = parse_sentence(GSA) else {
            panic!("expected satellites");
        };
        assert_eq!(satellites.channels.len(), 12);
        assert_eq!(satellites.channels[0], "29");
        assert_eq!(satellites.channels[11], "");
        assert_eq!(satellites.vdop, "1.9");
    }

    #[test]
    fn parses_velocity() {
        let ParsedSentence::Velocity(velocity) = parse_sentence(RMC) else {
            panic!("expected velocity");
        };
        assert_eq!(velocity.utc_time, "045209");
        assert_eq!(velocity.date, "240911");
        assert_eq!(velocity.mode, "A");
    }

    #[rstest]
    #[case("$GPGGA,045208.000,4037.6331,N*6D\r\n")]
    #[case("$GPRMC,045209.000,A,4037.6331,N,02257.5634,E,0.31,288.58,240911,,,,A*65")]
    #[case("$GPVTG,288.58,T,,M,0.31,N,0.6,K,A*3C\r\n")]
    #[case("")]
    fn wrong_shape_is_unrecognized(#[case] line: &str) {
        assert_eq!(
            parse_sentence(line),
            ParsedSentence::Unrecognized(line.trim_end().to_owned())
        );
    }
}
