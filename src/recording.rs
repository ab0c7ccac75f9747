//! Capture and replay containers for pulse sequences.
//!
//! The native interchange format is the Broadlink byte container
//! (https://github.com/mjg59/python-broadlink/blob/master/protocol.md),
//! carried as hex or base64 text. Plain `+mark -space` text is also
//! accepted for captures coming from other tooling.

use std::time::Duration;

use base64::Engine as _;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Broadlink pulse unit: 2^-15 s, i.e. µs * 269 / 8192.
trait BroadlinkDuration {
    fn to_broadlink(self) -> u16;
    fn from_broadlink(tick: u16) -> Self;
}

impl BroadlinkDuration for Duration {
    fn to_broadlink(self) -> u16 {
        // Round through float to avoid truncation drift.
        (self.as_micros() as f64 * 269.0 / 8192.0).round() as u16
    }

    fn from_broadlink(tick: u16) -> Self {
        Self::from_nanos((tick as f64 * 8192000.0 / 269.0).round() as _)
    }
}

/// Physical band marker in the container header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Carrier {
    Ir = 0x26,
    Rf433 = 0xb2,
    Rf315 = 0xd7,
}

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("unknown carrier byte: {0:#04x}")]
    UnknownCarrier(u8),
    #[error("failed to decode hex input: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("failed to decode base64 input: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unparseable raw pulse text")]
    RawFormat,
    #[error("empty input")]
    Empty,
}

/// One recorded or to-be-sent pulse train.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recording {
    /// Extra transmissions the device performs (0 = send once).
    pub repeat_count: u8,
    pub carrier: Carrier,
    /// Alternating on/off durations, starting with on.
    pub pulses: Vec<Duration>,
}

impl Recording {
    /// Wraps raw µs durations as an IR recording.
    pub fn from_pulses(pulses: &[u32]) -> Self {
        Self {
            repeat_count: 0,
            carrier: Carrier::Ir,
            pulses: pulses
                .iter()
                .map(|&us| Duration::from_micros(us as u64))
                .collect(),
        }
    }

    pub fn to_pulses(&self) -> Vec<u32> {
        self.pulses.iter().map(|p| p.as_micros() as _).collect()
    }

    /// `+on -off` text, µs.
    pub fn to_raw_format(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for (i, p) in self.pulses.iter().enumerate() {
            let sign = if i % 2 == 0 { '+' } else { '-' };
            write!(out, "{}{} ", sign, p.as_micros()).ok();
        }
        out
    }

    /// Serializes to the Broadlink container: carrier byte, repeat byte,
    /// little-endian payload length, then pulses as u8 ticks with a
    /// 0-prefixed big-endian u16 escape for long ones.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(self.carrier as u8);
        buf.put_u8(self.repeat_count);

        let mut payload = BytesMut::new();
        for pulse in &self.pulses {
            let tick = pulse.to_broadlink();
            if tick < 256 {
                payload.put_u8(tick as _);
            } else {
                payload.put_u8(0);
                payload.put_u16(tick);
            }
        }

        buf.put_u16_le(payload.len() as _);
        buf.put(payload);
        buf.freeze()
    }

    pub fn from_bytes(mut buf: Bytes) -> Result<Self, RecordingError> {
        if buf.len() < 4 {
            return Err(RecordingError::Empty);
        }
        let carrier = match buf.get_u8() {
            0x26 => Carrier::Ir,
            0xb2 => Carrier::Rf433,
            0xd7 => Carrier::Rf315,
            x => return Err(RecordingError::UnknownCarrier(x)),
        };
        let repeat_count = buf.get_u8();
        let payload_len = buf.get_u16_le() as usize;

        let mut pulses = Vec::new();
        let mut remain = payload_len.min(buf.len());
        while remain > 0 {
            let mut tick = buf.get_u8() as u16;
            remain -= 1;
            if tick == 0 {
                // Escaped u16 value.
                if buf.len() < 2 || remain < 2 {
                    break;
                }
                tick = buf.get_u16();
                remain -= 2;
            }
            pulses.push(Duration::from_broadlink(tick));
        }

        // Captures often drop the final off period.
        if pulses.len() % 2 != 0 {
            pulses.push(Duration::from_millis(100));
        }

        Ok(Recording {
            repeat_count,
            carrier,
            pulses,
        })
    }
}

/// Text representations a recording travels in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    clap::ValueEnum,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Format {
    Hex,
    Base64,
    Raw,
}

pub fn parse(format: Format, input: &str) -> Result<Recording, RecordingError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(RecordingError::Empty);
    }
    match format {
        Format::Hex => {
            let mut decoded = hex::decode(input)?;
            if decoded.len() % 2 != 0 {
                decoded.push(0);
            }
            Recording::from_bytes(Bytes::from(decoded))
        }
        Format::Base64 => {
            let decoded = base64::engine::general_purpose::STANDARD.decode(input)?;
            Recording::from_bytes(Bytes::from(decoded))
        }
        Format::Raw => parse_raw(input),
    }
}

pub fn serialize(format: Format, recording: &Recording) -> String {
    match format {
        Format::Hex => hex::encode(recording.to_bytes()),
        Format::Base64 => base64::engine::general_purpose::STANDARD.encode(recording.to_bytes()),
        Format::Raw => recording.to_raw_format(),
    }
}

fn parse_raw(input: &str) -> Result<Recording, RecordingError> {
    // IrTransmogrifier prefixes its output with `Freq=38400Hz[...][...]`.
    let input = if input.starts_with("Freq=") {
        input
            .split_once('[')
            .and_then(|(_, rest)| rest.split(']').next())
            .ok_or(RecordingError::RawFormat)?
    } else {
        input
    };

    let msg = irp::Message::parse(input).or(Err(RecordingError::RawFormat))?;
    Ok(Recording {
        repeat_count: 0,
        carrier: Carrier::Ir,
        pulses: msg
            .raw
            .into_iter()
            .map(|us| Duration::from_micros(us as _))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // A real Broadlink IR capture with its known pulse train.
    const CAPTURE_HEX: &str = "2600ca008b8f1035101211341013101210121112103510121112103510121112101211340f360f121134111210121112103510351035103510341134113411341134113410351035103510351035103510351035103510341134113411121035101210350f3510a88c8e11121035101211341134113410351012113411341112103510351035101210121134111210351035103510121013101210121112101210130f13101210131012101211121012101310121013101210121112101211121035101211341112101210000d05";

    #[test]
    fn test_broadlink_capture_roundtrip() {
        let recording = parse(Format::Hex, CAPTURE_HEX).unwrap();
        assert_eq!(recording.carrier, Carrier::Ir);
        assert_eq!(recording.repeat_count, 0);
        let pulses = recording.to_pulses();
        assert_eq!(pulses.len(), 200);
        assert_eq!(pulses[0], 4233);
        assert_eq!(pulses[1], 4354);
        // The trailing 0x0d05 escape is the usual ~100 ms terminator.
        let last = *pulses.last().unwrap();
        assert!((100_000..103_000).contains(&last), "got {}", last);

        assert_eq!(serialize(Format::Hex, &recording), CAPTURE_HEX);
    }

    #[test]
    fn test_base64_matches_hex() {
        let recording = parse(Format::Hex, CAPTURE_HEX).unwrap();
        let b64 = serialize(Format::Base64, &recording);
        let back = parse(Format::Base64, &b64).unwrap();
        assert_eq!(back, recording);
    }

    #[test]
    fn test_tick_conversion() {
        let d = Duration::from_micros(560);
        let tick = d.to_broadlink();
        assert_eq!(tick, 18);
        let back = Duration::from_broadlink(tick);
        assert!((back.as_micros() as i64 - 560).abs() < 30);
    }

    #[test]
    fn test_long_pulse_escape() {
        let recording = Recording::from_pulses(&[560, 150000]);
        let bytes = recording.to_bytes();
        let back = Recording::from_bytes(bytes).unwrap();
        // 150 ms needs the u16 escape and survives within a tick.
        let us = back.pulses[1].as_micros() as i64;
        assert!((us - 150000).abs() < 31, "got {}", us);
    }

    #[test]
    fn test_odd_pulse_count_padded() {
        let bytes = Recording::from_pulses(&[560]).to_bytes();
        let back = Recording::from_bytes(bytes).unwrap();
        assert_eq!(back.pulses.len(), 2);
        assert_eq!(back.pulses[1], Duration::from_millis(100));
    }

    #[test]
    fn test_raw_format() {
        let recording = Recording::from_pulses(&[9000, 4500, 560]);
        assert_eq!(recording.to_raw_format(), "+9000 -4500 +560 ");
        let back = parse(Format::Raw, "+9000 -4500 +560 -20000").unwrap();
        assert_eq!(back.to_pulses(), vec![9000, 4500, 560, 20000]);
    }

    #[test]
    fn test_transmogrifier_header() {
        let back = parse(Format::Raw, "Freq=38400Hz[+9000,-4500,+560,-560][]");
        assert!(back.is_ok());
    }

    #[test]
    fn test_unknown_carrier() {
        assert!(matches!(
            parse(Format::Hex, "99000200ffff"),
            Err(RecordingError::UnknownCarrier(0x99))
        ));
    }
}
