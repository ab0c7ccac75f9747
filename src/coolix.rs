//! Coolix 24-bit protocol (Beko, Midea RG52, Tokio and friends).
//!
//! There is no checksum byte: on the wire every data byte is followed by
//! its bitwise complement. Several settings have no absolute encoding at
//! all and are transmitted as dedicated fixed command words that toggle
//! the unit's internal state, so a full send is an ordered list of frames.

use bitfield::bitfield;

use crate::common::{CommonState, FanSpeed, Mode, Protocol, SwingV};
use crate::pulse::{self, DecodeFailure, TimingProfile};

pub const BITS: u8 = 24;

pub const DEFAULT_STATE: u32 = 0xB21FC8;

// Fixed toggle/command words. The unit flips the named setting on receipt.
pub const CMD_SWING: u32 = 0xB26BE0;
pub const CMD_SWING_V: u32 = 0xB20FE0;
pub const CMD_SWING_H: u32 = 0xB2F5A2;
pub const CMD_SLEEP: u32 = 0xB2E003;
pub const CMD_TURBO: u32 = 0xB5F5A2;
pub const CMD_OFF: u32 = 0xB27BE0;
pub const CMD_LIGHT: u32 = 0xB5F5A5;
pub const CMD_CLEAN: u32 = 0xB5F5AA;
pub const CMD_FAN_MODE: u32 = 0xB2BFE4;

pub const MIN_TEMP: u8 = 17;
pub const MAX_TEMP: u8 = 30;

// Mode values, byte 2 bits 2-3.
pub const MODE_COOL: u8 = 0b00;
pub const MODE_DRY_FAN: u8 = 0b01;
pub const MODE_AUTO: u8 = 0b10;
pub const MODE_HEAT: u8 = 0b11;

// Fan values, byte 1 bits 5-7.
pub const FAN_MAX: u8 = 0b001;
pub const FAN_MEDIUM: u8 = 0b010;
pub const FAN_MIN: u8 = 0b100;
pub const FAN_AUTO: u8 = 0b101;
pub const FAN_AUTO0: u8 = 0b000;
pub const FAN_FOLLOW: u8 = 0b110;
pub const FAN_FIXED: u8 = 0b111;

/// Temperature nibble meaning "fan mode, no temperature".
pub const TEMP_FAN: u8 = 0b1110;

/// Sensor temperature nibble meaning "ignore".
pub const SENSOR_TEMP_IGNORE: u8 = 0b1111;

/// Wire codes for 17C..30C. Not a plain offset encoding.
const TEMP_MAP: [u8; 14] = [
    0b0000, 0b0001, 0b0011, 0b0010, 0b0110, 0b0111, 0b0101, 0b0100, 0b1100, 0b1101, 0b1001,
    0b1000, 0b1010, 0b1011,
];

const TICK: u32 = 560;

pub const TIMING: TimingProfile = TimingProfile {
    hdr_mark: 8 * TICK,
    hdr_space: 8 * TICK,
    bit_mark: TICK,
    one_space: 3 * TICK,
    zero_space: TICK,
    footer_mark: TICK,
    gap: 9 * TICK,
    tolerance: 25,
    margin: 50,
    msb_first: true,
};

bitfield! {
    /// One 24-bit Coolix state word. Byte 0 (0xB2/0xB5 prefix) is the most
    /// significant byte on the wire.
    pub struct Packet(u32);
    impl Debug;
    pub u8, prefix, set_prefix: 23, 16;
    pub u8, fan_raw, set_fan_raw: 15, 13;
    pub u8, temp_raw, set_temp_raw: 7, 4;
    pub u8, mode_raw, set_mode_raw: 3, 2;
    pub u8, sensor_temp_raw, set_sensor_temp_raw: 11, 8;
}

impl Clone for Packet {
    fn clone(&self) -> Self {
        Packet(self.0)
    }
}

impl Copy for Packet {}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Packet {}

impl Default for Packet {
    fn default() -> Self {
        Packet(DEFAULT_STATE)
    }
}

impl Packet {
    /// Whether this word is one of the fixed toggle commands rather than
    /// an absolute state snapshot.
    pub fn is_special(&self) -> bool {
        matches!(
            self.0,
            CMD_SWING
                | CMD_SWING_V
                | CMD_SWING_H
                | CMD_SLEEP
                | CMD_TURBO
                | CMD_OFF
                | CMD_LIGHT
                | CMD_CLEAN
        )
    }

    pub fn temp(&self) -> Option<u8> {
        let raw = self.temp_raw();
        TEMP_MAP
            .iter()
            .position(|&code| code == raw)
            .map(|i| i as u8 + MIN_TEMP)
    }

    pub fn set_temp(&mut self, degrees: u8) {
        let temp = degrees.clamp(MIN_TEMP, MAX_TEMP);
        self.set_temp_raw(TEMP_MAP[(temp - MIN_TEMP) as usize]);
    }

    pub fn set_mode(&mut self, mode: Mode, degrees: u8) {
        match mode {
            Mode::Cool => {
                self.set_mode_raw(MODE_COOL);
                self.set_temp(degrees);
            }
            Mode::Heat => {
                self.set_mode_raw(MODE_HEAT);
                self.set_temp(degrees);
            }
            Mode::Dry => {
                self.set_mode_raw(MODE_DRY_FAN);
                self.set_temp(degrees);
            }
            Mode::Fan => {
                // Fan mode is dry plus the no-temperature sentinel.
                self.set_mode_raw(MODE_DRY_FAN);
                self.set_temp_raw(TEMP_FAN);
            }
            _ => {
                self.set_mode_raw(MODE_AUTO);
                self.set_temp(degrees);
            }
        }
    }

    pub fn mode(&self) -> Mode {
        match self.mode_raw() {
            MODE_COOL => Mode::Cool,
            MODE_HEAT => Mode::Heat,
            MODE_DRY_FAN => {
                if self.temp_raw() == TEMP_FAN {
                    Mode::Fan
                } else {
                    Mode::Dry
                }
            }
            _ => Mode::Auto,
        }
    }

    pub fn set_fan(&mut self, speed: FanSpeed) {
        self.set_fan_raw(match speed {
            FanSpeed::Min | FanSpeed::Low => FAN_MIN,
            FanSpeed::Medium => FAN_MEDIUM,
            FanSpeed::High | FanSpeed::Max => FAN_MAX,
            FanSpeed::Auto => FAN_AUTO,
        });
    }

    pub fn fan(&self) -> FanSpeed {
        match self.fan_raw() {
            FAN_MAX => FanSpeed::Max,
            FAN_MEDIUM => FanSpeed::Medium,
            FAN_MIN => FanSpeed::Min,
            _ => FanSpeed::Auto,
        }
    }
}

/// Appends one 24-bit word as a full frame: each byte is transmitted
/// normally and then inverted.
pub fn encode_word(data: u32, out: &mut Vec<u32>) {
    pulse::encode_header(&TIMING, out);
    for shift in [16u8, 8, 0] {
        let byte = (data >> shift) as u8;
        pulse::encode_data(&TIMING, byte as u64, 8, out);
        pulse::encode_data(&TIMING, !byte as u64, 8, out);
    }
    pulse::encode_footer(&TIMING, out);
}

/// Decodes one frame back into a 24-bit word, verifying the complement
/// interleave in strict mode.
pub fn decode(samples: &[u32], strict: bool) -> Result<Packet, DecodeFailure> {
    let mut wire = [0u8; 6];
    pulse::decode_bytes(&TIMING, samples, &mut wire, true)?;
    if strict {
        for pair in wire.chunks_exact(2) {
            if pair[0] ^ pair[1] != 0xFF {
                return Err(DecodeFailure::ChecksumMismatch);
            }
        }
    }
    Ok(Packet(
        (wire[0] as u32) << 16 | (wire[2] as u32) << 8 | wire[4] as u32,
    ))
}

/// The ordered list of state words a common-state send requires.
///
/// Toggled extras each need their own transmission; the absolute state
/// frame always goes last. A power-off is a single dedicated word.
pub fn words_from_common(common: &CommonState) -> Vec<u32> {
    if !common.power {
        return vec![CMD_OFF];
    }
    let mut words = Vec::new();
    if common.swingv != SwingV::Off || common.swingh != crate::common::SwingH::Off {
        words.push(CMD_SWING);
    }
    if common.turbo {
        words.push(CMD_TURBO);
    }
    if common.sleep >= 0 {
        words.push(CMD_SLEEP);
    }
    if common.light {
        words.push(CMD_LIGHT);
    }
    if common.clean {
        words.push(CMD_CLEAN);
    }
    let mut packet = Packet::default();
    packet.set_mode(common.mode, common.degrees_celsius().round() as u8);
    packet.set_fan(common.fanspeed);
    packet.set_sensor_temp_raw(SENSOR_TEMP_IGNORE);
    words.push(packet.0);
    words
}

/// The full pulse sequence for an ordered word list.
pub fn frames(words: &[u32], repeat: u8) -> Vec<u32> {
    let mut pulses = Vec::new();
    for &word in words {
        for _ in 0..=repeat {
            encode_word(word, &mut pulses);
        }
    }
    pulses
}

/// Converts a decoded word to the common representation.
///
/// Toggle words only flip their own setting: everything else is carried
/// over from `prev`. Decoding a toggle with no prior knowledge reports
/// the flipped setting as active (swing reads as Auto), which is the
/// best guess available.
pub fn to_common(packet: &Packet, prev: Option<&CommonState>) -> CommonState {
    let mut result = match prev {
        Some(prev) if prev.protocol == Protocol::Coolix => *prev,
        _ => CommonState::new(Protocol::Coolix),
    };
    match packet.0 {
        CMD_OFF => {
            result.power = false;
            return result;
        }
        CMD_SWING | CMD_SWING_V => {
            result.swingv = if result.swingv != SwingV::Off {
                SwingV::Off
            } else {
                SwingV::Auto
            };
            return result;
        }
        CMD_TURBO => {
            result.turbo = !result.turbo;
            return result;
        }
        CMD_SLEEP => {
            result.sleep = if result.sleep >= 0 { -1 } else { 0 };
            return result;
        }
        CMD_LIGHT => {
            result.light = !result.light;
            return result;
        }
        CMD_CLEAN => {
            result.clean = !result.clean;
            return result;
        }
        _ => {}
    }
    result.power = true;
    result.mode = packet.mode();
    if let Some(temp) = packet.temp() {
        result.degrees = temp as f32;
    }
    result.celsius = true;
    result.fanspeed = packet.fan();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SwingH;

    #[test]
    fn test_default_state() {
        let packet = Packet::default();
        assert_eq!(packet.prefix(), 0xB2);
        assert_eq!(packet.temp(), Some(25));
        assert_eq!(packet.mode(), Mode::Auto);
        assert_eq!(packet.fan_raw(), FAN_AUTO0);
    }

    #[test]
    fn test_temp_map() {
        let mut packet = Packet::default();
        packet.set_temp(17);
        assert_eq!(packet.temp_raw(), 0b0000);
        packet.set_temp(30);
        assert_eq!(packet.temp_raw(), 0b1011);
        packet.set_temp(0);
        assert_eq!(packet.temp(), Some(MIN_TEMP));
        packet.set_temp(99);
        assert_eq!(packet.temp(), Some(MAX_TEMP));
    }

    #[test]
    fn test_fan_mode_sentinel() {
        let mut packet = Packet::default();
        packet.set_mode(Mode::Fan, 25);
        assert_eq!(packet.mode(), Mode::Fan);
        assert_eq!(packet.temp(), None);
        packet.set_mode(Mode::Dry, 22);
        assert_eq!(packet.mode(), Mode::Dry);
        assert_eq!(packet.temp(), Some(22));
    }

    #[test]
    fn test_roundtrip() {
        let mut packet = Packet::default();
        packet.set_mode(Mode::Cool, 21);
        packet.set_fan(FanSpeed::Max);
        let mut pulses = Vec::new();
        encode_word(packet.0, &mut pulses);
        // Header + 48 bit pairs + footer.
        assert_eq!(pulses.len(), 2 + 48 * 2 + 2);
        let decoded = decode(&pulses, true).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_complement_violation_rejected() {
        let mut pulses = Vec::new();
        encode_word(DEFAULT_STATE, &mut pulses);
        // Corrupt one bit inside the first inverted byte.
        pulses[2 + 8 * 2 + 1] = TIMING.one_space;
        assert_eq!(decode(&pulses, true), Err(DecodeFailure::ChecksumMismatch));
        assert!(decode(&pulses, false).is_ok());
    }

    #[test]
    fn test_frame_order() {
        let mut common = CommonState::new(Protocol::Coolix);
        common.power = true;
        common.mode = Mode::Cool;
        common.degrees = 24.0;
        common.swingv = SwingV::Auto;
        common.turbo = true;
        common.sleep = 0;
        common.light = true;
        common.clean = true;
        let words = words_from_common(&common);
        assert_eq!(
            &words[..5],
            &[CMD_SWING, CMD_TURBO, CMD_SLEEP, CMD_LIGHT, CMD_CLEAN]
        );
        assert_eq!(words.len(), 6);
        // The main frame is last and absolute.
        let main = Packet(words[5]);
        assert_eq!(main.mode(), Mode::Cool);
        assert_eq!(main.temp(), Some(24));
    }

    #[test]
    fn test_power_off_single_word() {
        let mut common = CommonState::new(Protocol::Coolix);
        common.power = false;
        common.turbo = true;
        assert_eq!(words_from_common(&common), vec![CMD_OFF]);
    }

    #[test]
    fn test_swingh_triggers_swing_word() {
        let mut common = CommonState::new(Protocol::Coolix);
        common.power = true;
        common.mode = Mode::Auto;
        common.swingh = SwingH::Auto;
        let words = words_from_common(&common);
        assert_eq!(words[0], CMD_SWING);
    }

    #[test]
    fn test_toggle_to_common() {
        let mut prev = CommonState::new(Protocol::Coolix);
        prev.turbo = false;
        prev.swingv = SwingV::Off;

        let turbo = to_common(&Packet(CMD_TURBO), Some(&prev));
        assert!(turbo.turbo);
        let turbo_again = to_common(&Packet(CMD_TURBO), Some(&turbo));
        assert!(!turbo_again.turbo);

        let swing = to_common(&Packet(CMD_SWING), Some(&prev));
        assert_eq!(swing.swingv, SwingV::Auto);
        let swing_back = to_common(&Packet(CMD_SWING), Some(&swing));
        assert_eq!(swing_back.swingv, SwingV::Off);

        // No prior state: the toggle reads as newly active.
        let blind = to_common(&Packet(CMD_SWING), None);
        assert_eq!(blind.swingv, SwingV::Auto);
    }
}
