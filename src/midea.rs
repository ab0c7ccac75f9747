//! Midea 48-bit protocol.
//!
//! Each message is transmitted twice: once as-is and once with every bit
//! inverted. The checksum is a bit-reversed sum of the bit-reversed upper
//! bytes. Vertical swing has no absolute encoding; it is a dedicated
//! sentinel message that toggles the vanes.

use bit_reverse::ParallelReverse;
use bitfield::bitfield;

use crate::common::{self, CommonState, FanSpeed, Mode, Protocol, SwingV};
use crate::pulse::{self, DecodeFailure, TimingProfile};

pub const BITS: u8 = 48;

/// The fixed "toggle vertical swing" message.
pub const TOGGLE_SWING_V: u64 = 0x0000A201FFFFFF7C;

pub const MIN_TEMP_F: u8 = 62;
pub const MAX_TEMP_F: u8 = 86;
pub const MIN_TEMP_C: u8 = 17;
pub const MAX_TEMP_C: u8 = 30;

pub const MODE_COOL: u8 = 0b000;
pub const MODE_DRY: u8 = 0b001;
pub const MODE_AUTO: u8 = 0b010;
pub const MODE_HEAT: u8 = 0b011;
pub const MODE_FAN: u8 = 0b100;

pub const FAN_AUTO: u8 = 0b00;
pub const FAN_LOW: u8 = 0b01;
pub const FAN_MED: u8 = 0b10;
pub const FAN_HIGH: u8 = 0b11;

const TICK: u32 = 80;

pub const TIMING: TimingProfile = TimingProfile {
    hdr_mark: 56 * TICK,
    hdr_space: 56 * TICK,
    bit_mark: 7 * TICK,
    one_space: 21 * TICK,
    zero_space: 7 * TICK,
    footer_mark: 7 * TICK,
    gap: (56 + 7 + 7) * TICK,
    tolerance: 25,
    margin: 50,
    msb_first: true,
};

bitfield! {
    /// One 48-bit Midea state. Temperature is stored as Fahrenheit - 62;
    /// the celsius flag only selects the display unit.
    pub struct Packet(u64);
    impl Debug;
    pub u8, checksum, set_checksum: 7, 0;
    pub u8, temp_raw, set_temp_raw: 28, 24;
    pub celsius, set_celsius: 29;
    pub u8, mode_raw, set_mode_raw: 34, 32;
    pub u8, fan_raw, set_fan_raw: 36, 35;
    pub sleep, set_sleep: 38;
    pub power, set_power: 39;
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

impl Packet {
    /// A powered-on 25C auto baseline.
    pub fn new() -> Self {
        let mut p = Packet(0x0000A1826FFFFF62 & ((1 << BITS) - 1));
        p.set_power(true);
        p.set_mode_raw(MODE_AUTO);
        p.set_fan_raw(FAN_AUTO);
        p.set_celsius(true);
        p.set_temp(25, true);
        p.apply_checksum();
        p
    }

    pub fn is_swing_v_toggle(&self) -> bool {
        self.0 == TOGGLE_SWING_V
    }

    /// Clamps to the supported band in the requested unit; storage is
    /// always Fahrenheit.
    pub fn set_temp(&mut self, degrees: u8, celsius: bool) {
        let deg_f = if celsius {
            let deg_c = degrees.clamp(MIN_TEMP_C, MAX_TEMP_C);
            common::celsius_to_fahrenheit(deg_c as f32).round() as u8
        } else {
            degrees.clamp(MIN_TEMP_F, MAX_TEMP_F)
        };
        self.set_temp_raw(deg_f - MIN_TEMP_F);
    }

    pub fn temp(&self, celsius: bool) -> u8 {
        let deg_f = self.temp_raw() + MIN_TEMP_F;
        if celsius {
            common::fahrenheit_to_celsius(deg_f as f32).round() as u8
        } else {
            deg_f
        }
    }

    fn calc_checksum(&self) -> u8 {
        let mut sum = 0u8;
        for i in 1..6 {
            let byte = (self.0 >> (8 * i)) as u8;
            sum = sum.wrapping_add(byte.swap_bits());
        }
        0u8.wrapping_sub(sum).swap_bits()
    }

    pub fn apply_checksum(&mut self) {
        self.set_checksum(self.calc_checksum());
    }

    pub fn valid_checksum(&self) -> bool {
        self.checksum() == self.calc_checksum()
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends one message: the frame followed by its fully inverted twin.
pub fn encode_message(data: u64, out: &mut Vec<u32>) {
    let mask = (1u64 << BITS) - 1;
    pulse::encode_bits(&TIMING, data & mask, BITS, out);
    pulse::encode_bits(&TIMING, !data & mask, BITS, out);
}

/// The pulse sequence for a state send: the main message plus, when
/// requested, the swing toggle sentinel afterwards.
pub fn frames(packet: &Packet, swing_v_toggle: bool, repeat: u8) -> Vec<u32> {
    let mut pulses = Vec::new();
    for _ in 0..=repeat {
        encode_message(packet.0, &mut pulses);
    }
    if swing_v_toggle && !packet.is_swing_v_toggle() {
        for _ in 0..=repeat {
            encode_message(TOGGLE_SWING_V, &mut pulses);
        }
    }
    pulses
}

/// Decodes one message (both halves), verifying the inverted repeat, and
/// in strict mode the checksum as well.
pub fn decode(samples: &[u32], strict: bool) -> Result<Packet, DecodeFailure> {
    let mask = (1u64 << BITS) - 1;
    let (data, used) = pulse::decode_bits(&TIMING, samples, BITS, true)?;
    let (inverted, _) = pulse::decode_bits(&TIMING, &samples[used..], BITS, true)?;
    if data ^ inverted != mask {
        return Err(DecodeFailure::BadBitEncoding);
    }
    let packet = Packet(data);
    if strict && !packet.valid_checksum() {
        return Err(DecodeFailure::ChecksumMismatch);
    }
    Ok(packet)
}

pub fn from_common(common: &CommonState) -> Packet {
    let mut packet = Packet::new();
    packet.set_power(common.power);
    packet.set_mode_raw(match common.mode {
        Mode::Cool => MODE_COOL,
        Mode::Heat => MODE_HEAT,
        Mode::Dry => MODE_DRY,
        Mode::Fan => MODE_FAN,
        _ => MODE_AUTO,
    });
    packet.set_celsius(common.celsius);
    packet.set_temp(common.degrees.round() as u8, common.celsius);
    packet.set_fan_raw(match common.fanspeed {
        FanSpeed::Min | FanSpeed::Low => FAN_LOW,
        FanSpeed::Medium => FAN_MED,
        FanSpeed::High | FanSpeed::Max => FAN_HIGH,
        FanSpeed::Auto => FAN_AUTO,
    });
    packet.set_sleep(common.sleep >= 0);
    packet.apply_checksum();
    packet
}

/// Converts a decoded message to the common representation.
///
/// A swing toggle sentinel only flips the vertical swing relative to
/// `prev`; with no prior state it reads as Auto.
pub fn to_common(packet: &Packet, prev: Option<&CommonState>) -> CommonState {
    let mut result = match prev {
        Some(prev) if prev.protocol == Protocol::Midea => *prev,
        _ => CommonState::new(Protocol::Midea),
    };
    if packet.is_swing_v_toggle() {
        result.swingv = if result.swingv != SwingV::Off {
            SwingV::Off
        } else {
            SwingV::Auto
        };
        return result;
    }
    result.power = packet.power();
    result.mode = match packet.mode_raw() {
        MODE_COOL => Mode::Cool,
        MODE_HEAT => Mode::Heat,
        MODE_DRY => Mode::Dry,
        MODE_FAN => Mode::Fan,
        _ => Mode::Auto,
    };
    result.celsius = packet.celsius();
    result.degrees = packet.temp(result.celsius) as f32;
    result.fanspeed = match packet.fan_raw() {
        FAN_HIGH => FanSpeed::Max,
        FAN_MED => FanSpeed::Medium,
        FAN_LOW => FanSpeed::Min,
        _ => FanSpeed::Auto,
    };
    result.sleep = if packet.sleep() { 0 } else { -1 };
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_checksum() {
        // The published toggle message carries a valid checksum.
        let packet = Packet(TOGGLE_SWING_V);
        assert!(packet.valid_checksum());
        assert!(packet.is_swing_v_toggle());
    }

    #[test]
    fn test_temp_storage() {
        let mut packet = Packet::new();
        packet.set_temp(25, true);
        assert_eq!(packet.temp(true), 25);
        assert_eq!(packet.temp(false), 77);
        packet.set_temp(5, true);
        assert_eq!(packet.temp(true), MIN_TEMP_C);
        packet.set_temp(90, false);
        assert_eq!(packet.temp(false), MAX_TEMP_F);
    }

    #[test]
    fn test_checksum_rejects_bit_flip() {
        let mut packet = Packet::new();
        packet.apply_checksum();
        assert!(packet.valid_checksum());
        packet.0 ^= 1 << 24;
        assert!(!packet.valid_checksum());
    }

    #[test]
    fn test_roundtrip() {
        let mut packet = Packet::new();
        packet.set_mode_raw(MODE_HEAT);
        packet.set_temp(21, true);
        packet.set_fan_raw(FAN_MED);
        packet.apply_checksum();
        let pulses = frames(&packet, false, 0);
        let decoded = decode(&pulses, true).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_inverted_repeat_mismatch() {
        let mask = (1u64 << BITS) - 1;
        let packet = Packet::new();
        let mut pulses = Vec::new();
        pulse::encode_bits(&TIMING, packet.0, BITS, &mut pulses);
        // Second half not inverted.
        pulse::encode_bits(&TIMING, packet.0 & mask, BITS, &mut pulses);
        assert!(decode(&pulses, true).is_err());
    }

    #[test]
    fn test_swing_toggle_frames_appended() {
        let packet = Packet::new();
        let plain = frames(&packet, false, 0);
        let with_toggle = frames(&packet, true, 0);
        assert_eq!(with_toggle.len(), plain.len() * 2);
    }

    #[test]
    fn test_toggle_to_common() {
        let sentinel = Packet(TOGGLE_SWING_V);
        let blind = to_common(&sentinel, None);
        assert_eq!(blind.swingv, crate::common::SwingV::Auto);
        let again = to_common(&sentinel, Some(&blind));
        assert_eq!(again.swingv, crate::common::SwingV::Off);
    }

    #[test]
    fn test_common_roundtrip() {
        let mut common = CommonState::new(Protocol::Midea);
        common.power = true;
        common.mode = Mode::Cool;
        common.degrees = 24.0;
        common.fanspeed = FanSpeed::Medium;
        common.sleep = 0;
        let packet = from_common(&common);
        assert!(packet.valid_checksum());
        let back = to_common(&packet, None);
        assert!(back.power);
        assert_eq!(back.mode, Mode::Cool);
        assert_eq!(back.degrees, 24.0);
        assert_eq!(back.fanspeed, FanSpeed::Medium);
        assert_eq!(back.sleep, 0);
    }
}
