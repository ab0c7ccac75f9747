//! Vestel 56-bit protocol.
//!
//! Two message layouts share one signature and checksum scheme: a command
//! message carrying the climate settings, and a timer message carrying the
//! clock and the on/off timers. The power nibble doubles as the message
//! type discriminator: a zero power field marks a timer message.

use crate::common::{CommonState, FanSpeed, Mode, Protocol, SwingV};
use crate::fields::{self, count_set_bits64};
use crate::pulse::{self, DecodeFailure, TimingProfile};

pub const BITS: u8 = 56;

pub const SIGNATURE: u64 = 0x201;

/// Power On, Mode Auto, Fan Auto, Temp 25C.
pub const STATE_DEFAULT: u64 = 0x0F00D9001FEF201;
pub const TIMER_STATE_DEFAULT: u64 = 0x201;

/// Base of the stored temperature field.
pub const TEMP_BASE: u8 = 16;
/// Lowest temperature the remote will actually request.
pub const MIN_TEMP: u8 = 18;
pub const MAX_TEMP: u8 = 30;

pub const MODE_AUTO: u64 = 0;
pub const MODE_COOL: u64 = 1;
pub const MODE_DRY: u64 = 2;
pub const MODE_FAN: u64 = 3;
pub const MODE_HEAT: u64 = 4;

pub const FAN_AUTO: u64 = 0x1;
pub const FAN_LOW: u64 = 0x5;
pub const FAN_MED: u64 = 0x9;
pub const FAN_HIGH: u64 = 0xB;
pub const FAN_AUTO_COOL: u64 = 0xC;
pub const FAN_AUTO_HOT: u64 = 0xD;

pub const NORMAL: u64 = 0x1;
pub const SLEEP: u64 = 0x3;
pub const TURBO: u64 = 0x7;
pub const SWING_ON: u64 = 0xA;
pub const SWING_OFF: u64 = 0xF;

// Command message fields.
const CHECKSUM_OFFSET: u8 = 12;
const SWING_OFFSET: u8 = 20;
const TURBO_SLEEP_OFFSET: u8 = 24;
const TEMP_OFFSET: u8 = 36;
const FAN_OFFSET: u8 = 40;
const MODE_OFFSET: u8 = 44;
const ION_OFFSET: u8 = 50;
const POWER_OFFSET: u8 = 52;

// Timer message fields. Timers pack hours in the top 5 bits and
// ten-minute units in the bottom 3.
const OFF_TIME_OFFSET: u8 = 20;
const ON_TIME_OFFSET: u8 = 28;
const HOUR_OFFSET: u8 = 36;
const ON_TIMER_FLAG_OFFSET: u8 = HOUR_OFFSET + 5;
const OFF_TIMER_FLAG_OFFSET: u8 = HOUR_OFFSET + 6;
const TIMER_FLAG_OFFSET: u8 = HOUR_OFFSET + 7;
const MINUTE_OFFSET: u8 = 44;

pub const TIMING: TimingProfile = TimingProfile {
    hdr_mark: 3110,
    hdr_space: 9066,
    bit_mark: 520,
    one_space: 1535,
    zero_space: 480,
    footer_mark: 520,
    gap: 100000,
    tolerance: 30,
    margin: 0,
    msb_first: false,
};

/// `0xFF - (2 + set-bit count of bits 20..63)`.
pub fn calc_checksum(state: u64) -> u8 {
    0xFFu8.wrapping_sub(2 + count_set_bits64(state >> 20, 44))
}

pub fn valid_checksum(state: u64) -> bool {
    fields::get_bits64(state, CHECKSUM_OFFSET, 8) as u8 == calc_checksum(state)
        && fields::get_bits64(state, 0, 12) == SIGNATURE
}

fn is_timer_message(state: u64) -> bool {
    fields::get_bits64(state, POWER_OFFSET, 4) == 0
}

/// Holds both message layouts; whichever was touched last is the one
/// [`VestelAc::raw`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VestelAc {
    command: u64,
    timer: u64,
    use_timer: bool,
}

impl VestelAc {
    pub fn new() -> Self {
        Self {
            command: STATE_DEFAULT,
            timer: TIMER_STATE_DEFAULT,
            use_timer: false,
        }
    }

    /// The message to transmit, with its checksum freshly applied.
    pub fn raw(&self) -> u64 {
        let state = if self.use_timer {
            self.timer
        } else {
            self.command
        };
        let mut out = state;
        fields::set_bits64(&mut out, CHECKSUM_OFFSET, 8, calc_checksum(state) as u64);
        out
    }

    /// Adopts a received message into the matching slot.
    pub fn set_raw(&mut self, state: u64) {
        if is_timer_message(state) {
            self.timer = state;
            self.use_timer = true;
        } else {
            self.command = state;
            self.use_timer = false;
        }
    }

    pub fn set_power(&mut self, on: bool) {
        // Only the low two bits of the power nibble move, which is what
        // turns the factory 0xF into 0xC for off.
        fields::set_bits64(&mut self.command, POWER_OFFSET, 2, if on { 0b11 } else { 0b00 });
        self.use_timer = false;
    }

    pub fn power(&self) -> bool {
        fields::get_bits64(self.command, POWER_OFFSET, 2) != 0
    }

    pub fn set_temp(&mut self, degrees: u8) {
        let degrees = fields::clamp_temp(degrees, MIN_TEMP, MAX_TEMP);
        fields::set_bits64(&mut self.command, TEMP_OFFSET, 4, (degrees - TEMP_BASE) as u64);
        self.use_timer = false;
    }

    pub fn temp(&self) -> u8 {
        fields::get_bits64(self.command, TEMP_OFFSET, 4) as u8 + TEMP_BASE
    }

    pub fn set_fan(&mut self, fan: u64) {
        let fan = match fan {
            FAN_LOW | FAN_MED | FAN_HIGH | FAN_AUTO_COOL | FAN_AUTO_HOT => fan,
            _ => FAN_AUTO,
        };
        fields::set_bits64(&mut self.command, FAN_OFFSET, 4, fan);
        self.use_timer = false;
    }

    pub fn fan(&self) -> u64 {
        fields::get_bits64(self.command, FAN_OFFSET, 4)
    }

    pub fn set_mode(&mut self, mode: u64) {
        let mode = match mode {
            MODE_COOL | MODE_DRY | MODE_FAN | MODE_HEAT => mode,
            _ => MODE_AUTO,
        };
        fields::set_bits64(&mut self.command, MODE_OFFSET, 3, mode);
        self.use_timer = false;
    }

    pub fn mode(&self) -> u64 {
        fields::get_bits64(self.command, MODE_OFFSET, 3)
    }

    pub fn set_swing(&mut self, on: bool) {
        let value = if on { SWING_ON } else { SWING_OFF };
        fields::set_bits64(&mut self.command, SWING_OFFSET, 4, value);
        self.use_timer = false;
    }

    pub fn swing(&self) -> bool {
        fields::get_bits64(self.command, SWING_OFFSET, 4) == SWING_ON
    }

    pub fn set_sleep(&mut self, on: bool) {
        let value = if on { SLEEP } else { NORMAL };
        fields::set_bits64(&mut self.command, TURBO_SLEEP_OFFSET, 4, value);
        self.use_timer = false;
    }

    pub fn sleep(&self) -> bool {
        fields::get_bits64(self.command, TURBO_SLEEP_OFFSET, 4) == SLEEP
    }

    pub fn set_turbo(&mut self, on: bool) {
        let value = if on { TURBO } else { NORMAL };
        fields::set_bits64(&mut self.command, TURBO_SLEEP_OFFSET, 4, value);
        self.use_timer = false;
    }

    pub fn turbo(&self) -> bool {
        fields::get_bits64(self.command, TURBO_SLEEP_OFFSET, 4) == TURBO
    }

    pub fn set_ion(&mut self, on: bool) {
        fields::set_bits64(&mut self.command, ION_OFFSET, 1, on as u64);
        self.use_timer = false;
    }

    pub fn ion(&self) -> bool {
        fields::get_bits64(self.command, ION_OFFSET, 1) != 0
    }

    /// Sets the unit's clock, in minutes past midnight.
    pub fn set_time(&mut self, minutes: u16) {
        fields::set_bits64(&mut self.timer, HOUR_OFFSET, 5, (minutes / 60) as u64);
        fields::set_bits64(&mut self.timer, MINUTE_OFFSET, 8, (minutes % 60) as u64);
        self.use_timer = true;
    }

    pub fn time(&self) -> u16 {
        fields::get_bits64(self.timer, HOUR_OFFSET, 5) as u16 * 60
            + fields::get_bits64(self.timer, MINUTE_OFFSET, 8) as u16
    }

    fn set_timer_field(&mut self, offset: u8, minutes: u16) {
        let packed = ((minutes as u64 / 60) << 3) + (minutes as u64 % 60) / 10;
        fields::set_bits64(&mut self.timer, offset, 8, packed);
        self.use_timer = true;
    }

    fn timer_field(&self, offset: u8) -> u16 {
        fields::get_bits64(self.timer, offset + 3, 5) as u16 * 60
            + fields::get_bits64(self.timer, offset, 3) as u16 * 10
    }

    pub fn set_on_timer(&mut self, minutes: u16) {
        fields::set_bits64(&mut self.timer, ON_TIMER_FLAG_OFFSET, 1, (minutes != 0) as u64);
        fields::set_bits64(&mut self.timer, TIMER_FLAG_OFFSET, 1, 0);
        self.set_timer_field(ON_TIME_OFFSET, minutes);
    }

    pub fn on_timer(&self) -> u16 {
        self.timer_field(ON_TIME_OFFSET)
    }

    pub fn set_off_timer(&mut self, minutes: u16) {
        fields::set_bits64(&mut self.timer, OFF_TIMER_FLAG_OFFSET, 1, (minutes != 0) as u64);
        fields::set_bits64(&mut self.timer, TIMER_FLAG_OFFSET, 1, 0);
        self.set_timer_field(OFF_TIME_OFFSET, minutes);
    }

    pub fn off_timer(&self) -> u16 {
        self.timer_field(OFF_TIME_OFFSET)
    }

    /// Countdown timer: switch off after `minutes`, not at a clock time.
    pub fn set_timer(&mut self, minutes: u16) {
        fields::set_bits64(&mut self.timer, OFF_TIME_OFFSET, 16, 0);
        self.set_timer_field(OFF_TIME_OFFSET, minutes);
        fields::set_bits64(&mut self.timer, OFF_TIMER_FLAG_OFFSET, 1, 0);
        fields::set_bits64(&mut self.timer, ON_TIMER_FLAG_OFFSET, 1, (minutes != 0) as u64);
        fields::set_bits64(&mut self.timer, TIMER_FLAG_OFFSET, 1, (minutes != 0) as u64);
        self.use_timer = true;
    }

    pub fn timer(&self) -> u16 {
        self.timer_field(OFF_TIME_OFFSET)
    }

    pub fn is_time_command(&self) -> bool {
        self.use_timer || fields::get_bits64(self.command, POWER_OFFSET, 4) == 0
    }
}

impl Default for VestelAc {
    fn default() -> Self {
        Self::new()
    }
}

pub fn frames(ac: &VestelAc, repeat: u8) -> Vec<u32> {
    let data = ac.raw();
    let mut pulses = Vec::new();
    for _ in 0..=repeat {
        pulse::encode_bits(&TIMING, data, BITS, &mut pulses);
    }
    pulses
}

pub fn decode(samples: &[u32], strict: bool) -> Result<VestelAc, DecodeFailure> {
    let (data, _) = pulse::decode_bits(&TIMING, samples, BITS, true)?;
    if strict && !valid_checksum(data) {
        return Err(DecodeFailure::ChecksumMismatch);
    }
    let mut ac = VestelAc::new();
    ac.set_raw(data);
    Ok(ac)
}

pub fn from_common(common: &CommonState) -> VestelAc {
    let mut ac = VestelAc::new();
    ac.set_power(common.power);
    ac.set_mode(match common.mode {
        Mode::Cool => MODE_COOL,
        Mode::Heat => MODE_HEAT,
        Mode::Dry => MODE_DRY,
        Mode::Fan => MODE_FAN,
        _ => MODE_AUTO,
    });
    ac.set_temp(common.degrees_celsius().round() as u8);
    ac.set_fan(match common.fanspeed {
        FanSpeed::Min | FanSpeed::Low => FAN_LOW,
        FanSpeed::Medium => FAN_MED,
        FanSpeed::High | FanSpeed::Max => FAN_HIGH,
        FanSpeed::Auto => FAN_AUTO,
    });
    ac.set_swing(common.swingv != SwingV::Off);
    // Turbo and sleep share a nibble; turbo wins when both are asked for.
    if common.sleep >= 0 {
        ac.set_sleep(true);
    }
    if common.turbo {
        ac.set_turbo(true);
    }
    ac.set_ion(common.filter);
    if common.clock >= 0 {
        ac.set_time(common.clock as u16);
        // Still send the climate command, not the timer message.
        ac.use_timer = false;
    }
    ac
}

pub fn to_common(ac: &VestelAc) -> CommonState {
    let mut result = CommonState::new(Protocol::Vestel);
    result.power = ac.power();
    result.mode = match ac.mode() {
        MODE_COOL => Mode::Cool,
        MODE_HEAT => Mode::Heat,
        MODE_DRY => Mode::Dry,
        MODE_FAN => Mode::Fan,
        _ => Mode::Auto,
    };
    result.degrees = ac.temp() as f32;
    result.fanspeed = match ac.fan() {
        FAN_HIGH => FanSpeed::Max,
        FAN_MED => FanSpeed::Medium,
        FAN_LOW => FanSpeed::Min,
        _ => FanSpeed::Auto,
    };
    result.swingv = if ac.swing() {
        SwingV::Auto
    } else {
        SwingV::Off
    };
    result.turbo = ac.turbo();
    result.filter = ac.ion();
    result.sleep = if ac.sleep() { 0 } else { -1 };
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_validates() {
        assert!(valid_checksum(STATE_DEFAULT));
        let ac = VestelAc::new();
        assert!(ac.power());
        assert_eq!(ac.temp(), 25);
        assert_eq!(ac.mode(), MODE_AUTO);
        assert_eq!(ac.fan(), FAN_AUTO_HOT);
        assert!(!ac.swing());
    }

    #[test]
    fn test_checksum_counts_bits() {
        // 14 bits set above the checksum in the default state.
        assert_eq!(calc_checksum(STATE_DEFAULT), 0xEF);
        // Flipping a covered bit moves the checksum.
        assert_ne!(calc_checksum(STATE_DEFAULT ^ (1 << 36)), 0xEF);
        // Flipping a checksum bit does not.
        assert_eq!(calc_checksum(STATE_DEFAULT ^ (1 << 13)), 0xEF);
        assert!(!valid_checksum(STATE_DEFAULT ^ (1 << 13)));
    }

    #[test]
    fn test_power_off_nibble() {
        let mut ac = VestelAc::new();
        ac.set_power(false);
        assert!(!ac.power());
        assert_eq!(fields::get_bits64(ac.raw(), 52, 4), 0xC);
        ac.set_power(true);
        assert_eq!(fields::get_bits64(ac.raw(), 52, 4), 0xF);
    }

    #[test]
    fn test_temp_clamped() {
        let mut ac = VestelAc::new();
        ac.set_temp(5);
        assert_eq!(ac.temp(), MIN_TEMP);
        ac.set_temp(42);
        assert_eq!(ac.temp(), MAX_TEMP);
        ac.set_temp(22);
        assert_eq!(ac.temp(), 22);
    }

    #[test]
    fn test_turbo_sleep_shared_nibble() {
        let mut ac = VestelAc::new();
        ac.set_sleep(true);
        assert!(ac.sleep());
        assert!(!ac.turbo());
        ac.set_turbo(true);
        assert!(ac.turbo());
        assert!(!ac.sleep());
        ac.set_turbo(false);
        assert!(!ac.turbo());
        assert!(!ac.sleep());
    }

    #[test]
    fn test_timer_message_discriminator() {
        let mut ac = VestelAc::new();
        assert!(!ac.is_time_command());
        ac.set_time(14 * 60 + 30);
        assert!(ac.is_time_command());
        assert_eq!(ac.time(), 14 * 60 + 30);
        let raw = ac.raw();
        assert_eq!(fields::get_bits64(raw, 52, 4), 0);
        assert!(valid_checksum(raw));
    }

    #[test]
    fn test_timer_packing() {
        let mut ac = VestelAc::new();
        ac.set_off_timer(23 * 60 + 20);
        assert_eq!(ac.off_timer(), 23 * 60 + 20);
        ac.set_on_timer(9 * 60);
        assert_eq!(ac.on_timer(), 9 * 60);
        // Minutes round down to ten-minute units.
        ac.set_off_timer(95);
        assert_eq!(ac.off_timer(), 90);
    }

    #[test]
    fn test_roundtrip() {
        let mut ac = VestelAc::new();
        ac.set_mode(MODE_COOL);
        ac.set_temp(22);
        ac.set_fan(FAN_HIGH);
        ac.set_swing(true);
        let pulses = frames(&ac, 0);
        assert_eq!(pulses.len(), 2 + 56 * 2 + 2);
        let decoded = decode(&pulses, true).unwrap();
        assert_eq!(decoded.raw(), ac.raw());
        assert_eq!(decoded.temp(), 22);
        assert!(decoded.swing());
    }

    #[test]
    fn test_strict_rejects_corruption() {
        let ac = VestelAc::new();
        let mut pulses = frames(&ac, 0);
        // Flip a data bit (bit 30, a zero in the default state).
        pulses[2 + 30 * 2 + 1] = TIMING.one_space;
        assert_eq!(decode(&pulses, true), Err(DecodeFailure::ChecksumMismatch));
        assert!(decode(&pulses, false).is_ok());
    }

    #[test]
    fn test_common_roundtrip() {
        let mut common = CommonState::new(Protocol::Vestel);
        common.power = true;
        common.mode = Mode::Heat;
        common.degrees = 23.0;
        common.fanspeed = FanSpeed::Low;
        common.swingv = SwingV::Auto;
        common.filter = true;
        let ac = from_common(&common);
        let back = to_common(&ac);
        assert!(back.power);
        assert_eq!(back.mode, Mode::Heat);
        assert_eq!(back.degrees, 23.0);
        assert_eq!(back.fanspeed, FanSpeed::Min);
        assert_eq!(back.swingv, SwingV::Auto);
        assert!(back.filter);
    }
}
