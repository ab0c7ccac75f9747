//! Haier HSU07-HEA03 remote protocol.
//!
//! The reference byte-array protocol of this family: a 9 byte state buffer
//! with an additive checksum in the last byte. Unusually, the message also
//! carries a command nibble naming the button that was pressed, so setters
//! update both the value field and the command.

use crate::common::{CommonState, FanSpeed, Mode, Protocol, SwingV};
use crate::fields;
use crate::pulse::{self, DecodeFailure, TimingProfile};

pub const STATE_LENGTH: usize = 9;
pub const BITS: u8 = (STATE_LENGTH * 8) as u8;

pub const PREFIX: u8 = 0xA5;

pub const MIN_TEMP: u8 = 16;
pub const DEF_TEMP: u8 = 25;
pub const MAX_TEMP: u8 = 30;

pub const MAX_TIME: u16 = 23 * 60 + 59;

/// Byte 1 low nibble: which button this message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Off = 0b0000,
    On = 0b0001,
    Mode = 0b0010,
    Fan = 0b0011,
    TempUp = 0b0110,
    TempDown = 0b0111,
    Sleep = 0b1000,
    TimerSet = 0b1001,
    TimerCancel = 0b1010,
    Health = 0b1100,
    Swing = 0b1101,
}

impl Command {
    fn from_nibble(nibble: u8) -> Option<Self> {
        Some(match nibble {
            0b0000 => Command::Off,
            0b0001 => Command::On,
            0b0010 => Command::Mode,
            0b0011 => Command::Fan,
            0b0110 => Command::TempUp,
            0b0111 => Command::TempDown,
            0b1000 => Command::Sleep,
            0b1001 => Command::TimerSet,
            0b1010 => Command::TimerCancel,
            0b1100 => Command::Health,
            0b1101 => Command::Swing,
            _ => return None,
        })
    }
}

// Native mode values, byte 6 bits 5-7.
pub const MODE_AUTO: u8 = 0;
pub const MODE_COOL: u8 = 1;
pub const MODE_DRY: u8 = 2;
pub const MODE_HEAT: u8 = 3;
pub const MODE_FAN: u8 = 4;

// Native fan values as the API exposes them.
pub const FAN_AUTO: u8 = 0;
pub const FAN_LOW: u8 = 1;
pub const FAN_MED: u8 = 2;
pub const FAN_HIGH: u8 = 3;

// Swing positions, byte 2 bits 6-7.
pub const SWING_OFF: u8 = 0b00;
pub const SWING_UP: u8 = 0b01;
pub const SWING_DOWN: u8 = 0b10;
pub const SWING_CHG: u8 = 0b11;

const MODE_FIELD: fields::Field = fields::Field::new(6, 5, 3);
const SWING_FIELD: fields::Field = fields::Field::new(2, 6, 2);
const COMMAND_FIELD: fields::Field = fields::Field::new(1, 0, 4);
const TEMP_FIELD: fields::Field = fields::Field::new(1, 4, 4);
const FAN_FIELD: fields::Field = fields::Field::new(5, 0, 2);

const HEALTH_BIT: u8 = 5; // byte 4
const SLEEP_BIT: u8 = 6; // byte 7
const OFF_TIMER_BIT: u8 = 6; // byte 3
const ON_TIMER_BIT: u8 = 7; // byte 3

pub const TIMING: TimingProfile = TimingProfile {
    hdr_mark: 3000,
    hdr_space: 4300,
    bit_mark: 520,
    one_space: 1650,
    zero_space: 650,
    footer_mark: 520,
    gap: 150000,
    tolerance: 25,
    margin: 50,
    msb_first: true,
};

/// Each frame opens with an extra mark/space pair before the real header.
const PREFIX_MARK: u32 = 3000;
const PREFIX_SPACE: u32 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaierAc {
    state: [u8; STATE_LENGTH],
}

impl Default for HaierAc {
    fn default() -> Self {
        Self::new()
    }
}

impl HaierAc {
    pub fn new() -> Self {
        let mut ac = Self {
            state: [0; STATE_LENGTH],
        };
        ac.state[0] = PREFIX;
        ac.state[2] = 0x20;
        ac.state[4] = 0x0C;
        ac.state[5] = 0xC0;
        ac.set_temp(DEF_TEMP);
        ac.set_fan(FAN_AUTO);
        ac.set_mode(MODE_AUTO);
        ac.set_command(Command::On);
        ac
    }

    pub fn command(&self) -> Command {
        // Only valid nibbles can be written, so this cannot fail.
        Command::from_nibble(COMMAND_FIELD.get(&self.state)).unwrap_or(Command::On)
    }

    pub fn set_command(&mut self, command: Command) {
        COMMAND_FIELD.set(&mut self.state, command as u8);
    }

    pub fn temp(&self) -> u8 {
        TEMP_FIELD.get(&self.state) + MIN_TEMP
    }

    /// Clamps to the 16-30C band. The command flips to TempUp/TempDown
    /// relative to the current setting; an unchanged temperature is a no-op.
    pub fn set_temp(&mut self, degrees: u8) {
        let temp = fields::clamp_temp(degrees, MIN_TEMP, MAX_TEMP);
        let old = self.temp();
        if old == temp {
            return;
        }
        self.set_command(if old > temp {
            Command::TempDown
        } else {
            Command::TempUp
        });
        TEMP_FIELD.set(&mut self.state, temp - MIN_TEMP);
    }

    pub fn fan(&self) -> u8 {
        match FAN_FIELD.get(&self.state) {
            1 => FAN_MED,
            2 => FAN_HIGH,
            3 => FAN_LOW,
            _ => FAN_AUTO,
        }
    }

    pub fn set_fan(&mut self, speed: u8) {
        // The wire encoding is not the API ordering.
        let raw = match speed {
            FAN_LOW => 3,
            FAN_MED => 1,
            FAN_HIGH => 2,
            _ => FAN_AUTO,
        };
        if speed != self.fan() {
            self.set_command(Command::Fan);
        }
        FAN_FIELD.set(&mut self.state, raw);
    }

    pub fn mode(&self) -> u8 {
        MODE_FIELD.get(&self.state)
    }

    pub fn set_mode(&mut self, mode: u8) {
        self.set_command(Command::Mode);
        // Out of range defaults to auto, like the remote.
        let mode = if mode > MODE_FAN { MODE_AUTO } else { mode };
        MODE_FIELD.set(&mut self.state, mode);
    }

    pub fn sleep(&self) -> bool {
        fields::get_bit8(self.state[7], SLEEP_BIT)
    }

    pub fn set_sleep(&mut self, on: bool) {
        self.set_command(Command::Sleep);
        fields::set_bit8(&mut self.state[7], SLEEP_BIT, on);
    }

    pub fn health(&self) -> bool {
        fields::get_bit8(self.state[4], HEALTH_BIT)
    }

    pub fn set_health(&mut self, on: bool) {
        self.set_command(Command::Health);
        fields::set_bit8(&mut self.state[4], HEALTH_BIT, on);
    }

    pub fn swing(&self) -> u8 {
        SWING_FIELD.get(&self.state)
    }

    pub fn set_swing(&mut self, position: u8) {
        if position == self.swing() || position > SWING_CHG {
            return;
        }
        self.set_command(Command::Swing);
        SWING_FIELD.set(&mut self.state, position);
    }

    /// Minutes past midnight, packed as 5 bits of hours and 6 of minutes
    /// in adjacent bytes.
    fn time_at(&self, byte: usize) -> u16 {
        let hours = fields::get_bits8(self.state[byte], 0, 5) as u16;
        let mins = fields::get_bits8(self.state[byte + 1], 0, 6) as u16;
        hours * 60 + mins
    }

    fn set_time_at(&mut self, byte: usize, mins: u16) {
        let mins = mins.min(MAX_TIME);
        fields::set_bits8(&mut self.state[byte], 0, 5, (mins / 60) as u8);
        fields::set_bits8(&mut self.state[byte + 1], 0, 6, (mins % 60) as u8);
    }

    pub fn curr_time(&self) -> u16 {
        self.time_at(2)
    }

    pub fn set_curr_time(&mut self, mins: u16) {
        self.set_time_at(2, mins);
    }

    /// Minutes until power-on, or -1 when the on timer is not armed.
    pub fn on_timer(&self) -> i16 {
        if fields::get_bit8(self.state[3], ON_TIMER_BIT) {
            self.time_at(6) as i16
        } else {
            -1
        }
    }

    pub fn set_on_timer(&mut self, mins: u16) {
        self.set_command(Command::TimerSet);
        fields::set_bit8(&mut self.state[3], ON_TIMER_BIT, true);
        self.set_time_at(6, mins);
    }

    pub fn off_timer(&self) -> i16 {
        if fields::get_bit8(self.state[3], OFF_TIMER_BIT) {
            self.time_at(4) as i16
        } else {
            -1
        }
    }

    pub fn set_off_timer(&mut self, mins: u16) {
        self.set_command(Command::TimerSet);
        fields::set_bit8(&mut self.state[3], OFF_TIMER_BIT, true);
        self.set_time_at(4, mins);
    }

    pub fn cancel_timers(&mut self) {
        self.set_command(Command::TimerCancel);
        fields::set_bits8(&mut self.state[3], OFF_TIMER_BIT, 2, 0);
    }

    fn apply_checksum(&mut self) {
        self.state[STATE_LENGTH - 1] = fields::sum_bytes(&self.state[..STATE_LENGTH - 1]);
    }

    pub fn valid_checksum(state: &[u8; STATE_LENGTH]) -> bool {
        state[STATE_LENGTH - 1] == fields::sum_bytes(&state[..STATE_LENGTH - 1])
    }

    /// The state buffer with a freshly computed checksum.
    pub fn raw(&mut self) -> [u8; STATE_LENGTH] {
        self.apply_checksum();
        self.state
    }

    pub fn set_raw(&mut self, state: [u8; STATE_LENGTH]) {
        self.state = state;
    }

    /// The complete pulse sequence, sent `repeat + 1` times.
    pub fn frames(&mut self, repeat: u8) -> Vec<u32> {
        let data = self.raw();
        let mut pulses = Vec::new();
        for _ in 0..=repeat {
            pulses.push(PREFIX_MARK);
            pulses.push(PREFIX_SPACE);
            pulse::encode_bytes(&TIMING, &data, &mut pulses);
        }
        pulses
    }

    /// Decodes one captured frame. Strict mode also enforces the prefix
    /// byte and the checksum.
    pub fn decode(samples: &[u32], strict: bool) -> Result<Self, DecodeFailure> {
        if samples.len() < 2 {
            return Err(DecodeFailure::InsufficientSamples);
        }
        if !TIMING.matches(samples[0], PREFIX_MARK) || !TIMING.matches(samples[1], PREFIX_SPACE) {
            return Err(DecodeFailure::BadHeader);
        }
        let mut state = [0u8; STATE_LENGTH];
        pulse::decode_bytes(&TIMING, &samples[2..], &mut state, true)?;
        if strict && (state[0] != PREFIX || !Self::valid_checksum(&state)) {
            return Err(DecodeFailure::ChecksumMismatch);
        }
        Ok(Self { state })
    }

    pub fn from_common(common: &CommonState) -> Self {
        let mut ac = Self::new();
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
        ac.set_swing(match common.swingv {
            SwingV::Off => SWING_OFF,
            SwingV::Highest | SwingV::High | SwingV::MiddleHigh => SWING_UP,
            SwingV::Lowest | SwingV::Low | SwingV::MiddleLow => SWING_DOWN,
            _ => SWING_CHG,
        });
        ac.set_health(common.filter);
        if common.sleep >= 0 {
            ac.set_sleep(true);
        }
        if common.clock >= 0 {
            ac.set_curr_time(common.clock as u16);
        }
        ac.set_command(if common.power {
            Command::On
        } else {
            Command::Off
        });
        ac
    }

    pub fn to_common(&self) -> CommonState {
        let mut result = CommonState::new(Protocol::Haier);
        result.power = self.command() != Command::Off;
        result.mode = match self.mode() {
            MODE_COOL => Mode::Cool,
            MODE_HEAT => Mode::Heat,
            MODE_DRY => Mode::Dry,
            MODE_FAN => Mode::Fan,
            _ => Mode::Auto,
        };
        result.degrees = self.temp() as f32;
        result.fanspeed = match self.fan() {
            FAN_LOW => FanSpeed::Min,
            FAN_MED => FanSpeed::Medium,
            FAN_HIGH => FanSpeed::Max,
            _ => FanSpeed::Auto,
        };
        result.swingv = match self.swing() {
            SWING_UP => SwingV::Highest,
            SWING_DOWN => SwingV::Lowest,
            SWING_CHG => SwingV::Auto,
            _ => SwingV::Off,
        };
        result.filter = self.health();
        result.sleep = if self.sleep() { 0 } else { -1 };
        result.clock = self.curr_time() as i16;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_known_default_buffer() {
        let mut ac = HaierAc::new();
        assert_eq!(ac.raw(), hex!("a5 91 20 00 0c c0 00 00 22"));
    }

    #[test]
    fn test_default_state() {
        let ac = HaierAc::new();
        assert_eq!(ac.command(), Command::On);
        assert_eq!(ac.temp(), 25);
        assert_eq!(ac.mode(), MODE_AUTO);
        assert_eq!(ac.fan(), FAN_AUTO);
        assert!(!ac.sleep());
    }

    #[test]
    fn test_temp_down_command() {
        let mut ac = HaierAc::new();
        ac.set_temp(18);
        assert_eq!(ac.command(), Command::TempDown);
        assert_eq!(ac.temp(), 18);
        ac.set_temp(21);
        assert_eq!(ac.command(), Command::TempUp);
        assert_eq!(ac.temp(), 21);
    }

    #[test]
    fn test_temp_clamp() {
        let mut ac = HaierAc::new();
        ac.set_temp(5);
        assert_eq!(ac.temp(), MIN_TEMP);
        ac.set_temp(42);
        assert_eq!(ac.temp(), MAX_TEMP);
    }

    #[test]
    fn test_temp_unchanged_keeps_command() {
        let mut ac = HaierAc::new();
        ac.set_temp(25);
        assert_eq!(ac.command(), Command::On);
    }

    #[test]
    fn test_checksum() {
        let mut ac = HaierAc::new();
        let raw = ac.raw();
        assert!(HaierAc::valid_checksum(&raw));
        assert_eq!(raw[8], fields::sum_bytes(&raw[..8]));
    }

    #[test]
    fn test_single_bit_flip_rejected() {
        let mut ac = HaierAc::new();
        let mut raw = ac.raw();
        for byte in 0..STATE_LENGTH - 1 {
            for bit in 0..8 {
                raw[byte] ^= 1 << bit;
                assert!(!HaierAc::valid_checksum(&raw));
                raw[byte] ^= 1 << bit;
            }
        }
    }

    #[test]
    fn test_roundtrip() {
        let mut ac = HaierAc::new();
        ac.set_temp(20);
        ac.set_mode(MODE_HEAT);
        ac.set_fan(FAN_HIGH);
        ac.set_health(true);
        let pulses = ac.frames(0);
        let decoded = HaierAc::decode(&pulses, true).unwrap();
        assert_eq!(decoded, ac);
    }

    #[test]
    fn test_decode_rejects_corrupt_checksum() {
        let mut ac = HaierAc::new();
        let mut raw = ac.raw();
        raw[6] ^= 0x10;
        let mut bad = HaierAc::new();
        bad.set_raw(raw);
        let mut pulses = vec![PREFIX_MARK, PREFIX_SPACE];
        pulse::encode_bytes(&TIMING, &raw, &mut pulses);
        assert_eq!(
            HaierAc::decode(&pulses, true),
            Err(DecodeFailure::ChecksumMismatch)
        );
        // Best-effort decode still returns the buffer.
        assert!(HaierAc::decode(&pulses, false).is_ok());
    }

    #[test]
    fn test_timers() {
        let mut ac = HaierAc::new();
        assert_eq!(ac.on_timer(), -1);
        ac.set_on_timer(9 * 60 + 30);
        assert_eq!(ac.on_timer(), 9 * 60 + 30);
        assert_eq!(ac.command(), Command::TimerSet);
        ac.set_off_timer(23 * 60);
        assert_eq!(ac.off_timer(), 23 * 60);
        ac.cancel_timers();
        assert_eq!(ac.on_timer(), -1);
        assert_eq!(ac.off_timer(), -1);
        assert_eq!(ac.command(), Command::TimerCancel);
    }

    #[test]
    fn test_common_mapping() {
        let mut common = CommonState::new(Protocol::Haier);
        common.power = true;
        common.mode = Mode::Cool;
        common.degrees = 22.0;
        common.fanspeed = FanSpeed::Medium;
        common.filter = true;
        let ac = HaierAc::from_common(&common);
        let back = ac.to_common();
        assert!(back.power);
        assert_eq!(back.mode, Mode::Cool);
        assert_eq!(back.degrees, 22.0);
        assert_eq!(back.fanspeed, FanSpeed::Medium);
        assert!(back.filter);
    }
}
