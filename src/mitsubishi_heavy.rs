//! Mitsubishi Heavy Industries 152-bit (ZM-S) protocol.
//!
//! 19 bytes: a five byte model signature followed by seven data/inverse
//! byte pairs. There is no sum checksum; integrity comes from every data
//! byte being followed by its bitwise complement. Note the unusual bit
//! encoding: a one has the SHORTER space.

use crate::common::{CommonState, FanSpeed, Mode, Protocol, SwingH, SwingV};
use crate::fields::{get_bit8, get_bits8, set_bit8, set_bits8};
use crate::pulse::{self, DecodeFailure, TimingProfile};

pub const STATE_LENGTH: usize = 19;
pub const SIG_LENGTH: usize = 5;

pub const ZMS_SIG: [u8; SIG_LENGTH] = [0xAD, 0x51, 0x3C, 0xE5, 0x1A];

pub const MIN_TEMP: u8 = 17;
pub const MAX_TEMP: u8 = 31;

pub const MODE_AUTO: u8 = 0;
pub const MODE_COOL: u8 = 1;
pub const MODE_DRY: u8 = 2;
pub const MODE_FAN: u8 = 3;
pub const MODE_HEAT: u8 = 4;

pub const FAN_AUTO: u8 = 0x0;
pub const FAN_LOW: u8 = 0x1;
pub const FAN_MED: u8 = 0x2;
pub const FAN_HIGH: u8 = 0x3;
pub const FAN_MAX: u8 = 0x4;
pub const FAN_ECONO: u8 = 0x6;
pub const FAN_TURBO: u8 = 0x8;

pub const SWING_V_AUTO: u8 = 0;
pub const SWING_V_HIGHEST: u8 = 1;
pub const SWING_V_HIGH: u8 = 2;
pub const SWING_V_MIDDLE: u8 = 3;
pub const SWING_V_LOW: u8 = 4;
pub const SWING_V_LOWEST: u8 = 5;
pub const SWING_V_OFF: u8 = 6;

pub const SWING_H_AUTO: u8 = 0;
pub const SWING_H_LEFT_MAX: u8 = 1;
pub const SWING_H_LEFT: u8 = 2;
pub const SWING_H_MIDDLE: u8 = 3;
pub const SWING_H_RIGHT: u8 = 4;
pub const SWING_H_RIGHT_MAX: u8 = 5;
pub const SWING_H_RIGHT_LEFT: u8 = 6;
pub const SWING_H_LEFT_RIGHT: u8 = 7;
pub const SWING_H_OFF: u8 = 8;

pub const TIMING: TimingProfile = TimingProfile {
    hdr_mark: 3140,
    hdr_space: 1630,
    bit_mark: 370,
    one_space: 420,
    zero_space: 1220,
    footer_mark: 370,
    gap: 100000,
    tolerance: 25,
    margin: 50,
    msb_first: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MitsubishiHeavyAc {
    state: [u8; STATE_LENGTH],
}

impl MitsubishiHeavyAc {
    pub fn new() -> Self {
        let mut state = [0u8; STATE_LENGTH];
        state[..SIG_LENGTH].copy_from_slice(&ZMS_SIG);
        state[17] = 0x80;
        let mut ac = Self { state };
        ac.apply_pairing();
        ac
    }

    /// The state with all inverse pair bytes recomputed.
    pub fn raw(&self) -> [u8; STATE_LENGTH] {
        let mut out = *self;
        out.apply_pairing();
        out.state
    }

    pub fn set_raw(&mut self, state: &[u8; STATE_LENGTH]) {
        self.state = *state;
    }

    fn apply_pairing(&mut self) {
        for i in (SIG_LENGTH - 2..STATE_LENGTH - 1).step_by(2) {
            self.state[i + 1] = !self.state[i];
        }
    }

    pub fn set_power(&mut self, on: bool) {
        set_bit8(&mut self.state[5], 3, on);
    }

    pub fn power(&self) -> bool {
        get_bit8(self.state[5], 3)
    }

    pub fn set_temp(&mut self, degrees: u8) {
        let degrees = degrees.clamp(MIN_TEMP, MAX_TEMP);
        set_bits8(&mut self.state[7], 0, 4, degrees - MIN_TEMP);
    }

    pub fn temp(&self) -> u8 {
        get_bits8(self.state[7], 0, 4) + MIN_TEMP
    }

    pub fn set_mode(&mut self, mode: u8) {
        let mode = match mode {
            MODE_COOL | MODE_DRY | MODE_FAN | MODE_HEAT => mode,
            _ => MODE_AUTO,
        };
        set_bits8(&mut self.state[5], 0, 3, mode);
    }

    pub fn mode(&self) -> u8 {
        get_bits8(self.state[5], 0, 3)
    }

    pub fn set_fan(&mut self, speed: u8) {
        let speed = match speed {
            FAN_LOW | FAN_MED | FAN_HIGH | FAN_MAX | FAN_ECONO | FAN_TURBO => speed,
            _ => FAN_AUTO,
        };
        set_bits8(&mut self.state[9], 0, 4, speed);
    }

    pub fn fan(&self) -> u8 {
        get_bits8(self.state[9], 0, 4)
    }

    pub fn set_swing_vertical(&mut self, pos: u8) {
        set_bits8(&mut self.state[11], 5, 3, pos.min(SWING_V_OFF));
    }

    pub fn swing_vertical(&self) -> u8 {
        get_bits8(self.state[11], 5, 3)
    }

    pub fn set_swing_horizontal(&mut self, pos: u8) {
        set_bits8(&mut self.state[13], 0, 4, pos.min(SWING_H_OFF));
    }

    pub fn swing_horizontal(&self) -> u8 {
        get_bits8(self.state[13], 0, 4)
    }

    pub fn set_night(&mut self, on: bool) {
        set_bit8(&mut self.state[15], 6, on);
    }

    pub fn night(&self) -> bool {
        get_bit8(self.state[15], 6)
    }

    pub fn set_silent(&mut self, on: bool) {
        set_bit8(&mut self.state[15], 7, on);
    }

    pub fn silent(&self) -> bool {
        get_bit8(self.state[15], 7)
    }

    pub fn set_filter(&mut self, on: bool) {
        set_bit8(&mut self.state[5], 6, on);
    }

    pub fn filter(&self) -> bool {
        get_bit8(self.state[5], 6)
    }

    pub fn set_clean(&mut self, on: bool) {
        self.set_filter(on);
        set_bit8(&mut self.state[5], 5, on);
    }

    pub fn clean(&self) -> bool {
        get_bit8(self.state[5], 5) && self.filter()
    }

    /// Turbo and Econo are fan speeds, not flags.
    pub fn set_turbo(&mut self, on: bool) {
        if on {
            self.set_fan(FAN_TURBO);
        } else if self.turbo() {
            self.set_fan(FAN_AUTO);
        }
    }

    pub fn turbo(&self) -> bool {
        self.fan() == FAN_TURBO
    }

    pub fn set_econo(&mut self, on: bool) {
        if on {
            self.set_fan(FAN_ECONO);
        } else if self.econo() {
            self.set_fan(FAN_AUTO);
        }
    }

    pub fn econo(&self) -> bool {
        self.fan() == FAN_ECONO
    }
}

impl Default for MitsubishiHeavyAc {
    fn default() -> Self {
        Self::new()
    }
}

pub fn check_sig(state: &[u8; STATE_LENGTH]) -> bool {
    state[..SIG_LENGTH] == ZMS_SIG
}

/// Every data byte from the last signature pair on must be followed by
/// its complement.
pub fn valid_pairing(state: &[u8; STATE_LENGTH]) -> bool {
    (SIG_LENGTH - 2..STATE_LENGTH - 1)
        .step_by(2)
        .all(|i| state[i] ^ state[i + 1] == 0xFF)
}

pub fn frames(ac: &MitsubishiHeavyAc, repeat: u8) -> Vec<u32> {
    let state = ac.raw();
    let mut pulses = Vec::new();
    for _ in 0..=repeat {
        pulse::encode_bytes(&TIMING, &state, &mut pulses);
    }
    pulses
}

pub fn decode(samples: &[u32], strict: bool) -> Result<MitsubishiHeavyAc, DecodeFailure> {
    let mut state = [0u8; STATE_LENGTH];
    pulse::decode_bytes(&TIMING, samples, &mut state, true)?;
    if strict && !(check_sig(&state) && valid_pairing(&state)) {
        return Err(DecodeFailure::ChecksumMismatch);
    }
    let mut ac = MitsubishiHeavyAc::new();
    ac.set_raw(&state);
    Ok(ac)
}

pub fn from_common(common: &CommonState) -> MitsubishiHeavyAc {
    let mut ac = MitsubishiHeavyAc::new();
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
        FanSpeed::Min => FAN_ECONO,
        FanSpeed::Low => FAN_LOW,
        FanSpeed::Medium => FAN_MED,
        FanSpeed::High => FAN_HIGH,
        FanSpeed::Max => FAN_MAX,
        FanSpeed::Auto => FAN_AUTO,
    });
    ac.set_swing_vertical(match common.swingv {
        SwingV::Auto => SWING_V_AUTO,
        SwingV::Highest => SWING_V_HIGHEST,
        SwingV::High => SWING_V_HIGH,
        SwingV::Middle => SWING_V_MIDDLE,
        SwingV::Low => SWING_V_LOW,
        SwingV::Lowest => SWING_V_LOWEST,
        _ => SWING_V_OFF,
    });
    ac.set_swing_horizontal(match common.swingh {
        SwingH::Auto => SWING_H_AUTO,
        SwingH::LeftMax => SWING_H_LEFT_MAX,
        SwingH::Left => SWING_H_LEFT,
        SwingH::Middle => SWING_H_MIDDLE,
        SwingH::Right => SWING_H_RIGHT,
        SwingH::RightMax => SWING_H_RIGHT_MAX,
        _ => SWING_H_OFF,
    });
    ac.set_silent(common.quiet);
    if common.turbo {
        ac.set_turbo(true);
    }
    if common.econo {
        ac.set_econo(true);
    }
    ac.set_filter(common.filter);
    if common.clean {
        ac.set_clean(true);
    }
    ac.set_night(common.sleep >= 0);
    ac
}

pub fn to_common(ac: &MitsubishiHeavyAc) -> CommonState {
    let mut result = CommonState::new(Protocol::MitsubishiHeavy152);
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
        FAN_ECONO => FanSpeed::Min,
        FAN_LOW => FanSpeed::Low,
        FAN_MED => FanSpeed::Medium,
        FAN_HIGH => FanSpeed::High,
        FAN_MAX | FAN_TURBO => FanSpeed::Max,
        _ => FanSpeed::Auto,
    };
    result.swingv = match ac.swing_vertical() {
        SWING_V_AUTO => SwingV::Auto,
        SWING_V_HIGHEST => SwingV::Highest,
        SWING_V_HIGH => SwingV::High,
        SWING_V_MIDDLE => SwingV::Middle,
        SWING_V_LOW => SwingV::Low,
        SWING_V_LOWEST => SwingV::Lowest,
        _ => SwingV::Off,
    };
    result.swingh = match ac.swing_horizontal() {
        SWING_H_AUTO => SwingH::Auto,
        SWING_H_LEFT_MAX => SwingH::LeftMax,
        SWING_H_LEFT => SwingH::Left,
        SWING_H_MIDDLE => SwingH::Middle,
        SWING_H_RIGHT => SwingH::Right,
        SWING_H_RIGHT_MAX => SwingH::RightMax,
        _ => SwingH::Off,
    };
    result.quiet = ac.silent();
    result.turbo = ac.turbo();
    result.econo = ac.econo();
    result.filter = ac.filter();
    result.clean = ac.clean();
    result.sleep = if ac.night() { 0 } else { -1 };
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_paired() {
        let ac = MitsubishiHeavyAc::new();
        let raw = ac.raw();
        assert!(check_sig(&raw));
        assert!(valid_pairing(&raw));
        assert_eq!(raw[18], 0x7F);
        // The last signature pair already complies.
        assert_eq!(raw[3] ^ raw[4], 0xFF);
    }

    #[test]
    fn test_pairing_detects_flip() {
        let ac = MitsubishiHeavyAc::new();
        let mut raw = ac.raw();
        for i in 5..STATE_LENGTH {
            let mut corrupt = raw;
            corrupt[i] ^= 0x04;
            assert!(!valid_pairing(&corrupt), "flip in byte {} not caught", i);
        }
        raw[7] ^= 0x04;
        raw[8] ^= 0x04;
        // Consistent double flips are beyond this scheme.
        assert!(valid_pairing(&raw));
    }

    #[test]
    fn test_temp_clamped() {
        let mut ac = MitsubishiHeavyAc::new();
        ac.set_temp(10);
        assert_eq!(ac.temp(), MIN_TEMP);
        ac.set_temp(40);
        assert_eq!(ac.temp(), MAX_TEMP);
        ac.set_temp(26);
        assert_eq!(ac.temp(), 26);
    }

    #[test]
    fn test_turbo_is_a_fan_speed() {
        let mut ac = MitsubishiHeavyAc::new();
        ac.set_fan(FAN_MED);
        ac.set_turbo(true);
        assert!(ac.turbo());
        assert_eq!(ac.fan(), FAN_TURBO);
        ac.set_turbo(false);
        assert_eq!(ac.fan(), FAN_AUTO);
        // Turning turbo "off" while it isn't on leaves the fan alone.
        ac.set_fan(FAN_HIGH);
        ac.set_turbo(false);
        assert_eq!(ac.fan(), FAN_HIGH);
    }

    #[test]
    fn test_clean_requires_filter() {
        let mut ac = MitsubishiHeavyAc::new();
        ac.set_clean(true);
        assert!(ac.clean());
        assert!(ac.filter());
        ac.set_filter(false);
        assert!(!ac.clean());
    }

    #[test]
    fn test_roundtrip() {
        let mut ac = MitsubishiHeavyAc::new();
        ac.set_power(true);
        ac.set_mode(MODE_HEAT);
        ac.set_temp(20);
        ac.set_fan(FAN_HIGH);
        ac.set_swing_vertical(SWING_V_MIDDLE);
        ac.set_swing_horizontal(SWING_H_LEFT);
        let pulses = frames(&ac, 0);
        assert_eq!(pulses.len(), 2 + STATE_LENGTH * 8 * 2 + 2);
        let decoded = decode(&pulses, true).unwrap();
        assert_eq!(decoded.raw(), ac.raw());
        assert_eq!(decoded.temp(), 20);
        assert_eq!(decoded.swing_vertical(), SWING_V_MIDDLE);
    }

    #[test]
    fn test_strict_rejects_bad_sig() {
        let mut ac = MitsubishiHeavyAc::new();
        let mut state = ac.raw();
        state[0] = 0x55;
        ac.set_raw(&state);
        let mut pulses = Vec::new();
        pulse::encode_bytes(&TIMING, &state, &mut pulses);
        assert_eq!(decode(&pulses, true), Err(DecodeFailure::ChecksumMismatch));
        assert!(decode(&pulses, false).is_ok());
    }

    #[test]
    fn test_common_roundtrip() {
        let mut common = CommonState::new(Protocol::MitsubishiHeavy152);
        common.power = true;
        common.mode = Mode::Cool;
        common.degrees = 22.0;
        common.fanspeed = FanSpeed::High;
        common.swingv = SwingV::Lowest;
        common.swingh = SwingH::RightMax;
        common.quiet = true;
        common.sleep = 0;
        let ac = from_common(&common);
        assert!(valid_pairing(&ac.raw()));
        let back = to_common(&ac);
        assert!(back.power);
        assert_eq!(back.mode, Mode::Cool);
        assert_eq!(back.degrees, 22.0);
        assert_eq!(back.fanspeed, FanSpeed::High);
        assert_eq!(back.swingv, SwingV::Lowest);
        assert_eq!(back.swingh, SwingH::RightMax);
        assert!(back.quiet);
        assert_eq!(back.sleep, 0);
    }
}
